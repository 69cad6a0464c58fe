//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and stable exit codes. Batch commands report per-router failures
//! inline and exit through [`CliError::PartialFailure`].

use miette::Diagnostic;
use thiserror::Error;

use wisply_core::CoreError;

/// Exit codes per the CLI contract.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const VERIFICATION: i32 = 5;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach router '{router}'")]
    #[diagnostic(
        code(wisply::connection_failed),
        help(
            "Check that the router is powered and the API service is enabled.\n\
             Reason: {reason}\n\
             Try: wisply monitor --router {router}"
        )
    )]
    ConnectionFailed { router: String, reason: String },

    #[error("Router '{router}' timed out after {seconds}s")]
    #[diagnostic(
        code(wisply::timeout),
        help("Increase --timeout or check the link to the router.")
    )]
    Timeout { router: String, seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Router '{router}' rejected the stored credentials")]
    #[diagnostic(
        code(wisply::auth_failed),
        help(
            "Update the credentials in the config file and re-run: wisply routers seed\n\
             Detail: {message}"
        )
    )]
    AuthFailed { router: String, message: String },

    // ── Enforcement contract ─────────────────────────────────────────

    #[error("PPPoE user '{pppoe_user}' not found on router '{router}'")]
    #[diagnostic(
        code(wisply::not_provisioned),
        help(
            "The router has no PPP secret with this name -- ask the NOC to \
             provision it before changing the customer's status."
        )
    )]
    NotProvisioned { pppoe_user: String, router: String },

    #[error(
        "Write not verified: '{pppoe_user}' on '{router}' reads back profile \
         '{found}' instead of '{expected}'"
    )]
    #[diagnostic(
        code(wisply::verification_failed),
        help(
            "The customer's real-world access state is unknown. The database \
             was NOT updated. Re-run the action once the router is healthy."
        )
    )]
    VerificationFailed {
        pppoe_user: String,
        router: String,
        expected: String,
        found: String,
    },

    #[error("Router '{router}' has no isolation profile configured")]
    #[diagnostic(
        code(wisply::isolation_profile_missing),
        help(
            "Set isolation_profile for this router in the config file and \
             re-run: wisply routers seed"
        )
    )]
    IsolationProfileMissing { router: String },

    #[error("Customer '{pppoe_user}' has no router assigned")]
    #[diagnostic(
        code(wisply::no_router_assigned),
        help("Run: wisply scan   to map customers to the routers carrying their secrets")
    )]
    NoRouterAssigned { pppoe_user: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(wisply::not_found),
        help("Run: wisply {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Batch outcomes ───────────────────────────────────────────────

    #[error("{failed} of {total} routers failed")]
    #[diagnostic(
        code(wisply::partial_failure),
        help("Per-router failures are listed above; the rest of the batch completed.")
    )]
    PartialFailure { failed: usize, total: usize },

    // ── API / internal ───────────────────────────────────────────────

    #[error("Device error: {message}")]
    #[diagnostic(code(wisply::device_error))]
    Device { message: String },

    #[error("Database error: {message}")]
    #[diagnostic(code(wisply::database_error))]
    Database { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(wisply::config))]
    Config(#[from] wisply_config::ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(wisply::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::NotProvisioned { .. } => exit_code::NOT_FOUND,
            Self::VerificationFailed { .. } => exit_code::VERIFICATION,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { router, reason } => {
                CliError::ConnectionFailed { router, reason }
            }

            CoreError::AuthenticationFailed { router, message } => {
                CliError::AuthFailed { router, message }
            }

            CoreError::Timeout {
                router,
                timeout_secs,
            } => CliError::Timeout {
                router,
                seconds: timeout_secs,
            },

            CoreError::NotProvisioned { pppoe_user, router } => {
                CliError::NotProvisioned { pppoe_user, router }
            }

            CoreError::VerificationFailed {
                pppoe_user,
                router,
                expected,
                found,
            } => CliError::VerificationFailed {
                pppoe_user,
                router,
                expected,
                found,
            },

            CoreError::IsolationProfileMissing { router } => {
                CliError::IsolationProfileMissing { router }
            }

            CoreError::NoRouterAssigned { pppoe_user } => {
                CliError::NoRouterAssigned { pppoe_user }
            }

            CoreError::CustomerNotFound { identifier } => CliError::NotFound {
                resource_type: "customer".into(),
                identifier,
                list_command: "customers show <pppoe-user>".into(),
            },

            CoreError::RouterNotFound { identifier } => CliError::NotFound {
                resource_type: "router".into(),
                identifier,
                list_command: "routers list".into(),
            },

            CoreError::Device { router, source } => CliError::Device {
                message: format!("{router}: {source}"),
            },

            CoreError::Database(e) => CliError::Database {
                message: e.to_string(),
            },

            CoreError::QueueClosed => CliError::Device {
                message: "enforcement queue is shut down".into(),
            },
        }
    }
}
