// ── Core error types ──
//
// User-facing errors from wisply-core. Consumers never see raw protocol
// sentences or socket errors directly -- device failures are wrapped with
// the router they happened on, because every batch flow reports failures
// per router rather than aborting.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Device / connection ──────────────────────────────────────────
    #[error("cannot reach router '{router}': {reason}")]
    ConnectionFailed { router: String, reason: String },

    #[error("router '{router}' rejected the stored credentials: {message}")]
    AuthenticationFailed { router: String, message: String },

    #[error("router '{router}' timed out after {timeout_secs}s")]
    Timeout { router: String, timeout_secs: u64 },

    #[error("device error on router '{router}': {source}")]
    Device {
        router: String,
        #[source]
        source: wisply_ros::Error,
    },

    // ── Enforcement contract ─────────────────────────────────────────
    /// The expected PPP secret does not exist on the router. Blocks the
    /// status transition that depended on it.
    #[error(
        "PPPoE user '{pppoe_user}' not found on router '{router}' \
         -- ask the NOC to provision it"
    )]
    NotProvisioned { pppoe_user: String, router: String },

    /// A write was accepted at the protocol level but the read-back does
    /// not match the intended state. The customer's real-world access
    /// state is unknown; never downgraded to a warning.
    #[error(
        "router '{router}' accepted the write for '{pppoe_user}' but read-back \
         shows profile '{found}' instead of '{expected}'"
    )]
    VerificationFailed {
        pppoe_user: String,
        router: String,
        expected: String,
        found: String,
    },

    /// Isolation requires the router to name its isolation profile; an
    /// unset profile fails loudly instead of silently no-opping.
    #[error("router '{router}' has no isolation profile configured")]
    IsolationProfileMissing { router: String },

    #[error("customer '{pppoe_user}' has no router assigned -- run a scan first")]
    NoRouterAssigned { pppoe_user: String },

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("customer '{identifier}' not found")]
    CustomerNotFound { identifier: String },

    #[error("router '{identifier}' not found")]
    RouterNotFound { identifier: String },

    // ── Infrastructure ───────────────────────────────────────────────
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("enforcement queue is shut down")]
    QueueClosed,
}

impl CoreError {
    /// Wrap a device-layer error with the router it happened on.
    pub fn from_device(router: &str, err: wisply_ros::Error) -> Self {
        match err {
            wisply_ros::Error::Connection { reason, .. } => Self::ConnectionFailed {
                router: router.to_owned(),
                reason,
            },
            wisply_ros::Error::Authentication { message, .. } => Self::AuthenticationFailed {
                router: router.to_owned(),
                message,
            },
            wisply_ros::Error::Timeout { timeout_secs, .. } => Self::Timeout {
                router: router.to_owned(),
                timeout_secs,
            },
            other => Self::Device {
                router: router.to_owned(),
                source: other,
            },
        }
    }

    /// Returns `true` for failures a retried job might clear.
    ///
    /// Configuration problems (no isolation profile, unprovisioned secret,
    /// no router assignment) fail identically on every attempt and are not
    /// retried. A verification failure is retryable: the retry re-reads
    /// device state before re-applying anything.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::VerificationFailed { .. } => true,
            Self::Device { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}
