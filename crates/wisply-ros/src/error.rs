use thiserror::Error;

/// Top-level error type for the `wisply-ros` crate.
///
/// Covers every failure mode of a device conversation: connecting,
/// authenticating, the wire protocol itself, and command-level rejections.
/// `wisply-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// TCP connect failed (refused, unreachable, DNS failure).
    #[error("cannot connect to {peer}: {reason}")]
    Connection { peer: String, reason: String },

    /// Login rejected by the device (wrong credentials, or a pre-6.43
    /// challenge reply this client does not speak).
    #[error("authentication rejected by {peer}: {message}")]
    Authentication { peer: String, message: String },

    /// An operation exceeded the session timeout.
    #[error("timed out after {timeout_secs}s talking to {peer}")]
    Timeout { peer: String, timeout_secs: u64 },

    /// Socket-level I/O error after the connection was established.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Command level ───────────────────────────────────────────────
    /// The device replied `!trap` to a command.
    #[error("device {peer} rejected command: {message}")]
    Trap { peer: String, message: String },

    /// The device replied `!fatal` and closed the conversation.
    #[error("device {peer} terminated the session: {message}")]
    Fatal { peer: String, message: String },

    // ── Wire protocol ───────────────────────────────────────────────
    /// Malformed data on the wire (bad length prefix, unknown reply word).
    #[error("malformed protocol data: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` if this is a transient failure worth retrying.
    ///
    /// Authentication rejections and traps are deterministic: retrying
    /// the same credentials or the same command will fail the same way.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::Io(_) | Self::Fatal { .. }
        )
    }

    /// Returns `true` if the device rejected our credentials.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
