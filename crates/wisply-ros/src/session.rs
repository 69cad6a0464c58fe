// Device sessions
//
// One `DeviceSession` is one authenticated conversation with one router:
// short-lived, single-writer, owned by exactly one operation at a time.
// The session performs no retries beyond the initial TCP connect attempts;
// retry policy belongs to callers, who must also re-verify after a timed-out
// write rather than blindly re-applying it.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::command::{Command, Record, Reply};
use crate::error::Error;
use crate::proto;

/// Connection tuning for [`DeviceSession::connect`].
///
/// The default timeout is deliberately small: callers iterate many routers
/// sequentially and one dead device must not stall the whole batch.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Bound on the TCP connect and on every subsequent read/write.
    pub timeout: Duration,
    /// TCP connect attempts before giving up. Authentication is never
    /// retried -- rejected credentials fail the same way every time.
    pub attempts: u32,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            attempts: 2,
        }
    }
}

/// An authenticated connection to one RouterOS device.
///
/// The socket is closed when the session is dropped; [`close`](Self::close)
/// makes the shutdown explicit. All I/O is bounded by the session timeout,
/// and a timeout aborts the operation cleanly -- the socket is never reused
/// after a timed-out exchange because the session is consumed by the error
/// path of its owner.
#[derive(Debug)]
pub struct DeviceSession {
    stream: BufStream<TcpStream>,
    timeout: Duration,
    peer: String,
}

impl DeviceSession {
    /// Open a TCP connection, authenticate, and return a live session.
    ///
    /// Connect failures and timeouts are retried up to `opts.attempts`
    /// times; an authentication rejection is returned immediately as
    /// [`Error::Authentication`] so callers can avoid pointless retries.
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &SecretString,
        opts: &ConnectOptions,
    ) -> Result<Self, Error> {
        let peer = format!("{host}:{port}");
        let attempts = opts.attempts.max(1);

        let mut last_err: Option<Error> = None;
        let mut stream = None;
        for attempt in 1..=attempts {
            match tokio::time::timeout(opts.timeout, TcpStream::connect(peer.as_str())).await {
                Ok(Ok(socket)) => {
                    stream = Some(socket);
                    break;
                }
                Ok(Err(e)) => {
                    debug!(peer, attempt, error = %e, "connect attempt failed");
                    last_err = Some(Error::Connection {
                        peer: peer.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    debug!(peer, attempt, "connect attempt timed out");
                    last_err = Some(Error::Timeout {
                        peer: peer.clone(),
                        timeout_secs: opts.timeout.as_secs(),
                    });
                }
            }
        }
        let socket = match stream {
            Some(socket) => socket,
            None => {
                return Err(last_err.unwrap_or(Error::Connection {
                    peer,
                    reason: "no connect attempts were made".into(),
                }));
            }
        };
        let _ = socket.set_nodelay(true);

        let mut session = Self {
            stream: BufStream::new(socket),
            timeout: opts.timeout,
            peer,
        };
        session.login(username, password).await?;
        debug!(peer = session.peer, "session established");
        Ok(session)
    }

    /// The `host:port` this session talks to (for error context).
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// `/login` with plain credentials (RouterOS >= 6.43).
    ///
    /// Pre-6.43 devices answer with a `=ret=` MD5 challenge; this client
    /// does not speak that dialect and reports it as an authentication
    /// error rather than silently retrying.
    async fn login(&mut self, username: &str, password: &SecretString) -> Result<(), Error> {
        let cmd = Command::new("/login")
            .attr("name", username)
            .attr("password", password.expose_secret());

        let done = match self.exchange(&cmd).await {
            Ok(exchange) => exchange.done,
            Err(Error::Trap { peer, message }) => {
                return Err(Error::Authentication { peer, message });
            }
            Err(other) => return Err(other),
        };

        if done.get("ret").is_some() {
            return Err(Error::Authentication {
                peer: self.peer.clone(),
                message: "device requested pre-6.43 challenge login, which is not supported \
                          -- upgrade RouterOS to 6.43 or later"
                    .into(),
            });
        }
        Ok(())
    }

    /// Run a read command and return the decoded `!re` rows.
    pub async fn query(&mut self, cmd: &Command) -> Result<Vec<Record>, Error> {
        let exchange = self.exchange(cmd).await?;
        trace!(peer = self.peer, path = cmd.path(), rows = exchange.rows.len(), "query complete");
        Ok(exchange.rows)
    }

    /// Run a write command.
    ///
    /// A clean `!done` here means the device accepted the sentence, not
    /// that its state changed -- state-changing callers read back and
    /// verify before reporting success.
    pub async fn execute(&mut self, cmd: &Command) -> Result<(), Error> {
        self.exchange(cmd).await?;
        trace!(peer = self.peer, path = cmd.path(), "execute complete");
        Ok(())
    }

    /// Send one sentence and collect replies until `!done`.
    async fn exchange(&mut self, cmd: &Command) -> Result<Exchange, Error> {
        bounded(
            self.timeout,
            &self.peer,
            proto::write_sentence(&mut self.stream, cmd.words()),
        )
        .await?;

        let mut rows = Vec::new();
        let mut trap: Option<String> = None;
        loop {
            let words = bounded(
                self.timeout,
                &self.peer,
                proto::read_sentence(&mut self.stream),
            )
            .await?;
            match Reply::parse(&words)? {
                Reply::Data(record) => rows.push(record),
                Reply::Trap(record) => trap = Some(record.trap_message()),
                Reply::Fatal(message) => {
                    return Err(Error::Fatal {
                        peer: self.peer.clone(),
                        message,
                    });
                }
                Reply::Done(done) => {
                    if let Some(message) = trap {
                        return Err(Error::Trap {
                            peer: self.peer.clone(),
                            message,
                        });
                    }
                    return Ok(Exchange { rows, done });
                }
            }
        }
    }

    /// Shut the connection down explicitly. Dropping the session closes
    /// the socket as well; this just makes the intent visible at call
    /// sites that pair it with `connect`.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
        debug!(peer = self.peer, "session closed");
    }
}

struct Exchange {
    rows: Vec<Record>,
    done: Record,
}

/// Bound a protocol future by the session timeout.
async fn bounded<T>(
    timeout: Duration,
    peer: &str,
    op: impl std::future::Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            peer: peer.to_owned(),
            timeout_secs: timeout.as_secs(),
        }),
    }
}
