//! Scripted mock RouterOS device for tests.
//!
//! Binds a local `TcpListener` and speaks just enough of the binary API for
//! the client and the enforcement logic to be exercised end to end: login,
//! PPP secret/profile/active prints, secret profile writes, and system
//! vitals. Behavior switches (`reject_auth`, `drop_profile_writes`) let
//! tests simulate the failure modes that matter -- rejected credentials and
//! writes that are accepted but never applied.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufStream;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::proto;

// ── Device state ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MockSecret {
    pub id: String,
    pub name: String,
    pub profile: String,
    pub service: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockProfile {
    pub name: String,
    pub rate_limit: Option<String>,
    pub local_address: Option<String>,
    pub remote_address: Option<String>,
    pub only_one: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MockActive {
    pub id: String,
    pub name: String,
    pub address: String,
}

/// Scriptable device state, shared between the test and the server task.
#[derive(Debug)]
pub struct MockState {
    pub secrets: Vec<MockSecret>,
    pub profiles: Vec<MockProfile>,
    pub active: Vec<MockActive>,
    pub identity: String,
    pub cpu_load: u8,
    pub uptime: String,
    pub version: String,
    pub board_name: String,
    /// Reply `!trap` to `/login`.
    pub reject_auth: bool,
    /// Accept `/ppp/secret/set` but leave the secret unchanged, so a
    /// read-back sees the old profile (verification-failure simulation).
    pub drop_profile_writes: bool,
    /// Number of `/ppp/secret/set` sentences accepted.
    pub profile_writes: u32,
    /// Number of those writes actually applied to a secret.
    pub applied_writes: u32,
    /// Usernames whose active session was removed.
    pub kicked: Vec<String>,
    pub next_id: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            secrets: Vec::new(),
            profiles: Vec::new(),
            active: Vec::new(),
            identity: "mock-router".into(),
            cpu_load: 4,
            uptime: "1w2d3h4m5s".into(),
            version: "7.14.2 (stable)".into(),
            board_name: "RB5009UG+S+".into(),
            reject_auth: false,
            drop_profile_writes: false,
            profile_writes: 0,
            applied_writes: 0,
            kicked: Vec::new(),
            next_id: 0,
        }
    }
}

impl MockState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("*{:X}", self.next_id)
    }

    /// Add a secret and return its item id.
    pub fn add_secret(&mut self, name: &str, profile: &str) -> String {
        let id = self.next_id();
        self.secrets.push(MockSecret {
            id: id.clone(),
            name: name.to_owned(),
            profile: profile.to_owned(),
            service: "pppoe".into(),
        });
        id
    }

    /// Add a profile by name with an optional rate limit.
    pub fn add_profile(&mut self, name: &str, rate_limit: Option<&str>) {
        self.profiles.push(MockProfile {
            name: name.to_owned(),
            rate_limit: rate_limit.map(str::to_owned),
            ..MockProfile::default()
        });
    }

    /// Mark a subscriber as currently online.
    pub fn add_active(&mut self, name: &str, address: &str) -> String {
        let id = self.next_id();
        self.active.push(MockActive {
            id: id.clone(),
            name: name.to_owned(),
            address: address.to_owned(),
        });
        id
    }

    /// The current profile of a secret, for test assertions.
    pub fn secret_profile(&self, name: &str) -> Option<&str> {
        self.secrets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.profile.as_str())
    }
}

// ── Server ──────────────────────────────────────────────────────────

/// A mock RouterOS device listening on a local port.
pub struct MockRouter {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    accept_task: JoinHandle<()>,
}

impl MockRouter {
    /// Start a mock device with the given initial state.
    pub async fn start(state: MockState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock router listener");
        let addr = listener.local_addr().expect("mock router local addr");
        let state = Arc::new(Mutex::new(state));

        let serve_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                let conn_state = Arc::clone(&serve_state);
                tokio::spawn(serve_connection(socket, conn_state));
            }
        });

        Self {
            addr,
            state,
            accept_task,
        }
    }

    /// Start a mock device with default (empty) state.
    pub async fn start_default() -> Self {
        Self::start(MockState::default()).await
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Shared state handle for scripting and assertions.
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    /// Stop accepting connections.
    pub fn shutdown(self) {
        self.accept_task.abort();
    }
}

async fn serve_connection(socket: TcpStream, state: Arc<Mutex<MockState>>) {
    let mut stream = BufStream::new(socket);
    loop {
        let words = match proto::read_sentence(&mut stream).await {
            Ok(words) if !words.is_empty() => words,
            _ => return,
        };
        let sentences = dispatch(&words, &state).await;
        for sentence in &sentences {
            if proto::write_sentence(&mut stream, sentence).await.is_err() {
                return;
            }
        }
    }
}

// ── Request handling ────────────────────────────────────────────────

fn attr_of<'a>(words: &'a [String], key: &str) -> Option<&'a str> {
    let prefix = format!("={key}=");
    words
        .iter()
        .find_map(|word| word.strip_prefix(prefix.as_str()))
}

fn filter_of<'a>(words: &'a [String], key: &str) -> Option<&'a str> {
    let prefix = format!("?{key}=");
    words
        .iter()
        .find_map(|word| word.strip_prefix(prefix.as_str()))
}

fn done() -> Vec<String> {
    vec!["!done".into()]
}

fn trap(message: &str) -> Vec<Vec<String>> {
    vec![
        vec!["!trap".into(), format!("=message={message}")],
        done(),
    ]
}

async fn dispatch(words: &[String], state: &Arc<Mutex<MockState>>) -> Vec<Vec<String>> {
    let mut state = state.lock().await;
    match words[0].as_str() {
        "/login" => {
            if state.reject_auth {
                trap("invalid user name or password (6)")
            } else {
                vec![done()]
            }
        }

        "/ppp/secret/print" => {
            let name_filter = filter_of(words, "name");
            let mut sentences: Vec<Vec<String>> = state
                .secrets
                .iter()
                .filter(|s| name_filter.is_none_or(|n| s.name == n))
                .map(|s| {
                    vec![
                        "!re".into(),
                        format!("=.id={}", s.id),
                        format!("=name={}", s.name),
                        format!("=profile={}", s.profile),
                        format!("=service={}", s.service),
                    ]
                })
                .collect();
            sentences.push(done());
            sentences
        }

        "/ppp/secret/set" => {
            let Some(id) = attr_of(words, ".id") else {
                return trap("missing .id");
            };
            let Some(profile) = attr_of(words, "profile") else {
                return trap("missing profile");
            };
            if !state.secrets.iter().any(|s| s.id == id) {
                return trap("no such item");
            }
            state.profile_writes += 1;
            if !state.drop_profile_writes {
                let profile = profile.to_owned();
                let id = id.to_owned();
                if let Some(secret) = state.secrets.iter_mut().find(|s| s.id == id) {
                    secret.profile = profile;
                }
                state.applied_writes += 1;
            }
            vec![done()]
        }

        "/ppp/profile/print" => {
            let mut sentences: Vec<Vec<String>> = state
                .profiles
                .iter()
                .map(|p| {
                    let mut sentence = vec!["!re".into(), format!("=name={}", p.name)];
                    if let Some(ref rate) = p.rate_limit {
                        sentence.push(format!("=rate-limit={rate}"));
                    }
                    if let Some(ref local) = p.local_address {
                        sentence.push(format!("=local-address={local}"));
                    }
                    if let Some(ref remote) = p.remote_address {
                        sentence.push(format!("=remote-address={remote}"));
                    }
                    if let Some(ref only_one) = p.only_one {
                        sentence.push(format!("=only-one={only_one}"));
                    }
                    sentence
                })
                .collect();
            sentences.push(done());
            sentences
        }

        "/ppp/active/print" => {
            let name_filter = filter_of(words, "name");
            let mut sentences: Vec<Vec<String>> = state
                .active
                .iter()
                .filter(|a| name_filter.is_none_or(|n| a.name == n))
                .map(|a| {
                    vec![
                        "!re".into(),
                        format!("=.id={}", a.id),
                        format!("=name={}", a.name),
                        format!("=address={}", a.address),
                        "=uptime=1h2m3s".into(),
                        "=service=pppoe".into(),
                    ]
                })
                .collect();
            sentences.push(done());
            sentences
        }

        "/ppp/active/remove" => {
            let Some(id) = attr_of(words, ".id") else {
                return trap("missing .id");
            };
            let Some(pos) = state.active.iter().position(|a| a.id == id) else {
                return trap("no such item");
            };
            let removed = state.active.remove(pos);
            state.kicked.push(removed.name);
            vec![done()]
        }

        "/system/resource/print" => {
            let sentence = vec![
                "!re".into(),
                format!("=cpu-load={}", state.cpu_load),
                format!("=uptime={}", state.uptime),
                format!("=version={}", state.version),
                format!("=board-name={}", state.board_name),
            ];
            vec![sentence, done()]
        }

        "/system/identity/print" => {
            let sentence = vec!["!re".into(), format!("=name={}", state.identity)];
            vec![sentence, done()]
        }

        _ => trap("no such command"),
    }
}
