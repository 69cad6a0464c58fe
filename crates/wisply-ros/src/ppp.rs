// PPP endpoints
//
// Typed access to the PPP domain objects the enforcement logic depends on:
// secrets (subscriber accounts), profiles (policy classes), and active
// sessions. Implemented as inherent methods on `DeviceSession`, one file
// per domain, to keep `session` focused on transport mechanics.

use tracing::debug;

use crate::command::{Command, Record};
use crate::error::Error;
use crate::session::DeviceSession;

// ── Models ──────────────────────────────────────────────────────────

/// One `/ppp/secret` entry: a router-stored subscriber account.
#[derive(Debug, Clone)]
pub struct PppSecret {
    /// Internal item id (`*1A`-style), needed for `set`.
    pub id: String,
    /// PPPoE username -- the join key to customer records.
    pub name: String,
    /// Assigned profile. RouterOS omits the attribute for the default.
    pub profile: String,
    pub service: Option<String>,
    pub remote_address: Option<String>,
    pub comment: Option<String>,
    pub disabled: bool,
}

impl PppSecret {
    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: record.id()?.to_owned(),
            name: record.require("name")?.to_owned(),
            profile: record.get("profile").unwrap_or("default").to_owned(),
            service: record.get("service").map(str::to_owned),
            remote_address: record.get("remote-address").map(str::to_owned),
            comment: record.get("comment").map(str::to_owned),
            disabled: flag(record.get("disabled")),
        })
    }
}

/// One `/ppp/profile` entry: a named policy bundle.
#[derive(Debug, Clone)]
pub struct PppProfile {
    pub name: String,
    pub rate_limit: Option<String>,
    pub local_address: Option<String>,
    pub remote_address: Option<String>,
    pub only_one: Option<String>,
}

impl PppProfile {
    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            name: record.require("name")?.to_owned(),
            rate_limit: record.get("rate-limit").map(str::to_owned),
            local_address: record.get("local-address").map(str::to_owned),
            remote_address: record.get("remote-address").map(str::to_owned),
            only_one: record.get("only-one").map(str::to_owned),
        })
    }
}

/// One `/ppp/active` entry: a currently-online PPPoE session.
#[derive(Debug, Clone)]
pub struct PppActive {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub uptime: Option<String>,
    pub service: Option<String>,
    pub caller_id: Option<String>,
}

impl PppActive {
    fn from_record(record: &Record) -> Result<Self, Error> {
        Ok(Self {
            id: record.id()?.to_owned(),
            name: record.require("name")?.to_owned(),
            address: record.get("address").map(str::to_owned),
            uptime: record.get("uptime").map(str::to_owned),
            service: record.get("service").map(str::to_owned),
            caller_id: record.get("caller-id").map(str::to_owned),
        })
    }
}

fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("true" | "yes"))
}

// ── Endpoints ───────────────────────────────────────────────────────

impl DeviceSession {
    /// List every PPP secret on the device.
    ///
    /// `/ppp/secret/print`
    pub async fn list_secrets(&mut self) -> Result<Vec<PppSecret>, Error> {
        let rows = self.query(&Command::new("/ppp/secret/print")).await?;
        debug!(peer = self.peer(), count = rows.len(), "listed PPP secrets");
        rows.iter().map(PppSecret::from_record).collect()
    }

    /// Find one PPP secret by exact, case-sensitive username.
    ///
    /// `/ppp/secret/print` with a `?name=` filter. `None` is a normal
    /// outcome (the account was never provisioned), not an error. If the
    /// device rejects the server-side filter, falls back to listing
    /// everything and matching client-side.
    pub async fn find_secret(&mut self, name: &str) -> Result<Option<PppSecret>, Error> {
        let cmd = Command::new("/ppp/secret/print").filter("name", name);
        match self.query(&cmd).await {
            Ok(rows) => rows.first().map(PppSecret::from_record).transpose(),
            Err(Error::Trap { peer, message }) => {
                debug!(peer, message, "filtered print rejected, listing all secrets");
                let all = self.list_secrets().await?;
                Ok(all.into_iter().find(|secret| secret.name == name))
            }
            Err(other) => Err(other),
        }
    }

    /// Reassign a secret to a different profile.
    ///
    /// `/ppp/secret/set` -- a clean reply does not prove the change took
    /// effect; read the secret back to verify.
    pub async fn set_secret_profile(&mut self, id: &str, profile: &str) -> Result<(), Error> {
        let cmd = Command::new("/ppp/secret/set")
            .attr(".id", id)
            .attr("profile", profile);
        self.execute(&cmd).await
    }

    /// List every PPP profile on the device.
    ///
    /// `/ppp/profile/print`
    pub async fn list_profiles(&mut self) -> Result<Vec<PppProfile>, Error> {
        let rows = self.query(&Command::new("/ppp/profile/print")).await?;
        debug!(peer = self.peer(), count = rows.len(), "listed PPP profiles");
        rows.iter().map(PppProfile::from_record).collect()
    }

    /// List currently-online PPPoE sessions.
    ///
    /// `/ppp/active/print`
    pub async fn active_sessions(&mut self) -> Result<Vec<PppActive>, Error> {
        let rows = self.query(&Command::new("/ppp/active/print")).await?;
        rows.iter().map(PppActive::from_record).collect()
    }

    /// Find the active session for a username, if one is online.
    pub async fn find_active(&mut self, name: &str) -> Result<Option<PppActive>, Error> {
        let cmd = Command::new("/ppp/active/print").filter("name", name);
        let rows = self.query(&cmd).await?;
        rows.first().map(PppActive::from_record).transpose()
    }

    /// Force-disconnect an active session so the subscriber reconnects
    /// (and picks up their current profile).
    ///
    /// `/ppp/active/remove`
    pub async fn remove_active(&mut self, id: &str) -> Result<(), Error> {
        let cmd = Command::new("/ppp/active/remove").attr(".id", id);
        self.execute(&cmd).await
    }
}
