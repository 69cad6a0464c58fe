use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use strum::{Display, EnumString};

/// Canonical customer lifecycle status.
///
/// Earlier schema generations used `suspended`/`offboarding` for what are
/// now `isolated`/`terminated`; the legacy spellings are accepted when
/// parsing (so old rows keep loading) but only canonical values are ever
/// written back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    /// Intake complete, NOC has not provisioned the account yet. No
    /// enforcement action expected.
    PendingInstallation,
    /// Unrestricted profile on the router.
    Active,
    /// Assigned to the router's isolation profile.
    #[strum(to_string = "isolated", serialize = "suspended")]
    #[serde(alias = "suspended")]
    Isolated,
    /// No longer a customer; session killed best-effort.
    #[strum(to_string = "terminated", serialize = "offboarding")]
    #[serde(alias = "offboarding")]
    Terminated,
}

/// A subscriber record. `pppoe_user` is unique across the system and is
/// the join key to router state.
///
/// `status` and `previous_profile` are mutated exclusively by the
/// enforcer -- hand-setting `isolated` would leave `previous_profile`
/// stale. `router_id` is assigned by the scanner.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub pppoe_user: String,
    pub pppoe_pass: Option<SecretString>,
    pub status: CustomerStatus,
    pub router_id: Option<i64>,
    /// Profile the secret had before isolation, restored verbatim on
    /// reconnect instead of guessing a default.
    pub previous_profile: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for Customer {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse()
            .map_err(|e: strum::ParseError| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: Box::new(e),
            })?;
        let pppoe_pass: Option<String> = row.try_get("pppoe_pass")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            pppoe_user: row.try_get("pppoe_user")?,
            pppoe_pass: pppoe_pass.map(SecretString::from),
            status,
            router_id: row.try_get("router_id")?,
            previous_profile: row.try_get("previous_profile")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Fields needed to create a customer (intake or import).
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub pppoe_user: String,
    pub pppoe_pass: Option<SecretString>,
    pub status: CustomerStatus,
    pub router_id: Option<i64>,
}

impl NewCustomer {
    /// A freshly-intaken customer awaiting NOC provisioning.
    pub fn pending(name: &str, pppoe_user: &str) -> Self {
        Self {
            name: name.to_owned(),
            pppoe_user: pppoe_user.to_owned(),
            pppoe_pass: None,
            status: CustomerStatus::PendingInstallation,
            router_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_round_trip() {
        for (status, text) in [
            (CustomerStatus::PendingInstallation, "pending_installation"),
            (CustomerStatus::Active, "active"),
            (CustomerStatus::Isolated, "isolated"),
            (CustomerStatus::Terminated, "terminated"),
        ] {
            assert_eq!(status.to_string(), text);
            assert_eq!(text.parse::<CustomerStatus>().unwrap(), status);
        }
    }

    #[test]
    fn legacy_spellings_map_to_canonical() {
        assert_eq!(
            "suspended".parse::<CustomerStatus>().unwrap(),
            CustomerStatus::Isolated
        );
        assert_eq!(
            "offboarding".parse::<CustomerStatus>().unwrap(),
            CustomerStatus::Terminated
        );
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert!("limbo".parse::<CustomerStatus>().is_err());
    }
}
