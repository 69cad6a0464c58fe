// ── Runtime configuration ──
//
// These types describe *how* the core components behave: connection
// tuning, the fallback restore profile, and the profile-name patterns
// that classify policy profiles. The CLI constructs a `CoreConfig` from
// its config file and hands it in -- core never reads files.

use std::time::Duration;

use wisply_ros::ConnectOptions;

/// Tuning and policy knobs shared by every core component.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Connection options for every device session.
    pub connect: ConnectOptions,

    /// Profile to restore on reconnect when no `previous_profile` was
    /// captured for the customer.
    pub restore_profile: String,

    /// Device-managed profiles that ProfileSync never mirrors.
    pub system_profiles: Vec<String>,

    /// Case-insensitive substrings identifying policy profiles
    /// (isolation, speed test) that ProfileSync skips. Kept as data so
    /// operators can extend the list without code changes.
    pub policy_patterns: Vec<String>,

    /// Backoff schedule for retried enforcement jobs.
    pub retry_backoff: Vec<Duration>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            connect: ConnectOptions::default(),
            restore_profile: "default".into(),
            system_profiles: vec!["default".into(), "default-encryption".into()],
            policy_patterns: vec!["isolir".into(), "speedtest".into()],
            retry_backoff: vec![
                Duration::from_secs(60),
                Duration::from_secs(180),
                Duration::from_secs(600),
            ],
        }
    }
}

impl CoreConfig {
    /// `true` if the profile name is a device-managed system profile.
    pub fn is_system_profile(&self, name: &str) -> bool {
        self.system_profiles
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }

    /// `true` if the profile name matches a configured policy pattern.
    pub fn is_policy_profile(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.policy_patterns
            .iter()
            .any(|p| lowered.contains(&p.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_patterns_match_case_insensitively() {
        let config = CoreConfig::default();
        assert!(config.is_policy_profile("ISOLIRBILLING"));
        assert!(config.is_policy_profile("SpeedTest-30M"));
        assert!(!config.is_policy_profile("Paket-20M"));
    }

    #[test]
    fn system_profiles_match_exactly() {
        let config = CoreConfig::default();
        assert!(config.is_system_profile("default"));
        assert!(config.is_system_profile("Default-Encryption"));
        assert!(!config.is_system_profile("default-10M"));
    }
}
