//! Business logic for network access enforcement and router synchronization.
//!
//! The components here own the contract between billing-driven customer
//! status and what each RouterOS device actually enforces: the
//! [`AccessEnforcer`] state machine, the [`NetworkScanner`] reconciler, the
//! [`HealthMonitor`], and [`ProfileSync`]. Device I/O goes through
//! `wisply-ros`; persistence goes through [`store`].

pub mod audit;
pub mod config;
pub mod enforcer;
pub mod error;
pub mod jobs;
pub mod model;
pub mod monitor;
pub mod profiles;
pub mod scanner;
pub mod store;

mod device;

pub use audit::{AuditReport, NetworkAudit};
pub use config::CoreConfig;
pub use enforcer::{AccessEnforcer, EnforcementOutcome};
pub use error::CoreError;
pub use jobs::{EnforcementJob, EnforcementQueue};
pub use model::{Customer, CustomerStatus, NewCustomer, NewRouter, Router, RouterProfile};
pub use monitor::{HealthMonitor, HealthReport};
pub use profiles::{ProfileSync, ProfileSyncReport};
pub use scanner::{NetworkScanner, ScanReport};
pub use store::Store;
