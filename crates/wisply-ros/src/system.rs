// System endpoints
//
// Device vitals for health monitoring: resource counters and the
// configured identity.

use crate::command::Command;
use crate::error::Error;
use crate::session::DeviceSession;

/// Snapshot from `/system/resource/print`.
///
/// Every field is optional: RouterOS versions differ in what they report,
/// and a partial snapshot is still worth persisting.
#[derive(Debug, Clone, Default)]
pub struct SystemResource {
    /// CPU load percentage (0-100).
    pub cpu_load: Option<u8>,
    /// Human-readable uptime (`"2w3d7h"` style).
    pub uptime: Option<String>,
    /// Firmware version string.
    pub version: Option<String>,
    /// Hardware board model.
    pub board_name: Option<String>,
}

impl DeviceSession {
    /// Read the device resource counters.
    ///
    /// `/system/resource/print`
    pub async fn system_resource(&mut self) -> Result<SystemResource, Error> {
        let rows = self.query(&Command::new("/system/resource/print")).await?;
        let Some(record) = rows.first() else {
            return Ok(SystemResource::default());
        };
        Ok(SystemResource {
            cpu_load: record.get("cpu-load").and_then(|v| v.parse().ok()),
            uptime: record.get("uptime").map(str::to_owned),
            version: record.get("version").map(str::to_owned),
            board_name: record.get("board-name").map(str::to_owned),
        })
    }

    /// Read the configured device identity.
    ///
    /// `/system/identity/print`
    pub async fn system_identity(&mut self) -> Result<Option<String>, Error> {
        let rows = self.query(&Command::new("/system/identity/print")).await?;
        Ok(rows.first().and_then(|r| r.get("name")).map(str::to_owned))
    }
}
