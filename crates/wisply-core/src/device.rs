// Session acquisition: one explicit, scoped session per operation.

use wisply_ros::DeviceSession;

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::model::Router;

/// Open an authenticated session to a router, wrapping device errors with
/// the router's name for per-router failure reporting.
pub(crate) async fn open_session(
    router: &Router,
    config: &CoreConfig,
) -> Result<DeviceSession, CoreError> {
    DeviceSession::connect(
        &router.address,
        router.port,
        &router.username,
        &router.password,
        &config.connect,
    )
    .await
    .map_err(|e| CoreError::from_device(&router.name, e))
}
