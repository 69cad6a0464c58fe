//! RouterOS binary API client: word codec, sentences, sessions, and typed
//! PPP/system endpoints. `wisply-core` maps the errors into domain terms.

pub mod command;
pub mod error;
pub mod ppp;
pub mod session;
pub mod system;

mod proto;

#[cfg(feature = "testing")]
pub mod testing;

pub use command::{Command, Record};
pub use error::Error;
pub use session::{ConnectOptions, DeviceSession};
