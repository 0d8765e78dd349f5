mod session;
mod traits;

pub use session::{HostSession, SessionState};
pub use traits::{HostApplication, HostPlugin, HostProject};
