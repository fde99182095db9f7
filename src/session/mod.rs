//! Per-conversation sessions, the session store and idle eviction.

pub mod diagram_session;
pub mod store;
pub mod sweeper;

pub use diagram_session::{Session, SessionId, SessionState};
pub use store::{SessionHandle, SessionStore};
pub use sweeper::spawn_eviction_sweeper;
