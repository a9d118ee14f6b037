//! WebSocket connection lifecycle: authentication, handles, pool and close codes.

pub mod authenticator;
pub mod close;
pub mod handle;
pub mod pool;

pub use authenticator::{AuthenticatedUser, WsAuthenticator};
pub use close::CloseReason;
pub use handle::{ConnectionHandle, ConnectionIdentity, Frame};
pub use pool::ConnectionPool;
