//! The connection state machine and its components.
//!
//! ## Lifecycle
//!
//! 1. **Connecting** - handshake session active, upgrade request written
//!    once the transport is ready
//! 2. **Open** - frames flow, callbacks fire
//! 3. **Closing** - close handshake started, locally or by the peer
//! 4. **Closed** - terminal

mod sender;
mod state;

#[allow(clippy::module_inception)]
mod connection;

pub use connection::Connection;
pub use sender::Sender;
pub use state::State;
