//! Outbound transport seam.

use crate::error::Result;

/// Byte sink exclusively owned by one connection.
///
/// Only the outbound half lives behind this trait. Inbound traffic and
/// teardown flow the other way: whatever drives the socket calls
/// [`Connection::receive_data`](crate::Connection::receive_data) and
/// [`Connection::unbind`](crate::Connection::unbind) on the reactor
/// thread.
pub trait Transport {
    /// Queue bytes for the wire. Writes are applied in call order.
    ///
    /// # Errors
    ///
    /// Fails when the transport can no longer accept writes; the reactor
    /// will follow up with a teardown notification.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the connection once all queued writes have flushed.
    fn close_after_writing(&mut self);
}
