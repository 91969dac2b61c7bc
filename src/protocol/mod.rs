//! Bundled RFC 6455 protocol implementations of the codec seams.
//!
//! These are the default collaborators a [`Connection`](crate::Connection)
//! is wired with: [`Rfc6455Codec`] for framing, [`Rfc6455Handshake`] for
//! the HTTP upgrade. Both plug into the traits in [`crate::codec`], so a
//! connection can just as well be driven with replacements.

pub mod handshake;
pub mod incoming;
pub mod rfc6455;

pub(crate) mod frame;
pub(crate) mod mask;

pub use handshake::{Rfc6455Handshake, Rfc6455Session, compute_accept_key};
pub use incoming::IncomingFrames;
pub use rfc6455::Rfc6455Codec;
