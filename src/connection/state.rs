//! Connection lifecycle states.

/// Lifecycle state of a client connection.
///
/// Transitions are monotonic: `Connecting → Open → Closing → Closed`,
/// with shortcuts straight to `Closed` on handshake failure or transport
/// teardown. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// Opening handshake in progress.
    #[default]
    Connecting,
    /// Handshake complete and valid; data frames flow.
    Open,
    /// Close handshake started, waiting for it to finish.
    Closing,
    /// Terminal. Nothing is sent or dispatched any more.
    Closed,
}

impl State {
    /// Whether inbound bytes belong to the frame dispatcher in this state.
    #[must_use]
    #[inline]
    pub const fn receives_frames(&self) -> bool {
        matches!(self, State::Open | State::Closing)
    }

    /// Whether this is the terminal state.
    #[must_use]
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, State::Closed)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Connecting => "connecting",
            State::Open => "open",
            State::Closing => "closing",
            State::Closed => "closed",
        };
        write!(f, "{name}")
    }
}
