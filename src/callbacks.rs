//! Per-event callback slots.
//!
//! The registry holds at most one handler per event kind; registering a
//! second handler for the same kind replaces the first. A missing handler
//! is not an error, the event is simply dropped.
//!
//! Every handler receives the connection's [`Sender`] as its first
//! argument, so application code can answer, ping or close from inside
//! the dispatch loop.

use crate::codec::MessageKind;
use crate::connection::Sender;

type OpenHandler<T, F> = Box<dyn FnMut(&mut Sender<T, F>)>;
type PayloadHandler<T, F> = Box<dyn FnMut(&mut Sender<T, F>, &[u8])>;
type ErrorHandler<T, F> = Box<dyn FnMut(&mut Sender<T, F>, &str)>;
type MessageHandler<T, F> = Box<dyn FnMut(&mut Sender<T, F>, &[u8], MessageKind)>;

/// One optional handler per event kind. Latest registration wins.
pub struct Callbacks<T, F> {
    open: Option<OpenHandler<T, F>>,
    close: Option<PayloadHandler<T, F>>,
    error: Option<ErrorHandler<T, F>>,
    message: Option<MessageHandler<T, F>>,
    ping: Option<PayloadHandler<T, F>>,
    pong: Option<PayloadHandler<T, F>>,
}

impl<T, F> Callbacks<T, F> {
    pub(crate) fn new() -> Self {
        Self {
            open: None,
            close: None,
            error: None,
            message: None,
            ping: None,
            pong: None,
        }
    }

    pub(crate) fn set_open(&mut self, handler: impl FnMut(&mut Sender<T, F>) + 'static) {
        self.open = Some(Box::new(handler));
    }

    pub(crate) fn set_close(&mut self, handler: impl FnMut(&mut Sender<T, F>, &[u8]) + 'static) {
        self.close = Some(Box::new(handler));
    }

    pub(crate) fn set_error(&mut self, handler: impl FnMut(&mut Sender<T, F>, &str) + 'static) {
        self.error = Some(Box::new(handler));
    }

    pub(crate) fn set_message(
        &mut self,
        handler: impl FnMut(&mut Sender<T, F>, &[u8], MessageKind) + 'static,
    ) {
        self.message = Some(Box::new(handler));
    }

    pub(crate) fn set_ping(&mut self, handler: impl FnMut(&mut Sender<T, F>, &[u8]) + 'static) {
        self.ping = Some(Box::new(handler));
    }

    pub(crate) fn set_pong(&mut self, handler: impl FnMut(&mut Sender<T, F>, &[u8]) + 'static) {
        self.pong = Some(Box::new(handler));
    }

    pub(crate) fn open(&mut self, sender: &mut Sender<T, F>) {
        if let Some(handler) = self.open.as_mut() {
            handler(sender);
        }
    }

    pub(crate) fn close(&mut self, sender: &mut Sender<T, F>, payload: &[u8]) {
        if let Some(handler) = self.close.as_mut() {
            handler(sender, payload);
        }
    }

    pub(crate) fn error(&mut self, sender: &mut Sender<T, F>, message: &str) {
        if let Some(handler) = self.error.as_mut() {
            handler(sender, message);
        }
    }

    pub(crate) fn message(&mut self, sender: &mut Sender<T, F>, payload: &[u8], kind: MessageKind) {
        if let Some(handler) = self.message.as_mut() {
            handler(sender, payload, kind);
        }
    }

    pub(crate) fn ping(&mut self, sender: &mut Sender<T, F>, payload: &[u8]) {
        if let Some(handler) = self.ping.as_mut() {
            handler(sender, payload);
        }
    }

    pub(crate) fn pong(&mut self, sender: &mut Sender<T, F>, payload: &[u8]) {
        if let Some(handler) = self.pong.as_mut() {
            handler(sender, payload);
        }
    }
}

impl<T, F> Default for Callbacks<T, F> {
    fn default() -> Self {
        Self::new()
    }
}
