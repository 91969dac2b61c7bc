//! Shared test harness: a recording transport, an event log and frame
//! helpers for playing the server side by hand.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use evws::{
    ConnectConfig, Connection, FrameCodec, HandshakeCodec, MessageKind, Result, Rfc6455Codec,
    Rfc6455Handshake, Transport, compute_accept_key,
};

/// Transport that records written bytes and the close request.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub written: Rc<RefCell<Vec<u8>>>,
    pub closed: Rc<Cell<bool>>,
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.written.borrow_mut().extend_from_slice(bytes);
        Ok(())
    }

    fn close_after_writing(&mut self) {
        self.closed.set(true);
    }
}

impl MockTransport {
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.borrow_mut())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Close(Vec<u8>),
    Error(String),
    Message(Vec<u8>, bool), // payload, is_text
    Ping(Vec<u8>),
    Pong(Vec<u8>),
}

pub type Events = Rc<RefCell<Vec<Event>>>;

pub type TestConnection = Connection<MockTransport, Rfc6455Codec, Rfc6455Handshake>;

/// Wire every callback slot to the shared event log.
pub fn record_events<T, F, H>(conn: &mut Connection<T, F, H>) -> Events
where
    T: Transport,
    F: FrameCodec,
    H: HandshakeCodec,
{
    let events: Events = Rc::default();

    let log = events.clone();
    conn.on_open(move |_| log.borrow_mut().push(Event::Open));
    let log = events.clone();
    conn.on_close(move |_, payload| log.borrow_mut().push(Event::Close(payload.to_vec())));
    let log = events.clone();
    conn.on_error(move |_, message| log.borrow_mut().push(Event::Error(message.to_string())));
    let log = events.clone();
    conn.on_message(move |_, payload, kind| {
        log.borrow_mut()
            .push(Event::Message(payload.to_vec(), kind == MessageKind::Text));
    });
    let log = events.clone();
    conn.on_ping(move |_, payload| log.borrow_mut().push(Event::Ping(payload.to_vec())));
    let log = events.clone();
    conn.on_pong(move |_, payload| log.borrow_mut().push(Event::Pong(payload.to_vec())));

    events
}

/// Create a connecting connection with a recording transport.
pub fn new_connection(config: ConnectConfig) -> (TestConnection, MockTransport) {
    let transport = MockTransport::default();
    let frame_codec = Rfc6455Codec::new(config.limits.clone());
    let conn = Connection::new(transport.clone(), frame_codec, &Rfc6455Handshake, config)
        .expect("session from default config");
    (conn, transport)
}

/// Pull the request key out of the written upgrade request.
pub fn request_key(transport: &MockTransport) -> String {
    let written = transport.written.borrow();
    let request = std::str::from_utf8(&written).expect("upgrade request is ASCII");
    request
        .lines()
        .find_map(|line| line.strip_prefix("Sec-WebSocket-Key: "))
        .expect("request carries a key")
        .to_string()
}

/// A valid 101 response matching the connection's request key.
pub fn valid_response(transport: &MockTransport) -> Vec<u8> {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        compute_accept_key(&request_key(transport))
    )
    .into_bytes()
}

/// Drive the connection through TCP-established and a valid handshake.
pub fn open_connection(conn: &mut TestConnection, transport: &MockTransport) {
    conn.connection_completed();
    let response = valid_response(transport);
    transport.take_written();
    conn.receive_data(&response);
    assert!(conn.is_open(), "handshake should have opened the connection");
}

/// Build a server-side (unmasked) frame; payloads up to 125 bytes.
pub fn server_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() <= 125, "test helper handles short frames only");
    let mut frame = vec![0x80 | opcode, payload.len() as u8];
    frame.extend_from_slice(payload);
    frame
}

pub fn server_text(payload: &[u8]) -> Vec<u8> {
    server_frame(0x1, payload)
}

pub fn server_binary(payload: &[u8]) -> Vec<u8> {
    server_frame(0x2, payload)
}

pub fn server_close(code: u16, reason: &[u8]) -> Vec<u8> {
    let mut payload = code.to_be_bytes().to_vec();
    payload.extend_from_slice(reason);
    server_frame(0x8, &payload)
}

pub fn server_ping(payload: &[u8]) -> Vec<u8> {
    server_frame(0x9, payload)
}

pub fn server_pong(payload: &[u8]) -> Vec<u8> {
    server_frame(0xA, payload)
}

/// Decode the client frames (masked, short or 16-bit lengths) from a
/// written byte run into (opcode, payload) pairs.
pub fn decode_client_frames(mut bytes: &[u8]) -> Vec<(u8, Vec<u8>)> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        assert!(bytes.len() >= 2, "truncated client frame header");
        let opcode = bytes[0] & 0x0F;
        assert!(bytes[1] & 0x80 != 0, "client frames must be masked");
        let (len, header) = match bytes[1] & 0x7F {
            126 => (u16::from_be_bytes([bytes[2], bytes[3]]) as usize, 4),
            127 => panic!("test helper does not handle 64-bit lengths"),
            n => (n as usize, 2),
        };
        let mask = [
            bytes[header],
            bytes[header + 1],
            bytes[header + 2],
            bytes[header + 3],
        ];
        let start = header + 4;
        let mut payload = bytes[start..start + len].to_vec();
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
        }
        frames.push((opcode, payload));
        bytes = &bytes[start + len..];
    }
    frames
}
