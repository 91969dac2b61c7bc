//! End-to-end run of the tokio driver against an in-process server.
#![cfg(feature = "async-tokio")]

mod common;

use common::decode_client_frames;

use std::cell::RefCell;
use std::rc::Rc;

use evws::{ConnectConfig, compute_accept_key};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal scripted server: handshake, echo one text frame, then close.
async fn run_server(listener: TcpListener) -> Vec<u8> {
    let (mut stream, _) = listener.accept().await.unwrap();

    // read the upgrade request
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "client hung up during handshake");
        request.extend_from_slice(&buf[..n]);
    }
    let request_text = String::from_utf8(request).unwrap();
    let key = request_text
        .lines()
        .find_map(|line| line.strip_prefix("Sec-WebSocket-Key: "))
        .expect("client request carries a key");

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\
         \r\n",
        compute_accept_key(key)
    );
    stream.write_all(response.as_bytes()).await.unwrap();

    // client text frame "hello": 2 header + 4 mask + 5 payload
    let mut frame = [0u8; 11];
    stream.read_exact(&mut frame).await.unwrap();
    let frames = decode_client_frames(&frame);
    assert_eq!(frames[0].0, 0x1);
    let echoed = frames[0].1.clone();

    // echo it unmasked, then start the close handshake
    let mut reply = vec![0x81, echoed.len() as u8];
    reply.extend_from_slice(&echoed);
    reply.extend_from_slice(&[0x88, 0x05, 0x03, 0xE8, b'b', b'y', b'e']);
    stream.write_all(&reply).await.unwrap();

    // the client echoes the close frame back: 2 + 4 + 5 bytes
    let mut close_echo = [0u8; 11];
    stream.read_exact(&mut close_echo).await.unwrap();
    let frames = decode_client_frames(&close_echo);
    assert_eq!(frames[0].0, 0x8);
    frames[0].1.clone()
}

#[tokio::test]
async fn driver_runs_a_connection_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(run_server(listener));

    let config = ConnectConfig::new("127.0.0.1").with_port(port);
    let (mut conn, driver) = evws::driver::client(config).unwrap();

    let log: Rc<RefCell<Vec<String>>> = Rc::default();

    let events = log.clone();
    conn.on_open(move |sender| {
        events.borrow_mut().push("open".into());
        assert!(sender.send_text("hello"));
    });
    let events = log.clone();
    conn.on_message(move |_, payload, _| {
        events
            .borrow_mut()
            .push(format!("message:{}", String::from_utf8_lossy(payload)));
    });
    let events = log.clone();
    conn.on_close(move |_, payload| {
        events
            .borrow_mut()
            .push(format!("close:{}", String::from_utf8_lossy(&payload[2..])));
    });

    driver.run(&mut conn).await.unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["open", "message:hello", "close:bye"],
        "full lifecycle observed in order"
    );

    let close_echo = server.await.unwrap();
    assert_eq!(u16::from_be_bytes([close_echo[0], close_echo[1]]), 1000);
    assert_eq!(&close_echo[2..], b"bye");
}
