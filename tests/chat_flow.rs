use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use chat_socket::config::ServerConfig;
use chat_socket::encoder::encode_rfc_masked;
use chat_socket::hub;
use chat_socket::server::start_server_with_config;

const MASK: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

// long enough for the hub to have drained its event queue on a loaded CI box
const SETTLE: Duration = Duration::from_millis(200);

async fn spawn_broker(port: u16) {
    let config = ServerConfig {
        port,
        ..ServerConfig::default()
    };
    let events = start_server_with_config(config.clone())
        .await
        .expect("bind test listener");
    tokio::spawn(hub::run(events, config));
}

async fn connect_rfc(port: u16) -> TcpStream {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let request = format!(
        "GET / HTTP/1.1\r\n\
         Host: 127.0.0.1:{port}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let response = read_http_response(&mut stream).await;
    assert!(response.starts_with("HTTP/1.1 101"), "{response}");
    assert!(response.contains("s3pPLMBiTxaQ9kYGzzhZRbK+xOo="), "{response}");
    stream
}

async fn read_http_response(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        let read = stream.read(&mut byte).await.unwrap();
        assert!(read > 0, "peer closed during the handshake");
        buf.push(byte[0]);
    }
    String::from_utf8(buf).unwrap()
}

async fn send_text(stream: &mut TcpStream, text: &str) {
    stream
        .write_all(&encode_rfc_masked(text.as_bytes(), MASK))
        .await
        .unwrap();
}

// Server frames in these tests are unmasked text with short payloads.
async fn recv_text(stream: &mut TcpStream) -> String {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0], 0x81);
    let len = (header[1] & 0x7f) as usize;
    assert!(len <= 125, "test payloads stay below the extended forms");
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    String::from_utf8(payload).unwrap()
}

async fn assert_silent(stream: &mut TcpStream) {
    let mut probe = [0u8; 1];
    let read = timeout(Duration::from_millis(300), stream.read(&mut probe)).await;
    assert!(read.is_err(), "unexpected bytes arrived");
}

#[tokio::test]
async fn broadcast_reaches_other_peers_only() {
    spawn_broker(9301).await;
    let mut c1 = connect_rfc(9301).await;
    let mut c2 = connect_rfc(9301).await;
    let mut c3 = connect_rfc(9301).await;
    sleep(SETTLE).await;

    send_text(&mut c1, r#"{"user":"ada","msg":"hello there"}"#).await;

    assert_eq!(recv_text(&mut c2).await, r#"{"user":"ada","msg":"hello there"}"#);
    assert_eq!(recv_text(&mut c3).await, r#"{"user":"ada","msg":"hello there"}"#);
    // the sender never sees its own message back
    assert_silent(&mut c1).await;
}

#[tokio::test]
async fn history_request_replays_backlog_chronologically() {
    spawn_broker(9302).await;
    let mut c1 = connect_rfc(9302).await;
    let mut c2 = connect_rfc(9302).await;
    sleep(SETTLE).await;

    send_text(&mut c1, r#"{"msg":"first"}"#).await;
    assert_eq!(recv_text(&mut c2).await, r#"{"msg":"first"}"#);
    send_text(&mut c1, r#"{"msg":"second"}"#).await;
    assert_eq!(recv_text(&mut c2).await, r#"{"msg":"second"}"#);

    send_text(&mut c2, r#"{"cmd":"getList"}"#).await;
    // oldest first on the wire, to the requester only
    assert_eq!(recv_text(&mut c2).await, r#"{"msg":"first"}"#);
    assert_eq!(recv_text(&mut c2).await, r#"{"msg":"second"}"#);
    assert_silent(&mut c1).await;
}

#[tokio::test]
async fn dead_peer_does_not_interrupt_fanout() {
    spawn_broker(9303).await;
    let mut c1 = connect_rfc(9303).await;
    let c2 = connect_rfc(9303).await;
    let mut c3 = connect_rfc(9303).await;
    sleep(SETTLE).await;

    drop(c2);
    send_text(&mut c1, r#"{"msg":"still flowing"}"#).await;

    assert_eq!(recv_text(&mut c3).await, r#"{"msg":"still flowing"}"#);
}

#[tokio::test]
async fn non_json_payloads_are_dropped() {
    spawn_broker(9304).await;
    let mut c1 = connect_rfc(9304).await;
    let mut c2 = connect_rfc(9304).await;
    sleep(SETTLE).await;

    send_text(&mut c1, "not json at all").await;
    assert_silent(&mut c2).await;

    // the connection stays usable afterwards
    send_text(&mut c1, r#"{"msg":"back to normal"}"#).await;
    assert_eq!(recv_text(&mut c2).await, r#"{"msg":"back to normal"}"#);
}

#[tokio::test]
async fn missing_upgrade_header_is_rejected_without_a_101() {
    spawn_broker(9305).await;
    let mut stream = TcpStream::connect(("127.0.0.1", 9305)).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: 127.0.0.1:9305\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();

    let mut buf = Vec::new();
    let read = timeout(Duration::from_secs(2), stream.read_to_end(&mut buf))
        .await
        .expect("server should close the socket")
        .unwrap();
    assert_eq!(read, 0);
    assert!(buf.is_empty());
}

#[tokio::test]
async fn hixie_client_interops_with_rfc_peers() {
    spawn_broker(9306).await;
    let mut rfc = connect_rfc(9306).await;

    let mut hixie = TcpStream::connect(("127.0.0.1", 9306)).await.unwrap();
    // the worked example from the draft-76 handshake
    let request = "GET / HTTP/1.1\r\n\
         Host: 127.0.0.1:9306\r\n\
         Origin: http://example.com\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key1: 4 @1  46546xW%0l 1 5\r\n\
         Sec-WebSocket-Key2: 12998 5 Y3 1  .P00\r\n\
         \r\n";
    hixie.write_all(request.as_bytes()).await.unwrap();
    hixie.write_all(b"^n:ds[4U").await.unwrap();

    let response = read_http_response(&mut hixie).await;
    assert!(response.starts_with("HTTP/1.1 101"), "{response}");
    assert!(
        response.contains("Sec-WebSocket-Location: ws://127.0.0.1:9306/"),
        "{response}"
    );
    let mut digest = [0u8; 16];
    hixie.read_exact(&mut digest).await.unwrap();
    assert_eq!(&digest, b"8jKS'y:G*Co,Wxa-");
    sleep(SETTLE).await;

    // a draft-76 frame from the legacy client fans out to the RFC peer
    hixie
        .write_all(b"\xff{\"msg\":\"from the past\"}\x00")
        .await
        .unwrap();
    assert_eq!(recv_text(&mut rfc).await, r#"{"msg":"from the past"}"#);

    // and an RFC broadcast comes back 0xFF-framed
    send_text(&mut rfc, r#"{"msg":"hi old timer"}"#).await;
    let mut lead = [0u8; 1];
    hixie.read_exact(&mut lead).await.unwrap();
    assert_eq!(lead[0], 0xff);
    let mut body = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        hixie.read_exact(&mut byte).await.unwrap();
        if byte[0] == 0x00 {
            break;
        }
        body.push(byte[0]);
    }
    assert_eq!(body, br#"{"msg":"hi old timer"}"#.to_vec());
}
