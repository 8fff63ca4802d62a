use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async, connect_async, WebSocketStream};
use vocalis_relay::config::UpstreamSettings;
use vocalis_relay::{create_router, AppState};

const RESULTS_FRAME: &str =
    r#"{"type":"Results","is_final":false,"channel":{"alternatives":[{"transcript":"I wa"}]}}"#;
const METADATA_FRAME: &str = r#"{"type":"Metadata","request_id":"abc"}"#;

/// Serve the relay on an ephemeral port, pointed at the given recognizer URL.
async fn start_relay(upstream_url: &str) -> SocketAddr {
    let settings = UpstreamSettings {
        url: upstream_url.to_string(),
        ..UpstreamSettings::default()
    };
    let state = AppState::new(settings, "test-key".to_string());
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    addr
}

/// Bind a fake recognizer endpoint; returns its URL and the listener for the
/// test to accept on.
async fn fake_upstream() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/v1/listen", listener.local_addr().unwrap());
    (url, listener)
}

async fn accept_upstream(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn connect_client(
    relay: SocketAddr,
) -> WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>> {
    let (client, _) = connect_async(format!("ws://{relay}/realtime"))
        .await
        .expect("client connects to relay");
    client
}

#[tokio::test]
async fn test_audio_forwarded_and_results_relayed_verbatim() {
    let (upstream_url, listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    let upstream = tokio::spawn(async move {
        let mut ws = accept_upstream(&listener).await;

        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match frame {
            Message::Binary(bytes) => assert_eq!(bytes.to_vec(), vec![1u8, 2, 3, 4]),
            other => panic!("expected audio chunk, got {other:?}"),
        }

        ws.send(Message::Text(RESULTS_FRAME.into())).await.unwrap();
        // Hold the connection open until the test finishes with it.
        let _ = timeout(Duration::from_secs(5), ws.next()).await;
    });

    let mut client = connect_client(relay).await;
    client
        .send(Message::Binary(vec![1u8, 2, 3, 4].into()))
        .await
        .unwrap();

    let relayed = timeout(Duration::from_secs(5), client.next())
        .await
        .expect("result relayed")
        .unwrap()
        .unwrap();
    match relayed {
        Message::Text(text) => assert_eq!(text.as_str(), RESULTS_FRAME),
        other => panic!("expected text frame, got {other:?}"),
    }

    client.close(None).await.unwrap();
    upstream.await.unwrap();
}

#[tokio::test]
async fn test_upstream_credential_attached_server_side() {
    let (upstream_url, listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    let auth = Arc::new(Mutex::new(None::<String>));
    let seen = Arc::clone(&auth);
    let upstream = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_hdr_async(stream, |req: &Request, resp: Response| {
            *seen.lock().unwrap() = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            Ok(resp)
        })
        .await
        .unwrap();
        let _ = timeout(Duration::from_secs(5), ws.next()).await;
    });

    let mut client = connect_client(relay).await;
    // Give the relay time to finish its upstream handshake.
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.close(None).await.unwrap();
    upstream.await.unwrap();

    assert_eq!(auth.lock().unwrap().as_deref(), Some("Token test-key"));
}

#[tokio::test]
async fn test_non_results_frames_are_not_relayed() {
    let (upstream_url, listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    let upstream = tokio::spawn(async move {
        let mut ws = accept_upstream(&listener).await;
        ws.send(Message::Text(METADATA_FRAME.into())).await.unwrap();
        ws.send(Message::Text(RESULTS_FRAME.into())).await.unwrap();
        let _ = timeout(Duration::from_secs(5), ws.next()).await;
    });

    let mut client = connect_client(relay).await;

    // The metadata frame is dropped; the first thing the client sees is
    // the Results frame sent after it.
    let relayed = timeout(Duration::from_secs(5), client.next())
        .await
        .expect("result relayed")
        .unwrap()
        .unwrap();
    match relayed {
        Message::Text(text) => assert_eq!(text.as_str(), RESULTS_FRAME),
        other => panic!("expected text frame, got {other:?}"),
    }

    client.close(None).await.unwrap();
    upstream.await.unwrap();
}

#[tokio::test]
async fn test_upstream_close_ends_client_session() {
    let (upstream_url, listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    let upstream = tokio::spawn(async move {
        let mut ws = accept_upstream(&listener).await;
        ws.close(None).await.unwrap();
    });

    let mut client = connect_client(relay).await;
    upstream.await.unwrap();

    let next = timeout(Duration::from_secs(5), client.next())
        .await
        .expect("client session ends");
    assert!(matches!(next, Some(Ok(Message::Close(_))) | None));
}

#[tokio::test]
async fn test_client_close_ends_upstream_session() {
    let (upstream_url, listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    let upstream = tokio::spawn(async move {
        let mut ws = accept_upstream(&listener).await;
        loop {
            match timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("upstream session ends")
            {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            }
        }
    });

    let mut client = connect_client(relay).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.close(None).await.unwrap();

    upstream.await.unwrap();
}

#[tokio::test]
async fn test_client_close_before_upstream_opens() {
    let (upstream_url, listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    let upstream = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Hold the handshake back until the client is already gone.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut ws = accept_async(stream).await.unwrap();
        loop {
            match timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("upstream session ends")
            {
                Some(Ok(Message::Binary(_))) => panic!("audio forwarded after client close"),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            }
        }
    });

    let mut client = connect_client(relay).await;
    client.close(None).await.unwrap();

    // The relay still completes its upstream handshake, then immediately
    // closes that leg without ever sending audio.
    upstream.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_upstream_closes_client() {
    // Grab a free port, then release it so nothing is listening there.
    let parked = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("ws://{}/v1/listen", parked.local_addr().unwrap());
    drop(parked);

    let relay = start_relay(&dead_url).await;
    let mut client = connect_client(relay).await;

    let next = timeout(Duration::from_secs(5), client.next())
        .await
        .expect("client closed after upstream failure");
    assert!(matches!(next, Some(Ok(Message::Close(_))) | None));
}

#[tokio::test]
async fn test_unknown_path_is_rejected() {
    let (upstream_url, _listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    assert!(connect_async(format!("ws://{relay}/other")).await.is_err());

    let status = reqwest::get(format!("http://{relay}/other"))
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (upstream_url, _listener) = fake_upstream().await;
    let relay = start_relay(&upstream_url).await;

    let response = reqwest::get(format!("http://{relay}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}
