use codedrop_core::{ErrorKind, ServerFrame};
use futures::{SinkExt, Stream, StreamExt};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::integration::init_tracing;
use crate::utils::{SCENARIO_TIMEOUT, spawn_relay};

async fn next_frame<S>(stream: &mut S) -> ServerFrame
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(SCENARIO_TIMEOUT, stream.next())
            .await
            .expect("No frame from relay")
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Unparsable frame");
        }
    }
}

#[tokio::test]
async fn test_malformed_frames_keep_socket_open() {
    init_tracing();

    let relay = spawn_relay().await.expect("Failed to start relay");
    let (socket, _) = connect_async(relay.ws_url())
        .await
        .expect("Failed to connect");
    let (mut sink, mut stream) = socket.split();

    assert!(matches!(
        next_frame(&mut stream).await,
        ServerFrame::Welcome { .. }
    ));

    sink.send(Message::Text("definitely not json".into()))
        .await
        .expect("Send failed");
    match next_frame(&mut stream).await {
        ServerFrame::Reply { id, response } => {
            assert_eq!(id, 0);
            assert!(!response.success);
            assert_eq!(response.error, Some(ErrorKind::InvalidPayload));
        }
        other => panic!("unexpected frame {:?}", other),
    }

    sink.send(Message::Text(
        r#"{"id":5,"action":"send-offer","code":"808080","offer":"v=0"}"#.into(),
    ))
    .await
    .expect("Send failed");
    match next_frame(&mut stream).await {
        ServerFrame::Reply { id, response } => {
            assert_eq!(id, 5);
            assert!(response.success);
        }
        other => panic!("unexpected frame {:?}", other),
    }
    assert_eq!(relay.service.session_count(), 1);

    // Closing the socket releases everything the handle held
    sink.send(Message::Close(None)).await.expect("Close failed");
    drop(sink);
    drop(stream);

    let mut released = false;
    for _ in 0..50 {
        if relay.service.session_count() == 0 && relay.service.handle_count() == 0 {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(released, "relay kept state for a closed socket");

    // Cleanup
    relay.stop().await.expect("Relay failed");
}
