use std::sync::LazyLock;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;
use weather_chat_test_transport::{PresetChunk, PresetResponse, TestTransport};
use weather_chat_transport::{
    ChatRequest, ChatTransport, ChatTurn, ModelParams,
};

use super::*;
use crate::message::Message;

const TIMEOUT: Duration = Duration::from_secs(1);

static REQUEST: LazyLock<ChatRequest> = LazyLock::new(|| ChatRequest {
    messages: vec![ChatTurn::user("Weather in Lisbon?")],
    thread_id: "test".to_owned(),
    params: ModelParams::default(),
});

/// Opens a session on the next scripted response of `transport`.
fn open_session(
    transport: &TestTransport,
    config: SessionConfig,
) -> (
    StreamSession<
        impl Future<
            Output = Result<
                weather_chat_test_transport::TestChunkStream,
                weather_chat_test_transport::Error,
            >,
        > + Send
        + 'static,
    >,
    SessionHandle,
    ConversationStore,
) {
    let store = ConversationStore::new();
    let message_id = store.append(Message::placeholder());
    // The returned future may borrow the request, so it must outlive it.
    let open = transport.open(&REQUEST);
    let (session, handle) =
        StreamSession::new(open, store.clone(), message_id, config);
    (session, handle, store)
}

async fn run_chunks(
    chunks: Vec<PresetChunk>,
    config: SessionConfig,
) -> (SessionStatus, Message) {
    let transport = TestTransport::default();
    transport.add_response(PresetResponse::with_chunks(chunks));
    let (session, handle, store) = open_session(&transport, config);
    let status = timeout(TIMEOUT, session.run()).await.unwrap();
    assert_eq!(handle.status(), status);
    (status, store.get(handle.message_id()).unwrap())
}

#[tokio::test]
async fn test_single_chunk() {
    let (status, msg) = run_chunks(
        vec![PresetChunk::text(
            "data: Hello\ndata: World\ndata: [DONE]\n",
        )],
        SessionConfig::default(),
    )
    .await;
    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(msg.content(), "HelloWorld");
    assert!(!msg.is_streaming());
    assert!(!msg.is_error());
}

#[tokio::test]
async fn test_byte_by_byte() {
    let body = "data: Hello\ndata: World\ndata: [DONE]\n";
    let chunks = body
        .as_bytes()
        .iter()
        .map(|b| PresetChunk::Data(Bytes::copy_from_slice(&[*b])))
        .collect();
    let (status, msg) = run_chunks(chunks, SessionConfig::default()).await;
    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(msg.content(), "HelloWorld");
    assert!(!msg.is_streaming());
}

#[tokio::test]
async fn test_envelopes_and_malformed_lines() {
    let (status, msg) = run_chunks(
        vec![
            PresetChunk::text(
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            ),
            PresetChunk::text(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
            ),
            PresetChunk::text("data: {not json\n: ping\n\n"),
            PresetChunk::text(
                "data: {\"choices\":[{\"delta\":{\"content\":\", 18°C\"}}]}\n",
            ),
            PresetChunk::text("data: [DONE]\n"),
        ],
        SessionConfig::default(),
    )
    .await;
    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(msg.content(), "Hi, 18°C");
}

#[tokio::test]
async fn test_closure_without_sentinel() {
    let (status, msg) = run_chunks(
        vec![PresetChunk::text("data: Foggy\ndata: cut o")],
        SessionConfig::default(),
    )
    .await;
    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(msg.content(), "Foggy");
    assert!(!msg.is_streaming());
}

#[tokio::test]
async fn test_trailing_data_after_done_is_ignored() {
    let (status, msg) = run_chunks(
        vec![
            PresetChunk::text("data: Dry\ndata: [DONE]\ndata: Wet\n"),
            PresetChunk::text("data: Wetter\n"),
        ],
        SessionConfig::default(),
    )
    .await;
    assert_eq!(status, SessionStatus::Completed);
    assert_eq!(msg.content(), "Dry");
}

#[tokio::test]
async fn test_transport_rejected() {
    let transport = TestTransport::default();
    transport.add_response(PresetResponse::rejected(503));
    let (session, handle, store) =
        open_session(&transport, SessionConfig::default());
    let status = timeout(TIMEOUT, session.run()).await.unwrap();

    assert_eq!(status, SessionStatus::Failed(FailureKind::TransportRejected));
    let msg = store.get(handle.message_id()).unwrap();
    assert_eq!(
        msg.content(),
        "Sorry, I'm having trouble connecting. Please try again."
    );
    assert!(msg.is_error());
    assert!(!msg.is_streaming());
}

#[tokio::test]
async fn test_read_error_keeps_partial_content() {
    let (status, msg) = run_chunks(
        vec![PresetChunk::text("data: Partly\n"), PresetChunk::Fail],
        SessionConfig::default(),
    )
    .await;
    assert_eq!(status, SessionStatus::Failed(FailureKind::StreamRead));
    assert_eq!(msg.content(), "Partly");
    assert!(!msg.is_error());
    assert!(!msg.is_streaming());
}

#[tokio::test]
async fn test_read_error_without_content() {
    let (status, msg) = run_chunks(
        vec![PresetChunk::text(": hello\n"), PresetChunk::Fail],
        SessionConfig::default().with_stream_failure_text("Broken."),
    )
    .await;
    assert_eq!(status, SessionStatus::Failed(FailureKind::StreamRead));
    assert_eq!(msg.content(), "Broken.");
    assert!(msg.is_error());
}

#[tokio::test]
async fn test_frame_too_large() {
    let (status, msg) = run_chunks(
        vec![
            PresetChunk::text("data: ok\n"),
            PresetChunk::text("data: this line never ends"),
            PresetChunk::text(" and keeps going"),
        ],
        SessionConfig::default().with_max_line_len(16),
    )
    .await;
    assert_eq!(status, SessionStatus::Failed(FailureKind::FrameTooLarge));
    assert_eq!(msg.content(), "ok");
    assert!(!msg.is_error());
    assert!(!msg.is_streaming());
}

#[tokio::test]
async fn test_cancel_mid_stream() {
    let transport = TestTransport::default();
    let (resp, feeder) = PresetResponse::manual();
    transport.add_response(resp);
    let (session, handle, store) =
        open_session(&transport, SessionConfig::default());
    let task = tokio::spawn(session.run());

    feeder.send_text("data: Hello\n");
    let mut store_rx = store.subscribe();
    timeout(TIMEOUT, store_rx.wait_for(|msgs| msgs[0].content() == "Hello"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handle.status(), SessionStatus::Streaming);

    assert!(handle.cancel());
    let msg = store.get(handle.message_id()).unwrap();
    assert_eq!(msg.content(), "Hello");
    assert!(!msg.is_streaming());
    assert!(!msg.is_error());

    // Anything that still arrives is dropped.
    feeder.send_text("data: , world\ndata: [DONE]\n");
    let status = timeout(TIMEOUT, task).await.unwrap().unwrap();
    assert_eq!(status, SessionStatus::Cancelled);
    assert_eq!(store.get(handle.message_id()).unwrap(), msg);

    // The body has been abandoned.
    assert!(feeder.is_closed());

    // Cancelling again is a no-op.
    assert!(!handle.cancel());
    assert_eq!(handle.finished().await, SessionStatus::Cancelled);
    assert_eq!(store.get(handle.message_id()).unwrap(), msg);
}

#[test]
fn test_cancel_drops_buffered_records() {
    let store = ConversationStore::new();
    let message_id = store.append(Message::placeholder());
    let (session, handle) = StreamSession::new(
        (),
        store.clone(),
        message_id,
        SessionConfig::default(),
    );

    let mut decoder = FrameDecoder::default();
    decoder.push(b"data: one\n");
    let flow = ingest(&session.shared, &mut decoder, &session.config);
    assert!(flow.is_continue());

    // Cancel with more records already sitting in the buffer.
    decoder.push(b"data: two\ndata: three\n");
    assert!(handle.cancel());
    assert!(ingest(&session.shared, &mut decoder, &session.config).is_break());

    let msg = store.get(message_id).unwrap();
    assert_eq!(msg.content(), "one");
    assert!(!msg.is_streaming());
    assert_eq!(handle.status(), SessionStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_while_opening() {
    let mut transport = TestTransport::default();
    transport.set_open_delay(Duration::from_secs(60));
    transport.add_response(PresetResponse::with_chunks([PresetChunk::text(
        "data: late\n",
    )]));
    let (session, handle, store) =
        open_session(&transport, SessionConfig::default());
    let task = tokio::spawn(session.run());
    tokio::task::yield_now().await;
    assert_eq!(handle.status(), SessionStatus::Opening);

    assert!(handle.cancel());
    let status = timeout(TIMEOUT, task).await.unwrap().unwrap();
    assert_eq!(status, SessionStatus::Cancelled);
    let msg = store.get(handle.message_id()).unwrap();
    assert_eq!(msg.content(), "");
    assert!(!msg.is_streaming());
}

#[tokio::test]
async fn test_cancel_after_completion_is_noop() {
    let transport = TestTransport::default();
    transport.add_response(PresetResponse::with_chunks([PresetChunk::text(
        "data: Clear skies\ndata: [DONE]\n",
    )]));
    let (session, handle, store) =
        open_session(&transport, SessionConfig::default());
    let waiter = tokio::spawn({
        let handle = handle.clone();
        async move { handle.finished().await }
    });
    timeout(TIMEOUT, session.run()).await.unwrap();
    assert_eq!(
        timeout(TIMEOUT, waiter).await.unwrap().unwrap(),
        SessionStatus::Completed
    );

    let before = store.get(handle.message_id()).unwrap();
    assert!(!handle.cancel());
    assert_eq!(handle.status(), SessionStatus::Completed);
    assert_eq!(store.get(handle.message_id()).unwrap(), before);
}

#[tokio::test]
async fn test_cancel_after_failure_is_noop() {
    let transport = TestTransport::default();
    transport.add_response(PresetResponse::with_chunks([
        PresetChunk::text("data: Fog\n"),
        PresetChunk::Fail,
    ]));
    let (session, handle, store) =
        open_session(&transport, SessionConfig::default());
    let status = timeout(TIMEOUT, session.run()).await.unwrap();
    assert_eq!(status, SessionStatus::Failed(FailureKind::StreamRead));

    let before = store.get(handle.message_id()).unwrap();
    assert!(!handle.cancel());
    assert_eq!(
        handle.status(),
        SessionStatus::Failed(FailureKind::StreamRead)
    );
    assert_eq!(store.get(handle.message_id()).unwrap(), before);
    assert_eq!(before.content(), "Fog");
}

#[tokio::test]
async fn test_cancel_stalled_stream() {
    let transport = TestTransport::default();
    transport.add_response(PresetResponse::with_chunks([
        PresetChunk::text("data: A\n"),
        PresetChunk::Stall,
    ]));
    let (session, handle, store) =
        open_session(&transport, SessionConfig::default());
    let task = tokio::spawn(session.run());

    let mut store_rx = store.subscribe();
    timeout(TIMEOUT, store_rx.wait_for(|msgs| msgs[0].content() == "A"))
        .await
        .unwrap()
        .unwrap();
    // The read never resolves on its own.
    tokio::task::yield_now().await;
    assert_eq!(handle.status(), SessionStatus::Streaming);

    assert!(handle.cancel());
    let status = timeout(TIMEOUT, task).await.unwrap().unwrap();
    assert_eq!(status, SessionStatus::Cancelled);
    let msg = store.get(handle.message_id()).unwrap();
    assert_eq!(msg.content(), "A");
    assert!(!msg.is_streaming());
    assert!(!msg.is_error());
}
