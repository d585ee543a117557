//! End-to-end session tests against a local websocket server

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use super::*;
use crate::connection::ConnectionState;
use crate::store::{MemoryStore, load_document};

const WAIT: Duration = Duration::from_secs(5);

/// Answer every request with a single continuation for its prompt
async fn echo_server(listener: TcpListener, continuation: &'static str) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    while let Some(Ok(message)) = ws.next().await {
        if let Message::Text(text) = message {
            let request: serde_json::Value = serde_json::from_str(&text).unwrap();
            let reply = serde_json::json!({
                "message": { "prompt": request["prompt"], "text_0": continuation }
            });
            if ws.send(Message::Text(reply.to_string())).await.is_err() {
                break;
            }
        }
    }
}

async fn wait_view(
    rx: &mut mpsc::UnboundedReceiver<SessionView>,
    pred: impl Fn(&SessionView) -> bool,
) -> SessionView {
    loop {
        let view = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for view")
            .expect("view channel closed");
        if pred(&view) {
            return view;
        }
    }
}

fn test_config(endpoint: String) -> Config {
    let mut config = Config::default();
    config.server.endpoint = endpoint;
    config.timing.poll_interval_ms = 50;
    config
}

#[test]
fn test_parse_plain_text_types_a_word() {
    assert_eq!(
        parse_line("Hello").unwrap(),
        vec![
            HostCommand::Type("Hello".to_string()),
            HostCommand::Key(SessionKey::Trigger),
            HostCommand::Type(" ".to_string()),
        ]
    );
    assert!(parse_line("").unwrap().is_empty());
}

#[test]
fn test_parse_commands() {
    assert_eq!(parse_line(":up").unwrap(), vec![HostCommand::Key(SessionKey::Up)]);
    assert_eq!(parse_line(":down").unwrap(), vec![HostCommand::Key(SessionKey::Down)]);
    assert_eq!(parse_line(":pick").unwrap(), vec![HostCommand::Key(SessionKey::Confirm)]);
    assert_eq!(parse_line(":esc").unwrap(), vec![HostCommand::Key(SessionKey::Escape)]);
    assert_eq!(parse_line(":quit").unwrap(), vec![HostCommand::Quit]);
    assert_eq!(parse_line(":choose 2").unwrap(), vec![HostCommand::Choose(2)]);
    assert_eq!(
        parse_line(":set top_k 20").unwrap(),
        vec![HostCommand::Set(Setting::TopK(20))]
    );
}

#[test]
fn test_parse_command_errors() {
    assert_eq!(parse_line(":choose").unwrap_err(), CommandError::Choose);
    assert_eq!(parse_line(":choose two").unwrap_err(), CommandError::Choose);
    assert_eq!(parse_line(":set top_k").unwrap_err(), CommandError::Set);
    assert_eq!(
        parse_line(":jump").unwrap_err(),
        CommandError::Unknown("jump".to_string())
    );
    assert!(matches!(
        parse_line(":set colour red").unwrap_err(),
        CommandError::Setting(SettingsError::Unknown(_))
    ));
}

#[test]
fn test_session_url_appends_identifier() {
    let url = session_url("wss://host/ws/session/");
    assert!(url.starts_with("wss://host/ws/session/"));
    assert!(url.ends_with('/'));
    let id = &url["wss://host/ws/session/".len()..url.len() - 1];
    assert!(Uuid::parse_str(id).is_ok());
}

#[test]
fn test_session_url_adds_missing_slash() {
    let url = session_url("ws://host/session");
    assert!(url.starts_with("ws://host/session/"));
    assert_ne!(session_url("ws://host/session"), url);
}

#[tokio::test]
async fn test_type_pick_and_persist() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(echo_server(listener, "world"));

    let config = test_config(format!("ws://{}/", addr));
    let mut store = MemoryStore::new();
    save_document(&mut store, "").unwrap();

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (view_tx, mut view_rx) = mpsc::unbounded_channel();

    let driver = async move {
        wait_view(&mut view_rx, |v| v.connection == ConnectionState::Open).await;

        cmd_tx.send(HostCommand::Type("Hello".to_string())).unwrap();
        cmd_tx.send(HostCommand::Key(SessionKey::Trigger)).unwrap();
        cmd_tx.send(HostCommand::Type(" ".to_string())).unwrap();

        let view = wait_view(&mut view_rx, |v| !v.candidates.is_empty()).await;
        assert_eq!(view.candidates, vec!["world".to_string()]);

        cmd_tx.send(HostCommand::Key(SessionKey::Down)).unwrap();
        cmd_tx.send(HostCommand::Key(SessionKey::Confirm)).unwrap();
        let view = wait_view(&mut view_rx, |v| v.document == "Hello world").await;
        assert!(view.selected.is_none());

        cmd_tx.send(HostCommand::Quit).unwrap();
        wait_view(&mut view_rx, |v| v.connection == ConnectionState::Closed).await;
    };

    let (result, ()) = tokio::join!(run_session(&config, &mut store, cmd_rx, view_tx), driver);

    assert_eq!(result.unwrap(), "Hello world");
    assert_eq!(load_document(&store).unwrap().text, "Hello world");
    server.abort();
}

#[tokio::test]
async fn test_invalid_setting_keeps_session_running() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(echo_server(listener, "again"));

    let config = test_config(format!("ws://{}/", addr));
    let mut store = MemoryStore::new();
    save_document(&mut store, "Draft").unwrap();

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (view_tx, mut view_rx) = mpsc::unbounded_channel();

    cmd_tx.send(HostCommand::Set(Setting::TopK(0))).unwrap();
    cmd_tx.send(HostCommand::Type(" more".to_string())).unwrap();
    drop(cmd_tx);

    let result = run_session(&config, &mut store, cmd_rx, view_tx).await;
    assert_eq!(result.unwrap(), "Draft more");
    assert_eq!(load_document(&store).unwrap().text, "Draft more");

    let mut last = None;
    while let Ok(view) = view_rx.try_recv() {
        last = Some(view);
    }
    assert_eq!(last.unwrap().connection, ConnectionState::Closed);
    server.abort();
}

#[tokio::test]
async fn test_quit_sends_close_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Resolves to true once the client's close frame arrives
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                return true;
            }
        }
        false
    });

    let config = test_config(format!("ws://{}/", addr));
    let mut store = MemoryStore::new();
    save_document(&mut store, "").unwrap();

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (view_tx, mut view_rx) = mpsc::unbounded_channel();

    let driver = async move {
        wait_view(&mut view_rx, |v| v.connection == ConnectionState::Open).await;
        cmd_tx.send(HostCommand::Quit).unwrap();
    };

    let (result, ()) = tokio::join!(run_session(&config, &mut store, cmd_rx, view_tx), driver);
    result.unwrap();

    assert!(timeout(WAIT, server).await.unwrap().unwrap());
}

#[tokio::test]
async fn test_bad_endpoint_is_reported() {
    let config = test_config("http://127.0.0.1:1/".to_string());
    let mut store = MemoryStore::new();
    let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (view_tx, _view_rx) = mpsc::unbounded_channel();

    let err = run_session(&config, &mut store, cmd_rx, view_tx)
        .await
        .unwrap_err();
    assert!(matches!(err, WriteupError::Connection(_)));
}
