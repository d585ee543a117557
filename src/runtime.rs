//! Session runtime
//!
//! Drives one session on a single task: host commands, connection events and
//! the idle poll all funnel through one `select!` loop, so the controller is
//! only ever touched from one place.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::config::{Config, Setting, SettingsError};
use crate::connection::{Backoff, ConnectionManager};
use crate::error::WriteupError;
use crate::session::{BufferEditor, SessionController, SessionKey, SessionView};
use crate::store::{KeyValueStore, initial_text, save_document};

/// How long teardown waits for the socket's close handshake
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Input from whoever hosts the editor
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Typed text, inserted at the cursor
    Type(String),
    Key(SessionKey),
    /// Insert candidate by index
    Choose(usize),
    Set(Setting),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command `:{0}`")]
    Unknown(String),

    #[error("usage: :choose <index>")]
    Choose,

    #[error("usage: :set <name> <value>")]
    Set,

    #[error(transparent)]
    Setting(#[from] SettingsError),
}

/// Translate one line of terminal input into commands
///
/// Plain text is typed as a finished word: the text, the trigger key, then
/// the space it stands for. Lines starting with `:` are commands.
pub fn parse_line(line: &str) -> Result<Vec<HostCommand>, CommandError> {
    let Some(command) = line.strip_prefix(':') else {
        if line.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![
            HostCommand::Type(line.to_string()),
            HostCommand::Key(SessionKey::Trigger),
            HostCommand::Type(" ".to_string()),
        ]);
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let parsed = match (name, args.as_slice()) {
        ("up", []) => HostCommand::Key(SessionKey::Up),
        ("down", []) => HostCommand::Key(SessionKey::Down),
        ("pick", []) => HostCommand::Key(SessionKey::Confirm),
        ("esc", []) => HostCommand::Key(SessionKey::Escape),
        ("quit", []) => HostCommand::Quit,
        ("choose", [index]) => HostCommand::Choose(index.parse().map_err(|_| CommandError::Choose)?),
        ("choose", _) => return Err(CommandError::Choose),
        ("set", [name, value]) => HostCommand::Set(Setting::parse(name, value)?),
        ("set", _) => return Err(CommandError::Set),
        _ => return Err(CommandError::Unknown(name.to_string())),
    };
    Ok(vec![parsed])
}

/// Service URL for a fresh session: endpoint plus a random identifier
pub fn session_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    format!("{}/{}/", base, Uuid::new_v4())
}

/// Run a session until `Quit` or until the command channel closes
///
/// The document is loaded from `store` at start and saved back at the end.
/// A view is pushed to `views` after every handled input. Returns the final
/// document text.
pub async fn run_session(
    config: &Config,
    store: &mut dyn KeyValueStore,
    mut commands: mpsc::UnboundedReceiver<HostCommand>,
    views: mpsc::UnboundedSender<SessionView>,
) -> Result<String, WriteupError> {
    let editor = BufferEditor::with_text(initial_text(store));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut manager = ConnectionManager::new(Backoff::from_config(&config.reconnect));
    manager.open(&session_url(&config.server.endpoint), event_tx)?;

    let mut session = SessionController::new(manager, editor, config);

    let period = config.timing.poll_interval();
    let mut poll = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let _ = views.send(session.view());
    let mut failure = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let now = Instant::now();
                match command {
                    HostCommand::Type(text) => session.editor_mut().type_text(&text),
                    HostCommand::Key(key) => {
                        if let Err(e) = session.on_key(key, now) {
                            failure = Some(e);
                            break;
                        }
                    }
                    HostCommand::Choose(index) => {
                        if let Err(e) = session.choose(index, now) {
                            failure = Some(e);
                            break;
                        }
                    }
                    HostCommand::Set(setting) => {
                        if let Err(e) = session.apply_setting(setting, now) {
                            log::warn!("{}", e);
                        }
                    }
                    HostCommand::Quit => break,
                }
            }
            Some(event) = event_rx.recv() => {
                session.on_connection_event(event, Instant::now());
            }
            _ = poll.tick() => {
                session.on_tick(Instant::now());
            }
        }
        let _ = views.send(session.view());
    }

    // Timer goes with the loop; the connection goes here
    drop(poll);
    session.teardown();
    let _ = views.send(session.view());

    let (manager, editor) = session.into_parts();
    if tokio::time::timeout(CLOSE_GRACE, manager.shutdown()).await.is_err() {
        log::warn!("Connection did not close within {:?}", CLOSE_GRACE);
    }

    let text = editor.text().to_string();
    save_document(store, &text)?;

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(text),
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod runtime_tests;
