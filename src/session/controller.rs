//! Session orchestration
//!
//! Routes keys, poll ticks, connection events and settings changes to the
//! scheduler, correlator, navigator and merger. Every method runs on the
//! session's single event loop, so state is plain owned data.
//!
//! After [`SessionController::teardown`] every handler is a no-op: late
//! callbacks from the connection or the poll timer can't touch the session.

use std::time::Instant;

use crate::config::{Config, GenerationSettings, Setting, SettingsError};
use crate::connection::{ConnectionEvent, ConnectionState};
use crate::protocol::{RequestMessage, parse_response};

use super::correlator::{ResponseCorrelator, Verdict};
use super::editor::{EditError, EditorSurface};
use super::merger::merge;
use super::navigator::SuggestionNavigator;
use super::scheduler::{SendScheduler, prompt_window};

/// Where outbound frames go
pub trait FrameSink {
    fn state(&self) -> ConnectionState;

    /// Hand a frame to the transport; false if it was not taken
    fn send_frame(&mut self, frame: String) -> bool;

    /// Release the transport; must be safe to call more than once
    fn close(&mut self);

    fn is_open(&self) -> bool {
        self.state().is_open()
    }
}

/// Keys the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    /// Word boundary (space)
    Trigger,
    Up,
    Down,
    Escape,
    /// Insert the selected candidate
    Confirm,
    Other,
}

/// Snapshot for a presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub document: String,
    pub candidates: Vec<String>,
    pub selected: Option<usize>,
    pub connection: ConnectionState,
    /// Reconnection keeps failing
    pub degraded: bool,
    /// A prompt was sent and no matching answer has arrived yet
    pub waiting: bool,
}

pub struct SessionController<S: FrameSink, E: EditorSurface> {
    sink: S,
    editor: E,
    settings: GenerationSettings,
    scheduler: SendScheduler,
    correlator: ResponseCorrelator,
    navigator: SuggestionNavigator,
    prompt_window: usize,
    sequence_tags: bool,
    next_seq: u64,
    /// Prompt of the last transmission not yet answered
    pending_prompt: Option<String>,
    degraded: bool,
    torn_down: bool,
}

impl<S: FrameSink, E: EditorSurface> SessionController<S, E> {
    pub fn new(sink: S, editor: E, config: &Config) -> Self {
        Self {
            sink,
            editor,
            settings: config.generation.clone(),
            scheduler: SendScheduler::new(config.timing.min_send_interval()),
            correlator: ResponseCorrelator::new(config.timing.tail_compare_chars),
            navigator: SuggestionNavigator::new(),
            prompt_window: config.timing.prompt_window_chars,
            sequence_tags: config.correlation.sequence_tags,
            next_seq: 0,
            pending_prompt: None,
            degraded: false,
            torn_down: false,
        }
    }

    /// Transmit the trailing document text now, bypassing the interval gate
    ///
    /// Returns true if a frame was handed to the transport. Nothing is sent
    /// while the connection isn't open, or when the trailing text is blank.
    /// A blank prompt leaves the owed-send flag and the last send time as
    /// they were, so the next tick retries.
    pub fn send_now(&mut self, now: Instant) -> bool {
        if self.torn_down || !self.sink.is_open() {
            return false;
        }

        let text = self.editor.document_text();
        let Some(prompt) = prompt_window(&text, self.prompt_window) else {
            log::debug!("Skipping send: trailing text is blank");
            return false;
        };

        let mut request = RequestMessage::new(prompt, &self.settings);
        if self.sequence_tags {
            self.next_seq += 1;
            request = request.with_seq(self.next_seq);
        }
        let frame = match request.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Failed to encode request: {}", e);
                return false;
            }
        };

        self.scheduler.record_sent(now);
        self.navigator.clear();
        log::debug!("Sending prompt ({} chars)", prompt.chars().count());
        self.pending_prompt = Some(request.prompt);
        self.sink.send_frame(frame)
    }

    /// Handle a notification from the connection task
    pub fn on_connection_event(&mut self, event: ConnectionEvent, now: Instant) {
        if self.torn_down {
            return;
        }

        match event {
            ConnectionEvent::Opened => {
                // Prime the first batch with whatever text is already there
                self.send_now(now);
            }
            ConnectionEvent::Message(frame) => {
                self.on_frame(&frame);
            }
            ConnectionEvent::Closed { reason } => {
                log::debug!("Connection closed: {:?}", reason);
                self.pending_prompt = None;
            }
            ConnectionEvent::Error(error) => {
                log::debug!("Connection error: {}", error);
            }
            ConnectionEvent::Degraded { attempts } => {
                log::warn!("Connectivity degraded after {} attempts", attempts);
                self.degraded = true;
            }
            ConnectionEvent::Recovered => {
                log::info!("Connectivity restored");
                self.degraded = false;
            }
        }
    }

    /// Handle one inbound frame; true if its candidates are now on display
    pub fn on_frame(&mut self, frame: &str) -> bool {
        if self.torn_down {
            return false;
        }

        let response = match parse_response(frame) {
            Ok(response) => response,
            Err(e) => {
                log::debug!("Dropping malformed frame: {}", e);
                return false;
            }
        };

        let current = self.editor.document_text();
        match self.correlator.accept(response, &current) {
            Verdict::Accepted(candidates) => {
                log::debug!("Received {} candidates", candidates.len());
                self.navigator.replace(candidates);
                self.pending_prompt = None;
                true
            }
            Verdict::Stale => {
                log::debug!("Dropping stale response");
                false
            }
            Verdict::Superseded { seq, highest } => {
                log::debug!("Dropping response {} (already showing {})", seq, highest);
                false
            }
        }
    }

    /// Handle a key press
    ///
    /// Trigger is routed before the editor inserts the delimiter, so the
    /// prompt is the text up to the end of the finished word.
    pub fn on_key(&mut self, key: SessionKey, now: Instant) -> Result<(), EditError> {
        if self.torn_down {
            return Ok(());
        }

        match key {
            SessionKey::Trigger => {
                if self.scheduler.mark_activity(now) {
                    self.send_now(now);
                }
            }
            SessionKey::Up => self.navigator.move_up(),
            SessionKey::Down => self.navigator.move_down(),
            SessionKey::Confirm => {
                self.confirm_selection(now)?;
            }
            SessionKey::Escape | SessionKey::Other => {}
        }

        // Keys always hand focus back to the text
        self.editor.focus();
        Ok(())
    }

    /// Idle poll; true if it caused a transmission
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if self.torn_down {
            return false;
        }

        let due = self
            .scheduler
            .tick(now, self.editor.cursor_at_end(), !self.navigator.is_empty());
        due && self.send_now(now)
    }

    /// Insert the selected candidate, if any
    pub fn confirm_selection(&mut self, now: Instant) -> Result<bool, EditError> {
        match self.navigator.selected() {
            Some(index) => self.choose(index, now),
            None => Ok(false),
        }
    }

    /// Insert candidate `index` and ask for the next batch
    ///
    /// An edit the editor refuses is returned as-is and leaves the
    /// candidates in place.
    pub fn choose(&mut self, index: usize, now: Instant) -> Result<bool, EditError> {
        if self.torn_down {
            return Ok(false);
        }
        let Some(candidate) = self.navigator.candidates().get(index).cloned() else {
            return Ok(false);
        };

        let edit = merge(&self.editor.text_before_cursor(), &candidate);
        self.editor.apply_edit(&edit)?;
        self.navigator.clear();
        self.editor.focus();

        self.send_now(now);
        Ok(true)
    }

    /// Change a generation parameter and re-send with it
    pub fn apply_setting(&mut self, setting: Setting, now: Instant) -> Result<(), SettingsError> {
        self.settings.apply(setting)?;
        self.send_now(now);
        Ok(())
    }

    /// End the session
    ///
    /// Closes the transport and drops the candidates. Returns true the first
    /// time only; later calls do nothing.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.sink.close();
        self.navigator.clear();
        self.pending_prompt = None;
        log::info!("Session ended");
        true
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            document: self.editor.document_text(),
            candidates: self.navigator.candidates().to_vec(),
            selected: self.navigator.selected(),
            connection: self.sink.state(),
            degraded: self.degraded,
            waiting: self.pending_prompt.is_some(),
        }
    }

    /// Give back the transport and the editor, e.g. to wait for the
    /// transport to finish closing after [`SessionController::teardown`]
    pub fn into_parts(self) -> (S, E) {
        (self.sink, self.editor)
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn navigator(&self) -> &SuggestionNavigator {
        &self.navigator
    }

    pub fn scheduler(&self) -> &SendScheduler {
        &self.scheduler
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn pending_prompt(&self) -> Option<&str> {
        self.pending_prompt.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
