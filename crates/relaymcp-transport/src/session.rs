//! Session lifecycle state machine.
//!
//! Tracks connection state, the opaque session id, the last SSE event id
//! used for stream resumption, and reconnect accounting. Observers are
//! notified of transitions; every callback fires with the internal lock
//! released so observers may re-enter the manager freely.
//!
//! Transition table (anything else is a no-op):
//!
//! ```text
//! Disconnected  --begin_connect-->        Connecting
//! Connecting    --established(id)-->      Connected
//! Connecting    --failed(msg)-->          Failed
//! Connected     --begin_close-->          Closing
//! Connected     --session_expired-->      Reconnecting
//! Reconnecting  --established(id)-->      Connected
//! Reconnecting  --failed(msg)-->          Failed
//! Failed        --begin_reconnect-->      Reconnecting
//! Closing       --close_complete-->       Disconnected
//! *             --reset-->                Disconnected
//! ```

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::validation::is_valid_session_id;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    /// Session established
    Connected,
    /// Session lost, re-establishment in progress
    Reconnecting,
    /// Graceful shutdown in progress
    Closing,
    /// Connection attempt failed
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closing => "closing",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Session manager configuration
#[derive(Debug, Clone, Default)]
pub struct SessionManagerConfig {
    /// Reconnect attempts before `reconnect_exhausted` fires.
    /// Zero means unlimited.
    pub max_reconnect_attempts: usize,
}

/// Observer for state transitions
pub type StateChangeCallback = std::sync::Arc<dyn Fn(SessionState, SessionState) + Send + Sync>;
/// Observer for session establishment, receives the new session id
pub type SessionEstablishedCallback = std::sync::Arc<dyn Fn(&str) + Send + Sync>;
/// Observer for session loss, receives a reason
pub type SessionLostCallback = std::sync::Arc<dyn Fn(&str) + Send + Sync>;
/// Observer fired once when reconnect attempts are exhausted
pub type ReconnectExhaustedCallback = std::sync::Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
struct SessionData {
    state: SessionState,
    session_id: Option<String>,
    last_event_id: Option<String>,
    last_error: String,
    reconnect_count: usize,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            state: SessionState::Disconnected,
            session_id: None,
            last_event_id: None,
            last_error: String::new(),
            reconnect_count: 0,
        }
    }
}

#[derive(Default)]
struct Observers {
    state_change: Vec<StateChangeCallback>,
    session_established: Vec<SessionEstablishedCallback>,
    session_lost: Vec<SessionLostCallback>,
    reconnect_exhausted: Vec<ReconnectExhaustedCallback>,
}

/// Thread-safe session state holder plus observer list.
pub struct SessionManager {
    config: SessionManagerConfig,
    data: Mutex<SessionData>,
    observers: Mutex<Observers>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// What to notify after a transition; built under the lock, fired outside.
enum Event<'a> {
    StateChange(SessionState, SessionState),
    Established(&'a str),
    Lost(&'a str),
    Exhausted,
}

impl SessionManager {
    /// Create a manager in `Disconnected`.
    pub fn new(config: SessionManagerConfig) -> Self {
        Self {
            config,
            data: Mutex::new(SessionData::default()),
            observers: Mutex::new(Observers::default()),
        }
    }

    /// Create a manager with default configuration (unlimited reconnects).
    pub fn with_defaults() -> Self {
        Self::new(SessionManagerConfig::default())
    }

    // ── state queries ────────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.data.lock().expect("session mutex poisoned").state
    }

    /// Current session id, if any.
    pub fn session_id(&self) -> Option<String> {
        self.data
            .lock()
            .expect("session mutex poisoned")
            .session_id
            .clone()
    }

    /// Last SSE event id seen, if any.
    pub fn last_event_id(&self) -> Option<String> {
        self.data
            .lock()
            .expect("session mutex poisoned")
            .last_event_id
            .clone()
    }

    /// Last recorded error message.
    pub fn last_error(&self) -> String {
        self.data
            .lock()
            .expect("session mutex poisoned")
            .last_error
            .clone()
    }

    /// Reconnect attempts since the last clean connect.
    pub fn reconnect_count(&self) -> usize {
        self.data
            .lock()
            .expect("session mutex poisoned")
            .reconnect_count
    }

    // ── transitions ──────────────────────────────────────────────────

    /// `Disconnected → Connecting`. No-op elsewhere.
    pub fn begin_connect(&self) {
        let mut data = self.data.lock().expect("session mutex poisoned");
        if data.state != SessionState::Disconnected {
            return;
        }
        let old = data.state;
        data.state = SessionState::Connecting;
        drop(data);
        self.fire(&[Event::StateChange(old, SessionState::Connecting)]);
    }

    /// `Connecting|Reconnecting → Connected`, storing the session id.
    ///
    /// The id is validated first; an invalid id returns `false` and
    /// leaves state untouched. A previously stored id is replaced, never
    /// kept alongside the new one.
    pub fn established(&self, session_id: &str) -> bool {
        if !is_valid_session_id(session_id) {
            warn!("rejecting invalid session id ({} chars)", session_id.len());
            return false;
        }

        let mut data = self.data.lock().expect("session mutex poisoned");
        let old = data.state;
        if old != SessionState::Connecting && old != SessionState::Reconnecting {
            return false;
        }
        data.session_id = Some(session_id.to_string());
        data.last_error.clear();
        data.state = SessionState::Connected;
        drop(data);

        debug!("session established: {session_id}");
        self.fire(&[
            Event::StateChange(old, SessionState::Connected),
            Event::Established(session_id),
        ]);
        true
    }

    /// `Connecting|Reconnecting → Failed`, recording the error. Fires
    /// `reconnect_exhausted` once when the configured attempt limit has
    /// been reached.
    pub fn connection_failed(&self, error_message: &str) {
        let (old, exhausted) = {
            let mut data = self.data.lock().expect("session mutex poisoned");
            let old = data.state;
            if old != SessionState::Connecting && old != SessionState::Reconnecting {
                return;
            }
            data.last_error = error_message.to_string();

            let has_limit = self.config.max_reconnect_attempts > 0;
            let exhausted = has_limit && data.reconnect_count >= self.config.max_reconnect_attempts;

            data.state = SessionState::Failed;
            (old, exhausted)
        };

        if exhausted {
            self.fire(&[Event::Exhausted]);
        }
        self.fire(&[Event::StateChange(old, SessionState::Failed)]);
    }

    /// `Connected → Reconnecting`: the server no longer recognizes the
    /// session. Clears the session id but preserves `last_event_id` so
    /// the stream can resume; increments the reconnect counter.
    pub fn session_expired(&self) {
        let old = {
            let mut data = self.data.lock().expect("session mutex poisoned");
            if data.state != SessionState::Connected {
                return;
            }
            let old = data.state;
            data.session_id = None;
            data.reconnect_count += 1;
            data.state = SessionState::Reconnecting;
            old
        };

        self.fire(&[
            Event::Lost("Session expired (404)"),
            Event::StateChange(old, SessionState::Reconnecting),
        ]);
    }

    /// `Connected → Closing`. No-op elsewhere.
    pub fn begin_close(&self) {
        let mut data = self.data.lock().expect("session mutex poisoned");
        if data.state != SessionState::Connected {
            return;
        }
        let old = data.state;
        data.state = SessionState::Closing;
        drop(data);
        self.fire(&[Event::StateChange(old, SessionState::Closing)]);
    }

    /// `Closing → Disconnected`, clearing session id, event id, and the
    /// reconnect counter.
    pub fn close_complete(&self) {
        let mut data = self.data.lock().expect("session mutex poisoned");
        if data.state != SessionState::Closing {
            return;
        }
        let old = data.state;
        data.session_id = None;
        data.last_event_id = None;
        data.reconnect_count = 0;
        data.state = SessionState::Disconnected;
        drop(data);
        self.fire(&[Event::StateChange(old, SessionState::Disconnected)]);
    }

    /// `Failed → Reconnecting`, incrementing the reconnect counter.
    pub fn begin_reconnect(&self) {
        let mut data = self.data.lock().expect("session mutex poisoned");
        if data.state != SessionState::Failed {
            return;
        }
        let old = data.state;
        data.reconnect_count += 1;
        data.state = SessionState::Reconnecting;
        drop(data);
        self.fire(&[Event::StateChange(old, SessionState::Reconnecting)]);
    }

    /// Return to `Disconnected` from any state, clearing everything.
    pub fn reset(&self) {
        let old = {
            let mut data = self.data.lock().expect("session mutex poisoned");
            data.session_id = None;
            data.last_event_id = None;
            data.last_error.clear();
            data.reconnect_count = 0;
            let old = data.state;
            data.state = SessionState::Disconnected;
            old
        };

        if old != SessionState::Disconnected {
            self.fire(&[Event::StateChange(old, SessionState::Disconnected)]);
        }
    }

    // ── SSE event id tracking ────────────────────────────────────────

    /// Record the id of the last inbound SSE event.
    pub fn record_event_id(&self, event_id: &str) {
        self.data
            .lock()
            .expect("session mutex poisoned")
            .last_event_id = Some(event_id.to_string());
    }

    /// Forget the stored event id.
    pub fn clear_last_event_id(&self) {
        self.data
            .lock()
            .expect("session mutex poisoned")
            .last_event_id = None;
    }

    // ── observers ────────────────────────────────────────────────────

    /// Register a state-change observer.
    pub fn on_state_change<F>(&self, callback: F)
    where
        F: Fn(SessionState, SessionState) + Send + Sync + 'static,
    {
        self.observers
            .lock()
            .expect("observer mutex poisoned")
            .state_change
            .push(std::sync::Arc::new(callback));
    }

    /// Register a session-established observer.
    pub fn on_session_established<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.observers
            .lock()
            .expect("observer mutex poisoned")
            .session_established
            .push(std::sync::Arc::new(callback));
    }

    /// Register a session-lost observer.
    pub fn on_session_lost<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.observers
            .lock()
            .expect("observer mutex poisoned")
            .session_lost
            .push(std::sync::Arc::new(callback));
    }

    /// Register a reconnect-exhausted observer.
    pub fn on_reconnect_exhausted<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers
            .lock()
            .expect("observer mutex poisoned")
            .reconnect_exhausted
            .push(std::sync::Arc::new(callback));
    }

    /// Invoke observers for the given events. The callback lists are
    /// cloned out under the observer lock and invoked with no lock held,
    /// so observers may re-enter the manager freely.
    fn fire(&self, events: &[Event<'_>]) {
        let (state_change, established, lost, exhausted) = {
            let observers = self.observers.lock().expect("observer mutex poisoned");
            (
                observers.state_change.clone(),
                observers.session_established.clone(),
                observers.session_lost.clone(),
                observers.reconnect_exhausted.clone(),
            )
        };
        for event in events {
            match event {
                Event::StateChange(old, new) => {
                    for cb in &state_change {
                        cb(*old, *new);
                    }
                }
                Event::Established(id) => {
                    for cb in &established {
                        cb(id);
                    }
                }
                Event::Lost(reason) => {
                    for cb in &lost {
                        cb(reason);
                    }
                }
                Event::Exhausted => {
                    for cb in &exhausted {
                        cb();
                    }
                }
            }
        }
    }
}
