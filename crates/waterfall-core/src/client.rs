//! Connection lifecycle shared by every viewer.
//!
//! [`StreamClient`] is a sans-IO state machine. Drivers (tokio in the CLI,
//! browser callbacks in the wasm viewer) own the actual socket and feed
//! events in; each handler answers with a [`Directive`] saying what the
//! driver should do next.
//!
//! ```text
//!            start / timer
//!   ┌──────────────────────────────┐
//!   ▼                              │
//! Connecting ──open──▶ Connected   │
//!   │                    │         │
//!   └──close/error──▶ Disconnected ┘ (Retry)
//!                        │
//!                        └──▶ exit (Terminate)
//! ```
//!
//! An error never transitions by itself: the client asks the driver to close
//! the channel, and the transition happens when the close is reported.

use std::time::Duration;

use crate::frame::{BinFrame, FrameDecoder};
use crate::scheduler::{Scheduler, TimerId};

/// Delay before a retrying client reconnects.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// What happens after the channel goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Reconnect after `delay`, forever. Used by the graphical viewers.
    Retry { delay: Duration },
    /// End the session. Used by the one-shot terminal viewer.
    Terminate,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Retry {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl ReconnectPolicy {
    pub fn retries(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

/// User-facing notification emitted on transitions and channel errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Connecting { url: String },
    Connected { url: String },
    ChannelError { message: String, retrying: bool },
    Disconnected { retrying: bool },
}

impl Status {
    /// The state this notification reports, if it marks a transition.
    pub fn state(&self) -> Option<ConnectionState> {
        match self {
            Self::Connecting { .. } => Some(ConnectionState::Connecting),
            Self::Connected { .. } => Some(ConnectionState::Connected),
            Self::Disconnected { .. } => Some(ConnectionState::Disconnected),
            Self::ChannelError { .. } => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting { .. } => write!(f, "connecting…"),
            Self::Connected { .. } => write!(f, "connected"),
            Self::ChannelError { retrying: true, .. } => write!(f, "error (reconnecting…)"),
            Self::ChannelError { message, .. } => write!(f, "error: {message}"),
            Self::Disconnected { retrying: true } => write!(f, "disconnected (reconnecting…)"),
            Self::Disconnected { retrying: false } => write!(f, "disconnected"),
        }
    }
}

/// How a session that stops for good ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The producer closed the channel.
    Closed,
    /// The channel failed.
    Failed(String),
    /// Torn down locally.
    Cancelled,
}

impl SessionEnd {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Failed(_) => 1,
            Self::Closed | Self::Cancelled => 0,
        }
    }
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed by producer"),
            Self::Failed(msg) => write!(f, "channel failed: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Instruction from the client to its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Keep waiting for the next event.
    Continue,
    /// Open a new channel to [`StreamClient::url`].
    Connect,
    /// Close the channel, then report [`StreamClient::on_close`].
    CloseChannel,
    /// Stop driving this client.
    Exit(SessionEnd),
}

// ---------------------------------------------------------------------------
// FrameSink
// ---------------------------------------------------------------------------

/// A renderer attached to a client. The connection policy never depends on
/// which one it is.
pub trait FrameSink {
    /// Consume one decoded frame.
    fn accept(&mut self, frame: &BinFrame);

    /// Connection notification. Ignored by default.
    fn status(&mut self, _status: &Status) {}
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn accept(&mut self, frame: &BinFrame) {
        (**self).accept(frame);
    }

    fn status(&mut self, status: &Status) {
        (**self).status(status);
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn accept(&mut self, frame: &BinFrame) {
        (**self).accept(frame);
    }

    fn status(&mut self, status: &Status) {
        (**self).status(status);
    }
}

// ---------------------------------------------------------------------------
// StreamClient
// ---------------------------------------------------------------------------

pub struct StreamClient<S, T> {
    url: String,
    policy: ReconnectPolicy,
    state: ConnectionState,
    decoder: FrameDecoder,
    sink: S,
    scheduler: T,
    pending_timer: Option<TimerId>,
    failure: Option<String>,
    torn_down: bool,
}

impl<S: FrameSink, T: Scheduler> StreamClient<S, T> {
    /// A client that has not connected yet; call [`start`](Self::start).
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy, sink: S, scheduler: T) -> Self {
        Self {
            url: url.into(),
            policy,
            state: ConnectionState::Disconnected,
            decoder: FrameDecoder::new(),
            sink,
            scheduler,
            pending_timer: None,
            failure: None,
            torn_down: false,
        }
    }

    /// Begin the first connection attempt.
    pub fn start(&mut self) -> Directive {
        if self.torn_down {
            return Directive::Exit(SessionEnd::Cancelled);
        }
        self.enter_connecting()
    }

    /// The channel opened.
    pub fn on_open(&mut self) -> Directive {
        if self.torn_down || self.state != ConnectionState::Connecting {
            return Directive::Continue;
        }
        self.state = ConnectionState::Connected;
        self.failure = None;
        log::debug!("connected to {}", self.url);
        self.sink.status(&Status::Connected {
            url: self.url.clone(),
        });
        Directive::Continue
    }

    /// A text message arrived. Malformed payloads are dropped without a
    /// trace in the state machine.
    pub fn on_message(&mut self, payload: &str) -> Directive {
        if self.state != ConnectionState::Connected {
            return Directive::Continue;
        }
        if let Some(frame) = self.decoder.decode(payload) {
            self.sink.accept(&frame);
        }
        Directive::Continue
    }

    /// The channel reported an error. The driver must close it and then call
    /// [`on_close`](Self::on_close).
    pub fn on_error(&mut self, message: &str) -> Directive {
        if self.state == ConnectionState::Disconnected {
            return Directive::Continue;
        }
        log::debug!("channel error on {}: {message}", self.url);
        self.failure = Some(message.to_string());
        self.sink.status(&Status::ChannelError {
            message: message.to_string(),
            retrying: self.retrying(),
        });
        Directive::CloseChannel
    }

    /// The channel closed. Repeated closes are ignored.
    pub fn on_close(&mut self) -> Directive {
        if self.state == ConnectionState::Disconnected {
            return if self.torn_down {
                Directive::Exit(SessionEnd::Cancelled)
            } else {
                Directive::Continue
            };
        }
        self.state = ConnectionState::Disconnected;
        log::debug!("disconnected from {}", self.url);
        self.sink.status(&Status::Disconnected {
            retrying: self.retrying(),
        });

        if self.torn_down {
            return Directive::Exit(SessionEnd::Cancelled);
        }
        match self.policy {
            ReconnectPolicy::Retry { delay } => {
                if self.pending_timer.is_none() {
                    log::debug!("reconnecting in {delay:?}");
                    self.pending_timer = Some(self.scheduler.schedule(delay));
                }
                Directive::Continue
            }
            ReconnectPolicy::Terminate => Directive::Exit(match self.failure.take() {
                Some(msg) => SessionEnd::Failed(msg),
                None => SessionEnd::Closed,
            }),
        }
    }

    /// A scheduled timer fired. Stale or revoked timers are ignored.
    pub fn on_timer(&mut self, id: TimerId) -> Directive {
        if self.pending_timer != Some(id) {
            return Directive::Continue;
        }
        self.pending_timer = None;
        if self.torn_down {
            return Directive::Continue;
        }
        self.enter_connecting()
    }

    /// Tear the session down: revoke any pending reconnect and stop retrying.
    pub fn shutdown(&mut self) -> Directive {
        self.torn_down = true;
        if let Some(id) = self.pending_timer.take() {
            log::debug!("cancelling pending reconnect");
            self.scheduler.cancel(id);
        }
        if self.state == ConnectionState::Disconnected {
            Directive::Exit(SessionEnd::Cancelled)
        } else {
            Directive::CloseChannel
        }
    }

    fn enter_connecting(&mut self) -> Directive {
        self.state = ConnectionState::Connecting;
        log::debug!("connecting to {}", self.url);
        self.sink.status(&Status::Connecting {
            url: self.url.clone(),
        });
        Directive::Connect
    }

    fn retrying(&self) -> bool {
        self.policy.retries() && !self.torn_down
    }
}

impl<S, T> StreamClient<S, T> {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    /// The reconnect timer currently armed, if any.
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Vec<f64>>,
        statuses: Vec<Status>,
    }

    impl FrameSink for Recorder {
        fn accept(&mut self, frame: &BinFrame) {
            self.frames.push(frame.bins.clone());
        }

        fn status(&mut self, status: &Status) {
            self.statuses.push(status.clone());
        }
    }

    impl Recorder {
        fn transitions_to(&self, state: ConnectionState) -> usize {
            self.statuses
                .iter()
                .filter(|s| s.state() == Some(state))
                .count()
        }
    }

    fn retrying() -> StreamClient<Recorder, ManualScheduler> {
        StreamClient::new(
            "ws://test",
            ReconnectPolicy::default(),
            Recorder::default(),
            ManualScheduler::new(),
        )
    }

    fn terminating() -> StreamClient<Recorder, ManualScheduler> {
        StreamClient::new(
            "ws://test",
            ReconnectPolicy::Terminate,
            Recorder::default(),
            ManualScheduler::new(),
        )
    }

    #[test]
    fn start_then_open_connects() {
        let mut c = retrying();
        assert_eq!(c.start(), Directive::Connect);
        assert_eq!(c.state(), ConnectionState::Connecting);
        assert_eq!(c.on_open(), Directive::Continue);
        assert_eq!(c.state(), ConnectionState::Connected);
        let texts: Vec<String> = c.sink().statuses.iter().map(|s| s.to_string()).collect();
        assert_eq!(texts, vec!["connecting…", "connected"]);
    }

    #[test]
    fn messages_reach_the_sink() {
        let mut c = retrying();
        c.start();
        c.on_open();
        c.on_message(r#"{"bins":[1,2,3]}"#);
        c.on_message("not json");
        c.on_message(r#"{"nope":1}"#);
        c.on_message(r#"{"bins":[4]}"#);
        assert_eq!(c.sink().frames, vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
        assert_eq!(c.state(), ConnectionState::Connected);
    }

    #[test]
    fn messages_before_open_are_ignored() {
        let mut c = retrying();
        c.start();
        c.on_message(r#"{"bins":[1]}"#);
        assert!(c.sink().frames.is_empty());
    }

    #[test]
    fn immediate_close_schedules_exactly_one_reconnect() {
        let mut c = retrying();
        c.start();
        c.on_open();
        assert_eq!(c.on_close(), Directive::Continue);
        assert_eq!(c.on_close(), Directive::Continue);
        assert_eq!(c.on_close(), Directive::Continue);

        assert_eq!(c.state(), ConnectionState::Disconnected);
        assert_eq!(c.sink().transitions_to(ConnectionState::Disconnected), 1);
        assert_eq!(c.scheduler().scheduled_total(), 1);
        assert_eq!(
            c.scheduler().pending(),
            &[(c.pending_timer().unwrap(), DEFAULT_RECONNECT_DELAY)]
        );
        assert_eq!(
            c.sink().statuses.last().unwrap().to_string(),
            "disconnected (reconnecting…)"
        );
    }

    #[test]
    fn timer_reconnects() {
        let mut c = retrying();
        c.start();
        c.on_open();
        c.on_close();
        let id = c.scheduler_mut().fire_next().unwrap();
        assert_eq!(c.on_timer(id), Directive::Connect);
        assert_eq!(c.state(), ConnectionState::Connecting);
        assert!(c.pending_timer().is_none());
        // Firing the same timer again does nothing.
        assert_eq!(c.on_timer(id), Directive::Continue);

        c.on_open();
        c.on_close();
        assert_eq!(c.scheduler().scheduled_total(), 2);
        assert_eq!(c.sink().transitions_to(ConnectionState::Disconnected), 2);
    }

    #[test]
    fn error_requests_close_before_transition() {
        let mut c = retrying();
        c.start();
        c.on_open();
        assert_eq!(c.on_error("boom"), Directive::CloseChannel);
        assert_eq!(c.state(), ConnectionState::Connected);
        assert_eq!(c.on_close(), Directive::Continue);
        assert_eq!(c.state(), ConnectionState::Disconnected);

        let texts: Vec<String> = c.sink().statuses.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            texts,
            vec![
                "connecting…",
                "connected",
                "error (reconnecting…)",
                "disconnected (reconnecting…)"
            ]
        );
        assert_eq!(c.scheduler().scheduled_total(), 1);
        // A late error after the close is ignored.
        assert_eq!(c.on_error("late"), Directive::Continue);
    }

    #[test]
    fn failed_connect_attempt_retries() {
        let mut c = retrying();
        c.start();
        assert_eq!(c.on_error("refused"), Directive::CloseChannel);
        assert_eq!(c.on_close(), Directive::Continue);
        assert_eq!(c.scheduler().pending().len(), 1);
    }

    #[test]
    fn terminate_policy_exits_on_close() {
        let mut c = terminating();
        c.start();
        c.on_open();
        assert_eq!(c.on_close(), Directive::Exit(SessionEnd::Closed));
        assert_eq!(c.scheduler().scheduled_total(), 0);
        assert_eq!(c.sink().statuses.last().unwrap().to_string(), "disconnected");
    }

    #[test]
    fn terminate_policy_reports_failure() {
        let mut c = terminating();
        c.start();
        assert_eq!(c.on_error("refused"), Directive::CloseChannel);
        let end = match c.on_close() {
            Directive::Exit(end) => end,
            other => panic!("expected exit, got {other:?}"),
        };
        assert_eq!(end, SessionEnd::Failed("refused".into()));
        assert_eq!(end.exit_code(), 1);
        assert_eq!(c.sink().statuses[1].to_string(), "error: refused");
    }

    #[test]
    fn shutdown_cancels_pending_reconnect() {
        let mut c = retrying();
        c.start();
        c.on_open();
        c.on_close();
        let id = c.pending_timer().unwrap();

        assert_eq!(c.shutdown(), Directive::Exit(SessionEnd::Cancelled));
        assert!(c.scheduler().pending().is_empty());
        assert_eq!(c.scheduler().cancelled_total(), 1);
        // A timer that slipped through anyway is ignored.
        assert_eq!(c.on_timer(id), Directive::Continue);
        assert_eq!(c.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn shutdown_while_connected_closes_without_retry() {
        let mut c = retrying();
        c.start();
        c.on_open();
        assert_eq!(c.shutdown(), Directive::CloseChannel);
        assert_eq!(c.on_close(), Directive::Exit(SessionEnd::Cancelled));
        assert_eq!(c.scheduler().scheduled_total(), 0);
        assert_eq!(c.sink().statuses.last().unwrap().to_string(), "disconnected");
        assert_eq!(c.start(), Directive::Exit(SessionEnd::Cancelled));
    }
}
