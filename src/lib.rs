//! # Proofline
//!
//! Proofline is the session and timer core for a client of a turn-based
//! formula-rewriting puzzle: a player applies logic rules to transform a starting
//! formula toward a goal, optionally under a countdown, stepping backward and
//! forward through prior proof states and promoting a sub-range of the history
//! into a reusable "theorem" rule.
//!
//! The control flow is poll-driven. Instead of registering callback functions,
//! the host calls [`GameClient::poll`] from its update loop, drains the
//! [`GameEvent`]s the client buffered, and lets the client exchange typed
//! requests and replies with the remote proof engine through a non-blocking
//! [`ProofTransport`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt::Debug;

pub use countdown::{Countdown, CountdownSignal, CountdownSnapshot, CountdownState, SignalVec};
pub use engine::command::{EngineCommand, EngineRequest, RequestToken};
pub use engine::reply::{EngineReply, EngineStatus, ReplyBody, RuleCatalog, RuleGroup, StateBody};
pub use error::ProoflineError;
pub use selection::{SelectionSnapshot, TheoremSelection};
use serde::{de::DeserializeOwned, Serialize};
pub use sessions::builder::ClientBuilder;
pub use sessions::client::GameClient;
pub use sessions::event_drain::EventDrain;
pub use sessions::game_session::{GameConfig, GameSession, TimerSlot};
pub use sessions::registry::SessionRegistry;
pub use timeline::{ProofState, Timeline};
use web_time::Duration;

// Internal modules - made pub for integration tests, but doc(hidden) for API cleanliness
#[doc(hidden)]
pub mod countdown;
#[doc(hidden)]
pub mod error;
pub mod prelude;
#[doc(hidden)]
pub mod selection;
pub mod telemetry;
#[doc(hidden)]
pub mod timeline;
#[doc(hidden)]
pub mod engine {
    /// JSON codec for proof engine payloads.
    ///
    /// Provides centralized encoding and decoding of engine requests and replies
    /// using serde_json, for use by transport implementations.
    pub mod codec;
    #[doc(hidden)]
    pub mod command;
    #[doc(hidden)]
    pub mod reply;
}
#[doc(hidden)]
pub mod sessions {
    #[doc(hidden)]
    pub mod builder;
    #[doc(hidden)]
    pub mod client;
    #[doc(hidden)]
    pub mod event_drain;
    #[doc(hidden)]
    pub mod game_session;
    #[doc(hidden)]
    pub mod registry;
}

// #############
// # CONSTANTS #
// #############

/// Default total duration of a timed game: two minutes.
///
/// Used by [`GameSession::resume_timer`] when a `Normal`-mode session is
/// activated for the first time and no countdown exists yet. Hosts can pick a
/// different duration through [`ClientBuilder::with_game_duration`].
pub const DEFAULT_GAME_DURATION: Duration = Duration::from_secs(120);

/// Default countdown tick granularity: one second.
///
/// Remaining time only changes in whole ticks. Pausing a countdown mid-tick
/// discards the partial tick, which is what bounds timer drift across session
/// switches to at most one tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default maximum number of buffered [`GameEvent`]s.
///
/// If the number of stored events exceeds this limit, the oldest events are
/// discarded. Hosts that drain [`GameClient::events`] every frame will never
/// come close to it.
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 100;

/// A session id assigned by the remote proof engine.
///
/// A [`GameSession`] starts out *pending* (no id); the id arrives with the
/// reply to the `START` operation and is recorded exactly once. All subsequent
/// engine operations for that session embed this id in their request path.
///
/// # Examples
///
/// ```
/// use proofline::SessionId;
///
/// let id = SessionId::new(17);
/// assert_eq!(id.as_u64(), 17);
/// assert_eq!(id.to_string(), "17");
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new `SessionId` from a `u64` value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        SessionId(id)
    }

    /// Returns the underlying `u64` value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        SessionId(id)
    }
}

impl From<SessionId> for u64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// A client-side handle identifying one session for the whole client lifetime.
///
/// Registry positions shift when a session is deleted, and the engine id only
/// exists once the engine has confirmed the session, so neither is a stable
/// key for correlating replies and events. The registry assigns each session a
/// monotonically increasing handle at creation; the handle never changes and
/// is never reused.
///
/// # Examples
///
/// ```
/// use proofline::SessionHandle;
///
/// let handle = SessionHandle::new(0);
/// assert_eq!(handle.as_u64(), 0);
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct SessionHandle(u64);

impl SessionHandle {
    /// Creates a new `SessionHandle` from a `u64` value.
    #[inline]
    #[must_use]
    pub const fn new(handle: u64) -> Self {
        SessionHandle(handle)
    }

    /// Returns the underlying `u64` value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionHandle {
    fn from(handle: u64) -> Self {
        SessionHandle(handle)
    }
}

impl From<SessionHandle> for u64 {
    fn from(handle: SessionHandle) -> Self {
        handle.0
    }
}

/// An index into a session's [`Timeline`].
///
/// `StateIndex` is a newtype wrapper around `usize` that keeps timeline
/// positions from being mixed up with other integers: the timeline cursor, the
/// two endpoints of a [`TheoremSelection`] and the `TIMELINE` engine operation
/// all speak in `StateIndex`.
///
/// # Examples
///
/// ```
/// use proofline::StateIndex;
///
/// let first = StateIndex::new(0);
/// let later = StateIndex::new(4);
/// assert!(first < later);
/// assert_eq!(later.as_usize(), 4);
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct StateIndex(usize);

impl StateIndex {
    /// Creates a new `StateIndex` from a `usize` value.
    ///
    /// Note: this does not validate the index against any timeline. Operations
    /// taking a `StateIndex` perform their own range checks.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        StateIndex(index)
    }

    /// Returns the underlying `usize` value.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StateIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for StateIndex {
    fn from(index: usize) -> Self {
        StateIndex(index)
    }
}

impl From<StateIndex> for usize {
    fn from(index: StateIndex) -> Self {
        index.0
    }
}

// #############
// #   ENUMS   #
// #############

/// The two ways a game can be played.
///
/// The mode is fixed at session creation and decides whether the session owns
/// a countdown: only `Normal` games are timed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Timed play against the countdown; victory reports elapsed time.
    Normal,
    /// Untimed play; the session never owns a countdown.
    Untimed,
}

impl GameMode {
    /// Returns `true` for modes that play against a countdown.
    #[inline]
    #[must_use]
    pub const fn is_timed(self) -> bool {
        matches!(self, GameMode::Normal)
    }

    /// The wire form of this mode, as the proof engine spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GameMode::Normal => "NORMAL",
            GameMode::Untimed => "UNTIMED",
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status the proof engine reports for a session with each proof state.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// The goal formula has not been reached yet.
    #[default]
    InProgress,
    /// The goal formula has been reached; the game is won.
    Victory,
}

impl GameStatus {
    /// The wire form of this status, as the proof engine spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GameStatus::InProgress => "IN_PROGRESS",
            GameStatus::Victory => "VICTORY",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications that you can receive from the client. Handling them is up to the user.
///
/// Events take the place of a callback surface: the client buffers them
/// during [`GameClient::poll`] and user-facing operations, and the
/// presentation layer drains them via [`GameClient::events`].
///
/// Events that concern one particular session carry its [`SessionHandle`];
/// look the session up through the registry accessors when more than the
/// handle is needed (for example the full timeline after
/// [`GameEvent::TimelineChanged`]).
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new event types may be
/// added in future versions. Always include a wildcard arm when matching:
///
/// ```ignore
/// match event {
///     GameEvent::Tick { handle, snapshot } => { /* repaint the clock */ }
///     GameEvent::Expired { handle } => { /* show defeat */ }
///     _ => { /* handle unknown events */ }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameEvent {
    /// The current session's countdown completed one tick.
    Tick {
        /// The session whose countdown ticked.
        handle: SessionHandle,
        /// Duration and remaining time after this tick; renders as `mm:ss`.
        snapshot: CountdownSnapshot,
    },
    /// The current session's countdown reached zero. Emitted exactly once per
    /// countdown, after the final [`GameEvent::Tick`]. The client submits the
    /// `DELETE` operation for the session on its own; the matching
    /// [`GameEvent::SessionListChanged`] follows once the engine acknowledges.
    Expired {
        /// The session whose countdown expired.
        handle: SessionHandle,
    },
    /// A timed session reached the goal formula.
    Victory {
        /// The session that was won.
        handle: SessionHandle,
        /// Time spent from countdown start to the winning rule application.
        elapsed: Duration,
    },
    /// The session's timeline changed: a state was appended or the cursor moved.
    TimelineChanged {
        /// The session whose timeline changed.
        handle: SessionHandle,
    },
    /// The theorem range selection changed: an endpoint was set or cleared, or
    /// selection mode was entered or exited.
    SelectionChanged {
        /// The endpoints after the change.
        selection: SelectionSnapshot,
    },
    /// Sessions were added, removed or reordered, or the current session
    /// changed. The game-list surface should rebuild from the registry.
    SessionListChanged,
    /// The engine accepted a `CREATETHEOREM` submission. Selection mode has
    /// been exited and the selection reset by the time this event is visible.
    TheoremCreated {
        /// The session the theorem was carved from.
        handle: SessionHandle,
    },
    /// The engine answered a `RULESLIST` request.
    RulesAvailable {
        /// The rules of the session's rule set, grouped by category.
        catalog: RuleCatalog,
    },
    /// The engine answered an operation with a non-success status. The
    /// operation was aborted without mutating any session; the message is
    /// meant for the user-facing notification surface.
    EngineRejected {
        /// The operation that failed, e.g. `APPLYRULE`.
        operation: &'static str,
        /// The failure description reported by the engine.
        message: String,
    },
}

// #############
// #  TRAITS   #
// #############

/// Compile time parameterization for clients.
///
/// This trait bundles the generic types needed for a client. Implement this on
/// a marker struct to configure your client types.
///
/// # Example
///
/// ```
/// use proofline::Config;
/// use serde::{Deserialize, Serialize};
///
/// // The proof engine's own representation of a formula. Proofline never
/// // inspects it; it is stored in the timeline and handed back to the
/// // rendering surface.
/// #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// struct Formula {
///     ast: String,
/// }
///
/// // Marker struct for Config
/// struct PuzzleConfig;
///
/// impl Config for PuzzleConfig {
///     type Math = Formula;
/// }
/// ```
#[cfg(feature = "sync-send")]
pub trait Config: 'static + Send + Sync {
    /// The opaque proof-engine payload carried by every proof state. The
    /// client stores and forwards it without interpreting it; only the engine
    /// and the rendering surface understand its structure.
    type Math: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync;
}

/// This [`ProofTransport`] trait is used to connect the client to the remote proof engine.
/// However you wish to exchange requests and replies, it should be implemented through
/// these two methods. Requests are fire-and-forget; replies are collected whenever the
/// client polls. The client correlates replies to requests through the
/// [`RequestToken`] echoed in each reply and never blocks on the transport.
#[cfg(feature = "sync-send")]
pub trait ProofTransport<T>: Send + Sync
where
    T: Config,
{
    /// Takes an [`EngineRequest`] and sends it to the proof engine.
    fn submit(&mut self, request: EngineRequest);

    /// This method should return all replies received since the last time this
    /// method was called.
    fn poll_replies(&mut self) -> Vec<EngineReply<T::Math>>;
}

/// Compile time parameterization for clients.
#[cfg(not(feature = "sync-send"))]
pub trait Config: 'static {
    /// The opaque proof-engine payload carried by every proof state. The
    /// client stores and forwards it without interpreting it; only the engine
    /// and the rendering surface understand its structure.
    type Math: Clone + PartialEq + Debug + Serialize + DeserializeOwned;
}

/// This [`ProofTransport`] trait is used to connect the client to the remote proof engine.
/// However you wish to exchange requests and replies, it should be implemented through
/// these two methods. Requests are fire-and-forget; replies are collected whenever the
/// client polls. The client correlates replies to requests through the
/// [`RequestToken`] echoed in each reply and never blocks on the transport.
#[cfg(not(feature = "sync-send"))]
pub trait ProofTransport<T>
where
    T: Config,
{
    /// Takes an [`EngineRequest`] and sends it to the proof engine.
    fn submit(&mut self, request: EngineRequest);

    /// This method should return all replies received since the last time this
    /// method was called.
    fn poll_replies(&mut self) -> Vec<EngineReply<T::Math>>;
}

// ###################
// # UNIT TESTS      #
// ###################
