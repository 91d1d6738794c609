//! One game session: launch parameters, engine identity, proof history and
//! the session's slot in the countdown lifecycle.
//!
//! Sessions are created by the registry and mutated through [`GameClient`];
//! this module owns the per-session rules, most importantly the timer slot
//! discipline: at most one session holds a [`TimerSlot::Live`] countdown, and
//! that session is always the registry's current one.
//!
//! [`GameClient`]: crate::GameClient

use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use crate::countdown::{Countdown, CountdownSnapshot, SignalVec};
use crate::engine::command::RequestToken;
use crate::error::ProoflineError;
use crate::report_violation;
use crate::telemetry::{ViolationKind, ViolationSeverity};
use crate::timeline::Timeline;
use crate::{Config, GameMode, GameStatus, SessionHandle, SessionId};

/// The launch parameters of one game, fixed at session creation.
///
/// `rule_set` and `formula_id` tell the proof engine which puzzle to set up;
/// `use_theorem` opts in to previously created theorem rules. Restarting a
/// game reuses the config of the game it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Timed or untimed play.
    pub mode: GameMode,
    /// Name of the rule set the game draws its rules from.
    pub rule_set: String,
    /// Which starting formula of the rule set to play.
    pub formula_id: u32,
    /// Whether theorem rules created in earlier games are available.
    pub use_theorem: bool,
}

impl GameConfig {
    /// Creates a game configuration.
    pub fn new(
        mode: GameMode,
        rule_set: impl Into<String>,
        formula_id: u32,
        use_theorem: bool,
    ) -> Self {
        GameConfig {
            mode,
            rule_set: rule_set.into(),
            formula_id,
            use_theorem,
        }
    }
}

/// Where a session's countdown lives.
///
/// Untimed sessions stay [`Absent`](TimerSlot::Absent) forever. A timed
/// session holds a [`Live`](TimerSlot::Live) countdown exactly while it is the
/// current session; switching away demotes the countdown to a
/// [`Suspended`](TimerSlot::Suspended) snapshot, and switching back restores
/// it with the remaining time intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerSlot {
    /// No countdown exists for this session.
    Absent,
    /// The countdown is materialized and under this session's control.
    Live(Countdown),
    /// Only the serialized description survives; the session is not current.
    Suspended(CountdownSnapshot),
}

impl TimerSlot {
    /// `true` while the slot holds a materialized countdown.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, TimerSlot::Live(_))
    }

    /// The countdown's serialized description, if any countdown exists.
    #[must_use]
    pub fn snapshot(&self) -> Option<CountdownSnapshot> {
        match self {
            TimerSlot::Absent => None,
            TimerSlot::Live(countdown) => Some(countdown.snapshot()),
            TimerSlot::Suspended(snapshot) => Some(*snapshot),
        }
    }

    /// `true` when a countdown exists and has nothing left on the clock.
    #[must_use]
    pub fn is_over(&self) -> bool {
        match self {
            TimerSlot::Absent => false,
            TimerSlot::Live(countdown) => countdown.is_over(),
            TimerSlot::Suspended(snapshot) => snapshot.is_over(),
        }
    }
}

/// One game in the registry: identity, configuration, verdict, history, timer.
///
/// A session is born *pending*: it has a client-side [`SessionHandle`] from
/// the start, but no [`SessionId`] until the proof engine confirms the
/// creation. Operations that address the engine require the id and fail with
/// [`ProoflineError::SessionPending`] until it arrives.
pub struct GameSession<T>
where
    T: Config,
{
    /// Client-stable identity, assigned by the registry at creation.
    handle: SessionHandle,
    /// Engine-assigned identity. `None` until the `START` reply arrives.
    id: Option<SessionId>,
    /// Launch parameters.
    config: GameConfig,
    /// Latest verdict the engine reported for this session.
    status: GameStatus,
    /// Proof history with cursor.
    timeline: Timeline<T>,
    /// The session's place in the countdown lifecycle.
    timer: TimerSlot,
    /// Token of the engine request this session is waiting on, if any. At
    /// most one request may be outstanding per session.
    pending: Option<RequestToken>,
}

impl<T: Config> std::fmt::Debug for GameSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        let Self {
            handle,
            id,
            config,
            status,
            timeline,
            timer,
            pending,
        } = self;

        f.debug_struct("GameSession")
            .field("handle", handle)
            .field("id", id)
            .field("config", config)
            .field("status", status)
            .field("timeline_len", &timeline.len())
            .field("cursor", &timeline.cursor())
            .field("timer", timer)
            .field("pending", pending)
            .finish()
    }
}

impl<T: Config> GameSession<T> {
    /// Creates a pending session with an empty timeline and no timer.
    pub(crate) fn new(handle: SessionHandle, config: GameConfig) -> Self {
        Self {
            handle,
            id: None,
            config,
            status: GameStatus::InProgress,
            timeline: Timeline::new(),
            timer: TimerSlot::Absent,
            pending: None,
        }
    }

    /// The client-stable handle of this session.
    #[must_use]
    pub const fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// The engine-assigned id, or `None` while the session is pending.
    #[must_use]
    pub const fn engine_id(&self) -> Option<SessionId> {
        self.id
    }

    /// The launch parameters the session was created with.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Shortcut for the session's play mode.
    #[must_use]
    pub const fn mode(&self) -> GameMode {
        self.config.mode
    }

    /// The latest verdict the engine reported.
    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    /// The proof history.
    #[must_use]
    pub const fn timeline(&self) -> &Timeline<T> {
        &self.timeline
    }

    /// The session's timer slot.
    #[must_use]
    pub const fn timer(&self) -> &TimerSlot {
        &self.timer
    }

    /// The countdown's serialized description, if this session has a timer.
    ///
    /// This is what the session list renders for non-current timed games.
    #[must_use]
    pub fn timer_snapshot(&self) -> Option<CountdownSnapshot> {
        self.timer.snapshot()
    }

    /// `true` while an engine request for this session is outstanding.
    #[must_use]
    pub const fn is_pending_reply(&self) -> bool {
        self.pending.is_some()
    }

    /// The token of the outstanding request, if any.
    #[must_use]
    pub const fn pending_token(&self) -> Option<RequestToken> {
        self.pending
    }

    pub(crate) fn timeline_mut(&mut self) -> &mut Timeline<T> {
        &mut self.timeline
    }

    /// Marks the session as waiting for the reply to `token`.
    pub(crate) fn set_pending(&mut self, token: RequestToken) {
        self.pending = Some(token);
    }

    /// Clears and returns the outstanding token.
    pub(crate) fn take_pending(&mut self) -> Option<RequestToken> {
        self.pending.take()
    }

    /// Records the engine-assigned id. The id may be recorded exactly once.
    ///
    /// # Errors
    /// - [`ProoflineError::AlreadyAssigned`] on a second assignment.
    pub(crate) fn record_engine_id(&mut self, id: SessionId) -> Result<(), ProoflineError> {
        match self.id {
            None => {
                self.id = Some(id);
                tracing::debug!(handle = self.handle.as_u64(), id = id.as_u64(), "session confirmed");
                Ok(())
            }
            Some(existing) => Err(ProoflineError::AlreadyAssigned {
                existing,
                attempted: id,
            }),
        }
    }

    /// Appends an engine-reported proof state and records its verdict.
    ///
    /// Returns `true` when this state is the one that wins the game, i.e. the
    /// verdict changed from in-progress to victory. Subsequent victory states
    /// (the engine repeats the verdict on refresh) return `false`.
    pub(crate) fn apply_proof_state(
        &mut self,
        state: crate::timeline::ProofState<T::Math>,
        status: GameStatus,
    ) -> bool {
        self.timeline.push(state);
        self.record_verdict(status)
    }

    /// Records an engine-reported verdict without touching the timeline.
    ///
    /// Returns `true` on the in-progress to victory transition, `false` for
    /// every other combination including repeated victory verdicts.
    pub(crate) fn record_verdict(&mut self, status: GameStatus) -> bool {
        let newly_won =
            self.status != GameStatus::Victory && status == GameStatus::Victory;
        self.status = status;
        newly_won
    }

    /// Demotes a live countdown to its snapshot, freezing the clock.
    ///
    /// No-op for sessions without a live countdown. Called when the session
    /// stops being current, and on victory to stop the clock at the winning
    /// moment.
    pub(crate) fn suspend_timer(&mut self) {
        if let TimerSlot::Live(countdown) = &mut self.timer {
            if countdown.is_running() {
                if let Err(e) = countdown.pause() {
                    report_violation!(
                        ViolationSeverity::Error,
                        ViolationKind::CountdownLifecycle,
                        "failed to pause a running countdown while suspending session {}: {}",
                        self.handle,
                        e
                    );
                }
            }
            self.timer = TimerSlot::Suspended(countdown.snapshot());
        }
    }

    /// Materializes and starts this session's countdown, making it the one
    /// live countdown.
    ///
    /// - Untimed sessions ignore the call; their slot stays `Absent`.
    /// - A suspended countdown is restored with its remaining time intact and
    ///   started.
    /// - A timed session without any countdown yet (first activation) gets a
    ///   fresh one over `default_duration`.
    /// - A countdown that is already live and running stays untouched; this
    ///   indicates a caller sequencing bug and is reported as a
    ///   countdown-lifecycle violation.
    ///
    /// # Errors
    /// - [`ProoflineError::AlreadyOver`] if the suspended countdown has
    ///   nothing left; the slot is left unchanged and the game counts as lost.
    /// - [`ProoflineError::InvalidRequest`] if `tick` or `default_duration`
    ///   is zero (builder validation normally rules this out).
    pub(crate) fn resume_timer(
        &mut self,
        now: Instant,
        tick: Duration,
        default_duration: Duration,
    ) -> Result<(), ProoflineError> {
        if !self.config.mode.is_timed() {
            return Ok(());
        }
        match std::mem::replace(&mut self.timer, TimerSlot::Absent) {
            TimerSlot::Absent => {
                let mut countdown = Countdown::with_tick(default_duration, tick)?;
                countdown.start_at(now)?;
                self.timer = TimerSlot::Live(countdown);
                Ok(())
            }
            TimerSlot::Suspended(snapshot) => {
                let mut countdown = Countdown::restore(snapshot, tick)?;
                match countdown.start_at(now) {
                    Ok(()) => {
                        self.timer = TimerSlot::Live(countdown);
                        Ok(())
                    }
                    Err(e) => {
                        // Nothing left on the clock; keep the snapshot around.
                        self.timer = TimerSlot::Suspended(snapshot);
                        Err(e)
                    }
                }
            }
            TimerSlot::Live(mut countdown) => {
                if countdown.is_running() {
                    report_violation!(
                        ViolationSeverity::Warning,
                        ViolationKind::CountdownLifecycle,
                        "countdown of session {} resumed while already running",
                        self.handle
                    );
                    self.timer = TimerSlot::Live(countdown);
                    return Ok(());
                }
                let result = countdown.start_at(now);
                self.timer = TimerSlot::Live(countdown);
                result
            }
        }
    }

    /// Advances a live countdown to `now`; empty batch otherwise.
    #[must_use]
    pub(crate) fn poll_timer(&mut self, now: Instant) -> SignalVec {
        match &mut self.timer {
            TimerSlot::Live(countdown) => countdown.poll_at(now),
            _ => SignalVec::new(),
        }
    }
}

// ###################
// # UNIT TESTS      #
// ###################
