use crate::countdown::{CountdownSignal, CountdownSnapshot};
use crate::engine::command::{EngineCommand, EngineRequest, RequestToken};
use crate::engine::reply::{EngineReply, EngineStatus, ReplyBody, StateBody};
use crate::error::ProoflineError;
use crate::selection::{SelectionSnapshot, TheoremSelection};
use crate::{debug_check_invariants, report_violation_to};
use crate::sessions::event_drain::EventDrain;
use crate::sessions::game_session::{GameConfig, GameSession};
use crate::sessions::registry::SessionRegistry;
use crate::telemetry::{
    report_to_observer, InvariantChecker, InvariantViolation, SpecViolation, ViolationKind,
    ViolationObserver, ViolationSeverity,
};
use crate::{
    Config, GameEvent, GameStatus, ProofTransport, SessionHandle, SessionId, StateIndex,
};
use tracing::debug;

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use web_time::{Duration, Instant};

/// Why a `DELETE` was submitted; decides what happens once the engine acks.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeleteReason {
    /// The user closed the game.
    User,
    /// The game was won; the engine-side game is retired.
    Victory,
    /// The countdown ran out.
    Expired,
    /// The user asked for a fresh game with the same configuration. The ack
    /// chains a new `START`.
    Restart(GameConfig),
}

/// What we asked the engine for; decides how the matching reply is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallKind {
    Start,
    /// Carries the engine id, since the `RESUME` ack does not echo it.
    Resume { id: SessionId },
    FetchState,
    ApplyRule,
    StepBack,
    StepForward,
    /// Carries the cursor to restore if the engine rejects the jump.
    Jump { back_to: StateIndex },
    CreateTheorem,
    RulesList,
    Delete { reason: DeleteReason },
}

impl CallKind {
    /// The operation tag, for rejection events and diagnostics.
    const fn operation(&self) -> &'static str {
        match self {
            CallKind::Start => "START",
            CallKind::Resume { .. } => "RESUME",
            CallKind::FetchState => "GAMESTATE",
            CallKind::ApplyRule => "APPLYRULE",
            CallKind::StepBack => "PREVIOUS",
            CallKind::StepForward => "NEXT",
            CallKind::Jump { .. } => "TIMELINE",
            CallKind::CreateTheorem => "CREATETHEOREM",
            CallKind::RulesList => "RULESLIST",
            CallKind::Delete { .. } => "DELETE",
        }
    }
}

/// One request the engine has not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCall {
    /// The session the request belongs to.
    handle: SessionHandle,
    /// How to interpret the reply.
    kind: CallKind,
}

/// A [`GameClient`] owns the open game sessions, the countdown of the current
/// one, and the request/reply exchange with the proof engine.
///
/// The client never blocks and never spawns anything: call
/// [`poll`](Self::poll) regularly with the current instant, then drain
/// [`events`](Self::events) and repaint. Operations submit a request over the
/// [`ProofTransport`] and return immediately; the effect lands in a later
/// poll, when the engine's reply arrives.
///
/// At most one request per session is in flight at a time. Submitting a
/// second one is rejected with [`ProoflineError::RequestInFlight`] until the
/// reply to the first has been processed.
pub struct GameClient<T>
where
    T: Config,
{
    /// The open sessions and which one is current.
    registry: SessionRegistry<T>,
    /// The [`GameClient`] uses this transport to send and receive all
    /// messages for the proof engine.
    transport: Box<dyn ProofTransport<T>>,
    /// Theorem range selection; `Some` while selection mode is active.
    selection: Option<TheoremSelection>,
    /// Contains all events to be forwarded to the user.
    event_queue: VecDeque<GameEvent>,
    /// Capacity of the event queue before the oldest events are dropped.
    event_queue_size: usize,
    /// Requests the engine has not answered yet, keyed by their token.
    inflight: BTreeMap<RequestToken, PendingCall>,
    /// The token the next request will carry.
    next_token: RequestToken,
    /// Countdown duration handed to new timed sessions.
    game_duration: Duration,
    /// Tick granularity of every countdown.
    tick_interval: Duration,
    /// Optional observer for specification violations.
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl<T: Config> std::fmt::Debug for GameClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        let Self {
            registry,
            transport: _,
            selection,
            event_queue,
            event_queue_size,
            inflight,
            next_token,
            game_duration,
            tick_interval,
            violation_observer: _,
        } = self;
        f.debug_struct("GameClient")
            .field("registry", registry)
            .field("selection", selection)
            .field("queued_events", &event_queue.len())
            .field("event_queue_size", event_queue_size)
            .field("inflight", &inflight.len())
            .field("next_token", next_token)
            .field("game_duration", game_duration)
            .field("tick_interval", tick_interval)
            .finish_non_exhaustive()
    }
}

impl<T: Config> GameClient<T> {
    /// Creates a new [`GameClient`] over the given transport.
    ///
    /// Note: This is an internal constructor called via ClientBuilder, which
    /// validates the durations and the queue size before handing them over.
    pub(crate) fn new(
        transport: Box<dyn ProofTransport<T>>,
        game_duration: Duration,
        tick_interval: Duration,
        event_queue_size: usize,
        violation_observer: Option<Arc<dyn ViolationObserver>>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            transport,
            selection: None,
            event_queue: VecDeque::new(),
            event_queue_size,
            inflight: BTreeMap::new(),
            next_token: RequestToken::new(0),
            game_duration,
            tick_interval,
            violation_observer,
        }
    }

    // ----------------------------------------------------------------------
    // session lifecycle
    // ----------------------------------------------------------------------

    /// Opens a new game with the given configuration and makes it current.
    ///
    /// The previous current session's countdown is suspended. A `START`
    /// request is submitted; once the engine acks with the game id, the
    /// client fetches the initial proof state and, for timed games, starts
    /// the countdown. Until then the session reports no engine id and
    /// rejects further operations with [`ProoflineError::RequestInFlight`].
    pub fn new_game(&mut self, config: GameConfig) -> SessionHandle {
        self.clear_selection_mode();
        self.open_session(config)
    }

    /// Re-attaches to a game the engine still holds, e.g. after the client
    /// process restarted.
    ///
    /// A `RESUME` request is submitted; on ack the session is wired up
    /// exactly like a freshly started one, with a full countdown.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if a session with this id is
    ///   already open.
    pub fn reconnect(
        &mut self,
        id: SessionId,
        config: GameConfig,
    ) -> Result<SessionHandle, ProoflineError> {
        if self.registry.index_of_id(id).is_some() {
            return Err(ProoflineError::InvalidRequest {
                info: format!("game {id} is already open"),
            });
        }
        self.clear_selection_mode();
        let command = EngineCommand::Resume { game_id: id };
        let handle = self.registry.create_session(config);
        self.push_event(GameEvent::SessionListChanged);
        self.submit_request(handle, CallKind::Resume { id }, command);
        Ok(handle)
    }

    /// Makes the session at `index` current.
    ///
    /// The outgoing session's countdown is suspended with its remaining time
    /// intact; the incoming one resumes from where it was left, or starts
    /// fresh if it never ran. Switching to the already current session is a
    /// no-op. A switch onto a session whose countdown ran out while it was
    /// suspended emits [`GameEvent::Expired`] and retires the game.
    ///
    /// # Errors
    /// - [`ProoflineError::OutOfRange`] if `index` is not a valid position.
    pub fn switch_to(&mut self, index: usize, now: Instant) -> Result<(), ProoflineError> {
        if self.registry.current_index() == Some(index) {
            return Ok(());
        }
        match self
            .registry
            .switch_to(index, now, self.tick_interval, self.game_duration)
        {
            Ok(()) => {
                self.clear_selection_mode();
                self.push_event(GameEvent::SessionListChanged);
                Ok(())
            }
            Err(ProoflineError::AlreadyOver) => {
                // The selection has already moved; announce it, then retire
                // the expired game.
                self.clear_selection_mode();
                self.push_event(GameEvent::SessionListChanged);
                self.expire_current();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Closes the current game.
    ///
    /// Submits `DELETE`; the session leaves the registry once the engine
    /// acks, and the nearest neighbor becomes current.
    ///
    /// # Errors
    /// - [`ProoflineError::NoActiveSession`] if no session is open.
    /// - [`ProoflineError::RequestInFlight`] if a request is outstanding.
    /// - [`ProoflineError::SessionPending`] if the engine never confirmed
    ///   this session.
    pub fn delete_game(&mut self) -> Result<(), ProoflineError> {
        let index = self
            .registry
            .current_index()
            .ok_or(ProoflineError::NoActiveSession)?;
        self.delete_game_at(index)
    }

    /// Closes the game at `index`, current or not.
    ///
    /// # Errors
    /// Same as [`delete_game`](Self::delete_game), plus
    /// [`ProoflineError::OutOfRange`] for an invalid index.
    pub fn delete_game_at(&mut self, index: usize) -> Result<(), ProoflineError> {
        let session = self.registry.get(index).ok_or(ProoflineError::OutOfRange {
            index,
            len: self.registry.len(),
        })?;
        if let Some(token) = session.pending_token() {
            return Err(ProoflineError::RequestInFlight { token });
        }
        let id = session.engine_id().ok_or(ProoflineError::SessionPending)?;
        let handle = session.handle();
        self.submit_request(
            handle,
            CallKind::Delete {
                reason: DeleteReason::User,
            },
            EngineCommand::Delete { game_id: id },
        );
        Ok(())
    }

    /// Replaces the current game with a fresh one of the same configuration.
    ///
    /// Submits `DELETE`; once acked, the session is removed and a `START`
    /// with the stored configuration follows automatically.
    ///
    /// # Errors
    /// Same as [`delete_game`](Self::delete_game).
    pub fn restart_game(&mut self) -> Result<(), ProoflineError> {
        let (handle, id) = self.ready_current()?;
        let config = self
            .registry
            .current()
            .map(|session| session.config().clone())
            .ok_or(ProoflineError::NoActiveSession)?;
        self.submit_request(
            handle,
            CallKind::Delete {
                reason: DeleteReason::Restart(config),
            },
            EngineCommand::Delete { game_id: id },
        );
        Ok(())
    }

    // ----------------------------------------------------------------------
    // gameplay
    // ----------------------------------------------------------------------

    /// Fetches the current proof state from the engine.
    ///
    /// The reply replaces the state under the cursor; the countdown is not
    /// touched.
    ///
    /// # Errors
    /// - [`ProoflineError::NoActiveSession`] if no session is open.
    /// - [`ProoflineError::RequestInFlight`] if a request is outstanding.
    /// - [`ProoflineError::SessionPending`] if the engine never confirmed
    ///   this session.
    pub fn refresh(&mut self) -> Result<(), ProoflineError> {
        let (handle, id) = self.ready_current()?;
        self.submit_request(
            handle,
            CallKind::FetchState,
            EngineCommand::GameState { game_id: id },
        );
        Ok(())
    }

    /// Applies a rewrite rule to a subexpression of the current formula.
    ///
    /// The reply appends the new state after the cursor; any states beyond
    /// the cursor are discarded first, so rewriting from the middle of the
    /// timeline starts a fresh branch.
    ///
    /// # Errors
    /// Same as [`refresh`](Self::refresh).
    pub fn apply_rule(
        &mut self,
        expr_id: u32,
        rule_id: u32,
        context: impl Into<String>,
    ) -> Result<(), ProoflineError> {
        let (handle, id) = self.ready_current()?;
        self.submit_request(
            handle,
            CallKind::ApplyRule,
            EngineCommand::ApplyRule {
                game_id: id,
                expr_id,
                rule_id,
                context: context.into(),
            },
        );
        Ok(())
    }

    /// Moves the cursor one state back.
    ///
    /// Returns `Ok(false)` without touching the engine when the cursor is
    /// already on the first state. Otherwise the cursor moves immediately,
    /// `PREVIOUS` is submitted, and the reply is checked against the state
    /// the cursor landed on.
    ///
    /// # Errors
    /// Same as [`refresh`](Self::refresh).
    pub fn step_back(&mut self) -> Result<bool, ProoflineError> {
        let (handle, id) = self.ready_current()?;
        let moved = self
            .registry
            .current_mut()
            .is_some_and(|session| session.timeline_mut().step_back());
        if !moved {
            return Ok(false);
        }
        self.push_event(GameEvent::TimelineChanged { handle });
        self.submit_request(
            handle,
            CallKind::StepBack,
            EngineCommand::Previous { game_id: id },
        );
        Ok(true)
    }

    /// Moves the cursor one state forward.
    ///
    /// Returns `Ok(false)` without touching the engine when the cursor is
    /// already on the newest state.
    ///
    /// # Errors
    /// Same as [`refresh`](Self::refresh).
    pub fn step_forward(&mut self) -> Result<bool, ProoflineError> {
        let (handle, id) = self.ready_current()?;
        let moved = self
            .registry
            .current_mut()
            .is_some_and(|session| session.timeline_mut().step_forward());
        if !moved {
            return Ok(false);
        }
        self.push_event(GameEvent::TimelineChanged { handle });
        self.submit_request(
            handle,
            CallKind::StepForward,
            EngineCommand::Next { game_id: id },
        );
        Ok(true)
    }

    /// Moves the cursor to an arbitrary timeline index.
    ///
    /// Jumping to the index the cursor is already on is a local no-op.
    ///
    /// # Errors
    /// - [`ProoflineError::OutOfRange`] if `index` is beyond the timeline;
    ///   nothing is submitted.
    /// - Otherwise same as [`refresh`](Self::refresh).
    pub fn jump_to(&mut self, index: StateIndex) -> Result<(), ProoflineError> {
        let (handle, id) = self.ready_current()?;
        let Some(session) = self.registry.current_mut() else {
            return Err(ProoflineError::NoActiveSession);
        };
        let Some(back_to) = session.timeline().cursor() else {
            return Err(ProoflineError::OutOfRange {
                index: index.as_usize(),
                len: 0,
            });
        };
        if back_to == index {
            return Ok(());
        }
        session.timeline_mut().jump_to(index)?;
        self.push_event(GameEvent::TimelineChanged { handle });
        self.submit_request(
            handle,
            CallKind::Jump { back_to },
            EngineCommand::Timeline { game_id: id, index },
        );
        Ok(())
    }

    /// Handles a click on a timeline entry.
    ///
    /// In selection mode the click becomes
    /// [`toggle_selection`](Self::toggle_selection); otherwise it jumps the
    /// cursor there via [`jump_to`](Self::jump_to).
    ///
    /// # Errors
    /// - [`ProoflineError::OutOfRange`] if `index` is beyond the timeline.
    /// - Outside selection mode, same as [`jump_to`](Self::jump_to).
    pub fn click_timeline(&mut self, index: StateIndex) -> Result<(), ProoflineError> {
        if self.selection.is_some() {
            self.toggle_selection(index)
        } else {
            self.jump_to(index)
        }
    }

    // ----------------------------------------------------------------------
    // theorem creation
    // ----------------------------------------------------------------------

    /// Enters theorem selection mode with an empty selection.
    ///
    /// While the mode is active, timeline clicks toggle range endpoints
    /// instead of moving the cursor. Entering again is a no-op.
    ///
    /// # Errors
    /// - [`ProoflineError::NoActiveSession`] if no session is open.
    pub fn enter_theorem_mode(&mut self) -> Result<(), ProoflineError> {
        if self.registry.current().is_none() {
            return Err(ProoflineError::NoActiveSession);
        }
        if self.selection.is_none() {
            self.selection = Some(TheoremSelection::new());
            self.push_event(GameEvent::SelectionChanged {
                selection: SelectionSnapshot::default(),
            });
        }
        Ok(())
    }

    /// Leaves theorem selection mode and clears both endpoints.
    ///
    /// A no-op when the mode is not active.
    pub fn exit_theorem_mode(&mut self) {
        self.clear_selection_mode();
    }

    /// Toggles the theorem endpoint at `index`.
    ///
    /// The first click fills the start slot and the second the end slot;
    /// clicking a held endpoint releases it. With both slots taken, further
    /// indices change nothing. Each change surfaces as
    /// [`GameEvent::SelectionChanged`].
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if selection mode is not active.
    /// - [`ProoflineError::OutOfRange`] if `index` is beyond the timeline.
    pub fn toggle_selection(&mut self, index: StateIndex) -> Result<(), ProoflineError> {
        if self.selection.is_none() {
            return Err(ProoflineError::InvalidRequest {
                info: "theorem selection mode is not active".to_owned(),
            });
        }
        let len = self
            .registry
            .current()
            .map_or(0, |session| session.timeline().len());
        if index.as_usize() >= len {
            return Err(ProoflineError::OutOfRange {
                index: index.as_usize(),
                len,
            });
        }
        let changed = self
            .selection
            .as_mut()
            .is_some_and(|selection| selection.toggle(index));
        if changed {
            let selection = self.selection();
            self.push_event(GameEvent::SelectionChanged { selection });
        }
        Ok(())
    }

    /// Submits the selected timeline range as a new theorem.
    ///
    /// The endpoints are normalized so the smaller index is sent first.
    /// Selection mode is exited as soon as the request is on its way; the
    /// engine's ack surfaces as [`GameEvent::TheoremCreated`].
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if selection mode is not active.
    /// - [`ProoflineError::IncompleteSelection`] if fewer than two endpoints
    ///   are selected; nothing is submitted.
    /// - Otherwise same as [`refresh`](Self::refresh).
    pub fn submit_theorem(&mut self) -> Result<(), ProoflineError> {
        let selection = self
            .selection
            .as_ref()
            .ok_or_else(|| ProoflineError::InvalidRequest {
                info: "theorem selection mode is not active".to_owned(),
            })?;
        let (start, end) = selection.normalized()?;
        let (handle, id) = self.ready_current()?;
        self.submit_request(
            handle,
            CallKind::CreateTheorem,
            EngineCommand::CreateTheorem {
                game_id: id,
                start,
                end,
            },
        );
        self.clear_selection_mode();
        Ok(())
    }

    /// Fetches the rule catalog of the current game's rule set.
    ///
    /// The reply surfaces as [`GameEvent::RulesAvailable`].
    ///
    /// # Errors
    /// Same as [`refresh`](Self::refresh).
    pub fn rules_list(&mut self) -> Result<(), ProoflineError> {
        let (handle, id) = self.ready_current()?;
        self.submit_request(
            handle,
            CallKind::RulesList,
            EngineCommand::RulesList { game_id: id },
        );
        Ok(())
    }

    // ----------------------------------------------------------------------
    // clock and polling
    // ----------------------------------------------------------------------

    /// Should be called periodically by your application to give the client a
    /// chance to do internal work. The client advances the current countdown
    /// to `now`, queueing one [`GameEvent::Tick`] per elapsed tick, and
    /// processes every engine reply the transport has collected.
    ///
    /// A countdown reaching zero queues [`GameEvent::Expired`] and submits
    /// the `DELETE` for the dead game on its own.
    pub fn poll(&mut self, now: Instant) {
        self.poll_clock(now);
        self.poll_engine(now);
        debug_check_invariants!(self, "poll");
    }

    /// Suspends every countdown, freezing the remaining time.
    ///
    /// For the host to call when the whole application loses focus or shuts
    /// down. [`resume_clock`](Self::resume_clock) or a session switch brings
    /// the current session's countdown back.
    pub fn stop_all_timers(&mut self) {
        self.registry.stop_all_timers();
    }

    /// Resumes the current session's countdown at `now`.
    ///
    /// A countdown that ran out while suspended emits
    /// [`GameEvent::Expired`] and retires the game instead.
    pub fn resume_clock(&mut self, now: Instant) {
        self.start_clock_for_current(now);
    }

    // ----------------------------------------------------------------------
    // accessors
    // ----------------------------------------------------------------------

    /// The session registry: every open session plus the current selection.
    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry<T> {
        &self.registry
    }

    /// The current session, or `None` when no game is open.
    #[must_use]
    pub fn current_session(&self) -> Option<&GameSession<T>> {
        self.registry.current()
    }

    /// `true` while theorem selection mode is active.
    #[must_use]
    pub const fn in_theorem_mode(&self) -> bool {
        self.selection.is_some()
    }

    /// The theorem selection endpoints; empty outside selection mode.
    #[must_use]
    pub fn selection(&self) -> SelectionSnapshot {
        self.selection
            .as_ref()
            .map_or_else(SelectionSnapshot::default, TheoremSelection::snapshot)
    }

    /// Number of requests submitted but not yet answered.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inflight.len()
    }

    /// The countdown duration handed to new timed games.
    #[must_use]
    pub const fn game_duration(&self) -> Duration {
        self.game_duration
    }

    /// The tick granularity of every countdown.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Returns all events produced since the last time this method was
    /// called.
    pub fn events(&mut self) -> EventDrain<'_> {
        EventDrain::from_drain(self.event_queue.drain(..))
    }

    // ----------------------------------------------------------------------
    // internals
    // ----------------------------------------------------------------------

    /// The current session's handle and engine id, once it is idle and
    /// confirmed.
    fn ready_current(&self) -> Result<(SessionHandle, SessionId), ProoflineError> {
        let session = self
            .registry
            .current()
            .ok_or(ProoflineError::NoActiveSession)?;
        if let Some(token) = session.pending_token() {
            return Err(ProoflineError::RequestInFlight { token });
        }
        let id = session.engine_id().ok_or(ProoflineError::SessionPending)?;
        Ok((session.handle(), id))
    }

    /// Creates the local session and submits its `START`.
    fn open_session(&mut self, config: GameConfig) -> SessionHandle {
        let command = EngineCommand::Start {
            mode: config.mode,
            rule_set: config.rule_set.clone(),
            formula_id: config.formula_id,
            use_theorem: config.use_theorem,
        };
        let handle = self.registry.create_session(config);
        self.push_event(GameEvent::SessionListChanged);
        self.submit_request(handle, CallKind::Start, command);
        handle
    }

    fn allocate_token(&mut self) -> RequestToken {
        let token = self.next_token;
        self.next_token = token.next();
        token
    }

    /// Hands a request to the transport and records it as in flight.
    fn submit_request(&mut self, handle: SessionHandle, kind: CallKind, command: EngineCommand) {
        let token = self.allocate_token();
        if let Some(session) = self.registry.find_by_handle_mut(handle) {
            session.set_pending(token);
        }
        debug!(
            token = token.as_u64(),
            handle = handle.as_u64(),
            operation = kind.operation(),
            "submitting engine request"
        );
        self.inflight.insert(token, PendingCall { handle, kind });
        self.transport.submit(EngineRequest::new(token, command));
    }

    /// Queues an event for the user, dropping the oldest beyond capacity.
    fn push_event(&mut self, event: GameEvent) {
        self.event_queue.push_back(event);
        while self.event_queue.len() > self.event_queue_size {
            self.event_queue.pop_front();
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::Configuration,
                "event queue exceeded {} entries, dropping the oldest event",
                self.event_queue_size
            );
        }
    }

    /// Exits selection mode, announcing the cleared selection if it was
    /// active.
    fn clear_selection_mode(&mut self) {
        if self.selection.take().is_some() {
            self.push_event(GameEvent::SelectionChanged {
                selection: SelectionSnapshot::default(),
            });
        }
    }

    /// Advances the current countdown and queues its signals as events.
    fn poll_clock(&mut self, now: Instant) {
        let Some(session) = self.registry.current_mut() else {
            return;
        };
        let handle = session.handle();
        let duration = session
            .timer_snapshot()
            .map_or(self.game_duration, |snapshot| snapshot.duration());
        let signals = session.poll_timer(now);
        let mut expired = false;
        for signal in signals {
            match signal {
                CountdownSignal::Tick { remaining } => {
                    self.push_event(GameEvent::Tick {
                        handle,
                        snapshot: CountdownSnapshot::new(duration, remaining),
                    });
                }
                CountdownSignal::Expired => {
                    expired = true;
                    self.push_event(GameEvent::Expired { handle });
                }
            }
        }
        if expired {
            self.retire_expired(handle);
        }
    }

    /// Drains the transport and applies every reply.
    fn poll_engine(&mut self, now: Instant) {
        let replies = self.transport.poll_replies();
        for reply in replies {
            self.handle_reply(reply, now);
        }
    }

    /// Correlates one reply with its in-flight request and applies it.
    fn handle_reply(&mut self, reply: EngineReply<T::Math>, now: Instant) {
        let EngineReply {
            token,
            status,
            body,
        } = reply;
        let Some(PendingCall { handle, kind }) = self.inflight.remove(&token) else {
            let violation = SpecViolation::new(
                ViolationSeverity::Warning,
                ViolationKind::EngineProtocol,
                format!("reply carried unknown token {token}, dropping it"),
                concat!(file!(), ":", line!()),
            );
            report_to_observer(self.violation_observer.as_ref(), &violation);
            return;
        };
        match self.registry.find_by_handle_mut(handle) {
            Some(session) => {
                let pending = session.take_pending();
                if pending != Some(token) {
                    let violation = SpecViolation::new(
                        ViolationSeverity::Warning,
                        ViolationKind::EngineProtocol,
                        format!(
                            "session expected reply token {pending:?} but the engine answered {token}"
                        ),
                        concat!(file!(), ":", line!()),
                    )
                    .with_session(handle);
                    report_to_observer(self.violation_observer.as_ref(), &violation);
                }
            }
            None => {
                let violation = SpecViolation::new(
                    ViolationSeverity::Warning,
                    ViolationKind::EngineProtocol,
                    format!("reply {token} addresses a session that no longer exists"),
                    concat!(file!(), ":", line!()),
                )
                .with_session(handle);
                report_to_observer(self.violation_observer.as_ref(), &violation);
                return;
            }
        }
        // An expiry observed while this request was in flight could not
        // retire the session then; catch up once the slot is free again.
        // Failed deletions are not retried here, the host decides.
        let retire_after = !matches!(kind, CallKind::Delete { .. });
        match status {
            EngineStatus::Ok => self.dispatch_success(handle, kind, body, now),
            EngineStatus::Error { message } => self.dispatch_failure(handle, kind, message, now),
        }
        if retire_after {
            self.retire_expired(handle);
        }
    }

    /// Applies a successful reply according to what was asked.
    fn dispatch_success(
        &mut self,
        handle: SessionHandle,
        kind: CallKind,
        body: Option<ReplyBody<T::Math>>,
        now: Instant,
    ) {
        let operation = kind.operation();
        match kind {
            CallKind::Start => match body {
                Some(ReplyBody::Started { id }) => self.finish_attach(handle, id, now),
                _ => self.reply_shape_violation(handle, operation),
            },
            CallKind::Resume { id } => match body {
                Some(ReplyBody::Ack) => self.finish_attach(handle, id, now),
                _ => self.reply_shape_violation(handle, operation),
            },
            CallKind::FetchState => match body {
                Some(ReplyBody::State(state)) => self.apply_state_reply(handle, state, false),
                _ => self.reply_shape_violation(handle, operation),
            },
            CallKind::ApplyRule => match body {
                Some(ReplyBody::State(state)) => self.apply_state_reply(handle, state, true),
                _ => self.reply_shape_violation(handle, operation),
            },
            CallKind::StepBack | CallKind::StepForward | CallKind::Jump { .. } => match body {
                Some(ReplyBody::State(state)) => self.reconcile_navigation(handle, state),
                _ => self.reply_shape_violation(handle, operation),
            },
            CallKind::CreateTheorem => match body {
                Some(ReplyBody::Ack) => self.push_event(GameEvent::TheoremCreated { handle }),
                _ => self.reply_shape_violation(handle, operation),
            },
            CallKind::RulesList => match body {
                Some(ReplyBody::Rules(catalog)) => {
                    self.push_event(GameEvent::RulesAvailable { catalog });
                }
                _ => self.reply_shape_violation(handle, operation),
            },
            CallKind::Delete { reason } => match body {
                Some(ReplyBody::Ack) => self.finish_delete(handle, reason, now),
                _ => self.reply_shape_violation(handle, operation),
            },
        }
    }

    /// Applies a failed reply: queue the rejection, then undo whatever was
    /// done optimistically.
    fn dispatch_failure(
        &mut self,
        handle: SessionHandle,
        kind: CallKind,
        message: String,
        now: Instant,
    ) {
        self.push_event(GameEvent::EngineRejected {
            operation: kind.operation(),
            message,
        });
        match kind {
            // The engine never opened this game; drop the local placeholder.
            CallKind::Start | CallKind::Resume { .. } => {
                let Some(index) = self.registry.index_of_handle(handle) else {
                    return;
                };
                let was_current = self.registry.current_index() == Some(index);
                if self.registry.delete_session(index).is_ok() {
                    self.push_event(GameEvent::SessionListChanged);
                    if was_current {
                        self.clear_selection_mode();
                        self.start_clock_for_current(now);
                    }
                }
            }
            // Roll the optimistic cursor move back.
            CallKind::StepBack => {
                let rolled_back = self
                    .registry
                    .find_by_handle_mut(handle)
                    .is_some_and(|session| session.timeline_mut().step_forward());
                if rolled_back {
                    self.push_event(GameEvent::TimelineChanged { handle });
                }
            }
            CallKind::StepForward => {
                let rolled_back = self
                    .registry
                    .find_by_handle_mut(handle)
                    .is_some_and(|session| session.timeline_mut().step_back());
                if rolled_back {
                    self.push_event(GameEvent::TimelineChanged { handle });
                }
            }
            CallKind::Jump { back_to } => {
                let rolled_back = self
                    .registry
                    .find_by_handle_mut(handle)
                    .is_some_and(|session| session.timeline_mut().jump_to(back_to).is_ok());
                if rolled_back {
                    self.push_event(GameEvent::TimelineChanged { handle });
                }
            }
            // Everything else left no optimistic state behind.
            CallKind::FetchState
            | CallKind::ApplyRule
            | CallKind::CreateTheorem
            | CallKind::RulesList
            | CallKind::Delete { .. } => {}
        }
    }

    /// Wires a session up once the engine confirmed it: record the id, start
    /// the clock if the session is still current, and fetch the first state.
    fn finish_attach(&mut self, handle: SessionHandle, id: SessionId, now: Instant) {
        {
            let Some(session) = self.registry.find_by_handle_mut(handle) else {
                return;
            };
            if let Err(e) = session.record_engine_id(id) {
                let violation = SpecViolation::new(
                    ViolationSeverity::Error,
                    ViolationKind::InternalError,
                    format!("engine confirmation could not be recorded: {e}"),
                    concat!(file!(), ":", line!()),
                )
                .with_session(handle);
                report_to_observer(self.violation_observer.as_ref(), &violation);
                return;
            }
        }
        // The clock only starts once the engine confirms. A session the user
        // already switched away from stays clockless until reselected and
        // then starts with its full duration. Switching back before the ack
        // already started a clock; that one keeps ticking untouched.
        let needs_clock = self
            .registry
            .current()
            .is_some_and(|session| session.handle() == handle && !session.timer().is_live());
        if needs_clock {
            self.start_clock_for_current(now);
        }
        self.push_event(GameEvent::SessionListChanged);
        self.submit_request(
            handle,
            CallKind::FetchState,
            EngineCommand::GameState { game_id: id },
        );
    }

    /// Applies a state-carrying reply: append after the cursor or replace
    /// the state under it, then run the victory flow on the winning
    /// transition.
    fn apply_state_reply(&mut self, handle: SessionHandle, body: StateBody<T::Math>, append: bool) {
        let newly_won = {
            let Some(session) = self.registry.find_by_handle_mut(handle) else {
                return;
            };
            let (state, status) = body.into_parts();
            if append || session.timeline().is_empty() {
                session.apply_proof_state(state, status)
            } else {
                let _replaced = session.timeline_mut().replace_current(state);
                session.record_verdict(status)
            }
        };
        self.push_event(GameEvent::TimelineChanged { handle });
        if newly_won {
            self.run_victory_flow(handle);
        }
    }

    /// Checks a navigation reply against the state the cursor moved onto.
    ///
    /// The local move already happened when the request went out; a
    /// disagreeing engine wins, replacing the state under the cursor.
    fn reconcile_navigation(&mut self, handle: SessionHandle, body: StateBody<T::Math>) {
        let (mismatch, newly_won) = {
            let Some(session) = self.registry.find_by_handle_mut(handle) else {
                return;
            };
            let (state, status) = body.into_parts();
            let mismatch = session.timeline().current() != Some(&state);
            if mismatch {
                let cursor = session.timeline().cursor();
                let violation = SpecViolation::new(
                    ViolationSeverity::Error,
                    ViolationKind::TimelineSync,
                    format!("navigation reply disagrees with the local timeline at {cursor:?}"),
                    concat!(file!(), ":", line!()),
                )
                .with_session(handle);
                report_to_observer(self.violation_observer.as_ref(), &violation);
                let _replaced = session.timeline_mut().replace_current(state);
            }
            (mismatch, session.record_verdict(status))
        };
        if mismatch {
            self.push_event(GameEvent::TimelineChanged { handle });
        }
        if newly_won {
            self.run_victory_flow(handle);
        }
    }

    /// Stops the clock at the winning moment, reports the elapsed time and
    /// retires the engine-side game.
    ///
    /// Untimed games record the verdict but keep their session open.
    fn run_victory_flow(&mut self, handle: SessionHandle) {
        let (elapsed, id, busy) = {
            let Some(session) = self.registry.find_by_handle_mut(handle) else {
                return;
            };
            if !session.mode().is_timed() {
                return;
            }
            session.suspend_timer();
            (
                session
                    .timer_snapshot()
                    .map(|snapshot| snapshot.time_elapsed()),
                session.engine_id(),
                session.is_pending_reply(),
            )
        };
        if let Some(elapsed) = elapsed {
            self.push_event(GameEvent::Victory { handle, elapsed });
        }
        if let (Some(id), false) = (id, busy) {
            self.submit_request(
                handle,
                CallKind::Delete {
                    reason: DeleteReason::Victory,
                },
                EngineCommand::Delete { game_id: id },
            );
        }
    }

    /// Removes an acked session from the registry and hands the clock to
    /// the reselected neighbor, or chains the restart.
    fn finish_delete(&mut self, handle: SessionHandle, reason: DeleteReason, now: Instant) {
        let Some(index) = self.registry.index_of_handle(handle) else {
            let violation = SpecViolation::new(
                ViolationSeverity::Warning,
                ViolationKind::EngineProtocol,
                "delete ack addresses a session that no longer exists".to_owned(),
                concat!(file!(), ":", line!()),
            )
            .with_session(handle);
            report_to_observer(self.violation_observer.as_ref(), &violation);
            return;
        };
        // Stop the victim's clock before it leaves the registry.
        if let Some(session) = self.registry.get_mut(index) {
            session.suspend_timer();
        }
        let was_current = self.registry.current_index() == Some(index);
        if let Err(e) = self.registry.delete_session(index) {
            let violation = SpecViolation::new(
                ViolationSeverity::Error,
                ViolationKind::InternalError,
                format!("acked session could not be removed: {e}"),
                concat!(file!(), ":", line!()),
            )
            .with_session(handle);
            report_to_observer(self.violation_observer.as_ref(), &violation);
            return;
        }
        if was_current {
            self.clear_selection_mode();
        }
        self.push_event(GameEvent::SessionListChanged);
        match reason {
            DeleteReason::Restart(config) => {
                let _handle = self.open_session(config);
            }
            // The clock only needs a new owner when the deleted session held
            // the selection. An unrelated delete must not touch the current
            // session's timer, which may not even be confirmed yet.
            DeleteReason::User | DeleteReason::Victory | DeleteReason::Expired => {
                if was_current {
                    self.start_clock_for_current(now);
                }
            }
        }
    }

    /// Resumes the current countdown, retiring the session instead when it
    /// ran out while suspended.
    fn start_clock_for_current(&mut self, now: Instant) {
        match self
            .registry
            .resume_current_timer(now, self.tick_interval, self.game_duration)
        {
            Ok(()) => {}
            // resume only fails with AlreadyOver
            Err(_) => self.expire_current(),
        }
    }

    /// Emits [`GameEvent::Expired`] for the current session and retires it.
    fn expire_current(&mut self) {
        if let Some(handle) = self.registry.current().map(GameSession::handle) {
            self.push_event(GameEvent::Expired { handle });
            self.retire_expired(handle);
        }
    }

    /// Submits the `DELETE` for a session whose countdown ran out, once it
    /// has no reply outstanding.
    fn retire_expired(&mut self, handle: SessionHandle) {
        let Some(session) = self.registry.find_by_handle(handle) else {
            return;
        };
        if !session.timer().is_over()
            || session.is_pending_reply()
            || session.status() == GameStatus::Victory
        {
            return;
        }
        let Some(id) = session.engine_id() else {
            return;
        };
        self.submit_request(
            handle,
            CallKind::Delete {
                reason: DeleteReason::Expired,
            },
            EngineCommand::Delete { game_id: id },
        );
    }

    /// Reports a reply whose body does not fit the operation it answers.
    fn reply_shape_violation(&self, handle: SessionHandle, operation: &'static str) {
        let violation = SpecViolation::new(
            ViolationSeverity::Error,
            ViolationKind::EngineProtocol,
            format!("{operation} reply carried an unexpected body shape"),
            concat!(file!(), ":", line!()),
        )
        .with_session(handle);
        report_to_observer(self.violation_observer.as_ref(), &violation);
    }
}

impl<T: Config> InvariantChecker for GameClient<T> {
    /// Checks structural invariants across the registry, the in-flight map
    /// and the event queue.
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.registry.check_invariants()?;

        // Every waiting session must have its token in the in-flight map,
        // mapped back to that same session.
        for session in self.registry.sessions() {
            if let Some(token) = session.pending_token() {
                match self.inflight.get(&token) {
                    Some(call) if call.handle == session.handle() => {}
                    Some(call) => {
                        return Err(InvariantViolation::new(
                            "GameClient",
                            "a pending token is mapped to a different session",
                        )
                        .with_details(format!(
                            "session {} waits on {token}, which is mapped to session {}",
                            session.handle(),
                            call.handle
                        )));
                    }
                    None => {
                        return Err(InvariantViolation::new(
                            "GameClient",
                            "a session waits on a token missing from the in-flight map",
                        )
                        .with_details(format!(
                            "session {} waits on {token}",
                            session.handle()
                        )));
                    }
                }
            }
        }

        // Every in-flight entry must address a live session that is waiting
        // on exactly that token.
        for (token, call) in &self.inflight {
            match self.registry.find_by_handle(call.handle) {
                Some(session) if session.pending_token() == Some(*token) => {}
                Some(_) => {
                    return Err(InvariantViolation::new(
                        "GameClient",
                        "an in-flight token is not the one its session waits on",
                    )
                    .with_details(format!("token {token} for session {}", call.handle)));
                }
                None => {
                    return Err(InvariantViolation::new(
                        "GameClient",
                        "an in-flight request addresses a session that does not exist",
                    )
                    .with_details(format!("token {token} for session {}", call.handle)));
                }
            }
        }

        // Tokens are allocated monotonically; none may reach the watermark.
        if let Some((&highest, _)) = self.inflight.iter().next_back() {
            if highest >= self.next_token {
                return Err(InvariantViolation::new(
                    "GameClient",
                    "an in-flight token was never allocated",
                )
                .with_details(format!(
                    "token {highest} at or above the allocator watermark {}",
                    self.next_token
                )));
            }
        }

        if self.event_queue.len() > self.event_queue_size {
            return Err(InvariantViolation::new(
                "GameClient",
                "the event queue exceeds its configured capacity",
            )
            .with_details(format!(
                "{} events queued, capacity {}",
                self.event_queue.len(),
                self.event_queue_size
            )));
        }

        Ok(())
    }
}

// ###################
// # UNIT TESTS      #
// ###################
