//! Session registry: the ordered list of open games and the current selection.
//!
//! The registry owns every [`GameSession`] and enforces the countdown
//! discipline across them: the current session is the only one allowed to
//! hold a live countdown, so switching the selection always suspends the
//! outgoing timer before resuming the incoming one.
//!
//! List order is creation order. Deleting a session keeps the order of the
//! survivors and reselects the nearest neighbor: the session that shifted
//! into the freed slot, or the new last session when the deleted one was at
//! the end.

use web_time::{Duration, Instant};

use crate::error::ProoflineError;
use crate::report_violation;
use crate::sessions::game_session::{GameConfig, GameSession};
use crate::telemetry::{InvariantChecker, InvariantViolation, ViolationKind, ViolationSeverity};
use crate::{Config, SessionHandle, SessionId};

/// Registry tracking all open sessions and the current selection.
pub struct SessionRegistry<T>
where
    T: Config,
{
    /// The sessions, in creation order.
    sessions: Vec<GameSession<T>>,
    /// Index of the current session. `None` exactly while the list is empty.
    current: Option<usize>,
    /// Next handle to assign. Handles are never reused.
    next_handle: u64,
}

impl<T: Config> std::fmt::Debug for SessionRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        let Self {
            sessions,
            current,
            next_handle,
        } = self;

        f.debug_struct("SessionRegistry")
            .field("sessions", sessions)
            .field("current", current)
            .field("next_handle", next_handle)
            .finish()
    }
}

impl<T: Config> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> SessionRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            current: None,
            next_handle: 0,
        }
    }

    /// Creates a session and makes it current.
    ///
    /// The outgoing current session's timer is suspended. The new session
    /// starts without a timer; its countdown is materialized once the proof
    /// engine confirms the creation.
    pub(crate) fn create_session(&mut self, config: GameConfig) -> SessionHandle {
        self.suspend_current_timer();

        let handle = SessionHandle::new(self.next_handle);
        self.next_handle += 1;
        self.sessions.push(GameSession::new(handle, config));
        self.current = Some(self.sessions.len() - 1);
        tracing::debug!(
            handle = handle.as_u64(),
            open_sessions = self.sessions.len(),
            "session created"
        );
        handle
    }

    /// Makes the session at `index` current.
    ///
    /// The outgoing session's timer is suspended first, then the incoming
    /// session's timer is resumed at `now`. Switching to the session that is
    /// already current changes nothing.
    ///
    /// # Errors
    /// - [`ProoflineError::OutOfRange`] if `index` is not a valid position;
    ///   the selection is left untouched.
    /// - [`ProoflineError::AlreadyOver`] if the incoming session's countdown
    ///   has nothing left. The selection has already moved when this is
    ///   returned; the caller decides how to retire the expired game.
    pub(crate) fn switch_to(
        &mut self,
        index: usize,
        now: Instant,
        tick: Duration,
        default_duration: Duration,
    ) -> Result<(), ProoflineError> {
        if index >= self.sessions.len() {
            return Err(ProoflineError::OutOfRange {
                index,
                len: self.sessions.len(),
            });
        }
        if self.current == Some(index) {
            return Ok(());
        }
        self.suspend_current_timer();
        self.current = Some(index);
        self.resume_current_timer(now, tick, default_duration)
    }

    /// Removes the session at `index` and returns it.
    ///
    /// The nearest neighbor is reselected: the session that shifted into the
    /// freed slot when one exists, otherwise the new last session. Removing a
    /// session before the current one shifts the current index without
    /// changing the selection. The reselected session's timer is *not*
    /// resumed here; call [`resume_current_timer`](Self::resume_current_timer)
    /// once the caller is ready to hand it the clock.
    ///
    /// The victim must not hold a live countdown anymore; the caller stops
    /// the clock before retiring a session. A live victim is reported as a
    /// session-registry violation.
    ///
    /// # Errors
    /// - [`ProoflineError::OutOfRange`] if `index` is not a valid position.
    pub(crate) fn delete_session(
        &mut self,
        index: usize,
    ) -> Result<GameSession<T>, ProoflineError> {
        if index >= self.sessions.len() {
            return Err(ProoflineError::OutOfRange {
                index,
                len: self.sessions.len(),
            });
        }
        let victim = self.sessions.remove(index);
        if victim.timer().is_live() {
            report_violation!(
                ViolationSeverity::Warning,
                ViolationKind::SessionRegistry,
                "session {} deleted while its countdown was still live",
                victim.handle()
            );
        }

        self.current = if self.sessions.is_empty() {
            None
        } else {
            match self.current {
                // Deleting the current session: prefer the successor that
                // shifted into the freed slot, fall back to the new last.
                Some(current) if current == index => Some(current.min(self.sessions.len() - 1)),
                // A removal below the current session shifts it down one.
                Some(current) if current > index => Some(current - 1),
                other => other,
            }
        };
        tracing::debug!(
            handle = victim.handle().as_u64(),
            open_sessions = self.sessions.len(),
            "session deleted"
        );
        Ok(victim)
    }

    /// Suspends the current session's timer, if it has a live one.
    pub(crate) fn suspend_current_timer(&mut self) {
        if let Some(session) = self.current_mut() {
            session.suspend_timer();
        }
    }

    /// Resumes the current session's timer at `now`.
    ///
    /// No-op when the registry is empty or the current session is untimed.
    ///
    /// # Errors
    /// - [`ProoflineError::AlreadyOver`] if the countdown has nothing left.
    pub(crate) fn resume_current_timer(
        &mut self,
        now: Instant,
        tick: Duration,
        default_duration: Duration,
    ) -> Result<(), ProoflineError> {
        match self.current_mut() {
            Some(session) => session.resume_timer(now, tick, default_duration),
            None => Ok(()),
        }
    }

    /// Suspends every live timer in the registry.
    ///
    /// Used when the host loses focus of the whole client, e.g. the
    /// application is backgrounded or shutting down.
    pub(crate) fn stop_all_timers(&mut self) {
        for session in &mut self.sessions {
            session.suspend_timer();
        }
    }

    /// The current session, or `None` on an empty registry.
    #[must_use]
    pub fn current(&self) -> Option<&GameSession<T>> {
        self.current.and_then(|index| self.sessions.get(index))
    }

    /// Mutable access to the current session.
    pub(crate) fn current_mut(&mut self) -> Option<&mut GameSession<T>> {
        match self.current {
            Some(index) => self.sessions.get_mut(index),
            None => None,
        }
    }

    /// The position of the current session in the list.
    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// All sessions, in creation order. This is what the game-list surface
    /// renders from.
    #[must_use]
    pub fn sessions(&self) -> &[GameSession<T>] {
        &self.sessions
    }

    /// The session at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&GameSession<T>> {
        self.sessions.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut GameSession<T>> {
        self.sessions.get_mut(index)
    }

    /// Finds a session by its client-stable handle.
    #[must_use]
    pub fn find_by_handle(&self, handle: SessionHandle) -> Option<&GameSession<T>> {
        self.sessions
            .iter()
            .find(|session| session.handle() == handle)
    }

    pub(crate) fn find_by_handle_mut(
        &mut self,
        handle: SessionHandle,
    ) -> Option<&mut GameSession<T>> {
        self.sessions
            .iter_mut()
            .find(|session| session.handle() == handle)
    }

    /// The position of the session carrying `handle`.
    #[must_use]
    pub fn index_of_handle(&self, handle: SessionHandle) -> Option<usize> {
        self.sessions
            .iter()
            .position(|session| session.handle() == handle)
    }

    /// The position of the session the engine knows as `id`.
    #[must_use]
    pub fn index_of_id(&self, id: SessionId) -> Option<usize> {
        self.sessions
            .iter()
            .position(|session| session.engine_id() == Some(id))
    }

    /// Finds a session by its engine-assigned id.
    #[must_use]
    pub fn find_by_id(&self, id: SessionId) -> Option<&GameSession<T>> {
        self.sessions
            .iter()
            .find(|session| session.engine_id() == Some(id))
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` when no session is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of countdowns that are currently ticking. The registry keeps
    /// this at most one.
    #[must_use]
    pub fn running_timer_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|session| match session.timer() {
                crate::sessions::game_session::TimerSlot::Live(countdown) => {
                    countdown.is_running()
                }
                _ => false,
            })
            .count()
    }
}

impl<T: Config> InvariantChecker for SessionRegistry<T> {
    /// Checks that the registry's invariants are satisfied.
    ///
    /// This method verifies:
    /// 1. The current index is valid, and `None` exactly while the list is empty
    /// 2. Session handles are unique
    /// 3. Only the current session holds a live countdown
    /// 4. At most one countdown is ticking
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match self.current {
            None if !self.sessions.is_empty() => {
                return Err(InvariantViolation::new(
                    "SessionRegistry",
                    "no current session despite open sessions",
                )
                .with_details(format!("{} sessions open", self.sessions.len())));
            }
            Some(index) if index >= self.sessions.len() => {
                return Err(InvariantViolation::new(
                    "SessionRegistry",
                    "current index out of range",
                )
                .with_details(format!(
                    "index {} with {} sessions",
                    index,
                    self.sessions.len()
                )));
            }
            _ => {}
        }

        for (i, session) in self.sessions.iter().enumerate() {
            for other in &self.sessions[i + 1..] {
                if session.handle() == other.handle() {
                    return Err(InvariantViolation::new(
                        "SessionRegistry",
                        "duplicate session handle",
                    )
                    .with_details(format!("handle {}", session.handle())));
                }
            }
            if session.timer().is_live() && self.current != Some(i) {
                return Err(InvariantViolation::new(
                    "SessionRegistry",
                    "live countdown on a non-current session",
                )
                .with_details(format!("session {} at index {}", session.handle(), i)));
            }
        }

        let running = self.running_timer_count();
        if running > 1 {
            return Err(InvariantViolation::new(
                "SessionRegistry",
                "more than one countdown ticking",
            )
            .with_details(format!("{} countdowns running", running)));
        }

        Ok(())
    }
}

// ###################
// # UNIT TESTS      #
// ###################
