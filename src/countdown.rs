//! The per-session countdown: a resumable timer with polled tick signals.
//!
//! A [`Countdown`] holds no timer thread and invokes no callbacks. The owner
//! polls it with an explicit instant; the countdown answers with the
//! [`CountdownSignal`]s that elapsed since the previous poll, every tick
//! strictly before the single expiry signal. This keeps the component free of
//! UI and transport knowledge and makes its behavior fully deterministic under
//! test, where instants are synthesized instead of slept for.
//!
//! Remaining time changes only in whole ticks. A countdown can be demoted to a
//! [`CountdownSnapshot`] (duration and remaining time in milliseconds, no
//! running state) and later restored as if freshly paused, which is how a
//! timer survives a session switch.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use web_time::{Duration, Instant};

use crate::error::ProoflineError;
use crate::DEFAULT_TICK_INTERVAL;

/// The lifecycle states of a [`Countdown`].
///
/// `Over` is terminal: once a countdown has expired it can never be started
/// again, and the game it timed is lost.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CountdownState {
    /// Constructed but never started; remaining time is untouched.
    Created,
    /// Ticking; each elapsed tick interval decrements the remaining time.
    Started,
    /// Frozen mid-game; remaining time is preserved for a later start.
    Paused,
    /// Remaining time reached zero. Terminal.
    Over,
}

impl CountdownState {
    /// The canonical SCREAMING_SNAKE_CASE spelling used in logs and traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CountdownState::Created => "CREATED",
            CountdownState::Started => "STARTED",
            CountdownState::Paused => "PAUSED",
            CountdownState::Over => "OVER",
        }
    }
}

impl fmt::Display for CountdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation returned from [`Countdown::poll_at`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CountdownSignal {
    /// One tick interval elapsed and the remaining time was decremented.
    Tick {
        /// The remaining time after this tick.
        remaining: Duration,
    },
    /// The remaining time reached zero. Emitted exactly once, always after
    /// the final [`CountdownSignal::Tick`].
    Expired,
}

/// Per-poll signal batch. A poll rarely yields more than one tick, so the
/// signals live on the stack unless the caller let a lot of time pass.
pub type SignalVec = SmallVec<[CountdownSignal; 4]>;

/// The serialized description of a countdown: total duration and remaining
/// time, in integer milliseconds on the wire.
///
/// This is all that survives a session switch. The running state is
/// deliberately absent: restoring a snapshot yields a paused countdown (or a
/// terminal one, when nothing remains).
///
/// Renders as `mm:ss` of the remaining time, floor-rounded, which is what the
/// session list shows for suspended games.
///
/// # Examples
///
/// ```
/// use proofline::CountdownSnapshot;
/// use web_time::Duration;
///
/// let snapshot = CountdownSnapshot::new(Duration::from_secs(120), Duration::from_secs(65));
/// assert_eq!(snapshot.to_string(), "01:05");
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountdownSnapshot {
    /// Total duration the countdown was created with.
    #[serde(with = "duration_millis")]
    duration: Duration,
    /// Time left on the clock.
    #[serde(rename = "remainingTime", with = "duration_millis")]
    remaining: Duration,
}

impl CountdownSnapshot {
    /// Creates a snapshot from a duration and a remaining time.
    ///
    /// Note: this does not validate `remaining <= duration`; snapshots taken
    /// from a live [`Countdown`] always satisfy it, and
    /// [`Countdown::restore`] re-validates before trusting external data.
    #[inline]
    #[must_use]
    pub const fn new(duration: Duration, remaining: Duration) -> Self {
        CountdownSnapshot {
            duration,
            remaining,
        }
    }

    /// Total duration the countdown was created with.
    #[inline]
    #[must_use]
    pub const fn duration(self) -> Duration {
        self.duration
    }

    /// Time left on the clock.
    #[inline]
    #[must_use]
    pub const fn remaining(self) -> Duration {
        self.remaining
    }

    /// `true` when nothing remains: restoring this snapshot yields a terminal
    /// countdown and the game it belonged to is over.
    #[inline]
    #[must_use]
    pub const fn is_over(self) -> bool {
        self.remaining.is_zero()
    }

    /// Elapsed play time described by this snapshot.
    #[inline]
    #[must_use]
    pub fn time_elapsed(self) -> Duration {
        self.duration.saturating_sub(self.remaining)
    }
}

impl fmt::Display for CountdownSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.remaining.as_secs();
        write!(f, "{:02}:{:02}", total_secs / 60, total_secs % 60)
    }
}

/// Serializes a [`Duration`] as integer milliseconds, the unit countdown
/// descriptors are stored and exchanged in.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// A single resumable countdown.
///
/// State machine: `Created` → `Started` ⇄ `Paused`, with `Started` → `Over`
/// once the remaining time hits zero. `Over` is terminal; starting from it
/// fails with [`ProoflineError::AlreadyOver`], which callers must treat as
/// "game over, not resumable".
///
/// The countdown never looks at the clock on its own: [`Countdown::start_at`]
/// and [`Countdown::poll_at`] take the current instant from the caller.
/// [`Countdown::start`] and [`Countdown::poll`] are conveniences that read
/// `Instant::now()` for hosts that do not inject time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    /// Total duration; never changes after construction.
    duration: Duration,
    /// Time left; decremented one tick at a time, only while `Started`.
    remaining: Duration,
    /// Tick granularity; remaining time changes in whole multiples of this.
    tick: Duration,
    /// Current lifecycle state.
    state: CountdownState,
    /// When the next tick is due. `Some` exactly while `Started`.
    next_tick: Option<Instant>,
}

impl Countdown {
    /// Creates a countdown with the full `duration` remaining and the default
    /// one-second tick.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if `duration` is zero.
    pub fn new(duration: Duration) -> Result<Self, ProoflineError> {
        Self::with_remaining(duration, duration, DEFAULT_TICK_INTERVAL)
    }

    /// Creates a countdown with the full `duration` remaining and a custom
    /// tick granularity.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if `duration` or `tick` is zero.
    pub fn with_tick(duration: Duration, tick: Duration) -> Result<Self, ProoflineError> {
        Self::with_remaining(duration, duration, tick)
    }

    /// Creates a countdown with an explicit remaining time.
    ///
    /// A zero `remaining` yields a countdown that is already `Over`: there is
    /// nothing left to play, and any start attempt fails with
    /// [`ProoflineError::AlreadyOver`].
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if `duration` or `tick` is zero,
    ///   or if `remaining > duration`.
    pub fn with_remaining(
        duration: Duration,
        remaining: Duration,
        tick: Duration,
    ) -> Result<Self, ProoflineError> {
        if duration.is_zero() {
            return Err(ProoflineError::InvalidRequest {
                info: "countdown duration must be positive".to_owned(),
            });
        }
        if tick.is_zero() {
            return Err(ProoflineError::InvalidRequest {
                info: "countdown tick interval must be positive".to_owned(),
            });
        }
        if remaining > duration {
            return Err(ProoflineError::InvalidRequest {
                info: format!(
                    "countdown remaining time {}ms exceeds duration {}ms",
                    remaining.as_millis(),
                    duration.as_millis()
                ),
            });
        }
        let state = if remaining.is_zero() {
            CountdownState::Over
        } else {
            CountdownState::Created
        };
        Ok(Countdown {
            duration,
            remaining,
            tick,
            state,
            next_tick: None,
        })
    }

    /// Reconstructs a countdown from its serialized description, as if it had
    /// just been paused: remaining time is preserved, nothing is ticking.
    ///
    /// A snapshot with zero remaining restores directly into `Over`.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] on an inconsistent snapshot (zero
    ///   duration, zero `tick`, or remaining exceeding the duration).
    pub fn restore(snapshot: CountdownSnapshot, tick: Duration) -> Result<Self, ProoflineError> {
        let mut countdown = Self::with_remaining(snapshot.duration, snapshot.remaining, tick)?;
        if countdown.state == CountdownState::Created {
            countdown.state = CountdownState::Paused;
        }
        Ok(countdown)
    }

    /// Starts or resumes ticking, with the next tick due one interval after
    /// `now`.
    ///
    /// Valid from `Created` and `Paused`. Resuming from `Paused` continues
    /// with the frozen remaining time; it is not a restart.
    ///
    /// # Errors
    /// - [`ProoflineError::AlreadyOver`] from `Over` — the game is over, not
    ///   resumable.
    /// - [`ProoflineError::InvalidTransition`] from `Started` — a double
    ///   start is a caller sequencing bug.
    pub fn start_at(&mut self, now: Instant) -> Result<(), ProoflineError> {
        match self.state {
            CountdownState::Created | CountdownState::Paused => {
                self.state = CountdownState::Started;
                self.next_tick = Some(now + self.tick);
                tracing::trace!(
                    remaining_ms = self.remaining.as_millis() as u64,
                    "countdown started"
                );
                Ok(())
            }
            CountdownState::Over => Err(ProoflineError::AlreadyOver),
            CountdownState::Started => Err(ProoflineError::InvalidTransition {
                from: self.state,
                action: "start",
            }),
        }
    }

    /// Starts or resumes ticking from the current wall-clock instant.
    ///
    /// # Errors
    /// Same as [`Countdown::start_at`].
    pub fn start(&mut self) -> Result<(), ProoflineError> {
        self.start_at(Instant::now())
    }

    /// Freezes the countdown, preserving the remaining time.
    ///
    /// A partial tick in progress is discarded: remaining time only ever
    /// changes in whole ticks, so pausing and resuming drifts by at most one
    /// tick interval.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidTransition`] unless the countdown is
    ///   `Started`.
    pub fn pause(&mut self) -> Result<(), ProoflineError> {
        match self.state {
            CountdownState::Started => {
                self.state = CountdownState::Paused;
                self.next_tick = None;
                tracing::trace!(
                    remaining_ms = self.remaining.as_millis() as u64,
                    "countdown paused"
                );
                Ok(())
            }
            _ => Err(ProoflineError::InvalidTransition {
                from: self.state,
                action: "pause",
            }),
        }
    }

    /// Advances the countdown to `now`, returning every signal that elapsed
    /// since the previous poll.
    ///
    /// While `Started`, each whole tick interval between the last observed
    /// tick and `now` produces one [`CountdownSignal::Tick`] with the
    /// decremented remaining time; a poll that comes late catches up with
    /// several ticks at once. When the remaining time reaches zero the
    /// countdown transitions to `Over` and appends the single
    /// [`CountdownSignal::Expired`] after the final tick.
    ///
    /// In any state but `Started` this returns an empty batch.
    #[must_use]
    pub fn poll_at(&mut self, now: Instant) -> SignalVec {
        let mut signals = SignalVec::new();
        while self.state == CountdownState::Started {
            let due = match self.next_tick {
                Some(due) if due <= now => due,
                _ => break,
            };
            self.remaining = self.remaining.saturating_sub(self.tick);
            signals.push(CountdownSignal::Tick {
                remaining: self.remaining,
            });
            if self.remaining.is_zero() {
                self.state = CountdownState::Over;
                self.next_tick = None;
                signals.push(CountdownSignal::Expired);
                tracing::debug!("countdown expired");
            } else {
                self.next_tick = Some(due + self.tick);
            }
        }
        signals
    }

    /// Advances the countdown to the current wall-clock instant.
    #[must_use]
    pub fn poll(&mut self) -> SignalVec {
        self.poll_at(Instant::now())
    }

    /// Time spent so far: `duration - remaining`. Valid in any state; this is
    /// what victory reporting reads off a stopped countdown.
    #[inline]
    #[must_use]
    pub fn time_elapsed(&self) -> Duration {
        self.duration.saturating_sub(self.remaining)
    }

    /// The serialized description of this countdown, losing the running state.
    #[inline]
    #[must_use]
    pub const fn snapshot(&self) -> CountdownSnapshot {
        CountdownSnapshot::new(self.duration, self.remaining)
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> CountdownState {
        self.state
    }

    /// Total duration the countdown was created with.
    #[inline]
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left on the clock.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Tick granularity.
    #[inline]
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// `true` while the countdown is ticking.
    #[inline]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Started)
    }

    /// `true` once the countdown has expired. Terminal.
    #[inline]
    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.state, CountdownState::Over)
    }
}

impl fmt::Display for Countdown {
    /// Renders the remaining time as `mm:ss`, floor-rounded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}

// ###################
// # UNIT TESTS      #
// ###################

#[cfg(test)]
mod tests {
    use super::*;

    fn two_minutes() -> Countdown {
        Countdown::new(Duration::from_secs(120)).unwrap()
    }

    // ==========================================
    // Construction Tests
    // ==========================================

    #[test]
    fn new_starts_created_with_full_remaining() {
        let countdown = two_minutes();
        assert_eq!(countdown.state(), CountdownState::Created);
        assert_eq!(countdown.remaining(), Duration::from_secs(120));
        assert_eq!(countdown.duration(), Duration::from_secs(120));
        assert_eq!(countdown.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn new_rejects_zero_duration() {
        let result = Countdown::new(Duration::ZERO);
        assert!(matches!(
            result,
            Err(ProoflineError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn with_tick_rejects_zero_tick() {
        let result = Countdown::with_tick(Duration::from_secs(10), Duration::ZERO);
        assert!(matches!(
            result,
            Err(ProoflineError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn with_remaining_rejects_excess_remaining() {
        let result = Countdown::with_remaining(
            Duration::from_secs(10),
            Duration::from_secs(11),
            Duration::from_secs(1),
        );
        assert!(matches!(
            result,
            Err(ProoflineError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn with_remaining_zero_is_born_over() {
        let mut countdown = Countdown::with_remaining(
            Duration::from_secs(10),
            Duration::ZERO,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(countdown.state(), CountdownState::Over);
        assert_eq!(
            countdown.start_at(Instant::now()),
            Err(ProoflineError::AlreadyOver)
        );
    }

    #[test]
    fn time_elapsed_is_duration_minus_remaining() {
        let countdown = Countdown::with_remaining(
            Duration::from_millis(120_000),
            Duration::from_millis(45_500),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(countdown.time_elapsed(), Duration::from_millis(74_500));
    }

    // ==========================================
    // Transition Tests
    // ==========================================

    #[test]
    fn start_from_created_begins_ticking() {
        let mut countdown = two_minutes();
        let now = Instant::now();
        countdown.start_at(now).unwrap();
        assert_eq!(countdown.state(), CountdownState::Started);
        assert!(countdown.is_running());
    }

    #[test]
    fn start_twice_is_invalid_transition() {
        let mut countdown = two_minutes();
        let now = Instant::now();
        countdown.start_at(now).unwrap();
        assert_eq!(
            countdown.start_at(now),
            Err(ProoflineError::InvalidTransition {
                from: CountdownState::Started,
                action: "start",
            })
        );
    }

    #[test]
    fn pause_requires_started() {
        let mut countdown = two_minutes();
        assert_eq!(
            countdown.pause(),
            Err(ProoflineError::InvalidTransition {
                from: CountdownState::Created,
                action: "pause",
            })
        );
        countdown.start_at(Instant::now()).unwrap();
        countdown.pause().unwrap();
        assert_eq!(countdown.state(), CountdownState::Paused);
        // Pausing twice is a sequencing bug.
        assert!(countdown.pause().is_err());
    }

    #[test]
    fn pause_then_start_preserves_remaining() {
        let mut countdown = two_minutes();
        let start = Instant::now();
        countdown.start_at(start).unwrap();
        let signals = countdown.poll_at(start + Duration::from_secs(3));
        assert_eq!(signals.len(), 3);
        let at_pause = countdown.remaining();
        countdown.pause().unwrap();

        countdown.start_at(start + Duration::from_secs(10)).unwrap();
        assert_eq!(countdown.remaining(), at_pause);
    }

    // ==========================================
    // Tick Tests
    // ==========================================

    #[test]
    fn poll_before_first_tick_is_empty() {
        let mut countdown = two_minutes();
        let start = Instant::now();
        countdown.start_at(start).unwrap();
        assert!(countdown
            .poll_at(start + Duration::from_millis(999))
            .is_empty());
        assert_eq!(countdown.remaining(), Duration::from_secs(120));
    }

    #[test]
    fn poll_emits_one_tick_per_interval() {
        let mut countdown = two_minutes();
        let start = Instant::now();
        countdown.start_at(start).unwrap();

        let signals = countdown.poll_at(start + Duration::from_secs(1));
        assert_eq!(
            signals.as_slice(),
            [CountdownSignal::Tick {
                remaining: Duration::from_secs(119)
            }]
        );
        // Same instant again: nothing new.
        assert!(countdown.poll_at(start + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn late_poll_catches_up_tick_by_tick() {
        let mut countdown = two_minutes();
        let start = Instant::now();
        countdown.start_at(start).unwrap();

        let signals = countdown.poll_at(start + Duration::from_secs(4));
        let remainings: Vec<Duration> = signals
            .iter()
            .map(|signal| match signal {
                CountdownSignal::Tick { remaining } => *remaining,
                CountdownSignal::Expired => panic!("no expiry expected"),
            })
            .collect();
        assert_eq!(
            remainings,
            vec![
                Duration::from_secs(119),
                Duration::from_secs(118),
                Duration::from_secs(117),
                Duration::from_secs(116),
            ]
        );
    }

    #[test]
    fn run_to_completion_ends_with_single_expiry_after_last_tick() {
        let mut countdown = Countdown::new(Duration::from_secs(3)).unwrap();
        let start = Instant::now();
        countdown.start_at(start).unwrap();

        let signals = countdown.poll_at(start + Duration::from_secs(60));
        assert_eq!(
            signals.as_slice(),
            [
                CountdownSignal::Tick {
                    remaining: Duration::from_secs(2)
                },
                CountdownSignal::Tick {
                    remaining: Duration::from_secs(1)
                },
                CountdownSignal::Tick {
                    remaining: Duration::ZERO
                },
                CountdownSignal::Expired,
            ]
        );
        assert_eq!(countdown.state(), CountdownState::Over);
        assert_eq!(countdown.remaining(), Duration::ZERO);

        // Terminal: no further signals, no restart.
        assert!(countdown.poll_at(start + Duration::from_secs(120)).is_empty());
        assert_eq!(
            countdown.start_at(start + Duration::from_secs(120)),
            Err(ProoflineError::AlreadyOver)
        );
    }

    #[test]
    fn remaining_below_one_tick_expires_on_first_tick() {
        let mut countdown = Countdown::with_remaining(
            Duration::from_secs(120),
            Duration::from_millis(400),
            Duration::from_secs(1),
        )
        .unwrap();
        let start = Instant::now();
        countdown.start_at(start).unwrap();

        let signals = countdown.poll_at(start + Duration::from_secs(1));
        assert_eq!(
            signals.as_slice(),
            [
                CountdownSignal::Tick {
                    remaining: Duration::ZERO
                },
                CountdownSignal::Expired,
            ]
        );
        assert!(countdown.is_over());
    }

    #[test]
    fn pause_discards_partial_tick() {
        let mut countdown = two_minutes();
        let start = Instant::now();
        countdown.start_at(start).unwrap();
        let _ = countdown.poll_at(start + Duration::from_secs(1));
        // Half a tick into the second interval.
        let mid = start + Duration::from_millis(1500);
        assert!(countdown.poll_at(mid).is_empty());
        countdown.pause().unwrap();
        assert_eq!(countdown.remaining(), Duration::from_secs(119));

        // Resume: the next tick is a full interval away again.
        countdown.start_at(mid).unwrap();
        assert!(countdown.poll_at(mid + Duration::from_millis(999)).is_empty());
        let signals = countdown.poll_at(mid + Duration::from_secs(1));
        assert_eq!(signals.len(), 1);
        assert_eq!(countdown.remaining(), Duration::from_secs(118));
    }

    // ==========================================
    // Snapshot Tests
    // ==========================================

    #[test]
    fn snapshot_restore_preserves_remaining_as_paused() {
        let mut countdown = two_minutes();
        let start = Instant::now();
        countdown.start_at(start).unwrap();
        let _ = countdown.poll_at(start + Duration::from_secs(30));
        countdown.pause().unwrap();

        let snapshot = countdown.snapshot();
        assert_eq!(snapshot.remaining(), Duration::from_secs(90));
        assert_eq!(snapshot.time_elapsed(), Duration::from_secs(30));

        let restored = Countdown::restore(snapshot, Duration::from_secs(1)).unwrap();
        assert_eq!(restored.state(), CountdownState::Paused);
        assert_eq!(restored.remaining(), Duration::from_secs(90));
        assert_eq!(restored.time_elapsed(), Duration::from_secs(30));
    }

    #[test]
    fn restore_zero_remaining_is_over() {
        let snapshot = CountdownSnapshot::new(Duration::from_secs(120), Duration::ZERO);
        let mut restored = Countdown::restore(snapshot, Duration::from_secs(1)).unwrap();
        assert_eq!(restored.state(), CountdownState::Over);
        assert_eq!(
            restored.start_at(Instant::now()),
            Err(ProoflineError::AlreadyOver)
        );
    }

    #[test]
    fn restore_rejects_inconsistent_snapshot() {
        let snapshot =
            CountdownSnapshot::new(Duration::from_secs(10), Duration::from_secs(20));
        assert!(Countdown::restore(snapshot, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn snapshot_serializes_as_milliseconds() {
        let snapshot =
            CountdownSnapshot::new(Duration::from_secs(120), Duration::from_secs(90));
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, "{\"duration\":120000,\"remainingTime\":90000}");

        let back: CountdownSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    // ==========================================
    // Display Tests
    // ==========================================

    #[test]
    fn display_renders_mm_ss() {
        assert_eq!(two_minutes().to_string(), "02:00");
        let countdown = Countdown::with_remaining(
            Duration::from_secs(120),
            Duration::from_secs(65),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(countdown.to_string(), "01:05");
    }

    #[test]
    fn display_floors_partial_seconds() {
        let countdown = Countdown::with_remaining(
            Duration::from_secs(120),
            Duration::from_millis(1900),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(countdown.to_string(), "00:01");
    }

    #[test]
    fn display_zero_remaining() {
        let snapshot = CountdownSnapshot::new(Duration::from_secs(120), Duration::ZERO);
        assert_eq!(snapshot.to_string(), "00:00");
    }
}

// ###################
// # KANI PROOFS     #
// ###################

/// Kani proofs for countdown arithmetic safety.
///
/// These proofs verify:
/// - Elapsed time never underflows for any valid construction
/// - Ticking is monotone: polled remaining time never increases
/// - Snapshot restoration preserves elapsed time exactly
///
/// Run proofs with:
///   cargo kani
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Proof: for every accepted construction, elapsed + remaining == duration.
    #[kani::proof]
    fn proof_elapsed_complements_remaining() {
        let duration_ms: u64 = kani::any();
        let remaining_ms: u64 = kani::any();
        kani::assume(duration_ms >= 1 && duration_ms <= 86_400_000);
        kani::assume(remaining_ms <= duration_ms);

        let countdown = match Countdown::with_remaining(
            Duration::from_millis(duration_ms),
            Duration::from_millis(remaining_ms),
            Duration::from_millis(1000),
        ) {
            Ok(countdown) => countdown,
            Err(_) => {
                kani::assert(false, "valid construction must be accepted");
                return;
            }
        };
        let elapsed = countdown.time_elapsed();
        kani::assert(
            elapsed + countdown.remaining() == countdown.duration(),
            "elapsed and remaining must partition the duration",
        );
    }

    /// Proof: a decremented remaining time never exceeds its predecessor.
    #[kani::proof]
    fn proof_tick_decrement_is_monotone() {
        let remaining_ms: u64 = kani::any();
        let tick_ms: u64 = kani::any();
        kani::assume(remaining_ms <= 86_400_000);
        kani::assume(tick_ms >= 1 && tick_ms <= 60_000);

        let before = Duration::from_millis(remaining_ms);
        let after = before.saturating_sub(Duration::from_millis(tick_ms));
        kani::assert(after <= before, "ticking must never gain time");
    }

    /// Proof: snapshot restoration preserves elapsed time.
    #[kani::proof]
    fn proof_restore_preserves_elapsed() {
        let duration_ms: u64 = kani::any();
        let remaining_ms: u64 = kani::any();
        kani::assume(duration_ms >= 1 && duration_ms <= 86_400_000);
        kani::assume(remaining_ms <= duration_ms);

        let snapshot = CountdownSnapshot::new(
            Duration::from_millis(duration_ms),
            Duration::from_millis(remaining_ms),
        );
        match Countdown::restore(snapshot, Duration::from_millis(1000)) {
            Ok(restored) => kani::assert(
                restored.time_elapsed() == snapshot.time_elapsed(),
                "restoration must preserve elapsed time",
            ),
            Err(_) => kani::assert(false, "valid snapshot must restore"),
        }
    }
}
