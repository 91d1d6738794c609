//! The client builder: configuration funnel for [`GameClient`].
//!
//! Every knob has a working default, so `ClientBuilder::new().start_client(t)`
//! already yields a playable client. Values that are wrong on their own are
//! rejected by their setter; values that only conflict with each other are
//! rejected by [`start_client`](ClientBuilder::start_client).

use std::marker::PhantomData;
use std::sync::Arc;

use web_time::Duration;

use crate::{
    error::ProoflineError, sessions::client::GameClient, telemetry::ViolationObserver, Config,
    ProofTransport, DEFAULT_EVENT_QUEUE_SIZE, DEFAULT_GAME_DURATION, DEFAULT_TICK_INTERVAL,
};

/// Smallest accepted event queue capacity.
///
/// Below this, a single routine flow (the ticks leading up to a victory plus
/// the `Victory` and `SessionListChanged` that retire the game) could already
/// overwrite itself before the host polls once.
const MIN_EVENT_QUEUE_SIZE: usize = 10;

/// The [`ClientBuilder`] assembles a [`GameClient`].
///
/// After setting all appropriate values, use
/// [`start_client`](ClientBuilder::start_client) to consume the builder and
/// attach the client to a transport.
///
/// # Example
///
/// ```
/// use proofline::{ClientBuilder, Config, EngineReply, EngineRequest, ProofTransport};
/// use web_time::Duration;
///
/// struct Demo;
///
/// impl Config for Demo {
///     type Math = u64;
/// }
///
/// // A transport that never answers; good enough for construction.
/// struct Offline;
///
/// impl ProofTransport<Demo> for Offline {
///     fn submit(&mut self, _request: EngineRequest) {}
///     fn poll_replies(&mut self) -> Vec<EngineReply<u64>> {
///         Vec::new()
///     }
/// }
///
/// let client = ClientBuilder::<Demo>::new()
///     .with_game_duration(Duration::from_secs(90))?
///     .with_event_queue_size(64)?
///     .start_client(Offline)?;
/// assert!(client.current_session().is_none());
/// # Ok::<(), proofline::ProoflineError>(())
/// ```
#[must_use = "ClientBuilder must be consumed by calling start_client"]
pub struct ClientBuilder<T>
where
    T: Config,
{
    /// Countdown duration granted to each timed game.
    game_duration: Duration,
    /// Granularity at which countdowns lose time.
    tick_interval: Duration,
    /// Maximum number of events to queue before oldest are dropped.
    event_queue_size: usize,
    /// Optional observer for contract violations.
    violation_observer: Option<Arc<dyn ViolationObserver>>,
    _config: PhantomData<T>,
}

impl<T: Config> std::fmt::Debug for ClientBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure to ensure all fields are included when new fields are added.
        // The compiler will error if a new field is added but not handled here.
        let Self {
            game_duration,
            tick_interval,
            event_queue_size,
            violation_observer,
            _config,
        } = self;

        f.debug_struct("ClientBuilder")
            .field("game_duration", game_duration)
            .field("tick_interval", tick_interval)
            .field("event_queue_size", event_queue_size)
            .field("has_violation_observer", &violation_observer.is_some())
            .finish()
    }
}

impl<T: Config> Default for ClientBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> ClientBuilder<T> {
    /// Construct a new builder with all values set to their defaults.
    pub fn new() -> Self {
        Self {
            game_duration: DEFAULT_GAME_DURATION,
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_queue_size: DEFAULT_EVENT_QUEUE_SIZE,
            violation_observer: None,
            _config: PhantomData,
        }
    }

    /// Sets the countdown duration granted to each timed game. Default is
    /// [`DEFAULT_GAME_DURATION`], two minutes.
    ///
    /// Untimed games ignore this value entirely.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if `duration` is zero.
    pub fn with_game_duration(mut self, duration: Duration) -> Result<Self, ProoflineError> {
        if duration.is_zero() {
            return Err(ProoflineError::InvalidRequest {
                info: "game duration must be positive".to_owned(),
            });
        }
        self.game_duration = duration;
        Ok(self)
    }

    /// Sets the granularity at which countdowns lose time. Default is
    /// [`DEFAULT_TICK_INTERVAL`], one second.
    ///
    /// Remaining time only changes in whole ticks, and each elapsed tick is
    /// surfaced as one [`GameEvent::Tick`](crate::GameEvent::Tick). A finer
    /// interval gives a smoother on-screen clock at the cost of more events
    /// per poll.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if `tick` is zero.
    pub fn with_tick_interval(mut self, tick: Duration) -> Result<Self, ProoflineError> {
        if tick.is_zero() {
            return Err(ProoflineError::InvalidRequest {
                info: "tick interval must be positive".to_owned(),
            });
        }
        self.tick_interval = tick;
        Ok(self)
    }

    /// Sets the maximum number of events to queue before oldest are dropped.
    ///
    /// When the event queue exceeds this size, the oldest events are discarded
    /// and a `Configuration` violation is reported. This provides backpressure
    /// if the host isn't consuming events quickly enough.
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if `size` is less than 10.
    pub fn with_event_queue_size(mut self, size: usize) -> Result<Self, ProoflineError> {
        if size < MIN_EVENT_QUEUE_SIZE {
            return Err(ProoflineError::InvalidRequest {
                info: format!(
                    "event queue size {size} is below the minimum of {MIN_EVENT_QUEUE_SIZE}"
                ),
            });
        }
        self.event_queue_size = size;
        Ok(self)
    }

    /// Sets a custom observer for contract violations.
    ///
    /// When the client detects a broken expectation at runtime (a stale
    /// engine reply, a countdown misuse, a dropped event), it reports the
    /// violation to this observer. This enables programmatic monitoring,
    /// custom logging, or test assertions.
    ///
    /// If no observer is set, violations are logged via the `tracing` crate
    /// by default.
    ///
    /// # Example
    ///
    /// ```
    /// use proofline::{ClientBuilder, Config, telemetry::CollectingObserver};
    /// use std::sync::Arc;
    ///
    /// # struct Demo;
    /// # impl Config for Demo {
    /// #     type Math = u64;
    /// # }
    /// let observer = Arc::new(CollectingObserver::new());
    /// let builder = ClientBuilder::<Demo>::new()
    ///     .with_violation_observer(observer.clone());
    ///
    /// // After driving the client, check for violations
    /// // assert!(observer.violations().is_empty());
    /// ```
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.violation_observer = Some(observer);
        self
    }

    /// Consumes the builder to construct a [`GameClient`] running over the
    /// given transport.
    ///
    /// The client starts with an empty session registry: open the first game
    /// with [`GameClient::new_game`] or reattach to an engine-side one with
    /// [`GameClient::reconnect`].
    ///
    /// # Errors
    /// - [`ProoflineError::InvalidRequest`] if the tick interval exceeds the
    ///   game duration. Such a countdown would jump from full to expired in
    ///   a single tick.
    pub fn start_client(
        self,
        transport: impl ProofTransport<T> + 'static,
    ) -> Result<GameClient<T>, ProoflineError> {
        if self.tick_interval > self.game_duration {
            return Err(ProoflineError::InvalidRequest {
                info: format!(
                    "tick interval {:?} exceeds the game duration {:?}",
                    self.tick_interval, self.game_duration
                ),
            });
        }
        Ok(GameClient::new(
            Box::new(transport),
            self.game_duration,
            self.tick_interval,
            self.event_queue_size,
            self.violation_observer,
        ))
    }
}

// ###################
// # UNIT TESTS      #
// ###################
