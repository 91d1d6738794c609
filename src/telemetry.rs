//! Violation reporting for contract breaches the client survives.
//!
//! Some conditions are wrong without being the caller's fault: the engine
//! echoes a token no request carries, a navigation reply disagrees with the
//! locally tracked state, a deleted session still holds a live countdown.
//! Returning an error would blame the wrong party and panicking would take
//! the whole surface down over a recoverable glitch, so the client records a
//! [`SpecViolation`] instead and keeps going on its last known good state.
//!
//! Violations are structured data, not log lines. The default
//! [`TracingObserver`] turns them into `tracing` events; tests install a
//! [`CollectingObserver`] and assert on what was (or was not) reported; hosts
//! can plug in their own [`ViolationObserver`] for metrics or alerting.
//!
//! ```
//! use proofline::telemetry::CollectingObserver;
//! use std::sync::Arc;
//!
//! let observer = Arc::new(CollectingObserver::new());
//! // ... hand the observer to ClientBuilder, run the scenario ...
//! assert!(observer.violations().is_empty(), "unexpected violations");
//! ```
//!
//! The module also carries the runtime invariant hooks: types implementing
//! [`InvariantChecker`] get their structure verified after every poll in
//! debug builds (and in release builds under the `paranoid` feature).

use crate::SessionHandle;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// How badly a violation undermines the client's guarantees.
///
/// Ordered from least to most severe so observers can filter with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Recovered in place, e.g. a stale reply that was dropped.
    Warning,
    /// Behavior degraded, e.g. a deleted session still holding a live timer.
    Error,
    /// An invariant is broken and state may be corrupted, e.g. two countdowns
    /// running at once.
    Critical,
}

impl ViolationSeverity {
    /// The snake_case label used in logs and serialized output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which contract was violated.
///
/// Kinds map to the subsystems of the client so observers can route them.
///
/// # Forward Compatibility
///
/// Marked `#[non_exhaustive]`; match with a wildcard arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// A countdown was driven against its lifecycle, e.g. resumed while
    /// already running.
    CountdownLifecycle,
    /// An engine reply disagreed with the locally tracked proof history.
    TimelineSync,
    /// The registry shape broke, e.g. a live timer surviving a delete or more
    /// than one live timer at once.
    SessionRegistry,
    /// The engine broke the request/reply protocol, e.g. an unknown token or
    /// a body shape that does not answer the call.
    EngineProtocol,
    /// A configured limit was hit, e.g. the event queue overflowing.
    Configuration,
    /// A bug in this library. Should never be reported.
    InternalError,
    /// An [`InvariantChecker`] found a broken invariant.
    Invariant,
}

impl ViolationKind {
    /// The snake_case label used in logs and serialized output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CountdownLifecycle => "countdown_lifecycle",
            Self::TimelineSync => "timeline_sync",
            Self::SessionRegistry => "session_registry",
            Self::EngineProtocol => "engine_protocol",
            Self::Configuration => "configuration",
            Self::InternalError => "internal_error",
            Self::Invariant => "invariant",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded contract breach.
///
/// Serializes to JSON with the severity and kind as snake_case strings and
/// the session as a bare handle number (or `null` when the violation is not
/// tied to one session).
///
/// ```
/// use proofline::telemetry::{SpecViolation, ViolationKind, ViolationSeverity};
/// use proofline::SessionHandle;
///
/// let violation = SpecViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::TimelineSync,
///     "navigation reply disagrees with the local state",
///     "client.rs:42",
/// )
/// .with_session(SessionHandle::new(3))
/// .with_context("expected", "x + 0")
/// .with_context("actual", "x");
///
/// let json = serde_json::to_string(&violation).unwrap();
/// assert!(json.contains(r#""kind":"timeline_sync""#));
/// assert!(json.contains(r#""session":3"#));
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct SpecViolation {
    /// How badly this breach undermines the client's guarantees.
    pub severity: ViolationSeverity,
    /// The subsystem contract that was broken.
    pub kind: ViolationKind,
    /// What happened, for a human reader.
    pub message: String,
    /// `file:line` where the breach was detected.
    pub location: &'static str,
    /// The session concerned, when the breach is tied to one.
    pub session: Option<SessionHandle>,
    /// Extra key-value diagnostics, e.g. expected vs. actual values.
    pub context: BTreeMap<String, String>,
}

impl SpecViolation {
    /// Records a new violation at the given source location.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            session: None,
            context: BTreeMap::new(),
        }
    }

    /// Ties this violation to a session.
    #[must_use]
    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    /// Attaches one key-value diagnostic.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Display for SpecViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(session) = self.session {
            write!(f, ", session={session}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// A sink for reported violations.
///
/// The client calls [`on_violation`](Self::on_violation) synchronously from
/// whatever operation detected the breach, so implementations should return
/// quickly and never block.
#[cfg(feature = "sync-send")]
pub trait ViolationObserver: Send + Sync {
    /// Called once per detected violation.
    fn on_violation(&self, violation: &SpecViolation);
}

/// A sink for reported violations.
///
/// The client calls [`on_violation`](Self::on_violation) synchronously from
/// whatever operation detected the breach, so implementations should return
/// quickly and never block.
#[cfg(not(feature = "sync-send"))]
pub trait ViolationObserver {
    /// Called once per detected violation.
    fn on_violation(&self, violation: &SpecViolation);
}

/// The default observer: forwards violations to `tracing`.
///
/// `Warning` becomes `tracing::warn!`, everything above becomes
/// `tracing::error!`. All violation fields are attached as structured fields
/// (`severity`, `kind`, `location`, `session`, `context`), so JSON log
/// formatters keep them queryable.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates the tracing-backed observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        let severity = violation.severity.as_str();
        let kind = violation.kind.as_str();
        let location = violation.location;
        let session = violation
            .session
            .map_or_else(|| "null".to_owned(), |handle| handle.as_u64().to_string());
        let context = format!("{:?}", violation.context);

        match violation.severity {
            ViolationSeverity::Warning => tracing::warn!(
                severity,
                kind,
                location,
                session = %session,
                context = %context,
                "{}",
                violation.message
            ),
            ViolationSeverity::Error | ViolationSeverity::Critical => tracing::error!(
                severity,
                kind,
                location,
                session = %session,
                context = %context,
                "{}",
                violation.message
            ),
        }
    }
}

/// An observer that stores every violation, for assertions in tests.
///
/// ```
/// use proofline::telemetry::{
///     CollectingObserver, SpecViolation, ViolationKind, ViolationObserver, ViolationSeverity,
/// };
///
/// let observer = CollectingObserver::new();
/// observer.on_violation(&SpecViolation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::EngineProtocol,
///     "reply carries an unknown token",
///     "client.rs:1",
/// ));
/// assert!(observer.has_violation(ViolationKind::EngineProtocol));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<SpecViolation>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
        }
    }

    /// All violations collected so far, in arrival order.
    #[must_use]
    pub fn violations(&self) -> Vec<SpecViolation> {
        self.violations.lock().clone()
    }

    /// The number of violations collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// `true` while nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// `true` if at least one violation of `kind` was collected.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &SpecViolation) {
        self.violations.lock().push(violation.clone());
    }
}

/// Reports a violation straight to the default [`TracingObserver`], stamping
/// the current file and line as its location.
///
/// For call sites that have no observer at hand (component internals below
/// the client). The client itself routes through [`report_violation_to!`] so
/// an installed observer sees the violation too.
///
/// ```
/// use proofline::report_violation;
/// use proofline::telemetry::{ViolationKind, ViolationSeverity};
///
/// let handle = 4;
/// report_violation!(
///     ViolationSeverity::Warning,
///     ViolationKind::CountdownLifecycle,
///     "countdown of session {} resumed while already running",
///     handle
/// );
/// ```
#[macro_export]
macro_rules! report_violation {
    ($severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};

    ($severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};
}

/// Hands a violation to `observer`, or to the default [`TracingObserver`]
/// when none is installed.
pub fn report_to_observer<O: ViolationObserver + ?Sized>(
    observer: Option<&Arc<O>>,
    violation: &SpecViolation,
) {
    match observer {
        Some(observer) => observer.on_violation(violation),
        None => TracingObserver.on_violation(violation),
    }
}

/// Like [`report_violation!`], but routed through an `Option`al observer via
/// [`report_to_observer`].
///
/// ```
/// use proofline::report_violation_to;
/// use proofline::telemetry::{CollectingObserver, ViolationKind, ViolationObserver, ViolationSeverity};
/// use std::sync::Arc;
///
/// let observer: Option<Arc<dyn ViolationObserver>> = Some(Arc::new(CollectingObserver::new()));
/// report_violation_to!(
///     &observer,
///     ViolationSeverity::Warning,
///     ViolationKind::Configuration,
///     "event queue exceeded {} entries, dropping the oldest event",
///     100
/// );
/// ```
#[macro_export]
macro_rules! report_violation_to {
    ($observer:expr, $severity:expr, $kind:expr, $msg:literal) => {{
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};

    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        let violation = $crate::telemetry::SpecViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};
}

// ==========================================
// Runtime Invariant Checking
// ==========================================

/// One broken structural invariant, named by the type that owns it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvariantViolation {
    /// The type whose invariant broke.
    pub type_name: &'static str,
    /// The invariant, stated as the condition that should have held.
    pub invariant: String,
    /// Diagnostic values, when the checker had them at hand.
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Records a broken invariant of `type_name`.
    #[must_use]
    pub fn new(type_name: &'static str, invariant: impl Into<String>) -> Self {
        Self {
            type_name,
            invariant: invariant.into(),
            details: None,
        }
    }

    /// Attaches diagnostic values.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.invariant)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

/// Structural self-checks for the client's aggregate types.
///
/// [`debug_check_invariants!`] runs these after every poll in debug builds
/// and, under the `paranoid` feature, in release builds too.
///
/// ```
/// use proofline::telemetry::{InvariantChecker, InvariantViolation};
///
/// struct Cursor {
///     position: usize,
///     len: usize,
/// }
///
/// impl InvariantChecker for Cursor {
///     fn check_invariants(&self) -> Result<(), InvariantViolation> {
///         if self.position >= self.len {
///             return Err(InvariantViolation::new("Cursor", "position is in range")
///                 .with_details(format!("position={}, len={}", self.position, self.len)));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait InvariantChecker {
    /// Returns the first broken invariant, or `Ok(())` when the structure is
    /// sound.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// Runs [`InvariantChecker::check_invariants`] and reports any breach as a
/// `Critical` violation of kind [`ViolationKind::Invariant`].
///
/// Active in debug builds and under the `paranoid` feature; compiles to
/// nothing otherwise. An optional second argument names the call site, e.g.
/// `debug_check_invariants!(self, "poll")`.
#[macro_export]
#[cfg(any(debug_assertions, feature = "paranoid"))]
macro_rules! debug_check_invariants {
    ($expr:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{}",
                violation
            );
        }
    }};

    ($expr:expr, $context:expr) => {{
        use $crate::telemetry::InvariantChecker as _;
        if let Err(violation) = $expr.check_invariants() {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{} [context: {}]",
                violation,
                $context
            );
        }
    }};
}

/// No-op form for release builds without the `paranoid` feature.
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! debug_check_invariants {
    ($expr:expr) => {{}};
    ($expr:expr, $context:expr) => {{}};
}
