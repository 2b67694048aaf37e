//! Structured reporting for contract violations inside the simulation.
//!
//! Core operations never fail loudly: a call that breaks a precondition is ignored so
//! that every participant's copy of the state machines stays in lockstep. Ignoring a
//! call silently makes bugs hard to find, so the places where that happens report a
//! [`Violation`] to a [`ViolationObserver`]. By default violations are logged through
//! `tracing`; tests swap in a [`CollectingObserver`] to assert on them.
//!
//! # Example
//!
//! ```
//! use arson_mode::telemetry::{CollectingObserver, ViolationKind};
//! use arson_mode::{FireEngine, RoomGraph};
//! use std::sync::Arc;
//!
//! let observer = Arc::new(CollectingObserver::new());
//! let mut engine = FireEngine::new(RoomGraph::new(), Default::default());
//! engine.set_violation_observer(observer.clone());
//!
//! assert!(observer.is_empty());
//! ```

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{PlayerId, RoomId};

/// How serious a reported violation is.
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// The call was ignored or a fallback was taken. State is still consistent.
    Warning,
    /// The call was ignored and the caller is very likely out of sync with the engine.
    Error,
    /// An internal invariant is broken. State may already have diverged.
    Critical,
}

impl ViolationSeverity {
    /// Returns a label suitable for log fields.
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

/// The subsystem that reported a violation.
///
/// # Forward Compatibility
///
/// Marked `#[non_exhaustive]`. Include a wildcard arm when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// Malformed adjacency input (self-loops, empty ids).
    RoomGraph,
    /// A fire operation named an unknown room or arrived in a state that ignores it.
    FireEngine,
    /// A task completion was rejected, or the finale could not light its prop.
    TaskChain,
    /// Arsonist selection had nothing to choose from or an empty range.
    Selection,
    /// An extinguisher request did not match the extinguisher's state.
    Extinguisher,
    /// A relay message could not be decoded or named an unknown participant.
    Relay,
    /// Configuration constraint violated at runtime.
    Configuration,
    /// A type's runtime invariant check failed.
    ///
    /// Only checked in debug builds or with the `paranoid` feature.
    Invariant,
    /// Internal logic error. Indicates a bug in this crate.
    InternalError,
}

impl ViolationKind {
    /// Returns a label suitable for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoomGraph => "room_graph",
            Self::FireEngine => "fire_engine",
            Self::TaskChain => "task_chain",
            Self::Selection => "selection",
            Self::Extinguisher => "extinguisher",
            Self::Relay => "relay",
            Self::Configuration => "configuration",
            Self::Invariant => "invariant",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded violation with enough context to diagnose it.
///
/// # Example
///
/// ```
/// use arson_mode::telemetry::{Violation, ViolationKind, ViolationSeverity};
/// use arson_mode::RoomId;
///
/// let violation = Violation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::FireEngine,
///     "ignite for unknown room ignored",
///     "fire.rs:10",
/// )
/// .with_room(RoomId::from("Attic"));
///
/// assert!(violation.to_string().contains("Attic"));
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    /// How serious the violation is.
    pub severity: ViolationSeverity,
    /// Which subsystem reported it.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
    /// Source location (`file:line`).
    pub location: &'static str,
    /// The room involved, if any.
    pub room: Option<RoomId>,
    /// The participant involved, if any.
    pub player: Option<PlayerId>,
    /// Extra key-value context.
    pub context: BTreeMap<String, String>,
}

impl Violation {
    /// Creates a violation with no room, player, or context attached.
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
            room: None,
            player: None,
            context: BTreeMap::new(),
        }
    }

    /// Attaches the room involved.
    #[must_use]
    pub fn with_room(mut self, room: RoomId) -> Self {
        self.room = Some(room);
        self
    }

    /// Attaches the participant involved.
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this violation to a JSON string.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(room) = &self.room {
            write!(f, ", room={room}")?;
        }
        if let Some(player) = &self.player {
            write!(f, ", player={player}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Receives violations as they are reported.
///
/// With the `sync-send` feature, observers must be `Send + Sync`.
///
/// # Example
///
/// ```
/// use arson_mode::telemetry::{Violation, ViolationObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Counter(AtomicUsize);
///
/// impl ViolationObserver for Counter {
///     fn on_violation(&self, _violation: &Violation) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
#[cfg(feature = "sync-send")]
pub trait ViolationObserver: Send + Sync {
    /// Called once per reported violation.
    fn on_violation(&self, violation: &Violation);
}

#[cfg(not(feature = "sync-send"))]
/// Receives violations as they are reported.
pub trait ViolationObserver {
    /// Called once per reported violation.
    fn on_violation(&self, violation: &Violation);
}

/// Default observer. Logs through `tracing` with structured fields.
///
/// `Warning` maps to `tracing::warn!`; `Error` and `Critical` map to `tracing::error!`.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn display_or_null<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "null".to_owned(), ToString::to_string)
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &Violation) {
        let severity = violation.severity.as_str();
        let kind = violation.kind.as_str();
        let location = violation.location;
        let room = display_or_null(violation.room.as_ref());
        let player = display_or_null(violation.player.as_ref());
        let context = if violation.context.is_empty() {
            "{}".to_owned()
        } else {
            let pairs: Vec<String> = violation
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match violation.severity {
            ViolationSeverity::Warning => {
                tracing::warn!(
                    severity,
                    kind,
                    location,
                    room = %room,
                    player = %player,
                    context = %context,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Error | ViolationSeverity::Critical => {
                tracing::error!(
                    severity,
                    kind,
                    location,
                    room = %room,
                    player = %player,
                    context = %context,
                    "{}",
                    violation.message
                );
            },
        }
    }
}

/// Observer that stores every violation. Intended for tests.
///
/// # Example
///
/// ```
/// use arson_mode::telemetry::{
///     CollectingObserver, Violation, ViolationKind, ViolationObserver, ViolationSeverity,
/// };
///
/// let observer = CollectingObserver::new();
/// observer.on_violation(&Violation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::TaskChain,
///     "out of order",
///     "chain.rs:1",
/// ));
///
/// assert_eq!(observer.len(), 1);
/// assert!(observer.has_violation(ViolationKind::TaskChain));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<Violation>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of everything collected so far.
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        self.violations.lock().clone()
    }

    /// Number of collected violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Returns `true` if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Returns `true` if any violation of `kind` was collected.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }

    /// Returns all violations of `kind`.
    #[must_use]
    pub fn violations_of_kind(&self, kind: ViolationKind) -> Vec<Violation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns all violations at or above `min_severity`.
    #[must_use]
    pub fn violations_at_severity(&self, min_severity: ViolationSeverity) -> Vec<Violation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.severity >= min_severity)
            .cloned()
            .collect()
    }

    /// Discards everything collected so far.
    pub fn clear(&self) {
        self.violations.lock().clear();
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &Violation) {
        self.violations.lock().push(violation.clone());
    }
}

/// Forwards each violation to several observers in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ViolationObserver>>,
}

impl CompositeObserver {
    /// Creates a composite with no children.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Appends an observer.
    pub fn add(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.observers.push(observer);
    }
}

impl ViolationObserver for CompositeObserver {
    fn on_violation(&self, violation: &Violation) {
        for observer in &self.observers {
            observer.on_violation(violation);
        }
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("num_observers", &self.observers.len())
            .finish()
    }
}

/// Sends `violation` to `observer`, or to [`TracingObserver`] when there is none.
pub fn report_to_observer(observer: Option<&Arc<dyn ViolationObserver>>, violation: &Violation) {
    match observer {
        Some(obs) => obs.on_violation(violation),
        None => TracingObserver.on_violation(violation),
    }
}

/// Reports a violation through [`TracingObserver`], tagged with the call site.
///
/// ```
/// use arson_mode::{report_violation, telemetry::{ViolationKind, ViolationSeverity}};
///
/// report_violation!(ViolationSeverity::Warning, ViolationKind::Selection,
///     "no eligible candidates among {} players", 4);
/// ```
#[macro_export]
macro_rules! report_violation {
    ($severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::Violation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};

    ($severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::Violation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};
}

/// Reports a violation through an `Option<Arc<dyn ViolationObserver>>`, falling back
/// to tracing when it is `None`.
///
/// An optional `room = expr` or `player = expr` argument attaches that id.
///
/// ```
/// use arson_mode::{report_violation_to, telemetry::*};
/// use arson_mode::RoomId;
/// use std::sync::Arc;
///
/// let collector = Arc::new(CollectingObserver::new());
/// let observer: Option<Arc<dyn ViolationObserver>> = Some(collector.clone());
///
/// report_violation_to!(&observer, ViolationSeverity::Warning, ViolationKind::FireEngine,
///     room = RoomId::from("Attic"), "unknown room {}", "Attic");
/// assert_eq!(collector.violations()[0].room, Some(RoomId::from("Attic")));
/// ```
#[macro_export]
macro_rules! report_violation_to {
    ($observer:expr, $severity:expr, $kind:expr, room = $room:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let violation = $crate::telemetry::Violation::new(
            $severity,
            $kind,
            format!($fmt $(, $arg)*),
            concat!(file!(), ":", line!()),
        )
        .with_room($crate::RoomId::clone(&$room));
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};

    ($observer:expr, $severity:expr, $kind:expr, player = $player:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let violation = $crate::telemetry::Violation::new(
            $severity,
            $kind,
            format!($fmt $(, $arg)*),
            concat!(file!(), ":", line!()),
        )
        .with_player($crate::PlayerId::clone(&$player));
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};

    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let violation = $crate::telemetry::Violation::new(
            $severity,
            $kind,
            format!($fmt $(, $arg)*),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::report_to_observer($observer.as_ref(), &violation);
    }};
}

/// Panics if `observer` collected any violation.
#[macro_export]
macro_rules! assert_no_violations {
    ($observer:expr) => {{
        let violations = $observer.violations();
        assert!(
            violations.is_empty(),
            "Expected no violations, but found {}:\n{:#?}",
            violations.len(),
            violations
        );
    }};
}

/// Panics unless `observer` collected a violation of `kind`.
#[macro_export]
macro_rules! assert_violation {
    ($observer:expr, $kind:expr) => {{
        assert!(
            $observer.has_violation($kind),
            "Expected violation of kind {:?}, but found: {:#?}",
            $kind,
            $observer.violations()
        );
    }};
}

// ==========================================
// Runtime Invariant Checking
// ==========================================

/// A broken type invariant.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvariantViolation {
    /// Name of the type whose invariant was violated.
    pub type_name: &'static str,
    /// Description of the violated invariant.
    pub invariant: String,
    /// Additional diagnostic context.
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    #[must_use]
    pub fn new(type_name: &'static str, invariant: impl Into<String>) -> Self {
        Self {
            type_name,
            invariant: invariant.into(),
            details: None,
        }
    }

    /// Adds details.
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
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Types with internal invariants that can be verified at runtime.
///
/// [`RoomGraph`](crate::RoomGraph), [`FireEngine`](crate::FireEngine) and
/// [`TaskChain`](crate::TaskChain) implement this, and check themselves after every
/// mutation in debug builds.
pub trait InvariantChecker {
    /// Returns the first broken invariant, if any.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// Checks invariants in debug builds (or with `paranoid`), reporting failures as
/// [`ViolationSeverity::Critical`]. Compiles to nothing otherwise.
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

/// No-op in release builds without `paranoid`.
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! debug_check_invariants {
    ($expr:expr) => {{}};
    ($expr:expr, $context:expr) => {{}};
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn sample(kind: ViolationKind, severity: ViolationSeverity) -> Violation {
        Violation::new(severity, kind, "sample", "telemetry.rs:1")
    }

    #[test]
    fn severity_orders_by_seriousness() {
        assert!(ViolationSeverity::Warning < ViolationSeverity::Error);
        assert!(ViolationSeverity::Error < ViolationSeverity::Critical);
    }

    #[test]
    fn display_includes_room_and_player() {
        let text = sample(ViolationKind::TaskChain, ViolationSeverity::Warning)
            .with_room(RoomId::from("Kitchen"))
            .with_player(PlayerId::from("p9"))
            .with_context("index", "3")
            .to_string();
        assert!(text.starts_with("[warning/task_chain] sample"));
        assert!(text.contains("room=Kitchen"));
        assert!(text.contains("player=p9"));
        assert!(text.contains("index"));
    }

    #[test]
    fn collecting_observer_filters() {
        let observer = CollectingObserver::new();
        observer.on_violation(&sample(ViolationKind::FireEngine, ViolationSeverity::Warning));
        observer.on_violation(&sample(ViolationKind::Relay, ViolationSeverity::Error));

        assert_eq!(observer.len(), 2);
        assert_eq!(observer.violations_of_kind(ViolationKind::Relay).len(), 1);
        assert_eq!(
            observer
                .violations_at_severity(ViolationSeverity::Error)
                .len(),
            1
        );
        assert!(!observer.has_violation(ViolationKind::Selection));

        observer.clear();
        assert!(observer.is_empty());
    }

    #[test]
    fn composite_fans_out() {
        let a = Arc::new(CollectingObserver::new());
        let b = Arc::new(CollectingObserver::new());
        let mut composite = CompositeObserver::new();
        composite.add(a.clone());
        composite.add(b.clone());

        composite.on_violation(&sample(ViolationKind::RoomGraph, ViolationSeverity::Warning));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn report_to_none_does_not_panic() {
        report_to_observer(
            None,
            &sample(ViolationKind::InternalError, ViolationSeverity::Critical),
        );
    }

    #[test]
    fn report_violation_to_attaches_player() {
        let collector = Arc::new(CollectingObserver::new());
        let observer: Option<Arc<dyn ViolationObserver>> = Some(collector.clone());
        let player = PlayerId::from("p2");
        report_violation_to!(
            &observer,
            ViolationSeverity::Warning,
            ViolationKind::TaskChain,
            player = player,
            "rejected index {}",
            2
        );
        let collected = collector.violations();
        assert_eq!(collected[0].player, Some(PlayerId::from("p2")));
        assert_eq!(collected[0].message, "rejected index 2");
    }

    #[test]
    fn invariant_violation_display() {
        let violation = InvariantViolation::new("RoomGraph", "adjacency must be symmetric")
            .with_details("Kitchen -> Lobby");
        assert_eq!(
            violation.to_string(),
            "RoomGraph: adjacency must be symmetric (Kitchen -> Lobby)"
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn violation_serializes_snake_case() {
        let json = sample(ViolationKind::FireEngine, ViolationSeverity::Warning)
            .to_json()
            .unwrap();
        assert!(json.contains(r#""kind":"fire_engine""#));
        assert!(json.contains(r#""severity":"warning""#));
    }
}
