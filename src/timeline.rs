//! The per-session proof history: an ordered sequence of proof states with a
//! movable cursor.
//!
//! Rule applications append; navigation moves the cursor without touching the
//! stored states. The sequence is append-only with one exception: appending
//! while the cursor sits before the end drops every state after the cursor
//! first (the player stepped back and branched), so the history never holds
//! two futures at once.
//!
//! Boundary navigation is deliberately silent: stepping past either end is a
//! routine user action, not a fault, so it returns `false` instead of an
//! error. Jumping to an explicit index is different — an invalid index there
//! is a caller bug and fails with [`ProoflineError::OutOfRange`].

use serde::{Deserialize, Serialize};

use crate::error::ProoflineError;
use crate::{Config, StateIndex};

/// One formula snapshot in a session's history.
///
/// `text` is the human-readable rendering shown in the timeline list; `math`
/// is the proof engine's own representation, stored untouched and handed back
/// to the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofState<M> {
    /// Human-readable rendering of the formula.
    pub text: String,
    /// Opaque proof-engine payload for this state.
    pub math: M,
}

impl<M> ProofState<M> {
    /// Creates a proof state from its rendering and its engine payload.
    pub fn new(text: impl Into<String>, math: M) -> Self {
        ProofState {
            text: text.into(),
            math,
        }
    }
}

/// Ordered history of proof states with a cursor marking the active one.
///
/// Invariant: the cursor is `Some(index)` with `index < len()` whenever the
/// timeline is non-empty, and `None` exactly when it is empty. All mutation
/// goes through [`push`](Timeline::push), the two step methods,
/// [`jump_to`](Timeline::jump_to) and
/// [`replace_current`](Timeline::replace_current); the stored sequence is
/// never mutable from outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<T>
where
    T: Config,
{
    /// The proof states, in play order.
    states: Vec<ProofState<T::Math>>,
    /// Index of the active state. `None` exactly while `states` is empty.
    cursor: Option<usize>,
}

impl<T: Config> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> Timeline<T> {
    /// Creates an empty timeline.
    #[must_use]
    pub const fn new() -> Self {
        Timeline {
            states: Vec::new(),
            cursor: None,
        }
    }

    /// Appends a proof state and moves the cursor onto it. Always succeeds.
    ///
    /// If the cursor sits before the end, the states after it are dropped
    /// first: the player navigated back and is branching off a new line of
    /// play.
    pub fn push(&mut self, state: ProofState<T::Math>) {
        if let Some(cursor) = self.cursor {
            self.states.truncate(cursor + 1);
        }
        self.states.push(state);
        self.cursor = Some(self.states.len() - 1);
    }

    /// Moves the cursor one step toward the start. Returns `false`, changing
    /// nothing, when the cursor is already at the first state (or the
    /// timeline is empty).
    pub fn step_back(&mut self) -> bool {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                true
            }
            _ => false,
        }
    }

    /// Moves the cursor one step toward the end. Returns `false`, changing
    /// nothing, when the cursor is already at the last state (or the
    /// timeline is empty).
    pub fn step_forward(&mut self) -> bool {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.states.len() => {
                self.cursor = Some(cursor + 1);
                true
            }
            _ => false,
        }
    }

    /// `true` when [`step_back`](Timeline::step_back) would move.
    #[must_use]
    pub fn can_step_back(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    /// `true` when [`step_forward`](Timeline::step_forward) would move.
    #[must_use]
    pub fn can_step_forward(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.states.len())
    }

    /// Sets the cursor to an arbitrary index.
    ///
    /// # Errors
    /// - [`ProoflineError::OutOfRange`] if `index` is not a valid position.
    pub fn jump_to(&mut self, index: StateIndex) -> Result<(), ProoflineError> {
        if index.as_usize() >= self.states.len() {
            return Err(ProoflineError::OutOfRange {
                index: index.as_usize(),
                len: self.states.len(),
            });
        }
        self.cursor = Some(index.as_usize());
        Ok(())
    }

    /// Overwrites the state under the cursor, leaving the cursor in place.
    /// Returns `false` on an empty timeline.
    ///
    /// Used when the engine resends the active state (a refresh, or a
    /// navigation reply that disagrees with the local copy): the engine's
    /// version wins, but the shape of the history does not change.
    pub fn replace_current(&mut self, state: ProofState<T::Math>) -> bool {
        match self.cursor {
            Some(cursor) => {
                self.states[cursor] = state;
                true
            }
            None => false,
        }
    }

    /// The stored proof states, in play order.
    #[must_use]
    pub fn states(&self) -> &[ProofState<T::Math>] {
        &self.states
    }

    /// The cursor position, or `None` on an empty timeline.
    #[must_use]
    pub fn cursor(&self) -> Option<StateIndex> {
        self.cursor.map(StateIndex::new)
    }

    /// The state under the cursor, or `None` on an empty timeline.
    #[must_use]
    pub fn current(&self) -> Option<&ProofState<T::Math>> {
        self.cursor.map(|cursor| &self.states[cursor])
    }

    /// The state at `index`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, index: StateIndex) -> Option<&ProofState<T::Math>> {
        self.states.get(index.as_usize())
    }

    /// Number of stored states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// `true` when no state has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// ###################
// # UNIT TESTS      #
// ###################

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct TestConfig;

    impl Config for TestConfig {
        type Math = u32;
    }

    fn state(tag: u32) -> ProofState<u32> {
        ProofState::new(format!("state {}", tag), tag)
    }

    fn timeline_with(count: u32) -> Timeline<TestConfig> {
        let mut timeline = Timeline::new();
        for tag in 0..count {
            timeline.push(state(tag));
        }
        timeline
    }

    // ==========================================
    // Construction and Append Tests
    // ==========================================

    #[test]
    fn new_timeline_is_empty_with_no_cursor() {
        let timeline: Timeline<TestConfig> = Timeline::new();
        assert!(timeline.is_empty());
        assert_eq!(timeline.len(), 0);
        assert_eq!(timeline.cursor(), None);
        assert_eq!(timeline.current(), None);
    }

    #[test]
    fn push_sets_cursor_to_new_end() {
        let mut timeline = timeline_with(0);
        timeline.push(state(0));
        assert_eq!(timeline.cursor(), Some(StateIndex::new(0)));

        timeline.push(state(1));
        timeline.push(state(2));
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.cursor(), Some(StateIndex::new(2)));
        assert_eq!(timeline.current(), Some(&state(2)));
    }

    #[test]
    fn push_after_step_back_truncates_the_branch() {
        let mut timeline = timeline_with(4);
        assert!(timeline.step_back());
        assert!(timeline.step_back());
        assert_eq!(timeline.cursor(), Some(StateIndex::new(1)));

        timeline.push(state(99));
        // States 2 and 3 are gone; the new state follows state 1 directly.
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.cursor(), Some(StateIndex::new(2)));
        assert_eq!(timeline.current(), Some(&state(99)));
        assert_eq!(timeline.get(StateIndex::new(1)), Some(&state(1)));
    }

    // ==========================================
    // Navigation Tests
    // ==========================================

    #[test]
    fn step_back_and_forward_move_one_step() {
        let mut timeline = timeline_with(3);
        assert!(timeline.step_back());
        assert_eq!(timeline.cursor(), Some(StateIndex::new(1)));
        assert!(timeline.step_forward());
        assert_eq!(timeline.cursor(), Some(StateIndex::new(2)));
    }

    #[test]
    fn step_back_at_start_is_a_silent_no_op() {
        let mut timeline = timeline_with(2);
        assert!(timeline.step_back());
        assert!(!timeline.step_back());
        assert_eq!(timeline.cursor(), Some(StateIndex::new(0)));
    }

    #[test]
    fn step_forward_at_end_is_a_silent_no_op() {
        let mut timeline = timeline_with(2);
        assert!(!timeline.step_forward());
        assert_eq!(timeline.cursor(), Some(StateIndex::new(1)));
    }

    #[test]
    fn steps_on_empty_timeline_are_no_ops() {
        let mut timeline: Timeline<TestConfig> = Timeline::new();
        assert!(!timeline.step_back());
        assert!(!timeline.step_forward());
        assert_eq!(timeline.cursor(), None);
    }

    #[test]
    fn stepping_forward_n_times_from_start_reaches_the_end() {
        let count = 5;
        let mut timeline = timeline_with(count);
        timeline.jump_to(StateIndex::new(0)).unwrap();

        let mut moved = 0;
        while timeline.step_forward() {
            moved += 1;
        }
        assert_eq!(moved, count as usize - 1);
        assert_eq!(timeline.cursor(), Some(StateIndex::new(count as usize - 1)));
        // Further calls stay put.
        assert!(!timeline.step_forward());
        assert_eq!(timeline.cursor(), Some(StateIndex::new(count as usize - 1)));
    }

    #[test]
    fn can_step_predicates_match_step_results() {
        let mut timeline = timeline_with(2);
        assert!(timeline.can_step_back());
        assert!(!timeline.can_step_forward());
        assert!(timeline.step_back());
        assert!(!timeline.can_step_back());
        assert!(timeline.can_step_forward());
    }

    // ==========================================
    // Jump Tests
    // ==========================================

    #[test]
    fn jump_to_sets_cursor_directly() {
        let mut timeline = timeline_with(4);
        timeline.jump_to(StateIndex::new(1)).unwrap();
        assert_eq!(timeline.cursor(), Some(StateIndex::new(1)));
        assert_eq!(timeline.current(), Some(&state(1)));
    }

    #[test]
    fn jump_to_rejects_out_of_range_index() {
        let mut timeline = timeline_with(3);
        let result = timeline.jump_to(StateIndex::new(3));
        assert_eq!(
            result,
            Err(ProoflineError::OutOfRange { index: 3, len: 3 })
        );
        // Cursor untouched on failure.
        assert_eq!(timeline.cursor(), Some(StateIndex::new(2)));
    }

    #[test]
    fn jump_to_rejects_any_index_on_empty_timeline() {
        let mut timeline: Timeline<TestConfig> = Timeline::new();
        assert_eq!(
            timeline.jump_to(StateIndex::new(0)),
            Err(ProoflineError::OutOfRange { index: 0, len: 0 })
        );
    }

    // ==========================================
    // Replace Tests
    // ==========================================

    #[test]
    fn replace_current_overwrites_in_place() {
        let mut timeline = timeline_with(3);
        timeline.jump_to(StateIndex::new(1)).unwrap();

        assert!(timeline.replace_current(state(42)));
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.cursor(), Some(StateIndex::new(1)));
        assert_eq!(timeline.current(), Some(&state(42)));
        // Neighbors untouched.
        assert_eq!(timeline.get(StateIndex::new(0)), Some(&state(0)));
        assert_eq!(timeline.get(StateIndex::new(2)), Some(&state(2)));
    }

    #[test]
    fn replace_current_on_empty_timeline_returns_false() {
        let mut timeline: Timeline<TestConfig> = Timeline::new();
        assert!(!timeline.replace_current(state(0)));
        assert!(timeline.is_empty());
    }

    // ==========================================
    // Accessor Tests
    // ==========================================

    #[test]
    fn states_exposes_the_full_sequence_in_order() {
        let timeline = timeline_with(3);
        let tags: Vec<u32> = timeline.states().iter().map(|s| s.math).collect();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    #[test]
    fn get_returns_none_out_of_range() {
        let timeline = timeline_with(2);
        assert!(timeline.get(StateIndex::new(1)).is_some());
        assert!(timeline.get(StateIndex::new(2)).is_none());
    }

    #[test]
    fn proof_state_serde_roundtrip() {
        let original = ProofState::new("x ∧ y", 7u32);
        let json = serde_json::to_string(&original).unwrap();
        let back: ProofState<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
