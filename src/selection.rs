//! The theorem range selection: a two-slot interval picker over timeline
//! indices.
//!
//! The player carves a theorem by clicking two timeline entries. Clicking an
//! already-selected entry deselects it; the tie-break order is fixed and
//! load-bearing: de-selection is checked before fresh selection, so clicking
//! the current `start` always clears it even when `end` is still unset.
//! Endpoints may arrive in either order — [`TheoremSelection::normalized`]
//! sorts them before submission.

use serde::{Deserialize, Serialize};

use crate::error::ProoflineError;
use crate::StateIndex;

/// A copyable view of the selection endpoints, carried by
/// [`GameEvent::SelectionChanged`](crate::GameEvent::SelectionChanged) so the
/// rendering surface can restyle the timeline entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    /// The first endpoint, in click order.
    pub start: Option<StateIndex>,
    /// The second endpoint, in click order.
    pub end: Option<StateIndex>,
}

impl SelectionSnapshot {
    /// `true` iff both endpoints are set.
    #[inline]
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// `true` iff neither endpoint is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Two-slot interval picker over a timeline's indices.
///
/// Holds at most two endpoints. The slots are filled in click order (`start`
/// first), cleared individually by re-clicking, and reset wholesale whenever
/// selection mode is entered or exited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TheoremSelection {
    start: Option<StateIndex>,
    end: Option<StateIndex>,
}

impl TheoremSelection {
    /// Creates an empty selection.
    #[must_use]
    pub const fn new() -> Self {
        TheoremSelection {
            start: None,
            end: None,
        }
    }

    /// Applies one click on timeline entry `index`.
    ///
    /// Exact tie-break order: if `index` equals `start`, clear `start`; else
    /// if it equals `end`, clear `end`; else fill `start` if unset; else fill
    /// `end` if unset; else do nothing — the selection is full and the caller
    /// must clear an endpoint first.
    ///
    /// Returns `true` iff the selection changed.
    pub fn toggle(&mut self, index: StateIndex) -> bool {
        if self.start == Some(index) {
            self.start = None;
            true
        } else if self.end == Some(index) {
            self.end = None;
            true
        } else if self.start.is_none() {
            self.start = Some(index);
            true
        } else if self.end.is_none() {
            self.end = Some(index);
            true
        } else {
            false
        }
    }

    /// `true` iff both endpoints are set.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// The endpoints ordered as `(min, max)`, ready for submission.
    ///
    /// # Errors
    /// - [`ProoflineError::IncompleteSelection`] unless both endpoints are
    ///   set.
    pub fn normalized(&self) -> Result<(StateIndex, StateIndex), ProoflineError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok((start.min(end), start.max(end))),
            _ => Err(ProoflineError::IncompleteSelection),
        }
    }

    /// Clears both endpoints unconditionally.
    pub fn reset(&mut self) {
        self.start = None;
        self.end = None;
    }

    /// A copyable view of the current endpoints.
    #[must_use]
    pub const fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            start: self.start,
            end: self.end,
        }
    }

    /// The first endpoint, in click order.
    #[must_use]
    pub const fn start(&self) -> Option<StateIndex> {
        self.start
    }

    /// The second endpoint, in click order.
    #[must_use]
    pub const fn end(&self) -> Option<StateIndex> {
        self.end
    }
}

// ###################
// # UNIT TESTS      #
// ###################


// ###################
// # KANI PROOFS     #
// ###################

/// Kani proofs for the selection protocol.
///
/// These proofs verify:
/// - Normalization always orders the endpoints
/// - A toggle round trip on an empty selection is the identity
///
/// Run proofs with:
///   cargo kani
#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Proof: normalized endpoints always satisfy `start <= end`.
    #[kani::proof]
    fn proof_normalized_is_ordered() {
        let a: usize = kani::any();
        let b: usize = kani::any();
        kani::assume(a != b);

        let mut selection = TheoremSelection::new();
        kani::assert(selection.toggle(StateIndex::new(a)), "first click fills start");
        kani::assert(selection.toggle(StateIndex::new(b)), "second click fills end");

        match selection.normalized() {
            Ok((start, end)) => kani::assert(start <= end, "normalized must be ordered"),
            Err(_) => kani::assert(false, "complete selection must normalize"),
        }
    }

    /// Proof: toggling the same index twice on an empty selection restores it.
    #[kani::proof]
    fn proof_toggle_round_trip_is_identity() {
        let index: usize = kani::any();

        let mut selection = TheoremSelection::new();
        let _ = selection.toggle(StateIndex::new(index));
        let _ = selection.toggle(StateIndex::new(index));
        kani::assert(
            selection.start().is_none() && selection.end().is_none(),
            "double toggle must restore the empty selection",
        );
    }
}
