//! Common test infrastructure shared across integration tests.
//!
//! This module provides:
//! - `stubs`: a scripted proof-engine transport and the config it serves
//! - `test_utils`: shared constants and helpers that drive whole client flows
//!
//! # Usage
//!
//! From any integration test file:
//! ```ignore
//! mod common;
//! use common::stubs::{ScriptedTransport, StubConfig, StubMath};
//! use common::test_utils::{open_game, scripted_client, GAME, TICK};
//! // Or use the re-exported items:
//! use common::{open_game, scripted_client};
//! ```

pub mod stubs;
pub mod test_utils;

// Re-export commonly used items for convenience.
// These are public utilities for integration tests - allow unused until tests adopt them.
#[allow(unused_imports)]
pub use stubs::{
    ack_reply, answer_last, catalog, math, reject_last, rules_reply, sent_operations,
    started_reply, state_reply, Script, ScriptedTransport, StubConfig, StubMath,
};

#[allow(unused_imports)]
pub use test_utils::{
    answer_next, apply_and_answer, init_tracing, open_game, open_game_with, scripted_client,
    scripted_client_with, timed_config, untimed_config, GAME, TICK,
};
