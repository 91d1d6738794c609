//! Convenient re-exports for common usage.
//!
//! This module provides a "prelude" that re-exports the most commonly used types
//! from Proofline, allowing you to import them all at once.
//!
//! # Usage
//!
//! ```rust
//! use proofline::prelude::*;
//! ```
//!
//! # What's Included
//!
//! The prelude includes:
//!
//! - **Client types**: [`GameClient`], [`ClientBuilder`]
//! - **Core traits**: [`Config`], [`ProofTransport`]
//! - **Fundamental types**: [`SessionId`], [`SessionHandle`], [`StateIndex`]
//! - **Game setup**: [`GameConfig`], [`GameMode`], [`GameStatus`]
//! - **Proof history**: [`Timeline`], [`ProofState`]
//! - **Theorem selection**: [`TheoremSelection`], [`SelectionSnapshot`]
//! - **Countdown state**: [`CountdownSnapshot`], [`CountdownState`]
//! - **Event handling**: [`GameEvent`], [`EventDrain`]
//! - **Engine wire types**: [`EngineRequest`], [`EngineReply`], [`EngineCommand`],
//!   [`ReplyBody`], [`RequestToken`], [`StateBody`], [`RuleCatalog`]
//! - **Error handling**: [`ProoflineError`]
//! - **Defaults**: [`DEFAULT_GAME_DURATION`], [`DEFAULT_TICK_INTERVAL`],
//!   [`DEFAULT_EVENT_QUEUE_SIZE`]
//!
//! # Example
//!
//! ```rust
//! use proofline::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! // Define the proof-engine payload carried by every proof state
//! #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
//! struct MyMath {
//!     term_ids: Vec<u32>,
//! }
//!
//! // Create the config marker struct
//! struct MyConfig;
//!
//! impl Config for MyConfig {
//!     type Math = MyMath;
//! }
//! ```

// Core client types
pub use crate::sessions::builder::ClientBuilder;
pub use crate::sessions::client::GameClient;

// Core traits
pub use crate::{Config, ProofTransport};

// Fundamental types
pub use crate::{SessionHandle, SessionId, StateIndex};

// Game setup
pub use crate::{GameConfig, GameMode, GameStatus};

// Proof history and theorem selection
pub use crate::{ProofState, SelectionSnapshot, TheoremSelection, Timeline};

// Countdown state
pub use crate::{CountdownSnapshot, CountdownState};

// Event handling
pub use crate::{EventDrain, GameEvent};

// Engine wire types
pub use crate::{
    EngineCommand, EngineReply, EngineRequest, ReplyBody, RequestToken, RuleCatalog, StateBody,
};

// Error handling
pub use crate::ProoflineError;

// Defaults
pub use crate::{DEFAULT_EVENT_QUEUE_SIZE, DEFAULT_GAME_DURATION, DEFAULT_TICK_INTERVAL};
