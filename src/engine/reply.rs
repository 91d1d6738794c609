//! The reply side of the proof engine protocol.
//!
//! Replies are generic over the math payload `M` (the [`Config::Math`]
//! associated type of the client consuming them) so transports can
//! deserialize engine JSON straight into typed replies.
//!
//! [`Config::Math`]: crate::Config

use serde::{Deserialize, Serialize};

use crate::engine::command::RequestToken;
use crate::timeline::ProofState;
use crate::{GameStatus, SessionId};

/// Outcome the engine reports for one call.
///
/// Anything but [`Ok`](Self::Ok) aborts the handler that placed the call and
/// surfaces as [`ProoflineError::RemoteFailure`](crate::ProoflineError::RemoteFailure).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineStatus {
    /// The call succeeded.
    Ok,
    /// The call failed engine-side.
    Error {
        /// The engine's diagnostic, forwarded to the user verbatim.
        message: String,
    },
}

impl EngineStatus {
    /// `true` iff the call succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, EngineStatus::Ok)
    }

    /// The failure diagnostic, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            EngineStatus::Ok => None,
            EngineStatus::Error { message } => Some(message),
        }
    }
}

/// One proof state as the engine ships it.
///
/// `text` is the short rendering shown in timeline entries, `math` the full
/// engine representation the rendering surface typesets, and `status` whether
/// this state closes the game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBody<M> {
    /// Human-readable rendering of the formula.
    pub text: String,
    /// Opaque engine payload.
    pub math: M,
    /// Whether the game is still open at this state.
    #[serde(rename = "gameStatus")]
    pub status: GameStatus,
}

impl<M> StateBody<M> {
    /// Splits the body into the timeline entry and the status verdict.
    #[must_use]
    pub fn into_parts(self) -> (ProofState<M>, GameStatus) {
        (ProofState::new(self.text, self.math), self.status)
    }
}

/// One category of the rule catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    /// Display name of the category.
    pub category: String,
    /// Rule descriptions, in catalog order.
    pub rules: Vec<String>,
}

/// The full rule catalog for a game's rule set, grouped by category.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleCatalog {
    /// The categories, in catalog order.
    #[serde(rename = "rules")]
    pub groups: Vec<RuleGroup>,
}

impl RuleCatalog {
    /// Total number of rules across all categories.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|group| group.rules.len()).sum()
    }

    /// `true` iff the catalog holds no rules at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|group| group.rules.is_empty())
    }
}

/// The payload of a successful reply.
///
/// Which variant a call answers with is fixed per command: `START` answers
/// `Started`, the state-bearing calls answer `State`, `RULESLIST` answers
/// `Rules`, and the rest acknowledge with `Ack`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyBody<M> {
    /// A game was created; here is its server id.
    Started {
        /// The id every later call addresses the game by.
        id: SessionId,
    },
    /// Bare acknowledgement.
    Ack,
    /// The proof state the call produced or fetched.
    State(StateBody<M>),
    /// The rule catalog.
    Rules(RuleCatalog),
}

impl<M> ReplyBody<M> {
    /// A short tag naming the variant, for diagnostics.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Started { .. } => "Started",
            Self::Ack => "Ack",
            Self::State(_) => "State",
            Self::Rules(_) => "Rules",
        }
    }
}

/// One reply on the wire, correlated to its request by token.
///
/// A failed reply (`status` not `Ok`) carries no body; the client must leave
/// the addressed session in its last-known-good state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineReply<M> {
    /// Echo of the request's correlation token.
    pub token: RequestToken,
    /// Success or failure of the call.
    pub status: EngineStatus,
    /// Payload, present iff the call succeeded and produces one.
    pub body: Option<ReplyBody<M>>,
}

impl<M> EngineReply<M> {
    /// A successful reply with a payload.
    #[must_use]
    pub const fn ok(token: RequestToken, body: ReplyBody<M>) -> Self {
        EngineReply {
            token,
            status: EngineStatus::Ok,
            body: Some(body),
        }
    }

    /// A successful reply with no payload beyond the acknowledgement.
    #[must_use]
    pub const fn ack(token: RequestToken) -> Self {
        EngineReply {
            token,
            status: EngineStatus::Ok,
            body: Some(ReplyBody::Ack),
        }
    }

    /// A failed reply carrying the engine's diagnostic.
    #[must_use]
    pub const fn error(token: RequestToken, message: String) -> Self {
        EngineReply {
            token,
            status: EngineStatus::Error { message },
            body: None,
        }
    }

    /// `true` iff the call succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

// ###################
// # UNIT TESTS      #
// ###################
