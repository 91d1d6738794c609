//! The request side of the proof engine protocol.
//!
//! Every user action that needs the engine becomes one [`EngineCommand`],
//! wrapped in an [`EngineRequest`] carrying a client-issued [`RequestToken`].
//! The engine echoes the token in its reply, which is how the client matches
//! replies to the calls that caused them without ever blocking.

use serde::{Deserialize, Serialize};

use crate::{GameMode, SessionId, StateIndex};

/// Correlation token for one engine request.
///
/// Tokens are issued by the client, strictly increasing, and never reused
/// within a client's lifetime. A reply carrying a token the client no longer
/// tracks is stale and gets dropped.
///
/// # Example
///
/// ```
/// use proofline::RequestToken;
///
/// let first = RequestToken::new(1);
/// let second = RequestToken::new(2);
/// assert!(first < second);
/// assert_eq!(second.as_u64(), 2);
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Creates a token from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(token: u64) -> Self {
        RequestToken(token)
    }

    /// Returns the underlying `u64` value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The token following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        RequestToken(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestToken {
    fn from(token: u64) -> Self {
        RequestToken(token)
    }
}

impl From<RequestToken> for u64 {
    fn from(token: RequestToken) -> Self {
        token.0
    }
}

/// One call to the remote proof engine.
///
/// The engine addresses everything by server-assigned game id plus positional
/// path segments; [`name`](Self::name) and [`path`](Self::path) render the
/// operation tag and the segment string a transport needs to place the call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Create a game with the given configuration. Replies with the new id.
    Start {
        /// Timed or untimed play.
        mode: GameMode,
        /// Name of the rewrite rule set to play with.
        rule_set: String,
        /// Which starting formula to serve.
        formula_id: u32,
        /// Whether theorem creation is enabled for this game.
        use_theorem: bool,
    },
    /// Re-attach to an existing game after the client restarts.
    Resume {
        /// Server-assigned game id.
        game_id: SessionId,
    },
    /// Fetch the current proof state.
    GameState {
        /// Server-assigned game id.
        game_id: SessionId,
    },
    /// Apply a rewrite rule to a subexpression of the current formula.
    ApplyRule {
        /// Server-assigned game id.
        game_id: SessionId,
        /// Which subexpression the rule targets.
        expr_id: u32,
        /// Which rule to apply.
        rule_id: u32,
        /// Opaque application context forwarded verbatim to the engine.
        context: String,
    },
    /// Step the engine back one proof state.
    Previous {
        /// Server-assigned game id.
        game_id: SessionId,
    },
    /// Step the engine forward one proof state.
    Next {
        /// Server-assigned game id.
        game_id: SessionId,
    },
    /// Jump the engine to an arbitrary timeline index.
    Timeline {
        /// Server-assigned game id.
        game_id: SessionId,
        /// Target index.
        index: StateIndex,
    },
    /// Carve a theorem out of the inclusive timeline range `[start, end]`.
    CreateTheorem {
        /// Server-assigned game id.
        game_id: SessionId,
        /// Lower endpoint, already normalized.
        start: StateIndex,
        /// Upper endpoint, already normalized.
        end: StateIndex,
    },
    /// Fetch the rule catalog for this game's rule set.
    RulesList {
        /// Server-assigned game id.
        game_id: SessionId,
    },
    /// Delete the game server-side.
    Delete {
        /// Server-assigned game id.
        game_id: SessionId,
    },
}

impl EngineCommand {
    /// The operation tag the engine dispatches on.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "START",
            Self::Resume { .. } => "RESUME",
            Self::GameState { .. } => "GAMESTATE",
            Self::ApplyRule { .. } => "APPLYRULE",
            Self::Previous { .. } => "PREVIOUS",
            Self::Next { .. } => "NEXT",
            Self::Timeline { .. } => "TIMELINE",
            Self::CreateTheorem { .. } => "CREATETHEOREM",
            Self::RulesList { .. } => "RULESLIST",
            Self::Delete { .. } => "DELETE",
        }
    }

    /// The positional path segments for this call, leading slash included.
    ///
    /// # Example
    ///
    /// ```
    /// use proofline::{EngineCommand, GameMode};
    ///
    /// let command = EngineCommand::Start {
    ///     mode: GameMode::Normal,
    ///     rule_set: "basic".to_owned(),
    ///     formula_id: 3,
    ///     use_theorem: true,
    /// };
    /// assert_eq!(command.path(), "/NORMAL/basic/3/true");
    /// ```
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Start {
                mode,
                rule_set,
                formula_id,
                use_theorem,
            } => format!("/{mode}/{rule_set}/{formula_id}/{use_theorem}"),
            Self::Resume { game_id }
            | Self::GameState { game_id }
            | Self::Previous { game_id }
            | Self::Next { game_id }
            | Self::RulesList { game_id }
            | Self::Delete { game_id } => format!("/{game_id}"),
            Self::ApplyRule {
                game_id,
                expr_id,
                rule_id,
                context,
            } => format!("/{game_id}/{expr_id}/{rule_id}/{context}"),
            Self::Timeline { game_id, index } => format!("/{game_id}/{index}"),
            Self::CreateTheorem {
                game_id,
                start,
                end,
            } => format!("/{game_id}/{start}/{end}"),
        }
    }

    /// The game this command addresses, if it targets an existing one.
    ///
    /// `Start` is the only command placed before a game exists.
    #[must_use]
    pub const fn game_id(&self) -> Option<SessionId> {
        match self {
            Self::Start { .. } => None,
            Self::Resume { game_id }
            | Self::GameState { game_id }
            | Self::ApplyRule { game_id, .. }
            | Self::Previous { game_id }
            | Self::Next { game_id }
            | Self::Timeline { game_id, .. }
            | Self::CreateTheorem { game_id, .. }
            | Self::RulesList { game_id }
            | Self::Delete { game_id } => Some(*game_id),
        }
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.name(), self.path())
    }
}

/// One request on the wire: a command plus the token its reply must echo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRequest {
    /// Correlation token, echoed by the reply.
    pub token: RequestToken,
    /// The call itself.
    pub command: EngineCommand,
}

impl EngineRequest {
    /// Pairs a command with its correlation token.
    #[must_use]
    pub const fn new(token: RequestToken, command: EngineCommand) -> Self {
        EngineRequest { token, command }
    }
}

// ###################
// # UNIT TESTS      #
// ###################
