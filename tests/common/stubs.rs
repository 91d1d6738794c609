//! Scripted proof-engine stubs for driving a client without a real engine.
//!
//! The transport records every submitted request and plays back whatever
//! replies a test staged, so each test scripts the engine side of the
//! conversation explicitly. Traffic crosses the same JSON codec a real
//! transport would use, so a payload that does not survive the wire fails
//! the test instead of slipping through in-memory.

#![allow(dead_code, clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use proofline::engine::codec::{decode, decode_reply, encode, encode_request};
use proofline::{
    Config, EngineReply, EngineRequest, GameStatus, ProofTransport, ReplyBody, RuleCatalog,
    RuleGroup, SessionId, StateBody,
};

/// Engine payload used by the stub games: the formula as the engine renders
/// it internally plus a rewrite depth counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubMath {
    pub formula: String,
    pub depth: u32,
}

/// Builds a [`StubMath`] payload.
#[must_use]
pub fn math(formula: &str, depth: u32) -> StubMath {
    StubMath {
        formula: formula.to_owned(),
        depth,
    }
}

#[derive(Debug)]
pub struct StubConfig;

impl Config for StubConfig {
    type Math = StubMath;
}

/// What the stub engine has seen and what it will say next.
#[derive(Debug, Default)]
pub struct Script {
    /// Every request the client submitted, in order.
    pub sent: Vec<EngineRequest>,
    /// Replies handed out on the next poll, oldest first.
    pub replies: VecDeque<EngineReply<StubMath>>,
    /// How many of `sent` have been answered by `test_utils::answer_next`.
    pub answered: usize,
}

/// A transport that records requests and plays back staged replies.
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Creates the transport and the shared script handle tests drive it with.
    #[must_use]
    pub fn new() -> (Self, Arc<Mutex<Script>>) {
        let script = Arc::new(Mutex::new(Script::default()));
        (
            Self {
                script: Arc::clone(&script),
            },
            script,
        )
    }
}

impl ProofTransport<StubConfig> for ScriptedTransport {
    fn submit(&mut self, request: EngineRequest) {
        // Through the wire format and back before the stub engine sees it.
        let json = encode_request(&request).expect("request should encode");
        let request: EngineRequest = decode(&json).expect("request should decode");
        self.script.lock().sent.push(request);
    }

    fn poll_replies(&mut self) -> Vec<EngineReply<StubMath>> {
        self.script
            .lock()
            .replies
            .drain(..)
            .map(|reply| {
                let json = encode(&reply).expect("reply should encode");
                decode_reply(&json).expect("reply should decode")
            })
            .collect()
    }
}

/// A state-carrying reply body.
#[must_use]
pub fn state_reply(formula: &str, depth: u32, status: GameStatus) -> ReplyBody<StubMath> {
    ReplyBody::State(StateBody {
        text: formula.to_owned(),
        math: math(formula, depth),
        status,
    })
}

/// A game-opened reply body carrying the engine-assigned id.
#[must_use]
pub fn started_reply(id: u64) -> ReplyBody<StubMath> {
    ReplyBody::Started {
        id: SessionId::new(id),
    }
}

/// A bare acknowledgement body.
#[must_use]
pub fn ack_reply() -> ReplyBody<StubMath> {
    ReplyBody::Ack
}

/// A rule catalog reply body built from [`catalog`].
#[must_use]
pub fn rules_reply() -> ReplyBody<StubMath> {
    ReplyBody::Rules(catalog())
}

/// A small two-group rule catalog.
#[must_use]
pub fn catalog() -> RuleCatalog {
    RuleCatalog {
        groups: vec![
            RuleGroup {
                category: "commutativity".to_owned(),
                rules: vec!["p & q = q & p".to_owned(), "p | q = q | p".to_owned()],
            },
            RuleGroup {
                category: "identity".to_owned(),
                rules: vec!["p & T = p".to_owned()],
            },
        ],
    }
}

/// Stages `body` as the successful answer to the most recent request.
pub fn answer_last(script: &Arc<Mutex<Script>>, body: ReplyBody<StubMath>) {
    let mut script = script.lock();
    let token = script.sent.last().expect("no request to answer").token;
    script.replies.push_back(EngineReply::ok(token, body));
}

/// Stages an engine rejection of the most recent request.
pub fn reject_last(script: &Arc<Mutex<Script>>, message: &str) {
    let mut script = script.lock();
    let token = script.sent.last().expect("no request to reject").token;
    script
        .replies
        .push_back(EngineReply::error(token, message.to_owned()));
}

/// The operation names of every submitted request, in order.
#[must_use]
pub fn sent_operations(script: &Arc<Mutex<Script>>) -> Vec<&'static str> {
    script
        .lock()
        .sent
        .iter()
        .map(|request| request.command.name())
        .collect()
}
