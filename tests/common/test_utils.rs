//! Shared constants and helpers that drive whole client flows.
//!
//! Most integration tests want the same opening moves: build a client over a
//! scripted transport, open a game, have the engine confirm it and seed the
//! first proof state. The helpers here script those moves so the tests can
//! concentrate on the behavior under scrutiny.

#![allow(dead_code, clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use parking_lot::Mutex;
use web_time::{Duration, Instant};

use proofline::telemetry::ViolationObserver;
use proofline::{
    ClientBuilder, EngineCommand, EngineReply, GameClient, GameConfig, GameMode, GameStatus,
    ReplyBody, SessionHandle, SessionId,
};

use super::stubs::{
    ack_reply, answer_last, catalog, started_reply, state_reply, Script, ScriptedTransport,
    StubConfig, StubMath,
};

/// Countdown duration the scripted clients grant to timed games.
pub const GAME: Duration = Duration::from_secs(120);

/// Tick granularity the scripted clients run at.
pub const TICK: Duration = Duration::from_secs(1);

/// Routes client logs to stdout for this test process.
///
/// The subscriber is process-global, so the first caller wins and later
/// calls are no-ops. Run with `--nocapture` to see the output.
pub fn init_tracing() {
    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::DEBUG)
            .finish(),
    );
}

/// A client over a fresh scripted transport, all defaults.
#[must_use]
pub fn scripted_client() -> (GameClient<StubConfig>, Arc<Mutex<Script>>) {
    let (transport, script) = ScriptedTransport::new();
    let client = ClientBuilder::new()
        .start_client(transport)
        .expect("default builder settings must be valid");
    (client, script)
}

/// Like [`scripted_client`], with a violation observer attached.
#[must_use]
pub fn scripted_client_with(
    observer: Arc<dyn ViolationObserver>,
) -> (GameClient<StubConfig>, Arc<Mutex<Script>>) {
    let (transport, script) = ScriptedTransport::new();
    let client = ClientBuilder::new()
        .with_violation_observer(observer)
        .start_client(transport)
        .expect("default builder settings must be valid");
    (client, script)
}

/// A normal-mode configuration over the basic rule pack.
#[must_use]
pub fn timed_config() -> GameConfig {
    GameConfig::new(GameMode::Normal, "basic", 3, true)
}

/// An untimed configuration over the basic rule pack.
#[must_use]
pub fn untimed_config() -> GameConfig {
    GameConfig::new(GameMode::Untimed, "basic", 3, true)
}

/// Opens a timed game and walks it through engine confirmation: the engine
/// assigns `id`, the initial proof state lands on the timeline and the clock
/// starts at `now`. Setup events are drained.
pub fn open_game(
    client: &mut GameClient<StubConfig>,
    script: &Arc<Mutex<Script>>,
    id: u64,
    now: Instant,
) -> SessionHandle {
    open_game_with(client, script, timed_config(), id, now)
}

/// [`open_game`] with an explicit configuration.
pub fn open_game_with(
    client: &mut GameClient<StubConfig>,
    script: &Arc<Mutex<Script>>,
    config: GameConfig,
    id: u64,
    now: Instant,
) -> SessionHandle {
    let handle = client.new_game(config);
    answer_last(script, started_reply(id));
    client.poll(now);
    answer_last(script, state_reply("p | (q & r)", 0, GameStatus::InProgress));
    client.poll(now);
    client.events().for_each(drop);
    handle
}

/// Submits a rule application and feeds the replied state back in.
pub fn apply_and_answer(
    client: &mut GameClient<StubConfig>,
    script: &Arc<Mutex<Script>>,
    formula: &str,
    depth: u32,
    status: GameStatus,
    now: Instant,
) {
    client
        .apply_rule(depth, 1, "LR")
        .expect("rule application should be accepted");
    answer_last(script, state_reply(formula, depth, status));
    client.poll(now);
}

/// Answers the oldest unanswered request the way a healthy engine would.
///
/// Game-opening requests consume an id from `next_id`. Returns `false` when
/// every submitted request already has an answer staged or delivered.
pub fn answer_next(script: &Arc<Mutex<Script>>, next_id: &mut u64) -> bool {
    let mut script = script.lock();
    let Some(request) = script.sent.get(script.answered) else {
        return false;
    };
    let token = request.token;
    let body: ReplyBody<StubMath> = match &request.command {
        EngineCommand::Start { .. } => {
            let id = SessionId::new(*next_id);
            *next_id += 1;
            ReplyBody::Started { id }
        }
        EngineCommand::Resume { .. }
        | EngineCommand::CreateTheorem { .. }
        | EngineCommand::Delete { .. } => ack_reply(),
        EngineCommand::GameState { .. }
        | EngineCommand::ApplyRule { .. }
        | EngineCommand::Previous { .. }
        | EngineCommand::Next { .. }
        | EngineCommand::Timeline { .. } => state_reply("p | (q & r)", 0, GameStatus::InProgress),
        EngineCommand::RulesList { .. } => ReplyBody::Rules(catalog()),
    };
    script.replies.push_back(EngineReply::ok(token, body));
    script.answered += 1;
    true
}
