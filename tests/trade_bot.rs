//! End-to-end runs of the trade bot against recording collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tradefsm::checkpoint::{Checkpoint, CheckpointError, CheckpointStore, MemoryStore};
use tradefsm::config::{BotConfig, RunConfig};
use tradefsm::engine::{EngineError, ResumeError, RunError};
use tradefsm::trading::{
    build_trade_bot, ExitPlan, ExitSignal, PositionDesk, PositionState, SimulatedDesk,
    StrategyParams, TradeContext, TradeStore, CLOSE_AT_PROFIT_TARGET,
};
use tradefsm::{ActionError, FailureKind};

type Trace = Arc<Mutex<Vec<String>>>;

fn push(trace: &Trace, entry: String) {
    trace.lock().unwrap().push(entry);
}

/// Desk that shares a trace with the store so interleaving can be checked.
struct RecordingDesk {
    trace: Trace,
    exits: ExitPlan,
    fail_open: Option<ActionError>,
    fail_monitor: Option<ActionError>,
    fail_close: Option<ActionError>,
}

impl RecordingDesk {
    fn new(trace: &Trace, exits: impl IntoIterator<Item = ExitSignal>) -> Self {
        Self {
            trace: Arc::clone(trace),
            exits: ExitPlan::scripted(exits),
            fail_open: None,
            fail_monitor: None,
            fail_close: None,
        }
    }
}

impl PositionDesk for RecordingDesk {
    fn open_position(&self, _ctx: &TradeContext) -> Result<(), ActionError> {
        push(&self.trace, "open_position".to_string());
        self.fail_open.clone().map_or(Ok(()), Err)
    }

    fn watch_for_exit(&self, _ctx: &TradeContext) -> Result<ExitSignal, ActionError> {
        if let Some(error) = self.fail_monitor.clone() {
            return Err(error);
        }
        let signal = match &self.exits {
            ExitPlan::Scripted(signals) => signals
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ExitSignal::ProfitTarget),
            ExitPlan::Random => ExitSignal::ProfitTarget,
        };
        push(&self.trace, format!("monitor_position -> {signal:?}"));
        Ok(signal)
    }

    fn close_position(&self, _ctx: &TradeContext, reason: ExitSignal) -> Result<(), ActionError> {
        push(&self.trace, format!("close_position {reason:?}"));
        self.fail_close.clone().map_or(Ok(()), Err)
    }

    fn cleanup_position(&self, _ctx: &TradeContext) -> Result<(), ActionError> {
        push(&self.trace, "cleanup_position".to_string());
        Ok(())
    }
}

struct RecordingStore {
    trace: Trace,
    inner: MemoryStore,
}

impl CheckpointStore<PositionState, TradeContext> for RecordingStore {
    fn save(
        &self,
        checkpoint: &Checkpoint<PositionState, TradeContext>,
    ) -> Result<(), CheckpointError> {
        push(&self.trace, format!("save {:?}", checkpoint.state));
        self.inner.save(checkpoint)
    }

    fn load_latest(
        &self,
        agent_id: &str,
    ) -> Result<Option<Checkpoint<PositionState, TradeContext>>, CheckpointError> {
        self.inner.load_latest(agent_id)
    }
}

fn config() -> BotConfig {
    BotConfig {
        agent_id: "bot-under-test".to_string(),
        run: RunConfig {
            max_iterations: Some(50),
            idle_backoff_ms: 0,
            ..RunConfig::default()
        },
        ..BotConfig::default()
    }
}

fn recording_store(trace: &Trace) -> Arc<RecordingStore> {
    Arc::new(RecordingStore {
        trace: Arc::clone(trace),
        inner: MemoryStore::new(),
    })
}

fn trace_of(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

#[test]
fn reference_scenario_rolls_back_once_then_closes_for_profit() {
    let trace = Trace::default();
    let desk = Arc::new(RecordingDesk::new(
        &trace,
        [ExitSignal::StopLoss, ExitSignal::ProfitTarget],
    ));
    let store = recording_store(&trace);
    let mut bot = build_trade_bot(&config(), desk, store.clone()).unwrap();

    let report = bot.run().unwrap();

    assert_eq!(report.final_state, PositionState::Closed);
    assert_eq!(report.commits, 2);
    assert_eq!(report.rollbacks, 1);
    assert_eq!(report.iterations, 3);
    assert_eq!(report.fire_calls, 4);
    assert_eq!(
        trace_of(&trace),
        vec![
            "open_position",
            "save Open",
            "monitor_position -> StopLoss",
            "save Open",
            "monitor_position -> ProfitTarget",
            "close_position ProfitTarget",
            "save Closed",
            "cleanup_position",
        ]
    );

    let ctx = bot.context();
    assert!(ctx.close_for_profit);
    assert!(!ctx.close_for_stop_loss);
    assert!(!ctx.order_fill_failed);

    let path: Vec<PositionState> = bot.engine().history().get_path().into_iter().copied().collect();
    assert_eq!(
        path,
        vec![
            PositionState::Initial,
            PositionState::Open,
            PositionState::Open,
            PositionState::Closed
        ]
    );
    assert_eq!(bot.engine().history().reentries(), 1);
    assert_eq!(store.inner.saved_count("bot-under-test"), 3);
}

#[test]
fn without_forced_failure_the_bot_closes_on_first_signal() {
    let trace = Trace::default();
    let desk = Arc::new(RecordingDesk::new(&trace, [ExitSignal::StopLoss]));
    let config = BotConfig {
        simulate_order_fill_failure: false,
        ..config()
    };
    let mut bot = build_trade_bot(&config, desk, recording_store(&trace)).unwrap();

    let report = bot.run().unwrap();

    assert_eq!(report.rollbacks, 0);
    assert_eq!(report.iterations, 2);
    assert!(trace_of(&trace).contains(&"close_position StopLoss".to_string()));
    assert!(bot.context().close_for_stop_loss);
}

#[test]
fn unclassified_open_failure_escapes_the_run() {
    let trace = Trace::default();
    let mut desk = RecordingDesk::new(&trace, []);
    desk.fail_open = Some(ActionError::unclassified("broker rejected order"));
    let mut bot = build_trade_bot(&config(), Arc::new(desk), recording_store(&trace)).unwrap();

    let err = bot.run().unwrap_err();

    match err {
        RunError::Engine(EngineError::ActionFailed { trigger, failure, .. }) => {
            assert_eq!(trigger, "OpenPosition");
            assert_eq!(failure.action, "open_position");
        }
        other => panic!("expected ActionFailed, got {other:?}"),
    }
    assert_eq!(bot.state(), &PositionState::Initial);
    assert_eq!(trace_of(&trace), vec!["open_position"]);
}

#[test]
fn monitor_failure_is_fatal_but_keeps_the_position_open() {
    let trace = Trace::default();
    let mut desk = RecordingDesk::new(&trace, []);
    desk.fail_monitor = Some(ActionError::business("quote feed stale"));
    let mut bot = build_trade_bot(&config(), Arc::new(desk), recording_store(&trace)).unwrap();

    let err = bot.run().unwrap_err();

    assert!(matches!(
        err,
        RunError::Engine(EngineError::OnEnterFailed { ref state, .. }) if state == "Open"
    ));
    assert_eq!(bot.state(), &PositionState::Open);
    assert_eq!(trace_of(&trace), vec!["open_position", "save Open"]);
}

#[test]
fn persistent_fill_failures_exhaust_the_retry_budget() {
    let trace = Trace::default();
    let mut desk = RecordingDesk::new(&trace, []);
    desk.fail_close = Some(ActionError::business("no liquidity"));
    let mut config = config();
    config.simulate_order_fill_failure = false;
    config.retry.max_attempts = 2;
    let store = recording_store(&trace);
    let mut bot = build_trade_bot(&config, Arc::new(desk), store.clone()).unwrap();

    let err = bot.run().unwrap_err();

    match &err {
        RunError::Engine(EngineError::RetriesExhausted { attempts, .. }) => {
            assert_eq!(*attempts, 3)
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(
        match err {
            RunError::Engine(e) => e.failure_kind(),
            _ => None,
        },
        Some(FailureKind::BusinessActionFailure)
    );
    assert_eq!(bot.state(), &PositionState::Open);
    // Entry plus one re-entry per permitted retry.
    assert_eq!(store.inner.saved_count("bot-under-test"), 3);
}

#[test]
fn resume_reenters_open_and_finishes() {
    let trace = Trace::default();
    let desk = Arc::new(RecordingDesk::new(&trace, [ExitSignal::StopLoss]));
    let mut bot = build_trade_bot(&config(), desk, recording_store(&trace)).unwrap();

    let saved_context = TradeContext::new(StrategyParams::default());
    let checkpoint =
        Checkpoint::capture("bot-under-test", PositionState::Open, saved_context, "OpenPosition");
    bot.resume(checkpoint).unwrap();

    assert_eq!(bot.state(), &PositionState::Open);
    assert!(bot.context().close_for_stop_loss);

    let report = bot.run().unwrap();

    assert_eq!(report.final_state, PositionState::Closed);
    assert!(!trace_of(&trace).contains(&"open_position".to_string()));
}

#[test]
fn resume_refuses_a_foreign_checkpoint() {
    let trace = Trace::default();
    let desk = Arc::new(RecordingDesk::new(&trace, []));
    let mut bot = build_trade_bot(&config(), desk, recording_store(&trace)).unwrap();

    let checkpoint = Checkpoint::capture(
        "someone-else",
        PositionState::Open,
        TradeContext::new(StrategyParams::default()),
        "OpenPosition",
    );

    assert!(matches!(
        bot.resume(checkpoint),
        Err(ResumeError::AgentMismatch { .. })
    ));
    assert_eq!(bot.state(), &PositionState::Initial);
}

#[test]
fn saving_twice_with_unchanged_context_is_idempotent() {
    let trace = Trace::default();
    let desk = Arc::new(RecordingDesk::new(&trace, []));
    let store = recording_store(&trace);
    let bot = build_trade_bot(&config(), desk, store.clone()).unwrap();
    let (mut engine, mut ctx) = bot.into_parts();
    engine.restore(PositionState::Closed).unwrap();
    let before = ctx.clone();

    engine.reenter(PositionState::Closed, &mut ctx).unwrap();
    engine.reenter(PositionState::Closed, &mut ctx).unwrap();

    let saved: Vec<Checkpoint<PositionState, TradeContext>> =
        store.inner.all("bot-under-test").unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].state, saved[1].state);
    assert_eq!(saved[0].context, saved[1].context);
    assert_eq!(saved[1].context, before);
    assert_eq!(ctx, before);
}

#[test]
fn agents_run_independently_on_threads() {
    let handles: Vec<_> = (0..3)
        .map(|n| {
            std::thread::spawn(move || {
                let desk = Arc::new(SimulatedDesk::new(Duration::ZERO, ExitPlan::Random));
                let store: TradeStore = Arc::new(MemoryStore::new());
                let config = BotConfig {
                    agent_id: format!("bot-{n}"),
                    ..config()
                };
                let mut bot = build_trade_bot(&config, desk, store).unwrap();
                bot.run().unwrap().final_state
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), PositionState::Closed);
    }
}

#[test]
fn simulated_desk_journals_the_reference_run() {
    let desk = Arc::new(SimulatedDesk::new(
        Duration::ZERO,
        ExitPlan::scripted([ExitSignal::StopLoss, ExitSignal::ProfitTarget]),
    ));
    let store = Arc::new(MemoryStore::new());
    let mut bot = build_trade_bot(&config(), desk.clone(), store.clone()).unwrap();

    bot.run().unwrap();

    assert_eq!(
        desk.journal(),
        vec![
            "open delta=0.05 dte=30",
            "monitor -> StopLoss",
            "monitor -> ProfitTarget",
            "close ProfitTarget",
            "cleanup",
        ]
    );
    let latest =
        CheckpointStore::<PositionState, TradeContext>::load_latest(&*store, "bot-under-test")
            .unwrap()
            .unwrap();
    assert_eq!(latest.state, PositionState::Closed);
    assert_eq!(latest.trigger, CLOSE_AT_PROFIT_TARGET);
}
