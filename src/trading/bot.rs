//! The trade bot: a fixed transition table over a [`PositionDesk`].
//!
//! | trigger | source | dest | guard | before |
//! |---|---|---|---|---|
//! | `OpenPosition` | Initial | Open | | `open_position` |
//! | `ClosePositionAtProfitTarget` | Open | Closed | `close_for_profit` | `close_position_for_profit` |
//! | `ClosePositionAtStopLoss` | Open | Closed | `close_for_stop_loss` | `close_position_for_stop_loss` |
//!
//! `Open` runs `save` then `monitor_position` on entry; `Closed` runs
//! `save` then `cleanup_position`. A closing order that fails to fill
//! rolls the bot back to `Open` with both exit flags cleared.

use crate::builder::{BuildError, StateMachineBuilder, TransitionBuilder};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::BotConfig;
use crate::core::{Action, ActionError, State, TransitionEvent};
use crate::engine::{Agent, Driver, Engine, Recovery};
use crate::enforcement::EnforcementRules;
use crate::trading::context::TradeContext;
use crate::trading::desk::{ExitSignal, PositionDesk};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

crate::state_enum! {
    /// Lifecycle of one position.
    pub enum PositionState {
        Initial,
        Open,
        Closed,
    }
    final: [Closed]
}

pub const OPEN_POSITION: &str = "OpenPosition";
pub const CLOSE_AT_PROFIT_TARGET: &str = "ClosePositionAtProfitTarget";
pub const CLOSE_AT_STOP_LOSS: &str = "ClosePositionAtStopLoss";

pub type TradeBot = Agent<PositionState, TradeContext>;
pub type TradeStore = Arc<dyn CheckpointStore<PositionState, TradeContext>>;
type TradeAction = Action<PositionState, TradeContext>;

/// Collaborators and limits needed to assemble a trade bot engine.
pub struct TradeBotParts {
    pub agent_id: String,
    pub desk: Arc<dyn PositionDesk>,
    pub store: TradeStore,
    pub retry_rules: Option<EnforcementRules<PositionState>>,
    pub action_deadline: Option<Duration>,
}

/// Build the engine for the trade bot table.
pub fn trade_bot_engine(
    parts: TradeBotParts,
) -> Result<Engine<PositionState, TradeContext>, BuildError> {
    let TradeBotParts {
        agent_id,
        desk,
        store,
        retry_rules,
        action_deadline,
    } = parts;

    let mut recovery = Recovery::new().rearm(TradeContext::reset_exit_flags);
    if let Some(rules) = retry_rules {
        recovery = recovery.rules(rules);
    }

    let save = save_action(agent_id, store);

    StateMachineBuilder::new()
        .initial(PositionState::Initial)
        .state(
            PositionState::Open,
            vec![save.clone(), monitor_action(Arc::clone(&desk))],
        )
        .state(
            PositionState::Closed,
            vec![save, cleanup_action(Arc::clone(&desk))],
        )
        .recovery(recovery)
        .action_deadline(action_deadline)
        .transition(
            TransitionBuilder::new()
                .trigger(OPEN_POSITION)
                .from(PositionState::Initial)
                .to(PositionState::Open)
                .before(open_action(Arc::clone(&desk))),
        )?
        .transition(
            TransitionBuilder::new()
                .trigger(CLOSE_AT_PROFIT_TARGET)
                .from(PositionState::Open)
                .to(PositionState::Closed)
                .when("close_for_profit", |ctx: &TradeContext| ctx.close_for_profit)
                .before(close_action(
                    "close_position_for_profit",
                    ExitSignal::ProfitTarget,
                    Arc::clone(&desk),
                )),
        )?
        .transition(
            TransitionBuilder::new()
                .trigger(CLOSE_AT_STOP_LOSS)
                .from(PositionState::Open)
                .to(PositionState::Closed)
                .when("close_for_stop_loss", |ctx: &TradeContext| {
                    ctx.close_for_stop_loss
                })
                .before(close_action(
                    "close_position_for_stop_loss",
                    ExitSignal::StopLoss,
                    desk,
                )),
        )?
        .build()
}

/// Assemble a ready-to-run bot from configuration and collaborators.
pub fn build_trade_bot(
    config: &BotConfig,
    desk: Arc<dyn PositionDesk>,
    store: TradeStore,
) -> Result<TradeBot, BuildError> {
    let engine = trade_bot_engine(TradeBotParts {
        agent_id: config.agent_id.clone(),
        desk,
        store,
        retry_rules: Some(config.retry.enforcement_rules()),
        action_deadline: config.run.action_deadline(),
    })?;
    let context = TradeContext::new(config.strategy)
        .with_forced_fill_failure(config.simulate_order_fill_failure);
    let driver = Driver::new(config.run.run_options());

    Ok(Agent::new(config.agent_id.clone(), engine, context, driver))
}

fn save_action(agent_id: String, store: TradeStore) -> TradeAction {
    Action::new(
        "save",
        move |ctx: &mut TradeContext, event: &TransitionEvent<PositionState>| {
            let checkpoint =
                Checkpoint::capture(&agent_id, event.dest, ctx.clone(), &event.trigger);
            store
                .save(&checkpoint)
                .map_err(|e| ActionError::unclassified(format!("persisting bot failed: {e}")))?;
            info!(%agent_id, state = event.dest.name(), "saved state");
            Ok(())
        },
    )
}

fn open_action(desk: Arc<dyn PositionDesk>) -> TradeAction {
    Action::new(
        "open_position",
        move |ctx: &mut TradeContext, _: &TransitionEvent<PositionState>| {
            info!(
                target_delta = ctx.params().target_delta,
                target_dte = ctx.params().target_dte,
                "opening a position"
            );
            desk.open_position(ctx)
        },
    )
}

fn monitor_action(desk: Arc<dyn PositionDesk>) -> TradeAction {
    Action::new(
        "monitor_position",
        move |ctx: &mut TradeContext, _: &TransitionEvent<PositionState>| {
            info!("monitoring the position");
            match desk.watch_for_exit(ctx)? {
                ExitSignal::ProfitTarget => ctx.close_for_profit = true,
                ExitSignal::StopLoss => ctx.close_for_stop_loss = true,
            }
            Ok(())
        },
    )
}

fn close_action(
    name: &'static str,
    reason: ExitSignal,
    desk: Arc<dyn PositionDesk>,
) -> TradeAction {
    Action::new(
        name,
        move |ctx: &mut TradeContext, _: &TransitionEvent<PositionState>| {
            info!(?reason, "attempting to close the position");
            if ctx.take_fill_failure() {
                warn!(?reason, "closing order did not fill");
                return Err(ActionError::business("closing order did not fill"));
            }
            desk.close_position(ctx, reason)?;
            info!(?reason, "position closed");
            Ok(())
        },
    )
}

fn cleanup_action(desk: Arc<dyn PositionDesk>) -> TradeAction {
    Action::new(
        "cleanup_position",
        move |ctx: &mut TradeContext, _: &TransitionEvent<PositionState>| {
            info!("cleaning up the position");
            desk.cleanup_position(ctx)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryStore;
    use crate::engine::FireOutcome;
    use crate::trading::context::StrategyParams;
    use crate::trading::desk::{ExitPlan, SimulatedDesk};

    fn engine(exits: ExitPlan) -> Engine<PositionState, TradeContext> {
        trade_bot_engine(TradeBotParts {
            agent_id: "unit".to_string(),
            desk: Arc::new(SimulatedDesk::new(Duration::ZERO, exits)),
            store: Arc::new(MemoryStore::new()),
            retry_rules: None,
            action_deadline: None,
        })
        .unwrap()
    }

    #[test]
    fn table_declares_triggers_in_order() {
        let engine = engine(ExitPlan::Random);

        assert_eq!(engine.valid_triggers(&PositionState::Initial), vec![OPEN_POSITION]);
        assert_eq!(
            engine.valid_triggers(&PositionState::Open),
            vec![CLOSE_AT_PROFIT_TARGET, CLOSE_AT_STOP_LOSS]
        );
        assert!(engine.valid_triggers(&PositionState::Closed).is_empty());
        assert!(PositionState::Closed.is_final());
    }

    #[test]
    fn opening_runs_monitor_and_raises_an_exit_flag() {
        let mut engine = engine(ExitPlan::scripted([ExitSignal::StopLoss]));
        let mut ctx = TradeContext::new(StrategyParams::default());

        let outcome = engine.fire(OPEN_POSITION, &mut ctx).unwrap();

        assert!(outcome.is_committed());
        assert_eq!(engine.current_state(), &PositionState::Open);
        assert!(ctx.close_for_stop_loss);
        assert!(!ctx.close_for_profit);
    }

    #[test]
    fn unfilled_close_rolls_back_and_rearms() {
        let mut engine = engine(ExitPlan::scripted([ExitSignal::ProfitTarget, ExitSignal::StopLoss]));
        let mut ctx = TradeContext::new(StrategyParams::default()).with_forced_fill_failure(true);
        engine.fire(OPEN_POSITION, &mut ctx).unwrap();

        let outcome = engine.fire(CLOSE_AT_PROFIT_TARGET, &mut ctx).unwrap();

        assert_eq!(
            outcome,
            FireOutcome::RolledBack {
                source: PositionState::Open,
                attempt: 1
            }
        );
        // Re-entering Open ran the monitor again, which reported a stop loss.
        assert!(!ctx.close_for_profit);
        assert!(ctx.close_for_stop_loss);
        assert!(!ctx.order_fill_failed);
    }

    #[test]
    fn default_config_builds_a_bot_in_initial_state() {
        let desk = Arc::new(SimulatedDesk::new(Duration::ZERO, ExitPlan::Random));
        let bot = build_trade_bot(&BotConfig::default(), desk, Arc::new(MemoryStore::new())).unwrap();

        assert_eq!(bot.id(), "trade-bot");
        assert_eq!(bot.state(), &PositionState::Initial);
        assert!(bot.context().order_fill_failed);
    }
}
