//! Options trade bot built on the engine.

mod bot;
mod context;
mod desk;

pub use bot::{
    build_trade_bot, trade_bot_engine, PositionState, TradeBot, TradeBotParts, TradeStore,
    CLOSE_AT_PROFIT_TARGET, CLOSE_AT_STOP_LOSS, OPEN_POSITION,
};
pub use context::{StrategyParams, TradeContext};
pub use desk::{ExitPlan, ExitSignal, PositionDesk, SimulatedDesk};
