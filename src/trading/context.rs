//! Per-agent trading data.

use serde::{Deserialize, Serialize};

/// Strategy parameters, fixed for the life of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub target_delta: f64,
    pub target_dte: u32,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            target_delta: 0.05,
            target_dte: 30,
        }
    }
}

/// Decision flags and strategy configuration carried by one trade bot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeContext {
    pub close_for_profit: bool,
    pub close_for_stop_loss: bool,
    /// When set, the next closing order fails to fill once.
    pub order_fill_failed: bool,
    params: StrategyParams,
}

impl TradeContext {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            close_for_profit: false,
            close_for_stop_loss: false,
            order_fill_failed: false,
            params,
        }
    }

    pub fn with_forced_fill_failure(mut self, forced: bool) -> Self {
        self.order_fill_failed = forced;
        self
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Clear both exit flags; used when a close is rolled back.
    pub fn reset_exit_flags(&mut self) {
        self.close_for_profit = false;
        self.close_for_stop_loss = false;
    }

    /// Consume the one-shot fill failure, returning whether it was armed.
    pub fn take_fill_failure(&mut self) -> bool {
        std::mem::take(&mut self.order_fill_failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_strategy() {
        let params = StrategyParams::default();
        assert_eq!(params.target_delta, 0.05);
        assert_eq!(params.target_dte, 30);
    }

    #[test]
    fn fill_failure_is_one_shot() {
        let mut ctx = TradeContext::new(StrategyParams::default()).with_forced_fill_failure(true);

        assert!(ctx.take_fill_failure());
        assert!(!ctx.take_fill_failure());
        assert!(!ctx.order_fill_failed);
    }

    #[test]
    fn reset_clears_both_exit_flags() {
        let mut ctx = TradeContext::new(StrategyParams::default());
        ctx.close_for_profit = true;
        ctx.close_for_stop_loss = true;

        ctx.reset_exit_flags();

        assert!(!ctx.close_for_profit);
        assert!(!ctx.close_for_stop_loss);
    }
}
