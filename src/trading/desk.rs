//! The order desk collaborator and a simulated implementation.

use crate::core::ActionError;
use crate::trading::context::TradeContext;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

/// Exit condition detected while monitoring an open position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignal {
    ProfitTarget,
    StopLoss,
}

/// Order placement, monitoring and bookkeeping for one position.
///
/// Implementations may block. A closing order that does not fill should
/// be reported as [`ActionError::Business`] so the bot retries.
pub trait PositionDesk: Send + Sync {
    fn open_position(&self, ctx: &TradeContext) -> Result<(), ActionError>;

    fn watch_for_exit(&self, ctx: &TradeContext) -> Result<ExitSignal, ActionError>;

    fn close_position(&self, ctx: &TradeContext, reason: ExitSignal) -> Result<(), ActionError>;

    fn cleanup_position(&self, ctx: &TradeContext) -> Result<(), ActionError>;
}

/// Where the simulated desk takes its exit signals from.
#[derive(Debug)]
pub enum ExitPlan {
    /// Profit target or stop loss with equal probability.
    Random,
    /// Signals handed out in order; profit target once exhausted.
    Scripted(Mutex<VecDeque<ExitSignal>>),
}

impl ExitPlan {
    pub fn scripted(signals: impl IntoIterator<Item = ExitSignal>) -> Self {
        Self::Scripted(Mutex::new(signals.into_iter().collect()))
    }

    fn next(&self) -> Result<ExitSignal, ActionError> {
        match self {
            Self::Random => Ok(if rand::random::<f64>() < 0.5 {
                ExitSignal::ProfitTarget
            } else {
                ExitSignal::StopLoss
            }),
            Self::Scripted(signals) => {
                let mut signals = signals
                    .lock()
                    .map_err(|_| ActionError::unclassified("exit script lock poisoned"))?;
                Ok(signals.pop_front().unwrap_or(ExitSignal::ProfitTarget))
            }
        }
    }
}

/// Desk that simulates work with a sleep and journals every call.
#[derive(Debug)]
pub struct SimulatedDesk {
    work_delay: Duration,
    exits: ExitPlan,
    journal: Mutex<Vec<String>>,
}

impl SimulatedDesk {
    pub fn new(work_delay: Duration, exits: ExitPlan) -> Self {
        Self {
            work_delay,
            exits,
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Calls made so far, oldest first.
    pub fn journal(&self) -> Vec<String> {
        self.journal
            .lock()
            .map(|journal| journal.clone())
            .unwrap_or_default()
    }

    fn work(&self, entry: impl Into<String>) {
        let entry = entry.into();
        info!(desk = "simulated", "{entry}");
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(entry);
        }
        if !self.work_delay.is_zero() {
            std::thread::sleep(self.work_delay);
        }
    }
}

impl PositionDesk for SimulatedDesk {
    fn open_position(&self, ctx: &TradeContext) -> Result<(), ActionError> {
        let params = ctx.params();
        self.work(format!(
            "open delta={} dte={}",
            params.target_delta, params.target_dte
        ));
        Ok(())
    }

    fn watch_for_exit(&self, _ctx: &TradeContext) -> Result<ExitSignal, ActionError> {
        let signal = self.exits.next()?;
        self.work(format!("monitor -> {signal:?}"));
        Ok(signal)
    }

    fn close_position(&self, _ctx: &TradeContext, reason: ExitSignal) -> Result<(), ActionError> {
        self.work(format!("close {reason:?}"));
        Ok(())
    }

    fn cleanup_position(&self, _ctx: &TradeContext) -> Result<(), ActionError> {
        self.work("cleanup");
        Ok(())
    }
}
