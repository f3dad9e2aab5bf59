//! Run loop that drives an engine to a terminal state.

use crate::core::State;
use crate::engine::machine::{Engine, EngineError, FireOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag checked between loop iterations.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Limits applied to a single run.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub max_iterations: Option<usize>,
    pub deadline: Option<Duration>,
    /// Sleep between iterations in which no trigger committed or rolled back.
    pub idle_backoff: Duration,
}

/// Counters describing a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport<S: State> {
    pub final_state: S,
    pub iterations: usize,
    pub fire_calls: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("run cancelled in state '{state}'")]
    Cancelled { state: String },

    #[error("run deadline of {deadline:?} exceeded in state '{state}'")]
    DeadlineExceeded { deadline: Duration, state: String },

    #[error("no terminal state after {iterations} iterations (stuck in '{state}')")]
    IterationLimit { iterations: usize, state: String },
}

/// Repeatedly fires the valid triggers of the current state, in
/// declaration order, until the engine reaches a terminal state.
#[derive(Clone, Debug, Default)]
pub struct Driver {
    options: RunOptions,
    cancel: CancelToken,
}

impl Driver {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run<S: State, C>(
        &self,
        engine: &mut Engine<S, C>,
        context: &mut C,
    ) -> Result<RunReport<S>, RunError> {
        let started = Instant::now();
        let mut report = RunReport {
            final_state: engine.current_state().clone(),
            iterations: 0,
            fire_calls: 0,
            commits: 0,
            rollbacks: 0,
        };

        while !engine.is_final() {
            self.check_limits(engine.current_state(), started, report.iterations)?;
            report.iterations += 1;

            let triggers: Vec<String> = engine
                .valid_triggers(engine.current_state())
                .into_iter()
                .map(str::to_string)
                .collect();

            let mut progressed = false;
            for trigger in &triggers {
                report.fire_calls += 1;
                match engine.fire(trigger, context)? {
                    FireOutcome::Committed { .. } => {
                        report.commits += 1;
                        progressed = true;
                        break;
                    }
                    FireOutcome::RolledBack { .. } => {
                        report.rollbacks += 1;
                        progressed = true;
                    }
                    FireOutcome::NotEligible(reason) => {
                        debug!(%trigger, ?reason, "trigger not eligible");
                    }
                }
            }

            if !progressed && !self.options.idle_backoff.is_zero() {
                std::thread::sleep(self.options.idle_backoff);
            }
        }

        report.final_state = engine.current_state().clone();
        info!(
            state = report.final_state.name(),
            iterations = report.iterations,
            commits = report.commits,
            rollbacks = report.rollbacks,
            "run finished"
        );
        Ok(report)
    }

    fn check_limits<S: State>(
        &self,
        state: &S,
        started: Instant,
        iterations: usize,
    ) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            warn!(state = state.name(), "run cancelled");
            return Err(RunError::Cancelled {
                state: state.name().to_string(),
            });
        }
        if let Some(deadline) = self.options.deadline {
            if started.elapsed() > deadline {
                warn!(state = state.name(), ?deadline, "run deadline exceeded");
                return Err(RunError::DeadlineExceeded {
                    deadline,
                    state: state.name().to_string(),
                });
            }
        }
        if let Some(max) = self.options.max_iterations {
            if iterations >= max {
                warn!(state = state.name(), iterations, "iteration limit reached");
                return Err(RunError::IterationLimit {
                    iterations,
                    state: state.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateMachineBuilder, TransitionBuilder};
    use crate::core::ActionError;

    crate::state_enum! {
        enum Leg {
            Flat,
            Open,
            Closed,
        }
        final: [Closed]
    }

    #[derive(Default)]
    struct Signals {
        exit: bool,
        no_fill_once: bool,
        fired: Vec<String>,
    }

    fn engine() -> Engine<Leg, Signals> {
        let exit_via = |trigger: &'static str| {
            TransitionBuilder::new()
                .trigger(trigger)
                .from(Leg::Open)
                .to(Leg::Closed)
                .when("exit", |s: &Signals| s.exit)
                .before_fn(trigger, move |s: &mut Signals, _| {
                    s.fired.push(trigger.to_string());
                    if s.no_fill_once {
                        s.no_fill_once = false;
                        return Err(ActionError::business("no fill"));
                    }
                    Ok(())
                })
        };

        StateMachineBuilder::new()
            .initial(Leg::Flat)
            .transition(
                TransitionBuilder::new()
                    .trigger("Open")
                    .from(Leg::Flat)
                    .to(Leg::Open),
            )
            .and_then(|b| b.transition(exit_via("ExitA")))
            .and_then(|b| b.transition(exit_via("ExitB")))
            .and_then(|b| b.build())
            .unwrap()
    }

    #[test]
    fn terminal_state_performs_no_fires() {
        let mut engine = engine();
        let mut signals = Signals {
            exit: true,
            ..Default::default()
        };
        engine.restore(Leg::Closed).unwrap();

        let report = Driver::default().run(&mut engine, &mut signals).unwrap();

        assert_eq!(report.fire_calls, 0);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.final_state, Leg::Closed);
    }

    #[test]
    fn first_eligible_trigger_wins() {
        let mut engine = engine();
        let mut signals = Signals {
            exit: true,
            ..Default::default()
        };

        let report = Driver::default().run(&mut engine, &mut signals).unwrap();

        assert_eq!(report.final_state, Leg::Closed);
        assert_eq!(report.commits, 2);
        assert_eq!(report.iterations, 2);
        assert_eq!(signals.fired, vec!["ExitA"]);
    }

    #[test]
    fn rollback_moves_on_to_next_trigger() {
        let mut engine = engine();
        let mut signals = Signals {
            exit: true,
            no_fill_once: true,
            ..Default::default()
        };
        engine.restore(Leg::Open).unwrap();

        let mut calls = 0;
        let outcome = loop {
            calls += 1;
            let trigger = if calls == 1 { "ExitA" } else { "ExitB" };
            match engine.fire(trigger, &mut signals).unwrap() {
                FireOutcome::RolledBack { .. } => continue,
                other => break other,
            }
        };

        // No rearm hook is configured, so the exit flag survives the rollback.
        assert!(outcome.is_committed());
        assert_eq!(signals.fired, vec!["ExitA", "ExitB"]);

        let mut engine = self::engine();
        let mut signals = Signals {
            exit: true,
            no_fill_once: true,
            ..Default::default()
        };
        engine.restore(Leg::Open).unwrap();
        let report = Driver::default().run(&mut engine, &mut signals).unwrap();

        assert_eq!(report.rollbacks, 1);
        assert_eq!(report.commits, 1);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.fire_calls, 2);
        assert_eq!(signals.fired, vec!["ExitA", "ExitB"]);
    }

    #[test]
    fn stuck_machine_hits_iteration_limit() {
        let mut engine = engine();
        let mut signals = Signals::default();
        let driver = Driver::new(RunOptions {
            max_iterations: Some(3),
            ..Default::default()
        });

        let err = driver.run(&mut engine, &mut signals).unwrap_err();

        assert!(matches!(err, RunError::IterationLimit { iterations: 3, ref state } if state == "Open"));
    }

    #[test]
    fn cancelled_run_stops_before_firing() {
        let mut engine = engine();
        let mut signals = Signals::default();
        let driver = Driver::default();
        driver.cancel_token().cancel();

        let err = driver.run(&mut engine, &mut signals).unwrap_err();

        assert!(matches!(err, RunError::Cancelled { ref state } if state == "Flat"));
        assert_eq!(engine.current_state(), &Leg::Flat);
    }

    #[test]
    fn deadline_stops_a_stuck_run() {
        let mut engine = engine();
        let mut signals = Signals::default();
        let driver = Driver::new(RunOptions {
            deadline: Some(Duration::from_millis(5)),
            idle_backoff: Duration::from_millis(1),
            ..Default::default()
        });

        let err = driver.run(&mut engine, &mut signals).unwrap_err();

        assert!(matches!(err, RunError::DeadlineExceeded { .. }));
    }

    #[test]
    fn cancel_from_another_thread_stops_a_stuck_run() {
        let mut engine = engine();
        let mut signals = Signals::default();
        let driver = Driver::new(RunOptions {
            idle_backoff: Duration::from_millis(1),
            ..Default::default()
        });
        let token = driver.cancel_token();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        let err = driver.run(&mut engine, &mut signals).unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, RunError::Cancelled { ref state } if state == "Open"));
        assert!(signals.fired.is_empty());
    }
}
