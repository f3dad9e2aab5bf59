//! Bounded retry enforcement for rollback-retry recovery.
//!
//! Every recoverable failure is checked against a set of rules before the
//! engine rolls back and tries again. Checks run through stillwater's
//! `Validation`, so a refused retry reports every violated rule at once
//! rather than the first one found.
//!
//! # Example
//!
//! ```rust
//! use tradefsm::enforcement::{EnforcementBuilder, EnforcementRules, ViolationStrategy};
//! use std::time::Duration;
//!
//! # use tradefsm::core::State;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
//! # enum Leg { Open, Closed }
//! # impl State for Leg {
//! #     fn name(&self) -> &str { "Leg" }
//! # }
//!
//! let rules: EnforcementRules<Leg> = EnforcementBuilder::new()
//!     .max_attempts(3)
//!     .retry_window(Duration::from_secs(30))
//!     .on_violation(ViolationStrategy::Abort)
//!     .build();
//! ```

pub mod builder;
pub mod context;
pub mod rules;
pub mod violations;

pub use builder::EnforcementBuilder;
pub use context::TransitionContext;
pub use rules::EnforcementRules;
pub use violations::{ViolationError, ViolationStrategy};
