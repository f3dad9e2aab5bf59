//! Guard predicates gating transitions.
//!
//! A guard is a pure, named read of the agent context. The engine only
//! commits a guarded transition while its guard holds.

use std::fmt;
use std::sync::Arc;

/// Named predicate over a context value.
///
/// # Example
///
/// ```rust
/// use tradefsm::core::Guard;
///
/// struct Flags {
///     take_profit: bool,
/// }
///
/// let guard = Guard::named("take_profit", |f: &Flags| f.take_profit);
///
/// assert_eq!(guard.name(), "take_profit");
/// assert!(guard.check(&Flags { take_profit: true }));
/// assert!(!guard.check(&Flags { take_profit: false }));
/// ```
pub struct Guard<C> {
    name: String,
    predicate: Arc<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<C> Guard<C> {
    /// Create an anonymous guard. It is logged as `"guard"`.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self::named("guard", predicate)
    }

    /// Create a guard with a name used in log records and outcomes.
    pub fn named<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Guard {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the predicate. Must not have side effects.
    pub fn check(&self, context: &C) -> bool {
        (self.predicate)(context)
    }
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("name", &self.name).finish()
    }
}
