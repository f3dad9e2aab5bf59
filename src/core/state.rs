//! The `State` trait implemented by every machine state.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for state machine states.
///
/// A state is a plain value. The engine keys its transition table and
/// on-enter hooks by [`State::name`], so names must be unique within a
/// machine. States are serializable so that checkpoints can record where
/// an agent stopped.
///
/// # Example
///
/// ```rust
/// use tradefsm::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Lifecycle {
///     Flat,
///     Holding,
///     Done,
/// }
///
/// impl State for Lifecycle {
///     fn name(&self) -> &str {
///         match self {
///             Self::Flat => "Flat",
///             Self::Holding => "Holding",
///             Self::Done => "Done",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Done)
///     }
/// }
///
/// assert_eq!(Lifecycle::Holding.name(), "Holding");
/// assert!(Lifecycle::Done.is_final());
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Identifier used for table lookups and log fields.
    fn name(&self) -> &str;

    /// Terminal states end the run loop and may not have outgoing transitions.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }
}
