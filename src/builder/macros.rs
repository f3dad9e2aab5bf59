//! Macros for declaring state enums.

/// Generate a state enum and its `State` implementation.
///
/// # Example
///
/// ```
/// use tradefsm::state_enum;
/// use tradefsm::core::State;
///
/// state_enum! {
///     pub enum OrderState {
///         Working,
///         Filled,
///         Cancelled,
///     }
///     final: [Filled, Cancelled]
/// }
///
/// assert_eq!(OrderState::Working.name(), "Working");
/// assert!(OrderState::Cancelled.is_final());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }
        }
    };
}
