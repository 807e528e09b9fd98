//! Declarative macros for declaring action type enums
//!
//! An action type set is closed: every tag a store can ever see is known at
//! compile time. `action_types!` turns a list of `Variant => "NAME"` pairs into
//! a fieldless enum and implements [`ActionType`](crate::action::ActionType),
//! `Display` and `FromStr` for it.

/// Declare a closed set of action types
///
/// Each variant is paired with the stable string name used on the wire and in
/// error messages. Variants are indexed in declaration order, which is what
/// [`ActionMap`](crate::action_map::ActionMap) uses to lay out its table.
///
/// # Example
///
/// ```
/// use action_store_core::{action_types, ActionType};
///
/// action_types! {
///     /// Operations on a shopping cart
///     pub enum CartOp {
///         /// Put an item in the cart
///         AddItem => "ADD_ITEM",
///         /// Take an item out of the cart
///         RemoveItem => "REMOVE_ITEM",
///     }
/// }
///
/// assert_eq!(CartOp::RemoveItem.name(), "REMOVE_ITEM");
/// assert_eq!(CartOp::RemoveItem.index(), 1);
/// assert_eq!(CartOp::from_name("ADD_ITEM"), Some(CartOp::AddItem));
/// assert_eq!("REMOVE_ITEM".parse::<CartOp>().ok(), Some(CartOp::RemoveItem));
/// assert_eq!(CartOp::AddItem.to_string(), "ADD_ITEM");
/// ```
#[macro_export]
macro_rules! action_types {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $tag:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $crate::action::ActionType for $name {
            const ALL: &'static [Self] = &[$(Self::$variant,)+];

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }

            fn index(self) -> usize {
                self as usize
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::action::ActionType::name(*self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::ActionError;

            fn from_str(name: &str) -> ::std::result::Result<Self, Self::Err> {
                <Self as $crate::action::ActionType>::from_name(name).ok_or_else(|| {
                    $crate::error::ActionError::UnrecognisedType(name.to_string())
                })
            }
        }
    };
}
