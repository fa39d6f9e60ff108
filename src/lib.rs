#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]

//! Tabletop dice notation engine.
//!
//! Parses compact Roll20-style notation such as `4d6!kh3` or `8d10>7f<2`
//! into a [`Dice`] value, then evaluates it against a [`RandomSource`] to
//! produce a [`RollRecord`].
//!
//! ```
//! use pips::{Dice, ThreadRngSource};
//!
//! let mut dice = Dice::parse("4d6kh3").unwrap();
//! let total = dice.roll(&mut ThreadRngSource).unwrap();
//! assert!((3..=18).contains(&total));
//! assert_eq!(dice.rolls().len(), 3);
//! ```

#[cfg(test)]
mod test_support;

mod dice;
mod error;
mod modifier;
mod random;

pub use dice::{Dice, RollRecord};
pub use error::Error;
pub use modifier::{
    ComparePoint, ExplodeSpec, FailureSpec, KeepDropMode, KeepDropSide, KeepDropSpec, ModifierSet,
    RerollSpec, SortDirection, SortSpec, SuccessSpec,
};
pub use random::{RandomSource, ThreadRngSource};

/// The largest integer any count, face value or threshold may take,
/// equal to 2^53 - 1.
pub const MAX_SAFE_INT: i64 = 9_007_199_254_740_991;
