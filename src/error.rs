use crate::MAX_SAFE_INT;

/// Errors produced while parsing dice notation or evaluating a roll.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The notation did not match `[count]d(faces|F)[modifiers]`.
    #[error("\"{0}\" is not a valid dice expression")]
    Expression(String),

    /// Part of the modifier suffix matched no modifier category.
    #[error("\"{input}\" is not a valid modifier: \"{rest}\" could not be parsed")]
    Modifier {
        /// The modifier suffix as given.
        input: String,
        /// The part that no category pass consumed.
        rest: String,
    },

    /// A numeric parameter fell outside its allowed range.
    #[error("the value of {name} must be between {min} and {max} inclusive (got {value})", max = MAX_SAFE_INT)]
    Range {
        /// Which parameter was out of range (`n`, `d`, `count`, `threshold`).
        name: &'static str,
        /// The lower bound for this parameter in this context.
        min: i64,
        /// The offending value, kept textual so overlong digit runs survive.
        value: String,
    },

    /// A modifier category was set twice, or an identical reroll repeated.
    #[error("{category} already set as \"{existing}\" but parsed \"{token}\" as well")]
    Conflict {
        /// The modifier category that was duplicated.
        category: &'static str,
        /// Canonical form of the spec already recorded.
        existing: String,
        /// The token that attempted to set it again.
        token: String,
    },

    /// A roll chain would grow without bound.
    #[error("unbounded roll aborted: {0}")]
    Overflow(&'static str),
}
