mod engine;
mod parse;
mod set;

pub use set::{
    ComparePoint, ExplodeSpec, FailureSpec, KeepDropMode, KeepDropSide, KeepDropSpec, ModifierSet,
    RerollSpec, SortDirection, SortSpec, SuccessSpec,
};

pub(crate) use engine::DieBounds;
pub(crate) use parse::{parse_notation, Faces};
