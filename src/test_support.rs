use proptest::prelude::*;

use crate::modifier::{
    ComparePoint, ExplodeSpec, FailureSpec, KeepDropMode, KeepDropSide, KeepDropSpec, ModifierSet,
    RerollSpec, SortDirection, SortSpec, SuccessSpec,
};
use crate::random::RandomSource;

/// Scripted source returning a fixed sequence of values. Panics if the
/// script runs dry or a scripted value falls outside the requested
/// bounds, so a test's expectations and its script cannot drift apart.
pub(crate) struct SequenceSource {
    values: Vec<i64>,
    next: usize,
}

impl SequenceSource {
    pub(crate) fn new(values: &[i64]) -> Self {
        Self {
            values: values.to_vec(),
            next: 0,
        }
    }
}

impl RandomSource for SequenceSource {
    fn random_int(&mut self, max: i64, min: i64) -> i64 {
        let value = *self
            .values
            .get(self.next)
            .unwrap_or_else(|| panic!("scripted source exhausted after {} draws", self.next));
        assert!(
            (min..=max).contains(&value),
            "scripted value {value} outside [{min}, {max}]"
        );
        self.next += 1;
        value
    }
}

/// Source that always returns the same value.
pub(crate) struct ConstSource(pub i64);

impl RandomSource for ConstSource {
    fn random_int(&mut self, max: i64, min: i64) -> i64 {
        assert!((min..=max).contains(&self.0));
        self.0
    }
}

pub(crate) fn compare_point_strategy() -> impl Strategy<Value = ComparePoint> {
    prop_oneof![
        Just(ComparePoint::LessOrEqual),
        Just(ComparePoint::Equal),
        Just(ComparePoint::GreaterOrEqual),
    ]
}

/// A parseable trigger spec: an absent threshold always pairs with the
/// default `=` comparator, as a bare token never records one.
pub(crate) fn trigger_strategy() -> impl Strategy<Value = ExplodeSpec> {
    prop::option::of((compare_point_strategy(), 1i64..=50)).prop_map(|body| match body {
        Some((compare, n)) => ExplodeSpec {
            compare,
            threshold: Some(n),
        },
        None => ExplodeSpec {
            compare: ComparePoint::Equal,
            threshold: None,
        },
    })
}

pub(crate) fn keep_drop_strategy() -> impl Strategy<Value = KeepDropSpec> {
    (any::<bool>(), any::<bool>(), 0i64..=10).prop_map(|(keep, highest, count)| KeepDropSpec {
        mode: if keep {
            KeepDropMode::Keep
        } else {
            KeepDropMode::Drop
        },
        side: if highest {
            KeepDropSide::Highest
        } else {
            KeepDropSide::Lowest
        },
        count,
    })
}

pub(crate) fn reroll_strategy() -> impl Strategy<Value = RerollSpec> {
    (
        prop::option::of((compare_point_strategy(), 1i64..=20)),
        any::<bool>(),
    )
        .prop_map(|(body, only_once)| match body {
            Some((compare, n)) => RerollSpec {
                compare,
                threshold: Some(n),
                only_once,
            },
            None => RerollSpec {
                compare: ComparePoint::Equal,
                threshold: None,
                only_once,
            },
        })
}

pub(crate) fn success_strategy() -> impl Strategy<Value = SuccessSpec> {
    (
        compare_point_strategy(),
        1i64..=20,
        prop::option::of((compare_point_strategy(), 1i64..=20)),
    )
        .prop_map(|(compare, threshold, failure)| SuccessSpec {
            compare,
            threshold,
            failure: failure.map(|(compare, threshold)| FailureSpec { compare, threshold }),
        })
}

pub(crate) fn sort_strategy() -> impl Strategy<Value = SortSpec> {
    any::<bool>().prop_map(|ascending| SortSpec {
        direction: if ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        },
    })
}

pub(crate) fn modifier_set_strategy() -> impl Strategy<Value = ModifierSet> {
    (
        prop::option::of(trigger_strategy()),
        prop::option::of(trigger_strategy()),
        prop::option::of(trigger_strategy()),
        prop::option::of(keep_drop_strategy()),
        prop::collection::vec(reroll_strategy(), 0..3),
        prop::option::of(success_strategy()),
        prop::option::of(sort_strategy()),
    )
        .prop_map(
            |(exploding, compounding, penetrating, keep_drop, rerolls, success, sort)| {
                // identical (compare, threshold) pairs are a parse conflict
                let mut deduped: Vec<RerollSpec> = Vec::new();
                for reroll in rerolls {
                    if !deduped
                        .iter()
                        .any(|r| r.compare == reroll.compare && r.threshold == reroll.threshold)
                    {
                        deduped.push(reroll);
                    }
                }
                ModifierSet {
                    exploding,
                    compounding,
                    penetrating,
                    keep_drop,
                    rerolls: deduped,
                    success,
                    sort,
                }
            },
        )
}
