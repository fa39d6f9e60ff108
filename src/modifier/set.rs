use std::fmt::{self, Display};

/// An inclusive threshold test used by every conditional modifier.
///
/// The display glyphs `<`, `=` and `>` are the historical notation
/// tokens; the tests themselves are inclusive, so `<3` matches any value
/// less than *or equal to* 3 and `>5` any value greater than or equal
/// to 5.
///
/// ```
/// use pips::ComparePoint;
///
/// assert!(ComparePoint::LessOrEqual.matches(3, 3));
/// assert!(ComparePoint::GreaterOrEqual.matches(5, 6));
/// assert!(!ComparePoint::Equal.matches(4, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComparePoint {
    /// Matches values less than or equal to the threshold (`<`).
    LessOrEqual,
    /// Matches values equal to the threshold (`=`).
    Equal,
    /// Matches values greater than or equal to the threshold (`>`).
    GreaterOrEqual,
}

impl ComparePoint {
    /// Tests `value` against `threshold` with this comparison.
    pub fn matches(self, threshold: i64, value: i64) -> bool {
        match self {
            ComparePoint::LessOrEqual => value <= threshold,
            ComparePoint::Equal => value == threshold,
            ComparePoint::GreaterOrEqual => value >= threshold,
        }
    }

    pub(crate) fn describe(self, threshold: i64) -> String {
        match self {
            ComparePoint::LessOrEqual => format!("at most {threshold}"),
            ComparePoint::Equal => format!("exactly {threshold}"),
            ComparePoint::GreaterOrEqual => format!("at least {threshold}"),
        }
    }
}

impl Display for ComparePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let glyph = match self {
            ComparePoint::LessOrEqual => '<',
            ComparePoint::Equal => '=',
            ComparePoint::GreaterOrEqual => '>',
        };
        write!(f, "{glyph}")
    }
}

/// Trigger condition shared by the explode, compound and penetrate
/// categories.
///
/// `threshold` of `None` means "the die's maximum face value", resolved
/// against the die at evaluation time rather than at parse time. A spec
/// with no threshold always carries [`ComparePoint::Equal`]; a bare `!`
/// token never records a comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplodeSpec {
    /// How a rolled value is compared against the threshold.
    pub(crate) compare: ComparePoint,
    /// Explicit trigger threshold, or `None` for the die's maximum.
    pub(crate) threshold: Option<i64>,
}

impl ExplodeSpec {
    /// The comparison applied to each rolled value.
    pub fn compare(&self) -> ComparePoint {
        self.compare
    }

    /// The explicit threshold, or `None` for "the die's maximum face".
    pub fn threshold(&self) -> Option<i64> {
        self.threshold
    }

    /// Canonical `[cmp][digits]` tail shared by the `!`-family tokens.
    pub(crate) fn body(&self) -> String {
        match self.threshold {
            Some(n) => format!("{}{}", self.compare, n),
            None => String::new(),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self.threshold {
            Some(n) => self.compare.describe(n),
            None => "the maximum value".into(),
        }
    }
}

/// Whether a [`KeepDropSpec`] keeps or drops dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeepDropMode {
    /// Retain `count` dice, discard the rest.
    Keep,
    /// Discard `count` dice, retain the rest.
    Drop,
}

/// Which end of the sorted sequence a [`KeepDropSpec`] acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeepDropSide {
    /// The lowest values.
    Lowest,
    /// The highest values.
    Highest,
}

/// Keep or drop the highest or lowest `count` dice of the final
/// sequence. When the side token is omitted in notation, keep defaults
/// to highest and drop to lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeepDropSpec {
    pub(crate) mode: KeepDropMode,
    pub(crate) side: KeepDropSide,
    pub(crate) count: i64,
}

impl KeepDropSpec {
    /// Keep or drop.
    pub fn mode(&self) -> KeepDropMode {
        self.mode
    }

    /// Highest or lowest.
    pub fn side(&self) -> KeepDropSide {
        self.side
    }

    /// How many dice the rule applies to.
    pub fn count(&self) -> i64 {
        self.count
    }
}

impl Display for KeepDropSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            KeepDropMode::Keep => 'k',
            KeepDropMode::Drop => 'd',
        };
        let side = match self.side {
            KeepDropSide::Highest => 'h',
            KeepDropSide::Lowest => 'l',
        };
        write!(f, "{mode}{side}{}", self.count)
    }
}

/// Discard a value matching the condition and draw a replacement.
///
/// `threshold` of `None` means "the die's minimum roll value", resolved
/// at evaluation time. `only_once` limits the rule to a single
/// replacement per die.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RerollSpec {
    pub(crate) compare: ComparePoint,
    pub(crate) threshold: Option<i64>,
    pub(crate) only_once: bool,
}

impl RerollSpec {
    /// The comparison applied to each rolled value.
    pub fn compare(&self) -> ComparePoint {
        self.compare
    }

    /// The explicit threshold, or `None` for "the die's minimum roll".
    pub fn threshold(&self) -> Option<i64> {
        self.threshold
    }

    /// Whether the rule rerolls at most once per die.
    pub fn only_once(&self) -> bool {
        self.only_once
    }

    pub(crate) fn describe(&self) -> String {
        let condition = match self.threshold {
            Some(n) => self.compare.describe(n),
            None => "the minimum value".into(),
        };
        if self.only_once {
            format!("Reroll dice showing {condition}, at most once per die.")
        } else {
            format!("Reroll dice showing {condition}.")
        }
    }
}

impl Display for RerollSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r")?;
        if self.only_once {
            write!(f, "o")?;
        }
        if let Some(n) = self.threshold {
            write!(f, "{}{}", self.compare, n)?;
        }
        Ok(())
    }
}

/// The failure half of a [`SuccessSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailureSpec {
    pub(crate) compare: ComparePoint,
    pub(crate) threshold: i64,
}

impl FailureSpec {
    /// The comparison applied to each surviving value.
    pub fn compare(&self) -> ComparePoint {
        self.compare
    }

    /// The failure threshold.
    pub fn threshold(&self) -> i64 {
        self.threshold
    }
}

/// Count values meeting a threshold as +1 instead of summing, with an
/// optional failure condition counting as -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SuccessSpec {
    pub(crate) compare: ComparePoint,
    pub(crate) threshold: i64,
    pub(crate) failure: Option<FailureSpec>,
}

impl SuccessSpec {
    /// The comparison applied to each surviving value.
    pub fn compare(&self) -> ComparePoint {
        self.compare
    }

    /// The success threshold.
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// The failure condition, if one was given.
    pub fn failure(&self) -> Option<&FailureSpec> {
        self.failure.as_ref()
    }
}

impl Display for SuccessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.compare, self.threshold)?;
        if let Some(failure) = &self.failure {
            write!(f, "f{}{}", failure.compare, failure.threshold)?;
        }
        Ok(())
    }
}

/// Direction of a [`SortSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortDirection {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

/// Reorder the surviving sequence for display. Defaults to ascending
/// when the direction token is omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortSpec {
    pub(crate) direction: SortDirection,
}

impl SortSpec {
    /// Which way the surviving values are ordered.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

impl Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            SortDirection::Ascending => 'a',
            SortDirection::Descending => 'd',
        };
        write!(f, "s{direction}")
    }
}

/// The structured form of a modifier suffix: at most one spec per
/// category plus zero or more reroll rules in parse order.
///
/// Sets are produced by parsing; [`Default`] is the fully-unset set.
/// The [`Display`] form is the canonical notation (penetrate, compound,
/// explode, keep/drop, rerolls, successes, sort) and re-parsing it
/// yields an equal set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModifierSet {
    pub(crate) exploding: Option<ExplodeSpec>,
    pub(crate) compounding: Option<ExplodeSpec>,
    pub(crate) penetrating: Option<ExplodeSpec>,
    pub(crate) keep_drop: Option<KeepDropSpec>,
    pub(crate) rerolls: Vec<RerollSpec>,
    pub(crate) success: Option<SuccessSpec>,
    pub(crate) sort: Option<SortSpec>,
}

impl ModifierSet {
    /// The exploding spec, if set.
    pub fn exploding(&self) -> Option<&ExplodeSpec> {
        self.exploding.as_ref()
    }

    /// The compounding spec, if set.
    pub fn compounding(&self) -> Option<&ExplodeSpec> {
        self.compounding.as_ref()
    }

    /// The penetrating spec, if set.
    pub fn penetrating(&self) -> Option<&ExplodeSpec> {
        self.penetrating.as_ref()
    }

    /// The keep/drop spec, if set.
    pub fn keep_drop(&self) -> Option<&KeepDropSpec> {
        self.keep_drop.as_ref()
    }

    /// The reroll rules in parse order.
    pub fn rerolls(&self) -> &[RerollSpec] {
        &self.rerolls
    }

    /// The success/failure spec, if set.
    pub fn success(&self) -> Option<&SuccessSpec> {
        self.success.as_ref()
    }

    /// The sort spec, if set.
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// True if no category is set.
    pub fn is_empty(&self) -> bool {
        self.exploding.is_none()
            && self.compounding.is_none()
            && self.penetrating.is_none()
            && self.keep_drop.is_none()
            && self.rerolls.is_empty()
            && self.success.is_none()
            && self.sort.is_none()
    }

    /// One English sentence per set category, space-joined.
    pub fn to_plaintext(&self) -> String {
        let mut sentences: Vec<String> = Vec::new();
        if let Some(penetrating) = &self.penetrating {
            sentences.push(format!(
                "Dice penetrate on rolls of {}, with each new die reduced by 1.",
                penetrating.describe()
            ));
        }
        if let Some(compounding) = &self.compounding {
            sentences.push(format!(
                "Dice compound on rolls of {}.",
                compounding.describe()
            ));
        }
        if let Some(exploding) = &self.exploding {
            sentences.push(format!("Dice explode on rolls of {}.", exploding.describe()));
        }
        if let Some(keep_drop) = &self.keep_drop {
            let mode = match keep_drop.mode {
                KeepDropMode::Keep => "Keep",
                KeepDropMode::Drop => "Drop",
            };
            let side = match keep_drop.side {
                KeepDropSide::Highest => "highest",
                KeepDropSide::Lowest => "lowest",
            };
            let noun = if keep_drop.count == 1 { "die" } else { "dice" };
            sentences.push(format!("{mode} the {side} {} {noun}.", keep_drop.count));
        }
        for reroll in &self.rerolls {
            sentences.push(reroll.describe());
        }
        if let Some(success) = &self.success {
            let mut sentence = format!(
                "Count rolls of {} as successes",
                success.compare.describe(success.threshold)
            );
            if let Some(failure) = &success.failure {
                sentence.push_str(&format!(
                    " and rolls of {} as failures",
                    failure.compare.describe(failure.threshold)
                ));
            }
            sentence.push('.');
            sentences.push(sentence);
        }
        if let Some(sort) = &self.sort {
            let direction = match sort.direction {
                SortDirection::Ascending => "ascending",
                SortDirection::Descending => "descending",
            };
            sentences.push(format!("Sort the results in {direction} order."));
        }
        sentences.join(" ")
    }
}

impl ModifierSet {
    /// True if the fragment rendered immediately before the successes
    /// slot ends in a bare (threshold-less) trigger token. Gluing a
    /// `cmp digits` success fragment onto such a token would re-parse
    /// as that token's threshold, so the renderer moves the success
    /// fragment to the front instead.
    fn success_would_glue(&self) -> bool {
        if let Some(last) = self.rerolls.last() {
            last.threshold.is_none()
        } else if self.keep_drop.is_some() {
            false
        } else if let Some(exploding) = &self.exploding {
            exploding.threshold.is_none()
        } else if let Some(compounding) = &self.compounding {
            compounding.threshold.is_none()
        } else if let Some(penetrating) = &self.penetrating {
            penetrating.threshold.is_none()
        } else {
            false
        }
    }
}

impl Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let success_first = self.success.is_some() && self.success_would_glue();
        if success_first {
            if let Some(success) = &self.success {
                write!(f, "{success}")?;
            }
        }
        if let Some(penetrating) = &self.penetrating {
            write!(f, "!p{}", penetrating.body())?;
        }
        if let Some(compounding) = &self.compounding {
            write!(f, "!!{}", compounding.body())?;
        }
        if let Some(exploding) = &self.exploding {
            write!(f, "!{}", exploding.body())?;
        }
        if let Some(keep_drop) = &self.keep_drop {
            write!(f, "{keep_drop}")?;
        }
        for reroll in &self.rerolls {
            write!(f, "{reroll}")?;
        }
        if !success_first {
            if let Some(success) = &self.success {
                write!(f, "{success}")?;
            }
        }
        if let Some(sort) = &self.sort {
            write!(f, "{sort}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn less_or_equal_is_inclusive(threshold in -50i64..50, value in -50i64..50) {
            prop_assert_eq!(
                ComparePoint::LessOrEqual.matches(threshold, value),
                value <= threshold
            );
        }

        #[test]
        fn greater_or_equal_is_inclusive(threshold in -50i64..50, value in -50i64..50) {
            prop_assert_eq!(
                ComparePoint::GreaterOrEqual.matches(threshold, value),
                value >= threshold
            );
        }

        #[test]
        fn equal_matches_only_the_threshold(threshold in -50i64..50, value in -50i64..50) {
            prop_assert_eq!(
                ComparePoint::Equal.matches(threshold, value),
                value == threshold
            );
        }
    }

    #[test]
    fn compare_point_glyphs() {
        assert_eq!(ComparePoint::LessOrEqual.to_string(), "<");
        assert_eq!(ComparePoint::Equal.to_string(), "=");
        assert_eq!(ComparePoint::GreaterOrEqual.to_string(), ">");
    }

    #[test]
    fn keep_drop_display_is_explicit_about_side() {
        let keep = KeepDropSpec {
            mode: KeepDropMode::Keep,
            side: KeepDropSide::Highest,
            count: 3,
        };
        let drop = KeepDropSpec {
            mode: KeepDropMode::Drop,
            side: KeepDropSide::Lowest,
            count: 2,
        };
        assert_eq!(keep.to_string(), "kh3");
        assert_eq!(drop.to_string(), "dl2");
    }

    #[test]
    fn reroll_display_omits_absent_threshold() {
        let bare = RerollSpec {
            compare: ComparePoint::Equal,
            threshold: None,
            only_once: false,
        };
        let once = RerollSpec {
            compare: ComparePoint::LessOrEqual,
            threshold: Some(2),
            only_once: true,
        };
        assert_eq!(bare.to_string(), "r");
        assert_eq!(once.to_string(), "ro<2");
    }

    #[test]
    fn canonical_order_is_penetrate_compound_explode_first() {
        let set = ModifierSet {
            exploding: Some(ExplodeSpec {
                compare: ComparePoint::Equal,
                threshold: None,
            }),
            compounding: Some(ExplodeSpec {
                compare: ComparePoint::GreaterOrEqual,
                threshold: Some(5),
            }),
            penetrating: Some(ExplodeSpec {
                compare: ComparePoint::Equal,
                threshold: None,
            }),
            keep_drop: Some(KeepDropSpec {
                mode: KeepDropMode::Keep,
                side: KeepDropSide::Highest,
                count: 3,
            }),
            rerolls: vec![RerollSpec {
                compare: ComparePoint::LessOrEqual,
                threshold: Some(2),
                only_once: false,
            }],
            success: Some(SuccessSpec {
                compare: ComparePoint::GreaterOrEqual,
                threshold: 8,
                failure: Some(FailureSpec {
                    compare: ComparePoint::Equal,
                    threshold: 1,
                }),
            }),
            sort: Some(SortSpec {
                direction: SortDirection::Descending,
            }),
        };
        assert_eq!(set.to_string(), "!p!!>5!kh3r<2>8f=1sd");
    }

    #[test]
    fn empty_set_renders_as_empty_string() {
        let set = ModifierSet::default();
        assert!(set.is_empty());
        assert_eq!(set.to_string(), "");
        assert_eq!(set.to_plaintext(), "");
    }

    #[test]
    fn plaintext_mentions_each_category_once() {
        let set = ModifierSet {
            exploding: Some(ExplodeSpec {
                compare: ComparePoint::GreaterOrEqual,
                threshold: Some(5),
            }),
            keep_drop: Some(KeepDropSpec {
                mode: KeepDropMode::Keep,
                side: KeepDropSide::Highest,
                count: 1,
            }),
            ..ModifierSet::default()
        };
        assert_eq!(
            set.to_plaintext(),
            "Dice explode on rolls of at least 5. Keep the highest 1 die."
        );
    }
}
