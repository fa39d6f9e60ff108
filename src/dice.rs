use std::fmt::{self, Display};
use std::str::FromStr;

use crate::error::Error;
use crate::modifier::{DieBounds, Faces, ModifierSet};
use crate::random::RandomSource;
use crate::MAX_SAFE_INT;

/// The outcome of one `roll()` call.
///
/// `raw_rolls` holds the very first draw of each seed chain, before any
/// modifier touched it; `rolls` the final post-modifier sequence (which
/// exploding and penetrating can make longer than the seed count);
/// `result` the scalar aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RollRecord {
    /// Pre-modifier first draw of each seed die, in seed order.
    pub raw_rolls: Vec<i64>,
    /// Final value sequence after the hot and settled phases.
    pub rolls: Vec<i64>,
    /// Sum of the sequence, or the success/failure count.
    pub result: i64,
}

/// A dice roll specification: count, faces, fate flag and modifiers.
///
/// Parsed from notation such as `4d6!kh3`, it drives the modifier
/// engine against a [`RandomSource`] and retains the most recent
/// [`RollRecord`].
///
/// ```
/// use pips::Dice;
///
/// let dice = Dice::parse("4d6!k3").unwrap();
/// assert_eq!(dice.n(), 4);
/// assert_eq!(dice.faces(), 6);
/// // canonical form renders the keep side explicitly
/// assert_eq!(dice.to_string(), "4d6!kh3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dice {
    n: i64,
    faces: i64,
    fate: bool,
    min_roll: i64,
    mods: ModifierSet,
    record: Option<RollRecord>,
}

impl Dice {
    /// Parses a dice expression of the form `[count]d(faces|F)[modifiers]`.
    ///
    /// Surrounding whitespace is trimmed and matching is ASCII
    /// case-insensitive. An empty or whitespace-only expression yields
    /// the default `1d20`.
    ///
    /// # Errors
    /// - [`Error::Expression`] if the count/faces prefix is malformed.
    /// - [`Error::Modifier`] if part of the suffix matches no category.
    /// - [`Error::Conflict`] if a modifier category is set twice.
    /// - [`Error::Range`] if a count, face or threshold exceeds
    ///   [`MAX_SAFE_INT`].
    ///
    /// ```
    /// use pips::Dice;
    ///
    /// assert_eq!(Dice::parse("").unwrap().to_string(), "1d20");
    /// assert_eq!(Dice::parse("2dF").unwrap().to_string(), "2dF");
    /// assert!(Dice::parse("2d6xyz").is_err());
    /// ```
    pub fn parse(notation: &str) -> Result<Self, Error> {
        let trimmed = notation.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let (n, faces, mods) = crate::modifier::parse_notation(trimmed)?;
        Ok(match faces {
            Faces::Fate => Self {
                n,
                faces: 1,
                fate: true,
                min_roll: -1,
                mods,
                record: None,
            },
            Faces::Sides(faces) => Self {
                n,
                faces,
                fate: false,
                min_roll: 1,
                mods,
                record: None,
            },
        })
    }

    /// The number of dice rolled by a plain [`Dice::roll`] call.
    pub fn n(&self) -> i64 {
        self.n
    }

    /// The number of faces. Fate dice report 3 by convention.
    pub fn faces(&self) -> i64 {
        if self.fate {
            3
        } else {
            self.faces
        }
    }

    /// True if this is a fate die.
    pub fn is_fate(&self) -> bool {
        self.fate
    }

    /// The lowest value a single die can roll: 1, or -1 for fate dice.
    pub fn min_roll(&self) -> i64 {
        self.min_roll
    }

    /// The modifiers parsed at construction time. Mutating the dice
    /// afterwards never re-parses them.
    pub fn mods(&self) -> &ModifierSet {
        &self.mods
    }

    /// Sets the number of dice to roll.
    ///
    /// # Errors
    /// [`Error::Range`] if `n` is negative or exceeds [`MAX_SAFE_INT`].
    pub fn set_n(&mut self, n: i64) -> Result<(), Error> {
        check_bound(n, "n")?;
        self.n = n;
        Ok(())
    }

    /// Sets the face count, clearing the fate flag.
    ///
    /// # Errors
    /// [`Error::Range`] if `faces` is negative or exceeds
    /// [`MAX_SAFE_INT`].
    pub fn set_faces(&mut self, faces: i64) -> Result<(), Error> {
        check_bound(faces, "d")?;
        self.faces = faces;
        self.fate = false;
        self.min_roll = 1;
        Ok(())
    }

    /// Turns the fate flag on or off. Turning it on switches the die to
    /// the `[-1, 1]` range; turning it off leaves a d3. Setting the
    /// current value again has no effect.
    pub fn set_fate(&mut self, fate: bool) {
        if fate == self.fate {
            return;
        }
        self.fate = fate;
        if fate {
            self.faces = 1;
            self.min_roll = -1;
        } else {
            self.faces = 3;
            self.min_roll = 1;
        }
    }

    /// Rolls `self.n()` dice. See [`Dice::roll_n`].
    ///
    /// # Errors
    /// As for [`Dice::roll_n`].
    ///
    /// ```
    /// use pips::{Dice, ThreadRngSource};
    ///
    /// let mut dice = Dice::parse("3d6").unwrap();
    /// let total = dice.roll(&mut ThreadRngSource).unwrap();
    /// assert!((3..=18).contains(&total));
    /// assert_eq!(dice.rolls().len(), 3);
    /// assert_eq!(dice.result(), Some(total));
    /// ```
    pub fn roll(&mut self, source: &mut dyn RandomSource) -> Result<i64, Error> {
        self.roll_n(self.n, source)
    }

    /// Rolls `n` dice, seeding `n` hot-phase chains in index order,
    /// then applies the settled phase and stores the outcome as the new
    /// [`RollRecord`]. The stored record is replaced only when the
    /// whole evaluation succeeds; a failed roll leaves the previous
    /// record observable.
    ///
    /// # Errors
    /// - [`Error::Range`] if `n` is out of bounds, or if the die has
    ///   zero faces (there is no value to draw).
    /// - [`Error::Overflow`] if compounding accumulation, the chain
    ///   iteration cap or the result sum overruns [`MAX_SAFE_INT`].
    pub fn roll_n(&mut self, n: i64, source: &mut dyn RandomSource) -> Result<i64, Error> {
        check_bound(n, "n")?;
        if !self.fate && self.faces == 0 && n > 0 {
            return Err(Error::Range {
                name: "d",
                min: 1,
                value: "0".into(),
            });
        }

        let bounds = DieBounds {
            max: self.faces,
            min: self.min_roll,
        };
        let mut raw_rolls = Vec::new();
        let mut rolls = Vec::new();
        for _ in 0..n {
            self.mods
                .run_chain(bounds, source, &mut raw_rolls, &mut rolls)?;
        }
        let result = self.mods.settle(&mut rolls)?;
        self.record = Some(RollRecord {
            raw_rolls,
            rolls,
            result,
        });
        Ok(result)
    }

    /// The most recent roll outcome, if the dice has been rolled.
    pub fn record(&self) -> Option<&RollRecord> {
        self.record.as_ref()
    }

    /// The most recent scalar result, if the dice has been rolled.
    pub fn result(&self) -> Option<i64> {
        self.record.as_ref().map(|record| record.result)
    }

    /// The final value sequence of the most recent roll.
    pub fn rolls(&self) -> &[i64] {
        self.record
            .as_ref()
            .map(|record| record.rolls.as_slice())
            .unwrap_or(&[])
    }

    /// The pre-modifier seed draws of the most recent roll.
    pub fn raw_rolls(&self) -> &[i64] {
        self.record
            .as_ref()
            .map(|record| record.raw_rolls.as_slice())
            .unwrap_or(&[])
    }

    /// The dice specification as an English sentence.
    ///
    /// ```
    /// use pips::Dice;
    ///
    /// let dice = Dice::parse("3d6k2").unwrap();
    /// assert_eq!(
    ///     dice.to_plaintext(),
    ///     "Roll 3 d6s. Keep the highest 2 dice."
    /// );
    /// ```
    pub fn to_plaintext(&self) -> String {
        let what = if self.fate {
            "fate dice".to_string()
        } else {
            format!("d{}{}", self.faces, if self.n > 1 { "s" } else { "" })
        };
        let mut out = format!("Roll {} {what}.", self.n);
        let mods = self.mods.to_plaintext();
        if !mods.is_empty() {
            out.push(' ');
            out.push_str(&mods);
        }
        out
    }
}

fn check_bound(value: i64, name: &'static str) -> Result<(), Error> {
    if (0..=MAX_SAFE_INT).contains(&value) {
        Ok(())
    } else {
        Err(Error::Range {
            name,
            min: 0,
            value: value.to_string(),
        })
    }
}

impl Default for Dice {
    /// A plain `1d20` with no modifiers.
    fn default() -> Self {
        Self {
            n: 1,
            faces: 20,
            fate: false,
            min_roll: 1,
            mods: ModifierSet::default(),
            record: None,
        }
    }
}

impl FromStr for Dice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for Dice {
    /// Canonical notation: `{n}d{faces|F}` followed by the canonical
    /// modifier string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.n)?;
        if self.fate {
            write!(f, "F")?;
        } else {
            write!(f, "{}", self.faces)?;
        }
        write!(f, "{}", self.mods)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{ConstSource, SequenceSource};
    use crate::ThreadRngSource;
    use proptest::prelude::*;

    #[test]
    fn empty_notation_is_1d20() {
        for notation in ["", "   "] {
            let dice = Dice::parse(notation).unwrap();
            assert_eq!(dice.n(), 1);
            assert_eq!(dice.faces(), 20);
            assert!(!dice.is_fate());
            assert!(dice.mods().is_empty());
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        let dice = Dice::parse("2D6!P").unwrap();
        assert_eq!(dice.to_string(), "2d6!p");
    }

    #[test]
    fn fate_dice_report_three_faces() {
        let dice = Dice::parse("4dF").unwrap();
        assert!(dice.is_fate());
        assert_eq!(dice.faces(), 3);
        assert_eq!(dice.min_roll(), -1);
        assert_eq!(dice.to_string(), "4dF");
    }

    #[test]
    fn fate_rolls_stay_in_symmetric_range() {
        let mut dice = Dice::parse("20dF").unwrap();
        dice.roll(&mut ThreadRngSource).unwrap();
        assert_eq!(dice.rolls().len(), 20);
        assert!(dice.rolls().iter().all(|v| (-1..=1).contains(v)));
    }

    #[test]
    fn unset_fate_leaves_a_d3() {
        let mut dice = Dice::parse("2dF").unwrap();
        dice.set_fate(false);
        assert_eq!(dice.faces(), 3);
        assert_eq!(dice.min_roll(), 1);
        assert_eq!(dice.to_string(), "2d3");
    }

    #[test]
    fn set_faces_clears_fate() {
        let mut dice = Dice::parse("2dF").unwrap();
        dice.set_faces(8).unwrap();
        assert!(!dice.is_fate());
        assert_eq!(dice.faces(), 8);
        assert_eq!(dice.min_roll(), 1);
    }

    #[test]
    fn setters_reject_out_of_range_values() {
        let mut dice = Dice::default();
        assert!(matches!(dice.set_n(-1), Err(Error::Range { name: "n", .. })));
        assert!(matches!(
            dice.set_faces(MAX_SAFE_INT + 1),
            Err(Error::Range { name: "d", .. })
        ));
    }

    #[test]
    fn zero_faces_parse_but_do_not_roll() {
        let mut dice = Dice::parse("1d0").unwrap();
        let err = dice.roll(&mut ThreadRngSource).unwrap_err();
        assert!(matches!(err, Error::Range { name: "d", .. }));
        assert!(dice.record().is_none());
    }

    #[test]
    fn zero_dice_roll_is_empty_and_zero() {
        let mut dice = Dice::parse("0d6").unwrap();
        let result = dice.roll(&mut ThreadRngSource).unwrap();
        assert_eq!(result, 0);
        assert!(dice.rolls().is_empty());
        assert!(dice.raw_rolls().is_empty());
    }

    #[test]
    fn explode_with_keep_high_matches_hand_computation() {
        let mut dice = Dice::parse("2d6!k2").unwrap();
        // chain 0: 6 explodes into 3; chain 1: 5
        let mut source = SequenceSource::new(&[6, 3, 5]);
        let result = dice.roll(&mut source).unwrap();
        assert_eq!(dice.raw_rolls(), &[6, 5]);
        assert_eq!(dice.rolls(), &[5, 6]);
        assert_eq!(result, 11);
    }

    #[test]
    fn raw_rolls_keep_the_first_draw_of_a_rerolled_chain() {
        let mut dice = Dice::parse("2d10r<3").unwrap();
        let mut source = SequenceSource::new(&[2, 7, 9]);
        dice.roll(&mut source).unwrap();
        assert_eq!(dice.raw_rolls(), &[2, 9]);
        assert_eq!(dice.rolls(), &[7, 9]);
    }

    #[test]
    fn roll_n_overrides_the_configured_count() {
        let mut dice = Dice::parse("1d6").unwrap();
        let mut source = SequenceSource::new(&[2, 4, 6]);
        let result = dice.roll_n(3, &mut source).unwrap();
        assert_eq!(result, 12);
        assert_eq!(dice.rolls().len(), 3);
        assert_eq!(dice.n(), 1);
    }

    #[test]
    fn failed_roll_leaves_the_previous_record() {
        let mut dice = Dice::parse("2d6!!").unwrap();
        let mut source = SequenceSource::new(&[1, 2]);
        dice.roll(&mut source).unwrap();
        let before = dice.record().cloned().unwrap();

        let err = dice.roll(&mut ConstSource(6)).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
        assert_eq!(dice.record(), Some(&before));
    }

    #[test]
    fn success_failure_roll_counts() {
        let mut dice = Dice::parse("5d10>8f<2").unwrap();
        let mut source = SequenceSource::new(&[9, 2, 5, 10, 1]);
        let result = dice.roll(&mut source).unwrap();
        assert_eq!(result, 0);
        assert_eq!(dice.rolls(), &[9, 2, 5, 10, 1]);
    }

    #[test]
    fn sorted_roll_reorders_only_the_report() {
        let mut dice = Dice::parse("3d6sd").unwrap();
        let mut source = SequenceSource::new(&[2, 6, 4]);
        let result = dice.roll(&mut source).unwrap();
        assert_eq!(result, 12);
        assert_eq!(dice.rolls(), &[6, 4, 2]);
        assert_eq!(dice.raw_rolls(), &[2, 6, 4]);
    }

    #[test]
    fn plaintext_for_fate_and_plain_dice() {
        assert_eq!(Dice::parse("4dF").unwrap().to_plaintext(), "Roll 4 fate dice.");
        assert_eq!(Dice::parse("1d8").unwrap().to_plaintext(), "Roll 1 d8.");
        assert_eq!(
            Dice::parse("2d10r").unwrap().to_plaintext(),
            "Roll 2 d10s. Reroll dice showing the minimum value."
        );
    }

    proptest! {
        #[test]
        fn unmodified_roll_produces_n_values_in_range(
            n in 0i64..=30,
            faces in 1i64..=100
        ) {
            let mut dice = Dice::parse(&format!("{n}d{faces}")).unwrap();
            let result = dice.roll(&mut ThreadRngSource).unwrap();

            prop_assert_eq!(dice.rolls().len(), n as usize);
            prop_assert_eq!(dice.raw_rolls().len(), n as usize);
            for &value in dice.rolls() {
                prop_assert!((1..=faces).contains(&value));
            }
            prop_assert_eq!(result, dice.rolls().iter().sum::<i64>());
        }

        #[test]
        fn display_round_trips_through_parse(
            n in 0i64..=20,
            faces in 0i64..=50
        ) {
            let dice = Dice::parse(&format!("{n}d{faces}")).unwrap();
            let reparsed = Dice::parse(&dice.to_string()).unwrap();
            prop_assert_eq!(dice, reparsed);
        }
    }
}
