//! Two-phase modifier resolution.
//!
//! The hot phase turns one seed die into one or more committed values,
//! spawning extra draws for explode/penetrate and folding compound
//! draws into the running value. It runs on an explicit work stack, so
//! deeply chained explosions never recurse on the call stack. The
//! settled phase then applies keep/drop, sort and the aggregate to the
//! whole committed sequence.

use crate::error::Error;
use crate::random::RandomSource;
use crate::MAX_SAFE_INT;

use super::set::{KeepDropMode, KeepDropSide, ModifierSet, SortDirection};

/// Value bounds of the die being rolled: `max` is the highest face,
/// `min` the lowest roll (1, or -1 for fate dice).
#[derive(Debug, Clone, Copy)]
pub(crate) struct DieBounds {
    pub max: i64,
    pub min: i64,
}

/// Upper bound on draw attempts within a single seed chain. Chains that
/// hit it (always-true compound, explode or reroll triggers) abort with
/// an overflow error instead of spinning forever.
const MAX_CHAIN_ITERATIONS: usize = 10_000;

/// A pending draw attempt on the hot-phase work stack.
#[derive(Debug, Clone, Copy)]
struct Pending {
    /// The committed value takes a -1 penalty (penetration child).
    penetrated: bool,
    /// This attempt replaces a value discarded by a reroll rule.
    rerolled: bool,
}

impl ModifierSet {
    /// Runs one seed die's hot-phase chain.
    ///
    /// The chain's very first draw is appended to `raw_rolls`; every
    /// committed value (the seed's and any spawned die's) is appended
    /// to `rolls`. Spawned children commit depth-first after their
    /// parent, the explode child before the penetrate child.
    pub(crate) fn run_chain(
        &self,
        bounds: DieBounds,
        source: &mut dyn RandomSource,
        raw_rolls: &mut Vec<i64>,
        rolls: &mut Vec<i64>,
    ) -> Result<(), Error> {
        let mut stack = vec![Pending {
            penetrated: false,
            rerolled: false,
        }];
        let mut steps = 0usize;
        let mut seeded = false;

        while let Some(pending) = stack.pop() {
            steps += 1;
            if steps > MAX_CHAIN_ITERATIONS {
                return Err(Error::Overflow("roll chain exceeded the iteration cap"));
            }

            let drawn = source.random_int(bounds.max, bounds.min);
            if !seeded {
                raw_rolls.push(drawn);
                seeded = true;
            }

            let mut value = drawn;
            if let Some(compounding) = &self.compounding {
                let threshold = compounding.threshold.unwrap_or(bounds.max);
                let mut last = drawn;
                while compounding.compare.matches(threshold, last) {
                    steps += 1;
                    if steps > MAX_CHAIN_ITERATIONS {
                        return Err(Error::Overflow("roll chain exceeded the iteration cap"));
                    }
                    last = source.random_int(bounds.max, bounds.min);
                    value = value
                        .checked_add(last)
                        .filter(|total| total.abs() <= MAX_SAFE_INT)
                        .ok_or(Error::Overflow(
                            "compounded value would exceed the maximum safe integer",
                        ))?;
                }
            }

            // First matching reroll rule wins; a discarded value commits
            // nothing and spawns nothing.
            if let Some(reroll) = self
                .rerolls
                .iter()
                .find(|r| r.compare.matches(r.threshold.unwrap_or(bounds.min), value))
            {
                if !(reroll.only_once && pending.rerolled) {
                    stack.push(Pending {
                        penetrated: pending.penetrated,
                        rerolled: true,
                    });
                    continue;
                }
            }

            rolls.push(if pending.penetrated { value - 1 } else { value });

            // Spawn triggers are tested on the attempt's raw first draw,
            // not the compounded total. Penetrate is pushed first so the
            // explode child pops first.
            if let Some(penetrating) = &self.penetrating {
                let threshold = penetrating.threshold.unwrap_or(bounds.max);
                if penetrating.compare.matches(threshold, drawn) {
                    stack.push(Pending {
                        penetrated: true,
                        rerolled: false,
                    });
                }
            }
            if let Some(exploding) = &self.exploding {
                let threshold = exploding.threshold.unwrap_or(bounds.max);
                if exploding.compare.matches(threshold, drawn) {
                    stack.push(Pending {
                        penetrated: false,
                        rerolled: false,
                    });
                }
            }
        }
        Ok(())
    }

    /// Settled phase: keep/drop, then sort, then the aggregate.
    ///
    /// `rolls` is modified in place to the surviving sequence; the
    /// returned value is the scalar result.
    pub(crate) fn settle(&self, rolls: &mut Vec<i64>) -> Result<i64, Error> {
        if let Some(keep_drop) = &self.keep_drop {
            rolls.sort_unstable();
            let len = rolls.len();
            // count beyond the sequence length clamps silently
            let count = usize::try_from(keep_drop.count)
                .unwrap_or(usize::MAX)
                .min(len);
            match (keep_drop.mode, keep_drop.side) {
                (KeepDropMode::Keep, KeepDropSide::Highest) => {
                    rolls.drain(..len - count);
                }
                (KeepDropMode::Keep, KeepDropSide::Lowest) => rolls.truncate(count),
                (KeepDropMode::Drop, KeepDropSide::Highest) => rolls.truncate(len - count),
                (KeepDropMode::Drop, KeepDropSide::Lowest) => {
                    rolls.drain(..count);
                }
            }
        }

        if let Some(sort) = &self.sort {
            rolls.sort_unstable();
            if sort.direction == SortDirection::Descending {
                rolls.reverse();
            }
        }

        if let Some(success) = &self.success {
            let successes = rolls
                .iter()
                .filter(|&&v| success.compare.matches(success.threshold, v))
                .count() as i64;
            let failures = success.failure.as_ref().map_or(0, |failure| {
                rolls
                    .iter()
                    .filter(|&&v| failure.compare.matches(failure.threshold, v))
                    .count() as i64
            });
            Ok(successes - failures)
        } else {
            let mut total = 0i64;
            for &value in rolls.iter() {
                total = total
                    .checked_add(value)
                    .filter(|t| t.abs() <= MAX_SAFE_INT)
                    .ok_or(Error::Overflow(
                        "result sum would exceed the maximum safe integer",
                    ))?;
            }
            Ok(total)
        }
    }
}
