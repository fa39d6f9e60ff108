//! Notation parsing.
//!
//! The modifier suffix is consumed in five fixed category passes
//! (explode family, keep/drop, reroll, successes, sort). Each pass
//! repeatedly finds the first occurrence of its category's token
//! anywhere in the remaining text, applies it, and deletes it; tokens of
//! different categories may therefore be interleaved in any order.
//! Whatever survives all five passes is a parse failure.

use crate::error::Error;
use crate::MAX_SAFE_INT;

use super::set::{
    ComparePoint, ExplodeSpec, FailureSpec, KeepDropMode, KeepDropSide, KeepDropSpec, ModifierSet,
    RerollSpec, SortDirection, SortSpec, SuccessSpec,
};

/// Face specifier of a dice expression: a fate die or a numeric size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Faces {
    Fate,
    Sides(i64),
}

/// Parses a full `[count]d(faces|F)[modifiers]` expression.
///
/// The input must already be trimmed and non-empty; matching is ASCII
/// case-insensitive throughout.
pub(crate) fn parse_notation(input: &str) -> Result<(i64, Faces, ModifierSet), Error> {
    let chars: Vec<char> = input.chars().collect();

    let count_end = scan_digits(&chars, 0);
    let n = if count_end > 0 {
        parse_number(&chars[0..count_end], "n")?
    } else {
        1
    };

    let mut pos = count_end;
    if chars.get(pos).map(lower) != Some('d') {
        return Err(Error::Expression(input.into()));
    }
    pos += 1;

    let faces = match chars.get(pos).map(lower) {
        Some('f') => {
            pos += 1;
            Faces::Fate
        }
        _ => {
            let faces_end = scan_digits(&chars, pos);
            if faces_end == pos {
                return Err(Error::Expression(input.into()));
            }
            let d = parse_number(&chars[pos..faces_end], "d")?;
            pos = faces_end;
            Faces::Sides(d)
        }
    };

    let suffix: String = chars[pos..].iter().collect();
    let modifiers = parse_modifiers(&suffix)?;
    Ok((n, faces, modifiers))
}

/// Parses a modifier suffix into a [`ModifierSet`].
///
/// An empty or whitespace-only suffix yields the fully-unset set.
pub(crate) fn parse_modifiers(suffix: &str) -> Result<ModifierSet, Error> {
    let trimmed = suffix.trim();
    let mut set = ModifierSet::default();
    if trimmed.is_empty() {
        return Ok(set);
    }

    let mut text: Vec<char> = trimmed.chars().collect();
    explode_pass(&mut text, &mut set)?;
    keep_drop_pass(&mut text, &mut set)?;
    reroll_pass(&mut text, &mut set)?;
    success_pass(&mut text, &mut set)?;
    sort_pass(&mut text, &mut set)?;

    if !text.is_empty() {
        return Err(Error::Modifier {
            input: trimmed.into(),
            rest: text.iter().collect(),
        });
    }
    Ok(set)
}

fn lower(c: &char) -> char {
    c.to_ascii_lowercase()
}

fn compare_at(chars: &[char], at: usize) -> Option<ComparePoint> {
    match chars.get(at) {
        Some('<') => Some(ComparePoint::LessOrEqual),
        Some('=') => Some(ComparePoint::Equal),
        Some('>') => Some(ComparePoint::GreaterOrEqual),
        _ => None,
    }
}

/// End index of the run of ASCII digits starting at `from`.
fn scan_digits(chars: &[char], from: usize) -> usize {
    let mut end = from;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    end
}

/// Parses a digit run, validating it into `[0, MAX_SAFE_INT]`.
fn parse_number(digits: &[char], name: &'static str) -> Result<i64, Error> {
    let literal: String = digits.iter().collect();
    literal
        .parse::<u64>()
        .ok()
        .filter(|&value| value <= MAX_SAFE_INT as u64)
        .map(|value| value as i64)
        .ok_or(Error::Range {
            name,
            min: 0,
            value: literal,
        })
}

fn lexeme(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect()
}

/// Optional `[cmp]digits` tail shared by the `!`-family and reroll
/// tokens. Digits without a comparator default the comparator to `=`; a
/// comparator without digits fails the token match at this position, so
/// `!<` is not a bare explode.
enum Body {
    Absent(usize),
    Present(ComparePoint, usize, usize),
    Fail,
}

fn trigger_body(chars: &[char], at: usize) -> Body {
    match compare_at(chars, at) {
        Some(compare) => {
            let end = scan_digits(chars, at + 1);
            if end > at + 1 {
                Body::Present(compare, at + 1, end)
            } else {
                Body::Fail
            }
        }
        None => {
            let end = scan_digits(chars, at);
            if end > at {
                Body::Present(ComparePoint::Equal, at, end)
            } else {
                Body::Absent(at)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExplodeKind {
    Explode,
    Compound,
    Penetrate,
}

/// Pass 1: `!`, `!!` and `!p` tokens, longest prefix first. A `!!` or
/// `!p` prefix whose body fails falls back to a bare `!`, mirroring
/// regex backtracking in the historical grammar.
fn explode_pass(text: &mut Vec<char>, set: &mut ModifierSet) -> Result<(), Error> {
    loop {
        let Some((start, end, kind, body)) = find_explode(text) else {
            return Ok(());
        };
        let threshold = match body {
            Some((compare, digits_start, digits_end)) => Some((
                compare,
                parse_number(&text[digits_start..digits_end], "threshold")?,
            )),
            None => None,
        };
        let spec = match threshold {
            Some((compare, n)) => ExplodeSpec {
                compare,
                threshold: Some(n),
            },
            None => ExplodeSpec {
                compare: ComparePoint::Equal,
                threshold: None,
            },
        };
        let token = lexeme(text, start, end);
        let (slot, category, prefix) = match kind {
            ExplodeKind::Explode => (&mut set.exploding, "exploding", "!"),
            ExplodeKind::Compound => (&mut set.compounding, "compounding", "!!"),
            ExplodeKind::Penetrate => (&mut set.penetrating, "penetrating", "!p"),
        };
        if let Some(existing) = slot {
            return Err(Error::Conflict {
                category,
                existing: format!("{prefix}{}", existing.body()),
                token,
            });
        }
        *slot = Some(spec);
        text.drain(start..end);
    }
}

type ExplodeMatch = (
    usize,
    usize,
    ExplodeKind,
    Option<(ComparePoint, usize, usize)>,
);

fn find_explode(chars: &[char]) -> Option<ExplodeMatch> {
    for i in 0..chars.len() {
        if chars[i] != '!' {
            continue;
        }
        if chars.get(i + 1) == Some(&'!') {
            match trigger_body(chars, i + 2) {
                Body::Absent(end) => return Some((i, end, ExplodeKind::Compound, None)),
                Body::Present(compare, ds, de) => {
                    return Some((i, de, ExplodeKind::Compound, Some((compare, ds, de))))
                }
                Body::Fail => {}
            }
        } else if chars.get(i + 1).map(lower) == Some('p') {
            match trigger_body(chars, i + 2) {
                Body::Absent(end) => return Some((i, end, ExplodeKind::Penetrate, None)),
                Body::Present(compare, ds, de) => {
                    return Some((i, de, ExplodeKind::Penetrate, Some((compare, ds, de))))
                }
                Body::Fail => {}
            }
        }
        match trigger_body(chars, i + 1) {
            Body::Absent(end) => return Some((i, end, ExplodeKind::Explode, None)),
            Body::Present(compare, ds, de) => {
                return Some((i, de, ExplodeKind::Explode, Some((compare, ds, de))))
            }
            Body::Fail => {}
        }
    }
    None
}

/// Pass 2: `k`/`d` with optional `l`/`h` side and a required count.
fn keep_drop_pass(text: &mut Vec<char>, set: &mut ModifierSet) -> Result<(), Error> {
    loop {
        let Some((start, end, mode, side, digits_start)) = find_keep_drop(text) else {
            return Ok(());
        };
        let count = parse_number(&text[digits_start..end], "count")?;
        let token = lexeme(text, start, end);
        if let Some(existing) = &set.keep_drop {
            return Err(Error::Conflict {
                category: "keep/drop",
                existing: existing.to_string(),
                token,
            });
        }
        let side = side.unwrap_or(match mode {
            KeepDropMode::Keep => KeepDropSide::Highest,
            KeepDropMode::Drop => KeepDropSide::Lowest,
        });
        set.keep_drop = Some(KeepDropSpec { mode, side, count });
        text.drain(start..end);
    }
}

type KeepDropMatch = (usize, usize, KeepDropMode, Option<KeepDropSide>, usize);

fn find_keep_drop(chars: &[char]) -> Option<KeepDropMatch> {
    for i in 0..chars.len() {
        let mode = match lower(&chars[i]) {
            'k' => KeepDropMode::Keep,
            'd' => KeepDropMode::Drop,
            _ => continue,
        };
        let mut j = i + 1;
        let side = match chars.get(j).map(lower) {
            Some('l') => {
                j += 1;
                Some(KeepDropSide::Lowest)
            }
            Some('h') => {
                j += 1;
                Some(KeepDropSide::Highest)
            }
            _ => None,
        };
        let end = scan_digits(chars, j);
        if end == j {
            continue;
        }
        return Some((i, end, mode, side, j));
    }
    None
}

/// Pass 3: `r` with optional `o` and optional trigger body; repeatable,
/// but an identical `(compare, threshold)` pair is a conflict.
fn reroll_pass(text: &mut Vec<char>, set: &mut ModifierSet) -> Result<(), Error> {
    loop {
        let Some((start, end, only_once, body)) = find_reroll(text) else {
            return Ok(());
        };
        let (compare, threshold) = match body {
            Some((compare, ds, de)) => (compare, Some(parse_number(&text[ds..de], "threshold")?)),
            None => (ComparePoint::Equal, None),
        };
        let token = lexeme(text, start, end);
        if let Some(existing) = set
            .rerolls
            .iter()
            .find(|r| r.compare == compare && r.threshold == threshold)
        {
            return Err(Error::Conflict {
                category: "reroll",
                existing: existing.to_string(),
                token,
            });
        }
        set.rerolls.push(RerollSpec {
            compare,
            threshold,
            only_once,
        });
        text.drain(start..end);
    }
}

type RerollMatch = (usize, usize, bool, Option<(ComparePoint, usize, usize)>);

fn find_reroll(chars: &[char]) -> Option<RerollMatch> {
    for i in 0..chars.len() {
        if lower(&chars[i]) != 'r' {
            continue;
        }
        let mut j = i + 1;
        let only_once = chars.get(j).map(lower) == Some('o');
        if only_once {
            j += 1;
        }
        match trigger_body(chars, j) {
            Body::Absent(end) => return Some((i, end, only_once, None)),
            Body::Present(compare, ds, de) => {
                return Some((i, de, only_once, Some((compare, ds, de))))
            }
            Body::Fail => continue,
        }
    }
    None
}

/// Pass 4: `cmp digits` with an optional `f[cmp]digits` failure tail.
/// The failure comparator defaults to `=` when omitted.
fn success_pass(text: &mut Vec<char>, set: &mut ModifierSet) -> Result<(), Error> {
    loop {
        let Some((start, end, compare, digits, failure)) = find_success(text) else {
            return Ok(());
        };
        let threshold = parse_number(&text[digits.0..digits.1], "threshold")?;
        let failure = match failure {
            Some((compare, ds, de)) => Some(FailureSpec {
                compare,
                threshold: parse_number(&text[ds..de], "threshold")?,
            }),
            None => None,
        };
        let token = lexeme(text, start, end);
        if let Some(existing) = &set.success {
            return Err(Error::Conflict {
                category: "successes",
                existing: existing.to_string(),
                token,
            });
        }
        set.success = Some(SuccessSpec {
            compare,
            threshold,
            failure,
        });
        text.drain(start..end);
    }
}

type SuccessMatch = (
    usize,
    usize,
    ComparePoint,
    (usize, usize),
    Option<(ComparePoint, usize, usize)>,
);

fn find_success(chars: &[char]) -> Option<SuccessMatch> {
    for i in 0..chars.len() {
        let Some(compare) = compare_at(chars, i) else {
            continue;
        };
        let digits_end = scan_digits(chars, i + 1);
        if digits_end == i + 1 {
            continue;
        }
        let mut end = digits_end;
        let mut failure = None;
        if chars.get(digits_end).map(lower) == Some('f') {
            let after_f = digits_end + 1;
            let failure_compare = compare_at(chars, after_f);
            let failure_digits = if failure_compare.is_some() {
                after_f + 1
            } else {
                after_f
            };
            let failure_end = scan_digits(chars, failure_digits);
            if failure_end > failure_digits {
                failure = Some((
                    failure_compare.unwrap_or(ComparePoint::Equal),
                    failure_digits,
                    failure_end,
                ));
                end = failure_end;
            }
        }
        return Some((i, end, compare, (i + 1, digits_end), failure));
    }
    None
}

/// Pass 5: `s` with optional `a`/`d` direction.
fn sort_pass(text: &mut Vec<char>, set: &mut ModifierSet) -> Result<(), Error> {
    loop {
        let Some((start, end, direction)) = find_sort(text) else {
            return Ok(());
        };
        let token = lexeme(text, start, end);
        if let Some(existing) = &set.sort {
            return Err(Error::Conflict {
                category: "sort",
                existing: existing.to_string(),
                token,
            });
        }
        set.sort = Some(SortSpec { direction });
        text.drain(start..end);
    }
}

fn find_sort(chars: &[char]) -> Option<(usize, usize, SortDirection)> {
    for i in 0..chars.len() {
        if lower(&chars[i]) != 's' {
            continue;
        }
        return Some(match chars.get(i + 1).map(lower) {
            Some('a') => (i, i + 2, SortDirection::Ascending),
            Some('d') => (i, i + 2, SortDirection::Descending),
            _ => (i, i + 1, SortDirection::Ascending),
        });
    }
    None
}
