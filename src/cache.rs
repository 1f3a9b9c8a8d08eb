//! Pairwise answers and the symmetric memo that keeps a pair from being asked twice

use crate::error::RankError;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

/// One answer to "how does the first item compare to the second"
///
/// `LessThan` means the first item ranks ahead of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Answer {
    LessThan,
    Equal,
    GreaterThan,
}

impl Answer {
    /// Signed form, -1 / 0 / +1
    pub fn signum(self) -> i8 {
        match self {
            Answer::LessThan => -1,
            Answer::Equal => 0,
            Answer::GreaterThan => 1,
        }
    }

    pub fn from_signum(value: i8) -> Self {
        match value.cmp(&0) {
            Ordering::Less => Answer::LessThan,
            Ordering::Equal => Answer::Equal,
            Ordering::Greater => Answer::GreaterThan,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Answer::LessThan => Answer::GreaterThan,
            Answer::Equal => Answer::Equal,
            Answer::GreaterThan => Answer::LessThan,
        }
    }

    /// Convert an answer given against a possibly flipped presentation
    /// back into the orientation the engine asked for.
    pub fn from_presented(answer: Answer, flipped: bool) -> Self {
        if flipped {
            answer.reverse()
        } else {
            answer
        }
    }

    pub fn to_ordering(self) -> Ordering {
        match self {
            Answer::LessThan => Ordering::Less,
            Answer::Equal => Ordering::Equal,
            Answer::GreaterThan => Ordering::Greater,
        }
    }
}

impl From<Ordering> for Answer {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Answer::LessThan,
            Ordering::Equal => Answer::Equal,
            Ordering::Greater => Answer::GreaterThan,
        }
    }
}

impl From<Answer> for Ordering {
    fn from(answer: Answer) -> Self {
        answer.to_ordering()
    }
}

impl FromStr for Answer {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" | "1" | "-1" | "first" => Ok(Answer::LessThan),
            "=" | "0" | "equal" => Ok(Answer::Equal),
            ">" | "2" | "+1" | "second" => Ok(Answer::GreaterThan),
            other => Err(RankError::invalid_answer(other)),
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Answer::LessThan => "<",
            Answer::Equal => "=",
            Answer::GreaterThan => ">",
        };
        write!(f, "{symbol}")
    }
}

/// Symmetric memo of pairwise answers keyed by item index
#[derive(Debug, Default, Clone)]
pub struct ComparisonCache {
    entries: HashMap<(usize, usize), Answer>,
}

impl ComparisonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the relation of `a` to `b`, if it was ever recorded in either direction
    pub fn get(&self, a: usize, b: usize) -> Option<Answer> {
        self.entries.get(&(a, b)).copied()
    }

    /// Record `a` vs `b`; the reverse lookup yields the negated answer
    pub fn set(&mut self, a: usize, b: usize, answer: Answer) {
        self.entries.insert((a, b), answer);
        self.entries.insert((b, a), answer.reverse());
    }

    /// Number of distinct unordered pairs recorded
    pub fn len(&self) -> usize {
        self.entries.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
