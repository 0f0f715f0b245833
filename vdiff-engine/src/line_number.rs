//! Line numbers of a diff line in all three coordinate spaces.
//!
//! A line of a unified diff has a position in the diff itself and, if it exists there, a
//! position in the file before and after the edit. Coordinates a line does not have are
//! [`INVALID`].

use crate::types::{DiffType, Time};
use std::fmt;

pub const INVALID: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiffLineNumber {
    pub in_diff: i32,
    pub before_edit: i32,
    pub after_edit: i32,
}

impl DiffLineNumber {
    pub const fn new(in_diff: i32, before_edit: i32, after_edit: i32) -> Self {
        Self {
            in_diff,
            before_edit,
            after_edit,
        }
    }

    pub const fn invalid() -> Self {
        Self::new(INVALID, INVALID, INVALID)
    }

    pub fn at(self, time: Time) -> i32 {
        match time {
            Time::Before => self.before_edit,
            Time::After => self.after_edit,
        }
    }

    pub fn set(&mut self, time: Time, line: i32) {
        match time {
            Time::Before => self.before_edit = line,
            Time::After => self.after_edit = line,
        }
    }

    pub fn is_valid_at(self, time: Time) -> bool {
        self.at(time) != INVALID
    }

    /// Advance by `offset` lines of the given diff type. The diff coordinate always moves;
    /// the before and after coordinates only move if a line of `diff_type` exists there.
    pub fn add(self, offset: i32, diff_type: DiffType) -> Self {
        Self {
            in_diff: self.in_diff + offset,
            before_edit: if diff_type.exists_before() {
                self.before_edit + offset
            } else {
                self.before_edit
            },
            after_edit: if diff_type.exists_after() {
                self.after_edit + offset
            } else {
                self.after_edit
            },
        }
    }

    /// Invalidate the coordinates of times at which a line of `diff_type` does not exist.
    pub fn restricted_to(self, diff_type: DiffType) -> Self {
        Self {
            in_diff: self.in_diff,
            before_edit: if diff_type.exists_before() {
                self.before_edit
            } else {
                INVALID
            },
            after_edit: if diff_type.exists_after() {
                self.after_edit
            } else {
                INVALID
            },
        }
    }
}

impl Default for DiffLineNumber {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for DiffLineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(old: {}, diff: {}, new: {})",
            self.before_edit, self.in_diff, self.after_edit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_respects_diff_type() {
        let line = DiffLineNumber::new(3, 2, 2);
        assert_eq!(line.add(1, DiffType::Add), DiffLineNumber::new(4, 2, 3));
        assert_eq!(line.add(1, DiffType::Rem), DiffLineNumber::new(4, 3, 2));
        assert_eq!(line.add(2, DiffType::Non), DiffLineNumber::new(5, 4, 4));
    }

    #[test]
    fn test_restricted_to() {
        let line = DiffLineNumber::new(7, 5, 6);
        assert_eq!(line.restricted_to(DiffType::Add), DiffLineNumber::new(7, INVALID, 6));
        assert_eq!(line.restricted_to(DiffType::Rem), DiffLineNumber::new(7, 5, INVALID));
        assert_eq!(line.restricted_to(DiffType::Non), line);
        assert!(!line.restricted_to(DiffType::Add).is_valid_at(Time::Before));
    }
}
