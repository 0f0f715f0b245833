//! Core enums of the variation diff model.
//!
//! A variation diff describes a single edit to one preprocessor-annotated file. Every node
//! carries a [`DiffType`] telling whether the edit added, removed or kept it, and a
//! [`NodeType`] telling whether it is an annotation (`#if`, `#elif`, `#else`) or plain source
//! code. [`Time`] selects one of the two views the tree encodes simultaneously.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of bits reserved for [`DiffType`] and [`NodeType`] in a packed node id.
pub const TYPE_BITS: u32 = 3;

/// The point in time relative to the edit: the file before or after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Time {
    Before,
    After,
}

impl Time {
    pub const ALL: [Time; 2] = [Time::Before, Time::After];

    pub fn other(self) -> Time {
        match self {
            Time::Before => Time::After,
            Time::After => Time::Before,
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Time::Before => write!(f, "before"),
            Time::After => write!(f, "after"),
        }
    }
}

/// What an edit did to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffType {
    /// Only exists after the edit.
    Add,
    /// Only exists before the edit.
    Rem,
    /// Exists before and after the edit.
    Non,
}

impl DiffType {
    pub const ALL: [DiffType; 3] = [DiffType::Add, DiffType::Rem, DiffType::Non];

    /// Classify a line of a unified diff by its first character.
    pub fn of_diff_line(line: &str) -> DiffType {
        if line.starts_with('+') {
            DiffType::Add
        } else if line.starts_with('-') {
            DiffType::Rem
        } else {
            DiffType::Non
        }
    }

    pub fn ordinal(self) -> i32 {
        match self {
            DiffType::Add => 0,
            DiffType::Rem => 1,
            DiffType::Non => 2,
        }
    }

    pub fn from_ordinal(ordinal: i32) -> Option<DiffType> {
        DiffType::ALL.into_iter().find(|d| d.ordinal() == ordinal)
    }

    /// The prefix character this diff type has in a unified diff.
    pub fn symbol(self) -> &'static str {
        match self {
            DiffType::Add => "+",
            DiffType::Rem => "-",
            DiffType::Non => " ",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DiffType::Add => "ADD",
            DiffType::Rem => "REM",
            DiffType::Non => "NON",
        }
    }

    pub fn from_name(name: &str) -> Option<DiffType> {
        DiffType::ALL.into_iter().find(|d| d.name() == name)
    }

    /// ADD and REM are inverse to each other. NON has no inverse.
    pub fn inverse(self) -> Option<DiffType> {
        match self {
            DiffType::Add => Some(DiffType::Rem),
            DiffType::Rem => Some(DiffType::Add),
            DiffType::Non => None,
        }
    }

    pub fn exists_at(self, time: Time) -> bool {
        match time {
            Time::Before => self != DiffType::Add,
            Time::After => self != DiffType::Rem,
        }
    }

    pub fn exists_before(self) -> bool {
        self.exists_at(Time::Before)
    }

    pub fn exists_after(self) -> bool {
        self.exists_at(Time::After)
    }

    /// The times at which a node of this diff type exists, before first.
    pub fn existing_times(self) -> impl Iterator<Item = Time> {
        Time::ALL.into_iter().filter(move |t| self.exists_at(*t))
    }
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The kind of a node in a variation diff.
///
/// The root of a tree is not a kind of its own: it is an `If` node with the constant
/// mapping `true` and no parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    If,
    Else,
    Elif,
    Artifact,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::If,
        NodeType::Else,
        NodeType::Elif,
        NodeType::Artifact,
    ];

    pub fn ordinal(self) -> i32 {
        match self {
            NodeType::If => 0,
            NodeType::Else => 1,
            NodeType::Elif => 2,
            NodeType::Artifact => 3,
        }
    }

    pub fn from_ordinal(ordinal: i32) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|n| n.ordinal() == ordinal)
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeType::If => "IF",
            NodeType::Else => "ELSE",
            NodeType::Elif => "ELIF",
            NodeType::Artifact => "ARTIFACT",
        }
    }

    pub fn from_name(name: &str) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|n| n.name() == name)
    }

    /// `#if`, `#elif` and `#else` nodes.
    pub fn is_annotation(self) -> bool {
        self != NodeType::Artifact
    }

    /// Annotations that carry a formula of their own (`#if` and `#elif`).
    pub fn is_conditional(self) -> bool {
        matches!(self, NodeType::If | NodeType::Elif)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_diff_line() {
        assert_eq!(DiffType::of_diff_line("+int x;"), DiffType::Add);
        assert_eq!(DiffType::of_diff_line("-int x;"), DiffType::Rem);
        assert_eq!(DiffType::of_diff_line(" int x;"), DiffType::Non);
        assert_eq!(DiffType::of_diff_line(""), DiffType::Non);
    }

    #[test]
    fn test_existence() {
        assert!(!DiffType::Add.exists_before());
        assert!(DiffType::Add.exists_after());
        assert!(DiffType::Rem.exists_before());
        assert!(!DiffType::Rem.exists_after());
        assert_eq!(DiffType::Non.existing_times().count(), 2);
        assert_eq!(
            DiffType::Rem.existing_times().collect::<Vec<_>>(),
            vec![Time::Before]
        );
    }

    #[test]
    fn test_inverse() {
        assert_eq!(DiffType::Add.inverse(), Some(DiffType::Rem));
        assert_eq!(DiffType::Rem.inverse(), Some(DiffType::Add));
        assert_eq!(DiffType::Non.inverse(), None);
    }

    #[test]
    fn test_ordinals_fit_in_type_bits() {
        for d in DiffType::ALL {
            assert!(d.ordinal() < (1 << TYPE_BITS));
            assert_eq!(DiffType::from_ordinal(d.ordinal()), Some(d));
        }
        for n in NodeType::ALL {
            assert!(n.ordinal() < (1 << TYPE_BITS));
            assert_eq!(NodeType::from_ordinal(n.ordinal()), Some(n));
            assert_eq!(NodeType::from_name(n.name()), Some(n));
        }
    }
}
