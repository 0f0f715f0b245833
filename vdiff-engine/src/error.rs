//! Error types of the engine.
//!
//! Parsing reports ill-formed input as a tagged [`DiffParseError`]. Graph mutations report
//! contract violations as [`GraphError`], which transformations and the line-graph importer
//! wrap in their own errors.

use crate::line_number::DiffLineNumber;
use crate::types::{DiffType, Time};
use std::fmt;
use thiserror::Error;

/// The ways a diff can be syntactically ill-formed with respect to its annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffErrorKind {
    IfWithoutCondition,
    ElseOrElifWithoutIf,
    ElseAfterElse,
    EndifWithoutIf,
    NotAllAnnotationsClosed,
    MlMacroWithinMlMacro,
}

impl DiffErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffErrorKind::IfWithoutCondition => "IF_WITHOUT_CONDITION",
            DiffErrorKind::ElseOrElifWithoutIf => "ELSE_OR_ELIF_WITHOUT_IF",
            DiffErrorKind::ElseAfterElse => "ELSE_AFTER_ELSE",
            DiffErrorKind::EndifWithoutIf => "ENDIF_WITHOUT_IF",
            DiffErrorKind::NotAllAnnotationsClosed => "NOT_ALL_ANNOTATIONS_CLOSED",
            DiffErrorKind::MlMacroWithinMlMacro => "MLMACRO_WITHIN_MLMACRO",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiffErrorKind::IfWithoutCondition => "conditional macro without expression",
            DiffErrorKind::ElseOrElifWithoutIf => "#else or #elif without #if",
            DiffErrorKind::ElseAfterElse => "#else after #else",
            DiffErrorKind::EndifWithoutIf => "#endif without #if",
            DiffErrorKind::NotAllAnnotationsClosed => "not all annotations closed",
            DiffErrorKind::MlMacroWithinMlMacro => {
                "definition of multiline macro within multiline macro"
            }
        }
    }
}

impl fmt::Display for DiffErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure to parse a diff into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{kind}] {message}")]
pub struct DiffParseError {
    pub kind: DiffErrorKind,
    pub message: String,
    /// The line at which the error was detected.
    pub line: DiffLineNumber,
}

impl DiffParseError {
    pub fn new(kind: DiffErrorKind, line: DiffLineNumber, text: &str) -> Self {
        Self {
            kind,
            message: format!(
                "{} in diff line {}: {}",
                kind.description(),
                line.in_diff,
                text.trim()
            ),
            line,
        }
    }

    /// An error that is only detected once all lines have been read.
    pub fn at_end(kind: DiffErrorKind, line: DiffLineNumber) -> Self {
        Self {
            kind,
            message: format!("{} at end of diff", kind.description()),
            line,
        }
    }
}

/// Violation of the structural contract of a variation diff. Node ids in messages are the
/// packed ids of [`crate::node::DiffNode::id`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {node} ({diff_type}) does not exist {time} the edit")]
    WrongTime {
        node: i32,
        diff_type: DiffType,
        time: Time,
    },

    #[error("node {child} is already a {time} child of node {parent}")]
    AlreadyChild { parent: i32, child: i32, time: Time },

    #[error("node {child} already has a {time} parent")]
    HasParent { child: i32, time: Time },

    #[error("inconsistent tree at node {node}: {reason}")]
    Inconsistent { node: i32, reason: String },
}

/// Failure while applying transformers to a tree.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transformer {transformer} requires {dependency} to run before it")]
    DependencyNotMet {
        transformer: String,
        dependency: String,
    },

    #[error("unknown transformer: {0}")]
    UnknownTransformer(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failure to read the line-graph text format.
#[derive(Debug, Error)]
pub enum LineGraphError {
    #[error("line {line}: syntax error: {text}")]
    Syntax { line: usize, text: String },

    #[error("line {line}: invalid node id or label: {text}")]
    InvalidNode { line: usize, text: String },

    #[error("line {line}: edge references unknown node id {id}")]
    UnknownNode { line: usize, id: i32 },

    #[error("line {line}: unknown edge relation {relation}")]
    UnknownRelation { line: usize, relation: String },

    #[error("tree {tree} has {roots} parentless nodes, expected exactly one root")]
    NoUniqueRoot { tree: String, roots: usize },

    #[error("line {line}: {source}")]
    Graph {
        line: usize,
        #[source]
        source: GraphError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure to read a patch file from disk.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("failed to read patch: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] DiffParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_line() {
        let err = DiffParseError::new(
            DiffErrorKind::ElseAfterElse,
            DiffLineNumber::new(7, 5, 6),
            "+#else\n",
        );
        assert_eq!(err.kind, DiffErrorKind::ElseAfterElse);
        assert_eq!(
            err.to_string(),
            "[ELSE_AFTER_ELSE] #else after #else in diff line 7: +#else"
        );
    }
}
