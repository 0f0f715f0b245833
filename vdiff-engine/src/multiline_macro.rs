//! Directives spanning several physical lines joined by a trailing backslash.
//!
//! A directive header ending in `\` opens one in-flight macro per time at which the header
//! exists. Following lines are buffered until a line without continuation completes the
//! macro. If an unchanged header is completed by an unchanged line and nothing in between
//! was edited, the before and after macros are identical and yield one unchanged node.
//! Otherwise the before macro becomes a removed node and the after macro an added one.

use crate::annotation::parse_directive;
use crate::error::{DiffErrorKind, DiffParseError};
use crate::line_number::DiffLineNumber;
use crate::types::DiffType;

#[derive(Debug, Clone, PartialEq, Eq)]
struct MultilineMacro {
    /// Physical lines without diff prefix.
    lines: Vec<String>,
    start: DiffLineNumber,
}

/// A logical directive line assembled from several physical lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedMacro {
    pub diff_type: DiffType,
    pub lines: Vec<String>,
    pub start: DiffLineNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroStep {
    /// The line is not part of a multi-line directive.
    NotMyDuty,
    /// The line was buffered.
    Consumed,
    /// The line completed one or two directives.
    Completed(Vec<CompletedMacro>),
}

#[derive(Debug, Default)]
pub struct MultilineMacroParser {
    before: Option<MultilineMacro>,
    after: Option<MultilineMacro>,
}

pub fn continues_line(code: &str) -> bool {
    code.trim_end().ends_with('\\')
}

/// Join the physical lines of a multi-line directive into one logical line.
pub fn join_continued_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| {
            let line = line.trim_end();
            line.strip_suffix('\\').unwrap_or(line).trim()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl MultilineMacroParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> bool {
        self.before.is_some() || self.after.is_some()
    }

    /// Line number of the earliest in-flight header.
    pub fn in_flight_start(&self) -> Option<DiffLineNumber> {
        match (&self.before, &self.after) {
            (Some(b), Some(a)) if a.start.in_diff < b.start.in_diff => Some(a.start),
            (Some(b), _) => Some(b.start),
            (None, Some(a)) => Some(a.start),
            (None, None) => None,
        }
    }

    /// Feed one physical line. `code` is the line without its diff prefix.
    pub fn consume(
        &mut self,
        code: &str,
        diff_type: DiffType,
        line_no: DiffLineNumber,
    ) -> Result<MacroStep, DiffParseError> {
        let continues = continues_line(code);

        if continues && parse_directive(code).is_some() {
            return self.open(code, diff_type, line_no);
        }

        let before_relevant = diff_type.exists_before() && self.before.is_some();
        let after_relevant = diff_type.exists_after() && self.after.is_some();
        if !before_relevant && !after_relevant {
            return Ok(MacroStep::NotMyDuty);
        }

        for (relevant, slot) in [
            (before_relevant, &mut self.before),
            (after_relevant, &mut self.after),
        ] {
            if let (true, Some(m)) = (relevant, slot.as_mut()) {
                m.lines.push(code.to_string());
            }
        }
        if continues {
            return Ok(MacroStep::Consumed);
        }

        let mut completed = Vec::new();
        if before_relevant && after_relevant && diff_type == DiffType::Non && self.before == self.after {
            if let Some(m) = self.before.take() {
                self.after = None;
                completed.push(CompletedMacro {
                    diff_type: DiffType::Non,
                    lines: m.lines,
                    start: m.start,
                });
            }
        } else {
            if before_relevant {
                if let Some(m) = self.before.take() {
                    completed.push(CompletedMacro {
                        diff_type: DiffType::Rem,
                        lines: m.lines,
                        start: m.start,
                    });
                }
            }
            if after_relevant {
                if let Some(m) = self.after.take() {
                    completed.push(CompletedMacro {
                        diff_type: DiffType::Add,
                        lines: m.lines,
                        start: m.start,
                    });
                }
            }
        }
        Ok(MacroStep::Completed(completed))
    }

    fn open(
        &mut self,
        code: &str,
        diff_type: DiffType,
        line_no: DiffLineNumber,
    ) -> Result<MacroStep, DiffParseError> {
        let slots_taken = (diff_type.exists_before() && self.before.is_some())
            || (diff_type.exists_after() && self.after.is_some());
        if slots_taken {
            return Err(DiffParseError::new(
                DiffErrorKind::MlMacroWithinMlMacro,
                line_no,
                code,
            ));
        }
        let header = MultilineMacro {
            lines: vec![code.to_string()],
            start: line_no,
        };
        if diff_type.exists_before() {
            self.before = Some(header.clone());
        }
        if diff_type.exists_after() {
            self.after = Some(header);
        }
        Ok(MacroStep::Consumed)
    }
}
