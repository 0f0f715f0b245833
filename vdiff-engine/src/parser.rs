//! Parsing unified diffs into variation diffs.
//!
//! The parser reads the diff line by line and keeps two stacks of open annotations, one for
//! the file before the edit and one for the file after it. A line is attached below the top
//! of each stack for the times at which it exists. Directives push to and pop from the
//! stacks of the times at which they exist, so an added `#if` only ever nests code after
//! the edit.
//!
//! The input must be a full diff of one file: every line of the file prefixed by `+`, `-`
//! or a space. Git hunk headers can be removed with [`unified_diff_body`] beforehand; this
//! only gives sound trees for diffs with enough context to contain all enclosing directives.

use crate::annotation::{
    clean_condition, parse_directive, CppFormulaExtractor, Directive, FeatureMappingExtractor,
};
use crate::error::{DiffErrorKind, DiffParseError, PatchError};
use crate::line_number::DiffLineNumber;
use crate::multiline_macro::{join_continued_lines, MacroStep, MultilineMacroParser};
use crate::node::{DiffNode, NodeId};
use crate::tree::{DiffTree, DiffTreeSource};
use crate::types::{DiffType, NodeType, Time};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::path::Path;

/// Options of the diff parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Merge consecutive code lines of the same diff type into one artifact node.
    #[serde(default = "default_true")]
    pub collapse_multiple_code_lines: bool,
    /// Skip lines that contain only whitespace.
    #[serde(default = "default_true")]
    pub ignore_empty_lines: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            collapse_multiple_code_lines: true,
            ignore_empty_lines: true,
        }
    }
}

pub struct DiffTreeParser {
    options: ParseOptions,
    extractor: Box<dyn FeatureMappingExtractor>,
}

impl DiffTreeParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            extractor: Box::new(CppFormulaExtractor),
        }
    }

    /// Use a different extractor for the formulas of `#if` and `#elif` conditions.
    pub fn with_extractor(mut self, extractor: Box<dyn FeatureMappingExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse a full diff of one file.
    pub fn parse(&self, diff: &str) -> Result<DiffTree, DiffParseError> {
        let mut state = ParseState::new(&self.options, self.extractor.as_ref());
        for line in diff.lines() {
            state.consume(line)?;
        }
        state.finish()
    }

    /// Parse a plain source file as a diff in which no line changed.
    pub fn parse_variation_tree(&self, source: &str) -> Result<DiffTree, DiffParseError> {
        let diff: String = source.lines().map(|l| format!(" {}\n", l)).collect();
        self.parse(&diff)
    }

    /// Diff two versions of a file with full context and parse the result.
    pub fn parse_versions(&self, before: &str, after: &str) -> Result<DiffTree, DiffParseError> {
        self.parse(&full_diff(before, after))
    }
}

impl Default for DiffTreeParser {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

pub fn parse_diff(diff: &str, options: &ParseOptions) -> Result<DiffTree, DiffParseError> {
    DiffTreeParser::new(*options).parse(diff)
}

pub fn parse_variation_tree(source: &str, options: &ParseOptions) -> Result<DiffTree, DiffParseError> {
    DiffTreeParser::new(*options).parse_variation_tree(source)
}

pub fn diff_versions(
    before: &str,
    after: &str,
    options: &ParseOptions,
) -> Result<DiffTree, DiffParseError> {
    DiffTreeParser::new(*options).parse_versions(before, after)
}

/// Read and parse a patch file. Git headers are stripped first.
pub fn parse_patch_file(path: &Path, options: &ParseOptions) -> Result<DiffTree, PatchError> {
    let content = std::fs::read_to_string(path)?;
    let mut tree = parse_diff(&unified_diff_body(&content), options)?;
    tree.set_source(DiffTreeSource::File(path.to_path_buf()));
    Ok(tree)
}

/// The diff of two texts where every line of both versions is present.
pub fn full_diff(before: &str, after: &str) -> String {
    let diff = TextDiff::from_lines(before, after);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => ' ',
        };
        out.push(sign);
        out.push_str(change.value().trim_end_matches(['\n', '\r']));
        out.push('\n');
    }
    out
}

/// Remove git file headers, hunk headers and "no newline" markers from a patch. Text without
/// hunk headers is returned unchanged.
pub fn unified_diff_body(patch: &str) -> String {
    if !patch.lines().any(|l| l.starts_with("@@")) {
        return patch.to_string();
    }
    let mut out = String::new();
    let mut in_hunk = false;
    for line in patch.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if !in_hunk || line.starts_with('\\') {
            continue;
        }
        if line.starts_with("diff ") {
            in_hunk = false;
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

struct ParseState<'a> {
    options: &'a ParseOptions,
    extractor: &'a dyn FeatureMappingExtractor,
    tree: DiffTree,
    before_stack: Vec<NodeId>,
    after_stack: Vec<NodeId>,
    last_artifact: Option<NodeId>,
    macros: MultilineMacroParser,
    line_no: DiffLineNumber,
}

impl<'a> ParseState<'a> {
    fn new(options: &'a ParseOptions, extractor: &'a dyn FeatureMappingExtractor) -> Self {
        let tree = DiffTree::new();
        let root = tree.root();
        Self {
            options,
            extractor,
            tree,
            before_stack: vec![root],
            after_stack: vec![root],
            last_artifact: None,
            macros: MultilineMacroParser::new(),
            line_no: DiffLineNumber::new(0, 0, 0),
        }
    }

    fn stack(&self, time: Time) -> &Vec<NodeId> {
        match time {
            Time::Before => &self.before_stack,
            Time::After => &self.after_stack,
        }
    }

    fn stack_mut(&mut self, time: Time) -> &mut Vec<NodeId> {
        match time {
            Time::Before => &mut self.before_stack,
            Time::After => &mut self.after_stack,
        }
    }

    fn consume(&mut self, line: &str) -> Result<(), DiffParseError> {
        let diff_type = DiffType::of_diff_line(line);
        self.line_no = self.line_no.add(1, diff_type);
        let code = line.strip_prefix(['+', '-', ' ']).unwrap_or(line);

        if self.options.ignore_empty_lines && code.trim().is_empty() {
            return Ok(());
        }

        match self.macros.consume(code, diff_type, self.line_no)? {
            MacroStep::Consumed => Ok(()),
            MacroStep::Completed(completed) => {
                for m in completed {
                    self.parse_logical_line(m.lines, m.diff_type, m.start, true)?;
                }
                Ok(())
            }
            MacroStep::NotMyDuty => {
                self.parse_logical_line(vec![code.to_string()], diff_type, self.line_no, false)
            }
        }
    }

    fn parse_logical_line(
        &mut self,
        lines: Vec<String>,
        diff_type: DiffType,
        start: DiffLineNumber,
        is_multiline_macro: bool,
    ) -> Result<(), DiffParseError> {
        let from = start.restricted_to(diff_type);
        let to = self.line_no.add(1, DiffType::Non).restricted_to(diff_type);
        let code = join_continued_lines(&lines);

        let Some((directive, condition)) = parse_directive(&code) else {
            return self.add_artifact(lines, diff_type, from, to);
        };
        self.last_artifact = None;

        let Some(node_type) = directive.node_type() else {
            for time in diff_type.existing_times() {
                self.pop_if_chain(time, from, &code)?;
            }
            return Ok(());
        };

        let mapping = if directive.is_conditional() {
            if clean_condition(condition).is_empty() {
                return Err(DiffParseError::new(
                    DiffErrorKind::IfWithoutCondition,
                    from,
                    &code,
                ));
            }
            Some(self.extractor.extract(directive, condition))
        } else {
            None
        };
        let mut node = DiffNode::new(diff_type, node_type, from, to, mapping, lines);
        node.set_multiline_macro(is_multiline_macro);

        if directive == Directive::Elif || directive == Directive::Else {
            for time in diff_type.existing_times() {
                let stack = self.stack(time);
                if stack.len() == 1 {
                    return Err(DiffParseError::new(
                        DiffErrorKind::ElseOrElifWithoutIf,
                        from,
                        &code,
                    ));
                }
                if let Some(&top) = stack.last() {
                    if self.tree.node(top).is_else() {
                        return Err(DiffParseError::new(DiffErrorKind::ElseAfterElse, from, &code));
                    }
                }
            }
        }

        let id = self.add_node(node);
        for time in diff_type.existing_times() {
            if node_type != NodeType::If {
                if let Some(&superseded) = self.stack(time).last() {
                    self.close_at(superseded, time, from);
                }
            }
            self.stack_mut(time).push(id);
        }
        Ok(())
    }

    fn add_artifact(
        &mut self,
        lines: Vec<String>,
        diff_type: DiffType,
        from: DiffLineNumber,
        to: DiffLineNumber,
    ) -> Result<(), DiffParseError> {
        if self.options.collapse_multiple_code_lines {
            if let Some(open) = self.last_artifact {
                let node = self.tree.node_mut(open);
                if node.diff_type == diff_type {
                    for line in lines {
                        node.add_label_line(line);
                    }
                    node.set_to_line(to);
                    return Ok(());
                }
            }
        }
        let id = self.add_node(DiffNode::artifact(diff_type, from, to, lines));
        self.last_artifact = Some(id);
        Ok(())
    }

    fn add_node(&mut self, node: DiffNode) -> NodeId {
        let id = self.tree.insert(node);
        let before = self.before_stack.last().copied();
        let after = self.after_stack.last().copied();
        self.tree.link_below(id, before, after);
        id
    }

    /// End the range of `node` at `time` where `line` starts.
    fn close_at(&mut self, node: NodeId, time: Time, line: DiffLineNumber) {
        let node = self.tree.node_mut(node);
        let mut to = node.to_line();
        to.set(time, line.at(time));
        to.in_diff = to.in_diff.max(line.in_diff);
        node.set_to_line(to);
    }

    /// Handle an `#endif`: close the innermost if-chain at `time`.
    fn pop_if_chain(
        &mut self,
        time: Time,
        endif: DiffLineNumber,
        code: &str,
    ) -> Result<(), DiffParseError> {
        if let Some(&top) = self.stack(time).last() {
            self.close_at(top, time, endif);
        }
        loop {
            let Some(popped) = self.stack_mut(time).pop() else {
                return Err(DiffParseError::new(DiffErrorKind::EndifWithoutIf, endif, code));
            };
            if self.tree.node(popped).is_if() {
                break;
            }
        }
        if self.stack(time).is_empty() {
            return Err(DiffParseError::new(DiffErrorKind::EndifWithoutIf, endif, code));
        }
        Ok(())
    }

    fn finish(mut self) -> Result<DiffTree, DiffParseError> {
        if let Some(start) = self.macros.in_flight_start() {
            return Err(DiffParseError::at_end(
                DiffErrorKind::NotAllAnnotationsClosed,
                start,
            ));
        }
        for time in Time::ALL {
            if self.stack(time).len() > 1 {
                let open = self.stack(time)[self.stack(time).len() - 1];
                return Err(DiffParseError::at_end(
                    DiffErrorKind::NotAllAnnotationsClosed,
                    self.tree.node(open).from_line(),
                ));
            }
        }
        let root = self.tree.root();
        let end = self.line_no.add(1, DiffType::Non);
        self.tree.node_mut(root).set_to_line(end);
        tracing::debug!(
            nodes = self.tree.size(),
            lines = self.line_no.in_diff,
            "Parsed diff"
        );
        Ok(self.tree)
    }
}
