//! Recognition of conditional preprocessor directives and extraction of their formulas.
//!
//! The extractor is best effort: it understands `defined`, `!`, `&&`, `||`, parentheses,
//! macro names and integer constants. Any other condition (comparisons, arithmetic,
//! function-like macros) is kept verbatim as an uninterpreted literal.

use crate::formula::Formula;
use crate::types::NodeType;
use regex::Regex;
use std::sync::LazyLock;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*(ifdef|ifndef|if|elif|else|endif)\b(.*)$").expect("directive regex")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*.*?\*/|//.*$").expect("comment regex"));

/// A conditional preprocessor directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    If,
    Ifdef,
    Ifndef,
    Elif,
    Else,
    Endif,
}

impl Directive {
    fn from_keyword(keyword: &str) -> Option<Directive> {
        match keyword {
            "if" => Some(Directive::If),
            "ifdef" => Some(Directive::Ifdef),
            "ifndef" => Some(Directive::Ifndef),
            "elif" => Some(Directive::Elif),
            "else" => Some(Directive::Else),
            "endif" => Some(Directive::Endif),
            _ => None,
        }
    }

    /// The node type created for this directive. `#endif` closes nodes but creates none.
    pub fn node_type(self) -> Option<NodeType> {
        match self {
            Directive::If | Directive::Ifdef | Directive::Ifndef => Some(NodeType::If),
            Directive::Elif => Some(NodeType::Elif),
            Directive::Else => Some(NodeType::Else),
            Directive::Endif => None,
        }
    }

    /// Whether this directive needs a condition.
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Directive::If | Directive::Ifdef | Directive::Ifndef | Directive::Elif
        )
    }
}

/// Split a line of source code (without diff prefix) into its directive and the rest of the
/// line. Returns `None` for ordinary code.
pub fn parse_directive(code: &str) -> Option<(Directive, &str)> {
    let caps = DIRECTIVE.captures(code)?;
    let directive = Directive::from_keyword(caps.get(1)?.as_str())?;
    let rest = caps.get(2).map_or("", |m| m.as_str());
    Some((directive, rest))
}

/// Remove C comments and surrounding whitespace from a directive's condition.
pub fn clean_condition(condition: &str) -> String {
    COMMENT.replace_all(condition, " ").trim().to_string()
}

/// Turns the condition text of a directive into a formula.
pub trait FeatureMappingExtractor: Send + Sync {
    /// Never fails: unparseable conditions become an opaque literal.
    fn extract(&self, directive: Directive, condition: &str) -> Formula;
}

/// Extractor for the C preprocessor condition language.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppFormulaExtractor;

impl FeatureMappingExtractor for CppFormulaExtractor {
    fn extract(&self, directive: Directive, condition: &str) -> Formula {
        let condition = clean_condition(condition);
        match directive {
            Directive::Ifdef => Formula::var(condition),
            Directive::Ifndef => Formula::var(condition).negate(),
            _ => parse_condition(&condition),
        }
    }
}

/// Parse a C preprocessor condition, falling back to a literal holding the raw text.
pub fn parse_condition(condition: &str) -> Formula {
    let trimmed = condition.trim();
    let parsed = tokenize(trimmed).and_then(|tokens| {
        let mut parser = ConditionParser { tokens, pos: 0 };
        let formula = parser.parse_or()?;
        if parser.pos == parser.tokens.len() {
            Some(formula)
        } else {
            None
        }
    });
    match parsed {
        Some(formula) => formula,
        None => {
            tracing::debug!("Keeping condition as literal: {}", trimmed);
            Formula::var(trimmed)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Number(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '!' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    return None;
                }
                tokens.push(Token::Not);
            }
            '&' => {
                chars.next_if(|(_, c)| *c == '&')?;
                tokens.push(Token::And);
            }
            '|' => {
                chars.next_if(|(_, c)| *c == '|')?;
                tokens.push(Token::Or);
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some((i, c)) = chars.next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_') {
                    end = i + c.len_utf8();
                }
                let word = text[start..end].to_string();
                if c.is_ascii_digit() {
                    tokens.push(Token::Number(word));
                } else {
                    tokens.push(Token::Ident(word));
                }
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct ConditionParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ConditionParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Option<Formula> {
        let mut clauses = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            clauses.push(self.parse_and()?);
        }
        Some(Formula::or(clauses))
    }

    fn parse_and(&mut self) -> Option<Formula> {
        let mut clauses = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            clauses.push(self.parse_unary()?);
        }
        Some(Formula::and(clauses))
    }

    fn parse_unary(&mut self) -> Option<Formula> {
        if self.eat(&Token::Not) {
            return Some(self.parse_unary()?.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<Formula> {
        match self.next()? {
            Token::Open => {
                let inner = self.parse_or()?;
                self.eat(&Token::Close).then_some(inner)
            }
            Token::Ident(name) if name == "defined" => {
                if self.eat(&Token::Open) {
                    let Token::Ident(macro_name) = self.next()? else {
                        return None;
                    };
                    self.eat(&Token::Close).then(|| Formula::var(macro_name))
                } else {
                    match self.next()? {
                        Token::Ident(macro_name) => Some(Formula::var(macro_name)),
                        _ => None,
                    }
                }
            }
            // function-like macros are not understood
            Token::Ident(_) if self.peek() == Some(&Token::Open) => None,
            Token::Ident(name) => Some(Formula::var(name)),
            Token::Number(digits) => {
                let value: i64 = digits.parse().ok()?;
                Some(if value == 0 { Formula::False } else { Formula::True })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directive() {
        assert_eq!(parse_directive("#if A").map(|d| d.0), Some(Directive::If));
        assert_eq!(parse_directive("  #  ifdef X").map(|d| d.0), Some(Directive::Ifdef));
        assert_eq!(parse_directive("#if(A)").map(|d| d.1), Some("(A)"));
        assert_eq!(parse_directive("#endif // A").map(|d| d.0), Some(Directive::Endif));
        assert_eq!(parse_directive("#else").map(|d| d.0), Some(Directive::Else));
        assert!(parse_directive("#include <stdio.h>").is_none());
        assert!(parse_directive("#iffy").is_none());
        assert!(parse_directive("int x; // #if A").is_none());
    }

    #[test]
    fn test_extract_ifdef_and_ifndef() {
        let extractor = CppFormulaExtractor;
        assert_eq!(extractor.extract(Directive::Ifdef, " FOO "), Formula::var("FOO"));
        assert_eq!(
            extractor.extract(Directive::Ifndef, "FOO /* guard */"),
            Formula::var("FOO").negate()
        );
    }

    #[test]
    fn test_parse_condition() {
        assert_eq!(
            parse_condition("defined(A) && !defined B"),
            Formula::and([Formula::var("A"), Formula::var("B").negate()])
        );
        assert_eq!(
            parse_condition("A || (B && C)"),
            Formula::or([
                Formula::var("A"),
                Formula::and([Formula::var("B"), Formula::var("C")])
            ])
        );
        assert_eq!(parse_condition("0"), Formula::False);
        assert_eq!(parse_condition("1"), Formula::True);
    }

    #[test]
    fn test_unparseable_condition_becomes_literal() {
        assert_eq!(parse_condition("VERSION > 3"), Formula::var("VERSION > 3"));
        assert_eq!(parse_condition("ENABLED(FOO)"), Formula::var("ENABLED(FOO)"));
        assert_eq!(parse_condition("A != B"), Formula::var("A != B"));
        assert_eq!(parse_condition("(A"), Formula::var("(A"));
    }

    #[test]
    fn test_comments_are_stripped() {
        assert_eq!(clean_condition("A && B // trailing"), "A && B");
        assert_eq!(clean_condition("A /* x */ || B"), "A   || B");
    }
}
