//! Propositional formulas over preprocessor macro names.
//!
//! Conditions of `#if` directives are treated as opaque propositional formulas. Anything the
//! condition parser cannot make sense of ends up as a single [`Formula::Var`] holding the raw
//! text, so every annotation always has a well-defined formula.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    True,
    False,
    /// A feature name or an uninterpreted piece of condition text.
    Var(String),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
}

impl Formula {
    pub fn var(name: impl Into<String>) -> Formula {
        Formula::Var(name.into())
    }

    /// Negation that removes double negations and negated constants.
    pub fn negate(self) -> Formula {
        match self {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    /// Conjunction of the given clauses. Nested conjunctions are flattened, `true` clauses
    /// are dropped and a `false` clause makes the whole conjunction `false`.
    pub fn and(clauses: impl IntoIterator<Item = Formula>) -> Formula {
        let mut flat = Vec::new();
        for clause in clauses {
            match clause {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::True,
            1 => flat.remove(0),
            _ => Formula::And(flat),
        }
    }

    /// Disjunction of the given clauses, simplified like [`Formula::and`].
    pub fn or(clauses: impl IntoIterator<Item = Formula>) -> Formula {
        let mut flat = Vec::new();
        for clause in clauses {
            match clause {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Formula::False,
            1 => flat.remove(0),
            _ => Formula::Or(flat),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Formula::True)
    }

    /// Evaluate under an assignment of the variables.
    pub fn evaluate(&self, assignment: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Formula::True => true,
            Formula::False => false,
            Formula::Var(name) => assignment(name),
            Formula::Not(inner) => !inner.evaluate(assignment),
            Formula::And(clauses) => clauses.iter().all(|c| c.evaluate(assignment)),
            Formula::Or(clauses) => clauses.iter().any(|c| c.evaluate(assignment)),
        }
    }

    /// All variable names occurring in this formula.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Var(name) => {
                out.insert(name);
            }
            Formula::Not(inner) => inner.collect_variables(out),
            Formula::And(clauses) | Formula::Or(clauses) => {
                for c in clauses {
                    c.collect_variables(out);
                }
            }
        }
    }

    /// Brute-force equivalence check over all assignments of the shared variables.
    /// Only meant for the small formulas found in annotations.
    pub fn is_equivalent_to(&self, other: &Formula) -> bool {
        let vars: Vec<&str> = self
            .variables()
            .union(&other.variables())
            .copied()
            .collect();
        if vars.len() > 16 {
            return self == other;
        }
        (0u32..(1 << vars.len())).all(|bits| {
            let assignment = |name: &str| {
                vars.iter()
                    .position(|v| *v == name)
                    .is_some_and(|i| bits & (1 << i) != 0)
            };
            self.evaluate(&assignment) == other.evaluate(&assignment)
        })
    }

    fn is_atomic(&self) -> bool {
        matches!(
            self,
            Formula::True | Formula::False | Formula::Var(_) | Formula::Not(_)
        )
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Var(name) => write!(f, "{}", name),
            Formula::Not(inner) => {
                if inner.is_atomic() {
                    write!(f, "!{}", inner)
                } else {
                    write!(f, "!({})", inner)
                }
            }
            Formula::And(clauses) => {
                for (i, c) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    if matches!(c, Formula::Or(_)) {
                        write!(f, "({})", c)?;
                    } else {
                        write!(f, "{}", c)?;
                    }
                }
                Ok(())
            }
            Formula::Or(clauses) => {
                for (i, c) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " || ")?;
                    }
                    write!(f, "{}", c)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens_and_drops_true() {
        let f = Formula::and([
            Formula::True,
            Formula::var("A"),
            Formula::and([Formula::var("B"), Formula::var("C")]),
        ]);
        assert_eq!(
            f,
            Formula::And(vec![Formula::var("A"), Formula::var("B"), Formula::var("C")])
        );
        assert_eq!(Formula::and([Formula::True]), Formula::True);
        assert_eq!(Formula::and([Formula::var("A"), Formula::False]), Formula::False);
        assert_eq!(Formula::and([Formula::True, Formula::var("A")]), Formula::var("A"));
    }

    #[test]
    fn test_negate_simplifies() {
        assert_eq!(Formula::var("A").negate().negate(), Formula::var("A"));
        assert_eq!(Formula::True.negate(), Formula::False);
    }

    #[test]
    fn test_display() {
        let f = Formula::and([
            Formula::var("A").negate(),
            Formula::or([Formula::var("B"), Formula::var("C")]),
        ]);
        assert_eq!(f.to_string(), "!A && (B || C)");
        let g = Formula::and([Formula::var("A"), Formula::var("B")]).negate();
        assert_eq!(g.to_string(), "!(A && B)");
    }

    #[test]
    fn test_equivalence() {
        // De Morgan
        let lhs = Formula::and([Formula::var("A"), Formula::var("B")]).negate();
        let rhs = Formula::or([Formula::var("A").negate(), Formula::var("B").negate()]);
        assert!(lhs.is_equivalent_to(&rhs));
        assert!(!Formula::var("A").is_equivalent_to(&Formula::var("B")));
    }
}
