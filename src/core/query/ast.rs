//! Boolean expression tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a field clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Apply to an ordering of `record value` vs `query value`
    pub fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
        }
    }
}

/// Expression tree node.
///
/// `Group` only exists between parsing and priority folding; compiled
/// trees never contain it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Match-all sentinel
    All,
    Term(String),
    Phrase(String),
    Compare {
        field: String,
        op: CompareOp,
        value: String,
    },
    /// Thesaurus-aware term, `field:term` (field `None` for `*:term`)
    Vocabulary {
        field: Option<String>,
        term: String,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Except(Box<Expr>, Box<Expr>),
    In {
        expr: Box<Expr>,
        fields: Vec<String>,
    },
    Group(Box<Expr>),
}

impl Expr {
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Expr::And(_) | Expr::Or(_) | Expr::Except(..) | Expr::In { .. }
        )
    }

    /// True when any node requests thesaurus expansion
    pub fn contains_vocabulary(&self) -> bool {
        match self {
            Expr::Vocabulary { .. } => true,
            Expr::And(children) | Expr::Or(children) => {
                children.iter().any(Expr::contains_vocabulary)
            }
            Expr::Except(lhs, rhs) => lhs.contains_vocabulary() || rhs.contains_vocabulary(),
            Expr::In { expr, .. } | Expr::Group(expr) => expr.contains_vocabulary(),
            _ => false,
        }
    }

    /// Positive plain terms and phrases, used for highlighting
    pub fn positive_terms(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_terms(&mut out);
        out
    }

    fn collect_terms(&self, out: &mut Vec<String>) {
        match self {
            Expr::Term(t) | Expr::Phrase(t) => out.push(t.clone()),
            Expr::Vocabulary { term, .. } => out.push(term.clone()),
            Expr::And(children) | Expr::Or(children) => {
                children.iter().for_each(|c| c.collect_terms(out))
            }
            Expr::Except(lhs, _) => lhs.collect_terms(out),
            Expr::In { expr, .. } | Expr::Group(expr) => expr.collect_terms(out),
            _ => {}
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    if expr.is_composite() {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expr], sep: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write_operand(f, child)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::All => f.write_str("all"),
            Expr::Term(t) => f.write_str(t),
            Expr::Phrase(p) => write!(f, "\"{p}\""),
            Expr::Compare { field, op, value } => write!(f, "{field}{}{value}", op.symbol()),
            Expr::Vocabulary { field, term } => {
                write!(f, "{}:{term}", field.as_deref().unwrap_or("*"))
            }
            Expr::And(children) => write_joined(f, children, " AND "),
            Expr::Or(children) => write_joined(f, children, " OR "),
            Expr::Except(lhs, rhs) => {
                write_operand(f, lhs)?;
                f.write_str(" EXCEPT ")?;
                write_operand(f, rhs)
            }
            Expr::In { expr, fields } => {
                write_operand(f, expr)?;
                write!(f, " IN ({})", fields.join(" OR "))
            }
            Expr::Group(inner) => write!(f, "({inner})"),
        }
    }
}
