//! Controlled vocabulary and in-place term expansion.

use crate::core::error::Result;
use crate::core::query::ast::Expr;
use crate::core::types::BackendId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One thesaurus concept: a preferred term plus its vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub term: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
    /// Number of indexed records tagged with this concept
    #[serde(default)]
    pub hits: u64,
}

impl Concept {
    fn matches(&self, word: &str) -> bool {
        self.term.eq_ignore_ascii_case(word)
            || self.synonyms.iter().any(|s| s.eq_ignore_ascii_case(word))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thesaurus {
    #[serde(default)]
    pub concepts: Vec<Concept>,
}

/// An alternative value offered for a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub value: String,
    pub hits: u64,
}

/// What happened to one vocabulary term during expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermExpansion {
    pub term: String,
    pub field: Option<String>,
    pub alternatives: Vec<Alternative>,
}

impl Thesaurus {
    pub fn new(concepts: Vec<Concept>) -> Self {
        Self { concepts }
    }

    pub fn concept(&self, word: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.matches(word))
    }

    fn hits_of(&self, value: &str) -> Option<u64> {
        self.concepts
            .iter()
            .find(|c| c.term.eq_ignore_ascii_case(value))
            .map(|c| c.hits)
    }

    /// Vocabulary-derived alternatives for `word`, excluding `word` itself
    pub fn alternatives(&self, word: &str) -> Vec<Alternative> {
        let Some(concept) = self.concept(word) else {
            return Vec::new();
        };

        let mut out: Vec<Alternative> = Vec::new();
        let candidates = std::iter::once(&concept.term)
            .chain(concept.synonyms.iter())
            .chain(concept.related.iter());
        for value in candidates {
            if value.eq_ignore_ascii_case(word)
                || out.iter().any(|a| a.value.eq_ignore_ascii_case(value))
            {
                continue;
            }
            out.push(Alternative {
                value: value.clone(),
                hits: self.hits_of(value).unwrap_or(concept.hits),
            });
        }
        out
    }
}

/// Thesaurus lookup for a backend
pub trait ThesaurusSource: Send + Sync {
    /// `Ok(None)` when the backend exposes no thesaurus
    fn thesaurus(&self, backend: BackendId) -> Result<Option<Arc<Thesaurus>>>;
}

fn value_node(value: &str) -> Expr {
    if value.contains(char::is_whitespace) {
        Expr::Phrase(value.to_string())
    } else {
        Expr::Term(value.to_string())
    }
}

/// Replace every vocabulary node that has alternatives in one of the
/// given thesauri by a disjunction of the term and its alternatives
/// (scoped with `IN` when the node names a field). Nodes without any
/// alternative are left untouched.
pub fn expand(expr: Expr, thesauri: &[&Thesaurus], log: &mut Vec<TermExpansion>) -> Expr {
    match expr {
        Expr::Vocabulary { field, term } => {
            let mut alternatives: Vec<Alternative> = Vec::new();
            for thesaurus in thesauri {
                for alt in thesaurus.alternatives(&term) {
                    if !alternatives
                        .iter()
                        .any(|a| a.value.eq_ignore_ascii_case(&alt.value))
                    {
                        alternatives.push(alt);
                    }
                }
            }

            if alternatives.is_empty() {
                return Expr::Vocabulary { field, term };
            }

            let mut branches = vec![value_node(&term)];
            branches.extend(alternatives.iter().map(|a| value_node(&a.value)));
            let disjunction = Expr::Or(branches);

            log.push(TermExpansion {
                term,
                field: field.clone(),
                alternatives,
            });

            match field {
                Some(field) => Expr::In {
                    expr: Box::new(disjunction),
                    fields: vec![field],
                },
                None => disjunction,
            }
        }
        Expr::And(children) => Expr::And(
            children
                .into_iter()
                .map(|c| expand(c, thesauri, log))
                .collect(),
        ),
        Expr::Or(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match expand(child, thesauri, log) {
                    Expr::Or(nested) => flat.extend(nested),
                    other => flat.push(other),
                }
            }
            Expr::Or(flat)
        }
        Expr::Except(lhs, rhs) => Expr::Except(
            Box::new(expand(*lhs, thesauri, log)),
            Box::new(expand(*rhs, thesauri, log)),
        ),
        Expr::In { expr, fields } => Expr::In {
            expr: Box::new(expand(*expr, thesauri, log)),
            fields,
        },
        Expr::Group(inner) => Expr::Group(Box::new(expand(*inner, thesauri, log))),
        other => other,
    }
}
