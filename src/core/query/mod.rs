//! Query language and compilation
//!
//! Free text goes through the lexer and the left-to-right parser, then the
//! priority-folding and OR-distribution passes, then thesaurus expansion.
//! `QueryCompiler` runs the whole pipeline once per targeted backend.

pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod normalize;
pub mod parser;
pub mod thesaurus;

pub use ast::{CompareOp, Expr};
pub use compiler::{
    BackendPlan, CompiledQuery, CompiledRequest, ProposalGroup, ProposedQuery, Proposals,
    QueryCompiler, TermProposal, MATCH_ALL,
};
pub use parser::parse;
pub use thesaurus::{Alternative, Concept, Thesaurus, ThesaurusSource};
