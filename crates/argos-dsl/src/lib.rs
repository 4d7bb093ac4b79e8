//! Argos ASP surface syntax.
//!
//! This crate defines the typed AST for the answer-set-programming fragment
//! Argos explains, a parser for it, ground `Symbol` values, and the content
//! digests used to identify rule groups and orderings.
//!
//! The AST renders back to canonical text via `Display`; everything
//! downstream (dependency analysis, reification, reason rendering) works on
//! these types, never on raw strings.

pub mod ast;
pub mod digest;
pub mod parser;
pub mod symbol;

pub use ast::{
    Aggregate, AggregateElement, AggregateFunction, ArithOp, Atom, ChoiceElement, CmpOp,
    Comparison, Guard, Head, Literal, Program, Rule, Sign, Statement, StatementKind, Term,
};
pub use digest::{
    container_digest_v1, fnv1a64_digest_bytes, fnv1a64_digest_str, sort_digest_v1,
    DIGEST_V1_PREFIX,
};
pub use parser::{parse_program, ParseError};
pub use symbol::Symbol;
