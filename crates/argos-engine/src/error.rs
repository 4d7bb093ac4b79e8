//! Error taxonomy.
//!
//! Three categories with different propagation policies:
//!
//! 1. *Unsupported program*: reported as data (`ProgramIssue` values
//!    alongside results); graph construction is skipped, not attempted
//!    partially.
//! 2. *Invariant violation*: `EngineError` values propagated with `?`;
//!    these indicate an analyzer/reifier defect, never user input.
//! 3. *Unresolvable reason*: tolerated, logged and left as an explicit
//!    unresolved marker in the result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The dependency graph still has edges after cycle merging; the
    /// strongly-connected-component pass failed to produce a DAG.
    #[error("dependency graph has {remaining} unresolved edges after cycle merging")]
    ResidualCycle { remaining: usize },

    /// A caller-requested transformation order contradicts the dependency
    /// graph.
    #[error("requested order is not a topological order of the dependency graph")]
    InvalidSort,

    /// Graph construction was requested for a program that analysis flagged
    /// as unsupported.
    #[error("program cannot be explained: {count} unsupported constructs reported")]
    UnsupportedProgram { count: usize },

    #[error(transparent)]
    Parse(#[from] argos_dsl::ParseError),
}

/// Reason code for an unsupported construct.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DisjunctiveHead,
    TheoryAtom,
    ExternalDirective,
    OptimizationStatement,
    HeuristicDirective,
    UnsupportedDirective,
    UnsupportedSyntax,
}

/// A structured warning about one statement. Any issue marks the whole
/// program as unable to proceed to graph construction, but never aborts
/// analysis of the remaining statements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgramIssue {
    /// Source text of the offending statement.
    pub rule: String,
    pub code: IssueCode,
    pub message: String,
}

impl ProgramIssue {
    pub fn new(rule: impl Into<String>, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            code,
            message: message.into(),
        }
    }
}
