//! argos-engine: turning answer-set programs and their models into
//! explanation graphs.
//!
//! The pipeline runs in four stages, all synchronous and single-threaded:
//!
//! 1. [`dependency`] orders the program's rules into transformations along
//!    their predicate dependencies.
//! 2. [`reify`] rewrites each transformation so that re-solving it records
//!    why each atom was derived.
//! 3. [`graph`] replays the transformations per target model and folds the
//!    results into a DAG of nodes.
//! 4. [`resolve`] rewrites the recorded raw tokens into cross-referenced
//!    reasons.
//!
//! [`build_explanation`] is the single entry point gluing the stages
//! together. Everything it returns is serde-serializable, so a presentation
//! layer never needs the solver-internal types.

pub mod dependency;
pub mod error;
pub mod graph;
pub mod reify;
pub mod resolve;
pub mod solver;

pub use dependency::{
    AnalyzeOptions, AnalyzedProgram, DependencyGraph, ProgramAnalyzer, ReorderWindow,
    RuleContainer, SourceRule, Transformation,
};
pub use error::{EngineError, IssueCode, ProgramIssue};
pub use graph::{
    Edge, GraphBuilder, Node, NodeGraph, NodeId, RecursionMarker, SymbolIdentifier,
};
pub use reify::{FreshVariables, ReifiedTransformation, Reifier};
pub use resolve::{
    resolve_reasons, AggregateElementReason, AggregateReason, BoundReason, Reason,
};
pub use solver::{AtomSet, BottomUpSolver, GroundSolver};

use argos_dsl::digest::{fnv1a64_digest_str, sort_digest_v1};
use argos_dsl::symbol::Symbol;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Caller-tunable knobs for one build.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// External rule grouping override, by statement index.
    pub grouping: Option<Vec<Vec<usize>>>,
}

/// Cache identity of one explanation: same program text, same models, same
/// transformation order means the same graph. Recomputation is always safe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphKey {
    pub program_digest: String,
    pub models_digest: String,
    pub ordering_digest: String,
}

/// Everything one build produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub key: GraphKey,
    pub transformations: Vec<Transformation>,
    pub issues: Vec<ProgramIssue>,
    /// `None` when the program has unsupported constructs; the issues say
    /// why.
    pub graph: Option<NodeGraph>,
}

/// Analyze `program`, replay it against `models`, and resolve every reason.
pub fn build_explanation(
    program: &str,
    models: &[Vec<Symbol>],
    options: &BuildOptions,
) -> Result<Explanation, EngineError> {
    let analyzer = ProgramAnalyzer::new(AnalyzeOptions {
        grouping: options.grouping.clone(),
    });
    let analyzed = analyzer.analyze(program)?;
    let key = GraphKey {
        program_digest: analyzed.program_digest.clone(),
        models_digest: models_digest(models),
        ordering_digest: analyzed.sort_digest(),
    };

    let graph = if analyzed.can_build_graph() {
        let mut graph = GraphBuilder::new(&BottomUpSolver).build(&analyzed, models)?;
        resolve_reasons(&mut graph);
        info!(
            transformations = analyzed.transformations.len(),
            models = models.len(),
            nodes = graph.nodes.len(),
            "explanation built"
        );
        Some(graph)
    } else {
        info!(
            issues = analyzed.issues.len(),
            "program not graph-buildable; returning analysis only"
        );
        None
    };

    Ok(Explanation {
        key,
        transformations: analyzed.transformations,
        issues: analyzed.issues,
        graph,
    })
}

/// Order-independent digest of a model set: atoms are sorted within each
/// model and model digests are sorted before joining.
pub fn models_digest(models: &[Vec<Symbol>]) -> String {
    let mut digests: Vec<String> = models
        .iter()
        .map(|model| {
            let mut texts: Vec<String> = model.iter().map(|s| s.to_string()).collect();
            texts.sort_unstable();
            fnv1a64_digest_str(&texts.join(" "))
        })
        .collect();
    digests.sort_unstable();
    sort_digest_v1(&digests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_dsl::parser::parse_model;

    fn models(texts: &[&str]) -> Vec<Vec<Symbol>> {
        texts
            .iter()
            .map(|t| parse_model(t).expect("model"))
            .collect()
    }

    #[test]
    fn end_to_end_build_produces_resolved_graph() {
        let explanation = build_explanation(
            "c(1). c(2). b(X) :- c(X). a(X) :- b(X).",
            &models(&["c(1). c(2). b(1). b(2). a(1). a(2)."]),
            &BuildOptions::default(),
        )
        .expect("build");
        assert!(explanation.issues.is_empty());
        let graph = explanation.graph.expect("graph");
        assert_eq!(graph.nodes.len(), 3);
        assert!(graph
            .nodes
            .iter()
            .skip(1)
            .all(|n| !n.reason.is_empty()));
    }

    #[test]
    fn unsupported_programs_return_issues_without_a_graph() {
        let explanation = build_explanation(
            "a ; b :- c.",
            &models(&["c."]),
            &BuildOptions::default(),
        )
        .expect("build");
        assert!(explanation.graph.is_none());
        assert_eq!(explanation.issues.len(), 1);
    }

    #[test]
    fn graph_key_is_stable_and_model_order_independent() {
        let program = "c(1). b(X) :- c(X).";
        let a = build_explanation(
            program,
            &models(&["c(1).", "c(1). b(1)."]),
            &BuildOptions::default(),
        )
        .expect("build");
        let b = build_explanation(
            program,
            &models(&["c(1). b(1).", "c(1)."]),
            &BuildOptions::default(),
        )
        .expect("build");
        assert_eq!(a.key, b.key);
        assert!(a.key.program_digest.starts_with("fnv1a64:"));
    }
}
