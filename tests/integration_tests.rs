//! Integration tests for the complete Argos pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - ASP parsing → dependency analysis → transformation order
//! - Reification → replay solving → explanation graph
//! - Reason resolution and the serialized output shape
//!
//! Run with: cargo test --test integration_tests

use argos_dsl::parser::parse_model;
use argos_dsl::symbol::Symbol;
use argos_engine::{
    build_explanation, AnalyzeOptions, BuildOptions, ProgramAnalyzer, Reason, RecursionMarker,
};

fn models(texts: &[&str]) -> Vec<Vec<Symbol>> {
    texts
        .iter()
        .map(|t| parse_model(t).expect("model parses"))
        .collect()
}

// ============================================================================
// Dependency analysis → transformation order
// ============================================================================

#[test]
fn test_order_is_topological_with_constraints_last() {
    let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default())
        .analyze("f(1). :- c(9). a(X) :- f(X). b(X) :- a(X). c(X) :- a(X), b(X). :- b(9).")
        .expect("analysis");

    let texts: Vec<&str> = analyzed
        .transformations
        .iter()
        .map(|t| t.rules.rules()[0].text.as_str())
        .collect();
    assert_eq!(texts[0], "a(X) :- f(X).");
    assert_eq!(texts[1], "b(X) :- a(X).");
    assert_eq!(texts[2], "c(X) :- a(X), b(X).");

    let last = analyzed.transformations.last().expect("transformations");
    assert!(last.rules.is_constraint_container());
    assert_eq!(last.rules.rules().len(), 2);
    assert_eq!(last.id, analyzed.transformations.len());
}

#[test]
fn test_hashes_are_idempotent_across_runs() {
    let src = "f(1). a(X) :- f(X). { b(X) } :- a(X). :- b(9).";
    let run = |_: ()| -> Vec<String> {
        ProgramAnalyzer::new(AnalyzeOptions::default())
            .analyze(src)
            .expect("analysis")
            .transformations
            .iter()
            .map(|t| t.hash.clone())
            .collect()
    };
    assert_eq!(run(()), run(()));
    assert!(run(()).iter().all(|h| h.starts_with("fnv1a64:")));
}

#[test]
fn test_moving_a_transformation_recomputes_ids_and_digest() {
    let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default())
        .analyze("f(1). a(X) :- f(X). b(X) :- a(X). c(X) :- f(X).")
        .expect("analysis");
    let before = analyzed.sort_digest();

    let moved = analyzed.move_transformation(2, 0).expect("legal move");
    assert_eq!(moved[0].rules.rules()[0].text, "c(X) :- f(X).");
    assert_eq!(
        moved.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let hashes: Vec<&str> = moved.iter().map(|t| t.hash.as_str()).collect();
    let after = argos_dsl::digest::sort_digest_v1(&hashes);
    assert_ne!(before, after);

    // Moving a consumer ahead of its producer is rejected.
    assert!(analyzed.move_transformation(1, 0).is_err());
}

// ============================================================================
// Graph shapes
// ============================================================================

#[test]
fn test_single_model_yields_one_path() {
    let explanation = build_explanation(
        "c(1). c(2). b(X) :- c(X). a(X) :- b(X).",
        &models(&["c(1). c(2). b(1). b(2). a(1). a(2)."]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 2);
}

#[test]
fn test_choice_models_share_and_branch() {
    let explanation = build_explanation(
        "a(1). a(2). { b(X) } :- a(X).",
        &models(&[
            "a(1). a(2).",
            "a(1). a(2). b(1).",
            "a(1). a(2). b(2).",
            "a(1). a(2). b(1). b(2).",
        ]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");
    assert_eq!(graph.nodes.len(), 5);
    assert_eq!(graph.edges.len(), 4);
}

#[test]
fn test_facts_only_program_is_a_single_node() {
    let explanation = build_explanation(
        "c(1). c(2).",
        &models(&["c(1). c(2)."]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");
    assert_eq!(graph.nodes.len(), 1);
    assert!(graph.edges.is_empty());
}

#[test]
fn test_atoms_accumulate_monotonically_along_every_edge() {
    use std::collections::BTreeSet;

    // Branching choices, so edges cover more than one path.
    let explanation = build_explanation(
        "c(1). c(2). b(X) :- c(X). { a(X) } :- b(X).",
        &models(&[
            "c(1). c(2). b(1). b(2).",
            "c(1). c(2). b(1). b(2). a(1).",
            "c(1). c(2). b(1). b(2). a(2).",
            "c(1). c(2). b(1). b(2). a(1). a(2).",
        ]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");
    assert!(graph.edges.len() >= 4);
    let texts = |ids: &[argos_engine::SymbolIdentifier]| -> BTreeSet<String> {
        ids.iter().map(|s| s.symbol.to_string()).collect()
    };
    for edge in &graph.edges {
        let mut expected = texts(&graph.nodes[edge.src].atoms);
        expected.extend(texts(&graph.nodes[edge.dst].diff));
        assert_eq!(
            texts(&graph.nodes[edge.dst].atoms),
            expected,
            "child atoms must be exactly the parent atoms plus the child diff"
        );
    }
}

// ============================================================================
// Reason resolution
// ============================================================================

#[test]
fn test_choice_reasons_cross_reference_the_fact_root() {
    let explanation = build_explanation(
        "a(1). a(2). { b(X) } :- a(X).",
        &models(&["a(1). a(2). b(1). b(2)."]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");

    let b_node = graph
        .nodes
        .iter()
        .position(|n| n.diff.iter().any(|s| s.symbol.to_string() == "b(1)"))
        .expect("b node");
    let root_uuids: Vec<_> = graph.nodes[graph.root].diff.iter().map(|s| s.uuid).collect();
    for atom in ["b(1)", "b(2)"] {
        let reasons = &graph.nodes[b_node].reason[atom];
        assert!(
            reasons.iter().any(|r| matches!(
                r,
                Reason::Atom { symbol_uuid: Some(u), .. } if root_uuids.contains(u)
            )),
            "{atom} should be justified by a root fact, got {reasons:?}"
        );
    }
    assert!(graph.nodes[b_node].diff.iter().all(|s| s.has_reason));
}

#[test]
fn test_reason_lookup_returns_uuids_and_rule_number() {
    let explanation = build_explanation(
        "c(1). b(X) :- c(X), not d(X).",
        &models(&["c(1). b(1)."]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");
    let node = graph
        .nodes
        .iter()
        .position(|n| n.diff.iter().any(|s| s.symbol.to_string() == "b(1)"))
        .expect("b node");
    let atom = graph.nodes[node]
        .diff
        .iter()
        .find(|s| s.symbol.to_string() == "b(1)")
        .expect("atom")
        .uuid;
    let (uuids, rule) = graph
        .reason_for(atom, graph.nodes[node].uuid)
        .expect("reason lookup");
    // One positive justification (c(1)); the negated d(1) carries no uuid.
    assert_eq!(uuids.len(), 1);
    assert_eq!(rule, 1);
}

#[test]
fn test_aggregate_justifications_survive_the_whole_pipeline() {
    let explanation = build_explanation(
        "p(1). p(2). p(3). big :- 2 <= #count { X : p(X) }.",
        &models(&["p(1). p(2). p(3). big."]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");
    let node = graph
        .nodes
        .iter()
        .position(|n| n.diff.iter().any(|s| s.symbol.to_string() == "big"))
        .expect("big node");
    let aggregate = graph.nodes[node].reason["big"]
        .iter()
        .find_map(|r| match r {
            Reason::Aggregate(a) => Some(a),
            _ => None,
        })
        .expect("aggregate reason");
    assert_eq!(aggregate.operator, "#count");
    assert_eq!(aggregate.value, "3");
    assert_eq!(aggregate.elements.len(), 3);
    assert!(aggregate
        .elements
        .iter()
        .all(|e| e.conditions.iter().any(|c| matches!(
            c,
            Reason::Atom { symbol_uuid: Some(_), .. }
        ))));
}

// ============================================================================
// Recursion
// ============================================================================

#[test]
fn test_transitive_closure_expands_into_a_fixpoint_chain() {
    let explanation = build_explanation(
        "e(1,2). e(2,3). e(3,4). r(X,Y) :- e(X,Y). r(X,Z) :- r(X,Y), e(Y,Z).",
        &models(&[
            "e(1,2). e(2,3). e(3,4). r(1,2). r(2,3). r(3,4). r(1,3). r(2,4). r(1,4).",
        ]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");

    let super_node = graph
        .nodes
        .iter()
        .position(|n| !n.recursive.is_empty())
        .expect("recursive super node");
    let chain = &graph.nodes[super_node].recursive;
    assert_eq!(chain.len(), 2);
    assert_eq!(graph.nodes[super_node].diff.len(), 3);

    assert!(graph
        .edges
        .iter()
        .any(|e| e.recursion == Some(RecursionMarker::In) && e.dst == chain[0]));
    assert!(graph
        .edges
        .iter()
        .any(|e| e.recursion == Some(RecursionMarker::Out) && e.src == chain[1]));

    // Later rounds justify through earlier rounds.
    let last_round = &graph.nodes[chain[1]];
    let reasons = &last_round.reason["r(1,4)"];
    assert!(reasons
        .iter()
        .any(|r| matches!(r, Reason::Atom { symbol_uuid: Some(_), .. })));
}

// ============================================================================
// Constraints and unsupported programs
// ============================================================================

#[test]
fn test_violating_models_are_abandoned_not_fatal() {
    let explanation = build_explanation(
        "a(1). a(2). { b(X) } :- a(X). :- b(2).",
        &models(&["a(1). a(2). b(1).", "a(1). a(2). b(2)."]),
        &BuildOptions::default(),
    )
    .expect("build");
    let graph = explanation.graph.expect("graph");
    // Both choices branch; only the b(1) branch gets a constraint-step
    // child, so one leaf sits one level short.
    assert_eq!(graph.nodes.len(), 4);
    assert_eq!(graph.edges.len(), 3);
}

#[test]
fn test_unsupported_constructs_block_the_graph_only() {
    let explanation = build_explanation(
        "a ; b :- c. ok(1). d(X) :- ok(X). #minimize { 1 : d(X) }.",
        &models(&["ok(1). d(1)."]),
        &BuildOptions::default(),
    )
    .expect("build");
    assert!(explanation.graph.is_none());
    assert_eq!(explanation.issues.len(), 2);
    // Analysis itself still completed and ordered everything it could.
    assert_eq!(explanation.transformations.len(), 2);
}

// ============================================================================
// Serialized output
// ============================================================================

#[test]
fn test_explanation_serializes_without_solver_internals() {
    let explanation = build_explanation(
        "c(1). b(X) :- c(X).",
        &models(&["c(1). b(1)."]),
        &BuildOptions::default(),
    )
    .expect("build");
    let json = serde_json::to_value(&explanation).expect("serializes");
    assert!(json["key"]["models_digest"]
        .as_str()
        .is_some_and(|s| s.starts_with("fnv1a64:")));
    let nodes = json["graph"]["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 2);
    let child = &nodes[1];
    assert!(child["uuid"].as_str().is_some());
    assert!(child["reason"]["b(1)"].is_array());
    // Round-trips through the public types.
    let back: argos_engine::Explanation =
        serde_json::from_value(json).expect("deserializes");
    assert_eq!(back.transformations.len(), 1);
}
