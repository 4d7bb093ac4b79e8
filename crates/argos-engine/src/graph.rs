//! Explanation graph construction.
//!
//! One branch per surviving set of target models: starting from the fact
//! root, each transformation is re-solved per branch per model, and models
//! whose new derivations coincide share one child node. Recursive
//! transformations are solved in fixpoint rounds, each round becoming one
//! node of the super node's recursion chain.

use crate::dependency::{AnalyzedProgram, Transformation};
use crate::error::EngineError;
use crate::reify::{
    ReifiedTransformation, Reifier, AGGREGATE_BOUND_PREDICATE, AGGREGATE_ELEMENT_PREDICATE,
    AGGREGATE_PREDICATE, MARKED_PREDICATE, MODEL_PREDICATE,
};
use crate::resolve::Reason;
use crate::solver::{AtomSet, GroundSolver};
use argos_dsl::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};
use uuid::Uuid;

pub type NodeId = usize;

/// One occurrence of a ground atom in the graph. The same symbol gets a
/// distinct identifier in every node that carries it; the identifier minted
/// where the atom first appears (its diff node) is the canonical one that
/// reasons point at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolIdentifier {
    pub uuid: Uuid,
    pub symbol: Symbol,
    /// Set during resolution when this diff atom ends with at least one
    /// resolved reason.
    pub has_reason: bool,
}

impl SymbolIdentifier {
    fn new(symbol: Symbol) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            symbol,
            has_reason: false,
        }
    }

    fn reissued(&self) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            symbol: self.symbol.clone(),
            has_reason: self.has_reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub uuid: Uuid,
    /// Hash of the transformation that produced this node; the facts digest
    /// for the root.
    pub transformation_hash: String,
    /// Atoms that became true at this step.
    pub diff: Vec<SymbolIdentifier>,
    /// Everything true after this step: parent atoms (re-identified) plus
    /// the diff (canonical identifiers).
    pub atoms: Vec<SymbolIdentifier>,
    /// Raw reified tokens per diff atom text; input to the resolver.
    pub tokens: BTreeMap<String, Vec<Symbol>>,
    /// Number of the source rule that fired each diff atom.
    pub rule_numbers: BTreeMap<String, u64>,
    /// Resolved reasons per diff atom text; written by the resolver.
    pub reason: BTreeMap<String, Vec<Reason>>,
    /// Fixpoint-round nodes when this is a recursive super node.
    pub recursive: Vec<NodeId>,
    /// Horizontal layout share, distributed down from the root.
    pub space_multiplier: f64,
    /// Aggregate auxiliary atoms (`__agg*`) from this node's solve.
    pub aggregates: Vec<Symbol>,
}

impl Node {
    fn new(transformation_hash: String) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            transformation_hash,
            diff: Vec::new(),
            atoms: Vec::new(),
            tokens: BTreeMap::new(),
            rule_numbers: BTreeMap::new(),
            reason: BTreeMap::new(),
            recursive: Vec::new(),
            space_multiplier: 1.0,
            aggregates: Vec::new(),
        }
    }
}

/// Marker on edges entering or leaving an expanded recursion chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecursionMarker {
    In,
    Out,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub src: NodeId,
    pub dst: NodeId,
    pub transformation_hash: String,
    pub recursion: Option<RecursionMarker>,
}

/// The finished explanation DAG: an arena of nodes plus typed edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeGraph {
    pub nodes: Vec<Node>,
    pub root: NodeId,
    pub edges: Vec<Edge>,
}

impl NodeGraph {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_by_uuid(&self, uuid: Uuid) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.uuid == uuid)
    }

    /// Parent pointers for reason lookup. Recursion chains resolve inside
    /// out: a round's parent is the previous round, the first round's parent
    /// is the chain's entry node. Exit edges are not parents.
    pub fn parent_map(&self) -> BTreeMap<NodeId, NodeId> {
        self.edges
            .iter()
            .filter(|e| e.recursion != Some(RecursionMarker::Out))
            .map(|e| (e.dst, e.src))
            .collect()
    }

    /// Children along the main branch structure (recursion chains excluded).
    pub fn main_children(&self, id: NodeId) -> Vec<NodeId> {
        let chain_nodes: BTreeSet<NodeId> = self
            .nodes
            .iter()
            .flat_map(|n| n.recursive.iter().copied())
            .collect();
        self.edges
            .iter()
            .filter(|e| {
                e.src == id
                    && e.recursion.is_none()
                    && !chain_nodes.contains(&e.dst)
                    && !chain_nodes.contains(&e.src)
            })
            .map(|e| e.dst)
            .collect()
    }

    /// The on-demand explain query: canonical uuids of the atoms justifying
    /// `atom_uuid` at `node_uuid`, plus the firing rule's number.
    pub fn reason_for(&self, atom_uuid: Uuid, node_uuid: Uuid) -> Option<(Vec<Uuid>, u64)> {
        let node = &self.nodes[self.node_by_uuid(node_uuid)?];
        let text = node
            .diff
            .iter()
            .chain(node.atoms.iter())
            .find(|s| s.uuid == atom_uuid)?
            .symbol
            .to_string();
        let reasons = node.reason.get(&text)?;
        let uuids = reasons
            .iter()
            .filter_map(|r| match r {
                Reason::Atom { symbol_uuid, .. } => *symbol_uuid,
                _ => None,
            })
            .collect();
        let rule = node.rule_numbers.get(&text).copied()?;
        Some((uuids, rule))
    }
}

// ============================================================================
// Building
// ============================================================================

/// What one model's solve produced at one transformation. Grouping key for
/// merging models into shared child nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SolveOutcome {
    /// New atom -> (firing rule number, reified tokens).
    diff: BTreeMap<Symbol, (u64, Vec<Symbol>)>,
    /// Per fixpoint round, for recursive transformations; single entry
    /// otherwise.
    rounds: Vec<BTreeMap<Symbol, (u64, Vec<Symbol>)>>,
    aggregates: BTreeSet<Symbol>,
    unsat: bool,
}

struct Branch {
    leaf: NodeId,
    models: Vec<usize>,
    atoms: AtomSet,
}

pub struct GraphBuilder<'a, S: GroundSolver> {
    solver: &'a S,
}

impl<'a, S: GroundSolver> GraphBuilder<'a, S> {
    pub fn new(solver: &'a S) -> Self {
        Self { solver }
    }

    /// Build the explanation DAG for `analyzed` across `models`.
    pub fn build(
        &self,
        analyzed: &AnalyzedProgram,
        models: &[Vec<Symbol>],
    ) -> Result<NodeGraph, EngineError> {
        if !analyzed.can_build_graph() {
            return Err(EngineError::UnsupportedProgram {
                count: analyzed.issues.len(),
            });
        }

        let mut reifier = Reifier::for_transformations(&analyzed.transformations);
        let reified: Vec<ReifiedTransformation> = analyzed
            .transformations
            .iter()
            .map(|t| reifier.reify(t, analyzed.recursive_hashes.contains(&t.hash)))
            .collect();

        let model_sets: Vec<BTreeSet<Symbol>> = models
            .iter()
            .map(|m| m.iter().cloned().collect())
            .collect();

        let mut nodes: Vec<Node> = Vec::new();
        let mut edges: Vec<Edge> = Vec::new();

        // Fact root, shared by every model.
        let mut root = Node::new(facts_hash(&analyzed.facts));
        let fact_atoms: BTreeSet<Symbol> = analyzed.facts.iter().cloned().collect();
        root.diff = fact_atoms
            .iter()
            .cloned()
            .map(SymbolIdentifier::new)
            .collect();
        root.atoms = root.diff.clone();
        nodes.push(root);

        let mut branches = vec![Branch {
            leaf: 0,
            models: (0..models.len()).collect(),
            atoms: AtomSet::from_symbols(fact_atoms),
        }];

        for (transformation, reified) in analyzed.transformations.iter().zip(&reified) {
            let mut next_branches = Vec::new();
            for branch in branches {
                let mut groups: BTreeMap<SolveOutcome, Vec<usize>> = BTreeMap::new();
                for &model_index in &branch.models {
                    let outcome =
                        self.solve_one(reified, &branch.atoms, &model_sets[model_index]);
                    if outcome.unsat {
                        warn!(
                            model = model_index,
                            transformation = transformation.id,
                            "constraint violated during replay; abandoning this model"
                        );
                        continue;
                    }
                    groups.entry(outcome).or_default().push(model_index);
                }
                for (outcome, group_models) in groups {
                    let child = attach_child(
                        &mut nodes,
                        &mut edges,
                        branch.leaf,
                        transformation,
                        &outcome,
                    );
                    let mut atoms = branch.atoms.clone();
                    for symbol in outcome.diff.keys() {
                        atoms.insert(symbol.clone());
                    }
                    next_branches.push(Branch {
                        leaf: child,
                        models: group_models,
                        atoms,
                    });
                }
            }
            branches = next_branches;
            if branches.is_empty() {
                warn!("every model abandoned; graph ends early");
                break;
            }
        }

        let mut graph = NodeGraph {
            nodes,
            root: 0,
            edges,
        };
        distribute_spacing(&mut graph);
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "explanation graph built"
        );
        Ok(graph)
    }

    /// Solve one transformation for one model over one branch's atoms.
    fn solve_one(
        &self,
        reified: &ReifiedTransformation,
        branch_atoms: &AtomSet,
        model: &BTreeSet<Symbol>,
    ) -> SolveOutcome {
        let mut base = branch_atoms.clone();
        for atom in model {
            base.insert(Symbol::fun(MODEL_PREDICATE.to_string(), vec![atom.clone()]));
        }

        // Constraint containers carry no reified rules; a satisfiable check
        // body is the unsat failure mode.
        for check in &reified.checks {
            if self.solver.satisfiable(&check.body, &base, model) {
                return SolveOutcome {
                    diff: BTreeMap::new(),
                    rounds: Vec::new(),
                    aggregates: BTreeSet::new(),
                    unsat: true,
                };
            }
        }

        let frozen = if reified.recursive {
            reified.head_signatures.clone()
        } else {
            BTreeSet::new()
        };

        let mut rounds = Vec::new();
        let mut aggregates = BTreeSet::new();
        let mut current = base;
        loop {
            let derived = self.solver.derive(&reified.rules, &current, model, &frozen);
            let round = extract_diff(&derived, &current);
            collect_aggregates(&derived, &current, &mut aggregates);
            if round.is_empty() {
                break;
            }
            rounds.push(round);
            current = derived;
            if !reified.recursive {
                break;
            }
        }

        let mut diff = BTreeMap::new();
        for round in &rounds {
            for (symbol, payload) in round {
                diff.entry(symbol.clone()).or_insert_with(|| payload.clone());
            }
        }
        let rounds = if reified.recursive { rounds } else { Vec::new() };

        SolveOutcome {
            diff,
            rounds,
            aggregates,
            unsat: false,
        }
    }
}

/// New original atoms derived by one solve, read off the `__h` marks.
/// Tokens from multiple firings of the same atom concatenate, deduplicated,
/// order preserved; the rule number of the first firing wins.
fn extract_diff(
    derived: &AtomSet,
    before: &AtomSet,
) -> BTreeMap<Symbol, (u64, Vec<Symbol>)> {
    let mut out: BTreeMap<Symbol, (u64, Vec<Symbol>)> = BTreeMap::new();
    let signature = (MARKED_PREDICATE.to_string(), 4);
    for mark in derived.with_signature(&signature) {
        if before.contains(mark) {
            continue;
        }
        let args = mark.args();
        let (rule, head, tokens) = match (args.get(1), args.get(2), args.get(3)) {
            (Some(Symbol::Number(rule)), Some(head), Some(tokens)) => (*rule, head, tokens),
            _ => continue,
        };
        if before.contains(head) {
            continue;
        }
        let entry = out
            .entry(head.clone())
            .or_insert_with(|| (rule as u64, Vec::new()));
        for token in tokens.args() {
            if !entry.1.contains(token) {
                entry.1.push(token.clone());
            }
        }
    }
    out
}

fn collect_aggregates(derived: &AtomSet, before: &AtomSet, out: &mut BTreeSet<Symbol>) {
    for (name, arity) in [
        (AGGREGATE_PREDICATE, 5),
        (AGGREGATE_BOUND_PREDICATE, 6),
        (AGGREGATE_ELEMENT_PREDICATE, 5),
    ] {
        let signature = (name.to_string(), arity);
        for atom in derived.with_signature(&signature) {
            if !before.contains(atom) {
                out.insert(atom.clone());
            }
        }
    }
}

fn identifiers_for(diff: &BTreeMap<Symbol, (u64, Vec<Symbol>)>) -> Vec<SymbolIdentifier> {
    diff.keys().cloned().map(SymbolIdentifier::new).collect()
}

/// Create the child node for one merged group, including its recursion
/// chain, and wire the edges.
fn attach_child(
    nodes: &mut Vec<Node>,
    edges: &mut Vec<Edge>,
    parent: NodeId,
    transformation: &Transformation,
    outcome: &SolveOutcome,
) -> NodeId {
    let parent_atoms: Vec<SymbolIdentifier> =
        nodes[parent].atoms.iter().map(|s| s.reissued()).collect();

    let mut child = Node::new(transformation.hash.clone());
    child.diff = identifiers_for(&outcome.diff);
    child.atoms = parent_atoms.clone();
    child.atoms.extend(child.diff.clone());
    for (symbol, (rule, tokens)) in &outcome.diff {
        let text = symbol.to_string();
        child.tokens.insert(text.clone(), tokens.clone());
        child.rule_numbers.insert(text, *rule);
    }
    child.aggregates = outcome.aggregates.iter().cloned().collect();

    // Fixpoint rounds become a chain of nodes hanging off the super node.
    let mut chain: Vec<NodeId> = Vec::new();
    if outcome.rounds.len() > 1 {
        let mut cumulative = parent_atoms;
        for round in &outcome.rounds {
            let mut round_node = Node::new(transformation.hash.clone());
            round_node.diff = identifiers_for(round);
            cumulative.extend(round_node.diff.clone());
            round_node.atoms = cumulative.clone();
            for (symbol, (rule, tokens)) in round {
                let text = symbol.to_string();
                round_node.tokens.insert(text.clone(), tokens.clone());
                round_node.rule_numbers.insert(text, *rule);
            }
            round_node.aggregates = outcome.aggregates.iter().cloned().collect();
            nodes.push(round_node);
            chain.push(nodes.len() - 1);
        }
    }
    child.recursive = chain.clone();

    nodes.push(child);
    let child_id = nodes.len() - 1;
    edges.push(Edge {
        src: parent,
        dst: child_id,
        transformation_hash: transformation.hash.clone(),
        recursion: None,
    });
    if let (Some(&first), Some(&last)) = (chain.first(), chain.last()) {
        edges.push(Edge {
            src: parent,
            dst: first,
            transformation_hash: transformation.hash.clone(),
            recursion: Some(RecursionMarker::In),
        });
        for pair in chain.windows(2) {
            edges.push(Edge {
                src: pair[0],
                dst: pair[1],
                transformation_hash: transformation.hash.clone(),
                recursion: None,
            });
        }
        edges.push(Edge {
            src: last,
            dst: child_id,
            transformation_hash: transformation.hash.clone(),
            recursion: Some(RecursionMarker::Out),
        });
    }
    child_id
}

/// Every node starts with the full width; each child inherits an equal share
/// of its parent's.
fn distribute_spacing(graph: &mut NodeGraph) {
    let mut queue = vec![graph.root];
    graph.nodes[graph.root].space_multiplier = 1.0;
    while let Some(id) = queue.pop() {
        let children = graph.main_children(id);
        if children.is_empty() {
            continue;
        }
        let share = graph.nodes[id].space_multiplier / children.len() as f64;
        for child in children {
            graph.nodes[child].space_multiplier = share;
            let chain = graph.nodes[child].recursive.clone();
            for round in chain {
                graph.nodes[round].space_multiplier = share;
            }
            queue.push(child);
        }
    }
}

fn facts_hash(facts: &[Symbol]) -> String {
    let texts: Vec<String> = facts.iter().map(|s| s.to_string()).collect();
    argos_dsl::digest::container_digest_v1(&texts)
}
