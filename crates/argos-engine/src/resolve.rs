//! Reason resolution: rewriting the raw reified tokens stored on each node
//! into cross-referenced reasons.
//!
//! A positive token resolves to the canonical identifier of the referenced
//! atom, searched in the node's own diff first, then up the predecessor
//! chain to the fact root. Recursion chains resolve inside out: a round sees
//! the rounds before it, then everything the super node's parent saw.
//! Negative and comparison tokens resolve to text; aggregate tokens are
//! assembled from the `__agg*` auxiliary atoms retained on the node.

use crate::graph::{NodeGraph, NodeId};
use argos_dsl::ast::Sign;
use argos_dsl::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

/// A resolved justification for one diff atom.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Reason {
    /// A body atom. `symbol_uuid` points at the canonical identifier of the
    /// justifying atom; `None` marks a negative literal or an unresolved
    /// reference.
    Atom {
        sign: Sign,
        text: String,
        symbol_uuid: Option<Uuid>,
    },
    /// A comparison, rendered with the solved values substituted in.
    Comparison { text: String },
    Aggregate(AggregateReason),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateReason {
    /// `#count`, `#sum`, ..., prefixed with `not ` for negated occurrences.
    pub operator: String,
    pub left_bound: Option<BoundReason>,
    pub right_bound: Option<BoundReason>,
    /// The value the aggregate evaluated to, rendered.
    pub value: String,
    pub elements: Vec<AggregateElementReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundReason {
    pub operator: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateElementReason {
    /// The element's term tuple, rendered.
    pub terms: String,
    pub conditions: Vec<Reason>,
}

/// Resolve every node's raw tokens in place and set `has_reason` flags.
pub fn resolve_reasons(graph: &mut NodeGraph) {
    let parents = graph.parent_map();

    let mut resolved: Vec<(NodeId, String, Vec<Reason>)> = Vec::new();
    for id in 0..graph.nodes.len() {
        for (text, tokens) in &graph.nodes[id].tokens {
            let reasons: Vec<Reason> = tokens
                .iter()
                .map(|token| resolve_token(graph, &parents, id, token))
                .collect();
            resolved.push((id, text.clone(), reasons));
        }
    }

    for (id, text, reasons) in resolved {
        let has_reason = !reasons.is_empty();
        let node = &mut graph.nodes[id];
        let mut canonical = None;
        for identifier in &mut node.diff {
            if identifier.symbol.to_string() == text {
                identifier.has_reason = has_reason;
                canonical = Some(identifier.uuid);
            }
        }
        if let Some(uuid) = canonical {
            for identifier in &mut node.atoms {
                if identifier.uuid == uuid {
                    identifier.has_reason = has_reason;
                }
            }
        }
        node.reason.insert(text, reasons);
    }
}

fn resolve_token(
    graph: &NodeGraph,
    parents: &BTreeMap<NodeId, NodeId>,
    node: NodeId,
    token: &Symbol,
) -> Reason {
    match token.signature() {
        Some(("pos", 1)) => {
            let atom = &token.args()[0];
            let symbol_uuid = find_canonical(graph, parents, node, atom);
            if symbol_uuid.is_none() {
                warn!(atom = %atom, "reason atom not found on any predecessor");
            }
            Reason::Atom {
                sign: Sign::Positive,
                text: atom.to_string(),
                symbol_uuid,
            }
        }
        Some(("neg", 1)) => Reason::Atom {
            sign: Sign::Negated,
            text: token.args()[0].to_string(),
            symbol_uuid: None,
        },
        Some(("double_neg", 1)) => Reason::Atom {
            sign: Sign::DoubleNegated,
            text: token.args()[0].to_string(),
            symbol_uuid: None,
        },
        Some(("comp", 2)) => Reason::Comparison {
            text: substitute_bindings(&token.args()[0], &token.args()[1]),
        },
        Some(("body_aggregate", 4)) => {
            resolve_aggregate(graph, parents, node, token.args())
        }
        _ => {
            warn!(token = %token, "unrecognized reason token");
            Reason::Atom {
                sign: Sign::Positive,
                text: token.to_string(),
                symbol_uuid: None,
            }
        }
    }
}

/// Canonical identifier of `atom`: own diff first, then the predecessor
/// chain up to the fact root.
fn find_canonical(
    graph: &NodeGraph,
    parents: &BTreeMap<NodeId, NodeId>,
    start: NodeId,
    atom: &Symbol,
) -> Option<Uuid> {
    let mut current = Some(start);
    while let Some(id) = current {
        if let Some(found) = graph.nodes[id]
            .diff
            .iter()
            .find(|s| &s.symbol == atom)
        {
            return Some(found.uuid);
        }
        current = parents.get(&id).copied();
    }
    None
}

/// Substitute solved values into a comparison's text. Longest variable name
/// first, so `YX` never loses its tail to a substitution of `X`.
fn substitute_bindings(bindings: &Symbol, text: &Symbol) -> String {
    let mut rendered = match text {
        Symbol::Str(s) => s.clone(),
        other => other.to_string(),
    };
    let mut pairs: Vec<(String, String)> = bindings
        .args()
        .iter()
        .filter_map(|pair| {
            let parts = pair.args();
            match (parts.first(), parts.get(1)) {
                (Some(Symbol::Str(name)), Some(value)) => {
                    Some((name.clone(), value.to_string()))
                }
                _ => None,
            }
        })
        .collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    for (name, value) in pairs {
        rendered = rendered.replace(&name, &value);
    }
    rendered
}

/// Assemble an aggregate reason from the `__agg*` atoms the node's solve
/// retained, keyed by (transformation, aggregate number, dependent term).
fn resolve_aggregate(
    graph: &NodeGraph,
    parents: &BTreeMap<NodeId, NodeId>,
    node: NodeId,
    token_args: &[Symbol],
) -> Reason {
    let key = &token_args[..3];
    let sign_prefix = match token_args[3].name() {
        Some("neg") => "not ",
        Some("double_neg") => "not not ",
        _ => "",
    };

    let auxiliaries = &graph.nodes[node].aggregates;

    let mut operator = String::new();
    let mut value = String::new();
    if let Some(agg) = keyed(auxiliaries, key, crate::reify::AGGREGATE_PREDICATE, 5).next() {
        if let Some(op) = agg.args()[3].name() {
            operator = format!("{sign_prefix}#{op}");
        }
        value = agg.args()[4].to_string();
    } else {
        warn!("aggregate value atom missing; reason left partial");
    }

    let mut left_bound = None;
    let mut right_bound = None;
    for bound in keyed(auxiliaries, key, crate::reify::AGGREGATE_BOUND_PREDICATE, 6) {
        let args = bound.args();
        let reason = BoundReason {
            operator: match &args[4] {
                Symbol::Str(s) => s.clone(),
                other => other.to_string(),
            },
            text: substitute_bindings(&args[5].args()[0], &args[5].args()[1]),
        };
        match args[3].name() {
            Some("left") => left_bound = Some(reason),
            Some("right") => right_bound = Some(reason),
            _ => {}
        }
    }

    let elements = keyed(auxiliaries, key, crate::reify::AGGREGATE_ELEMENT_PREDICATE, 5)
        .map(|element| {
            let args = element.args();
            let terms = args[3]
                .args()
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(",");
            let conditions = args[4]
                .args()
                .iter()
                .map(|token| resolve_token(graph, parents, node, token))
                .collect();
            AggregateElementReason { terms, conditions }
        })
        .collect();

    Reason::Aggregate(AggregateReason {
        operator,
        left_bound,
        right_bound,
        value,
        elements,
    })
}

/// Auxiliary atoms of one signature belonging to one aggregate instance.
fn keyed<'a>(
    auxiliaries: &'a [Symbol],
    key: &'a [Symbol],
    name: &'a str,
    arity: usize,
) -> impl Iterator<Item = &'a Symbol> + 'a {
    auxiliaries
        .iter()
        .filter(move |a| a.signature() == Some((name, arity)) && &a.args()[..3] == key)
}
