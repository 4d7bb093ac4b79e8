//! Dependency analysis: ordering a program's rules into transformation
//! groups.
//!
//! The pipeline mirrors the data flow of the overall system: parse into
//! rules, build a producer → consumer dependency graph at rule-container
//! granularity, fold integrity constraints into one container, merge
//! strongly-connected components (recursion), then sort deterministically.
//! Facts never enter the order; they seed the graph's root node.

use crate::error::{EngineError, IssueCode, ProgramIssue};
use argos_dsl::ast::{Head, Literal, Program, Rule, StatementKind, Term};
use argos_dsl::digest::{container_digest_v1, fnv1a64_digest_str, sort_digest_v1};
use argos_dsl::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One parsed statement with its source position and text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceRule {
    /// Position in the source program; the ordering tie-break.
    pub index: usize,
    pub text: String,
    pub rule: Rule,
}

/// An unordered bag of rules treated as one atomic unit. Equality and
/// hashing are by content (sorted rule text), never identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleContainer {
    rules: Vec<SourceRule>,
}

impl RuleContainer {
    pub fn new(mut rules: Vec<SourceRule>) -> Self {
        rules.sort_by_key(|r| r.index);
        Self { rules }
    }

    pub fn rules(&self) -> &[SourceRule] {
        &self.rules
    }

    pub fn rule_texts(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.text.as_str()).collect()
    }

    /// Lowest source index of any member rule; the deterministic tie-break
    /// used by the topological sort.
    pub fn min_index(&self) -> usize {
        self.rules.iter().map(|r| r.index).min().unwrap_or(usize::MAX)
    }

    pub fn is_constraint_container(&self) -> bool {
        self.rules.iter().all(|r| r.rule.is_constraint()) && !self.rules.is_empty()
    }

    pub fn digest(&self) -> String {
        let texts: Vec<&str> = self.rule_texts();
        container_digest_v1(&texts)
    }

    fn merge(containers: impl IntoIterator<Item = RuleContainer>) -> Self {
        let mut rules = Vec::new();
        for c in containers {
            rules.extend(c.rules);
        }
        RuleContainer::new(rules)
    }

    /// Signatures of atoms this container can establish.
    fn head_signatures(&self) -> BTreeSet<(String, usize)> {
        let mut out = BTreeSet::new();
        for r in &self.rules {
            for atom in r.rule.head.atoms() {
                out.insert(atom.signature());
            }
        }
        out
    }

    /// Signatures of atoms this container's bodies (and head conditions)
    /// consume, under any sign.
    fn body_signatures(&self) -> BTreeSet<(String, usize)> {
        let mut out = BTreeSet::new();
        for r in &self.rules {
            for lit in &r.rule.body {
                literal_signatures(lit, &mut out);
            }
            if let Head::Choice { elements, .. } = &r.rule.head {
                for e in elements {
                    for lit in &e.condition {
                        literal_signatures(lit, &mut out);
                    }
                }
            }
        }
        out
    }
}

impl PartialEq for RuleContainer {
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.rule_texts();
        let mut b = other.rule_texts();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl Eq for RuleContainer {}

fn literal_signatures(lit: &Literal, out: &mut BTreeSet<(String, usize)>) {
    match lit {
        Literal::Atom { atom, .. } => {
            out.insert(atom.signature());
        }
        Literal::Aggregate { aggregate, .. } => {
            for e in &aggregate.elements {
                for c in &e.condition {
                    literal_signatures(c, out);
                }
            }
        }
        Literal::Comparison { .. } | Literal::Theory { .. } => {}
    }
}

/// The re-orderable window of one transformation: positions of its latest
/// DAG predecessor and earliest DAG successor in the current order. `None`
/// means unbounded on that side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReorderWindow {
    pub lower_bound: Option<usize>,
    pub upper_bound: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transformation {
    /// Position in the current total order, starting at 1 (0 is the fact
    /// root). Re-created whenever the global order changes.
    pub id: usize,
    pub rules: RuleContainer,
    /// Content hash of `rules`, stable across re-ordering of other
    /// transformations.
    pub hash: String,
    pub adjacent_sort_indices: ReorderWindow,
}

/// Directed graph over rule containers, producer → consumer. Built once per
/// program text; read-only afterward (re-sorting consults it, never edits).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyGraph {
    pub containers: Vec<RuleContainer>,
    /// Which containers are merged recursive components (or self-loops).
    pub recursive: Vec<bool>,
    /// Edges by container position, self-loops already removed.
    pub edges: BTreeSet<(usize, usize)>,
}

impl DependencyGraph {
    pub fn predecessors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |(_, v)| *v == i)
            .map(|(u, _)| *u)
    }

    pub fn successors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .range((i, 0)..(i + 1, 0))
            .map(|(_, v)| *v)
    }

    /// Is `order` (a permutation of container positions) a topological order?
    pub fn is_valid_order(&self, order: &[usize]) -> bool {
        if order.len() != self.containers.len() {
            return false;
        }
        let mut pos = vec![usize::MAX; self.containers.len()];
        for (p, &c) in order.iter().enumerate() {
            if c >= pos.len() || pos[c] != usize::MAX {
                return false;
            }
            pos[c] = p;
        }
        self.edges.iter().all(|&(u, v)| pos[u] < pos[v])
    }
}

/// Result of analyzing one program text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedProgram {
    pub program_digest: String,
    /// Ground facts (interval heads expanded); these seed the fact root.
    pub facts: Vec<Symbol>,
    pub transformations: Vec<Transformation>,
    pub dependency_graph: DependencyGraph,
    /// Hashes of recursive containers; a resumed build may supply these
    /// back instead of re-deriving them.
    pub recursive_hashes: BTreeSet<String>,
    pub issues: Vec<ProgramIssue>,
}

impl AnalyzedProgram {
    /// Unsupported constructs block graph construction for the whole
    /// program, never partially.
    pub fn can_build_graph(&self) -> bool {
        self.issues.is_empty()
    }

    /// Digest of the current transformation order.
    pub fn sort_digest(&self) -> String {
        let hashes: Vec<&str> = self
            .transformations
            .iter()
            .map(|t| t.hash.as_str())
            .collect();
        sort_digest_v1(&hashes)
    }

    /// Re-create the transformation list after moving the transformation at
    /// `old_index` to `new_index` (indices into the current order). The move
    /// must keep the order topological.
    pub fn move_transformation(
        &self,
        old_index: usize,
        new_index: usize,
    ) -> Result<Vec<Transformation>, EngineError> {
        if old_index >= self.transformations.len() || new_index >= self.transformations.len() {
            return Err(EngineError::InvalidSort);
        }
        let mut order: Vec<&RuleContainer> =
            self.transformations.iter().map(|t| &t.rules).collect();
        let moved = order.remove(old_index);
        order.insert(new_index, moved);
        self.transformations_from_sorted(&order)
    }

    /// Re-create ids, hashes, and reorder windows for a caller-supplied
    /// container order, validating it against the dependency graph.
    pub fn transformations_from_sorted(
        &self,
        order: &[&RuleContainer],
    ) -> Result<Vec<Transformation>, EngineError> {
        let positions: Option<Vec<usize>> = order
            .iter()
            .map(|c| self.dependency_graph.containers.iter().position(|d| d == *c))
            .collect();
        let positions = positions.ok_or(EngineError::InvalidSort)?;
        if !self.dependency_graph.is_valid_order(&positions) {
            return Err(EngineError::InvalidSort);
        }
        Ok(make_transformations(&self.dependency_graph, &positions))
    }
}

/// Optional inputs to analysis.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// External rule-to-transformation override: groups of statement indices
    /// merged into single containers before cycle analysis.
    pub grouping: Option<Vec<Vec<usize>>>,
}

pub struct ProgramAnalyzer {
    options: AnalyzeOptions,
}

impl ProgramAnalyzer {
    pub fn new(options: AnalyzeOptions) -> Self {
        Self { options }
    }

    /// `analyze(program) -> ordered transformations` plus everything the
    /// rest of the pipeline needs.
    pub fn analyze(&self, source: &str) -> Result<AnalyzedProgram, EngineError> {
        let program = argos_dsl::parse_program(source)?;
        let issues = detect_issues(&program);

        let mut facts = Vec::new();
        let mut rules = Vec::new();
        for stmt in &program.statements {
            if let StatementKind::Rule(rule) = &stmt.kind {
                if rule.is_fact() {
                    collect_fact_atoms(rule, &mut facts);
                } else {
                    rules.push(SourceRule {
                        index: stmt.index,
                        text: stmt.text.clone(),
                        rule: rule.clone(),
                    });
                }
            }
        }

        let graph = build_dependency_graph(rules, self.options.grouping.as_deref())?;
        let order = deterministic_topological_sort(&graph)?;
        let transformations = make_transformations(&graph, &order);
        let recursive_hashes = graph
            .recursive
            .iter()
            .enumerate()
            .filter(|(_, r)| **r)
            .map(|(i, _)| graph.containers[i].digest())
            .collect();

        Ok(AnalyzedProgram {
            program_digest: fnv1a64_digest_str(source),
            facts,
            transformations,
            dependency_graph: graph,
            recursive_hashes,
            issues,
        })
    }
}

fn collect_fact_atoms(rule: &Rule, out: &mut Vec<Symbol>) {
    if let Head::Atom(atom) = &rule.head {
        let arg_values: Option<Vec<Vec<Symbol>>> =
            atom.args.iter().map(ground_term_values).collect();
        if let Some(arg_values) = arg_values {
            for combo in cartesian(&arg_values) {
                out.push(Symbol::fun(atom.name.clone(), combo));
            }
        }
    }
}

/// Evaluate a ground term into its value set (intervals expand).
pub fn ground_term_values(term: &Term) -> Option<Vec<Symbol>> {
    match term {
        Term::Number(n) => Some(vec![Symbol::Number(*n)]),
        Term::Str(s) => Some(vec![Symbol::Str(s.clone())]),
        Term::Const(name) => Some(vec![Symbol::constant(name.clone())]),
        Term::Function { name, args } => {
            let arg_values: Option<Vec<Vec<Symbol>>> = args.iter().map(ground_term_values).collect();
            Some(
                cartesian(&arg_values?)
                    .into_iter()
                    .map(|combo| Symbol::fun(name.clone(), combo))
                    .collect(),
            )
        }
        Term::Tuple(items) => {
            let item_values: Option<Vec<Vec<Symbol>>> =
                items.iter().map(ground_term_values).collect();
            Some(
                cartesian(&item_values?)
                    .into_iter()
                    .map(Symbol::tuple)
                    .collect(),
            )
        }
        Term::UnaryMinus(inner) => {
            let values = ground_term_values(inner)?;
            values
                .into_iter()
                .map(|v| v.number().map(|n| Symbol::Number(-n)))
                .collect()
        }
        Term::BinOp { op, lhs, rhs } => {
            let ls = ground_term_values(lhs)?;
            let rs = ground_term_values(rhs)?;
            let mut out = Vec::new();
            for l in &ls {
                for r in &rs {
                    let (l, r) = (l.number()?, r.number()?);
                    let v = match op {
                        argos_dsl::ast::ArithOp::Add => l.checked_add(r)?,
                        argos_dsl::ast::ArithOp::Sub => l.checked_sub(r)?,
                        argos_dsl::ast::ArithOp::Mul => l.checked_mul(r)?,
                        argos_dsl::ast::ArithOp::Div => l.checked_div(r)?,
                        argos_dsl::ast::ArithOp::Mod => l.checked_rem(r)?,
                    };
                    out.push(Symbol::Number(v));
                }
            }
            Some(out)
        }
        Term::Interval { lo, hi } => {
            let los = ground_term_values(lo)?;
            let his = ground_term_values(hi)?;
            let mut out = Vec::new();
            for l in &los {
                for h in &his {
                    let (l, h) = (l.number()?, h.number()?);
                    for n in l..=h {
                        out.push(Symbol::Number(n));
                    }
                }
            }
            Some(out)
        }
        Term::Variable(_) | Term::Anonymous => None,
    }
}

pub fn cartesian(parts: &[Vec<Symbol>]) -> Vec<Vec<Symbol>> {
    let mut out: Vec<Vec<Symbol>> = vec![vec![]];
    for part in parts {
        let mut next = Vec::with_capacity(out.len() * part.len());
        for prefix in &out {
            for value in part {
                let mut row = prefix.clone();
                row.push(value.clone());
                next.push(row);
            }
        }
        out = next;
    }
    out
}

fn detect_issues(program: &Program) -> Vec<ProgramIssue> {
    let mut issues = Vec::new();
    for stmt in &program.statements {
        match &stmt.kind {
            StatementKind::Rule(rule) => {
                if matches!(rule.head, Head::Disjunction(_)) {
                    issues.push(ProgramIssue::new(
                        &stmt.text,
                        IssueCode::DisjunctiveHead,
                        "disjunctive heads cannot be explained",
                    ));
                }
                let mut check = |lit: &Literal| {
                    if let Literal::Theory { text } = lit {
                        issues.push(ProgramIssue::new(
                            &stmt.text,
                            IssueCode::TheoryAtom,
                            format!("theory atom `{text}` cannot be explained"),
                        ));
                    }
                };
                for lit in &rule.body {
                    check(lit);
                    if let Literal::Aggregate { aggregate, .. } = lit {
                        for e in &aggregate.elements {
                            for c in &e.condition {
                                check(c);
                            }
                        }
                    }
                }
                if let Head::Choice { elements, .. } = &rule.head {
                    for e in elements {
                        for c in &e.condition {
                            check(c);
                        }
                    }
                }
            }
            StatementKind::Directive { name, .. } => match name.as_str() {
                "show" | "program" | "defined" | "project" => {}
                "external" => issues.push(ProgramIssue::new(
                    &stmt.text,
                    IssueCode::ExternalDirective,
                    "external atoms cannot be explained",
                )),
                "minimize" | "maximize" | "weak_constraint" => issues.push(ProgramIssue::new(
                    &stmt.text,
                    IssueCode::OptimizationStatement,
                    "optimization statements cannot be explained",
                )),
                "heuristic" => issues.push(ProgramIssue::new(
                    &stmt.text,
                    IssueCode::HeuristicDirective,
                    "heuristic directives cannot be explained",
                )),
                other => issues.push(ProgramIssue::new(
                    &stmt.text,
                    IssueCode::UnsupportedDirective,
                    format!("directive `#{other}` is not supported"),
                )),
            },
            StatementKind::Unparsed { text } => issues.push(ProgramIssue::new(
                text,
                IssueCode::UnsupportedSyntax,
                "statement is outside the supported fragment",
            )),
        }
    }
    issues
}

// ============================================================================
// Graph construction: fold constraints, merge cycles
// ============================================================================

fn edges_between(containers: &[RuleContainer]) -> BTreeSet<(usize, usize)> {
    let mut producers: BTreeMap<(String, usize), Vec<usize>> = BTreeMap::new();
    for (i, c) in containers.iter().enumerate() {
        for sig in c.head_signatures() {
            producers.entry(sig).or_default().push(i);
        }
    }
    let mut edges = BTreeSet::new();
    for (j, c) in containers.iter().enumerate() {
        for sig in c.body_signatures() {
            if let Some(ps) = producers.get(&sig) {
                for &i in ps {
                    edges.insert((i, j));
                }
            }
        }
    }
    edges
}

fn merge_groups(
    containers: Vec<RuleContainer>,
    groups: &[Vec<usize>],
) -> Vec<RuleContainer> {
    // Map container position -> group id; ungrouped containers keep their own.
    let mut merged: Vec<Vec<RuleContainer>> = Vec::new();
    let mut group_of: BTreeMap<usize, usize> = BTreeMap::new();
    for group in groups {
        let gid = merged.len();
        merged.push(Vec::new());
        for &pos in group {
            group_of.insert(pos, gid);
        }
    }
    let mut singles = Vec::new();
    for (pos, c) in containers.into_iter().enumerate() {
        match group_of.get(&pos) {
            Some(&gid) => merged[gid].push(c),
            None => singles.push(c),
        }
    }
    let mut out: Vec<RuleContainer> = merged
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(RuleContainer::merge)
        .collect();
    out.extend(singles);
    out
}

fn build_dependency_graph(
    rules: Vec<SourceRule>,
    grouping: Option<&[Vec<usize>]>,
) -> Result<DependencyGraph, EngineError> {
    // One container per rule initially.
    let mut containers: Vec<RuleContainer> = rules
        .into_iter()
        .map(|r| RuleContainer::new(vec![r]))
        .collect();

    // External grouping override, by statement index.
    if let Some(groups) = grouping {
        let positions: Vec<Vec<usize>> = groups
            .iter()
            .map(|g| {
                containers
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.rules.iter().any(|r| g.contains(&r.index)))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        containers = merge_groups(containers, &positions);
    }

    // Constraint folding: headless rules can never supply a dependency edge,
    // so they merge into one container evaluated last.
    let constraint_positions: Vec<usize> = containers
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_constraint_container())
        .map(|(i, _)| i)
        .collect();
    if constraint_positions.len() > 1 {
        containers = merge_groups(containers, &[constraint_positions]);
    }

    // Recursion handling: merge every non-trivial SCC; flag self-loops.
    let edges = edges_between(&containers);
    let sccs = strongly_connected_components(containers.len(), &edges);
    let mut recursive_flags: Vec<bool> = Vec::new();
    let mut merged: Vec<RuleContainer> = Vec::new();
    let mut old_to_new: Vec<usize> = vec![0; containers.len()];
    let mut taken: Vec<Option<RuleContainer>> = containers.into_iter().map(Some).collect();
    for scc in &sccs {
        let new_id = merged.len();
        let members: Vec<RuleContainer> =
            scc.iter().map(|&i| taken[i].take().expect("scc member")).collect();
        for &i in scc {
            old_to_new[i] = new_id;
        }
        let is_self_loop = scc.len() == 1 && edges.contains(&(scc[0], scc[0]));
        recursive_flags.push(scc.len() > 1 || is_self_loop);
        merged.push(RuleContainer::merge(members));
    }

    let mut new_edges = BTreeSet::new();
    for &(u, v) in &edges {
        let (nu, nv) = (old_to_new[u], old_to_new[v]);
        if nu != nv {
            new_edges.insert((nu, nv));
        }
    }

    Ok(DependencyGraph {
        containers: merged,
        recursive: recursive_flags,
        edges: new_edges,
    })
}

/// Tarjan's algorithm, iterative so deep programs cannot overflow the stack.
fn strongly_connected_components(
    n: usize,
    edges: &BTreeSet<(usize, usize)>,
) -> Vec<Vec<usize>> {
    let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(u, v) in edges {
        if u != v {
            succ[u].push(v);
        }
    }

    let mut index = vec![usize::MAX; n];
    let mut lowlink = vec![usize::MAX; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components: Vec<Vec<usize>> = Vec::new();

    // Explicit DFS frames: (node, next child position).
    for start in 0..n {
        if index[start] != usize::MAX {
            continue;
        }
        let mut frames: Vec<(usize, usize)> = vec![(start, 0)];
        while let Some(&mut (v, ref mut child)) = frames.last_mut() {
            if *child == 0 {
                index[v] = next_index;
                lowlink[v] = next_index;
                next_index += 1;
                stack.push(v);
                on_stack[v] = true;
            }
            if *child < succ[v].len() {
                let w = succ[v][*child];
                *child += 1;
                if index[w] == usize::MAX {
                    frames.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }
            // All children done.
            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                loop {
                    let w = stack.pop().expect("tarjan stack");
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }
    components.sort_by_key(|c| c[0]);
    components
}

// ============================================================================
// Deterministic topological sort
// ============================================================================

/// Iterative Kahn's algorithm. Among all ready containers, the one holding
/// the rule with the lowest source index wins, keeping the produced order
/// close to the author's source order. The constraint container (which has
/// no out-edges) is always placed last.
fn deterministic_topological_sort(graph: &DependencyGraph) -> Result<Vec<usize>, EngineError> {
    let n = graph.containers.len();
    let mut indegree = vec![0usize; n];
    for &(_, v) in &graph.edges {
        indegree[v] += 1;
    }

    let constraint_pos = graph
        .containers
        .iter()
        .position(|c| c.is_constraint_container());

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut remaining_edges = graph.edges.len();

    while !ready.is_empty() {
        let pick = ready
            .iter()
            .copied()
            .filter(|&i| Some(i) != constraint_pos || ready.len() == 1)
            .min_by_key(|&i| graph.containers[i].min_index());
        let pick = match pick {
            Some(p) => p,
            None => *ready.iter().next().expect("non-empty ready set"),
        };
        ready.remove(&pick);
        order.push(pick);
        for next in graph.successors(pick) {
            indegree[next] -= 1;
            remaining_edges -= 1;
            if indegree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() != n {
        // A cycle survived merging; this is an internal defect, not input.
        return Err(EngineError::ResidualCycle {
            remaining: remaining_edges,
        });
    }

    // The constraint container can always move last: it has no successors.
    if let Some(cpos) = constraint_pos {
        if let Some(at) = order.iter().position(|&i| i == cpos) {
            order.remove(at);
            order.push(cpos);
        }
    }

    Ok(order)
}

fn make_transformations(graph: &DependencyGraph, order: &[usize]) -> Vec<Transformation> {
    let mut position = vec![usize::MAX; graph.containers.len()];
    for (p, &c) in order.iter().enumerate() {
        position[c] = p;
    }

    order
        .iter()
        .enumerate()
        .map(|(p, &c)| {
            let lower_bound = graph.predecessors(c).map(|u| position[u]).max();
            let upper_bound = graph.successors(c).map(|v| position[v]).min();
            let container = graph.containers[c].clone();
            let hash = container.digest();
            Transformation {
                id: p + 1,
                rules: container,
                hash,
                adjacent_sort_indices: ReorderWindow {
                    lower_bound,
                    upper_bound,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> AnalyzedProgram {
        ProgramAnalyzer::new(AnalyzeOptions::default())
            .analyze(src)
            .expect("analysis")
    }

    #[test]
    fn facts_never_enter_the_order() {
        let analyzed = analyze("c(1). c(2). a.");
        assert!(analyzed.transformations.is_empty());
        assert_eq!(analyzed.facts.len(), 3);
    }

    #[test]
    fn interval_facts_expand() {
        let analyzed = analyze("n(1..3).");
        let names: Vec<String> = analyzed.facts.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["n(1)", "n(2)", "n(3)"]);
    }

    #[test]
    fn order_follows_dependencies_and_source() {
        let analyzed = analyze("c(1). b(X) :- c(X). a(X) :- b(X). d(X) :- c(X).");
        let texts: Vec<&str> = analyzed
            .transformations
            .iter()
            .map(|t| t.rules.rules()[0].text.as_str())
            .collect();
        assert_eq!(
            texts,
            vec!["b(X) :- c(X).", "a(X) :- b(X).", "d(X) :- c(X)."]
        );
        assert_eq!(analyzed.transformations[0].id, 1);
    }

    #[test]
    fn constraints_fold_into_one_container_placed_last() {
        let analyzed = analyze(
            "a(1). b(X) :- a(X). :- b(2). :- not b(1). c(X) :- b(X).",
        );
        let last = analyzed.transformations.last().expect("transformations");
        assert!(last.rules.is_constraint_container());
        assert_eq!(last.rules.rules().len(), 2);
    }

    #[test]
    fn mutual_recursion_merges_into_one_recursive_container() {
        let analyzed = analyze("p(X) :- q(X). q(X) :- p(X). p(1).");
        assert_eq!(analyzed.transformations.len(), 1);
        assert_eq!(analyzed.transformations[0].rules.rules().len(), 2);
        assert_eq!(analyzed.recursive_hashes.len(), 1);
        assert!(analyzed
            .recursive_hashes
            .contains(&analyzed.transformations[0].hash));
    }

    #[test]
    fn self_loop_is_its_own_recursive_container() {
        let analyzed = analyze("e(1,2). r(X,Y) :- e(X,Y). r(X,Z) :- r(X,Y), e(Y,Z).");
        // The base rule depends only on e/2 and stays separate; the self-loop
        // rule alone forms the recursive container.
        assert_eq!(analyzed.transformations.len(), 2);
        let recursive: Vec<&Transformation> = analyzed
            .transformations
            .iter()
            .filter(|t| analyzed.recursive_hashes.contains(&t.hash))
            .collect();
        assert_eq!(recursive.len(), 1);
        assert_eq!(recursive[0].rules.rules().len(), 1);
        assert_eq!(
            recursive[0].rules.rules()[0].text,
            "r(X,Z) :- r(X,Y), e(Y,Z)."
        );
    }

    #[test]
    fn produced_order_is_topological() {
        let analyzed = analyze(
            "f(1). a(X) :- f(X). b(X) :- a(X). c(X) :- a(X), b(X). :- c(9).",
        );
        let graph = &analyzed.dependency_graph;
        let order: Vec<usize> = analyzed
            .transformations
            .iter()
            .map(|t| {
                graph
                    .containers
                    .iter()
                    .position(|c| c == &t.rules)
                    .expect("container present")
            })
            .collect();
        assert!(graph.is_valid_order(&order));
    }

    #[test]
    fn analysis_is_idempotent_on_hashes() {
        let src = "a(1). b(X) :- a(X). {c(X)} :- b(X). :- c(0).";
        let first: Vec<String> = analyze(src)
            .transformations
            .iter()
            .map(|t| t.hash.clone())
            .collect();
        let second: Vec<String> = analyze(src)
            .transformations
            .iter()
            .map(|t| t.hash.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn hash_is_stable_across_surrounding_order() {
        let a = analyze("f(1). p(X) :- f(X). q(X) :- f(X).");
        let b = analyze("f(1). q(X) :- f(X). p(X) :- f(X).");
        let hashes_a: BTreeSet<String> =
            a.transformations.iter().map(|t| t.hash.clone()).collect();
        let hashes_b: BTreeSet<String> =
            b.transformations.iter().map(|t| t.hash.clone()).collect();
        assert_eq!(hashes_a, hashes_b);
    }

    #[test]
    fn reorder_windows_track_neighbors() {
        let analyzed = analyze("f(1). a(X) :- f(X). b(X) :- a(X). c(X) :- f(X).");
        // Order: a (pos 0), b (pos 1), c (pos 2) by source.
        let b = &analyzed.transformations[1];
        assert_eq!(b.adjacent_sort_indices.lower_bound, Some(0));
        assert_eq!(b.adjacent_sort_indices.upper_bound, None);
        let a = &analyzed.transformations[0];
        assert_eq!(a.adjacent_sort_indices.lower_bound, None);
        assert_eq!(a.adjacent_sort_indices.upper_bound, Some(1));
    }

    #[test]
    fn move_transformation_validates_against_dependencies() {
        let analyzed = analyze("f(1). a(X) :- f(X). b(X) :- a(X). c(X) :- f(X).");
        // Moving c before a is legal; moving b before a is not.
        let moved = analyzed.move_transformation(2, 0).expect("legal move");
        assert_eq!(moved[0].rules.rules()[0].text, "c(X) :- f(X).");
        assert_eq!(moved[0].id, 1);
        assert!(analyzed.move_transformation(1, 0).is_err());
    }

    #[test]
    fn unsupported_constructs_are_flagged_not_fatal() {
        let analyzed = analyze("a ; b :- c. #external d. a :- &diff { X } <= 3. ok.");
        let codes: Vec<IssueCode> = analyzed.issues.iter().map(|i| i.code).collect();
        assert!(codes.contains(&IssueCode::DisjunctiveHead));
        assert!(codes.contains(&IssueCode::ExternalDirective));
        assert!(codes.contains(&IssueCode::TheoryAtom));
        assert!(!analyzed.can_build_graph());
        // The rest of the program still analyzed.
        assert_eq!(analyzed.facts.len(), 1);
    }

    #[test]
    fn grouping_override_premerges_containers() {
        let options = AnalyzeOptions {
            grouping: Some(vec![vec![1, 2]]),
        };
        let analyzed = ProgramAnalyzer::new(options)
            .analyze("f(1). a(X) :- f(X). b(X) :- f(X).")
            .expect("analysis");
        assert_eq!(analyzed.transformations.len(), 1);
        assert_eq!(analyzed.transformations[0].rules.rules().len(), 2);
    }
}
