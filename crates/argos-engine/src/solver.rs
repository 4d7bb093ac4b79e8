//! Replay solving for reified transformations.
//!
//! Reified rules are guarded by `__model(Head)`, so every solve is a
//! deterministic bottom-up fixpoint over the target model's atoms; no search
//! is involved. `GroundSolver` is the seam that keeps an external grounding
//! engine pluggable; `BottomUpSolver` is the built-in evaluator for the
//! reified fragment.
//!
//! Negation is evaluated against the target model, never against the
//! partially derived set. Because transformations are solved in dependency
//! order, every producer of a negated atom has already run, so membership in
//! the model is the correct stable-model reading.

use argos_dsl::ast::{
    Aggregate, AggregateFunction, Atom, CmpOp, Head, Literal, Rule, Sign, Term,
};
use argos_dsl::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::dependency::{cartesian, ground_term_values};

pub type Binding = BTreeMap<String, Symbol>;

/// A set of ground atoms indexed by predicate signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtomSet {
    all: BTreeSet<Symbol>,
    by_signature: BTreeMap<(String, usize), BTreeSet<Symbol>>,
}

impl AtomSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut set = Self::new();
        for s in symbols {
            set.insert(s);
        }
        set
    }

    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if let Some((name, arity)) = symbol.signature() {
            self.by_signature
                .entry((name.to_string(), arity))
                .or_default()
                .insert(symbol.clone());
        }
        self.all.insert(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.all.contains(symbol)
    }

    pub fn with_signature(
        &self,
        signature: &(String, usize),
    ) -> impl Iterator<Item = &Symbol> + '_ {
        self.by_signature
            .get(signature)
            .into_iter()
            .flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.all.iter()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

impl FromIterator<Symbol> for AtomSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self::from_symbols(iter)
    }
}

/// The ground-and-solve seam. Implementations derive consequences of the
/// reified rules over a base atom set, with negation read against the
/// target model.
pub trait GroundSolver {
    /// All ground consequences of `rules` over `base`. Positive literals
    /// whose signature is in `frozen` match only atoms already in `base`,
    /// which turns each call into one fixpoint round for recursive
    /// transformations.
    fn derive(
        &self,
        rules: &[Rule],
        base: &AtomSet,
        model: &BTreeSet<Symbol>,
        frozen: &BTreeSet<(String, usize)>,
    ) -> AtomSet;

    /// Does any instantiation of `body` hold over `atoms`? Used for
    /// constraint checks: a satisfiable constraint body means unsat.
    fn satisfiable(&self, body: &[Literal], atoms: &AtomSet, model: &BTreeSet<Symbol>) -> bool;
}

/// Built-in naive-fixpoint evaluator for the reified fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct BottomUpSolver;

struct Ctx<'a> {
    derived: &'a AtomSet,
    base: &'a AtomSet,
    model: &'a BTreeSet<Symbol>,
    frozen: &'a BTreeSet<(String, usize)>,
}

impl GroundSolver for BottomUpSolver {
    fn derive(
        &self,
        rules: &[Rule],
        base: &AtomSet,
        model: &BTreeSet<Symbol>,
        frozen: &BTreeSet<(String, usize)>,
    ) -> AtomSet {
        let mut derived = base.clone();
        loop {
            let mut fresh: Vec<Symbol> = Vec::new();
            {
                let ctx = Ctx {
                    derived: &derived,
                    base,
                    model,
                    frozen,
                };
                for rule in rules {
                    let head = match &rule.head {
                        Head::Atom(atom) => atom,
                        _ => continue,
                    };
                    for binding in solve_body(&rule.body, Binding::new(), &ctx) {
                        fresh.extend(instantiate_head(head, &binding));
                    }
                }
            }
            let mut changed = false;
            for symbol in fresh {
                if derived.insert(symbol) {
                    changed = true;
                }
            }
            if !changed {
                return derived;
            }
        }
    }

    fn satisfiable(&self, body: &[Literal], atoms: &AtomSet, model: &BTreeSet<Symbol>) -> bool {
        let frozen = BTreeSet::new();
        let ctx = Ctx {
            derived: atoms,
            base: atoms,
            model,
            frozen: &frozen,
        };
        !solve_body(body, Binding::new(), &ctx).is_empty()
    }
}

// ============================================================================
// Body evaluation
// ============================================================================

/// All bindings satisfying `body`, extending `binding`. Literals are picked
/// by readiness, not source order: joins first, then ground negations, then
/// aggregates, so variable bindings flow left to right regardless of how the
/// author arranged the body.
fn solve_body(body: &[Literal], binding: Binding, ctx: &Ctx<'_>) -> Vec<Binding> {
    if body.is_empty() {
        return vec![binding];
    }
    let pick = match pick_literal(body, &binding) {
        Some(i) => i,
        None => {
            warn!(body = %render_body(body), "no evaluable literal; body treated as unsatisfiable");
            return Vec::new();
        }
    };
    let rest: Vec<Literal> = body
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != pick)
        .map(|(_, l)| l.clone())
        .collect();
    let mut out = Vec::new();
    for extended in eval_literal(&body[pick], binding, ctx) {
        out.extend(solve_body(&rest, extended, ctx));
    }
    out
}

fn render_body(body: &[Literal]) -> String {
    body.iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn pick_literal(body: &[Literal], binding: &Binding) -> Option<usize> {
    let mut best: Option<(u8, usize)> = None;
    for (i, lit) in body.iter().enumerate() {
        let class = readiness(lit, binding);
        if class < 3 && best.map_or(true, |(c, _)| class < c) {
            best = Some((class, i));
            if class == 0 {
                break;
            }
        }
    }
    best.map(|(_, i)| i)
}

fn readiness(lit: &Literal, binding: &Binding) -> u8 {
    match lit {
        Literal::Atom { sign, atom } => match sign {
            Sign::Positive => 0,
            _ if atom.args.iter().all(|t| term_is_bound(t, binding)) => 1,
            _ => 3,
        },
        Literal::Comparison { sign, comparison } => {
            let lhs = term_is_bound(&comparison.lhs, binding);
            let rhs = term_is_bound(&comparison.rhs, binding);
            if lhs && rhs {
                0
            } else if *sign == Sign::Positive
                && comparison.op == CmpOp::Eq
                && (lhs || rhs)
                && (unbound_variable(&comparison.lhs, binding).is_some()
                    || unbound_variable(&comparison.rhs, binding).is_some())
            {
                0
            } else {
                3
            }
        }
        Literal::Aggregate { .. } => 2,
        Literal::Theory { .. } => 3,
    }
}

fn term_is_bound(term: &Term, binding: &Binding) -> bool {
    if term.contains_anonymous() {
        return false;
    }
    let mut vars = BTreeSet::new();
    term.variables(&mut vars);
    vars.iter().all(|v| binding.contains_key(v))
}

fn unbound_variable<'a>(term: &'a Term, binding: &Binding) -> Option<&'a str> {
    match term {
        Term::Variable(name) if !binding.contains_key(name) => Some(name),
        _ => None,
    }
}

fn eval_literal(lit: &Literal, binding: Binding, ctx: &Ctx<'_>) -> Vec<Binding> {
    match lit {
        Literal::Atom { sign, atom } => match sign {
            Sign::Positive => match_positive(atom, &binding, ctx),
            Sign::Negated => check_membership(atom, binding, ctx, false),
            Sign::DoubleNegated => check_membership(atom, binding, ctx, true),
        },
        Literal::Comparison { sign, comparison } => {
            eval_comparison(&comparison.lhs, comparison.op, &comparison.rhs, *sign, binding)
        }
        Literal::Aggregate { sign, aggregate } => eval_aggregate(aggregate, *sign, binding, ctx),
        Literal::Theory { .. } => Vec::new(),
    }
}

fn match_positive(atom: &Atom, binding: &Binding, ctx: &Ctx<'_>) -> Vec<Binding> {
    let signature = atom.signature();
    let source = if ctx.frozen.contains(&signature) {
        ctx.base
    } else {
        ctx.derived
    };
    let mut out = Vec::new();
    'candidates: for candidate in source.with_signature(&signature) {
        let args = candidate.args();
        let mut extended = binding.clone();
        for (pattern, value) in atom.args.iter().zip(args) {
            match unify(pattern, value, extended) {
                Some(b) => extended = b,
                None => continue 'candidates,
            }
        }
        out.push(extended);
    }
    out
}

/// Unify a (possibly non-ground) term against a ground symbol.
fn unify(pattern: &Term, value: &Symbol, mut binding: Binding) -> Option<Binding> {
    match pattern {
        Term::Variable(name) => match binding.get(name) {
            Some(bound) => (bound == value).then_some(binding),
            None => {
                binding.insert(name.clone(), value.clone());
                Some(binding)
            }
        },
        Term::Anonymous => Some(binding),
        Term::Number(n) => matches!(value, Symbol::Number(m) if m == n).then_some(binding),
        Term::Str(s) => matches!(value, Symbol::Str(v) if v == s).then_some(binding),
        Term::Const(name) => match value {
            Symbol::Fun { name: vn, args } if vn == name && args.is_empty() => Some(binding),
            _ => None,
        },
        Term::Function { name, args } => match value {
            Symbol::Fun { name: vn, args: vargs } if vn == name && vargs.len() == args.len() => {
                for (p, v) in args.iter().zip(vargs) {
                    binding = unify(p, v, binding)?;
                }
                Some(binding)
            }
            _ => None,
        },
        Term::Tuple(items) => match value {
            Symbol::Fun { name, args } if name.is_empty() && args.len() == items.len() => {
                for (p, v) in items.iter().zip(args) {
                    binding = unify(p, v, binding)?;
                }
                Some(binding)
            }
            _ => None,
        },
        // Arithmetic and intervals unify by evaluation; unbound operands
        // cannot be inverted.
        Term::BinOp { .. } | Term::UnaryMinus(_) | Term::Interval { .. } => {
            let values = eval_values(pattern, &binding)?;
            values.contains(value).then_some(binding)
        }
    }
}

/// Evaluate a term to its ground value set under `binding`. `None` when the
/// term still has unbound variables or the arithmetic is undefined.
fn eval_values(term: &Term, binding: &Binding) -> Option<Vec<Symbol>> {
    ground_term_values(&substitute(term, binding))
}

fn substitute(term: &Term, binding: &Binding) -> Term {
    match term {
        Term::Variable(name) => match binding.get(name) {
            Some(symbol) => symbol.to_term(),
            None => term.clone(),
        },
        Term::Function { name, args } => Term::Function {
            name: name.clone(),
            args: args.iter().map(|t| substitute(t, binding)).collect(),
        },
        Term::Tuple(items) => Term::Tuple(items.iter().map(|t| substitute(t, binding)).collect()),
        Term::BinOp { op, lhs, rhs } => Term::BinOp {
            op: *op,
            lhs: Box::new(substitute(lhs, binding)),
            rhs: Box::new(substitute(rhs, binding)),
        },
        Term::UnaryMinus(inner) => Term::UnaryMinus(Box::new(substitute(inner, binding))),
        Term::Interval { lo, hi } => Term::Interval {
            lo: Box::new(substitute(lo, binding)),
            hi: Box::new(substitute(hi, binding)),
        },
        _ => term.clone(),
    }
}

/// Negation-as-failure against the target model. Interval arguments expand;
/// every instance must pass.
fn check_membership(
    atom: &Atom,
    binding: Binding,
    ctx: &Ctx<'_>,
    expect_present: bool,
) -> Vec<Binding> {
    let values = match eval_values(&atom.to_term(), &binding) {
        Some(v) => v,
        None => {
            warn!(atom = %atom, "negated atom not ground at evaluation time");
            return Vec::new();
        }
    };
    let holds = values
        .iter()
        .all(|v| ctx.model.contains(v) == expect_present);
    if holds {
        vec![binding]
    } else {
        Vec::new()
    }
}

fn eval_comparison(
    lhs: &Term,
    op: CmpOp,
    rhs: &Term,
    sign: Sign,
    binding: Binding,
) -> Vec<Binding> {
    let lvals = eval_values(lhs, &binding);
    let rvals = eval_values(rhs, &binding);
    match (lvals, rvals) {
        (Some(ls), Some(rs)) => {
            let satisfied = ls.iter().any(|a| rs.iter().any(|b| cmp_holds(op, a, b)));
            let keep = match sign {
                Sign::Negated => !satisfied,
                _ => satisfied,
            };
            if keep {
                vec![binding]
            } else {
                Vec::new()
            }
        }
        // `X = ground` binds; intervals enumerate.
        (None, Some(values)) if sign == Sign::Positive && op == CmpOp::Eq => {
            bind_each(lhs, values, binding)
        }
        (Some(values), None) if sign == Sign::Positive && op == CmpOp::Eq => {
            bind_each(rhs, values, binding)
        }
        _ => {
            warn!(
                comparison = %format!("{lhs}{op}{rhs}"),
                "comparison not evaluable; treated as unsatisfiable"
            );
            Vec::new()
        }
    }
}

fn bind_each(target: &Term, values: Vec<Symbol>, binding: Binding) -> Vec<Binding> {
    let name = match target {
        Term::Variable(name) => name,
        _ => {
            warn!(term = %target, "assignment target is not a variable");
            return Vec::new();
        }
    };
    values
        .into_iter()
        .map(|v| {
            let mut b = binding.clone();
            b.insert(name.clone(), v);
            b
        })
        .collect()
}

fn cmp_holds(op: CmpOp, a: &Symbol, b: &Symbol) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Neq => a != b,
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Evaluate an aggregate literal: solve each element's condition, collect
/// the distinct term tuples, fold with the aggregate function, then apply
/// (or bind through) the guards.
fn eval_aggregate(
    aggregate: &Aggregate,
    sign: Sign,
    binding: Binding,
    ctx: &Ctx<'_>,
) -> Vec<Binding> {
    let mut tuples: BTreeSet<Vec<Symbol>> = BTreeSet::new();
    for element in &aggregate.elements {
        for solution in solve_body(&element.condition, binding.clone(), ctx) {
            let parts: Option<Vec<Vec<Symbol>>> = element
                .terms
                .iter()
                .map(|t| eval_values(t, &solution))
                .collect();
            match parts {
                Some(parts) => {
                    for tuple in cartesian(&parts) {
                        tuples.insert(tuple);
                    }
                }
                None => {
                    warn!("aggregate element terms not ground under condition solution");
                }
            }
        }
    }

    let value = aggregate_value(aggregate.function, &tuples);
    let value = match value {
        Some(v) => v,
        // min/max over the empty set has no finite value; the guard can
        // never hold.
        None => {
            return match sign {
                Sign::Negated => vec![binding],
                _ => Vec::new(),
            };
        }
    };

    apply_guards(aggregate, &value, sign, binding)
}

fn aggregate_value(
    function: AggregateFunction,
    tuples: &BTreeSet<Vec<Symbol>>,
) -> Option<Symbol> {
    match function {
        AggregateFunction::Count => Some(Symbol::Number(tuples.len() as i64)),
        AggregateFunction::Sum => Some(Symbol::Number(
            tuples
                .iter()
                .filter_map(|t| t.first().and_then(|s| s.number()))
                .sum(),
        )),
        AggregateFunction::Min => tuples.iter().filter_map(|t| t.first()).min().cloned(),
        AggregateFunction::Max => tuples.iter().filter_map(|t| t.first()).max().cloned(),
    }
}

fn apply_guards(
    aggregate: &Aggregate,
    value: &Symbol,
    sign: Sign,
    binding: Binding,
) -> Vec<Binding> {
    // An Eq guard with an unbound variable binds the computed value; only
    // legal under a positive sign.
    let original = binding.clone();
    let mut bindings = vec![binding];

    for (guard, value_on_left) in [(&aggregate.left, false), (&aggregate.right, true)] {
        let guard = match guard {
            Some(g) => g,
            None => continue,
        };
        let mut next = Vec::new();
        for b in bindings {
            match eval_values(&guard.term, &b) {
                Some(terms) => {
                    let ok = terms.iter().any(|t| {
                        if value_on_left {
                            cmp_holds(guard.op, value, t)
                        } else {
                            cmp_holds(guard.op, t, value)
                        }
                    });
                    if ok {
                        next.push(b);
                    }
                }
                None if guard.op == CmpOp::Eq && sign == Sign::Positive => {
                    match unbound_variable(&guard.term, &b) {
                        Some(name) => {
                            let mut bound = b.clone();
                            bound.insert(name.to_string(), value.clone());
                            next.push(bound);
                        }
                        None => {
                            warn!(term = %guard.term, "aggregate guard not evaluable");
                        }
                    }
                }
                None => {
                    warn!(term = %guard.term, "aggregate guard not evaluable");
                }
            }
        }
        bindings = next;
    }

    match sign {
        Sign::Negated => {
            // Negation binds nothing; it holds exactly when no guard path
            // survived.
            if bindings.is_empty() {
                vec![original]
            } else {
                Vec::new()
            }
        }
        _ => bindings,
    }
}

fn instantiate_head(head: &Atom, binding: &Binding) -> Vec<Symbol> {
    let parts: Option<Vec<Vec<Symbol>>> =
        head.args.iter().map(|t| eval_values(t, binding)).collect();
    match parts {
        Some(parts) => cartesian(&parts)
            .into_iter()
            .map(|args| Symbol::fun(head.name.clone(), args))
            .collect(),
        None => {
            warn!(head = %head, "head not ground after body solving; rule is unsafe");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{AnalyzeOptions, ProgramAnalyzer};
    use crate::reify::{Reifier, MODEL_PREDICATE};
    use argos_dsl::parser::parse_model;

    fn symbols(text: &str) -> BTreeSet<Symbol> {
        parse_model(text).expect("model").into_iter().collect()
    }

    /// Analyze, reify, and derive the first transformation over `facts`
    /// against `model`.
    fn derive_first(src: &str, facts: &str, model: &str) -> AtomSet {
        let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default())
            .analyze(src)
            .expect("analysis");
        let mut reifier = Reifier::for_transformations(&analyzed.transformations);
        let t = &analyzed.transformations[0];
        let reified = reifier.reify(t, false);
        let model = symbols(model);
        let mut base = AtomSet::from_symbols(symbols(facts));
        for atom in &model {
            base.insert(Symbol::fun(MODEL_PREDICATE.to_string(), vec![atom.clone()]));
        }
        BottomUpSolver.derive(&reified.rules, &base, &model, &BTreeSet::new())
    }

    fn contains(set: &AtomSet, text: &str) -> bool {
        set.iter().any(|s| s.to_string() == text)
    }

    #[test]
    fn derives_guarded_heads_and_marks() {
        let derived = derive_first(
            "c(1). c(2). b(X) :- c(X).",
            "c(1). c(2).",
            "c(1). c(2). b(1). b(2).",
        );
        assert!(contains(&derived, "b(1)"));
        assert!(contains(&derived, "b(2)"));
        assert!(contains(&derived, "__h(1,2,b(1),(pos(c(1)),))"));
        assert!(contains(&derived, "__h(1,2,b(2),(pos(c(2)),))"));
    }

    #[test]
    fn model_guard_blocks_atoms_outside_the_model() {
        let derived = derive_first(
            "c(1). c(2). b(X) :- c(X).",
            "c(1). c(2).",
            "c(1). c(2). b(1).",
        );
        assert!(contains(&derived, "b(1)"));
        assert!(!contains(&derived, "b(2)"));
    }

    #[test]
    fn negation_reads_the_target_model() {
        let derived = derive_first(
            "c(1). c(2). d(2). b(X) :- c(X), not d(X).",
            "c(1). c(2). d(2).",
            "c(1). c(2). d(2). b(1).",
        );
        assert!(contains(&derived, "b(1)"));
        assert!(!contains(&derived, "b(2)"));
    }

    #[test]
    fn equality_binds_and_arithmetic_evaluates() {
        let derived = derive_first(
            "c(1). b(Y) :- c(X), Y = X+1.",
            "c(1).",
            "c(1). b(2).",
        );
        assert!(contains(&derived, "b(2)"));
    }

    #[test]
    fn interval_equality_enumerates() {
        let derived = derive_first(
            "c(1). b(X) :- c(_), X = 1..3.",
            "c(1).",
            "c(1). b(1). b(2). b(3).",
        );
        assert!(contains(&derived, "b(1)"));
        assert!(contains(&derived, "b(2)"));
        assert!(contains(&derived, "b(3)"));
    }

    #[test]
    fn body_order_does_not_matter() {
        let derived = derive_first(
            "c(1). b(X) :- X < 2, c(X).",
            "c(1).",
            "c(1). b(1).",
        );
        assert!(contains(&derived, "b(1)"));
    }

    #[test]
    fn count_aggregate_with_binding_guard() {
        let derived = derive_first(
            "p(1). p(2). q(N) :- N = #count { X : p(X) }.",
            "p(1). p(2).",
            "p(1). p(2). q(2).",
        );
        assert!(contains(&derived, "q(2)"));
        assert!(contains(&derived, "__agg(1,1,none,count,2)"));
        assert!(contains(&derived, "__agg_elem(1,1,none,(1,),(pos(p(1)),))"));
        assert!(contains(&derived, "__agg_elem(1,1,none,(2,),(pos(p(2)),))"));
    }

    #[test]
    fn sum_aggregate_respects_bounds() {
        let derived = derive_first(
            "p(1). p(2). q(ok) :- 3 <= #sum { X : p(X) } <= 3.",
            "p(1). p(2).",
            "p(1). p(2). q(ok).",
        );
        assert!(contains(&derived, "q(ok)"));
    }

    #[test]
    fn failing_aggregate_guard_blocks_derivation() {
        let derived = derive_first(
            "p(1). q(ok) :- 2 <= #count { X : p(X) }.",
            "p(1).",
            "p(1). q(ok).",
        );
        assert!(!contains(&derived, "q(ok)"));
    }

    #[test]
    fn frozen_signatures_give_one_round_per_call() {
        let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default())
            .analyze("e(1,2). e(2,3). e(3,4). r(X,Y) :- e(X,Y). r(X,Z) :- r(X,Y), e(Y,Z).")
            .expect("analysis");
        let mut reifier = Reifier::for_transformations(&analyzed.transformations);
        // transformations[1] is the self-loop; the base rule already ran, so
        // its r atoms sit in the base set.
        let t = &analyzed.transformations[1];
        assert!(analyzed.recursive_hashes.contains(&t.hash));
        let reified = reifier.reify(t, true);
        let model =
            symbols("e(1,2). e(2,3). e(3,4). r(1,2). r(2,3). r(3,4). r(1,3). r(2,4). r(1,4).");
        let mut base =
            AtomSet::from_symbols(symbols("e(1,2). e(2,3). e(3,4). r(1,2). r(2,3). r(3,4)."));
        for atom in &model {
            base.insert(Symbol::fun(MODEL_PREDICATE.to_string(), vec![atom.clone()]));
        }
        let round1 = BottomUpSolver.derive(&reified.rules, &base, &model, &reified.head_signatures);
        assert!(contains(&round1, "r(1,3)"));
        assert!(contains(&round1, "r(2,4)"));
        assert!(!contains(&round1, "r(1,4)"));
        let round2 =
            BottomUpSolver.derive(&reified.rules, &round1, &model, &reified.head_signatures);
        assert!(contains(&round2, "r(1,4)"));
    }

    #[test]
    fn satisfiable_detects_violated_constraints() {
        let atoms = AtomSet::from_symbols(symbols("b(1). b(2)."));
        let model = symbols("b(1). b(2).");
        let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default())
            .analyze("b(1). :- b(2). :- b(3).")
            .expect("analysis");
        let mut reifier = Reifier::for_transformations(&analyzed.transformations);
        let t = &analyzed.transformations[0];
        let reified = reifier.reify(t, false);
        let violated: Vec<bool> = reified
            .checks
            .iter()
            .map(|c| BottomUpSolver.satisfiable(&c.body, &atoms, &model))
            .collect();
        assert_eq!(violated, vec![true, false]);
    }
}
