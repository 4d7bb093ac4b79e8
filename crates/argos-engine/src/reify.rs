//! Reification: rewriting a transformation's rules so that re-solving them
//! records *why* each head atom holds.
//!
//! Every reified construct lives in the reserved `__` namespace:
//!
//! - `__h(C, R, Head, (tokens))` marks one firing of rule `R` in
//!   transformation `C`. The body is guarded by `__model(Head)` so only
//!   derivations present in the target model fire.
//! - `Head :- __h(_, _, Head, _).` re-derives the plain atom so later rules
//!   in the same solve can consume it.
//! - `__agg`, `__agg_bound` and `__agg_elem` record an aggregate's value,
//!   bounds and contributing elements for the resolver.
//!
//! Constraints are never reified; they pass through as checks whose bodies
//! are re-solved directly.

use crate::dependency::Transformation;
use argos_dsl::ast::{Aggregate, Atom, CmpOp, Guard, Head, Literal, Rule, Sign, Term};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MARKED_PREDICATE: &str = "__h";
pub const MODEL_PREDICATE: &str = "__model";
pub const AGGREGATE_PREDICATE: &str = "__agg";
pub const AGGREGATE_BOUND_PREDICATE: &str = "__agg_bound";
pub const AGGREGATE_ELEMENT_PREDICATE: &str = "__agg_elem";

/// One transformation rewritten for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReifiedTransformation {
    /// Transformation number, matching `Transformation::id`.
    pub id: usize,
    pub hash: String,
    pub recursive: bool,
    /// Marked rules, re-derivation rules and aggregate auxiliaries.
    pub rules: Vec<Rule>,
    /// Constraint bodies; any satisfiable instantiation means unsat.
    pub checks: Vec<Rule>,
    /// Head signatures of the original container. For recursive
    /// transformations these are the frozen predicates of each fixpoint
    /// round.
    pub head_signatures: BTreeSet<(String, usize)>,
}

/// Fresh-variable source. The base prefix is chosen once per build so it
/// collides with no program variable; occurrences are then numbered.
#[derive(Debug, Clone)]
pub struct FreshVariables {
    base: String,
    counter: usize,
}

impl FreshVariables {
    pub fn new<'a>(reserved: impl Iterator<Item = &'a str> + Clone) -> Self {
        let mut base = String::from("ANON");
        while reserved.clone().any(|name| name.starts_with(&base)) {
            base.push('_');
        }
        Self { base, counter: 0 }
    }

    pub fn fresh(&mut self) -> String {
        self.counter += 1;
        format!("{}{}", self.base, self.counter)
    }
}

/// Rewrites transformations. The aggregate counter is owned by the instance,
/// so two concurrent builds can never interleave numbering.
pub struct Reifier {
    aggregate_counter: usize,
    fresh: FreshVariables,
}

impl Reifier {
    pub fn new(fresh: FreshVariables) -> Self {
        Self {
            aggregate_counter: 0,
            fresh,
        }
    }

    /// Build a reifier whose fresh names avoid every variable occurring in
    /// `transformations`.
    pub fn for_transformations(transformations: &[Transformation]) -> Self {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for t in transformations {
            for r in t.rules.rules() {
                r.rule.variables(&mut names);
            }
        }
        let fresh = FreshVariables::new(names.iter().map(|s| s.as_str()));
        Self::new(fresh)
    }

    pub fn reify(&mut self, t: &Transformation, recursive: bool) -> ReifiedTransformation {
        let mut rules = Vec::new();
        let mut checks = Vec::new();
        let mut head_signatures = BTreeSet::new();

        for source in t.rules.rules() {
            let mut rule = source.rule.clone();
            rename_anonymous_in_rule(&mut rule, &mut self.fresh);

            if rule.is_constraint() {
                checks.push(rule);
                continue;
            }
            for atom in rule.head.atoms() {
                head_signatures.insert(atom.signature());
            }

            match &rule.head {
                Head::Atom(atom) => {
                    let (body_tokens, aux) = self.body_tokens(t.id, &rule.body, &rule);
                    rules.push(marked_rule(t.id, source.index, atom, &rule.body, &[], body_tokens));
                    rules.push(rederivation_rule(atom));
                    rules.extend(aux);
                }
                Head::Choice { elements, .. } => {
                    // One marked rule per element; cardinality bounds are
                    // already satisfied by the target model.
                    for element in elements {
                        let (mut tokens, aux) = self.body_tokens(t.id, &rule.body, &rule);
                        let (cond_tokens, cond_aux) =
                            self.body_tokens(t.id, &element.condition, &rule);
                        tokens.extend(cond_tokens);
                        rules.push(marked_rule(
                            t.id,
                            source.index,
                            &element.atom,
                            &rule.body,
                            &element.condition,
                            tokens,
                        ));
                        rules.push(rederivation_rule(&element.atom));
                        rules.extend(aux);
                        rules.extend(cond_aux);
                    }
                }
                Head::None | Head::Disjunction(_) => {
                    // Constraints were handled above; disjunctions are
                    // rejected during analysis and never reach reification.
                }
            }
        }

        ReifiedTransformation {
            id: t.id,
            hash: t.hash.clone(),
            recursive,
            rules,
            checks,
            head_signatures,
        }
    }

    /// Tokens for a literal sequence, plus the auxiliary rules any contained
    /// aggregates need. `rule` supplies the shared-variable context.
    fn body_tokens(
        &mut self,
        component: usize,
        body: &[Literal],
        rule: &Rule,
    ) -> (Vec<Term>, Vec<Rule>) {
        let mut tokens = Vec::with_capacity(body.len());
        let mut aux = Vec::new();
        for lit in body {
            match lit {
                Literal::Atom { sign, atom } => {
                    let name = match sign {
                        Sign::Positive => "pos",
                        Sign::Negated => "neg",
                        Sign::DoubleNegated => "double_neg",
                    };
                    tokens.push(Term::Function {
                        name: name.to_string(),
                        args: vec![atom.to_term()],
                    });
                }
                Literal::Comparison { sign, comparison } => {
                    let mut vars = BTreeSet::new();
                    comparison.lhs.variables(&mut vars);
                    comparison.rhs.variables(&mut vars);
                    tokens.push(comp_term(
                        &vars,
                        format!("{}{}", sign.prefix(), comparison),
                    ));
                }
                Literal::Aggregate { sign, aggregate } => {
                    self.aggregate_counter += 1;
                    let number = self.aggregate_counter;
                    let dependent = dependent_term(aggregate, rule, lit);
                    let sign_name = match sign {
                        Sign::Positive => "pos",
                        Sign::Negated => "neg",
                        Sign::DoubleNegated => "double_neg",
                    };
                    tokens.push(Term::Function {
                        name: "body_aggregate".to_string(),
                        args: vec![
                            Term::Number(component as i64),
                            Term::Number(number as i64),
                            dependent.clone(),
                            Term::Const(sign_name.to_string()),
                        ],
                    });
                    aux.extend(self.aggregate_rules(
                        component, number, dependent, aggregate, rule, lit,
                    ));
                }
                Literal::Theory { .. } => {
                    // Rejected during analysis.
                }
            }
        }
        (tokens, aux)
    }

    /// Auxiliary rules recording one aggregate's value, bounds and elements.
    /// `ctx` is the rule's non-aggregate body, so the auxiliaries only fire
    /// where the enclosing rule could.
    fn aggregate_rules(
        &mut self,
        component: usize,
        number: usize,
        dependent: Term,
        aggregate: &Aggregate,
        rule: &Rule,
        this: &Literal,
    ) -> Vec<Rule> {
        let ctx: Vec<Literal> = rule
            .body
            .iter()
            .filter(|l| !std::ptr::eq(*l, this) && !matches!(l, Literal::Aggregate { .. }))
            .cloned()
            .collect();
        let key = vec![
            Term::Number(component as i64),
            Term::Number(number as i64),
            dependent,
        ];
        let mut out = Vec::new();

        // __agg(C, A, D, op, Value) :- ctx, Value = #op{elements}.
        let value_var = self.fresh.fresh();
        let mut value_body = ctx.clone();
        value_body.push(Literal::Aggregate {
            sign: Sign::Positive,
            aggregate: Aggregate {
                left: Some(Guard {
                    op: CmpOp::Eq,
                    term: Term::Variable(value_var.clone()),
                }),
                function: aggregate.function,
                elements: aggregate.elements.clone(),
                right: None,
            },
        });
        let mut value_args = key.clone();
        value_args.push(Term::Const(aggregate.function.to_string().trim_start_matches('#').to_string()));
        value_args.push(Term::Variable(value_var));
        out.push(Rule {
            head: Head::Atom(Atom {
                name: AGGREGATE_PREDICATE.to_string(),
                args: value_args,
            }),
            body: value_body,
        });

        // __agg_bound(C, A, D, side, "op", comp(bindings, "term")) :- ctx.
        // Skipped when the guard term's variables are not bound by ctx (a
        // value-binding guard like `N =` describes the aggregate's own
        // output, not an input bound).
        let mut ctx_vars = BTreeSet::new();
        for lit in &ctx {
            lit.variables(&mut ctx_vars);
        }
        for (side, guard) in [("left", &aggregate.left), ("right", &aggregate.right)] {
            if let Some(guard) = guard {
                let mut vars = BTreeSet::new();
                guard.term.variables(&mut vars);
                if !vars.is_subset(&ctx_vars) {
                    continue;
                }
                let mut args = key.clone();
                args.push(Term::Const(side.to_string()));
                args.push(Term::Str(guard.op.to_string()));
                args.push(comp_term(&vars, guard.term.to_string()));
                out.push(Rule {
                    head: Head::Atom(Atom {
                        name: AGGREGATE_BOUND_PREDICATE.to_string(),
                        args,
                    }),
                    body: ctx.clone(),
                });
            }
        }

        // __agg_elem(C, A, D, (terms), (condition tokens)) :- ctx, condition.
        for element in &aggregate.elements {
            let (cond_tokens, cond_aux) = self.body_tokens(component, &element.condition, rule);
            let mut args = key.clone();
            args.push(Term::Tuple(element.terms.clone()));
            args.push(Term::Tuple(cond_tokens));
            let mut body = ctx.clone();
            body.extend(element.condition.iter().cloned());
            out.push(Rule {
                head: Head::Atom(Atom {
                    name: AGGREGATE_ELEMENT_PREDICATE.to_string(),
                    args,
                }),
                body,
            });
            out.extend(cond_aux);
        }
        out
    }
}

/// `comp(((name, Var), ...), "text")`: the bindings tuple pairs each
/// variable's name with its (later ground) value, so the resolver can
/// substitute values back into the rendered text.
fn comp_term(vars: &BTreeSet<String>, text: String) -> Term {
    Term::Function {
        name: "comp".to_string(),
        args: vec![
            Term::Tuple(
                vars.iter()
                    .map(|v| Term::Tuple(vec![Term::Str(v.clone()), Term::Variable(v.clone())]))
                    .collect(),
            ),
            Term::Str(text),
        ],
    }
}

/// Element variables the aggregate shares with the rest of its rule, as a
/// sorted tuple, or the constant `none` when it shares nothing. Guard
/// variables stay out: they may only be bound by the aggregate itself, and
/// the auxiliary rules must stay safe without the original guards.
fn dependent_term(aggregate: &Aggregate, rule: &Rule, this: &Literal) -> Term {
    let mut inside = BTreeSet::new();
    aggregate.element_variables(&mut inside);

    let mut outside: BTreeSet<String> = BTreeSet::new();
    for atom in rule.head.atoms() {
        atom.variables(&mut outside);
    }
    if let Head::Choice { elements, .. } = &rule.head {
        for e in elements {
            for lit in &e.condition {
                lit.variables(&mut outside);
            }
        }
    }
    for lit in &rule.body {
        if std::ptr::eq(lit, this) {
            continue;
        }
        // Sibling aggregates contribute their guards only; their element
        // variables are local to them.
        if let Literal::Aggregate { aggregate, .. } = lit {
            aggregate.guard_variables(&mut outside);
        } else {
            lit.variables(&mut outside);
        }
    }

    let shared: Vec<Term> = inside
        .intersection(&outside)
        .cloned()
        .map(Term::Variable)
        .collect();
    if shared.is_empty() {
        Term::Const("none".to_string())
    } else {
        Term::Tuple(shared)
    }
}

fn marked_rule(
    component: usize,
    rule_number: usize,
    head: &Atom,
    body: &[Literal],
    condition: &[Literal],
    tokens: Vec<Term>,
) -> Rule {
    let head_term = head.to_term();
    let mut marked_body = Vec::with_capacity(body.len() + condition.len() + 1);
    marked_body.push(Literal::Atom {
        sign: Sign::Positive,
        atom: Atom {
            name: MODEL_PREDICATE.to_string(),
            args: vec![head_term.clone()],
        },
    });
    marked_body.extend(body.iter().cloned());
    marked_body.extend(condition.iter().cloned());
    Rule {
        head: Head::Atom(Atom {
            name: MARKED_PREDICATE.to_string(),
            args: vec![
                Term::Number(component as i64),
                Term::Number(rule_number as i64),
                head_term,
                Term::Tuple(tokens),
            ],
        }),
        body: marked_body,
    }
}

fn rederivation_rule(head: &Atom) -> Rule {
    Rule {
        head: Head::Atom(head.clone()),
        body: vec![Literal::Atom {
            sign: Sign::Positive,
            atom: Atom {
                name: MARKED_PREDICATE.to_string(),
                args: vec![
                    Term::Anonymous,
                    Term::Anonymous,
                    head.to_term(),
                    Term::Anonymous,
                ],
            },
        }],
    }
}

fn rename_anonymous_in_rule(rule: &mut Rule, fresh: &mut FreshVariables) {
    let mut next = || fresh.fresh();
    match &mut rule.head {
        Head::Atom(atom) => rename_in_atom(atom, &mut next),
        Head::Choice { elements, .. } => {
            for e in elements {
                rename_in_atom(&mut e.atom, &mut next);
                for lit in &mut e.condition {
                    rename_in_literal(lit, &mut next);
                }
            }
        }
        Head::None | Head::Disjunction(_) => {}
    }
    for lit in &mut rule.body {
        rename_in_literal(lit, &mut next);
    }
}

fn rename_in_atom(atom: &mut Atom, fresh: &mut dyn FnMut() -> String) {
    for arg in &mut atom.args {
        arg.rename_anonymous(fresh);
    }
}

fn rename_in_literal(lit: &mut Literal, fresh: &mut dyn FnMut() -> String) {
    match lit {
        Literal::Atom { atom, .. } => rename_in_atom(atom, fresh),
        Literal::Comparison { comparison, .. } => {
            comparison.lhs.rename_anonymous(fresh);
            comparison.rhs.rename_anonymous(fresh);
        }
        Literal::Aggregate { aggregate, .. } => {
            if let Some(g) = &mut aggregate.left {
                g.term.rename_anonymous(fresh);
            }
            if let Some(g) = &mut aggregate.right {
                g.term.rename_anonymous(fresh);
            }
            for e in &mut aggregate.elements {
                for t in &mut e.terms {
                    t.rename_anonymous(fresh);
                }
                for c in &mut e.condition {
                    rename_in_literal(c, fresh);
                }
            }
        }
        Literal::Theory { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{AnalyzeOptions, ProgramAnalyzer};

    fn reify_program(src: &str) -> Vec<ReifiedTransformation> {
        let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default())
            .analyze(src)
            .expect("analysis");
        let mut reifier = Reifier::for_transformations(&analyzed.transformations);
        analyzed
            .transformations
            .iter()
            .map(|t| reifier.reify(t, analyzed.recursive_hashes.contains(&t.hash)))
            .collect()
    }

    #[test]
    fn simple_rule_gets_marked_and_rederivation_rules() {
        let reified = reify_program("c(1). b(X) :- c(X).");
        assert_eq!(reified.len(), 1);
        let texts: Vec<String> = reified[0].rules.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            texts,
            vec![
                "__h(1,1,b(X),(pos(c(X)),)) :- __model(b(X)), c(X).",
                "b(X) :- __h(_,_,b(X),_).",
            ]
        );
        assert!(reified[0].checks.is_empty());
    }

    #[test]
    fn negation_and_comparison_tokens() {
        let reified = reify_program("c(1). b(X) :- c(X), not d(X), X < 2.");
        let marked = reified[0].rules[0].to_string();
        assert!(
            marked.starts_with("__h(1,1,b(X),(pos(c(X)),neg(d(X)),comp(((\"X\",X),),\"X<2\")))"),
            "unexpected marked rule: {marked}"
        );
    }

    #[test]
    fn choice_head_reifies_per_element() {
        let reified = reify_program("a(1). { b(X) : a(X) } :- a(X).");
        // One marked plus one re-derivation rule for the single element.
        assert_eq!(reified[0].rules.len(), 2);
        let marked = reified[0].rules[0].to_string();
        // Element condition joins both the body and the token list.
        assert!(marked.contains("pos(a(X)),pos(a(X))"), "{marked}");
        assert!(marked.contains(":- __model(b(X)), a(X), a(X)."), "{marked}");
    }

    #[test]
    fn constraints_become_checks() {
        let reified = reify_program("a(1). b(X) :- a(X). :- b(2).");
        let with_checks: Vec<&ReifiedTransformation> =
            reified.iter().filter(|r| !r.checks.is_empty()).collect();
        assert_eq!(with_checks.len(), 1);
        assert!(with_checks[0].rules.is_empty());
        assert_eq!(with_checks[0].checks[0].to_string(), ":- b(2).");
    }

    #[test]
    fn aggregate_produces_auxiliary_rules() {
        let reified = reify_program("p(1). q(X) :- p(X), 1 <= #count { Y : p(Y) }.");
        let texts: Vec<String> = reified[0].rules.iter().map(|r| r.to_string()).collect();
        assert!(
            texts.iter().any(|t| t.starts_with("__agg(1,1,none,count,")),
            "missing value rule in {texts:?}"
        );
        assert!(
            texts
                .iter()
                .any(|t| t.starts_with("__agg_bound(1,1,none,left,\"<=\",comp((),\"1\"))")),
            "missing bound rule in {texts:?}"
        );
        assert!(
            texts
                .iter()
                .any(|t| t.starts_with("__agg_elem(1,1,none,(Y,),(pos(p(Y)),))")),
            "missing element rule in {texts:?}"
        );
        // The marked rule's token references the same numbering.
        assert!(
            texts[0].contains("body_aggregate(1,1,none,pos)"),
            "{:?}",
            texts[0]
        );
    }

    #[test]
    fn aggregate_counter_is_per_reifier_and_monotone() {
        let reified = reify_program(
            "p(1). q(X) :- p(X), 1 <= #count { Y : p(Y) }. r(X) :- q(X), 1 <= #sum { Z : p(Z) }.",
        );
        let all: Vec<String> = reified
            .iter()
            .flat_map(|r| r.rules.iter().map(|rule| rule.to_string()))
            .collect();
        assert!(all.iter().any(|t| t.contains("body_aggregate(1,1,")));
        assert!(all.iter().any(|t| t.contains("body_aggregate(2,2,")));
    }

    #[test]
    fn anonymous_variables_get_distinct_fresh_names() {
        let reified = reify_program("c(1,2). b(X) :- c(X, _), c(_, X).");
        let marked = reified[0].rules[0].to_string();
        assert!(marked.contains("c(X,ANON1)"), "{marked}");
        assert!(marked.contains("c(ANON2,X)"), "{marked}");
    }

    #[test]
    fn fresh_base_avoids_program_variables() {
        let mut fresh =
            FreshVariables::new(["ANON", "ANON_2"].iter().copied());
        assert_eq!(fresh.fresh(), "ANON__1");
    }

    #[test]
    fn shared_variables_form_the_dependent_term() {
        let reified =
            reify_program("p(1,2). q(X) :- p(X,_), X <= #count { Y : p(X, Y) }.");
        let marked = reified[0].rules[0].to_string();
        assert!(
            marked.contains("body_aggregate(1,1,(X,),pos)"),
            "{marked}"
        );
    }

    #[test]
    fn recursive_flag_and_head_signatures_survive() {
        let analyzed = ProgramAnalyzer::new(AnalyzeOptions::default())
            .analyze("e(1,2). r(X,Y) :- e(X,Y). r(X,Z) :- r(X,Y), e(Y,Z).")
            .expect("analysis");
        let mut reifier = Reifier::for_transformations(&analyzed.transformations);
        // The base rule is not recursive; only the self-loop rule is.
        let base = &analyzed.transformations[0];
        let reified = reifier.reify(base, analyzed.recursive_hashes.contains(&base.hash));
        assert!(!reified.recursive);
        let closure = &analyzed.transformations[1];
        let reified =
            reifier.reify(closure, analyzed.recursive_hashes.contains(&closure.hash));
        assert!(reified.recursive);
        assert_eq!(
            reified.head_signatures,
            BTreeSet::from([("r".to_string(), 2)])
        );
    }
}
