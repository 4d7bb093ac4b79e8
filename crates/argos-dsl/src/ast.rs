//! Typed AST for the ASP fragment.
//!
//! Every node carries enough structure to be rendered back to canonical text
//! (`Display`), because reification and reason rendering both reconstruct
//! source-shaped strings from AST values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Terms
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn precedence(self) -> u8 {
        match self {
            ArithOp::Add | ArithOp::Sub => 1,
            ArithOp::Mul | ArithOp::Div | ArithOp::Mod => 2,
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "\\",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "tag", content = "value", rename_all = "snake_case")]
pub enum Term {
    Number(i64),
    /// Quoted string constant.
    Str(String),
    /// Symbolic constant (lowercase identifier with no arguments).
    Const(String),
    /// Named variable (identifier starting with an uppercase letter).
    Variable(String),
    /// The anonymous variable `_`. Rewritten away before reification.
    Anonymous,
    Function {
        name: String,
        args: Vec<Term>,
    },
    Tuple(Vec<Term>),
    BinOp {
        op: ArithOp,
        lhs: Box<Term>,
        rhs: Box<Term>,
    },
    UnaryMinus(Box<Term>),
    Interval {
        lo: Box<Term>,
        hi: Box<Term>,
    },
}

impl Term {
    /// Rendering precedence; children with strictly lower precedence get
    /// parenthesized.
    fn precedence(&self) -> u8 {
        match self {
            Term::Interval { .. } => 0,
            Term::BinOp { op, .. } => op.precedence(),
            Term::UnaryMinus(_) => 3,
            _ => 4,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parent_prec: u8) -> fmt::Result {
        if self.precedence() < parent_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    /// Collect every named variable occurring in the term.
    pub fn variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Variable(name) => {
                out.insert(name.clone());
            }
            Term::Function { args, .. } | Term::Tuple(args) => {
                for arg in args {
                    arg.variables(out);
                }
            }
            Term::BinOp { lhs, rhs, .. } | Term::Interval { lo: lhs, hi: rhs } => {
                lhs.variables(out);
                rhs.variables(out);
            }
            Term::UnaryMinus(inner) => inner.variables(out),
            Term::Number(_) | Term::Str(_) | Term::Const(_) | Term::Anonymous => {}
        }
    }

    pub fn is_ground(&self) -> bool {
        let mut vars = BTreeSet::new();
        self.variables(&mut vars);
        vars.is_empty() && !self.contains_anonymous()
    }

    pub fn contains_anonymous(&self) -> bool {
        match self {
            Term::Anonymous => true,
            Term::Function { args, .. } | Term::Tuple(args) => {
                args.iter().any(Term::contains_anonymous)
            }
            Term::BinOp { lhs, rhs, .. } | Term::Interval { lo: lhs, hi: rhs } => {
                lhs.contains_anonymous() || rhs.contains_anonymous()
            }
            Term::UnaryMinus(inner) => inner.contains_anonymous(),
            _ => false,
        }
    }

    /// Replace every anonymous occurrence with a name drawn from `fresh`.
    pub fn rename_anonymous(&mut self, fresh: &mut dyn FnMut() -> String) {
        match self {
            Term::Anonymous => *self = Term::Variable(fresh()),
            Term::Function { args, .. } | Term::Tuple(args) => {
                for arg in args {
                    arg.rename_anonymous(fresh);
                }
            }
            Term::BinOp { lhs, rhs, .. } | Term::Interval { lo: lhs, hi: rhs } => {
                lhs.rename_anonymous(fresh);
                rhs.rename_anonymous(fresh);
            }
            Term::UnaryMinus(inner) => inner.rename_anonymous(fresh),
            _ => {}
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Number(n) => write!(f, "{n}"),
            Term::Str(s) => write!(f, "\"{s}\""),
            Term::Const(name) => write!(f, "{name}"),
            Term::Variable(name) => write!(f, "{name}"),
            Term::Anonymous => write!(f, "_"),
            Term::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Term::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Term::BinOp { op, lhs, rhs } => {
                let prec = op.precedence();
                lhs.fmt_child(f, prec)?;
                write!(f, "{op}")?;
                // Right operand of - / \ needs parens even at equal precedence.
                let right_prec = match op {
                    ArithOp::Sub | ArithOp::Div | ArithOp::Mod => prec + 1,
                    _ => prec,
                };
                rhs.fmt_child(f, right_prec)
            }
            Term::UnaryMinus(inner) => {
                write!(f, "-")?;
                inner.fmt_child(f, 3)
            }
            Term::Interval { lo, hi } => {
                lo.fmt_child(f, 1)?;
                write!(f, "..")?;
                hi.fmt_child(f, 1)
            }
        }
    }
}

// ============================================================================
// Atoms, comparisons, aggregates
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    pub name: String,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn signature(&self) -> (String, usize) {
        (self.name.clone(), self.args.len())
    }

    pub fn variables(&self, out: &mut BTreeSet<String>) {
        for arg in &self.args {
            arg.variables(out);
        }
    }

    /// The atom as a term, for embedding into reified literals.
    pub fn to_term(&self) -> Term {
        if self.args.is_empty() {
            Term::Const(self.name.clone())
        } else {
            Term::Function {
                name: self.name.clone(),
                args: self.args.clone(),
            }
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_term())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "=",
            CmpOp::Neq => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Comparison {
    pub lhs: Term,
    pub op: CmpOp,
    pub rhs: Term,
}

impl Comparison {
    pub fn variables(&self, out: &mut BTreeSet<String>) {
        self.lhs.variables(out);
        self.rhs.variables(out);
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lhs, self.op, self.rhs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateFunction::Count => "#count",
            AggregateFunction::Sum => "#sum",
            AggregateFunction::Min => "#min",
            AggregateFunction::Max => "#max",
        };
        write!(f, "{s}")
    }
}

/// One side of an aggregate comparison, e.g. the `2 <=` in `2 <= #count{..}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Guard {
    pub op: CmpOp,
    pub term: Term,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AggregateElement {
    pub terms: Vec<Term>,
    pub condition: Vec<Literal>,
}

impl fmt::Display for AggregateElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{t}")?;
        }
        if !self.condition.is_empty() {
            write!(f, ": ")?;
            for (i, l) in self.condition.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{l}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Aggregate {
    pub left: Option<Guard>,
    pub function: AggregateFunction,
    pub elements: Vec<AggregateElement>,
    pub right: Option<Guard>,
}

impl Aggregate {
    /// Variables occurring in the guards (these stay global to the rule).
    pub fn guard_variables(&self, out: &mut BTreeSet<String>) {
        if let Some(g) = &self.left {
            g.term.variables(out);
        }
        if let Some(g) = &self.right {
            g.term.variables(out);
        }
    }

    /// Variables occurring anywhere inside the aggregate's elements.
    pub fn element_variables(&self, out: &mut BTreeSet<String>) {
        for elem in &self.elements {
            for t in &elem.terms {
                t.variables(out);
            }
            for l in &elem.condition {
                l.variables(out);
            }
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(g) = &self.left {
            write!(f, "{} {} ", g.term, g.op)?;
        }
        write!(f, "{} {{ ", self.function)?;
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, " }}")?;
        if let Some(g) = &self.right {
            write!(f, " {} {}", g.op, g.term)?;
        }
        Ok(())
    }
}

// ============================================================================
// Literals
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Positive,
    Negated,
    DoubleNegated,
}

impl Sign {
    pub fn prefix(self) -> &'static str {
        match self {
            Sign::Positive => "",
            Sign::Negated => "not ",
            Sign::DoubleNegated => "not not ",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Literal {
    Atom { sign: Sign, atom: Atom },
    Comparison { sign: Sign, comparison: Comparison },
    Aggregate { sign: Sign, aggregate: Aggregate },
    /// Theory atom `&name{...}`; parsed only so analysis can flag it.
    Theory { text: String },
}

impl Literal {
    pub fn sign(&self) -> Sign {
        match self {
            Literal::Atom { sign, .. }
            | Literal::Comparison { sign, .. }
            | Literal::Aggregate { sign, .. } => *sign,
            Literal::Theory { .. } => Sign::Positive,
        }
    }

    pub fn variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Literal::Atom { atom, .. } => atom.variables(out),
            Literal::Comparison { comparison, .. } => comparison.variables(out),
            Literal::Aggregate { aggregate, .. } => {
                aggregate.guard_variables(out);
                aggregate.element_variables(out);
            }
            Literal::Theory { .. } => {}
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Atom { sign, atom } => write!(f, "{}{}", sign.prefix(), atom),
            Literal::Comparison { sign, comparison } => {
                write!(f, "{}{}", sign.prefix(), comparison)
            }
            Literal::Aggregate { sign, aggregate } => write!(f, "{}{}", sign.prefix(), aggregate),
            Literal::Theory { text } => write!(f, "{text}"),
        }
    }
}

// ============================================================================
// Heads, rules, statements
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChoiceElement {
    pub atom: Atom,
    pub condition: Vec<Literal>,
}

impl fmt::Display for ChoiceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.atom)?;
        if !self.condition.is_empty() {
            write!(f, ": ")?;
            for (i, l) in self.condition.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{l}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "tag", content = "value", rename_all = "snake_case")]
pub enum Head {
    /// Integrity constraint (`:- body.`).
    None,
    Atom(Atom),
    Choice {
        left: Option<Guard>,
        elements: Vec<ChoiceElement>,
        right: Option<Guard>,
    },
    /// Disjunctive head; parsed only so analysis can flag it as unsupported.
    Disjunction(Vec<Atom>),
}

impl Head {
    /// Atoms this head can establish.
    pub fn atoms(&self) -> Vec<&Atom> {
        match self {
            Head::None => vec![],
            Head::Atom(atom) => vec![atom],
            Head::Choice { elements, .. } => elements.iter().map(|e| &e.atom).collect(),
            Head::Disjunction(atoms) => atoms.iter().collect(),
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Head::None => Ok(()),
            Head::Atom(atom) => write!(f, "{atom}"),
            Head::Choice {
                left,
                elements,
                right,
            } => {
                if let Some(g) = left {
                    write!(f, "{} {} ", g.term, g.op)?;
                }
                write!(f, "{{ ")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, " }}")?;
                if let Some(g) = right {
                    write!(f, " {} {}", g.op, g.term)?;
                }
                Ok(())
            }
            Head::Disjunction(atoms) => {
                for (i, a) in atoms.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{a}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: Head,
    pub body: Vec<Literal>,
}

impl Rule {
    pub fn is_constraint(&self) -> bool {
        matches!(self.head, Head::None)
    }

    /// A fact: simple ground head (intervals allowed) and empty body.
    pub fn is_fact(&self) -> bool {
        if !self.body.is_empty() {
            return false;
        }
        match &self.head {
            Head::Atom(atom) => atom.args.iter().all(|t| {
                let mut vars = BTreeSet::new();
                t.variables(&mut vars);
                vars.is_empty() && !t.contains_anonymous()
            }),
            _ => false,
        }
    }

    pub fn variables(&self, out: &mut BTreeSet<String>) {
        match &self.head {
            Head::None => {}
            Head::Atom(atom) => atom.variables(out),
            Head::Choice { elements, .. } => {
                for e in elements {
                    e.atom.variables(out);
                    for l in &e.condition {
                        l.variables(out);
                    }
                }
            }
            Head::Disjunction(atoms) => {
                for a in atoms {
                    a.variables(out);
                }
            }
        }
        for l in &self.body {
            l.variables(out);
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !matches!(self.head, Head::None) {
            write!(f, "{}", self.head)?;
            if !self.body.is_empty() {
                write!(f, " ")?;
            }
        }
        if !self.body.is_empty() {
            write!(f, ":- ")?;
            for (i, l) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{l}")?;
            }
        }
        write!(f, ".")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum StatementKind {
    Rule(Rule),
    /// A `#`-directive or weak constraint, kept as raw text. Benign ones
    /// (`#show`, `#program`) are ignored downstream; the rest are flagged.
    Directive { name: String, text: String },
    /// A statement outside the supported fragment, kept as raw text so
    /// analysis can report it without aborting the rest of the program.
    Unparsed { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Statement {
    /// Position in the source program, used as the ordering tie-break.
    pub index: usize,
    /// Trimmed source text of the statement.
    pub text: String,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    /// Every variable name occurring anywhere in the program. Used to reserve
    /// a conflict-free prefix for anonymous-variable renaming.
    pub fn all_variable_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for stmt in &self.statements {
            if let StatementKind::Rule(rule) = &stmt.kind {
                rule.variables(&mut out);
            }
        }
        out
    }
}
