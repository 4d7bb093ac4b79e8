//! Parser for the ASP fragment.
//!
//! Statements are parsed one at a time from the source stream; each keeps its
//! trimmed source text and position so later stages can report problems and
//! tie-break orderings by source order. `%` line comments and `%* ... *%`
//! block comments are skipped everywhere.
//!
//! Constructs Argos cannot explain (theory atoms, disjunctive heads,
//! directives other than `#show`/`#program`) still parse here; flagging them
//! is dependency analysis' job, not the parser's.

use crate::ast::{
    Aggregate, AggregateElement, AggregateFunction, ArithOp, Atom, ChoiceElement, CmpOp,
    Comparison, Guard, Head, Literal, Program, Rule, Sign, Statement, StatementKind, Term,
};
use crate::symbol::Symbol;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char as pchar, digit1, satisfy},
    combinator::{map_res, opt, recognize, value},
    multi::{separated_list0, separated_list1},
    sequence::{pair, preceded},
    IResult,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parse error on line {line}: unexpected input near `{snippet}`")]
    Statement { line: usize, snippet: String },
    #[error("model atom on line {line} is not ground: `{snippet}`")]
    NonGroundModelAtom { line: usize, snippet: String },
}

impl ParseError {
    fn statement_at(source: &str, rest: &str) -> Self {
        let (line, snippet) = locate(source, rest);
        ParseError::Statement { line, snippet }
    }
}

fn locate(source: &str, rest: &str) -> (usize, String) {
    let offset = source.len().saturating_sub(rest.len());
    let line = source[..offset].matches('\n').count() + 1;
    let snippet: String = rest.chars().take(24).collect();
    (line, snippet)
}

// ============================================================================
// Whitespace and comments
// ============================================================================

fn skip_ws(mut input: &str) -> &str {
    loop {
        let trimmed = input.trim_start();
        if let Some(rest) = trimmed.strip_prefix("%*") {
            input = match rest.find("*%") {
                Some(pos) => &rest[pos + 2..],
                None => "",
            };
        } else if let Some(rest) = trimmed.strip_prefix('%') {
            input = match rest.find('\n') {
                Some(pos) => &rest[pos + 1..],
                None => "",
            };
        } else {
            return trimmed;
        }
    }
}

fn sp(input: &str) -> IResult<&str, ()> {
    Ok((skip_ws(input), ()))
}

/// Wrap a parser so it skips leading whitespace/comments.
fn tok<'a, O, F>(mut inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    move |input| {
        let (input, ()) = sp(input)?;
        inner(input)
    }
}

fn parse_failure<T>(input: &str) -> IResult<&str, T> {
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Verify,
    )))
}

// ============================================================================
// Terms
// ============================================================================

fn ident_str(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_lowercase() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn variable_str(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_uppercase()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn number(input: &str) -> IResult<&str, i64> {
    map_res(digit1, str::parse::<i64>)(input)
}

fn string_term(input: &str) -> IResult<&str, Term> {
    let (input, _) = pchar('"')(input)?;
    let (input, content) = take_while(|c: char| c != '"')(input)?;
    let (input, _) = pchar('"')(input)?;
    Ok((input, Term::Str(content.to_string())))
}

fn paren_or_tuple(input: &str) -> IResult<&str, Term> {
    let (input, _) = pchar('(')(input)?;
    let (input, items) = separated_list0(tok(pchar(',')), term)(input)?;
    let (input, trailing) = opt(tok(pchar(',')))(input)?;
    let (input, _) = tok(pchar(')'))(input)?;
    let term = if items.len() == 1 && trailing.is_none() {
        items.into_iter().next().unwrap()
    } else {
        Term::Tuple(items)
    };
    Ok((input, term))
}

fn primary(input: &str) -> IResult<&str, Term> {
    let (input, ()) = sp(input)?;
    if input.starts_with('"') {
        return string_term(input);
    }
    if input.starts_with('(') {
        return paren_or_tuple(input);
    }
    if let Ok((rest, n)) = number(input) {
        return Ok((rest, Term::Number(n)));
    }
    if let Ok((rest, v)) = variable_str(input) {
        return Ok((rest, Term::Variable(v.to_string())));
    }
    let (rest, name) = ident_str(input)?;
    if name == "_" {
        return Ok((rest, Term::Anonymous));
    }
    if rest.starts_with('(') {
        let (rest, _) = pchar('(')(rest)?;
        let (rest, args) = separated_list0(tok(pchar(',')), term)(rest)?;
        let (rest, _) = tok(pchar(')'))(rest)?;
        return Ok((
            rest,
            Term::Function {
                name: name.to_string(),
                args,
            },
        ));
    }
    Ok((rest, Term::Const(name.to_string())))
}

fn factor(input: &str) -> IResult<&str, Term> {
    let (input, ()) = sp(input)?;
    if let Some(rest) = input.strip_prefix('-') {
        let (rest, inner) = factor(rest)?;
        return Ok((rest, Term::UnaryMinus(Box::new(inner))));
    }
    primary(input)
}

fn product(input: &str) -> IResult<&str, Term> {
    let (mut rest, mut acc) = factor(input)?;
    loop {
        let after = skip_ws(rest);
        let op = if after.starts_with('*') {
            ArithOp::Mul
        } else if after.starts_with('/') {
            ArithOp::Div
        } else if after.starts_with('\\') {
            ArithOp::Mod
        } else {
            break;
        };
        let (next, rhs) = factor(&after[1..])?;
        acc = Term::BinOp {
            op,
            lhs: Box::new(acc),
            rhs: Box::new(rhs),
        };
        rest = next;
    }
    Ok((rest, acc))
}

fn sum(input: &str) -> IResult<&str, Term> {
    let (mut rest, mut acc) = product(input)?;
    loop {
        let after = skip_ws(rest);
        let op = if after.starts_with('+') {
            ArithOp::Add
        } else if after.starts_with('-') && !after.starts_with("->") {
            ArithOp::Sub
        } else {
            break;
        };
        let (next, rhs) = product(&after[1..])?;
        acc = Term::BinOp {
            op,
            lhs: Box::new(acc),
            rhs: Box::new(rhs),
        };
        rest = next;
    }
    Ok((rest, acc))
}

fn term(input: &str) -> IResult<&str, Term> {
    let (rest, lo) = sum(input)?;
    let after = skip_ws(rest);
    if let Some(after_dots) = after.strip_prefix("..") {
        let (rest, hi) = sum(after_dots)?;
        return Ok((
            rest,
            Term::Interval {
                lo: Box::new(lo),
                hi: Box::new(hi),
            },
        ));
    }
    Ok((rest, lo))
}

// ============================================================================
// Literals
// ============================================================================

fn cmp_op(input: &str) -> IResult<&str, CmpOp> {
    let (input, ()) = sp(input)?;
    alt((
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Neq, tag("!=")),
        value(CmpOp::Eq, tag("==")),
        value(CmpOp::Eq, tag("=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))(input)
}

/// `not` as a keyword (word-boundary checked, so `note(X)` stays an atom).
fn keyword_not(input: &str) -> IResult<&str, ()> {
    let (rest, _) = tag("not")(input)?;
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => parse_failure(input),
        _ => Ok((rest, ())),
    }
}

fn sign(input: &str) -> IResult<&str, Sign> {
    let (input, ()) = sp(input)?;
    if let Ok((rest, ())) = keyword_not(input) {
        let after = skip_ws(rest);
        if let Ok((rest2, ())) = keyword_not(after) {
            return Ok((rest2, Sign::DoubleNegated));
        }
        return Ok((rest, Sign::Negated));
    }
    Ok((input, Sign::Positive))
}

fn atom_parser(input: &str) -> IResult<&str, Atom> {
    let (rest, t) = term(input)?;
    match t {
        Term::Const(name) => Ok((rest, Atom { name, args: vec![] })),
        Term::Function { name, args } => Ok((rest, Atom { name, args })),
        _ => parse_failure(input),
    }
}

fn comparison(input: &str) -> IResult<&str, Comparison> {
    let (input, lhs) = term(input)?;
    let (input, op) = cmp_op(input)?;
    let (input, rhs) = term(input)?;
    Ok((input, Comparison { lhs, op, rhs }))
}

fn aggregate_fn(input: &str) -> IResult<&str, AggregateFunction> {
    let (input, ()) = sp(input)?;
    alt((
        value(AggregateFunction::Count, tag("#count")),
        value(AggregateFunction::Sum, tag("#sum")),
        value(AggregateFunction::Min, tag("#min")),
        value(AggregateFunction::Max, tag("#max")),
    ))(input)
}

fn aggregate_element(input: &str) -> IResult<&str, AggregateElement> {
    let (input, terms) = separated_list0(tok(pchar(',')), term)(input)?;
    let (input, condition) = opt(preceded(
        tok(pchar(':')),
        separated_list0(tok(pchar(',')), body_literal),
    ))(input)?;
    Ok((
        input,
        AggregateElement {
            terms,
            condition: condition.unwrap_or_default(),
        },
    ))
}

fn aggregate(input: &str) -> IResult<&str, Aggregate> {
    let (input, left) = opt(|i| {
        let (i, t) = term(i)?;
        let (i, op) = cmp_op(i)?;
        Ok((i, Guard { op, term: t }))
    })(input)?;
    let (input, function) = aggregate_fn(input)?;
    let (input, _) = tok(pchar('{'))(input)?;
    let (input, elements) = separated_list0(tok(pchar(';')), aggregate_element)(input)?;
    let (input, _) = tok(pchar('}'))(input)?;
    let (input, right) = opt(|i| {
        let (i, op) = cmp_op(i)?;
        let (i, t) = term(i)?;
        Ok((i, Guard { op, term: t }))
    })(input)?;
    Ok((
        input,
        Aggregate {
            left,
            function,
            elements,
            right,
        },
    ))
}

/// Theory atoms are captured as raw text up to the next top-level delimiter;
/// dependency analysis flags them, so structure is not needed.
fn theory_literal(input: &str) -> IResult<&str, Literal> {
    debug_assert!(input.starts_with('&'));
    let mut depth: i32 = 0;
    let mut end = input.len();
    for (i, c) in input.char_indices() {
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            ',' | ';' | '.' if depth == 0 && i > 0 => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let text = input[..end].trim().to_string();
    Ok((&input[end..], Literal::Theory { text }))
}

fn body_literal(input: &str) -> IResult<&str, Literal> {
    let (input, ()) = sp(input)?;
    if input.starts_with('&') {
        return theory_literal(input);
    }
    let (input, sign) = sign(input)?;
    if let Ok((rest, aggregate)) = aggregate(input) {
        return Ok((rest, Literal::Aggregate { sign, aggregate }));
    }
    if let Ok((rest, comparison)) = comparison(input) {
        return Ok((rest, Literal::Comparison { sign, comparison }));
    }
    let (rest, atom) = atom_parser(input)?;
    Ok((rest, Literal::Atom { sign, atom }))
}

// ============================================================================
// Heads, rules, statements
// ============================================================================

fn choice_element(input: &str) -> IResult<&str, ChoiceElement> {
    let (input, atom) = atom_parser(input)?;
    let (input, condition) = opt(preceded(
        tok(pchar(':')),
        separated_list0(tok(pchar(',')), body_literal),
    ))(input)?;
    Ok((
        input,
        ChoiceElement {
            atom,
            condition: condition.unwrap_or_default(),
        },
    ))
}

fn choice_head(input: &str) -> IResult<&str, Head> {
    let (input, left) = opt(|i| {
        let (i, t) = term(i)?;
        let (i, op) = opt(cmp_op)(i)?;
        Ok((
            i,
            Guard {
                op: op.unwrap_or(CmpOp::Le),
                term: t,
            },
        ))
    })(input)?;
    let (input, _) = tok(pchar('{'))(input)?;
    let (input, elements) = separated_list0(tok(pchar(';')), choice_element)(input)?;
    let (input, _) = tok(pchar('}'))(input)?;
    let (input, right) = opt(|i| {
        let (i, op) = opt(cmp_op)(i)?;
        let (i, t) = term(i)?;
        Ok((
            i,
            Guard {
                op: op.unwrap_or(CmpOp::Le),
                term: t,
            },
        ))
    })(input)?;
    Ok((
        input,
        Head::Choice {
            left,
            elements,
            right,
        },
    ))
}

fn head_parser(input: &str) -> IResult<&str, Head> {
    if let Ok((rest, head)) = choice_head(input) {
        return Ok((rest, head));
    }
    let (rest, atoms) =
        separated_list1(tok(alt((pchar(';'), pchar('|')))), atom_parser)(input)?;
    if atoms.len() == 1 {
        Ok((rest, Head::Atom(atoms.into_iter().next().unwrap())))
    } else {
        Ok((rest, Head::Disjunction(atoms)))
    }
}

fn rule_statement(input: &str) -> IResult<&str, Rule> {
    let (input, ()) = sp(input)?;
    let (input, head) = if input.starts_with(":-") {
        (input, Head::None)
    } else {
        head_parser(input)?
    };
    let after = skip_ws(input);
    let (input, body) = if let Some(rest) = after.strip_prefix(":-") {
        separated_list0(tok(alt((pchar(','), pchar(';')))), body_literal)(rest)?
    } else {
        (input, vec![])
    };
    let (input, _) = tok(pchar('.'))(input)?;
    Ok((input, Rule { head, body }))
}

/// Capture a `#directive` (or `:~` weak constraint) as raw text.
fn directive(input: &str) -> IResult<&str, StatementKind> {
    let is_weak = input.starts_with(":~");
    let name: String = if is_weak {
        "weak_constraint".to_string()
    } else {
        let (_, name) = preceded(pchar('#'), ident_str)(input)?;
        name.to_string()
    };

    let mut depth: i32 = 0;
    let mut end = input.len();
    let mut consumed = input.len();
    for (i, c) in input.char_indices() {
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            '.' if depth == 0 => {
                // Skip interval dots.
                if input[i + 1..].starts_with('.') || input[..i].ends_with('.') {
                    continue;
                }
                end = i;
                consumed = i + 1;
                break;
            }
            _ => {}
        }
    }
    let mut text = input[..end].trim().to_string();
    let mut rest = &input[consumed..];

    // Weak constraints carry their weight after the closing dot: `[w@p]`.
    if is_weak {
        let after = skip_ws(rest);
        if after.starts_with('[') {
            if let Some(close) = after.find(']') {
                text.push_str(" ");
                text.push_str(&after[..close + 1]);
                rest = &after[close + 1..];
            }
        }
    }

    Ok((rest, StatementKind::Directive { name, text }))
}

fn statement_kind(input: &str) -> IResult<&str, StatementKind> {
    let (input, ()) = sp(input)?;
    if input.starts_with('#') || input.starts_with(":~") {
        return directive(input);
    }
    let (rest, rule) = rule_statement(input)?;
    Ok((rest, StatementKind::Rule(rule)))
}

/// Skip to just past the next top-level `.` (interval dots excluded), for
/// recovery after a statement outside the fragment.
fn skip_statement(input: &str) -> (&str, &str) {
    let mut depth: i32 = 0;
    for (i, c) in input.char_indices() {
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            '.' if depth <= 0 => {
                if input[i + 1..].starts_with('.') || input[..i].ends_with('.') {
                    continue;
                }
                return (input[..i].trim_end(), &input[i + 1..]);
            }
            _ => {}
        }
    }
    (input.trim_end(), "")
}

/// Parse a full program into statements.
///
/// Statements outside the supported fragment are captured as
/// [`StatementKind::Unparsed`] instead of failing the whole program; flagging
/// them is analysis' job. `Err` is reserved for input no statement boundary
/// can be recovered from.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let mut statements = Vec::new();
    let mut input = source;
    let mut index = 0;
    loop {
        let rest = skip_ws(input);
        if rest.is_empty() {
            break;
        }
        match statement_kind(rest) {
            Ok((next, kind)) => {
                let consumed = rest.len() - next.len();
                statements.push(Statement {
                    index,
                    text: rest[..consumed].trim().to_string(),
                    kind,
                });
                index += 1;
                input = next;
            }
            Err(_) => {
                let (text, next) = skip_statement(rest);
                if text.is_empty() && next.is_empty() {
                    return Err(ParseError::statement_at(source, rest));
                }
                statements.push(Statement {
                    index,
                    text: format!("{text}."),
                    kind: StatementKind::Unparsed {
                        text: format!("{text}."),
                    },
                });
                index += 1;
                input = next;
            }
        }
    }
    Ok(Program { statements })
}

/// Parse a target solution given as a list of ground facts (`a(1). b.`).
pub fn parse_model(source: &str) -> Result<Vec<Symbol>, ParseError> {
    let program = parse_program(source)?;
    let mut atoms = Vec::new();
    for stmt in &program.statements {
        let rule = match &stmt.kind {
            StatementKind::Rule(rule) => rule,
            StatementKind::Directive { .. } => continue,
            StatementKind::Unparsed { .. } => {
                return Err(ParseError::NonGroundModelAtom {
                    line: 0,
                    snippet: stmt.text.clone(),
                })
            }
        };
        let atom = match (&rule.head, rule.body.is_empty()) {
            (Head::Atom(atom), true) => atom,
            _ => {
                return Err(ParseError::NonGroundModelAtom {
                    line: 0,
                    snippet: stmt.text.clone(),
                })
            }
        };
        match ground_atom_symbol(atom) {
            Some(symbol) => atoms.push(symbol),
            None => {
                return Err(ParseError::NonGroundModelAtom {
                    line: 0,
                    snippet: stmt.text.clone(),
                })
            }
        }
    }
    Ok(atoms)
}

fn ground_term_symbol(term: &Term) -> Option<Symbol> {
    match term {
        Term::Number(n) => Some(Symbol::Number(*n)),
        Term::Str(s) => Some(Symbol::Str(s.clone())),
        Term::Const(name) => Some(Symbol::constant(name.clone())),
        Term::Function { name, args } => {
            let args: Option<Vec<Symbol>> = args.iter().map(ground_term_symbol).collect();
            Some(Symbol::fun(name.clone(), args?))
        }
        Term::Tuple(items) => {
            let items: Option<Vec<Symbol>> = items.iter().map(ground_term_symbol).collect();
            Some(Symbol::tuple(items?))
        }
        Term::UnaryMinus(inner) => match ground_term_symbol(inner)? {
            Symbol::Number(n) => Some(Symbol::Number(-n)),
            _ => None,
        },
        Term::Variable(_) | Term::Anonymous | Term::BinOp { .. } | Term::Interval { .. } => None,
    }
}

fn ground_atom_symbol(atom: &Atom) -> Option<Symbol> {
    let args: Option<Vec<Symbol>> = atom.args.iter().map(ground_term_symbol).collect();
    Some(Symbol::fun(atom.name.clone(), args?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn single_rule(src: &str) -> Rule {
        let program = parse_program(src).expect("parse");
        assert_eq!(program.statements.len(), 1, "program: {src}");
        match &program.statements[0].kind {
            StatementKind::Rule(rule) => rule.clone(),
            other => panic!("expected rule, got {other:?}"),
        }
    }

    #[test]
    fn parses_facts_and_rules() {
        let program = parse_program("c(1). c(2). b(X) :- c(X). a(X) :- b(X).").expect("parse");
        assert_eq!(program.statements.len(), 4);
        assert_eq!(program.statements[2].text, "b(X) :- c(X).");
    }

    #[test]
    fn parses_negation_and_double_negation() {
        let rule = single_rule("b(X) :- c(X), not a(X), not not d(X).");
        assert_eq!(rule.body.len(), 3);
        assert_eq!(rule.body[1].sign(), Sign::Negated);
        assert_eq!(rule.body[2].sign(), Sign::DoubleNegated);
        assert_eq!(rule.to_string(), "b(X) :- c(X), not a(X), not not d(X).");
    }

    #[test]
    fn keyword_boundary_keeps_note_an_atom() {
        let rule = single_rule("a :- note(X).");
        match &rule.body[0] {
            Literal::Atom { sign, atom } => {
                assert_eq!(*sign, Sign::Positive);
                assert_eq!(atom.name, "note");
            }
            other => panic!("unexpected literal {other:?}"),
        }
    }

    #[test]
    fn parses_choice_rule_with_condition() {
        let rule = single_rule("1 { b(X) : c(X) } 2 :- a(X).");
        match &rule.head {
            Head::Choice {
                left,
                elements,
                right,
            } => {
                assert!(left.is_some());
                assert!(right.is_some());
                assert_eq!(elements.len(), 1);
                assert_eq!(elements[0].condition.len(), 1);
            }
            other => panic!("expected choice, got {other:?}"),
        }
    }

    #[test]
    fn parses_constraint() {
        let rule = single_rule(":- a(X), not b(X).");
        assert!(rule.is_constraint());
    }

    #[test]
    fn parses_body_aggregate_with_guards() {
        let rule = single_rule("ok :- 2 <= #count { X : b(X), not c(X) } < 5.");
        match &rule.body[0] {
            Literal::Aggregate { aggregate, .. } => {
                assert_eq!(aggregate.function, AggregateFunction::Count);
                assert!(aggregate.left.is_some());
                assert!(aggregate.right.is_some());
                assert_eq!(aggregate.elements.len(), 1);
                assert_eq!(aggregate.elements[0].condition.len(), 2);
            }
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn parses_intervals_and_arithmetic() {
        let rule = single_rule("p(X) :- X = 1..3.");
        match &rule.body[0] {
            Literal::Comparison { comparison, .. } => {
                assert!(matches!(comparison.rhs, Term::Interval { .. }));
            }
            other => panic!("expected comparison, got {other:?}"),
        }
        let rule = single_rule("q(Y) :- p(X), Y = X*2+1.");
        assert_eq!(rule.body[1].to_string(), "Y=X*2+1");
    }

    #[test]
    fn parses_disjunctive_head() {
        let rule = single_rule("a ; b :- c.");
        assert!(matches!(rule.head, Head::Disjunction(ref atoms) if atoms.len() == 2));
    }

    #[test]
    fn captures_directives() {
        let program = parse_program("#show a/1. #external b(X). a.").expect("parse");
        assert!(matches!(
            &program.statements[0].kind,
            StatementKind::Directive { name, .. } if name == "show"
        ));
        assert!(matches!(
            &program.statements[1].kind,
            StatementKind::Directive { name, .. } if name == "external"
        ));
    }

    #[test]
    fn captures_weak_constraint_with_weight() {
        let program = parse_program(":~ a(X). [1@2,X] b.").expect("parse");
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StatementKind::Directive { name, text } => {
                assert_eq!(name, "weak_constraint");
                assert!(text.contains("[1@2,X]"));
            }
            other => panic!("expected directive, got {other:?}"),
        }
    }

    #[test]
    fn captures_theory_atoms() {
        let rule = single_rule("a :- &diff { X - Y } <= 3, b.");
        assert!(matches!(rule.body[0], Literal::Theory { .. }));
        assert!(matches!(rule.body[1], Literal::Atom { .. }));
    }

    #[test]
    fn skips_comments() {
        let program =
            parse_program("a. % trailing\n%* block\nspanning *% b :- a.").expect("parse");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn recovers_from_unsupported_statements() {
        let program = parse_program("a.\nb :- :: x.\nc :- a.").expect("parse");
        assert_eq!(program.statements.len(), 3);
        assert!(matches!(
            &program.statements[1].kind,
            StatementKind::Unparsed { text } if text.contains("::")
        ));
        assert!(matches!(
            &program.statements[2].kind,
            StatementKind::Rule(_)
        ));
    }

    #[test]
    fn parses_model_facts() {
        let model = parse_model("a(1). b. c(f(2),\"x\").").expect("parse");
        assert_eq!(model.len(), 3);
        assert_eq!(model[0].to_string(), "a(1)");
        assert_eq!(model[2].to_string(), "c(f(2),\"x\")");
    }

    #[test]
    fn rejects_non_ground_model() {
        assert!(parse_model("a(X).").is_err());
    }

    proptest! {
        /// Rendering a parsed rule and re-parsing it is a fixpoint.
        #[test]
        fn display_reparse_is_stable(
            pred in "[a-z][a-z0-9]{0,4}",
            var in "[A-Z][A-Z0-9]{0,2}",
            n in 0i64..1000,
        ) {
            let src = format!("{pred}({var},{n}) :- {pred}({var}), {var} < {n}.");
            let rule = single_rule(&src);
            let rendered = rule.to_string();
            let reparsed = single_rule(&rendered);
            prop_assert_eq!(reparsed.to_string(), rendered);
        }
    }
}
