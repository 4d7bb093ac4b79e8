//! Ground `Symbol` values.
//!
//! A `Symbol` is a fully evaluated term: a number, a quoted string, or a
//! function application over symbols. Symbolic constants are zero-arity
//! functions; tuples are functions with an empty name. The `Display` form is
//! the canonical text used as reason-map keys and in serialized output.

use crate::ast::Term;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "tag", content = "value", rename_all = "snake_case")]
pub enum Symbol {
    Number(i64),
    Str(String),
    Fun { name: String, args: Vec<Symbol> },
}

impl Symbol {
    pub fn constant(name: impl Into<String>) -> Self {
        Symbol::Fun {
            name: name.into(),
            args: vec![],
        }
    }

    pub fn fun(name: impl Into<String>, args: Vec<Symbol>) -> Self {
        Symbol::Fun {
            name: name.into(),
            args,
        }
    }

    pub fn tuple(items: Vec<Symbol>) -> Self {
        Symbol::Fun {
            name: String::new(),
            args: items,
        }
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Symbol::Fun { name, .. } if name.is_empty())
    }

    /// Predicate signature of an atom-shaped symbol.
    pub fn signature(&self) -> Option<(&str, usize)> {
        match self {
            Symbol::Fun { name, args } if !name.is_empty() => Some((name.as_str(), args.len())),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Symbol::Fun { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Symbol] {
        match self {
            Symbol::Fun { args, .. } => args,
            _ => &[],
        }
    }

    pub fn number(&self) -> Option<i64> {
        match self {
            Symbol::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The symbol as a ground AST term (used when symbols are fed back into
    /// rules as facts).
    pub fn to_term(&self) -> Term {
        match self {
            Symbol::Number(n) => Term::Number(*n),
            Symbol::Str(s) => Term::Str(s.clone()),
            Symbol::Fun { name, args } => {
                let arg_terms: Vec<Term> = args.iter().map(Symbol::to_term).collect();
                if name.is_empty() {
                    Term::Tuple(arg_terms)
                } else if arg_terms.is_empty() {
                    Term::Const(name.clone())
                } else {
                    Term::Function {
                        name: name.clone(),
                        args: arg_terms,
                    }
                }
            }
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Number(n) => write!(f, "{n}"),
            Symbol::Str(s) => write!(f, "\"{s}\""),
            Symbol::Fun { name, args } => {
                if name.is_empty() {
                    write!(f, "(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{a}")?;
                    }
                    if args.len() == 1 {
                        write!(f, ",")?;
                    }
                    return write!(f, ")");
                }
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}
