//! Type representations for the rowlang type system.
//!
//! The type tree has three shapes: applied constructors (`num`, `List⟨t⟩`,
//! `Func⟨a, b, r⟩` where the last argument is the result), type variables,
//! and row types. A row is a finite map of labels to types plus an extension
//! variable; with `union = false` it is a record, with `union = true` a
//! polymorphic variant. The `rest` tail is always a variable, even on a
//! closed row, so that two closed rows of the same shape can still unify
//! through it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Name of the function type constructor; the last argument is the result.
pub const FUNC: &str = "Func";

/// Type representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Applied type constructor: num, str, List⟨t⟩, Func⟨a, b, r⟩
    Cons(String, Vec<Type>),
    /// Type variable
    Var(String),
    /// Row type: record or polymorphic variant
    Rec(Row),
}

/// A row: labelled items plus an extension tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// false = record, true = polymorphic variant
    pub union: bool,
    /// Whether the row may still be extended through `rest`
    pub open: bool,
    pub items: BTreeMap<String, Type>,
    /// Tail variable; an internal witness when the row is closed
    pub rest: String,
}

impl Type {
    pub fn num() -> Type {
        Type::Cons("num".to_string(), Vec::new())
    }

    pub fn string() -> Type {
        Type::Cons("str".to_string(), Vec::new())
    }

    pub fn unit() -> Type {
        Type::Cons("Unit".to_string(), Vec::new())
    }

    pub fn list(elem: Type) -> Type {
        Type::Cons("List".to_string(), vec![elem])
    }

    pub fn task(ok: Type, err: Type) -> Type {
        Type::Cons("Task".to_string(), vec![ok, err])
    }

    /// Build a function type; arity is the number of `args`.
    pub fn func(args: Vec<Type>, result: Type) -> Type {
        let mut all = args;
        all.push(result);
        Type::Cons(FUNC.to_string(), all)
    }

    pub fn var(name: impl Into<String>) -> Type {
        Type::Var(name.into())
    }

    /// Free type variables of this type.
    ///
    /// The tail of an open row is free; the tail of a closed row is not.
    /// It exists only so closed rows of equal shape can unify, and it must
    /// not be quantified or renamed.
    pub fn free_vars(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        self.collect_free(&mut out);
        out
    }

    fn collect_free(&self, out: &mut HashSet<String>) {
        match self {
            Type::Cons(_, args) => {
                for arg in args {
                    arg.collect_free(out);
                }
            }
            Type::Var(name) => {
                out.insert(name.clone());
            }
            Type::Rec(row) => {
                for item in row.items.values() {
                    item.collect_free(out);
                }
                if row.open {
                    out.insert(row.rest.clone());
                }
            }
        }
    }

    /// Occurs check: does `name` appear free in this type?
    pub fn occurs(&self, name: &str) -> bool {
        self.free_vars().contains(name)
    }
}

impl Row {
    pub fn new(union: bool, open: bool, items: BTreeMap<String, Type>, rest: impl Into<String>) -> Row {
        Row {
            union,
            open,
            items,
            rest: rest.into(),
        }
    }

    /// An open record row with the given items.
    pub fn record(items: BTreeMap<String, Type>, rest: impl Into<String>) -> Row {
        Row::new(false, true, items, rest)
    }

    /// An open variant row with the given tags.
    pub fn variant(items: BTreeMap<String, Type>, rest: impl Into<String>) -> Row {
        Row::new(true, true, items, rest)
    }

    /// The same row with the `open` flag flipped.
    pub fn flipped(&self) -> Row {
        Row {
            open: !self.open,
            ..self.clone()
        }
    }
}

/// A universally quantified type; the output of generalisation.
///
/// Only module top-level bindings carry non-trivial schemes. Lambda-bound
/// names get monomorphic types lifted through `Scheme::monomorphic` for
/// environment uniformity.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub quantified: Vec<String>,
    pub body: Type,
}

impl Scheme {
    pub fn new(quantified: Vec<String>, body: Type) -> Scheme {
        Scheme { quantified, body }
    }

    pub fn monomorphic(body: Type) -> Scheme {
        Scheme {
            quantified: Vec::new(),
            body,
        }
    }
}

/// Supply of fresh type-variable names: T0, T1, …
///
/// Freshness is an invariant for the duration of one inference run; the
/// supply is passed explicitly so tests can start from a known seed.
#[derive(Debug, Default)]
pub struct VarSupply {
    next: usize,
}

impl VarSupply {
    pub fn new() -> VarSupply {
        VarSupply { next: 0 }
    }

    pub fn fresh_name(&mut self) -> String {
        let name = format!("T{}", self.next);
        self.next += 1;
        name
    }

    pub fn fresh(&mut self) -> Type {
        Type::Var(self.fresh_name())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Cons(name, args) if name == FUNC => match args.split_last() {
                Some((result, params)) => {
                    if params.is_empty() {
                        return write!(f, "→ {result}");
                    }
                    for param in params {
                        // Parenthesise function-typed parameters
                        match param {
                            Type::Cons(n, a) if n == FUNC && !a.is_empty() => {
                                write!(f, "({param}) → ")?;
                            }
                            _ => write!(f, "{param} → ")?,
                        }
                    }
                    write!(f, "{result}")
                }
                None => write!(f, "{name}"),
            },
            Type::Cons(name, args) => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "⟨")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, "⟩")?;
                }
                Ok(())
            }
            Type::Var(name) => write!(f, "{name}"),
            Type::Rec(row) => write!(f, "{row}"),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (lbrace, rbrace) = if self.union { ("[", "]") } else { ("{", "}") };
        write!(f, "{lbrace}")?;
        for (i, (key, ty)) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if self.union {
                // A tag with a Unit payload prints as the bare tag name
                if *ty == Type::unit() {
                    write!(f, "{key}")?;
                } else {
                    write!(f, "{key}⟨{ty}⟩")?;
                }
            } else {
                write!(f, "{key}: {ty}")?;
            }
        }
        if self.open {
            write!(f, " | {}", self.rest)?;
        }
        write!(f, "{rbrace}")
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.quantified.is_empty() {
            write!(f, "{}", self.body)
        } else {
            write!(f, "∀{}. {}", self.quantified.join(", "), self.body)
        }
    }
}
