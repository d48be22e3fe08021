//! Abstract syntax tree for the rowlang language.
//!
//! Expressions and patterns are produced by the parser and consumed by both
//! the type checker and the evaluator. Every node carries a byte-range span
//! into the source text; spans are informational only.

use std::fmt;

/// Byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub lo: usize,
    pub hi: usize,
}

impl Span {
    pub fn new(lo: usize, hi: usize) -> Self {
        Span { lo, hi }
    }
}

/// An expression node: the shape of the expression plus its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Expression shapes in the language.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal: 42, 0.5
    Num(f64),

    /// String literal: "hello"
    Str(String),

    /// Variable reference: x, foo, also symbolic operators like `+`
    Id(String),

    /// Record construction: { name: e, age: e }
    /// Keys are unique; the parser enforces this.
    Rec(Vec<(String, Expr)>),

    /// Homogeneous list: [e, e, e]
    List(Vec<Expr>),

    /// Tag construction: Ok(e), None. The name starts uppercase.
    Cons(String, Option<Box<Expr>>),

    /// Field projection: e.prop
    Acc(Box<Expr>, String),

    /// N-ary application: f(e1, e2)
    App(Box<Expr>, Vec<Expr>),

    /// N-ary abstraction: \x -> e, \(x, y) -> e
    Lam(Vec<String>, Box<Expr>),

    /// Pattern match over a tag: when e is Ok(x) -> e, Err -> e else e
    /// Cases are ordered; the top-level pattern of each case is a tag pattern.
    Match {
        scrutinee: Box<Expr>,
        cases: Vec<(Pattern, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
}

/// A pattern node: the shape of the pattern plus its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatKind,
    pub span: Span,
}

impl Pattern {
    pub fn new(kind: PatKind, span: Span) -> Self {
        Pattern { kind, span }
    }

    /// Names bound by this pattern, in source order.
    pub fn binders(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_binders(&mut out);
        out
    }

    fn collect_binders(&self, out: &mut Vec<String>) {
        match &self.kind {
            PatKind::Num(_) | PatKind::Str(_) => {}
            PatKind::Id(name) => out.push(name.clone()),
            PatKind::Cons(_, payload) => {
                if let Some(inner) = payload {
                    inner.collect_binders(out);
                }
            }
            PatKind::Rec(fields) => {
                for (_, inner) in fields {
                    inner.collect_binders(out);
                }
            }
            PatKind::List(items) => {
                for inner in items {
                    inner.collect_binders(out);
                }
            }
        }
    }

    /// Project the pattern into the expression of identical shape.
    ///
    /// The type checker infers patterns by inferring this projection with
    /// the pattern's binders bound in the environment.
    pub fn to_expr(&self) -> Expr {
        let kind = match &self.kind {
            PatKind::Num(n) => ExprKind::Num(*n),
            PatKind::Str(s) => ExprKind::Str(s.clone()),
            PatKind::Id(name) => ExprKind::Id(name.clone()),
            PatKind::Cons(name, payload) => ExprKind::Cons(
                name.clone(),
                payload.as_ref().map(|p| Box::new(p.to_expr())),
            ),
            PatKind::Rec(fields) => ExprKind::Rec(
                fields
                    .iter()
                    .map(|(k, p)| (k.clone(), p.to_expr()))
                    .collect(),
            ),
            PatKind::List(items) => {
                ExprKind::List(items.iter().map(Pattern::to_expr).collect())
            }
        };
        Expr::new(kind, self.span)
    }
}

/// Pattern shapes; a restricted mirror of the expression shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum PatKind {
    /// Numeric literal pattern
    Num(f64),
    /// String literal pattern
    Str(String),
    /// Binder: matches anything and binds the name
    Id(String),
    /// Tag pattern: Ok(p), None
    Cons(String, Option<Box<Pattern>>),
    /// Record pattern: { name: p }
    Rec(Vec<(String, Pattern)>),
    /// List pattern: [p, p]
    List(Vec<Pattern>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ExprKind::Num(n) => write!(f, "{n}"),
            ExprKind::Str(s) => write!(f, "\"{s}\""),
            ExprKind::Id(name) => write!(f, "{name}"),
            ExprKind::Rec(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            ExprKind::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ExprKind::Cons(name, payload) => match payload {
                Some(inner) => write!(f, "{name}({inner})"),
                None => write!(f, "{name}"),
            },
            ExprKind::Acc(record, prop) => write!(f, "{record}.{prop}"),
            ExprKind::App(callee, args) => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::Lam(params, body) => {
                write!(f, "(\\")?;
                if params.len() == 1 {
                    write!(f, "{}", params[0])?;
                } else {
                    write!(f, "(")?;
                    for (i, param) in params.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{param}")?;
                    }
                    write!(f, ")")?;
                }
                write!(f, " -> {body})")
            }
            ExprKind::Match {
                scrutinee,
                cases,
                otherwise,
            } => {
                write!(f, "(when {scrutinee} is ")?;
                for (i, (pattern, body)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{pattern} -> {body}")?;
                }
                if let Some(default) = otherwise {
                    write!(f, " else {default}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            PatKind::Num(n) => write!(f, "{n}"),
            PatKind::Str(s) => write!(f, "\"{s}\""),
            PatKind::Id(name) => write!(f, "{name}"),
            PatKind::Cons(name, payload) => match payload {
                Some(inner) => write!(f, "{name}({inner})"),
                None => write!(f, "{name}"),
            },
            PatKind::Rec(fields) => {
                write!(f, "{{")?;
                for (i, (key, pattern)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {pattern}")?;
                }
                write!(f, "}}")
            }
            PatKind::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
