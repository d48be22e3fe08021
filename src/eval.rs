//! Tree-walking evaluator for the rowlang language.
//!
//! The evaluator shares the AST with the type checker but never consults
//! inference state; it walks expressions against a parallel value
//! environment. Pattern matching tries cases in order and falls through on
//! mismatch.

use crate::ast::{Expr, ExprKind, PatKind, Pattern};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Runtime values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    List(Vec<Value>),
    Rec(BTreeMap<String, Value>),
    Tag(String, Option<Box<Value>>),
    Closure(Vec<String>, Expr, Environment),
    Native(NativeFn),
}

/// A built-in function of fixed arity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub run: fn(&[Value]) -> Result<Value, EvalError>,
}

impl Value {
    pub fn tag(name: impl Into<String>) -> Value {
        Value::Tag(name.into(), None)
    }

    /// The [True]/[False] tags produced by comparisons.
    pub fn bool_tag(b: bool) -> Value {
        Value::tag(if b { "True" } else { "False" })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Rec(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Tag(name, payload) => match payload {
                Some(inner) => write!(f, "{name}({inner})"),
                None => write!(f, "{name}"),
            },
            Value::Closure(params, _, _) => write!(f, "<function {}>", params.join(", ")),
            Value::Native(native) => write!(f, "<native {}>", native.name),
        }
    }
}

/// Environment for variable bindings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn extend(&self, name: impl Into<String>, value: Value) -> Self {
        let mut out = self.clone();
        out.bind(name, value);
        out
    }
}

/// Evaluation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    UnboundVariable(String),
    TypeError(String),
    MissingField(String),
    ArityMismatch(usize, usize),
    NoMatchingCase,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvalError::UnboundVariable(name) => write!(f, "unbound variable: {name}"),
            EvalError::TypeError(msg) => write!(f, "type error: {msg}"),
            EvalError::MissingField(field) => write!(f, "record has no field {field}"),
            EvalError::ArityMismatch(expected, given) => {
                write!(f, "function of {expected} parameters applied to {given} arguments")
            }
            EvalError::NoMatchingCase => write!(f, "no case matched the value"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluate an expression in an environment.
pub fn eval(expr: &Expr, env: &Environment) -> Result<Value, EvalError> {
    match &expr.kind {
        ExprKind::Num(n) => Ok(Value::Num(*n)),

        ExprKind::Str(s) => Ok(Value::Str(s.clone())),

        ExprKind::Id(name) => env
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UnboundVariable(name.clone())),

        ExprKind::Rec(fields) => {
            let mut out = BTreeMap::new();
            for (key, value) in fields {
                out.insert(key.clone(), eval(value, env)?);
            }
            Ok(Value::Rec(out))
        }

        ExprKind::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, env)?);
            }
            Ok(Value::List(out))
        }

        ExprKind::Cons(name, payload) => {
            let payload = match payload {
                Some(inner) => Some(Box::new(eval(inner, env)?)),
                None => None,
            };
            Ok(Value::Tag(name.clone(), payload))
        }

        ExprKind::Acc(record, prop) => match eval(record, env)? {
            Value::Rec(fields) => fields
                .get(prop)
                .cloned()
                .ok_or_else(|| EvalError::MissingField(prop.clone())),
            other => Err(EvalError::TypeError(format!(
                "field access on a non-record value: {other}"
            ))),
        },

        ExprKind::App(callee, args) => {
            let callee = eval(callee, env)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, env)?);
            }
            apply(&callee, &values)
        }

        ExprKind::Lam(params, body) => Ok(Value::Closure(
            params.clone(),
            (**body).clone(),
            env.clone(),
        )),

        ExprKind::Match {
            scrutinee,
            cases,
            otherwise,
        } => {
            let value = eval(scrutinee, env)?;
            for (pattern, body) in cases {
                if let Some(bindings) = match_pattern(pattern, &value) {
                    let mut scoped = env.clone();
                    for (name, bound) in bindings {
                        scoped.bind(name, bound);
                    }
                    return eval(body, &scoped);
                }
            }
            match otherwise {
                Some(default) => eval(default, env),
                None => Err(EvalError::NoMatchingCase),
            }
        }
    }
}

/// Apply a function value to already-evaluated arguments.
pub fn apply(callee: &Value, args: &[Value]) -> Result<Value, EvalError> {
    match callee {
        Value::Closure(params, body, closure_env) => {
            if params.len() != args.len() {
                return Err(EvalError::ArityMismatch(params.len(), args.len()));
            }
            let mut scoped = closure_env.clone();
            for (param, arg) in params.iter().zip(args) {
                scoped.bind(param.clone(), arg.clone());
            }
            eval(body, &scoped)
        }
        Value::Native(native) => {
            if native.arity != args.len() {
                return Err(EvalError::ArityMismatch(native.arity, args.len()));
            }
            (native.run)(args)
        }
        other => Err(EvalError::TypeError(format!(
            "application of a non-function value: {other}"
        ))),
    }
}

fn nums_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}

/// Match a value against a pattern, returning the bindings on success.
/// Record patterns ignore extra fields; list patterns are exact-length.
fn match_pattern(pattern: &Pattern, value: &Value) -> Option<Vec<(String, Value)>> {
    match (&pattern.kind, value) {
        (PatKind::Num(n), Value::Num(m)) if nums_equal(*n, *m) => Some(Vec::new()),
        (PatKind::Str(s), Value::Str(t)) if s == t => Some(Vec::new()),
        (PatKind::Id(name), _) => Some(vec![(name.clone(), value.clone())]),
        (PatKind::Cons(name, payload), Value::Tag(tag, tagged)) if name == tag => {
            match (payload, tagged) {
                (None, None) => Some(Vec::new()),
                (Some(inner), Some(bound)) => match_pattern(inner, bound),
                _ => None,
            }
        }
        (PatKind::Rec(fields), Value::Rec(bound)) => {
            let mut out = Vec::new();
            for (key, inner) in fields {
                out.extend(match_pattern(inner, bound.get(key)?)?);
            }
            Some(out)
        }
        (PatKind::List(items), Value::List(bound)) if items.len() == bound.len() => {
            let mut out = Vec::new();
            for (inner, value) in items.iter().zip(bound) {
                out.extend(match_pattern(inner, value)?);
            }
            Some(out)
        }
        _ => None,
    }
}
