//! The standard environment shipped with the language.
//!
//! `type_env` is the typing half: the schemes of the primitive operators.
//! `value_env` is the runtime half: native implementations for everything
//! the evaluator can run. `&>` is typed but carries no runtime; `Task` is a
//! phantom effect type with no effect engine behind it.

use crate::eval::{apply, Environment, EvalError, NativeFn, Value};
use crate::typechecker::TypeEnv;
use crate::types::{Row, Scheme, Type};
use std::collections::BTreeMap;

fn tvar(name: &str) -> Type {
    Type::var(name)
}

/// The closed [True, False] variant produced by comparisons.
fn bool_variant() -> Type {
    let mut items = BTreeMap::new();
    items.insert("True".to_string(), Type::unit());
    items.insert("False".to_string(), Type::unit());
    Type::Rec(Row::new(true, false, items, "b"))
}

/// Typing environment with the primitive operator schemes.
pub fn type_env() -> TypeEnv {
    let mut env = TypeEnv::new();

    env.bind(
        "+",
        Scheme::monomorphic(Type::func(vec![Type::num(), Type::num()], Type::num())),
    );
    env.bind(
        "*",
        Scheme::monomorphic(Type::func(vec![Type::num(), Type::num()], Type::num())),
    );
    env.bind(
        "^",
        Scheme::monomorphic(Type::func(
            vec![Type::string(), Type::string()],
            Type::string(),
        )),
    );
    env.bind(
        "++",
        Scheme::new(
            vec!["t".to_string()],
            Type::func(
                vec![Type::list(tvar("t")), Type::list(tvar("t"))],
                Type::list(tvar("t")),
            ),
        ),
    );
    env.bind(
        "eq",
        Scheme::new(
            vec!["t".to_string()],
            Type::func(vec![tvar("t"), tvar("t")], bool_variant()),
        ),
    );
    env.bind(
        "fold",
        Scheme::new(
            vec!["t".to_string(), "k".to_string()],
            Type::func(
                vec![
                    Type::list(tvar("t")),
                    Type::func(vec![tvar("t"), tvar("t")], tvar("k")),
                    tvar("t"),
                ],
                Type::list(tvar("k")),
            ),
        ),
    );
    env.bind(
        "map",
        Scheme::new(
            vec!["t".to_string(), "k".to_string()],
            Type::func(
                vec![
                    Type::list(tvar("t")),
                    Type::func(vec![tvar("t")], tvar("k")),
                ],
                Type::list(tvar("k")),
            ),
        ),
    );
    env.bind(
        "&>",
        Scheme::new(
            vec!["t".to_string(), "e".to_string(), "k".to_string()],
            Type::func(
                vec![
                    Type::task(tvar("t"), tvar("e")),
                    Type::func(vec![tvar("t")], Type::task(tvar("k"), tvar("e"))),
                ],
                Type::task(tvar("k"), tvar("e")),
            ),
        ),
    );

    env
}

/// Value environment with the native implementations.
pub fn value_env() -> Environment {
    let mut env = Environment::new();
    env.bind("+", native("+", 2, add));
    env.bind("*", native("*", 2, mul));
    env.bind("^", native("^", 2, concat_str));
    env.bind("++", native("++", 2, append));
    env.bind("eq", native("eq", 2, structural_eq));
    env.bind("fold", native("fold", 3, fold));
    env.bind("map", native("map", 2, map));
    env
}

fn native(name: &'static str, arity: usize, run: fn(&[Value]) -> Result<Value, EvalError>) -> Value {
    Value::Native(NativeFn { name, arity, run })
}

fn add(args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        _ => Err(EvalError::TypeError("+ expects numbers".to_string())),
    }
}

fn mul(args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a * b)),
        _ => Err(EvalError::TypeError("* expects numbers".to_string())),
    }
}

fn concat_str(args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        _ => Err(EvalError::TypeError("^ expects strings".to_string())),
    }
}

fn append(args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::List(a), Value::List(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Value::List(out))
        }
        _ => Err(EvalError::TypeError("++ expects lists".to_string())),
    }
}

fn values_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => Ok((x - y).abs() < f64::EPSILON),
        (Value::Str(x), Value::Str(y)) => Ok(x == y),
        (Value::List(xs), Value::List(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if !values_equal(x, y)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Rec(xs), Value::Rec(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (key, x) in xs {
                match ys.get(key) {
                    Some(y) if values_equal(x, y)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        (Value::Tag(n1, p1), Value::Tag(n2, p2)) => {
            if n1 != n2 {
                return Ok(false);
            }
            match (p1, p2) {
                (None, None) => Ok(true),
                (Some(x), Some(y)) => values_equal(x, y),
                _ => Ok(false),
            }
        }
        _ => Err(EvalError::TypeError(
            "eq cannot compare functions".to_string(),
        )),
    }
}

fn structural_eq(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::bool_tag(values_equal(&args[0], &args[1])?))
}

fn map(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(apply(&args[1], &[item.clone()])?);
            }
            Ok(Value::List(out))
        }
        _ => Err(EvalError::TypeError("map expects a list".to_string())),
    }
}

/// Accumulating map: each element is combined with its predecessor (the
/// seed for the first element) and the combined values are collected.
fn fold(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::List(items) => {
            let mut previous = args[2].clone();
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(apply(&args[1], &[previous, item.clone()])?);
                previous = item.clone();
            }
            Ok(Value::List(out))
        }
        _ => Err(EvalError::TypeError("fold expects a list".to_string())),
    }
}
