//! rowlang: a small purely-functional expression language whose type system
//! is Hindley-Milner inference extended with row-polymorphic records and
//! polymorphic variants (open and closed tag unions).
//!
//! This library provides:
//! - AST definitions for expressions and patterns
//! - Parser built on the combine parser-combinator library
//! - Type inference: substitutions, unification, generalisation
//! - Tree-walking evaluator
//! - The standard environment of primitive operators
//!
//! # Example
//!
//! ```
//! use rowlang::{builtins, eval, parse, typecheck};
//!
//! let expr = parse("1 + 2").expect("parse error");
//! let ty = typecheck(&expr, &builtins::type_env()).expect("type error");
//! assert_eq!(format!("{ty}"), "num");
//!
//! let value = eval(&expr, &builtins::value_env()).expect("evaluation error");
//! assert_eq!(format!("{value}"), "3");
//! ```

pub mod ast;
pub mod builtins;
pub mod eval;
pub mod parser;
pub mod typechecker;
pub mod types;

// Re-export commonly used types and functions
pub use ast::{Expr, ExprKind, PatKind, Pattern, Span};
pub use eval::{eval, Environment, EvalError, Value};
pub use parser::{parse, parse_module, parse_repl, Module, ReplInput};
pub use typechecker::{
    infer, instantiate, typecheck, unify, RowSide, Substitution, TypeEnv, TypeError,
};
pub use types::{Row, Scheme, Type, VarSupply};
