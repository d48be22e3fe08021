/// Integration tests for the type inference pipeline: parse a source
/// expression, infer it in the standard environment, inspect the type.
use rowlang::{builtins, parse, typecheck, Type, TypeError};

fn check(source: &str) -> Result<Type, TypeError> {
    let expr = parse(source).expect("parse error");
    typecheck(&expr, &builtins::type_env())
}

fn shown(source: &str) -> String {
    format!("{}", check(source).expect("type error"))
}

#[test]
fn test_infer_literals() {
    assert_eq!(shown("42"), "num");
    assert_eq!(shown("-0.5"), "num");
    assert_eq!(shown("\"hello\""), "str");
}

#[test]
fn test_infer_identity_lambda() {
    // \x -> x : t -> t for some variable t
    match check("\\x -> x").unwrap() {
        Type::Cons(_, args) => {
            assert_eq!(args.len(), 2);
            assert_eq!(args[0], args[1]);
            assert!(matches!(args[0], Type::Var(_)));
        }
        other => panic!("expected a function, got {other}"),
    }
}

#[test]
fn test_infer_binary_add_lambda() {
    assert_eq!(shown("\\(x, y) -> x + y"), "num → num → num");
}

#[test]
fn test_infer_application() {
    assert_eq!(shown("(\\x -> x + 1)(41)"), "num");
}

#[test]
fn test_infer_operator_sections_through_names() {
    assert_eq!(shown("1 + 2 * 3"), "num");
    assert_eq!(shown("\"a\" ^ \"b\""), "str");
    assert_eq!(shown("[1] ++ [2]"), "List⟨num⟩");
}

#[test]
fn test_infer_eq_yields_closed_bool_variant() {
    assert_eq!(shown("eq(1, 2)"), "[False, True]");
    assert_eq!(shown("eq(\"a\", \"b\")"), "[False, True]");
}

#[test]
fn test_infer_eq_requires_same_type() {
    assert!(check("eq(1, \"a\")").is_err());
}

#[test]
fn test_infer_map() {
    assert_eq!(shown("map([1, 2], \\x -> x + 1)"), "List⟨num⟩");
    assert_eq!(shown("map([1, 2], \\x -> eq(x, 1))"), "List⟨[False, True]⟩");
}

#[test]
fn test_infer_fold() {
    assert_eq!(shown("fold([1, 2], \\(a, b) -> a + b, 0)"), "List⟨num⟩");
}

#[test]
fn test_infer_task_bind() {
    // \t -> t &> (\x -> t) : Task⟨a, e⟩ → Task⟨a, e⟩
    match check("\\t -> t &> (\\x -> t)").unwrap() {
        Type::Cons(_, args) => {
            assert_eq!(args.len(), 2);
            assert!(
                matches!(&args[0], Type::Cons(name, targs) if name == "Task" && targs.len() == 2)
            );
            assert_eq!(args[0], args[1]);
        }
        other => panic!("expected a function, got {other}"),
    }
}

#[test]
fn test_infer_list_elements_unify() {
    assert_eq!(shown("[1, 2, 3]"), "List⟨num⟩");
    assert!(check("[1, \"s\"]").is_err());
}

#[test]
fn test_infer_higher_order() {
    // \f -> \x -> f(x) : (a -> b) -> a -> b
    match check("\\f -> \\x -> f(x)").unwrap() {
        Type::Cons(_, args) => {
            assert_eq!(args.len(), 2);
            assert!(matches!(args[0], Type::Cons(_, _)));
        }
        other => panic!("expected a function, got {other}"),
    }
}

#[test]
fn test_infer_unbound_variable() {
    assert!(matches!(
        check("nope"),
        Err(TypeError::UnboundVariable(name)) if name == "nope"
    ));
}

#[test]
fn test_infer_add_rejects_strings() {
    assert!(matches!(
        check("1 + \"s\""),
        Err(TypeError::ConstructorMismatch(_, _))
    ));
}

#[test]
fn test_infer_application_of_non_function() {
    // 1(2) forces num against a function constructor
    assert!(matches!(
        check("(\\x -> x)(1)(2)"),
        Err(TypeError::ConstructorMismatch(_, _))
    ));
}

#[test]
fn test_inference_is_deterministic() {
    let first = check("[\\x -> x.bar, \\x -> x.foo]").unwrap();
    let second = check("[\\x -> x.bar, \\x -> x.foo]").unwrap();
    assert_eq!(first, second);
}
