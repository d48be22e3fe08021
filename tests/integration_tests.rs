/// End-to-end tests: modules with top-level declarations flow through
/// parsing, inference with generalisation, and evaluation, the way the
/// driver runs them.
use rowlang::eval::eval;
use rowlang::typechecker::infer;
use rowlang::types::VarSupply;
use rowlang::{builtins, parse_module, parse_repl, ReplInput, Value};

/// Run a module the way the file driver does and return the trailing
/// expression's printed value and scheme.
fn run_module(source: &str) -> Result<(String, String), String> {
    let module = parse_module(source)?;
    let mut tenv = builtins::type_env();
    let mut venv = builtins::value_env();
    let mut supply = VarSupply::new();

    for (name, expr) in &module.decls {
        let (subst, ty) = infer(expr, &tenv, &mut supply).map_err(|e| e.to_string())?;
        let ty = subst.apply(&ty).map_err(|e| e.to_string())?;
        let scheme = tenv.generalize(&ty);
        tenv.bind(name.clone(), scheme);
        let value = eval(expr, &venv).map_err(|e| e.to_string())?;
        venv.bind(name.clone(), value);
    }

    let body = module.body.ok_or_else(|| "module has no body".to_string())?;
    let (subst, ty) = infer(&body, &tenv, &mut supply).map_err(|e| e.to_string())?;
    let ty = subst.apply(&ty).map_err(|e| e.to_string())?;
    let scheme = tenv.generalize(&ty);
    let value = eval(&body, &venv).map_err(|e| e.to_string())?;
    Ok((format!("{value}"), format!("{scheme}")))
}

#[test]
fn test_module_with_declarations() {
    let (value, ty) = run_module(
        "inc = \\x -> x + 1\n\
         answer = inc(41)\n\
         answer",
    )
    .unwrap();
    assert_eq!(value, "42");
    assert_eq!(ty, "num");
}

#[test]
fn test_top_level_generalisation_allows_reuse_at_two_types() {
    let (value, ty) = run_module(
        "id = \\x -> x\n\
         n = id(1)\n\
         s = id(\"s\")\n\
         n",
    )
    .unwrap();
    assert_eq!(value, "1");
    assert_eq!(ty, "num");
}

#[test]
fn test_identity_declaration_generalises() {
    let module = parse_module("id = \\x -> x").unwrap();
    let mut tenv = builtins::type_env();
    let mut supply = VarSupply::new();
    let (name, expr) = &module.decls[0];
    let (subst, ty) = infer(expr, &tenv, &mut supply).unwrap();
    let ty = subst.apply(&ty).unwrap();
    let scheme = tenv.generalize(&ty);
    assert_eq!(scheme.quantified.len(), 1);
    tenv.bind(name.clone(), scheme);
    assert_eq!(format!("{}", tenv.lookup("id").unwrap()), "∀T0. T0 → T0");
}

#[test]
fn test_row_polymorphic_accessor_across_records() {
    let (value, ty) = run_module(
        "getAge = \\r -> r.age\n\
         getAge({age: 25, name: \"ada\"}) + getAge({age: 30, city: \"rome\"})",
    )
    .unwrap();
    assert_eq!(value, "55");
    assert_eq!(ty, "num");
}

#[test]
fn test_variant_pipeline() {
    let (value, ty) = run_module(
        "classify = \\n -> when eq(n, 0) is True -> Zero, False -> NonZero(n)\n\
         when classify(3) is Zero -> 0, NonZero(x) -> x",
    )
    .unwrap();
    assert_eq!(value, "3");
    assert_eq!(ty, "num");
}

#[test]
fn test_higher_order_module() {
    let (value, ty) = run_module(
        "twice = \\f -> \\x -> f(f(x))\n\
         twice(\\x -> x * 3)(2)",
    )
    .unwrap();
    assert_eq!(value, "18");
    assert_eq!(ty, "num");
}

#[test]
fn test_module_type_error_reports_declaration() {
    let err = run_module("bad = 1 + \"s\"\nbad").unwrap_err();
    assert!(err.contains("num") || err.contains("str"), "got: {err}");
}

#[test]
fn test_repl_flow() {
    let mut tenv = builtins::type_env();
    let mut venv = builtins::value_env();
    let mut supply = VarSupply::new();

    for line in ["double = \\x -> x + x", "result = double(4)"] {
        match parse_repl(line).unwrap() {
            ReplInput::Decl(name, expr) => {
                let (subst, ty) = infer(&expr, &tenv, &mut supply).unwrap();
                let ty = subst.apply(&ty).unwrap();
                let scheme = tenv.generalize(&ty);
                tenv.bind(name.clone(), scheme);
                let value = eval(&expr, &venv).unwrap();
                venv.bind(name, value);
            }
            ReplInput::Expr(_) => panic!("expected a declaration"),
        }
    }
    assert_eq!(venv.lookup("result"), Some(&Value::Num(8.0)));

    match parse_repl("double(10)").unwrap() {
        ReplInput::Expr(expr) => {
            assert_eq!(eval(&expr, &venv), Ok(Value::Num(20.0)));
        }
        ReplInput::Decl(_, _) => panic!("expected an expression"),
    }
}

#[test]
fn test_fold_and_map_pipeline() {
    let (value, ty) = run_module(
        "steps = [1, 4, 9]\n\
         gaps = fold(steps, \\(prev, next) -> next + prev * -1, 0)\n\
         map(gaps, \\g -> g * 10)",
    )
    .unwrap();
    assert_eq!(value, "[10, 30, 50]");
    assert_eq!(ty, "List⟨num⟩");
}
