//! rowlang driver.
//!
//! Runs a source file (declarations plus an optional trailing expression)
//! or, with no file argument, starts an interactive session.

use clap::Parser;
use rowlang::builtins;
use rowlang::eval::{eval, Environment};
use rowlang::parser::{parse_module, parse_repl, ReplInput};
use rowlang::typechecker::{infer, TypeEnv};
use rowlang::types::VarSupply;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "rowlang",
    version,
    about = "A small functional language with row-polymorphic records and variants"
)]
struct Cli {
    /// Source file to run; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Type-check the file without evaluating it
    #[arg(long)]
    check: bool,
}

#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match &cli.file {
        Some(path) => run_file(path, cli.check),
        None => repl(),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run_file(path: &Path, check_only: bool) -> Result<(), String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let module = parse_module(&source)?;

    let mut tenv = builtins::type_env();
    let mut venv = builtins::value_env();
    let mut supply = VarSupply::new();

    for (name, expr) in &module.decls {
        let (subst, ty) = infer(expr, &tenv, &mut supply)
            .map_err(|e| format!("type error in {name}: {e}"))?;
        let ty = subst
            .apply(&ty)
            .map_err(|e| format!("type error in {name}: {e}"))?;
        let scheme = tenv.generalize(&ty);
        tenv.bind(name.clone(), scheme);
        if !check_only {
            let value =
                eval(expr, &venv).map_err(|e| format!("evaluation error in {name}: {e}"))?;
            venv.bind(name.clone(), value);
        }
    }

    if let Some(body) = &module.body {
        let (subst, ty) = infer(body, &tenv, &mut supply).map_err(|e| format!("type error: {e}"))?;
        let ty = subst.apply(&ty).map_err(|e| format!("type error: {e}"))?;
        let scheme = tenv.generalize(&ty);
        if check_only {
            println!("{scheme}");
        } else {
            let value = eval(body, &venv).map_err(|e| format!("evaluation error: {e}"))?;
            println!("{value} : {scheme}");
        }
    }

    Ok(())
}

fn repl() -> Result<(), String> {
    println!("rowlang {}", env!("CARGO_PKG_VERSION"));
    println!("Type expressions or declarations. Press Ctrl+D to exit.");
    println!();

    let mut editor = DefaultEditor::new().map_err(|e| e.to_string())?;
    let mut tenv = builtins::type_env();
    let mut venv = builtins::value_env();
    let mut supply = VarSupply::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                match repl_line(line, &mut tenv, &mut venv, &mut supply) {
                    Ok(shown) => println!("{shown}"),
                    Err(message) => eprintln!("{message}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("bye");
                return Ok(());
            }
            Err(e) => return Err(e.to_string()),
        }
    }
}

fn repl_line(
    line: &str,
    tenv: &mut TypeEnv,
    venv: &mut Environment,
    supply: &mut VarSupply,
) -> Result<String, String> {
    match parse_repl(line)? {
        ReplInput::Decl(name, expr) => {
            let (subst, ty) = infer(&expr, tenv, supply).map_err(|e| format!("type error: {e}"))?;
            let ty = subst.apply(&ty).map_err(|e| format!("type error: {e}"))?;
            let scheme = tenv.generalize(&ty);
            let value = eval(&expr, venv).map_err(|e| format!("evaluation error: {e}"))?;
            let shown = format!("{name} : {scheme}");
            tenv.bind(name.clone(), scheme);
            venv.bind(name, value);
            Ok(shown)
        }
        ReplInput::Expr(expr) => {
            let (subst, ty) = infer(&expr, tenv, supply).map_err(|e| format!("type error: {e}"))?;
            let ty = subst.apply(&ty).map_err(|e| format!("type error: {e}"))?;
            let scheme = tenv.generalize(&ty);
            let value = eval(&expr, venv).map_err(|e| format!("evaluation error: {e}"))?;
            Ok(format!("{value} : {scheme}"))
        }
    }
}
