//! A minimal, non-interactive runner: reads a program (from a file path
//! argument, or stdin if none is given), evaluates its top-level forms in
//! order against a fresh session, and prints the value of the last one.
//!
//! The interactive REPL (readline-style editing, a `~/.yalix_history`
//! file, tab-completion over the environment) is an external
//! collaborator this crate does not implement; this binary exists only
//! so the library has an executable surface to run a program through
//! end to end.

use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use yalix::lazylist::repr;
use yalix::{eval, new_session, reader};

fn main() -> ExitCode {
    let path = std::env::args().nth(1);
    let source = match &path {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("yalix: could not read '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut text = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut text) {
                eprintln!("yalix: could not read stdin: {}", e);
                return ExitCode::FAILURE;
            }
            text
        }
    };

    let env = match new_session() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("yalix: fatal: {}", e.render());
            return ExitCode::FAILURE;
        }
    };

    let nodes = match reader::parse_program(&source) {
        Ok(nodes) => nodes,
        Err(e) => {
            eprintln!("{}", e.render());
            return ExitCode::FAILURE;
        }
    };

    let mut last = yalix::Value::Nil;
    for node in &nodes {
        match eval::eval(node, &env) {
            Ok(v) => last = v,
            Err(e) => {
                eprintln!("{}", e.render());
                return ExitCode::FAILURE;
            }
        }
    }

    match repr(&last, &env) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("{}", e.render()),
    }
    ExitCode::SUCCESS
}
