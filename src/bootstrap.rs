//! Loads the fixed, ordered core library (`core`, `hof`, `num`, `macros`,
//! `repr`, `test`) into a fresh environment at startup. A parse error
//! anywhere in the list is fatal: a session cannot start with a broken
//! bootstrap library.

use std::fs;
use std::path::PathBuf;

use crate::environment::Env;
use crate::error::{EvalError, EvalErrorKind, Result};
use crate::eval::eval;
use crate::reader::parse_program;

/// The fixed, ordered list of library file stems loaded at startup.
pub const LIBRARY_FILES: [&str; 6] = ["core", "hof", "num", "macros", "repr", "test"];

/// The crate's own copy of each library file, embedded at compile time so
/// `new_session` works with no filesystem access at all. A caller-supplied
/// search path (see `load`) can still override any of these by name.
const EMBEDDED: [(&str, &str); 6] = [
    ("core", include_str!("../lib/core.yal")),
    ("hof", include_str!("../lib/hof.yal")),
    ("num", include_str!("../lib/num.yal")),
    ("macros", include_str!("../lib/macros.yal")),
    ("repr", include_str!("../lib/repr.yal")),
    ("test", include_str!("../lib/test.yal")),
];

/// Loads the fixed library list into `env`, each file's source resolved by
/// checking `search_path` (in order, first match wins) before falling back
/// to the embedded default, then evaluating every top-level form it parses
/// to, in order.
pub fn load(env: &Env, search_path: &[PathBuf]) -> Result<()> {
    for &name in LIBRARY_FILES.iter() {
        let source = find_source(name, search_path)?;
        load_source(env, &source, name)?;
    }
    Ok(())
}

/// Loads the fixed library list using only the crate's embedded defaults.
/// This is what `new_session` calls to produce a ready-to-go environment
/// with no dependency on the current working directory.
pub fn load_default(env: &Env) -> Result<()> {
    load(env, &[])
}

fn find_source(name: &str, search_path: &[PathBuf]) -> Result<String> {
    for dir in search_path {
        let candidate = dir.join(format!("{}.yal", name));
        if let Ok(text) = fs::read_to_string(&candidate) {
            return Ok(text);
        }
    }
    EMBEDDED
        .iter()
        .find(|(stem, _)| *stem == name)
        .map(|(_, src)| src.to_string())
        .ok_or_else(|| {
            EvalError::new(EvalErrorKind::HostError(format!(
                "missing bootstrap library '{}'",
                name
            )))
        })
}

fn load_source(env: &Env, source: &str, name: &str) -> Result<()> {
    let nodes = parse_program(source).map_err(|e| {
        EvalError::new(EvalErrorKind::HostError(format!(
            "fatal parse error loading bootstrap library '{}': {}",
            name,
            e.render()
        )))
    })?;
    for node in &nodes {
        eval(node, env)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign;
    use crate::value::Value;

    fn session() -> Env {
        let env = Env::new_root();
        foreign::install(&env);
        load_default(&env).expect("bootstrap library must load");
        env
    }

    #[test]
    fn core_list_helpers_are_available() {
        let env = session();
        let nodes = parse_program("(length (list 1 2 3))").unwrap();
        let mut result = Value::Nil;
        for node in &nodes {
            result = eval(node, &env).unwrap();
        }
        assert!(matches!(result, Value::Int(3)));
    }

    #[test]
    fn hof_map_and_filter_compose() {
        let env = session();
        let nodes =
            parse_program("(length (filter even? (map inc (list 1 2 3 4 5))))").unwrap();
        let mut result = Value::Nil;
        for node in &nodes {
            result = eval(node, &env).unwrap();
        }
        assert!(matches!(result, Value::Int(2)));
    }

    #[test]
    fn apply_built_from_syntax_quote_and_eval_works() {
        let env = session();
        let nodes = parse_program("(apply + (list 1 2 3 4))").unwrap();
        let mut result = Value::Nil;
        for node in &nodes {
            result = eval(node, &env).unwrap();
        }
        assert!(matches!(result, Value::Int(10)));
    }

    #[test]
    fn test_library_assertions_pass_and_fail_as_expected() {
        let env = session();
        let ok = parse_program("(assert-equal 4 (+ 2 2) \"math broke\")").unwrap();
        let mut result = Value::Nil;
        for node in &ok {
            result = eval(node, &env).unwrap();
        }
        assert!(matches!(result, Value::Bool(true)));

        let failing = parse_program("(assert-equal 4 5 \"not equal\")").unwrap();
        let mut last = Ok(Value::Nil);
        for node in &failing {
            last = eval(node, &env);
        }
        assert!(last.is_err());
    }
}
