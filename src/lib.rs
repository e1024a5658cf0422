//! Yalix: a tree-walking interpreter for a small Scheme/Racket-like LISP
//! dialect. The reader recognizes special forms directly into a typed AST
//! (see `ast`/`reader`) instead of re-interpreting a generic s-expression at
//! eval time; environments are a persistent, `Rc`-linked chain of local
//! frames sharing one mutable global frame (see `environment`); lists are a
//! uniform lazy `cons`/promise chain (see `lazylist`).

pub mod ast;
pub mod bootstrap;
pub mod environment;
pub mod error;
pub mod eval;
pub mod foreign;
pub mod forms;
pub mod gensym;
pub mod lazylist;
pub mod location;
pub mod reader;
pub mod value;

pub use environment::Env;
pub use error::{EvalError, EvalErrorKind, ReadError, ReadErrorKind, Result};
pub use value::Value;

/// Builds a fresh interpreter session: a root environment with every
/// foreign primitive and special-form keyword installed, followed by the
/// bootstrap library loaded on top of it.
pub fn new_session() -> Result<Env> {
    let env = Env::new_root();
    foreign::install(&env);
    bootstrap::load_default(&env)?;
    Ok(env)
}
