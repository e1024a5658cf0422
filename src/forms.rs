//! Special-form semantics: everything `eval` delegates to once it has
//! matched a node (or, rarely, a first-class `SpecialForm` value applied
//! through a generic `Apply`) to its keyword.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::{Datum, Literal, Node, NodeKind};
use crate::environment::Env;
use crate::error::{EvalError, EvalErrorKind, Result};
use crate::eval::{eval, eval_body};
use crate::gensym::{hygienic_rewrite, next_syntax_quote_id};
use crate::lazylist::{list_of_values, realize};
use crate::location::Brand;
use crate::value::{Formals, Promise, SpecialFormKind, Value};

/// Validates a closure's formal list: every name distinct, matching the
/// invariant that parsing already guarantees at most one variadic marker
/// in the right position (the reader can't produce anything else).
pub fn validate_formals(formals: &Formals, brand: Option<&Brand>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in formals.required.iter().chain(formals.variadic.iter()) {
        if !seen.insert(name.clone()) {
            return Err(EvalError::new(EvalErrorKind::MalformedForm(format!(
                "duplicate formal '{}'",
                name
            )))
            .at(brand.cloned()));
        }
    }
    Ok(())
}

/// `define`: a bare symbol binds the `Unbound` marker (0 bodies), a value
/// form binds the evaluated single body expression, and the function-sugar
/// form (carried as `Some(formals)`) is equivalent to binding a `lambda`.
/// Always writes the global frame, per the resolved open question.
pub fn eval_define(
    name: &Rc<str>,
    formals: &Option<Formals>,
    docstring: &Option<Rc<str>>,
    body: &[Rc<Node>],
    env: &Env,
    brand: Option<&Brand>,
) -> Result<Value> {
    let value = match formals {
        Some(formals) => {
            validate_formals(formals, brand)?;
            Value::Closure(Rc::new(crate::value::Closure {
                name: Some(name.clone()),
                formals: formals.clone(),
                body: body.to_vec(),
                captured_env: env.clone(),
                docstring: docstring.clone(),
                source: brand.cloned(),
            }))
        }
        None => match body.len() {
            0 => Value::Unbound,
            1 => eval(&body[0], env)?,
            _ => {
                return Err(EvalError::new(EvalErrorKind::MalformedForm(format!(
                    "'define' of '{}' takes at most one body expression",
                    name
                )))
                .at(brand.cloned()))
            }
        },
    };
    env.define_global(name.clone(), value);
    Ok(Value::symbol(name.clone()))
}

/// `quote`: the literal shape of `e`, atoms/symbols as themselves, lists
/// as a lazy `cons`/promise chain of recursively quoted elements, with any
/// nested `unquote-splice` expanded into the surrounding list in place.
pub fn eval_quote(datum: &Datum, env: &Env) -> Result<Value> {
    reify(datum, env, None)
}

/// `syntax-quote`: as `quote`, but establishes one fresh gensym id so every
/// trailing-`#` symbol in the template hygienically expands to the same
/// `name__<id>__auto__`.
pub fn eval_syntax_quote(datum: &Datum, env: &Env) -> Result<Value> {
    let id = next_syntax_quote_id();
    reify(datum, env, Some(id))
}

fn reify(datum: &Datum, env: &Env, hygiene: Option<u64>) -> Result<Value> {
    match datum {
        Datum::Nil => Ok(Value::Nil),
        Datum::Bool(b) => Ok(Value::Bool(*b)),
        Datum::Int(i) => Ok(Value::Int(*i)),
        Datum::Float(f) => Ok(Value::Float(*f)),
        Datum::Str(s) => Ok(Value::Str(s.clone())),
        Datum::Symbol(name) => Ok(match hygiene {
            Some(id) => Value::symbol(hygienic_rewrite(name, id)),
            None => Value::symbol(name.clone()),
        }),
        Datum::Unquote(node) => eval(node, env),
        Datum::UnquoteSplice(_) => Err(EvalError::new(EvalErrorKind::MalformedForm(
            "unquote-splice may only appear inside a quoted list".into(),
        ))),
        Datum::List { items, tail } => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Datum::UnquoteSplice(node) => {
                        let spliced = eval(node, env)?;
                        let (elems, _) = realize(&spliced)?;
                        values.extend(elems);
                    }
                    other => values.push(reify(other, env, hygiene)?),
                }
            }
            let tail_value = match tail {
                Some(t) => reify(t, env, hygiene)?,
                None => Value::Nil,
            };
            Ok(list_of_values(values, tail_value))
        }
    }
}

/// Dispatches a first-class `SpecialForm` value applied through a generic
/// `Apply` node (e.g. `(define my-if if) (my-if #t 1 2)`). Only forms whose
/// surface is a flat, unevaluated argument list make sense here; the
/// binding-introducing forms (`let`/`let*`/`letrec`/`lambda`/`define`) need
/// their literal nested-binding syntax and are only reachable through the
/// reader's keyword recognition.
pub fn apply_special_form(
    kind: SpecialFormKind,
    args: &[Rc<Node>],
    env: &Env,
    brand: Option<&Brand>,
) -> Result<Value> {
    use SpecialFormKind::*;
    match kind {
        If => {
            if args.len() != 2 && args.len() != 3 {
                return Err(arity_err("if", "2 or 3", args.len(), brand));
            }
            if eval(&args[0], env)?.is_truthy() {
                eval(&args[1], env)
            } else if let Some(alt) = args.get(2) {
                eval(alt, env)
            } else {
                Ok(Value::Nil)
            }
        }
        Begin => eval_body(args, env),
        Delay => Ok(Value::Promise(Rc::new(Promise::new(args.to_vec(), env.clone())))),
        Set => {
            if args.len() != 2 {
                return Err(arity_err("set!", "2", args.len(), brand));
            }
            let name = expect_symbol_ref(&args[0], brand)?;
            let value = eval(&args[1], env)?;
            env.set(&name, value.clone())
                .map_err(|e| e.at(brand.cloned()))?;
            Ok(value)
        }
        EvalForm => {
            if args.len() != 1 {
                return Err(arity_err("eval", "1", args.len(), brand));
            }
            let quoted = eval(&args[0], env)?;
            let reified_node = crate::eval::value_to_node(&quoted)?;
            eval(&reified_node, env)
        }
        Quote | SyntaxQuote => {
            if args.len() != 1 {
                return Err(arity_err(kind.keyword(), "1", args.len(), brand));
            }
            let datum = crate::eval::node_to_datum(&args[0])?;
            match kind {
                Quote => eval_quote(&datum, env),
                SyntaxQuote => eval_syntax_quote(&datum, env),
                _ => unreachable!(),
            }
        }
        Unquote => {
            if args.len() != 1 {
                return Err(arity_err("unquote", "1", args.len(), brand));
            }
            eval(&args[0], env)
        }
        UnquoteSplice => {
            if args.len() != 1 {
                return Err(arity_err("unquote-splice", "1", args.len(), brand));
            }
            let v = eval(&args[0], env)?;
            let (items, tail) = realize(&v)?;
            Ok(list_of_values(items, tail))
        }
        Define | Lambda | Let | LetStar | LetRec => Err(EvalError::new(EvalErrorKind::MalformedForm(
            format!(
                "'{}' cannot be applied as a first-class value, use its keyword syntax",
                kind.keyword()
            ),
        ))
        .at(brand.cloned())),
    }
}

fn expect_symbol_ref(node: &Node, brand: Option<&Brand>) -> Result<Rc<str>> {
    match &node.kind {
        NodeKind::SymbolRef(name) => Ok(name.clone()),
        NodeKind::Atom(Literal::Nil) => Ok(Rc::from("nil")),
        _ => Err(EvalError::new(EvalErrorKind::MalformedForm(
            "expected a symbol".into(),
        ))
        .at(brand.cloned())),
    }
}

fn arity_err(who: &str, expected: &str, got: usize, brand: Option<&Brand>) -> EvalError {
    crate::value::arity_error(who, expected, got).at(brand.cloned())
}

/// The recursive step shared by `letrec`: installs one forward-ref per
/// binding into an extended env, then fills each in by evaluating its
/// initializer against that same env, so mutually recursive closures see
/// each other's (eventually-filled) cells.
pub fn eval_letrec(
    bindings: &[(Rc<str>, Rc<Node>)],
    body: &[Rc<Node>],
    env: &Env,
    brand: Option<&Brand>,
) -> Result<Value> {
    let mut seen = HashSet::new();
    for (name, _) in bindings {
        if !seen.insert(name.clone()) {
            return Err(EvalError::new(EvalErrorKind::MalformedForm(format!(
                "duplicate letrec binding '{}'",
                name
            )))
            .at(brand.cloned()));
        }
    }

    let mut cur = env.clone();
    let mut cells = Vec::with_capacity(bindings.len());
    for (name, _) in bindings {
        let cell = Rc::new(RefCell::new(None));
        cur = cur.extend(name.clone(), Value::ForwardRef(cell.clone()));
        cells.push(cell);
    }
    for ((_, value_expr), cell) in bindings.iter().zip(cells.iter()) {
        let v = eval(value_expr, &cur)?;
        *cell.borrow_mut() = Some(v);
    }
    eval_body(body, &cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_program;

    fn run(src: &str) -> Value {
        let env = Env::new_root();
        let mut result = Value::Nil;
        for node in parse_program(src).unwrap() {
            result = eval(&node, &env).unwrap();
        }
        result
    }

    #[test]
    fn letrec_supports_mutual_recursion() {
        let v = run(
            "(letrec ((is-even (lambda (n) (if (= n 0) #t (is-odd (- n 1)))))
                      (is-odd (lambda (n) (if (= n 0) #f (is-even (- n 1))))))
               (is-even 10))",
        );
        assert!(matches!(v, Value::Bool(true)));
    }

    #[test]
    fn quote_builds_lazy_list_with_splice_expansion() {
        let v = run("(quote (1 (unquote-splice (quote (2 3))) 4))");
        let (items, _) = realize(&v).unwrap();
        assert_eq!(items.len(), 4);
        assert!(matches!(items[0], Value::Int(1)));
        assert!(matches!(items[3], Value::Int(4)));
    }

    #[test]
    fn syntax_quote_rewrites_trailing_hash_symbols() {
        let v = run("(syntax-quote tmp#)");
        match v {
            Value::Symbol(s) => assert!(s.ends_with("__auto__") && s.starts_with("tmp__")),
            _ => panic!("expected symbol"),
        }
    }
}
