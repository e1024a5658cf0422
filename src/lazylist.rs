//! The lazy cons-list protocol: `cons`/`first`/`rest`, promise forcing,
//! eager realisation, and the bounded printer. One representation, a
//! right-nested `cons` whose tail may be a `Promise`, backs variadic
//! argument collection, quoted lists, and splice expansion alike.

use std::rc::Rc;

use crate::ast::Node;
use crate::environment::Env;
use crate::error::Result;
use crate::eval::eval;
use crate::value::{ConsCell, Promise, PromiseState, Thunk, Value};

/// Forces `p` if unforced, memoising the result; returns the same value on
/// every subsequent call (single-shot forcing).
pub fn force(p: &Rc<Promise>) -> Result<Value> {
    if let PromiseState::Forced(v) = &*p.state.borrow() {
        return Ok(v.clone());
    }
    let thunk = {
        let mut state = p.state.borrow_mut();
        match std::mem::replace(&mut *state, PromiseState::Forced(Value::Nil)) {
            PromiseState::Unforced(thunk) => thunk,
            PromiseState::Forced(v) => {
                *state = PromiseState::Forced(v.clone());
                return Ok(v);
            }
        }
    };
    let value = run_thunk(thunk)?;
    *p.state.borrow_mut() = PromiseState::Forced(value.clone());
    Ok(value)
}

fn run_thunk(thunk: Thunk) -> Result<Value> {
    match thunk {
        Thunk::Body { body, env } => {
            let mut result = Value::Nil;
            for node in &body {
                result = eval(node, &env)?;
            }
            Ok(result)
        }
        Thunk::VariadicRest { args, env } => {
            if args.is_empty() {
                return Ok(Value::Nil);
            }
            let head = eval(&args[0], &env)?;
            let tail = if args.len() > 1 {
                Value::Promise(Rc::new(Promise::new_variadic_rest(args[1..].to_vec(), env)))
            } else {
                Value::Nil
            };
            Ok(Value::cons(head, tail))
        }
    }
}

/// The head of a cons cell.
pub fn first(cell: &ConsCell) -> Value {
    cell.head.clone()
}

/// The tail of a cons cell, forcing it if it is a promise.
pub fn rest(cell: &ConsCell) -> Result<Value> {
    match &cell.tail {
        Value::Promise(p) => force(p),
        other => Ok(other.clone()),
    }
}

/// Builds the lazy, trailing-variadic argument list from the unevaluated
/// expressions past a closure's fixed formals: the first is forced
/// immediately (so arity/type errors in it surface at call time), the rest
/// stay behind a promise chain.
pub fn collect_variadic(exprs: &[Rc<Node>], env: &Env) -> Result<Value> {
    run_thunk(Thunk::VariadicRest {
        args: exprs.to_vec(),
        env: env.clone(),
    })
}

/// Builds a right-nested `cons`/promise chain from already-known values.
/// Used to reify quoted lists, whose elements are known at quote-time so
/// there is nothing left to defer except the uniform shape.
pub fn list_of_values(items: Vec<Value>, tail: Value) -> Value {
    let mut acc = tail;
    for item in items.into_iter().rev() {
        acc = Value::cons(item, Value::Promise(Rc::new(Promise::new_forced(acc))));
    }
    acc
}

/// Eagerly materialises a (believed-finite) lazy list into a vector of its
/// elements, plus the final non-cons tail (`Nil` for a proper list). Must
/// never be called on a known-infinite stream; there is no cycle check.
pub fn realize(value: &Value) -> Result<(Vec<Value>, Value)> {
    let mut items = Vec::new();
    let mut cur = value.clone();
    loop {
        match cur {
            Value::Cons(cell) => {
                items.push(first(&cell));
                cur = rest(&cell)?;
            }
            other => return Ok((items, other)),
        }
    }
}

/// Reads the dynamic `*print-length*` variable: an integer cap, or no cap
/// when unset or `Nil`.
fn print_length_cap(env: &Env) -> Option<i64> {
    match env.lookup("*print-length*") {
        Some(Value::Int(n)) => Some(n),
        _ => None,
    }
}

/// The printer every `print` call and the CLI runner go through: honours
/// `*print-length*`, never forces past the cap, and otherwise lets atoms
/// render via their natural textual form.
pub fn repr(value: &Value, env: &Env) -> Result<String> {
    let cap = print_length_cap(env);
    let mut out = String::new();
    write_repr(value, env, cap, &mut out)?;
    Ok(out)
}

fn write_repr(value: &Value, env: &Env, cap: Option<i64>, out: &mut String) -> Result<()> {
    let cell = match value {
        Value::Cons(cell) => cell.clone(),
        other => {
            out.push_str(&other.repr_compact());
            return Ok(());
        }
    };

    out.push('(');
    let mut cur = Value::Cons(cell);
    let mut count: i64 = 0;
    let mut need_space = false;
    loop {
        match cur {
            Value::Cons(cell) => {
                if let Some(limit) = cap {
                    if count >= limit {
                        if need_space {
                            out.push(' ');
                        }
                        out.push_str("...");
                        break;
                    }
                }
                if need_space {
                    out.push(' ');
                }
                write_repr(&first(&cell), env, cap, out)?;
                need_space = true;
                count += 1;
                cur = match &cell.tail {
                    Value::Promise(p) => force(p)?,
                    other => other.clone(),
                };
            }
            Value::Nil => break,
            other => {
                out.push_str(" . ");
                write_repr(&other, env, cap, out)?;
                break;
            }
        }
    }
    out.push(')');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Env;

    fn list(values: Vec<Value>) -> Value {
        list_of_values(values, Value::Nil)
    }

    #[test]
    fn realize_collects_finite_list() {
        let v = list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let (items, tail) = realize(&v).unwrap();
        assert_eq!(items.len(), 3);
        assert!(tail.is_nil());
    }

    #[test]
    fn repr_prints_list_notation() {
        let env = Env::new_root();
        let v = list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(repr(&v, &env).unwrap(), "(1 2)");
    }

    #[test]
    fn repr_honors_print_length_cap_without_forcing_past_it() {
        let env = Env::new_root();
        env.define_global("*print-length*".into(), Value::Int(2));
        let v = list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(repr(&v, &env).unwrap(), "(1 2 ...)");
    }

    #[test]
    fn repr_nil_is_empty_string() {
        let env = Env::new_root();
        assert_eq!(repr(&Value::Nil, &env).unwrap(), "");
    }
}
