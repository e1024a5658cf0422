//! Foreign-function injection: the helper that turns a host closure into a
//! `Value::Foreign` callable, and the concrete set of core primitives a
//! session needs (numeric, list, predicate, bitwise). Trigonometric/
//! logarithmic primitives stay out. That convenience library is an
//! external collaborator, reachable by any host through `define_foreign`.

use std::rc::Rc;

use crate::environment::Env;
use crate::error::{EvalError, EvalErrorKind, Result};
use crate::gensym::gensym;
use crate::lazylist::{first, realize, repr, rest};
use crate::reader::read_one;
use crate::value::{ConsCell, Foreign, ForeignFn, Value};

/// Installs a host callable under `name` in `env`'s global frame: `arity`
/// fixed formals, plus (if `variadic`) one trailing realised-list argument
/// carrying the rest.
pub fn define_foreign(
    env: &Env,
    name: &str,
    arity: usize,
    variadic: bool,
    func: impl Fn(&[Value]) -> Result<Value> + 'static,
) {
    let foreign = Foreign {
        name: Rc::from(name),
        arity,
        variadic,
        func: Rc::new(func) as ForeignFn,
    };
    env.define_global(Rc::from(name), Value::Foreign(Rc::new(foreign)));
}

fn host_error(msg: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::HostError(msg.into()))
}

fn expect_cons(v: &Value, who: &str) -> Result<Rc<ConsCell>> {
    match v {
        Value::Cons(cell) => Ok(cell.clone()),
        other => Err(host_error(format!(
            "'{}' expects a cons-cell, got {}",
            who,
            other.repr_compact()
        ))),
    }
}

fn expect_str(v: &Value, who: &str) -> Result<Rc<str>> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        Value::Symbol(s) => Ok(s.clone()),
        other => Err(host_error(format!(
            "'{}' expects a string, got {}",
            who,
            other.repr_compact()
        ))),
    }
}

#[derive(Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

impl Num {
    fn to_value(self) -> Value {
        match self {
            Num::I(i) => Value::Int(i),
            Num::F(f) => Value::Float(f),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::I(i) => i as f64,
            Num::F(f) => f,
        }
    }
}

fn as_num(v: &Value, who: &str) -> Result<Num> {
    match v {
        Value::Int(i) => Ok(Num::I(*i)),
        Value::Float(f) => Ok(Num::F(*f)),
        other => Err(host_error(format!(
            "'{}' expects a number, got {}",
            who,
            other.repr_compact()
        ))),
    }
}

fn add_num(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::I(x), Num::I(y)) => Num::I(x + y),
        _ => Num::F(a.as_f64() + b.as_f64()),
    }
}

fn sub_num(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::I(x), Num::I(y)) => Num::I(x - y),
        _ => Num::F(a.as_f64() - b.as_f64()),
    }
}

fn mul_num(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::I(x), Num::I(y)) => Num::I(x * y),
        _ => Num::F(a.as_f64() * b.as_f64()),
    }
}

fn div_num(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (Num::I(x), Num::I(y)) => {
            if y == 0 {
                Err(host_error("division by zero"))
            } else if x % y == 0 {
                Ok(Num::I(x / y))
            } else {
                Ok(Num::F(x as f64 / y as f64))
            }
        }
        _ => {
            let denom = b.as_f64();
            if denom == 0.0 {
                Err(host_error("division by zero"))
            } else {
                Ok(Num::F(a.as_f64() / denom))
            }
        }
    }
}

/// Materialises the trailing realised-list argument a variadic foreign
/// function receives: the last formal is the already-realised rest-list.
fn rest_values(args: &[Value], who: &str) -> Result<Vec<Value>> {
    let tail = args.last().cloned().unwrap_or(Value::Nil);
    let (items, _) = realize(&tail).map_err(|_| host_error(format!("'{}': malformed argument list", who)))?;
    Ok(items)
}

fn int_bitop(who: &'static str, f: fn(i64, i64) -> i64) -> impl Fn(&[Value]) -> Result<Value> {
    move |args: &[Value]| {
        let a = match &args[0] {
            Value::Int(i) => *i,
            other => return Err(host_error(format!("'{}' expects an integer, got {}", who, other.repr_compact()))),
        };
        let b = match &args[1] {
            Value::Int(i) => *i,
            other => return Err(host_error(format!("'{}' expects an integer, got {}", who, other.repr_compact()))),
        };
        Ok(Value::Int(f(a, b)))
    }
}

fn cmp(who: &'static str, f: fn(&Value, &Value) -> bool) -> impl Fn(&[Value]) -> Result<Value> {
    move |args: &[Value]| {
        let a = as_num(&args[0], who)?;
        let b = as_num(&args[1], who)?;
        Ok(Value::Bool(f(&a.to_value(), &b.to_value())))
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> (f64, f64) {
    let fa = match a {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    };
    let fb = match b {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    };
    (fa, fb)
}

/// Installs every special-form keyword as a first-class `Value::SpecialForm`
/// sentinel, plus the core primitive set, into `env`'s global frame.
pub fn install(env: &Env) {
    install_special_form_sentinels(env);

    env.define_global(Rc::from("nil"), Value::Nil);

    define_foreign(env, "nil?", 1, false, |args| Ok(Value::Bool(args[0].is_nil())));
    define_foreign(env, "atom?", 1, false, |args| Ok(Value::Bool(args[0].is_atom())));
    define_foreign(env, "eq", 2, false, |args| Ok(Value::Bool(args[0].value_eq(&args[1]))));
    define_foreign(env, "not", 1, false, |args| Ok(Value::Bool(!args[0].is_truthy())));

    define_foreign(env, "symbol", 1, false, |args| {
        Ok(Value::symbol(expect_str(&args[0], "symbol")?))
    });
    define_foreign(env, "symbol?", 1, false, |args| {
        Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
    });
    define_foreign(env, "gensym", 0, false, |_args| Ok(Value::symbol(gensym("G__"))));

    define_foreign(env, "cons", 2, false, |args| {
        Ok(Value::cons(args[0].clone(), args[1].clone()))
    });
    define_foreign(env, "first", 1, false, |args| {
        Ok(first(&expect_cons(&args[0], "first")?))
    });
    define_foreign(env, "car", 1, false, |args| {
        Ok(first(&expect_cons(&args[0], "car")?))
    });
    define_foreign(env, "rest", 1, false, |args| rest(&expect_cons(&args[0], "rest")?));
    define_foreign(env, "cdr", 1, false, |args| rest(&expect_cons(&args[0], "cdr")?));
    define_foreign(env, "next", 1, false, |args| rest(&expect_cons(&args[0], "next")?));

    let print_env = env.clone();
    define_foreign(env, "print", 0, true, move |args| {
        for v in rest_values(args, "print")? {
            match &v {
                Value::Str(s) => print!("{}", s),
                other => print!("{}", repr(other, &print_env)?),
            }
        }
        Ok(Value::Nil)
    });

    define_foreign(env, "read-string", 1, false, |args| {
        let text = expect_str(&args[0], "read-string")?;
        read_one(&text).map_err(|e| host_error(e.render()))
    });

    define_foreign(env, "+", 0, true, |args| {
        let mut acc = Num::I(0);
        for v in rest_values(args, "+")? {
            acc = add_num(acc, as_num(&v, "+")?);
        }
        Ok(acc.to_value())
    });
    define_foreign(env, "-", 1, true, |args| {
        let mut acc = as_num(&args[0], "-")?;
        let rest = rest_values(args, "-")?;
        if rest.is_empty() {
            return Ok(sub_num(Num::I(0), acc).to_value());
        }
        for v in rest {
            acc = sub_num(acc, as_num(&v, "-")?);
        }
        Ok(acc.to_value())
    });
    define_foreign(env, "*", 0, true, |args| {
        let mut acc = Num::I(1);
        for v in rest_values(args, "*")? {
            acc = mul_num(acc, as_num(&v, "*")?);
        }
        Ok(acc.to_value())
    });
    define_foreign(env, "/", 1, true, |args| {
        let mut acc = as_num(&args[0], "/")?;
        for v in rest_values(args, "/")? {
            acc = div_num(acc, as_num(&v, "/")?)?;
        }
        Ok(acc.to_value())
    });
    define_foreign(env, "negate", 1, false, |args| {
        Ok(match as_num(&args[0], "negate")? {
            Num::I(i) => Value::Int(-i),
            Num::F(f) => Value::Float(-f),
        })
    });
    define_foreign(env, "mod", 2, false, |args| {
        let a = match &args[0] {
            Value::Int(i) => *i,
            other => return Err(host_error(format!("'mod' expects an integer, got {}", other.repr_compact()))),
        };
        let b = match &args[1] {
            Value::Int(i) => *i,
            other => return Err(host_error(format!("'mod' expects an integer, got {}", other.repr_compact()))),
        };
        if b == 0 {
            Err(host_error("division by zero"))
        } else {
            Ok(Value::Int(a.rem_euclid(b)))
        }
    });

    define_foreign(env, "<", 2, false, cmp("<", |a, b| {
        let (x, y) = numeric_cmp(a, b);
        x < y
    }));
    define_foreign(env, "<=", 2, false, cmp("<=", |a, b| {
        let (x, y) = numeric_cmp(a, b);
        x <= y
    }));
    define_foreign(env, "=", 2, false, |args| Ok(Value::Bool(args[0].value_eq(&args[1]))));
    define_foreign(env, ">=", 2, false, cmp(">=", |a, b| {
        let (x, y) = numeric_cmp(a, b);
        x >= y
    }));
    define_foreign(env, ">", 2, false, cmp(">", |a, b| {
        let (x, y) = numeric_cmp(a, b);
        x > y
    }));
    define_foreign(env, "not=", 2, false, |args| Ok(Value::Bool(!args[0].value_eq(&args[1]))));

    define_foreign(env, "bitwise-and", 2, false, int_bitop("bitwise-and", |a, b| a & b));
    define_foreign(env, "bitwise-or", 2, false, int_bitop("bitwise-or", |a, b| a | b));
    define_foreign(env, "bitwise-xor", 2, false, int_bitop("bitwise-xor", |a, b| a ^ b));
    define_foreign(env, "bitwise-invert", 1, false, |args| match &args[0] {
        Value::Int(i) => Ok(Value::Int(!i)),
        other => Err(host_error(format!(
            "'bitwise-invert' expects an integer, got {}",
            other.repr_compact()
        ))),
    });
    define_foreign(env, "bitwise-left-shift", 2, false, int_bitop("bitwise-left-shift", |a, b| a << b));
    define_foreign(env, "bitwise-right-shift", 2, false, int_bitop("bitwise-right-shift", |a, b| a >> b));
}

fn install_special_form_sentinels(env: &Env) {
    use crate::value::SpecialFormKind::*;
    for kind in [
        Define, Lambda, Let, LetStar, LetRec, If, Begin, Set, Quote, SyntaxQuote, Unquote,
        UnquoteSplice, Delay, EvalForm,
    ] {
        env.define_global(Rc::from(kind.keyword()), Value::SpecialForm(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval;
    use crate::reader::parse_program;

    fn run(src: &str, env: &Env) -> Value {
        let mut result = Value::Nil;
        for node in parse_program(src).unwrap() {
            result = eval(&node, env).unwrap();
        }
        result
    }

    #[test]
    fn variadic_plus_sums_all_args() {
        let env = Env::new_root();
        install(&env);
        assert!(matches!(run("(+ 1 2 3 4)", &env), Value::Int(10)));
    }

    #[test]
    fn minus_with_one_arg_negates() {
        let env = Env::new_root();
        install(&env);
        assert!(matches!(run("(- 5)", &env), Value::Int(-5)));
    }

    #[test]
    fn cons_first_rest_roundtrip() {
        let env = Env::new_root();
        install(&env);
        assert!(matches!(run("(first (cons 1 2))", &env), Value::Int(1)));
        assert!(matches!(run("(rest (cons 1 2))", &env), Value::Int(2)));
    }

    #[test]
    fn eq_is_structural_for_atoms() {
        let env = Env::new_root();
        install(&env);
        assert!(matches!(run("(eq 1 1)", &env), Value::Bool(true)));
        assert!(matches!(run("(eq 1 2)", &env), Value::Bool(false)));
    }

    #[test]
    fn gensym_produces_distinct_symbols() {
        let env = Env::new_root();
        install(&env);
        let a = run("(gensym)", &env);
        let b = run("(gensym)", &env);
        assert!(!a.value_eq(&b));
    }
}
