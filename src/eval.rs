//! `eval(node, env) -> Value` and application dispatch over the four
//! callable kinds (closure, foreign, special-form, forward-ref).

use std::rc::Rc;

use crate::ast::{Datum, Literal, Node, NodeKind};
use crate::error::{not_callable, EvalError, EvalErrorKind, Result};
use crate::environment::Env;
use crate::lazylist::{collect_variadic, list_of_values, realize};
use crate::location::Brand;
use crate::value::{Closure, Foreign, Promise, Value};

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

/// Evaluates a sequence of body forms left-to-right, returning the last
/// result (or `Nil` for an empty body). The shared shape of `begin`,
/// `let`/`let*`/`letrec` bodies, and closure application.
pub fn eval_body(body: &[Rc<Node>], env: &Env) -> Result<Value> {
    let mut result = Value::Nil;
    for node in body {
        result = eval(node, env)?;
    }
    Ok(result)
}

pub fn eval(node: &Rc<Node>, env: &Env) -> Result<Value> {
    match &node.kind {
        NodeKind::Atom(lit) => Ok(literal_to_value(lit)),
        NodeKind::Opaque(v) => Ok(v.clone()),

        NodeKind::SymbolRef(name) => env.lookup(name).ok_or_else(|| {
            EvalError::new(EvalErrorKind::UnboundReference(name.to_string())).at(node.brand.clone())
        }),

        NodeKind::Apply { op, args } => {
            let callee = eval(op, env)?;
            apply(callee, args, env, node.brand.as_ref())
        }

        NodeKind::Quote(datum) => crate::forms::eval_quote(datum, env),
        NodeKind::SyntaxQuote(datum) => crate::forms::eval_syntax_quote(datum, env),

        // Outside any quote template, `unquote`/`unquote-splice` just
        // evaluate their operand in the current (dynamic) env. The
        // conditional-re-evaluation behavior belongs to reifying one
        // inside a quoted template, not to this standalone form.
        NodeKind::Unquote(inner) => eval(inner, env),
        NodeKind::UnquoteSplice(inner) => {
            let v = eval(inner, env)?;
            let (items, tail) = realize(&v)?;
            Ok(list_of_values(items, tail))
        }

        NodeKind::Lambda {
            formals,
            docstring,
            body,
        } => {
            crate::forms::validate_formals(formals, node.brand.as_ref())?;
            Ok(Value::Closure(Rc::new(Closure {
                name: None,
                formals: formals.clone(),
                body: body.clone(),
                captured_env: env.clone(),
                docstring: docstring.clone(),
                source: node.brand.clone(),
            })))
        }

        NodeKind::If { cond, then, alt } => {
            if eval(cond, env)?.is_truthy() {
                eval(then, env)
            } else {
                match alt {
                    Some(alt) => eval(alt, env),
                    None => Ok(Value::Nil),
                }
            }
        }

        NodeKind::Let { name, value, body } => {
            let v = eval(value, env)?;
            let inner = env.extend(name.clone(), v);
            eval_body(body, &inner)
        }

        NodeKind::LetStar { bindings, body } => {
            let mut cur = env.clone();
            for (name, value_expr) in bindings {
                let v = eval(value_expr, &cur)?;
                cur = cur.extend(name.clone(), v);
            }
            eval_body(body, &cur)
        }

        NodeKind::LetRec { bindings, body } => {
            crate::forms::eval_letrec(bindings, body, env, node.brand.as_ref())
        }

        NodeKind::Set { name, value } => {
            let v = eval(value, env)?;
            env.set(name, v.clone())
                .map_err(|e| e.at(node.brand.clone()))?;
            Ok(v)
        }

        NodeKind::Define {
            name,
            formals,
            docstring,
            body,
        } => crate::forms::eval_define(name, formals, docstring, body, env, node.brand.as_ref()),

        NodeKind::Begin(body) => eval_body(body, env),

        NodeKind::Delay(body) => Ok(Value::Promise(Rc::new(Promise::new(
            body.clone(),
            env.clone(),
        )))),

        NodeKind::EvalForm(inner) => {
            let quoted = eval(inner, env)?;
            let reified = value_to_node(&quoted)?;
            eval(&reified, env)
        }
    }
}

/// Dispatches a callable value against raw (unevaluated) argument
/// expressions: closures and foreign functions evaluate them first in the
/// caller's env; special forms and forward references decide for
/// themselves.
pub fn apply(callee: Value, args: &[Rc<Node>], env: &Env, brand: Option<&Brand>) -> Result<Value> {
    match callee {
        Value::Closure(closure) => apply_closure(&closure, args, env, brand),
        Value::Foreign(foreign) => apply_foreign(&foreign, args, env, brand),
        Value::SpecialForm(kind) => crate::forms::apply_special_form(kind, args, env, brand),
        Value::ForwardRef(cell) => {
            let target = cell.borrow().clone();
            match target {
                Some(v) => apply(v, args, env, brand),
                None => Err(EvalError::new(not_callable(&Value::Nil)).at(brand.cloned())),
            }
        }
        other => Err(EvalError::new(not_callable(&other)).at(brand.cloned())),
    }
}

fn apply_closure(
    closure: &Rc<Closure>,
    args: &[Rc<Node>],
    env: &Env,
    brand: Option<&Brand>,
) -> Result<Value> {
    let formals = &closure.formals;
    let min = formals.min_arity();
    let who = closure
        .name
        .as_deref()
        .unwrap_or("<anonymous closure>")
        .to_string();

    if args.len() < min {
        let expected = if formals.variadic.is_some() {
            format!("at least {}", min)
        } else {
            format!("exactly {}", min)
        };
        return Err(crate::value::arity_error(&who, &expected, args.len()).at(brand.cloned()));
    }
    if formals.variadic.is_none() && args.len() > min {
        return Err(
            crate::value::arity_error(&who, &format!("exactly {}", min), args.len())
                .at(brand.cloned()),
        );
    }

    let mut call_env = closure.captured_env.clone();
    for (i, name) in formals.required.iter().enumerate() {
        let v = eval(&args[i], env)?;
        call_env = call_env.extend(name.clone(), v);
    }
    if let Some(variadic_name) = &formals.variadic {
        let rest_list = collect_variadic(&args[min..], env)?;
        call_env = call_env.extend(variadic_name.clone(), rest_list);
    }
    eval_body(&closure.body, &call_env)
}

fn apply_foreign(
    foreign: &Rc<Foreign>,
    args: &[Rc<Node>],
    env: &Env,
    brand: Option<&Brand>,
) -> Result<Value> {
    if foreign.variadic {
        if args.len() < foreign.arity {
            return Err(crate::value::arity_error(
                &foreign.name,
                &format!("at least {}", foreign.arity),
                args.len(),
            )
            .at(brand.cloned()));
        }
    } else if args.len() != foreign.arity {
        return Err(crate::value::arity_error(
            &foreign.name,
            &format!("exactly {}", foreign.arity),
            args.len(),
        )
        .at(brand.cloned()));
    }

    let mut values = Vec::with_capacity(args.len());
    for a in &args[..foreign.arity.min(args.len())] {
        values.push(eval(a, env)?);
    }
    if foreign.variadic {
        let rest_values = args[foreign.arity..]
            .iter()
            .map(|a| eval(a, env))
            .collect::<Result<Vec<_>>>()?;
        values.push(list_of_values(rest_values, Value::Nil));
    }

    (foreign.func)(&values).map_err(|e| e.at(brand.cloned()))
}

/// Reflects a parsed `Node` back into quoted data: the inverse of reading
/// a quote body, so `(quote e)` can also reify an already-typed special
/// form node the generic `SpecialForm`-as-value application path hands it.
pub fn node_to_datum(node: &Node) -> Result<Datum> {
    Ok(match &node.kind {
        NodeKind::Atom(Literal::Nil) => Datum::Nil,
        NodeKind::Atom(Literal::Bool(b)) => Datum::Bool(*b),
        NodeKind::Atom(Literal::Int(i)) => Datum::Int(*i),
        NodeKind::Atom(Literal::Float(f)) => Datum::Float(*f),
        NodeKind::Atom(Literal::Str(s)) => Datum::Str(s.clone()),
        NodeKind::SymbolRef(s) => Datum::Symbol(s.clone()),
        NodeKind::Opaque(v) => {
            return Err(EvalError::new(EvalErrorKind::MalformedForm(format!(
                "cannot quote the opaque runtime value {}",
                v.repr_compact()
            ))))
        }
        NodeKind::Unquote(n) => Datum::Unquote(n.clone()),
        NodeKind::UnquoteSplice(n) => Datum::UnquoteSplice(n.clone()),
        NodeKind::Quote(d) => keyword_list("quote", vec![d.as_ref().clone()]),
        NodeKind::SyntaxQuote(d) => keyword_list("syntax-quote", vec![d.as_ref().clone()]),
        NodeKind::Apply { op, args } => {
            let mut items = vec![node_to_datum(op)?];
            for a in args {
                items.push(node_to_datum(a)?);
            }
            Datum::List { items, tail: None }
        }
        NodeKind::If { cond, then, alt } => {
            let mut items = vec![Datum::Symbol("if".into()), node_to_datum(cond)?, node_to_datum(then)?];
            if let Some(alt) = alt {
                items.push(node_to_datum(alt)?);
            }
            Datum::List { items, tail: None }
        }
        NodeKind::Begin(body) => node_list_form("begin", body)?,
        NodeKind::Delay(body) => node_list_form("delay", body)?,
        NodeKind::EvalForm(inner) => keyword_list("eval", vec![node_to_datum(inner)?]),
        NodeKind::Set { name, value } => Datum::List {
            items: vec![
                Datum::Symbol("set!".into()),
                Datum::Symbol(name.clone()),
                node_to_datum(value)?,
            ],
            tail: None,
        },
        NodeKind::Let { name, value, body } => {
            let binding = Datum::List {
                items: vec![Datum::Symbol(name.clone()), node_to_datum(value)?],
                tail: None,
            };
            let bindings = Datum::List {
                items: vec![binding],
                tail: None,
            };
            let mut items = vec![Datum::Symbol("let".into()), bindings];
            for b in body {
                items.push(node_to_datum(b)?);
            }
            Datum::List { items, tail: None }
        }
        NodeKind::LetStar { bindings, body } => bindings_list_form("let*", bindings, body)?,
        NodeKind::LetRec { bindings, body } => bindings_list_form("letrec", bindings, body)?,
        NodeKind::Lambda { formals, body, .. } => {
            let mut items = vec![Datum::Symbol("lambda".into()), formals_datum(formals)];
            for b in body {
                items.push(node_to_datum(b)?);
            }
            Datum::List { items, tail: None }
        }
        NodeKind::Define {
            name,
            formals,
            body,
            ..
        } => {
            let head = match formals {
                Some(f) => {
                    let mut h = vec![Datum::Symbol(name.clone())];
                    h.extend(flatten_formals(f));
                    Datum::List { items: h, tail: None }
                }
                None => Datum::Symbol(name.clone()),
            };
            let mut items = vec![Datum::Symbol("define".into()), head];
            for b in body {
                items.push(node_to_datum(b)?);
            }
            Datum::List { items, tail: None }
        }
    })
}

fn node_list_form(keyword: &str, body: &[Rc<Node>]) -> Result<Datum> {
    let mut items = vec![Datum::Symbol(keyword.into())];
    for b in body {
        items.push(node_to_datum(b)?);
    }
    Ok(Datum::List { items, tail: None })
}

fn bindings_list_form(
    keyword: &str,
    bindings: &[(Rc<str>, Rc<Node>)],
    body: &[Rc<Node>],
) -> Result<Datum> {
    let mut binding_items = Vec::with_capacity(bindings.len());
    for (name, value) in bindings {
        binding_items.push(Datum::List {
            items: vec![Datum::Symbol(name.clone()), node_to_datum(value)?],
            tail: None,
        });
    }
    let mut items = vec![
        Datum::Symbol(keyword.into()),
        Datum::List {
            items: binding_items,
            tail: None,
        },
    ];
    for b in body {
        items.push(node_to_datum(b)?);
    }
    Ok(Datum::List { items, tail: None })
}

fn flatten_formals(formals: &crate::value::Formals) -> Vec<Datum> {
    let mut out: Vec<Datum> = formals
        .required
        .iter()
        .map(|n| Datum::Symbol(n.clone()))
        .collect();
    if let Some(variadic) = &formals.variadic {
        out.push(Datum::Symbol(".".into()));
        out.push(Datum::Symbol(variadic.clone()));
    }
    out
}

fn formals_datum(formals: &crate::value::Formals) -> Datum {
    Datum::List {
        items: flatten_formals(formals),
        tail: None,
    }
}

fn keyword_list(keyword: &str, rest: Vec<Datum>) -> Datum {
    let mut items = vec![Datum::Symbol(keyword.into())];
    items.extend(rest);
    Datum::List { items, tail: None }
}

/// Reflects a quoted-data `Value` back into an evaluable `Node`, the
/// counterpart `eval` needs to run code it was handed as data.
pub fn value_to_node(value: &Value) -> Result<Rc<Node>> {
    match value {
        Value::Nil => Ok(Node::new(NodeKind::Atom(Literal::Nil), None)),
        Value::Bool(b) => Ok(Node::new(NodeKind::Atom(Literal::Bool(*b)), None)),
        Value::Int(i) => Ok(Node::new(NodeKind::Atom(Literal::Int(*i)), None)),
        Value::Float(f) => Ok(Node::new(NodeKind::Atom(Literal::Float(*f)), None)),
        Value::Str(s) => Ok(Node::new(NodeKind::Atom(Literal::Str(s.clone())), None)),
        Value::Symbol(s) => Ok(Node::new(NodeKind::SymbolRef(s.clone()), None)),
        Value::Cons(_) => {
            let (items, _tail) = realize(value)?;
            if items.is_empty() {
                return Ok(Node::new(NodeKind::Atom(Literal::Nil), None));
            }
            let op = value_to_node(&items[0])?;
            let args = items[1..]
                .iter()
                .map(value_to_node)
                .collect::<Result<Vec<_>>>()?;
            Ok(Node::new(NodeKind::Apply { op, args }, None))
        }
        // Closures, promises, foreign functions, forward-refs and
        // special-form sentinels have no literal source form; reflecting
        // one back into code just re-embeds the value itself, so calling
        // `eval`/`apply` on data that already holds a callable behaves the
        // same as calling the callable directly.
        other => Ok(Node::new(NodeKind::Opaque(other.clone()), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_program;

    fn run_all(src: &str, env: &Env) -> Value {
        let mut result = Value::Nil;
        for node in parse_program(src).unwrap() {
            result = eval(&node, env).unwrap();
        }
        result
    }

    #[test]
    fn atoms_self_evaluate() {
        let env = Env::new_root();
        assert!(matches!(run_all("42", &env), Value::Int(42)));
        assert!(matches!(run_all("#t", &env), Value::Bool(true)));
    }

    #[test]
    fn single_binding_let_scopes_body() {
        let env = Env::new_root();
        env.define_global(
            "+".into(),
            Value::Foreign(Rc::new(Foreign {
                name: "+".into(),
                arity: 2,
                variadic: false,
                func: Rc::new(|args| match (&args[0], &args[1]) {
                    (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
                    _ => unreachable!(),
                }),
            })),
        );
        let v = run_all("(let ((x 5)) (+ x 7))", &env);
        assert!(matches!(v, Value::Int(12)));
    }

    #[test]
    fn define_with_no_body_binds_unbound() {
        let env = Env::new_root();
        run_all("(define x)", &env);
        assert!(matches!(env.lookup("x"), Some(Value::Unbound)));
    }

    #[test]
    fn invoking_unbound_fails_as_not_callable() {
        let env = Env::new_root();
        run_all("(define x)", &env);
        assert!(parse_program("(x)")
            .unwrap()
            .iter()
            .try_for_each(|n| eval(n, &env).map(|_| ()))
            .is_err());
    }

    #[test]
    fn set_bang_on_unbound_local_errors() {
        let env = Env::new_root();
        let result = parse_program("(set! y 1)")
            .unwrap()
            .iter()
            .try_for_each(|n| eval(n, &env).map(|_| ()));
        assert!(result.is_err());
    }

    #[test]
    fn variadic_lambda_realises_trailing_args() {
        let env = Env::new_root();
        let v = run_all("((lambda (a . xs) xs) 1 2 3)", &env);
        let (items, _) = realize(&v).unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Value::Int(2)));
        assert!(matches!(items[1], Value::Int(3)));
    }

    #[test]
    fn variadic_lambda_with_no_extra_args_is_empty() {
        let env = Env::new_root();
        let v = run_all("((lambda (a . xs) xs) 1)", &env);
        assert!(v.is_nil());
    }
}
