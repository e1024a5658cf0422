//! Runtime values: the tagged union every Yalix expression evaluates to.

use std::cell::RefCell;
use std::fmt::{self, Display};
use std::rc::Rc;

use crate::ast::Node;
use crate::environment::Env;
use crate::error::{EvalError, Result};
use crate::location::Brand;

/// A callable foreign function over already-evaluated arguments.
pub type ForeignFn = Rc<dyn Fn(&[Value]) -> Result<Value>>;

/// A value is the result of evaluating an AST node. `Cons`, `Closure`,
/// `Promise`, `ForwardRef` and `Foreign` are reference-counted so cloning a
/// `Value` is always cheap; mutability needed for promises and forward
/// references lives behind `RefCell`, never on `Value` itself.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Symbol(Rc<str>),
    Cons(Rc<ConsCell>),
    Closure(Rc<Closure>),
    Promise(Rc<Promise>),
    ForwardRef(Rc<RefCell<Option<Value>>>),
    Foreign(Rc<Foreign>),
    SpecialForm(SpecialFormKind),
    Unbound,
}

pub struct ConsCell {
    pub head: Value,
    pub tail: Value,
}

/// An ordered formal-parameter list: zero or more required names, plus an
/// optional variadic name bound to the lazy list of remaining arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formals {
    pub required: Vec<Rc<str>>,
    pub variadic: Option<Rc<str>>,
}

impl Formals {
    pub fn min_arity(&self) -> usize {
        self.required.len()
    }
}

pub struct Closure {
    pub name: Option<Rc<str>>,
    pub formals: Formals,
    pub body: Vec<Rc<Node>>,
    pub captured_env: Env,
    pub docstring: Option<Rc<str>>,
    pub source: Option<Brand>,
}

/// What a promise does the one time it's forced.
pub enum Thunk {
    /// `delay`'s general case: evaluate a body sequentially, keep the last.
    Body { body: Vec<Rc<Node>>, env: Env },
    /// The trailing variadic arg-list: lazily evaluates the next argument
    /// expression and conses it onto a promise for the rest, so that an
    /// argument past the ones a closure actually reads is never evaluated.
    VariadicRest { args: Vec<Rc<Node>>, env: Env },
}

pub enum PromiseState {
    Unforced(Thunk),
    Forced(Value),
}

pub struct Promise {
    pub state: RefCell<PromiseState>,
}

impl Promise {
    pub fn new(body: Vec<Rc<Node>>, env: Env) -> Self {
        Self {
            state: RefCell::new(PromiseState::Unforced(Thunk::Body { body, env })),
        }
    }

    pub fn new_variadic_rest(args: Vec<Rc<Node>>, env: Env) -> Self {
        Self {
            state: RefCell::new(PromiseState::Unforced(Thunk::VariadicRest { args, env })),
        }
    }

    /// A promise that is already forced. Used when building quoted lazy
    /// lists, whose elements are already known values at quote-time.
    pub fn new_forced(value: Value) -> Self {
        Self {
            state: RefCell::new(PromiseState::Forced(value)),
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(&*self.state.borrow(), PromiseState::Forced(_))
    }
}

pub struct Foreign {
    pub name: Rc<str>,
    pub arity: usize,
    pub variadic: bool,
    pub func: ForeignFn,
}

/// Which built-in form a `SpecialForm` sentinel dispatches to. Installed in
/// the global frame under each form's keyword so that looking the keyword
/// up, or passing it around as a first-class value, behaves sensibly,
/// while the reader already recognizes these keywords directly at parse
/// time to build the matching `NodeKind` (see ast.rs, reader.rs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialFormKind {
    Define,
    Lambda,
    Let,
    LetStar,
    LetRec,
    If,
    Begin,
    Set,
    Quote,
    SyntaxQuote,
    Unquote,
    UnquoteSplice,
    Delay,
    EvalForm,
}

impl SpecialFormKind {
    pub fn keyword(self) -> &'static str {
        use SpecialFormKind::*;
        match self {
            Define => "define",
            Lambda => "lambda",
            Let => "let",
            LetStar => "let*",
            LetRec => "letrec",
            If => "if",
            Begin => "begin",
            Set => "set!",
            Quote => "quote",
            SyntaxQuote => "syntax-quote",
            Unquote => "unquote",
            UnquoteSplice => "unquote-splice",
            Delay => "delay",
            EvalForm => "eval",
        }
    }
}

impl Value {
    pub fn symbol(name: impl Into<Rc<str>>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn cons(head: Value, tail: Value) -> Self {
        Value::Cons(Rc::new(ConsCell { head, tail }))
    }

    /// `Nil` and `Bool(false)` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// True for everything that is not a cons-cell.
    pub fn is_atom(&self) -> bool {
        !matches!(self, Value::Cons(_))
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Structural equality for atoms/symbols/strings/numbers; cons-cells,
    /// closures, promises and forward-refs compare by identity.
    pub fn value_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Unbound, Value::Unbound) => true,
            (Value::Cons(a), Value::Cons(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            (Value::ForwardRef(a), Value::ForwardRef(b)) => Rc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => Rc::ptr_eq(a, b),
            (Value::SpecialForm(a), Value::SpecialForm(b)) => a == b,
            _ => false,
        }
    }

    /// A short, non-list-aware rendering used inside error messages (never
    /// forces promises, unlike the full `Repr` printer in lazylist.rs).
    pub fn repr_compact(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Bool(true) => "#t".to_string(),
            Value::Bool(false) => "#f".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Symbol(s) => s.to_string(),
            Value::Cons(_) => "<cons>".to_string(),
            Value::Closure(c) => match &c.name {
                Some(name) => format!("<closure {}>", name),
                None => "<closure>".to_string(),
            },
            Value::Promise(p) => {
                if p.is_forced() {
                    "<promise (forced)>".to_string()
                } else {
                    "<promise>".to_string()
                }
            }
            Value::ForwardRef(_) => "<forward-ref>".to_string(),
            Value::Foreign(f) => format!("<foreign {}>", f.name),
            Value::SpecialForm(k) => format!("<special-form {}>", k.keyword()),
            Value::Unbound => "<unbound>".to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr_compact())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.repr_compact())
    }
}

pub(crate) fn arity_error(who: &str, expected: &str, got: usize) -> EvalError {
    use crate::error::EvalErrorKind;
    EvalError::new(EvalErrorKind::ArityMismatch(format!(
        "'{}' expects {} argument(s), got {}",
        who, expected, got
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn value_eq_is_structural_for_atoms() {
        assert!(Value::Int(1).value_eq(&Value::Int(1)));
        assert!(!Value::Int(1).value_eq(&Value::Int(2)));
        assert!(Value::symbol("a").value_eq(&Value::symbol("a")));
        assert!(!Value::symbol("a").value_eq(&Value::symbol("b")));
    }

    #[test]
    fn value_eq_is_by_identity_for_cons() {
        let a = Value::cons(Value::Int(1), Value::Nil);
        let b = Value::cons(Value::Int(1), Value::Nil);
        assert!(!a.value_eq(&b));
        assert!(a.value_eq(&a.clone()));
    }
}
