//! Turns source text into typed AST nodes. Parsing happens in two stages:
//! a generic s-expression pass (`Sexp`) that only worries about
//! parentheses, atoms and strings, followed by a conversion pass that
//! recognizes each special-form keyword at the head of a list and builds
//! the matching `NodeKind` directly, attaching a dedicated shape per
//! keyword rather than building one generic call node and dispatching
//! on it later.

use std::rc::Rc;

use crate::ast::{Datum, Literal, Node, NodeKind};
use crate::error::{ReadError, ReadErrorKind, ReadResult};
use crate::location::Brand;
use crate::value::{Formals, Value};

/// A raw parsed s-expression: parentheses resolved, but keywords not yet
/// recognized. `Doc` is a `;^` docstring line, which can only appear
/// immediately after a `define`/`lambda` head in well-formed source.
enum Sexp {
    Int(i64, usize),
    Float(f64, usize),
    Str(Rc<str>, usize),
    Bool(bool, usize),
    Symbol(Rc<str>, usize),
    List(Vec<Sexp>, usize),
    Doc(Rc<str>, usize),
}

impl Sexp {
    fn offset(&self) -> usize {
        match self {
            Sexp::Int(_, o)
            | Sexp::Float(_, o)
            | Sexp::Str(_, o)
            | Sexp::Bool(_, o)
            | Sexp::Symbol(_, o)
            | Sexp::List(_, o)
            | Sexp::Doc(_, o) => *o,
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(
            c,
            '-' | '/' | '_' | ':' | '*' | '+' | '=' | '!' | '?' | '<' | '>' | '.' | '#'
        )
}

struct Lexer {
    source: Rc<str>,
    pos: usize,
}

impl Lexer {
    fn new(source: Rc<str>) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(';') if self.peek2() != Some('^') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn at_eof(&self) -> bool {
        self.rest().is_empty()
    }

    /// Reads the next top-level token as a `Sexp`, including a bare
    /// docstring line; the caller decides whether one is acceptable here.
    fn read_form(&mut self) -> ReadResult<Option<Sexp>> {
        self.skip_trivia();
        if self.at_eof() {
            return Ok(None);
        }
        let start = self.pos;
        match self.peek().unwrap() {
            '(' | '[' => Ok(Some(self.read_list(start)?)),
            ')' | ']' => Err(ReadError::new(
                ReadErrorKind::UnmatchedParenthesis,
                Some(self.brand_at(start)),
            )),
            '"' => Ok(Some(self.read_string(start)?)),
            '\'' => {
                self.bump();
                let inner = self.expect_form(start, "'")?;
                Ok(Some(wrap(start, "quote", inner)))
            }
            '`' => {
                self.bump();
                let inner = self.expect_form(start, "`")?;
                Ok(Some(wrap(start, "syntax-quote", inner)))
            }
            '~' => {
                self.bump();
                if self.peek() == Some('@') {
                    self.bump();
                    let inner = self.expect_form(start, "~@")?;
                    Ok(Some(wrap(start, "unquote-splice", inner)))
                } else {
                    let inner = self.expect_form(start, "~")?;
                    Ok(Some(wrap(start, "unquote", inner)))
                }
            }
            ';' => {
                // a docstring line: `;^...`
                self.bump();
                self.bump();
                let text_start = self.pos;
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                let text = self.source[text_start..self.pos].trim().to_string();
                Ok(Some(Sexp::Doc(text.into(), start)))
            }
            c if c.is_ascii_digit() || ((c == '+' || c == '-') && self.peek2().is_some_and(|d| d.is_ascii_digit())) => {
                Ok(Some(self.read_number(start)?))
            }
            _ => Ok(Some(self.read_symbol_or_bool(start))),
        }
    }

    fn expect_form(&mut self, start: usize, macro_name: &'static str) -> ReadResult<Sexp> {
        match self.read_form()? {
            Some(form) => Ok(form),
            None => Err(ReadError::new(
                ReadErrorKind::DanglingReaderMacro(macro_name),
                Some(self.brand_at(start)),
            )),
        }
    }

    fn read_list(&mut self, start: usize) -> ReadResult<Sexp> {
        let close = if self.peek() == Some('[') { ']' } else { ')' };
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => {
                    return Err(ReadError::new(
                        ReadErrorKind::UnclosedParenthesis,
                        Some(self.brand_at(start)),
                    ))
                }
                Some(c) if c == close => {
                    self.bump();
                    break;
                }
                Some(')') | Some(']') => {
                    return Err(ReadError::new(
                        ReadErrorKind::UnmatchedParenthesis,
                        Some(self.brand_at(self.pos)),
                    ))
                }
                _ => {
                    if let Some(form) = self.read_form()? {
                        items.push(form);
                    }
                }
            }
        }
        Ok(Sexp::List(items, start))
    }

    fn read_string(&mut self, start: usize) -> ReadResult<Sexp> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ReadError::new(
                        ReadErrorKind::UnclosedString,
                        Some(self.brand_at(start)),
                    ))
                }
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some(other) => out.push(other),
                    None => {
                        return Err(ReadError::new(
                            ReadErrorKind::UnclosedString,
                            Some(self.brand_at(start)),
                        ))
                    }
                },
                Some(c) => out.push(c),
            }
        }
        Ok(Sexp::Str(out.into(), start))
    }

    fn read_number(&mut self, start: usize) -> ReadResult<Sexp> {
        let text_start = self.pos;
        let mut negative = false;
        if matches!(self.peek(), Some('+') | Some('-')) {
            negative = self.peek() == Some('-');
            self.bump();
        }
        if self.peek() == Some('0') && matches!(self.peek2(), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.source[digits_start..self.pos];
            let magnitude = i64::from_str_radix(digits, 16).map_err(|_| {
                ReadError::new(
                    ReadErrorKind::InvalidSpecialForm(format!(
                        "malformed hex literal '{}'",
                        &self.source[text_start..self.pos]
                    )),
                    Some(self.brand_at(start)),
                )
            })?;
            return Ok(Sexp::Int(if negative { -magnitude } else { magnitude }, start));
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit() || c == 'e' || c == 'E') {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        } else if self.peek() == Some('.')
            && !self.peek2().is_some_and(is_symbol_char)
        {
            // A bare trailing dot with nothing number-like after it, e.g.
            // `1.` at end of a list: still a float, matching `\d+\.\d*`.
            is_float = true;
            self.bump();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = &self.source[text_start..self.pos];
        if is_float {
            let v: f64 = text.parse().map_err(|_| {
                ReadError::new(
                    ReadErrorKind::InvalidSpecialForm(format!("malformed number '{}'", text)),
                    Some(self.brand_at(start)),
                )
            })?;
            Ok(Sexp::Float(v, start))
        } else {
            let v: i64 = text.parse().map_err(|_| {
                ReadError::new(
                    ReadErrorKind::InvalidSpecialForm(format!("malformed number '{}'", text)),
                    Some(self.brand_at(start)),
                )
            })?;
            if matches!(self.peek(), Some('L')) {
                self.bump();
            }
            Ok(Sexp::Int(v, start))
        }
    }

    fn read_symbol_or_bool(&mut self, start: usize) -> Sexp {
        let text_start = self.pos;
        while self.peek().is_some_and(is_symbol_char) {
            self.bump();
        }
        if self.pos == text_start {
            // Nothing in the symbol charset matched (some other stray
            // punctuation byte); still consume one character so the lexer
            // always makes progress instead of looping forever.
            self.bump();
        }
        let text = &self.source[text_start..self.pos];
        match text {
            "#t" => Sexp::Bool(true, start),
            "#f" => Sexp::Bool(false, start),
            _ => Sexp::Symbol(text.into(), start),
        }
    }

    fn brand_at(&self, offset: usize) -> Brand {
        Brand::new(self.source.clone(), offset)
    }
}

fn wrap(start: usize, keyword: &str, inner: Sexp) -> Sexp {
    Sexp::List(
        vec![Sexp::Symbol(keyword.into(), start), inner],
        start,
    )
}

/// Reads every top-level form in `source`.
fn read_all(source: &Rc<str>) -> ReadResult<Vec<Sexp>> {
    let mut lexer = Lexer::new(source.clone());
    let mut forms = Vec::new();
    while let Some(form) = lexer.read_form()? {
        forms.push(form);
    }
    Ok(forms)
}

/// Parses every top-level form in `source` into AST nodes ready for `eval`.
pub fn parse_program(source: &str) -> ReadResult<Vec<Rc<Node>>> {
    let source: Rc<str> = Rc::from(source);
    read_all(&source)
        .and_then(|forms| forms.iter().map(|s| to_node(s, &source)).collect())
}

/// Parses exactly one top-level form, for the `read-string` primitive.
pub fn read_one(source: &str) -> ReadResult<Value> {
    let source: Rc<str> = Rc::from(source);
    let forms = read_all(&source)?;
    match forms.first() {
        Some(form) => sexp_to_value(form),
        None => Ok(Value::Nil),
    }
}

fn brand_of(source: &Rc<str>, offset: usize) -> Option<Brand> {
    Some(Brand::new(source.clone(), offset))
}

fn expect_symbol<'a>(s: &'a Sexp, source: &Rc<str>, context: &str) -> ReadResult<&'a Rc<str>> {
    match s {
        Sexp::Symbol(name, _) => Ok(name),
        other => Err(ReadError::new(
            ReadErrorKind::InvalidSpecialForm(format!("expected a symbol in {}", context)),
            brand_of(source, other.offset()),
        )),
    }
}

/// Splits leading `;^` docstring items off the front of a list, returning
/// the joined docstring (if any) and the remaining items.
fn split_docstrings(items: &[Sexp]) -> (Option<Rc<str>>, &[Sexp]) {
    let mut end = 0;
    while matches!(items.get(end), Some(Sexp::Doc(_, _))) {
        end += 1;
    }
    if end == 0 {
        return (None, items);
    }
    let text = items[..end]
        .iter()
        .map(|s| match s {
            Sexp::Doc(t, _) => t.as_ref(),
            _ => unreachable!(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    (Some(text.into()), &items[end..])
}

/// Parses a `(name . formals)` or `name1 name2 .. . rest` formal list.
fn to_formals(items: &[Sexp], source: &Rc<str>) -> ReadResult<Formals> {
    let mut required = Vec::new();
    let mut variadic = None;
    let mut i = 0;
    while i < items.len() {
        let name = expect_symbol(&items[i], source, "formals")?;
        if name.as_ref() == "." {
            i += 1;
            if i >= items.len() {
                return Err(ReadError::new(
                    ReadErrorKind::InvalidSpecialForm(
                        "'.' in formals must be followed by a name".into(),
                    ),
                    brand_of(source, items[i - 1].offset()),
                ));
            }
            variadic = Some(expect_symbol(&items[i], source, "formals")?.clone());
            i += 1;
            break;
        }
        required.push(name.clone());
        i += 1;
    }
    if i != items.len() {
        return Err(ReadError::new(
            ReadErrorKind::InvalidSpecialForm("malformed formals list".into()),
            None,
        ));
    }
    Ok(Formals { required, variadic })
}

fn bindings_of(items: &[Sexp], source: &Rc<str>) -> ReadResult<Vec<(Rc<str>, Rc<Node>)>> {
    items
        .iter()
        .map(|binding| match binding {
            Sexp::List(pair, _) if pair.len() == 2 => {
                let name = expect_symbol(&pair[0], source, "let binding")?.clone();
                let value = to_node(&pair[1], source)?;
                Ok((name, value))
            }
            other => Err(ReadError::new(
                ReadErrorKind::InvalidSpecialForm("malformed binding".into()),
                brand_of(source, other.offset()),
            )),
        })
        .collect()
}

fn body_of(items: &[Sexp], source: &Rc<str>) -> ReadResult<Vec<Rc<Node>>> {
    items.iter().map(|s| to_node(s, source)).collect()
}

/// Converts one parsed `Sexp` into a typed `Node`, recognizing the
/// special-form keyword set at the head of list forms.
fn to_node(sexp: &Sexp, source: &Rc<str>) -> ReadResult<Rc<Node>> {
    let brand = brand_of(source, sexp.offset());
    match sexp {
        Sexp::Int(v, _) => Ok(Node::new(NodeKind::Atom(Literal::Int(*v)), brand)),
        Sexp::Float(v, _) => Ok(Node::new(NodeKind::Atom(Literal::Float(*v)), brand)),
        Sexp::Str(v, _) => Ok(Node::new(NodeKind::Atom(Literal::Str(v.clone())), brand)),
        Sexp::Bool(v, _) => Ok(Node::new(NodeKind::Atom(Literal::Bool(*v)), brand)),
        Sexp::Doc(_, _) => Err(ReadError::new(
            ReadErrorKind::InvalidSpecialForm(
                "a docstring may only appear right after a define/lambda head".into(),
            ),
            brand,
        )),
        Sexp::Symbol(name, _) => match name.as_ref() {
            "nil" => Ok(Node::new(NodeKind::Atom(Literal::Nil), brand)),
            _ => Ok(Node::new(NodeKind::SymbolRef(name.clone()), brand)),
        },
        Sexp::List(items, _) => to_node_list(items, source, brand),
    }
}

fn to_node_list(items: &[Sexp], source: &Rc<str>, brand: Option<Brand>) -> ReadResult<Rc<Node>> {
    if items.is_empty() {
        return Ok(Node::new(NodeKind::Atom(Literal::Nil), brand));
    }

    let head_keyword = match &items[0] {
        Sexp::Symbol(name, _) => Some(name.clone()),
        _ => None,
    };

    let rest = &items[1..];

    match head_keyword.as_deref() {
        Some("quote") if rest.len() == 1 => {
            Ok(Node::new(NodeKind::Quote(Rc::new(to_datum(&rest[0], source)?)), brand))
        }
        Some("syntax-quote") if rest.len() == 1 => Ok(Node::new(
            NodeKind::SyntaxQuote(Rc::new(to_datum(&rest[0], source)?)),
            brand,
        )),
        Some("unquote") if rest.len() == 1 => {
            Ok(Node::new(NodeKind::Unquote(to_node(&rest[0], source)?), brand))
        }
        Some("unquote-splice") if rest.len() == 1 => Ok(Node::new(
            NodeKind::UnquoteSplice(to_node(&rest[0], source)?),
            brand,
        )),
        Some("if") if rest.len() == 2 || rest.len() == 3 => {
            let cond = to_node(&rest[0], source)?;
            let then = to_node(&rest[1], source)?;
            let alt = rest.get(2).map(|s| to_node(s, source)).transpose()?;
            Ok(Node::new(NodeKind::If { cond, then, alt }, brand))
        }
        Some("begin") => Ok(Node::new(NodeKind::Begin(body_of(rest, source)?), brand)),
        Some("delay") => Ok(Node::new(NodeKind::Delay(body_of(rest, source)?), brand)),
        Some("eval") if rest.len() == 1 => {
            Ok(Node::new(NodeKind::EvalForm(to_node(&rest[0], source)?), brand))
        }
        Some("set!") if rest.len() == 2 => {
            let name = expect_symbol(&rest[0], source, "set!")?.clone();
            let value = to_node(&rest[1], source)?;
            Ok(Node::new(NodeKind::Set { name, value }, brand))
        }
        Some("lambda") | Some("\u{3bb}") if !rest.is_empty() => {
            to_node_lambda(rest, source, brand)
        }
        Some("let") if rest.len() >= 2 => to_node_single_let(rest, source, brand),
        Some("let*") if rest.len() >= 2 => to_node_let(rest, source, brand, LetKind::LetStar),
        Some("letrec") if rest.len() >= 2 => to_node_let(rest, source, brand, LetKind::LetRec),
        Some("define") if !rest.is_empty() => to_node_define(rest, source, brand),
        _ => {
            let op = to_node(&items[0], source)?;
            let args = items[1..]
                .iter()
                .map(|s| to_node(s, source))
                .collect::<ReadResult<Vec<_>>>()?;
            Ok(Node::new(NodeKind::Apply { op, args }, brand))
        }
    }
}

enum LetKind {
    LetStar,
    LetRec,
}

/// `(let ((name value)) body...)`: a single binding, wrapped in its own
/// bindings list like `let*`/`letrec` rather than spelled bare.
fn to_node_single_let(rest: &[Sexp], source: &Rc<str>, brand: Option<Brand>) -> ReadResult<Rc<Node>> {
    let bindings = match &rest[0] {
        Sexp::List(items, _) if items.len() == 1 => items.as_slice(),
        other => {
            return Err(ReadError::new(
                ReadErrorKind::InvalidSpecialForm(
                    "let takes exactly one binding, as ((name value))".into(),
                ),
                brand_of(source, other.offset()),
            ))
        }
    };
    let pair = match &bindings[0] {
        Sexp::List(items, _) if items.len() == 2 => items.as_slice(),
        other => {
            return Err(ReadError::new(
                ReadErrorKind::InvalidSpecialForm("let binding must be (name value)".into()),
                brand_of(source, other.offset()),
            ))
        }
    };
    let name = expect_symbol(&pair[0], source, "let binding")?.clone();
    let value = to_node(&pair[1], source)?;
    let body = body_of(&rest[1..], source)?;
    Ok(Node::new(NodeKind::Let { name, value, body }, brand))
}

fn to_node_let(
    rest: &[Sexp],
    source: &Rc<str>,
    brand: Option<Brand>,
    kind: LetKind,
) -> ReadResult<Rc<Node>> {
    let binding_items = match &rest[0] {
        Sexp::List(items, _) => items.as_slice(),
        other => {
            return Err(ReadError::new(
                ReadErrorKind::InvalidSpecialForm("let bindings must be a list".into()),
                brand_of(source, other.offset()),
            ))
        }
    };
    let bindings = bindings_of(binding_items, source)?;
    let body = body_of(&rest[1..], source)?;
    let kind = match kind {
        LetKind::LetStar => NodeKind::LetStar { bindings, body },
        LetKind::LetRec => NodeKind::LetRec { bindings, body },
    };
    Ok(Node::new(kind, brand))
}

fn to_node_lambda(rest: &[Sexp], source: &Rc<str>, brand: Option<Brand>) -> ReadResult<Rc<Node>> {
    let formal_items = match &rest[0] {
        Sexp::List(items, _) => items.as_slice(),
        other => {
            return Err(ReadError::new(
                ReadErrorKind::InvalidSpecialForm("lambda formals must be a list".into()),
                brand_of(source, other.offset()),
            ))
        }
    };
    let formals = to_formals(formal_items, source)?;
    let (docstring, body_items) = split_docstrings(&rest[1..]);
    let body = body_of(body_items, source)?;
    Ok(Node::new(
        NodeKind::Lambda {
            formals,
            docstring,
            body,
        },
        brand,
    ))
}

fn to_node_define(rest: &[Sexp], source: &Rc<str>, brand: Option<Brand>) -> ReadResult<Rc<Node>> {
    match &rest[0] {
        // `(define (name . formals) docs... body...)` function sugar.
        Sexp::List(head, _) if !head.is_empty() => {
            let name = expect_symbol(&head[0], source, "define")?.clone();
            let formals = to_formals(&head[1..], source)?;
            let (docstring, body_items) = split_docstrings(&rest[1..]);
            let body = body_of(body_items, source)?;
            Ok(Node::new(
                NodeKind::Define {
                    name,
                    formals: Some(formals),
                    docstring,
                    body,
                },
                brand,
            ))
        }
        // `(define name docs... expr)` or `(define name)` (binds unbound).
        Sexp::Symbol(name, _) => {
            let (docstring, body_items) = split_docstrings(&rest[1..]);
            let body = body_of(body_items, source)?;
            Ok(Node::new(
                NodeKind::Define {
                    name: name.clone(),
                    formals: None,
                    docstring,
                    body,
                },
                brand,
            ))
        }
        other => Err(ReadError::new(
            ReadErrorKind::InvalidSpecialForm("malformed define".into()),
            brand_of(source, other.offset()),
        )),
    }
}

/// Converts a parsed `Sexp` into quoted data. `unquote`/`unquote-splice`
/// heads are preserved as evaluable markers (their operand is parsed as
/// code, since reifying them means evaluating that code; see forms.rs);
/// everything else becomes a literal `Datum`.
fn to_datum(sexp: &Sexp, source: &Rc<str>) -> ReadResult<Datum> {
    match sexp {
        Sexp::Int(v, _) => Ok(Datum::Int(*v)),
        Sexp::Float(v, _) => Ok(Datum::Float(*v)),
        Sexp::Str(v, _) => Ok(Datum::Str(v.clone())),
        Sexp::Bool(v, _) => Ok(Datum::Bool(*v)),
        Sexp::Doc(_, _) => Err(ReadError::new(
            ReadErrorKind::InvalidSpecialForm("docstring inside quoted data".into()),
            brand_of(source, sexp.offset()),
        )),
        Sexp::Symbol(name, _) if name.as_ref() == "nil" => Ok(Datum::Nil),
        Sexp::Symbol(name, _) => Ok(Datum::Symbol(name.clone())),
        Sexp::List(items, _) => {
            if let Some(Sexp::Symbol(name, _)) = items.first() {
                if name.as_ref() == "unquote" && items.len() == 2 {
                    return Ok(Datum::Unquote(to_node(&items[1], source)?));
                }
                if name.as_ref() == "unquote-splice" && items.len() == 2 {
                    return Ok(Datum::UnquoteSplice(to_node(&items[1], source)?));
                }
            }
            // A trailing `. tail` makes this a dotted list, matching the
            // reader's own formals-dotted-pair convention.
            if items.len() >= 2 {
                if let Sexp::Symbol(dot, _) = &items[items.len() - 2] {
                    if dot.as_ref() == "." {
                        let tail = to_datum(&items[items.len() - 1], source)?;
                        let head_items = &items[..items.len() - 2];
                        let datums = head_items
                            .iter()
                            .map(|s| to_datum(s, source))
                            .collect::<ReadResult<Vec<_>>>()?;
                        return Ok(Datum::List {
                            items: datums,
                            tail: Some(Box::new(tail)),
                        });
                    }
                }
            }
            let datums = items
                .iter()
                .map(|s| to_datum(s, source))
                .collect::<ReadResult<Vec<_>>>()?;
            Ok(Datum::List {
                items: datums,
                tail: None,
            })
        }
    }
}

/// Converts a parsed `Sexp` directly into a runtime `Value` (a cons-list of
/// atoms), for the `read-string` primitive: no special forms, no
/// unquote handling, just data.
fn sexp_to_value(sexp: &Sexp) -> ReadResult<Value> {
    match sexp {
        Sexp::Int(v, _) => Ok(Value::Int(*v)),
        Sexp::Float(v, _) => Ok(Value::Float(*v)),
        Sexp::Str(v, _) => Ok(Value::Str(v.clone())),
        Sexp::Bool(v, _) => Ok(Value::Bool(*v)),
        Sexp::Symbol(name, _) if name.as_ref() == "nil" => Ok(Value::Nil),
        Sexp::Symbol(name, _) => Ok(Value::symbol(name.clone())),
        Sexp::Doc(text, _) => Ok(Value::string(text.clone())),
        Sexp::List(items, _) => {
            let mut tail = Value::Nil;
            for item in items.iter().rev() {
                tail = Value::cons(sexp_to_value(item)?, tail);
            }
            Ok(tail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Rc<Node> {
        parse_program(src).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn parses_integer_atom() {
        let node = parse_one("42");
        assert!(matches!(node.kind, NodeKind::Atom(Literal::Int(42))));
    }

    #[test]
    fn parses_negative_float() {
        let node = parse_one("-1.5e2");
        match &node.kind {
            NodeKind::Atom(Literal::Float(f)) => assert!((*f - (-150.0)).abs() < 1e-9),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn recognizes_if_as_typed_node() {
        let node = parse_one("(if #t 1 2)");
        assert!(matches!(node.kind, NodeKind::If { .. }));
    }

    #[test]
    fn quote_shorthand_desugars() {
        let node = parse_one("'(a b)");
        assert!(matches!(node.kind, NodeKind::Quote(_)));
    }

    #[test]
    fn define_function_sugar_captures_formals() {
        let node = parse_one("(define (f x . rest) (+ x 1))");
        match &node.kind {
            NodeKind::Define { formals: Some(f), .. } => {
                assert_eq!(f.required.len(), 1);
                assert_eq!(f.variadic.as_deref(), Some("rest"));
            }
            _ => panic!("expected function define"),
        }
    }

    #[test]
    fn docstring_attaches_to_define() {
        let node = parse_one("(define (f x)\n;^ adds one\n(+ x 1))");
        match &node.kind {
            NodeKind::Define { docstring: Some(d), .. } => assert_eq!(d.as_ref(), "adds one"),
            _ => panic!("expected docstring"),
        }
    }

    #[test]
    fn unmatched_closing_paren_errors() {
        assert!(parse_program(")").is_err());
    }

    #[test]
    fn unclosed_paren_errors() {
        assert!(parse_program("(+ 1 2").is_err());
    }

    #[test]
    fn generic_application_falls_back() {
        let node = parse_one("(+ 1 2)");
        assert!(matches!(node.kind, NodeKind::Apply { .. }));
    }
}
