use std::{fmt, rc::Rc};

use crate::{
    ast::NodeId,
    diagnostics::{Diagnostic, DiagnosticKind, QuillError, Result},
    environment::EnvironmentRef,
    sink::Sink,
    stack::ensure_sufficient_stack,
};

/// A program expression and, since the language is homoiconic, a runtime value.
#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn void() -> Self {
        Self::new(ValueKind::Void)
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value))
    }

    pub fn symbol(name: impl Into<Rc<str>>) -> Self {
        Self::new(ValueKind::Symbol(name.into()))
    }

    pub fn list(items: Vec<Value>, tag: ListTag) -> Self {
        Self::new(ValueKind::List(ListValue {
            items,
            tag,
            origin: None,
        }))
    }

    /// A code list read from source, remembering where it was read.
    pub fn code(items: Vec<Value>, origin: NodeId) -> Self {
        Self::new(ValueKind::List(ListValue {
            items,
            tag: ListTag::Code,
            origin: Some(origin),
        }))
    }

    pub fn cons(head: Value, tail: Value) -> Self {
        Self::list(vec![head, tail], ListTag::Cons)
    }

    /// Only boolean `false` is falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(&*self.0, ValueKind::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Void => "Void",
            ValueKind::Bool(_) => "Bool",
            ValueKind::Int(_) => "Int",
            ValueKind::Float(_) => "Float",
            ValueKind::Symbol(_) => "Symbol",
            ValueKind::List(_) => "List",
            ValueKind::NativeFunction(_) => "NativeFunction",
            ValueKind::Closure(_) => "Closure",
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &*self.0 {
            ValueKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match &*self.0 {
            ValueKind::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &*self.0 {
            ValueKind::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(&*self.0, ValueKind::Void)
    }

    /// Structural equality; integers and floats compare numerically.
    pub fn equals(&self, other: &Value) -> bool {
        match (&*self.0, &*other.0) {
            (ValueKind::Void, ValueKind::Void) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Float(b)) | (ValueKind::Float(b), ValueKind::Int(a)) => {
                *a as f64 == *b
            }
            (ValueKind::Symbol(a), ValueKind::Symbol(b)) => a == b,
            (ValueKind::List(a), ValueKind::List(b)) => {
                a.items.len() == b.items.len()
                    && a.items
                        .iter()
                        .zip(&b.items)
                        .all(|(l, r)| ensure_sufficient_stack(|| l.equals(r)))
            }
            (ValueKind::NativeFunction(a), ValueKind::NativeFunction(b)) => a.name == b.name,
            (ValueKind::Closure(a), ValueKind::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Symbol(name) => write!(f, "Symbol({name})"),
            ValueKind::List(list) => {
                write!(f, "{:?}", list.tag)?;
                ensure_sufficient_stack(|| f.debug_list().entries(list.items.iter()).finish())
            }
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Void => write!(f, "#<void>"),
            ValueKind::Bool(true) => write!(f, "#t"),
            ValueKind::Bool(false) => write!(f, "#f"),
            ValueKind::Int(n) => write!(f, "{n}"),
            ValueKind::Float(n) => write!(f, "{n:?}"),
            ValueKind::Symbol(name) => write!(f, "{name}"),
            ValueKind::List(list) if list.tag == ListTag::Cons => write_cons(f, list),
            ValueKind::List(list) => {
                write!(f, "(")?;
                for (idx, item) in list.items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    ensure_sufficient_stack(|| write!(f, "{item}"))?;
                }
                write!(f, ")")
            }
            ValueKind::NativeFunction(fun) => write!(f, "#<builtin {}>", fun.name),
            ValueKind::Closure(_) => write!(f, "#<function>"),
        }
    }
}

/// Renders a right-nested cons chain as flat list notation, dotting an improper tail.
fn write_cons(f: &mut fmt::Formatter<'_>, list: &ListValue) -> fmt::Result {
    write!(f, "(")?;
    let mut cell = list;
    let mut first = true;
    loop {
        match cell.items.as_slice() {
            [] => break,
            [only] => {
                if !first {
                    write!(f, " ")?;
                }
                ensure_sufficient_stack(|| write!(f, "{only}"))?;
                break;
            }
            [head, tail] => {
                if !first {
                    write!(f, " ")?;
                }
                ensure_sufficient_stack(|| write!(f, "{head}"))?;
                match tail.as_list() {
                    Some(next) if next.tag == ListTag::Cons => {
                        cell = next;
                        first = false;
                    }
                    _ => {
                        ensure_sufficient_stack(|| write!(f, " . {tail}"))?;
                        break;
                    }
                }
            }
            items => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 || !first {
                        write!(f, " ")?;
                    }
                    ensure_sufficient_stack(|| write!(f, "{item}"))?;
                }
                break;
            }
        }
    }
    write!(f, ")")
}

#[derive(Clone)]
pub enum ValueKind {
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    Symbol(Rc<str>),
    List(ListValue),
    NativeFunction(NativeFunction),
    Closure(Rc<Closure>),
}

/// Whether a list is program text or data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTag {
    /// Read from source; evaluating it applies its head.
    Code,
    /// Produced by `quote`; evaluates to itself.
    Quoted,
    /// Produced by `cons` or `list`; evaluates to itself.
    Cons,
}

#[derive(Clone)]
pub struct ListValue {
    pub items: Vec<Value>,
    pub tag: ListTag,
    pub origin: Option<NodeId>,
}

impl ListValue {
    pub fn is_code(&self) -> bool {
        self.tag == ListTag::Code
    }
}

/// Releases nested lists from a worklist so that a long cons chain or deeply
/// nested source does not recurse once per level while being freed.
impl Drop for ListValue {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.items);
        while let Some(value) = pending.pop() {
            if let Ok(ValueKind::List(mut list)) = Rc::try_unwrap(value.0) {
                pending.append(&mut list.items);
            }
        }
    }
}

pub struct Closure {
    pub params: Vec<Rc<str>>,
    pub body: Vec<Value>,
    pub env: EnvironmentRef,
}

pub type NativeCallback = fn(&[Value], &mut dyn Sink) -> Result<Value>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: Arity,
    pub callback: NativeCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

impl NativeFunction {
    pub fn call(&self, args: &[Value], sink: &mut dyn Sink) -> Result<Value> {
        if !self.arity.accepts(args.len()) {
            return Err(QuillError::from(Diagnostic::new(
                DiagnosticKind::Arity,
                format!(
                    "`{}` expected {} arguments but received {}",
                    self.name,
                    self.arity,
                    args.len()
                ),
            )));
        }
        (self.callback)(args, sink)
    }
}
