use indexmap::IndexMap;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, QuillError, Result},
    environment::{Binding, EnvironmentRef},
    sink::Sink,
    value::{Arity, ListTag, NativeCallback, NativeFunction, Value, ValueKind},
};

/// Operators whose arguments reach the handler unevaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    Define,
    Lambda,
    If,
    Set,
    Let,
}

#[derive(Clone)]
pub enum Builtin {
    Special(SpecialForm),
    Native(NativeFunction),
}

/// The fixed operator table, built once per interpreter and never mutated afterwards.
pub struct Registry {
    entries: IndexMap<&'static str, Builtin>,
    constants: IndexMap<&'static str, Value>,
}

impl Registry {
    pub fn standard() -> Self {
        let mut entries = IndexMap::new();
        for (name, form) in [
            ("quote", SpecialForm::Quote),
            ("define", SpecialForm::Define),
            ("lambda", SpecialForm::Lambda),
            ("if", SpecialForm::If),
            ("set!", SpecialForm::Set),
            ("let", SpecialForm::Let),
        ] {
            entries.insert(name, Builtin::Special(form));
        }

        let natives = [
            native("begin", Arity::AtLeast(0), begin),
            native("cons", Arity::Exact(2), cons),
            native("car", Arity::Exact(1), car),
            native("cdr", Arity::Exact(1), cdr),
            native("list", Arity::AtLeast(0), list),
            native("+", Arity::AtLeast(0), add),
            native("-", Arity::AtLeast(1), subtract),
            native("*", Arity::Exact(2), multiply),
            native("/", Arity::Exact(2), divide),
            native("expt", Arity::Exact(2), expt),
            native("=", Arity::Exact(2), equal),
            native("<", Arity::Exact(2), less),
            native(">", Arity::Exact(2), greater),
            native("not", Arity::Exact(1), not),
            native("display", Arity::Exact(1), display),
        ];
        for fun in natives {
            entries.insert(fun.name, Builtin::Native(fun));
        }

        let mut constants = IndexMap::new();
        constants.insert("#t", Value::bool(true));
        constants.insert("#f", Value::bool(false));

        Self { entries, constants }
    }

    pub fn special_form(&self, name: &str) -> Option<SpecialForm> {
        match self.entries.get(name) {
            Some(Builtin::Special(form)) => Some(*form),
            _ => None,
        }
    }

    /// Seeds a root frame with every native function and constant.
    pub fn install(&self, env: &EnvironmentRef) {
        let mut scope = env.borrow_mut();
        for (name, builtin) in &self.entries {
            if let Builtin::Native(fun) = builtin {
                scope.define(
                    *name,
                    Binding::Value(Value::new(ValueKind::NativeFunction(fun.clone()))),
                );
            }
        }
        for (name, value) in &self.constants {
            scope.define(*name, Binding::Value(value.clone()));
        }
    }
}

fn native(name: &'static str, arity: Arity, callback: NativeCallback) -> NativeFunction {
    NativeFunction {
        name,
        arity,
        callback,
    }
}

fn type_error(name: &str, expected: &str, found: &Value) -> QuillError {
    QuillError::from(Diagnostic::new(
        DiagnosticKind::Type,
        format!("`{name}` expected {expected} but found {}", found.type_name()),
    ))
}

fn eval_error(message: impl Into<String>) -> QuillError {
    QuillError::from(Diagnostic::new(DiagnosticKind::Eval, message))
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(n) => Value::int(n),
            Number::Float(f) => Value::float(f),
        }
    }
}

fn expect_number(value: &Value, name: &str) -> Result<Number> {
    match &*value.0 {
        ValueKind::Int(n) => Ok(Number::Int(*n)),
        ValueKind::Float(f) => Ok(Number::Float(*f)),
        _ => Err(type_error(name, "a number", value)),
    }
}

fn expect_list<'v>(value: &'v Value, name: &str) -> Result<&'v [Value]> {
    match &*value.0 {
        ValueKind::List(list) => Ok(&list.items),
        _ => Err(type_error(name, "a list", value)),
    }
}

/// Applies an integer operation with overflow checking, or the float one if either side is a float.
fn arithmetic(
    name: &str,
    left: Number,
    right: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Number> {
    match (left, right) {
        (Number::Int(a), Number::Int(b)) => int_op(a, b)
            .map(Number::Int)
            .ok_or_else(|| eval_error(format!("integer overflow in `{name}`"))),
        (a, b) => Ok(Number::Float(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn begin(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    Ok(args.last().cloned().unwrap_or_else(Value::void))
}

fn cons(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    Ok(Value::cons(args[0].clone(), args[1].clone()))
}

fn car(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    expect_list(&args[0], "car")?
        .first()
        .cloned()
        .ok_or_else(|| eval_error("`car` of an empty list"))
}

fn cdr(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    expect_list(&args[0], "cdr")?
        .last()
        .cloned()
        .ok_or_else(|| eval_error("`cdr` of an empty list"))
}

/// `(list a b c)` builds `(a (b (c)))`, every level tagged as a cons.
fn list(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    let Some((last, rest)) = args.split_last() else {
        return Ok(Value::list(Vec::new(), ListTag::Cons));
    };
    let mut chain = Value::list(vec![last.clone()], ListTag::Cons);
    for item in rest.iter().rev() {
        chain = Value::cons(item.clone(), chain);
    }
    Ok(chain)
}

fn add(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    let mut sum = Number::Int(0);
    for arg in args {
        let value = expect_number(arg, "+")?;
        sum = arithmetic("+", sum, value, i64::checked_add, |a, b| a + b)?;
    }
    Ok(sum.into_value())
}

fn subtract(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    let first = expect_number(&args[0], "-")?;
    if args.len() == 1 {
        let negated = arithmetic("-", Number::Int(0), first, i64::checked_sub, |a, b| a - b)?;
        return Ok(negated.into_value());
    }
    let mut total = first;
    for arg in &args[1..] {
        let value = expect_number(arg, "-")?;
        total = arithmetic("-", total, value, i64::checked_sub, |a, b| a - b)?;
    }
    Ok(total.into_value())
}

fn multiply(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    let left = expect_number(&args[0], "*")?;
    let right = expect_number(&args[1], "*")?;
    Ok(arithmetic("*", left, right, i64::checked_mul, |a, b| a * b)?.into_value())
}

fn divide(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    let left = expect_number(&args[0], "/")?;
    let right = expect_number(&args[1], "/")?;
    if right.as_f64() == 0.0 {
        return Err(eval_error("division by zero"));
    }
    let quotient = match (left, right) {
        (Number::Int(a), Number::Int(b)) if a.checked_rem(b) == Some(0) => a
            .checked_div(b)
            .map(Number::Int)
            .ok_or_else(|| eval_error("integer overflow in `/`"))?,
        (a, b) => Number::Float(a.as_f64() / b.as_f64()),
    };
    Ok(quotient.into_value())
}

fn expt(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    let base = expect_number(&args[0], "expt")?;
    let exponent = expect_number(&args[1], "expt")?;
    let result = match (base, exponent) {
        (Number::Int(b), Number::Int(e)) if e >= 0 => {
            let e = u32::try_from(e).map_err(|_| eval_error("exponent too large in `expt`"))?;
            b.checked_pow(e)
                .map(Number::Int)
                .ok_or_else(|| eval_error("integer overflow in `expt`"))?
        }
        (b, e) => Number::Float(b.as_f64().powf(e.as_f64())),
    };
    Ok(result.into_value())
}

fn equal(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    Ok(Value::bool(args[0].equals(&args[1])))
}

fn less(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    compare(args, "<", |a, b| a < b, |a, b| a < b)
}

fn greater(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    compare(args, ">", |a, b| a > b, |a, b| a > b)
}

fn compare(
    args: &[Value],
    name: &str,
    int_cmp: fn(&i64, &i64) -> bool,
    float_cmp: fn(f64, f64) -> bool,
) -> Result<Value> {
    let left = expect_number(&args[0], name)?;
    let right = expect_number(&args[1], name)?;
    let result = match (left, right) {
        (Number::Int(a), Number::Int(b)) => int_cmp(&a, &b),
        (a, b) => float_cmp(a.as_f64(), b.as_f64()),
    };
    Ok(Value::bool(result))
}

fn not(args: &[Value], _sink: &mut dyn Sink) -> Result<Value> {
    Ok(Value::bool(!args[0].is_truthy()))
}

fn display(args: &[Value], sink: &mut dyn Sink) -> Result<Value> {
    sink.emit(&args[0]);
    Ok(Value::void())
}
