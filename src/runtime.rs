use std::rc::Rc;

use crate::{
    ast::{NodeId, SyntaxTree},
    diagnostics::{Diagnostic, DiagnosticKind, QuillError, Result},
    environment::{Binding, Environment, EnvironmentRef},
    lexer, parser,
    sink::{Sink, StdoutSink},
    stack::ensure_sufficient_stack,
    stdlib::{Registry, SpecialForm},
    value::{Closure, ListTag, ListValue, Value, ValueKind},
};

pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Tunables for one interpreter.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Nesting of `eval` calls allowed before a `StackOverflowError`.
    pub max_depth: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub struct Interpreter {
    registry: Rc<Registry>,
    env: EnvironmentRef,
    syntax: SyntaxTree,
    context: ExecutionContext,
    sink: Box<dyn Sink>,
    depth: usize,
    next_tree: u32,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_context(ExecutionContext::default())
    }

    pub fn with_context(context: ExecutionContext) -> Self {
        Self::with_sink(context, Box::new(StdoutSink))
    }

    pub fn with_sink(context: ExecutionContext, sink: Box<dyn Sink>) -> Self {
        let registry = Rc::new(Registry::standard());
        let env = Self::root_frame(&registry);
        Self {
            registry,
            env,
            syntax: SyntaxTree::with_id(0),
            context,
            sink,
            depth: 0,
            next_tree: 1,
        }
    }

    fn root_frame(registry: &Registry) -> EnvironmentRef {
        let env = Environment::new();
        registry.install(&env);
        env
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The persistent session frame used by [`Interpreter::eval_source`].
    pub fn global_env(&self) -> EnvironmentRef {
        Rc::clone(&self.env)
    }

    pub fn syntax(&self) -> &SyntaxTree {
        &self.syntax
    }

    /// Parses and evaluates `source` against a fresh root frame, then emits the result.
    pub fn run(&mut self, source: &str) -> Result<Value> {
        self.reset();
        let value = self.eval_source(source)?;
        self.sink.emit(&value);
        Ok(value)
    }

    /// Like [`Interpreter::run`], for input that has not yet been checked to be text.
    pub fn run_bytes(&mut self, bytes: &[u8]) -> Result<Value> {
        let source = lexer::decode(bytes)?;
        self.run(source)
    }

    /// Evaluates `source` in the session frame, keeping its definitions for later calls.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse_program(source, &mut self.syntax)?;
        let env = Rc::clone(&self.env);
        self.eval_program(&program, &env)
    }

    /// Discards every binding made so far and starts over from the builtins.
    pub fn reset(&mut self) {
        self.env = Self::root_frame(&self.registry);
        self.syntax = SyntaxTree::with_id(self.next_tree);
        self.next_tree = self.next_tree.wrapping_add(1);
        self.depth = 0;
    }

    /// Evaluates each top-level form in order; the program's value is the last one.
    pub fn eval_program(&mut self, program: &Value, env: &EnvironmentRef) -> Result<Value> {
        let Some(list) = program.as_list() else {
            return self.eval(program, env);
        };
        let mut last = Value::void();
        for form in &list.items {
            last = self.eval(form, env)?;
        }
        Ok(last)
    }

    pub fn eval(&mut self, expr: &Value, env: &EnvironmentRef) -> Result<Value> {
        if self.depth >= self.context.max_depth {
            return Err(QuillError::from(Diagnostic::new(
                DiagnosticKind::StackOverflow,
                format!("maximum evaluation depth of {} exceeded", self.context.max_depth),
            )));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.eval_inner(expr, env));
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, expr: &Value, env: &EnvironmentRef) -> Result<Value> {
        match &*expr.0 {
            ValueKind::Symbol(name) => self.resolve(name, env),
            ValueKind::List(list) if list.is_code() => {
                let origin = list.origin;
                self.eval_list(list, env)
                    .map_err(|err| self.annotate(err, origin))
            }
            _ => Ok(expr.clone()),
        }
    }

    fn resolve(&mut self, name: &str, env: &EnvironmentRef) -> Result<Value> {
        tracing::trace!(symbol = name, "resolving symbol");
        match Environment::lookup(env, name)? {
            (Binding::Value(value), _) => Ok(value),
            (Binding::Deferred(expr), owner) => {
                let value = self.eval(&expr, &owner)?;
                Ok(owner.borrow_mut().force(name, value))
            }
        }
    }

    fn eval_list(&mut self, list: &ListValue, env: &EnvironmentRef) -> Result<Value> {
        let Some(head) = list.items.first() else {
            return Err(eval_error("cannot evaluate an empty list"));
        };
        if let Some(form) = head.as_symbol().and_then(|name| self.registry.special_form(name)) {
            return self.special_form(form, list, env);
        }

        let mut values = Vec::with_capacity(list.items.len());
        for item in &list.items {
            values.push(self.eval(item, env)?);
        }
        let operator = values.remove(0);
        self.apply(&operator, &values)
    }

    /// Calls a native function or closure with already-evaluated arguments.
    pub fn apply(&mut self, operator: &Value, args: &[Value]) -> Result<Value> {
        match &*operator.0 {
            ValueKind::NativeFunction(fun) => fun.call(args, self.sink.as_mut()),
            ValueKind::Closure(closure) => self.call_closure(closure, args),
            _ => Err(QuillError::from(Diagnostic::new(
                DiagnosticKind::NotCallable,
                format!("{} `{operator}` is not callable", operator.type_name()),
            ))),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: &[Value]) -> Result<Value> {
        if args.len() != closure.params.len() {
            return Err(QuillError::from(Diagnostic::new(
                DiagnosticKind::Arity,
                format!(
                    "function expected {} arguments but received {}",
                    closure.params.len(),
                    args.len()
                ),
            )));
        }
        tracing::debug!(params = ?closure.params, "calling closure");
        let frame = Environment::with_parent(Rc::clone(&closure.env));
        {
            let mut scope = frame.borrow_mut();
            for (name, value) in closure.params.iter().zip(args) {
                scope.define(name.to_string(), Binding::Value(value.clone()));
            }
        }
        self.eval_body(&closure.body, &frame)
    }

    fn eval_body(&mut self, body: &[Value], env: &EnvironmentRef) -> Result<Value> {
        let mut result = None;
        for expr in body {
            result = Some(self.eval(expr, env)?);
        }
        result.ok_or_else(|| eval_error("function body is empty"))
    }

    fn special_form(
        &mut self,
        form: SpecialForm,
        list: &ListValue,
        env: &EnvironmentRef,
    ) -> Result<Value> {
        let args = &list.items[1..];
        match form {
            SpecialForm::Quote => self.quote(args),
            SpecialForm::Define => self.define(args, list.origin, env),
            SpecialForm::Lambda => self.lambda(args, env),
            SpecialForm::If => self.if_form(args, env),
            SpecialForm::Set => self.set(args, env),
            SpecialForm::Let => self.let_form(args, env),
        }
    }

    fn quote(&mut self, args: &[Value]) -> Result<Value> {
        let [datum] = args else {
            return Err(eval_error(format!(
                "`quote` expects exactly one argument but received {}",
                args.len()
            )));
        };
        Ok(quoted(datum))
    }

    fn define(
        &mut self,
        args: &[Value],
        origin: Option<NodeId>,
        env: &EnvironmentRef,
    ) -> Result<Value> {
        let Some((target, rest)) = args.split_first() else {
            return Err(eval_error("`define` expects a name and a value"));
        };
        if let Some(name) = target.as_symbol() {
            let [value] = rest else {
                return Err(eval_error(format!(
                    "`(define {name} ...)` expects exactly one value expression"
                )));
            };
            tracing::debug!(name, "define");
            env.borrow_mut()
                .define(name, Binding::Deferred(value.clone()));
            return Ok(Value::symbol(name));
        }

        // (define (name params...) body...) is (define name (lambda (params...) body...))
        let signature = target
            .as_list()
            .ok_or_else(|| eval_error("`define` expects a symbol or a (name params...) list"))?;
        let Some((name, params)) = signature.items.split_first() else {
            return Err(eval_error("`define` signature is missing a function name"));
        };
        let name = name
            .as_symbol()
            .ok_or_else(|| eval_error("`define` function name must be a symbol"))?;
        if rest.is_empty() {
            return Err(eval_error(format!("`define` of `{name}` has an empty body")));
        }
        let params = Value::list(params.to_vec(), ListTag::Code);
        let mut lambda = Vec::with_capacity(rest.len() + 2);
        lambda.push(Value::symbol("lambda"));
        lambda.push(params);
        lambda.extend(rest.iter().cloned());
        let lambda = Value::new(ValueKind::List(ListValue {
            items: lambda,
            tag: ListTag::Code,
            origin,
        }));
        tracing::debug!(name, "define function");
        env.borrow_mut().define(name, Binding::Deferred(lambda));
        Ok(Value::symbol(name))
    }

    fn lambda(&mut self, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
        let Some((params, body)) = args.split_first() else {
            return Err(eval_error("`lambda` expects a parameter list"));
        };
        let params = params
            .as_list()
            .ok_or_else(|| eval_error("`lambda` parameters must be a list of symbols"))?;
        let names = params
            .items
            .iter()
            .map(|param| {
                param
                    .as_symbol()
                    .map(Rc::<str>::from)
                    .ok_or_else(|| {
                        eval_error(format!("`lambda` parameter `{param}` is not a symbol"))
                    })
            })
            .collect::<Result<Vec<Rc<str>>>>()?;
        if body.is_empty() {
            return Err(eval_error("`lambda` has an empty body"));
        }
        Ok(Value::new(ValueKind::Closure(Rc::new(Closure {
            params: names,
            body: body.to_vec(),
            env: Rc::clone(env),
        }))))
    }

    fn if_form(&mut self, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
        let (test, conseq, altern) = match args {
            [test, conseq] => (test, conseq, None),
            [test, conseq, altern] => (test, conseq, Some(altern)),
            _ => {
                return Err(eval_error(format!(
                    "`if` expects a test, a consequent and an optional alternative, received {} arguments",
                    args.len()
                )));
            }
        };
        if self.eval(test, env)?.is_truthy() {
            self.eval(conseq, env)
        } else if let Some(altern) = altern {
            self.eval(altern, env)
        } else {
            Ok(Value::void())
        }
    }

    fn set(&mut self, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
        let [target, value] = args else {
            return Err(eval_error("`set!` expects a name and a value"));
        };
        let name = target
            .as_symbol()
            .ok_or_else(|| eval_error("`set!` target must be a symbol"))?;
        let value = self.eval(value, env)?;
        tracing::debug!(name, %value, "set!");
        Environment::assign(env, name, value)?;
        Ok(Value::symbol(name))
    }

    fn let_form(&mut self, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
        let Some((bindings, body)) = args.split_first() else {
            return Err(eval_error("`let` expects a binding list"));
        };
        let bindings = bindings
            .as_list()
            .ok_or_else(|| eval_error("`let` bindings must be a list of (name value) pairs"))?;
        if body.is_empty() {
            return Err(eval_error("`let` has an empty body"));
        }
        let frame = Environment::with_parent(Rc::clone(env));
        {
            let mut scope = frame.borrow_mut();
            for binding in &bindings.items {
                let pair = binding.as_list().map(|list| list.items.as_slice());
                let Some([name, value]) = pair else {
                    return Err(eval_error(format!(
                        "`let` binding `{binding}` is not a (name value) pair"
                    )));
                };
                let name = name.as_symbol().ok_or_else(|| {
                    eval_error(format!("`let` binding name `{name}` is not a symbol"))
                })?;
                if !scope.contains(name) {
                    scope.define(name, Binding::Deferred(value.clone()));
                }
            }
        }
        tracing::debug!(count = bindings.items.len(), "let");
        self.eval_body(body, &frame)
    }

    /// Attaches the innermost source location and the enclosing forms to an error that has none.
    fn annotate(&self, err: QuillError, origin: Option<NodeId>) -> QuillError {
        match (err, origin) {
            (QuillError::Diagnostic(mut diag), Some(node)) if diag.span.is_none() => {
                if let Some(syntax) = self.syntax.get(node) {
                    diag.span = Some(syntax.span);
                    diag.notes.extend(self.syntax.traceback(node));
                }
                QuillError::Diagnostic(diag)
            }
            (err, _) => err,
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_error(message: impl Into<String>) -> QuillError {
    QuillError::from(Diagnostic::new(DiagnosticKind::Eval, message))
}

/// Marks every code list inside `datum` as data, so no part of it is applied later.
fn quoted(datum: &Value) -> Value {
    match datum.as_list() {
        Some(list) if list.is_code() => Value::new(ValueKind::List(ListValue {
            items: list
                .items
                .iter()
                .map(|item| ensure_sufficient_stack(|| quoted(item)))
                .collect(),
            tag: ListTag::Quoted,
            origin: list.origin,
        })),
        _ => datum.clone(),
    }
}
