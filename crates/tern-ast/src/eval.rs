//! Reference evaluator for target bodies
//!
//! Executes a [`Block`] with the target's control-flow rules (gotos to
//! labels in enclosing blocks, try/catch/finally, loops, switch) and records
//! the observable events: external calls and suspension points. Faults can
//! be injected at named calls or at the resumption of a given suspension,
//! which is how rewritten bodies are checked against their originals.
//!
//! Locals live in one flat environment per run. Reading or assigning a name
//! that was never declared is an error, so hoisting mistakes surface.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::ir::{BinaryOp, Block, Expr, Ident, Stmt, StmtKind, SuspendKind, TargetType};

const DEFAULT_STEP_LIMIT: usize = 100_000;

/// Runtime value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(String),
    /// `Optional<T>`; `None` is the canonical none value
    Wrapped(Option<Box<Value>>),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            _ => true,
        }
    }

    fn has_type(&self, ty: &TargetType) -> bool {
        match (self, ty) {
            (Value::Null, TargetType::Nullable(_)) => true,
            (Value::Null, _) => false,
            (_, TargetType::Object) => true,
            (Value::Bool(_), TargetType::Bool) => true,
            (Value::Int(_), TargetType::Int) => true,
            (Value::Str(_), TargetType::String) => true,
            (Value::Wrapped(_), TargetType::Optional(_)) => true,
            (value, TargetType::Nullable(inner)) => value.has_type(inner),
            _ => false,
        }
    }
}

/// Observable event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Call { callee: String, args: Vec<Value> },
    Suspend { kind: SuspendKind, value: Option<Value> },
}

impl Event {
    pub fn callee(&self) -> Option<&str> {
        match self {
            Event::Call { callee, .. } => Some(callee),
            Event::Suspend { .. } => None,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Fell off the end of the body
    Finished,
    Returned(Value),
    /// An exception escaped the body
    Threw(Value),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("use of undeclared local `{0}`")]
    Unbound(String),
    #[error("jump to label `{0}` that is not in an enclosing block")]
    UnknownLabel(String),
    #[error("`{0}` outside of a loop or switch")]
    StrayJump(&'static str),
    #[error("type error: {0}")]
    Type(String),
    #[error("uncaught exception {0:?}")]
    Uncaught(Value),
    #[error("step limit of {0} exceeded")]
    StepLimit(usize),
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
    Goto(Ident),
    Throw(Value),
}

enum Unwind {
    Throw(Value),
    Fatal(EvalError),
}

impl From<EvalError> for Unwind {
    fn from(err: EvalError) -> Self {
        Unwind::Fatal(err)
    }
}

/// Evaluate an expression inside statement execution, turning a thrown
/// value into `Flow::Throw`.
macro_rules! eval_or_flow {
    ($self:ident, $expr:expr) => {
        match $self.eval($expr) {
            Ok(value) => value,
            Err(Unwind::Throw(value)) => return Ok(Flow::Throw(value)),
            Err(Unwind::Fatal(err)) => return Err(err),
        }
    };
}

/// Interpreter with fault injection.
#[derive(Debug)]
pub struct Evaluator {
    locals: HashMap<String, Value>,
    failing_calls: HashSet<String>,
    failing_resumes: HashSet<usize>,
    scripted: HashMap<String, VecDeque<Value>>,
    trace: Vec<Event>,
    suspensions: usize,
    steps: usize,
    step_limit: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            locals: HashMap::new(),
            failing_calls: HashSet::new(),
            failing_resumes: HashSet::new(),
            scripted: HashMap::new(),
            trace: Vec::new(),
            suspensions: 0,
            steps: 0,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Bind a local before the run (e.g., a method parameter).
    pub fn with_local(mut self, name: &str, value: Value) -> Self {
        self.locals.insert(name.to_string(), value);
        self
    }

    /// Every call to `callee` throws `Value::Str(callee)`.
    pub fn fail_call(mut self, callee: &str) -> Self {
        self.failing_calls.insert(callee.to_string());
        self
    }

    /// Resuming after the `index`-th suspension (0-based) throws
    /// `Value::Str("resume<index>")`.
    pub fn fail_resume(mut self, index: usize) -> Self {
        self.failing_resumes.insert(index);
        self
    }

    /// Successive calls to `callee` return these values, then null.
    pub fn script_call(mut self, callee: &str, values: Vec<Value>) -> Self {
        self.scripted.insert(callee.to_string(), values.into());
        self
    }

    pub fn trace(&self) -> &[Event] {
        &self.trace
    }

    /// Names of the external calls made so far, in order.
    pub fn calls(&self) -> Vec<&str> {
        self.trace.iter().filter_map(Event::callee).collect()
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Execute a body to completion.
    pub fn run(&mut self, body: &Block) -> Result<Completion, EvalError> {
        match self.exec_block(body)? {
            Flow::Normal => Ok(Completion::Finished),
            Flow::Return(value) => Ok(Completion::Returned(value)),
            Flow::Throw(value) => Ok(Completion::Threw(value)),
            Flow::Goto(label) => Err(EvalError::UnknownLabel(label.0)),
            Flow::Break => Err(EvalError::StrayJump("break")),
            Flow::Continue => Err(EvalError::StrayJump("continue")),
        }
    }

    /// Evaluate a single expression.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match self.eval(expr) {
            Ok(value) => Ok(value),
            Err(Unwind::Throw(value)) => Err(EvalError::Uncaught(value)),
            Err(Unwind::Fatal(err)) => Err(err),
        }
    }

    fn exec_block(&mut self, block: &Block) -> Result<Flow, EvalError> {
        let mut index = 0;
        while index < block.stmts.len() {
            match self.exec_stmt(&block.stmts[index])? {
                Flow::Normal => index += 1,
                Flow::Goto(label) => match find_label(block, &label) {
                    Some(target) => index = target,
                    None => return Ok(Flow::Goto(label)),
                },
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(EvalError::StepLimit(self.step_limit));
        }

        match &stmt.kind {
            StmtKind::Block(block) => self.exec_block(block),
            StmtKind::If {
                test,
                then_branch,
                else_branch,
            } => {
                if eval_or_flow!(self, test).truthy() {
                    self.exec_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While { test, body } => loop {
                if !eval_or_flow!(self, test).truthy() {
                    return Ok(Flow::Normal);
                }
                match self.exec_stmt(body)? {
                    Flow::Normal | Flow::Continue => {}
                    Flow::Break => return Ok(Flow::Normal),
                    other => return Ok(other),
                }
            },
            StmtKind::Try(try_stmt) => {
                let mut flow = self.exec_block(&try_stmt.body)?;
                if let (Flow::Throw(_), Some(catch)) = (&flow, &try_stmt.catch) {
                    flow = self.exec_block(catch)?;
                }
                if let Some(finally) = &try_stmt.finally {
                    match self.exec_block(finally)? {
                        Flow::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                Ok(flow)
            }
            StmtKind::Labeled { body, .. } => self.exec_stmt(body),
            StmtKind::Goto(label) => Ok(Flow::Goto(label.clone())),
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Expr(expr) => {
                eval_or_flow!(self, expr);
                Ok(Flow::Normal)
            }
            StmtKind::Local(decl) => {
                let value = match &decl.init {
                    Some(init) => eval_or_flow!(self, init),
                    None => Value::Null,
                };
                self.locals.insert(decl.name.0.clone(), value);
                Ok(Flow::Normal)
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => eval_or_flow!(self, expr),
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Yield(suspension) => {
                let value = match &suspension.value {
                    Some(expr) => Some(eval_or_flow!(self, expr)),
                    None => None,
                };
                self.trace.push(Event::Suspend {
                    kind: suspension.kind,
                    value,
                });
                let index = self.suspensions;
                self.suspensions += 1;
                if self.failing_resumes.contains(&index) {
                    return Ok(Flow::Throw(Value::Str(format!("resume{}", index))));
                }
                Ok(Flow::Normal)
            }
            StmtKind::Throw(expr) => Ok(Flow::Throw(eval_or_flow!(self, expr))),
            StmtKind::Method(_) => Ok(Flow::Normal),
            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                let value = eval_or_flow!(self, discriminant);
                let mut chosen = None;
                for case in cases {
                    match &case.test {
                        Some(test) => {
                            if eval_or_flow!(self, test) == value {
                                chosen = Some(&case.body);
                                break;
                            }
                        }
                        None => {
                            chosen.get_or_insert(&case.body);
                        }
                    }
                }
                match chosen {
                    Some(body) => match self.exec_block(body)? {
                        Flow::Break => Ok(Flow::Normal),
                        other => Ok(other),
                    },
                    None => Ok(Flow::Normal),
                }
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::This => Ok(Value::Object("this".to_string())),
            Expr::Local(name) => self
                .locals
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| EvalError::Unbound(name.0.clone()).into()),
            Expr::Assign { target, value } => {
                let value = self.eval(value)?;
                match self.locals.get_mut(target.as_str()) {
                    Some(slot) => {
                        *slot = value.clone();
                        Ok(value)
                    }
                    None => Err(EvalError::Unbound(target.0.clone()).into()),
                }
            }
            Expr::Call { callee, args } => {
                let args = self.eval_all(args)?;
                self.call(callee.as_str(), args)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                self.eval(receiver)?;
                let args = self.eval_all(args)?;
                self.call(method.as_str(), args)
            }
            Expr::Not(value) => Ok(Value::Bool(!self.eval(value)?.truthy())),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Cast { ty, value } => {
                let value = self.eval(value)?;
                if value.has_type(ty) {
                    Ok(value)
                } else {
                    Err(Unwind::Throw(Value::Str("InvalidCast".to_string())))
                }
            }
            Expr::Is { value, ty } => Ok(Value::Bool(self.eval(value)?.has_type(ty))),
            Expr::Wrap { value, .. } => match self.eval(value)? {
                Value::Null => Ok(Value::Wrapped(None)),
                present => Ok(Value::Wrapped(Some(Box::new(present)))),
            },
            Expr::WrapNone(_) => Ok(Value::Wrapped(None)),
            Expr::Unwrap { value, .. } => match self.eval(value)? {
                Value::Wrapped(Some(inner)) => Ok(*inner),
                Value::Wrapped(None) => Ok(Value::Null),
                other => Err(EvalError::Type(format!("unwrap of non-optional {:?}", other)).into()),
            },
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, Unwind> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    fn call(&mut self, callee: &str, args: Vec<Value>) -> Result<Value, Unwind> {
        self.trace.push(Event::Call {
            callee: callee.to_string(),
            args,
        });
        if self.failing_calls.contains(callee) {
            return Err(Unwind::Throw(Value::Str(callee.to_string())));
        }
        Ok(self
            .scripted
            .get_mut(callee)
            .and_then(|values| values.pop_front())
            .unwrap_or(Value::Null))
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, Unwind> {
        let lhs = self.eval(left)?;
        match op {
            BinaryOp::And if !lhs.truthy() => return Ok(Value::Bool(false)),
            BinaryOp::Or if lhs.truthy() => return Ok(Value::Bool(true)),
            BinaryOp::And | BinaryOp::Or => return Ok(Value::Bool(self.eval(right)?.truthy())),
            _ => {}
        }
        let rhs = self.eval(right)?;
        match (op, &lhs, &rhs) {
            (BinaryOp::Eq, _, _) => Ok(Value::Bool(lhs == rhs)),
            (BinaryOp::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
            (BinaryOp::Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
            _ => Err(EvalError::Type(format!("{:?} on {:?} and {:?}", op, lhs, rhs)).into()),
        }
    }
}

fn find_label(block: &Block, label: &Ident) -> Option<usize> {
    block.stmts.iter().position(|stmt| {
        matches!(&stmt.kind, StmtKind::Labeled { label: l, .. } if l == label)
    })
}
