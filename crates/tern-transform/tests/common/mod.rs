//! Shared helpers for integration tests
// Each test target uses a different subset of these helpers.
#![allow(dead_code)]

use tern_ast::{
    Block, Completion, Evaluator, Event, Expr, Stmt, StmtKind, TargetType, UniqueNames,
};
use tern_transform::config::SuspendConfig;
use tern_transform::hoist_suspensions;

pub fn call(name: &str) -> Stmt {
    Stmt::expr(Expr::call(name, vec![]))
}

pub fn yield_int(n: i64) -> Stmt {
    Stmt::yield_value(Some(Expr::Int(n)))
}

/// Hoist with default hints; names declared in `body` are reserved first.
pub fn hoist(body: &Block) -> Block {
    let mut names = UniqueNames::new();
    names.reserve_block(body);
    hoist_suspensions(body, &mut names, &SuspendConfig::default())
        .unwrap_or_else(|e| panic!("hoisting failed: {}", e))
        .body
}

/// Run a body on a fresh evaluator built by `setup`.
pub fn run(body: &Block, setup: impl Fn() -> Evaluator) -> (Completion, Vec<Event>) {
    let mut eval = setup();
    let completion = eval
        .run(body)
        .unwrap_or_else(|e| panic!("evaluation failed: {}", e));
    (completion, eval.trace().to_vec())
}

pub fn count_calls(trace: &[Event], callee: &str) -> usize {
    trace.iter().filter(|e| e.callee() == Some(callee)).count()
}

/// Deterministic xorshift64 generator for reproducible trees.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        XorShift(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

/// Generates bodies mixing calls, suspensions, locals, if statements and
/// nested try/catch/finally. Every call and local gets a unique name, and
/// finally blocks never suspend.
pub struct TreeGen {
    rng: XorShift,
    max_depth: usize,
    calls: Vec<String>,
    tests: Vec<String>,
    locals: usize,
}

impl TreeGen {
    pub fn new(seed: u64, max_depth: usize) -> Self {
        Self {
            rng: XorShift::new(seed),
            max_depth,
            calls: Vec::new(),
            tests: Vec::new(),
            locals: 0,
        }
    }

    /// Names of all generated calls, in creation order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Calls used as `if` conditions.
    pub fn tests(&self) -> &[String] {
        &self.tests
    }

    pub fn body(&mut self) -> Block {
        self.block(0)
    }

    fn block(&mut self, depth: usize) -> Block {
        let len = 1 + self.rng.below(3) as usize;
        Block::new((0..len).map(|_| self.stmt(depth)).collect())
    }

    fn plain_block(&mut self) -> Block {
        let len = 1 + self.rng.below(2) as usize;
        Block::new((0..len).map(|_| self.call_stmt()).collect())
    }

    fn fresh_call(&mut self) -> Expr {
        let name = format!("c{}", self.calls.len());
        self.calls.push(name.clone());
        Expr::call(name, vec![])
    }

    fn call_stmt(&mut self) -> Stmt {
        Stmt::expr(self.fresh_call())
    }

    fn stmt(&mut self, depth: usize) -> Stmt {
        let choices = if depth >= self.max_depth { 3 } else { 7 };
        match self.rng.below(choices) {
            0 => self.call_stmt(),
            1 => Stmt::yield_value(Some(Expr::Int(self.calls.len() as i64))),
            2 => {
                let name = format!("v{}", self.locals);
                self.locals += 1;
                let init = self.fresh_call();
                Stmt::local(name, TargetType::Int, Some(init))
            }
            3 => Stmt::try_stmt(
                self.block(depth + 1),
                Some(self.block(depth + 1)),
                None,
            ),
            4 => {
                let body = self.block(depth + 1);
                let catch = if self.rng.below(2) == 0 {
                    Some(self.block(depth + 1))
                } else {
                    None
                };
                Stmt::try_stmt(body, catch, Some(self.plain_block()))
            }
            5 => {
                let test = self.fresh_call();
                if let Expr::Call { callee, .. } = &test {
                    self.tests.push(callee.to_string());
                }
                let else_branch = if self.rng.below(2) == 0 {
                    Some(Stmt::new(StmtKind::Block(self.block(depth + 1))))
                } else {
                    None
                };
                Stmt::if_else(
                    test,
                    Stmt::new(StmtKind::Block(self.block(depth + 1))),
                    else_branch,
                )
            }
            _ => Stmt::new(StmtKind::Block(self.block(depth + 1))),
        }
    }
}
