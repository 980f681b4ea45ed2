//! The host-facing handle: load a program, drive it step by step, inspect
//! the context between steps.
//!
//! [`Evaluator::resume`] runs until the next suspension point. Strict runs
//! suspend before every node and every application; lazy runs suspend
//! before forcing a pending deferred value and before every application.
//! [`Runner`] drives an evaluator to completion, optionally stopping after
//! a number of suspensions.

use rustc_hash::FxHashSet;

use sable_ir::NodeId;

use crate::context::Context;
use crate::errors::RuntimeError;
use crate::machine::Machine;
use crate::strategy::{Lazy, Strict, StrategyKind};
use crate::thunk::Thunk;
use crate::value::Value;

/// Why a run stopped before completing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SuspendReason {
    /// An ordinary suspension point of the strategy.
    Step,
    /// The visit hook asked to pause.
    Breakpoint,
}

/// Result of one call to [`Evaluator::resume`].
#[derive(Clone, Debug, PartialEq)]
pub enum Resumption {
    Complete(Value),
    Suspended {
        /// Node being evaluated, if any.
        node: Option<NodeId>,
        reason: SuspendReason,
    },
}

/// Answer of a [`VisitHook`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Pause before this node. Resuming evaluates it without asking again.
    Suspend,
}

/// Called before each node is evaluated.
pub trait VisitHook {
    fn visit(&mut self, ctx: &Context, node: NodeId) -> Visit;
}

/// A [`VisitHook`] that pauses at chosen nodes.
#[derive(Clone, Debug, Default)]
pub struct Breakpoints {
    nodes: FxHashSet<NodeId>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: NodeId) {
        self.nodes.insert(node);
    }

    pub fn remove(&mut self, node: NodeId) -> bool {
        self.nodes.remove(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}

impl VisitHook for Breakpoints {
    fn visit(&mut self, _ctx: &Context, node: NodeId) -> Visit {
        if self.contains(node) {
            tracing::debug!(node = node.raw(), "breakpoint");
            Visit::Suspend
        } else {
            Visit::Continue
        }
    }
}

/// The machine for the strategy chosen at construction.
enum Engine {
    Strict(Machine<Strict>),
    Lazy(Machine<Lazy>),
}

/// Forward a call to whichever machine the engine holds.
macro_rules! with_machine {
    ($engine:expr, $m:ident => $body:expr) => {
        match $engine {
            Engine::Strict($m) => $body,
            Engine::Lazy($m) => $body,
        }
    };
}

/// A resumable evaluator over one [`Context`].
pub struct Evaluator {
    engine: Engine,
}

impl Evaluator {
    pub fn new(ctx: Context) -> Self {
        let engine = match ctx.strategy() {
            StrategyKind::Strict => Engine::Strict(Machine::new(ctx)),
            StrategyKind::Lazy => Engine::Lazy(Machine::new(ctx)),
        };
        Evaluator { engine }
    }

    pub fn context(&self) -> &Context {
        with_machine!(&self.engine, m => &m.ctx)
    }

    pub fn context_mut(&mut self) -> &mut Context {
        with_machine!(&mut self.engine, m => &mut m.ctx)
    }

    pub fn into_context(self) -> Context {
        with_machine!(self.engine, m => m.into_context())
    }

    pub fn strategy(&self) -> StrategyKind {
        self.context().strategy()
    }

    pub fn set_visit_hook(&mut self, hook: impl VisitHook + 'static) {
        with_machine!(&mut self.engine, m => m.set_hook(Some(Box::new(hook))));
    }

    pub fn clear_visit_hook(&mut self) {
        with_machine!(&mut self.engine, m => m.set_hook(None));
    }

    /// Start evaluating a program (or any node). An unfinished earlier run
    /// is abandoned.
    pub fn load_program(&mut self, node: NodeId) {
        with_machine!(&mut self.engine, m => m.load(node));
    }

    /// Run until the next suspension point or the end of the run.
    pub fn resume(&mut self) -> Result<Resumption, RuntimeError> {
        with_machine!(&mut self.engine, m => m.resume())
    }

    /// Resume until the run completes, ignoring suspension points.
    ///
    /// Breakpoints still pause the run; they are stepped over here.
    pub fn run_to_completion(&mut self) -> Result<Value, RuntimeError> {
        loop {
            if let Resumption::Complete(value) = self.resume()? {
                return Ok(value);
            }
        }
    }

    /// Load and run a program to completion.
    pub fn run_program(&mut self, program: NodeId) -> Result<Value, RuntimeError> {
        let span = tracing::debug_span!("run_program", program = program.raw());
        let _guard = span.enter();
        self.load_program(program);
        self.run_to_completion()
    }

    /// A deferred value of `node` over the current frame.
    pub fn evaluate(&self, node: NodeId) -> Thunk {
        with_machine!(&self.engine, m => m.defer(node))
    }

    /// Force `thunk` to a value now. A run in progress is set aside and
    /// continues afterwards, unless forcing fails, which abandons it.
    pub fn force(&mut self, thunk: &Thunk) -> Result<Value, RuntimeError> {
        if let Some(value) = thunk.value() {
            return Ok(value);
        }
        with_machine!(&mut self.engine, m => {
            let saved = m.save();
            m.load_force(thunk.clone());
            let result = loop {
                match m.resume() {
                    Ok(Resumption::Complete(value)) => break Ok(value),
                    Ok(Resumption::Suspended { .. }) => {}
                    Err(err) => break Err(err),
                }
            };
            m.restore(saved, result.is_err());
            result
        })
    }

    /// Number of pending continuation frames.
    pub fn continuation_depth(&self) -> usize {
        with_machine!(&self.engine, m => m.continuation_depth())
    }
}

/// Why [`Runner::run`] returned.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Finished(Value),
    /// The step limit ran out; the run can be resumed.
    StepLimitReached { steps: u64 },
    /// A visit hook paused the run.
    Paused { node: Option<NodeId>, steps: u64 },
}

/// Drives an [`Evaluator`], counting suspension points as steps.
#[derive(Copy, Clone, Debug, Default)]
pub struct Runner {
    step_limit: Option<u64>,
}

impl Runner {
    /// A runner without a step limit.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    #[tracing::instrument(level = "debug", skip_all, fields(limit = ?self.step_limit))]
    pub fn run(&self, evaluator: &mut Evaluator) -> Result<RunOutcome, RuntimeError> {
        let mut steps: u64 = 0;
        loop {
            match evaluator.resume()? {
                Resumption::Complete(value) => return Ok(RunOutcome::Finished(value)),
                Resumption::Suspended {
                    reason: SuspendReason::Step,
                    ..
                } => {
                    steps += 1;
                    if self.step_limit.is_some_and(|limit| steps >= limit) {
                        tracing::debug!(steps, "step limit reached");
                        return Ok(RunOutcome::StepLimitReached { steps });
                    }
                }
                Resumption::Suspended {
                    node,
                    reason: SuspendReason::Breakpoint,
                } => return Ok(RunOutcome::Paused { node, steps }),
            }
        }
    }
}

/// Evaluate `program` in a fresh evaluator over `ctx`.
///
/// Returns the value (deep-forced) and the context, so callers can look
/// at the frames, errors and counters afterwards.
pub fn run_program(ctx: Context, program: NodeId) -> (Result<Value, RuntimeError>, Context) {
    let mut evaluator = Evaluator::new(ctx);
    let result = evaluator.run_program(program);
    (result, evaluator.into_context())
}
