//! The explicit-continuation evaluation machine.
//!
//! Evaluation never recurses on the native stack. The machine holds a
//! single [`Control`] (what to do next) and a stack of [`Kont`] frames
//! (where results go). Every node kind is a small state machine: it either
//! delivers a value, or pushes a frame and evaluates a child. `return` and
//! tail calls travel as ordinary [`Outcome`]s through the frames until the
//! function body that owns them unwraps them, which is what lets a tail
//! call replace the call environment in place.
//!
//! Because the whole state lives in `control` and `kont`, a run can stop
//! between any two steps and pick up later. [`Machine::resume`] runs until
//! the strategy asks to suspend, a visit hook asks to pause, the run
//! completes, or an error is recorded.

mod apply;
mod dispatch;
mod force;
mod hoist;

use rustc_hash::FxHashSet;
use std::marker::PhantomData;
use std::rc::Rc;

use sable_ir::{BinaryOp, LogicalOp, Name, NodeId, NodeRange, SharedArena, UnaryOp};

use crate::context::Context;
use crate::driver::{Resumption, SuspendReason, Visit, VisitHook};
use crate::environment::Mutability;
use crate::errors::RuntimeError;
use crate::function::{Closure, NativeFunction};
use crate::strategy::Strategy;
use crate::thunk::{Producer, Thunk};
use crate::value::{Pair, Value};

/// What the machine does next.
pub(crate) enum Control {
    /// Evaluate a node. `tail` marks tail position inside a function body.
    Eval { node: NodeId, tail: bool },
    /// Force a thunk to a value.
    Force(Thunk),
    /// Apply a callee to arguments.
    Apply(Application),
    /// Hand an outcome to the top continuation frame.
    Deliver(Outcome),
}

pub(crate) struct Application {
    pub(crate) callee: Value,
    pub(crate) args: Vec<Thunk>,
    /// The call expression.
    pub(crate) site: NodeId,
    pub(crate) tail: bool,
}

/// Result of evaluating a node.
pub(crate) enum Outcome {
    Value(Value),
    /// A `return` on its way to the enclosing function body.
    Return(Value),
    /// A call in tail position on its way to the enclosing function body.
    TailCall(TailCall),
}

pub(crate) struct TailCall {
    pub(crate) closure: Rc<Closure>,
    pub(crate) args: Vec<Thunk>,
    pub(crate) site: NodeId,
}

/// A declaration waiting for its initializer.
#[derive(Copy, Clone)]
pub(crate) struct Declaration {
    pub(crate) node: NodeId,
    pub(crate) name: Name,
    pub(crate) init: NodeId,
    pub(crate) mutability: Mutability,
}

/// A call whose callee is known and whose arguments are not yet collected.
pub(crate) struct PendingCall {
    pub(crate) callee: Value,
    pub(crate) args: NodeRange,
    pub(crate) site: NodeId,
    pub(crate) tail: bool,
}

/// Continuation frames.
pub(crate) enum Kont {
    /// Pop the node-visitation stack.
    Leave,
    /// Run the remaining statements of a program, block or body.
    Sequence { body: NodeRange, next: usize },
    /// Pop a block frame.
    PopEnvironment,
    Declare(Declaration),
    Assign { node: NodeId, name: Name },
    /// Turn the value of a `return` argument or arrow body into a return.
    WrapReturn,
    Branch {
        node: NodeId,
        construct: &'static str,
        consequent: NodeId,
        alternate: Option<NodeId>,
        tail: bool,
    },
    Logical {
        node: NodeId,
        op: LogicalOp,
        right: NodeId,
        tail: bool,
    },
    Unary { node: NodeId, op: UnaryOp },
    BinaryLeft { node: NodeId, op: BinaryOp, right: NodeId },
    BinaryRight { node: NodeId, op: BinaryOp, left: Value },
    Callee { site: NodeId, args: NodeRange, tail: bool },
    /// Strict argument collection.
    Arguments {
        call: PendingCall,
        values: Vec<Thunk>,
    },
    /// Forcing the arguments of a native that takes values.
    NativeArguments {
        native: Rc<NativeFunction>,
        args: Vec<Thunk>,
        values: Vec<Value>,
        site: NodeId,
    },
    /// The body of a closure call; unwraps returns and runs tail calls.
    CallBody,
    /// Store the value of a forced thunk.
    Memoize {
        thunk: Thunk,
        producer: Producer,
        /// Frame-stack depth before the producer's frame was pushed.
        depth: usize,
    },
    /// Deep-force the final value of a run.
    Unravel(Unravel),
}

pub(crate) struct Unravel {
    root: Option<Value>,
    pending: Vec<Thunk>,
    seen: FxHashSet<*const Pair>,
}

impl Unravel {
    pub(crate) fn new() -> Self {
        Unravel {
            root: None,
            pending: Vec::new(),
            seen: FxHashSet::default(),
        }
    }
}

enum Status {
    /// Nothing loaded.
    Idle,
    Running,
    Complete(Value),
    Failed(RuntimeError),
}

/// State saved while a host forces a thunk between runs.
pub(crate) struct Saved {
    control: Control,
    kont: Vec<Kont>,
    status: Status,
    cleared: Option<NodeId>,
}

/// The evaluation machine, instantiated once per strategy.
pub(crate) struct Machine<S> {
    pub(crate) ctx: Context,
    arena: SharedArena,
    control: Control,
    kont: Vec<Kont>,
    status: Status,
    hook: Option<Box<dyn VisitHook>>,
    /// Node whose visit already asked to pause; skipped once on resume.
    cleared: Option<NodeId>,
    strategy: PhantomData<S>,
}

impl<S: Strategy> Machine<S> {
    pub(crate) fn new(ctx: Context) -> Self {
        Machine {
            arena: ctx.arena().clone(),
            ctx,
            control: Control::Deliver(Outcome::Value(Value::Undefined)),
            kont: Vec::new(),
            status: Status::Idle,
            hook: None,
            cleared: None,
            strategy: PhantomData,
        }
    }

    /// Give up the context. An unfinished run is abandoned first.
    pub(crate) fn into_context(mut self) -> Context {
        self.reset();
        self.ctx
    }

    pub(crate) fn set_hook(&mut self, hook: Option<Box<dyn VisitHook>>) {
        self.hook = hook;
    }

    pub(crate) fn continuation_depth(&self) -> usize {
        self.kont.len()
    }

    /// Start evaluating `node`, deep-forcing its value at the end.
    pub(crate) fn load(&mut self, node: NodeId) {
        self.reset();
        self.kont.push(Kont::Unravel(Unravel::new()));
        self.control = Control::Eval { node, tail: false };
        self.status = Status::Running;
    }

    /// Start forcing `thunk` (no deep forcing).
    pub(crate) fn load_force(&mut self, thunk: Thunk) {
        self.reset();
        self.control = Control::Force(thunk);
        self.status = Status::Running;
    }

    /// Drop any in-flight run. Frames it pushed above the outer frames go
    /// too.
    fn reset(&mut self) {
        if matches!(self.status, Status::Running) {
            self.abandon_thunks();
            self.ctx.environments.truncate(self.ctx.outer_environments);
            self.ctx.nodes.clear();
            self.ctx.call_stack.clear();
        }
        self.kont.clear();
        self.cleared = None;
        self.status = Status::Idle;
    }

    pub(crate) fn save(&mut self) -> Saved {
        Saved {
            control: std::mem::replace(
                &mut self.control,
                Control::Deliver(Outcome::Value(Value::Undefined)),
            ),
            kont: std::mem::take(&mut self.kont),
            status: std::mem::replace(&mut self.status, Status::Idle),
            cleared: self.cleared.take(),
        }
    }

    /// Put back a saved run. When the work done in between failed, the
    /// frames the saved run relied on are gone, so it is dropped instead.
    pub(crate) fn restore(&mut self, saved: Saved, failed: bool) {
        self.kont = saved.kont;
        if failed && matches!(saved.status, Status::Running) {
            self.abandon_thunks();
            self.status = Status::Idle;
            self.cleared = None;
            return;
        }
        self.control = saved.control;
        self.status = saved.status;
        self.cleared = saved.cleared;
    }

    /// Run until the next suspension point, completion or failure.
    pub(crate) fn resume(&mut self) -> Result<Resumption, RuntimeError> {
        let mut first = true;
        loop {
            match &self.status {
                Status::Running => {}
                Status::Complete(value) => return Ok(Resumption::Complete(value.clone())),
                Status::Failed(err) => return Err(err.clone()),
                Status::Idle => return Ok(Resumption::Complete(Value::Undefined)),
            }
            if !first && S::suspends_before(&self.control) {
                return Ok(Resumption::Suspended {
                    node: self.ctx.nodes.last().copied(),
                    reason: SuspendReason::Step,
                });
            }
            first = false;
            if let Control::Eval { node, .. } = self.control {
                if self.visit(node) == Visit::Suspend {
                    return Ok(Resumption::Suspended {
                        node: Some(node),
                        reason: SuspendReason::Breakpoint,
                    });
                }
            }
            self.step();
        }
    }

    fn visit(&mut self, node: NodeId) -> Visit {
        if self.cleared.take() == Some(node) {
            return Visit::Continue;
        }
        let Some(hook) = self.hook.as_mut() else {
            return Visit::Continue;
        };
        let visit = hook.visit(&self.ctx, node);
        if visit == Visit::Suspend {
            self.cleared = Some(node);
        }
        visit
    }

    fn step(&mut self) {
        if let Some(counters) = self.ctx.counters.as_mut() {
            counters.count_step();
        }
        let control = std::mem::replace(
            &mut self.control,
            Control::Deliver(Outcome::Value(Value::Undefined)),
        );
        match control {
            Control::Eval { node, tail } => self.eval(node, tail),
            Control::Force(thunk) => self.force(thunk),
            Control::Apply(application) => self.apply(application),
            Control::Deliver(outcome) => self.deliver(outcome),
        }
    }

    #[inline]
    pub(crate) fn deliver_value(&mut self, value: Value) {
        self.control = Control::Deliver(Outcome::Value(value));
    }

    #[inline]
    pub(crate) fn eval_next(&mut self, node: NodeId, tail: bool) {
        self.control = Control::Eval { node, tail };
    }

    /// Hand `outcome` to the top frame.
    fn deliver(&mut self, outcome: Outcome) {
        let Some(frame) = self.kont.pop() else {
            self.finish(outcome);
            return;
        };
        match frame {
            Kont::Leave => {
                self.ctx.nodes.pop();
                self.control = Control::Deliver(outcome);
            }
            Kont::PopEnvironment => {
                self.ctx.environments.pop();
                self.control = Control::Deliver(outcome);
            }
            Kont::WrapReturn => {
                self.control = Control::Deliver(match outcome {
                    Outcome::Value(value) => Outcome::Return(value),
                    other => other,
                });
            }
            Kont::CallBody => self.return_from_call(outcome),
            frame => match outcome {
                Outcome::Value(value) => self.resume_frame(frame, value),
                // Only function bodies stop returns and tail calls; any
                // other frame is discarded on the way out.
                other => {
                    if let Kont::Memoize { thunk, producer, depth } = frame {
                        self.ctx.environments.truncate(depth);
                        thunk.abandon(producer);
                    }
                    self.control = Control::Deliver(other);
                }
            },
        }
    }

    /// Continue `frame` with the value just produced.
    fn resume_frame(&mut self, frame: Kont, value: Value) {
        match frame {
            Kont::Sequence { body, next } => self.continue_sequence(body, next, value),
            Kont::Declare(decl) => self.declare_value(decl, value),
            Kont::Assign { node, name } => self.assign_value(node, name, value),
            Kont::Branch {
                node,
                construct,
                consequent,
                alternate,
                tail,
            } => self.branch(node, construct, consequent, alternate, tail, &value),
            Kont::Logical {
                node,
                op,
                right,
                tail,
            } => self.logical(node, op, right, tail, &value),
            Kont::Unary { node, op } => self.unary(node, op, &value),
            Kont::BinaryLeft { node, op, right } => {
                self.kont.push(Kont::BinaryRight {
                    node,
                    op,
                    left: value,
                });
                self.eval_next(right, false);
            }
            Kont::BinaryRight { node, op, left } => self.binary(node, op, &left, &value),
            Kont::Callee { site, args, tail } => S::collect_arguments(
                self,
                PendingCall {
                    callee: value,
                    args,
                    site,
                    tail,
                },
            ),
            Kont::Arguments { call, mut values } => {
                values.push(Thunk::ready(value));
                self.next_argument(call, values);
            }
            Kont::NativeArguments {
                native,
                args,
                mut values,
                site,
            } => {
                values.push(value);
                self.next_native_argument(native, args, values, site);
            }
            Kont::Memoize {
                thunk,
                producer: _,
                depth,
            } => {
                self.ctx.environments.truncate(depth);
                thunk.complete(value.clone());
                tracing::trace!("memoized thunk");
                self.deliver_value(value);
            }
            Kont::Unravel(unravel) => self.unravel(unravel, value),
            Kont::Leave | Kont::PopEnvironment | Kont::WrapReturn | Kont::CallBody => {
                // handled in `deliver`
                self.deliver_value(value);
            }
        }
    }

    /// The continuation is empty: the run is over.
    fn finish(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Value(value) | Outcome::Return(value) => {
                tracing::debug!(value = %value, "run complete");
                self.status = Status::Complete(value);
            }
            // A tail call with no enclosing body: make it an ordinary call.
            Outcome::TailCall(call) => {
                self.control = Control::Apply(Application {
                    callee: Value::Closure(call.closure),
                    args: call.args,
                    site: call.site,
                    tail: false,
                });
            }
        }
    }

    /// Record `err` and stop the run.
    ///
    /// The error is located at `node` (or the innermost node being
    /// evaluated) unless it already carries a location. Frames above the
    /// outer frames are dropped and thunks being forced go back to pending.
    pub(crate) fn fail(&mut self, mut err: RuntimeError, node: Option<NodeId>) {
        if err.node.is_none() {
            if let Some(node) = node.or_else(|| self.ctx.nodes.last().copied()) {
                err = err.at(node, self.arena.span(node));
            }
        }
        err = self
            .ctx
            .call_stack
            .attach_backtrace(err, self.ctx.interner());
        self.abandon_thunks();
        self.kont.clear();
        self.ctx.environments.truncate(self.ctx.outer_environments);
        self.ctx.nodes.clear();
        self.ctx.call_stack.clear();
        if err.is_fatal() {
            tracing::warn!(error = %err, "call depth limit reached");
        } else {
            tracing::debug!(error = %err, "runtime error");
        }
        self.ctx.errors.push(err.clone());
        self.status = Status::Failed(err);
    }

    /// Return every thunk under evaluation to pending.
    fn abandon_thunks(&mut self) {
        for frame in self.kont.drain(..).rev() {
            if let Kont::Memoize {
                thunk, producer, ..
            } = frame
            {
                thunk.abandon(producer);
            }
        }
    }
}
