//! Run-scoped evaluation state and its builder.
//!
//! A [`Context`] is created once per run (or once per REPL session) and is
//! exclusively owned by the evaluator driving it. It holds the frame stack,
//! the node-visitation stack, the call stack, the error list and the count
//! of outer frames that survive error recovery.

use std::rc::Rc;

use sable_ir::{Chapter, NodeId, SharedArena, SharedInterner};

use crate::diagnostics::{CallStack, EvalCounters};
use crate::environment::{Bound, Env, Environments, Mutability};
use crate::errors::RuntimeError;
use crate::function::NativeFunction;
use crate::prelude::install_prelude;
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::strategy::StrategyKind;
use crate::value::Value;

/// Default limit on nested (non-tail) closure calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100_000;

/// Evaluation state of one run.
pub struct Context {
    chapter: Chapter,
    strategy: StrategyKind,
    arena: SharedArena,
    interner: SharedInterner,
    pub(crate) environments: Environments,
    /// Frames kept when an error unwinds: the global frame plus one per
    /// program evaluated so far.
    pub(crate) outer_environments: usize,
    pub(crate) errors: Vec<RuntimeError>,
    /// Nodes currently being evaluated, innermost last.
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) call_stack: CallStack,
    print_handler: SharedPrintHandler,
    pub(crate) counters: Option<EvalCounters>,
}

impl Context {
    pub fn chapter(&self) -> Chapter {
        self.chapter
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Errors recorded so far, oldest first.
    pub fn errors(&self) -> &[RuntimeError] {
        &self.errors
    }

    /// Number of frames on the active frame stack.
    pub fn environment_depth(&self) -> usize {
        self.environments.depth()
    }

    pub fn outer_environments(&self) -> usize {
        self.outer_environments
    }

    pub fn current_environment(&self) -> &Env {
        self.environments.current()
    }

    pub fn global_environment(&self) -> &Env {
        self.environments.global()
    }

    /// The node-visitation stack, innermost last.
    pub fn node_stack(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print_handler
    }

    /// Counters, when the context was built with profiling on.
    pub fn counters(&self) -> Option<&EvalCounters> {
        self.counters.as_ref()
    }

    /// Install a constant in the global frame.
    pub fn define_symbol(&mut self, name: &str, value: Value) {
        let name = self.interner.intern(name);
        self.environments
            .global()
            .borrow_mut()
            .define(name, Bound::Value(value), Mutability::Immutable);
    }

    /// Install a native function as a constant in the global frame.
    pub fn define_native(&mut self, native: NativeFunction) {
        let name = native.name().to_owned();
        self.define_symbol(&name, Value::Native(Rc::new(native)));
    }
}

/// Builder for [`Context`].
///
/// ```ignore
/// let ctx = ContextBuilder::new(arena, interner)
///     .chapter(Chapter::TWO)
///     .strategy(StrategyKind::Lazy)
///     .print_handler(buffer_handler())
///     .build();
/// ```
pub struct ContextBuilder {
    arena: SharedArena,
    interner: SharedInterner,
    chapter: Chapter,
    strategy: StrategyKind,
    max_call_depth: Option<usize>,
    print_handler: Option<SharedPrintHandler>,
    prelude: bool,
    profile: bool,
}

impl ContextBuilder {
    pub fn new(arena: SharedArena, interner: SharedInterner) -> Self {
        ContextBuilder {
            arena,
            interner,
            chapter: Chapter::default(),
            strategy: StrategyKind::Strict,
            max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
            print_handler: None,
            prelude: true,
            profile: false,
        }
    }

    #[must_use]
    pub fn chapter(mut self, chapter: Chapter) -> Self {
        self.chapter = chapter;
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Limit on nested closure calls; `None` disables the limit.
    #[must_use]
    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Where `display` writes. Default is stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Whether to install the chapter's prelude. Default is on.
    #[must_use]
    pub fn prelude(mut self, install: bool) -> Self {
        self.prelude = install;
        self
    }

    /// Collect [`EvalCounters`].
    #[must_use]
    pub fn profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn build(self) -> Context {
        let mut ctx = Context {
            chapter: self.chapter,
            strategy: self.strategy,
            arena: self.arena,
            interner: self.interner,
            environments: Environments::new(),
            outer_environments: 1,
            errors: Vec::new(),
            nodes: Vec::new(),
            call_stack: CallStack::new(self.max_call_depth),
            print_handler: self.print_handler.unwrap_or_else(stdout_handler),
            counters: self.profile.then(EvalCounters::default),
        };
        if self.prelude {
            install_prelude(&mut ctx);
        }
        ctx
    }
}
