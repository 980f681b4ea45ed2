//! Strict and lazy evaluation strategies.
//!
//! Both strategies run the same node-kind rules in the same machine. They
//! differ only in when a sub-expression's value is produced: strict
//! evaluates declaration initializers and call arguments on the spot, lazy
//! binds them as deferred values that are forced when something needs
//! them. Each strategy also picks its own suspension points.

use std::fmt;

use crate::environment::Bound;
use crate::machine::{Control, Declaration, Kont, Machine, PendingCall};
use crate::thunk::Thunk;

/// Evaluation strategy of a run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Every sub-expression is evaluated as soon as it is reached.
    #[default]
    Strict,
    /// Arguments and declarations are deferred until demanded.
    Lazy,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::Strict => "strict",
            StrategyKind::Lazy => "lazy",
        })
    }
}

/// The strategy-specific half of the node-kind rules.
pub(crate) trait Strategy: Sized + 'static {
    const KIND: StrategyKind;

    /// Bind a `const`/`let` declaration to its initializer.
    fn bind_declaration(m: &mut Machine<Self>, decl: Declaration);

    /// Collect the arguments of a call whose callee is known, then apply.
    fn collect_arguments(m: &mut Machine<Self>, call: PendingCall);

    /// Whether a run pauses before executing `control`.
    fn suspends_before(control: &Control) -> bool;
}

/// Eager evaluation.
pub(crate) struct Strict;

/// Deferred evaluation with memoization.
pub(crate) struct Lazy;

impl Strategy for Strict {
    const KIND: StrategyKind = StrategyKind::Strict;

    fn bind_declaration(m: &mut Machine<Self>, decl: Declaration) {
        m.push_frame(Kont::Declare(decl));
        m.eval_next(decl.init, false);
    }

    fn collect_arguments(m: &mut Machine<Self>, call: PendingCall) {
        let values = Vec::with_capacity(call.args.len());
        m.next_argument(call, values);
    }

    fn suspends_before(control: &Control) -> bool {
        matches!(control, Control::Eval { .. } | Control::Apply(_))
    }
}

impl Strategy for Lazy {
    const KIND: StrategyKind = StrategyKind::Lazy;

    fn bind_declaration(m: &mut Machine<Self>, decl: Declaration) {
        let thunk = m.defer(decl.init);
        m.declare_bound(decl, Bound::Deferred(thunk));
    }

    fn collect_arguments(m: &mut Machine<Self>, call: PendingCall) {
        let args: Vec<Thunk> = m
            .arena()
            .list(call.args)
            .iter()
            .map(|&arg| m.defer(arg))
            .collect();
        m.apply_collected(call, args);
    }

    fn suspends_before(control: &Control) -> bool {
        match control {
            Control::Force(thunk) => !thunk.is_evaluated(),
            Control::Apply(_) => true,
            Control::Eval { .. } | Control::Deliver(_) => false,
        }
    }
}
