//! The call protocol.
//!
//! Applying a closure checks arity, binds the parameters in a fresh frame
//! whose parent is the closure's frame, and runs the body under a
//! `CallBody` frame. A call in tail position does not apply at all: it
//! travels to the enclosing `CallBody` as a tail-call outcome, which swaps
//! the call frame for the callee's and re-enters the body. That loop is
//! the trampoline; it keeps frame and continuation depth constant across
//! tail calls.

use std::rc::Rc;

use sable_ir::{render_snippet, FunctionBody, NodeId, NodeKind};

use super::{Application, Control, Kont, Machine, Outcome, PendingCall, TailCall};
use crate::diagnostics::CallFrame;
use crate::environment::{Bound, Env, Mutability};
use crate::errors::{calling_non_function, exception, invalid_number_of_arguments, RuntimeError};
use crate::function::{Arity, Closure, NativeBody, NativeCx, NativeError, NativeFunction, NativeReturn};
use crate::strategy::Strategy;
use crate::thunk::Thunk;
use crate::value::Value;

impl<S: Strategy> Machine<S> {
    /// Evaluate the next strict argument, or apply once all are in.
    pub(crate) fn next_argument(&mut self, call: PendingCall, values: Vec<Thunk>) {
        let next = self.arena.list(call.args).get(values.len()).copied();
        match next {
            Some(arg) => {
                self.kont.push(Kont::Arguments { call, values });
                self.eval_next(arg, false);
            }
            None => self.apply_collected(call, values),
        }
    }

    pub(crate) fn apply_collected(&mut self, call: PendingCall, args: Vec<Thunk>) {
        self.control = Control::Apply(Application {
            callee: call.callee,
            args,
            site: call.site,
            tail: call.tail,
        });
    }

    pub(super) fn apply(&mut self, application: Application) {
        let Application {
            callee,
            args,
            site,
            tail,
        } = application;
        match callee {
            Value::Closure(closure) if tail => {
                self.control = Control::Deliver(Outcome::TailCall(TailCall {
                    closure,
                    args,
                    site,
                }));
            }
            Value::Closure(closure) => self.call_closure(closure, args, site),
            Value::Native(native) => self.call_native(native, args, site),
            other => {
                let snippet = render_snippet(&self.arena, self.ctx.interner(), site);
                self.fail(calling_non_function(&other, snippet), Some(site));
            }
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, args: Vec<Thunk>, site: NodeId) {
        let env = match self.bind_call(&closure, args) {
            Ok(env) => env,
            Err(err) => return self.fail(err, Some(site)),
        };
        let frame = CallFrame {
            name: closure.name.unwrap_or_default(),
            call_site: Some(self.arena.span(site)),
        };
        if let Err(err) = self.ctx.call_stack.push(frame) {
            return self.fail(err, Some(site));
        }
        if let Some(counters) = self.ctx.counters.as_mut() {
            counters.count_function_call();
        }
        self.ctx.environments.push(env);
        self.kont.push(Kont::CallBody);
        self.enter_body(&closure);
    }

    /// Check arity and build the call frame. Nothing is bound on failure.
    fn bind_call(&mut self, closure: &Closure, args: Vec<Thunk>) -> Result<Env, RuntimeError> {
        if args.len() != closure.params.len() {
            return Err(invalid_number_of_arguments(
                closure.display_name(),
                Arity::Exact(closure.params.len()),
                args.len(),
            ));
        }
        let env = self
            .ctx
            .environments
            .create(closure.display_name(), &closure.env);
        {
            let mut scope = env.borrow_mut();
            for (&param, arg) in closure.params.iter().zip(args) {
                let bound = match arg.value() {
                    Some(value) => Bound::Value(value),
                    None => Bound::Deferred(arg),
                };
                scope.define(param, bound, Mutability::Mutable);
            }
        }
        Ok(env)
    }

    /// Run a closure body in the (already pushed) call frame.
    fn enter_body(&mut self, closure: &Closure) {
        match closure.body {
            FunctionBody::Block(block) => match *self.arena.kind(block) {
                NodeKind::Block { body } => self.run_sequence(body),
                // Not a block: evaluate it like an arrow body.
                _ => {
                    self.kont.push(Kont::WrapReturn);
                    self.eval_next(block, true);
                }
            },
            FunctionBody::Expr(expr) => {
                self.kont.push(Kont::WrapReturn);
                self.eval_next(expr, true);
            }
        }
    }

    /// An outcome reached the `CallBody` frame.
    pub(super) fn return_from_call(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Value(_) => self.leave_call(Value::Undefined),
            Outcome::Return(value) => self.leave_call(value),
            Outcome::TailCall(call) => self.tail_call(call),
        }
    }

    fn leave_call(&mut self, value: Value) {
        self.ctx.environments.pop();
        self.ctx.call_stack.pop();
        self.deliver_value(value);
    }

    /// Replace the current call with `call` and run its body.
    fn tail_call(&mut self, call: TailCall) {
        let TailCall {
            closure,
            args,
            site,
        } = call;
        let env = match self.bind_call(&closure, args) {
            Ok(env) => env,
            Err(err) => return self.fail(err, Some(site)),
        };
        tracing::trace!(callee = closure.display_name(), "tail call");
        if let Some(counters) = self.ctx.counters.as_mut() {
            counters.count_tail_call();
        }
        self.ctx.environments.replace_current(env);
        self.ctx.call_stack.replace_top(CallFrame {
            name: closure.name.unwrap_or_default(),
            call_site: Some(self.arena.span(site)),
        });
        self.kont.push(Kont::CallBody);
        self.enter_body(&closure);
    }

    fn call_native(&mut self, native: Rc<NativeFunction>, args: Vec<Thunk>, site: NodeId) {
        if !native.arity().accepts(args.len()) {
            let err = invalid_number_of_arguments(native.name(), native.arity(), args.len());
            return self.fail(err, Some(site));
        }
        if let NativeBody::Deferred(body) = native.body() {
            let result = body(&self.native_cx(), &args);
            self.native_returned(&native, result, site);
            return;
        }
        let values = Vec::with_capacity(args.len());
        self.next_native_argument(native, args, values, site);
    }

    /// Force the next argument of a value-taking native, or call it once
    /// all are forced.
    pub(super) fn next_native_argument(
        &mut self,
        native: Rc<NativeFunction>,
        args: Vec<Thunk>,
        mut values: Vec<Value>,
        site: NodeId,
    ) {
        while let Some(arg) = args.get(values.len()) {
            match arg.value() {
                Some(value) => values.push(value),
                None => {
                    let arg = arg.clone();
                    self.kont.push(Kont::NativeArguments {
                        native,
                        args,
                        values,
                        site,
                    });
                    self.control = Control::Force(arg);
                    return;
                }
            }
        }
        let result = match native.body() {
            NativeBody::Forced(body) => body(&self.native_cx(), &values),
            NativeBody::Deferred(body) => body(&self.native_cx(), &args),
        };
        self.native_returned(&native, result, site);
    }

    fn native_cx(&self) -> NativeCx<'_> {
        NativeCx {
            print: self.ctx.print_handler(),
            chapter: self.ctx.chapter(),
        }
    }

    fn native_returned(
        &mut self,
        native: &NativeFunction,
        result: Result<NativeReturn, NativeError>,
        site: NodeId,
    ) {
        if let Some(counters) = self.ctx.counters.as_mut() {
            counters.count_native_call();
        }
        match result {
            Ok(NativeReturn::Value(value)) => self.deliver_value(value),
            Ok(NativeReturn::Force(thunk)) => self.control = Control::Force(thunk),
            Err(NativeError::Host(message)) => {
                self.fail(exception(native.name(), message), Some(site));
            }
            // Already classified: located at the call site if it has no
            // location of its own, never rewrapped.
            Err(NativeError::Runtime(err)) => self.fail(err, Some(site)),
        }
    }
}
