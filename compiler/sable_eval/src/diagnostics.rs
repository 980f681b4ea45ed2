//! Diagnostic infrastructure for the evaluator.
//!
//! This module provides:
//! - `CallStack`: closure call frames with the call-depth limit
//! - `Backtrace`: a snapshot of the call stack attached to runtime errors
//! - `EvalCounters`: optional performance counters for `--profile`

use std::fmt;

use sable_ir::{Name, Span, StringInterner};

use crate::errors::{stack_overflow, RuntimeError};

/// A single frame in the live call stack.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Interned function name; `Name::EMPTY` for anonymous functions.
    pub name: Name,
    /// Source location of the call site.
    pub call_site: Option<Span>,
}

/// Live call stack of closure applications.
///
/// A tail call replaces the top frame instead of pushing, so the depth
/// tracks real nesting, not the number of calls made.
#[derive(Clone, Debug)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    max_depth: Option<usize>,
}

impl CallStack {
    /// `max_depth` is `None` for unlimited.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Push a call frame, checking the depth limit.
    ///
    /// The frame is NOT pushed on overflow.
    pub fn push(&mut self, frame: CallFrame) -> Result<(), RuntimeError> {
        if let Some(max) = self.max_depth {
            if self.frames.len() >= max {
                return Err(stack_overflow(max));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) {
        debug_assert!(
            !self.frames.is_empty(),
            "CallStack::pop() called on empty stack"
        );
        self.frames.pop();
    }

    /// Replace the innermost frame (tail call).
    pub fn replace_top(&mut self, frame: CallFrame) {
        match self.frames.last_mut() {
            Some(top) => *top = frame,
            None => self.frames.push(frame),
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Snapshot the stack, most recent call first.
    pub fn capture(&self, interner: &StringInterner) -> Backtrace {
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|f| BacktraceFrame {
                name: match interner.lookup(f.name) {
                    "" => "anonymous".to_owned(),
                    name => name.to_owned(),
                },
                span: f.call_site,
            })
            .collect();
        Backtrace { frames }
    }

    /// Attach a backtrace from this call stack to an error.
    ///
    /// Errors that already carry a backtrace keep it.
    pub fn attach_backtrace(&self, err: RuntimeError, interner: &StringInterner) -> RuntimeError {
        if self.frames.is_empty() || err.backtrace.is_some() {
            return err;
        }
        err.with_backtrace(self.capture(interner))
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new(None)
    }
}

/// One frame of a captured backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    pub name: String,
    pub span: Option<Span>,
}

/// Call stack captured at an error site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Backtrace {
    frames: Vec<BacktraceFrame>,
}

impl Backtrace {
    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "\n  {i}: {}", frame.name)?;
            if let Some(span) = frame.span {
                write!(f, " at {span}")?;
            }
        }
        Ok(())
    }
}

/// Optional performance counters for `--profile` instrumentation.
///
/// Stored as `Option<EvalCounters>` on the context; when `None`, nothing
/// is counted.
#[derive(Clone, Debug, Default)]
pub struct EvalCounters {
    /// Machine transitions.
    pub steps: u64,
    pub nodes_evaluated: u64,
    pub function_calls: u64,
    pub tail_calls: u64,
    pub native_calls: u64,
    pub thunks_forced: u64,
}

impl EvalCounters {
    #[inline]
    pub fn count_step(&mut self) {
        self.steps = self.steps.wrapping_add(1);
    }

    #[inline]
    pub fn count_node(&mut self) {
        self.nodes_evaluated = self.nodes_evaluated.wrapping_add(1);
    }

    #[inline]
    pub fn count_function_call(&mut self) {
        self.function_calls = self.function_calls.wrapping_add(1);
    }

    #[inline]
    pub fn count_tail_call(&mut self) {
        self.tail_calls = self.tail_calls.wrapping_add(1);
    }

    #[inline]
    pub fn count_native_call(&mut self) {
        self.native_calls = self.native_calls.wrapping_add(1);
    }

    #[inline]
    pub fn count_thunk_forced(&mut self) {
        self.thunks_forced = self.thunks_forced.wrapping_add(1);
    }

    /// Format a summary report.
    pub fn report(&self) -> String {
        format!(
            "Evaluation profile:\n  \
             Steps:             {}\n  \
             Nodes evaluated:   {}\n  \
             Function calls:    {}\n  \
             Tail calls:        {}\n  \
             Native calls:      {}\n  \
             Thunks forced:     {}",
            self.steps,
            self.nodes_evaluated,
            self.function_calls,
            self.tail_calls,
            self.native_calls,
            self.thunks_forced,
        )
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "Tests use expect for brevity")]
mod tests;
