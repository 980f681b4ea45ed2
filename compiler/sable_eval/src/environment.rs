//! Environments: frames of bindings chained through parent links.
//!
//! Every program, block and call gets its own frame. Declarations are
//! hoisted into their frame as unassigned placeholders before the frame's
//! statements run, so a read before the declaration executes reports
//! "not yet assigned" instead of falling through to an outer binding.
//!
//! [`Environments`] owns the active frame stack of a run and tracks every
//! frame it created, so reference cycles between frames and the closures
//! stored in them are broken when the run is dropped.

#[cfg(test)]
#[expect(clippy::expect_used, reason = "Tests use expect for brevity")]
mod tests;

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use sable_ir::Name;

use crate::thunk::Thunk;
use crate::value::Value;

/// Whether a binding can be reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutability {
    /// `let` bindings and function parameters.
    Mutable,
    /// `const` bindings, function declarations and prelude names.
    Immutable,
}

impl Mutability {
    #[inline]
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Mutable)
    }
}

/// What a name is bound to: a value, or a deferred value that is forced on
/// first read.
#[derive(Clone, Debug)]
pub enum Bound {
    Value(Value),
    Deferred(Thunk),
}

impl Bound {
    /// A bound thunk that has already been forced reads as its value.
    pub fn evaluated(&self) -> Option<Value> {
        match self {
            Bound::Value(v) => Some(v.clone()),
            Bound::Deferred(thunk) => thunk.value(),
        }
    }
}

impl From<Value> for Bound {
    fn from(value: Value) -> Self {
        Bound::Value(value)
    }
}

/// Hoisted placeholder or assigned binding.
#[derive(Clone, Debug)]
enum BindingState {
    Unassigned,
    Assigned(Bound),
}

#[derive(Clone, Debug)]
struct Binding {
    state: BindingState,
    mutability: Mutability,
}

/// Error returned by [`Env::lookup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// No frame on the chain binds the name.
    Undefined,
    /// The nearest binding is still the hoisted placeholder.
    Unassigned,
}

/// Error returned by [`Env::assign`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignError {
    Immutable,
    Undefined,
    Unassigned,
}

/// The name is already declared in this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeclareError {
    /// Mutability of the existing binding.
    pub mutability: Mutability,
}

/// A single-threaded scope wrapper for reference-counted interior mutability.
///
/// All frame allocations go through [`LocalScope::new`]. `LocalScope<T>` is
/// NOT thread-safe; the evaluator runs single-threaded.
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    #[inline]
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Whether both handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether this is the only strong handle.
    #[inline]
    pub fn is_unique(&self) -> bool {
        Rc::strong_count(&self.0) == 1
    }

    pub fn downgrade(&self) -> WeakScope<T> {
        WeakScope(Rc::downgrade(&self.0))
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalScope").field(&self.0).finish()
    }
}

impl<T: Default> Default for LocalScope<T> {
    fn default() -> Self {
        LocalScope::new(T::default())
    }
}

impl<T> Deref for LocalScope<T> {
    type Target = RefCell<T>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Non-owning handle to a [`LocalScope`].
pub struct WeakScope<T>(Weak<RefCell<T>>);

impl<T> WeakScope<T> {
    pub fn upgrade(&self) -> Option<LocalScope<T>> {
        self.0.upgrade().map(LocalScope)
    }

    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// A frame of bindings.
pub struct Scope {
    /// Frame kind or function name, for tracing.
    label: Rc<str>,
    bindings: FxHashMap<Name, Binding>,
    parent: Option<Env>,
}

/// Shared handle to a frame. Closures and deferred values capture one.
pub type Env = LocalScope<Scope>;

impl Scope {
    /// A root frame with no parent.
    pub fn new(label: &str) -> Self {
        Scope {
            label: Rc::from(label),
            bindings: FxHashMap::default(),
            parent: None,
        }
    }

    pub fn with_parent(label: &str, parent: Env) -> Self {
        Scope {
            label: Rc::from(label),
            bindings: FxHashMap::default(),
            parent: Some(parent),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parent(&self) -> Option<&Env> {
        self.parent.as_ref()
    }

    /// Whether this frame (not its ancestors) binds `name`.
    pub fn contains(&self, name: Name) -> bool {
        self.bindings.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Add an unassigned placeholder for a declaration in this frame.
    pub fn hoist(&mut self, name: Name, mutability: Mutability) -> Result<(), DeclareError> {
        if let Some(existing) = self.bindings.get(&name) {
            return Err(DeclareError {
                mutability: existing.mutability,
            });
        }
        self.bindings.insert(
            name,
            Binding {
                state: BindingState::Unassigned,
                mutability,
            },
        );
        Ok(())
    }

    /// Fill a hoisted placeholder, or add the binding if none was hoisted.
    ///
    /// Fails when the name already holds a value in this frame.
    pub fn declare(
        &mut self,
        name: Name,
        bound: Bound,
        mutability: Mutability,
    ) -> Result<(), DeclareError> {
        match self.bindings.get_mut(&name) {
            Some(binding) => match binding.state {
                BindingState::Unassigned => {
                    binding.state = BindingState::Assigned(bound);
                    Ok(())
                }
                BindingState::Assigned(_) => Err(DeclareError {
                    mutability: binding.mutability,
                }),
            },
            None => {
                self.define(name, bound, mutability);
                Ok(())
            }
        }
    }

    /// Bind unconditionally (parameters, prelude).
    #[inline]
    pub fn define(&mut self, name: Name, bound: Bound, mutability: Mutability) {
        self.bindings.insert(
            name,
            Binding {
                state: BindingState::Assigned(bound),
                mutability,
            },
        );
    }

    /// Remove every binding, handing them to the caller to drop.
    fn take_bindings(&mut self) -> FxHashMap<Name, Binding> {
        std::mem::take(&mut self.bindings)
    }

    /// Move the bound values and the parent link into `out`.
    fn release_into(&mut self, out: &mut Vec<Released>) {
        for (_, binding) in self.bindings.drain() {
            match binding.state {
                BindingState::Assigned(Bound::Value(value)) => out.push(Released::Value(value)),
                BindingState::Assigned(Bound::Deferred(thunk)) => out.push(Released::Thunk(thunk)),
                BindingState::Unassigned => {}
            }
        }
        if let Some(parent) = self.parent.take() {
            out.push(Released::Env(parent));
        }
    }
}

impl Drop for Scope {
    // Frames linked through deferred values and closures would otherwise be
    // freed one nested drop per frame.
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.release_into(&mut pending);
        while let Some(handle) = pending.pop() {
            handle.release(&mut pending);
        }
    }
}

/// A handle let go of by a dropped frame.
///
/// If it was the last handle, whatever it owns is moved to the worklist
/// before it is dropped, so the drop itself never nests.
pub(crate) enum Released {
    Env(Env),
    Thunk(Thunk),
    Value(Value),
}

impl Released {
    fn release(self, out: &mut Vec<Released>) {
        match self {
            Released::Env(env) => {
                if env.is_unique() {
                    env.borrow_mut().release_into(out);
                }
            }
            Released::Thunk(thunk) => thunk.release_into(out),
            Released::Value(value) => value.release_into(out),
        }
    }
}

impl fmt::Debug for Scope {
    // Bindings can hold closures over this very frame; print names only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("label", &self.label)
            .field("bindings", &self.bindings.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Env {
    /// A new frame whose parent is `self`.
    pub fn child(&self, label: &str) -> Env {
        LocalScope::new(Scope::with_parent(label, self.clone()))
    }

    /// Resolve `name` through the parent chain.
    pub fn lookup(&self, name: Name) -> Result<Bound, LookupError> {
        self.resolve(name).map(|(bound, _)| bound)
    }

    /// Resolve `name`, also reporting the mutability of the binding found.
    pub fn resolve(&self, name: Name) -> Result<(Bound, Mutability), LookupError> {
        let mut current = self.clone();
        loop {
            let parent = {
                let scope = current.borrow();
                if let Some(binding) = scope.bindings.get(&name) {
                    return match &binding.state {
                        BindingState::Assigned(bound) => Ok((bound.clone(), binding.mutability)),
                        BindingState::Unassigned => Err(LookupError::Unassigned),
                    };
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Err(LookupError::Undefined),
            }
        }
    }

    /// Overwrite the nearest binding of `name`.
    pub fn assign(&self, name: Name, value: Value) -> Result<(), AssignError> {
        let mut current = self.clone();
        loop {
            let parent = {
                let mut scope = current.borrow_mut();
                if let Some(binding) = scope.bindings.get_mut(&name) {
                    if !binding.mutability.is_mutable() {
                        return Err(AssignError::Immutable);
                    }
                    if matches!(binding.state, BindingState::Unassigned) {
                        return Err(AssignError::Unassigned);
                    }
                    binding.state = BindingState::Assigned(Bound::Value(value));
                    return Ok(());
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Err(AssignError::Undefined),
            }
        }
    }
}

const MIN_PRUNE: usize = 64;

/// The frame stack of a run.
///
/// `frames[0]` is the global frame and is never popped. Every frame created
/// through [`Environments::create`] is registered; dropping `Environments`
/// empties the frames that are still alive.
pub struct Environments {
    frames: Vec<Env>,
    registry: Vec<WeakScope<Scope>>,
    prune_at: usize,
}

impl Environments {
    pub fn new() -> Self {
        let global = LocalScope::new(Scope::new("global"));
        Environments {
            registry: vec![global.downgrade()],
            frames: vec![global],
            prune_at: MIN_PRUNE,
        }
    }

    /// Allocate a frame under `parent` and register it.
    pub fn create(&mut self, label: &str, parent: &Env) -> Env {
        if self.registry.len() >= self.prune_at {
            self.registry.retain(WeakScope::is_live);
            self.prune_at = (self.registry.len() * 2).max(MIN_PRUNE);
        }
        let env = parent.child(label);
        self.registry.push(env.downgrade());
        tracing::trace!(frame = label, depth = self.frames.len(), "create environment");
        env
    }

    #[inline]
    pub fn push(&mut self, env: Env) {
        self.frames.push(env);
    }

    /// Pop the current frame. The global frame stays.
    pub fn pop(&mut self) -> Option<Env> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Swap the current frame for `env` (tail call).
    pub fn replace_current(&mut self, env: Env) {
        if self.frames.len() > 1 {
            if let Some(top) = self.frames.last_mut() {
                *top = env;
            }
        } else {
            self.frames.push(env);
        }
    }

    /// Drop frames above the first `keep` (at least the global frame stays).
    pub fn truncate(&mut self, keep: usize) {
        self.frames.truncate(keep.max(1));
    }

    #[inline]
    pub fn current(&self) -> &Env {
        // frames is never empty
        &self.frames[self.frames.len() - 1]
    }

    #[inline]
    pub fn global(&self) -> &Env {
        &self.frames[0]
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for Environments {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Environments {
    fn drop(&mut self) {
        for weak in &self.registry {
            if let Some(scope) = weak.upgrade() {
                let bindings = scope.borrow_mut().take_bindings();
                drop(bindings);
            }
        }
    }
}
