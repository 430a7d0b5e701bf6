//! Execution-scoped context propagation.
//!
//! A [`Context`] is an immutable, persistent collection of values that is
//! carried across API boundaries and between logically associated units of
//! execution. Write operations never mutate: they return a new context
//! layering the additional binding over the old one, which stays valid and
//! unchanged. The currently active span and any suppression markers an SDK
//! maintains are all bindings in this structure.
//!
//! Values are addressed by [`ContextKey`] tokens rather than by value type,
//! so components that derive key names at runtime (such as the suppression
//! key registry) can intern as many distinct keys as they need.

use crate::trace::context::SynchronizedSpan;
use crate::trail_warn;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

thread_local! {
    static CURRENT_CONTEXT: RefCell<ContextStack> = RefCell::new(ContextStack::default());
}

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// An interned handle addressing one binding in a [`Context`].
///
/// Every call to [`ContextKey::named`] yields a distinct key, even for equal
/// names; components that need one shared key per name intern them in a
/// registry and hand out clones. Cloned keys address the same binding.
#[derive(Clone, Debug)]
pub struct ContextKey {
    id: u64,
    name: Arc<str>,
}

impl ContextKey {
    /// Create a new key with a diagnostic name.
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        ContextKey {
            id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }

    /// The diagnostic name this key was created with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ContextKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContextKey {}

impl Hash for ContextKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.id);
    }
}

type EntryMap = HashMap<u64, Arc<dyn Any + Send + Sync>, BuildHasherDefault<IdHasher>>;

/// An execution-scoped collection of values.
///
/// Contexts are immutable: [`with_value`] returns a new context containing
/// the original bindings plus the new one. Reads walk the layered bindings
/// with the innermost write for a key winning.
///
/// A context can be made "current" for the duration of a dynamic scope via
/// [`attach`], which returns a guard restoring the previous context on every
/// exit path, including early return and panic unwinding.
///
/// [`with_value`]: Context::with_value()
/// [`attach`]: Context::attach()
///
/// # Examples
///
/// ```
/// use contrail::{Context, ContextKey};
///
/// let key = ContextKey::named("my-component/enabled");
///
/// let cx = Context::new().with_value(&key, true);
///
/// // The original context is unchanged
/// assert_eq!(Context::new().get::<bool>(&key), None);
/// assert_eq!(cx.get::<bool>(&key), Some(&true));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) span: Option<Arc<SynchronizedSpan>>,
    entries: Option<Arc<EntryMap>>,
}

impl Context {
    /// Creates an empty root `Context` with no bindings.
    pub fn new() -> Self {
        Context::default()
    }

    /// An immutable snapshot of the current thread's context.
    pub fn current() -> Self {
        Self::map_current(|cx| cx.clone())
    }

    /// Applies a function to the current context, returning its value.
    ///
    /// This avoids cloning the current context when only a borrow is needed.
    pub fn map_current<T>(f: impl FnOnce(&Context) -> T) -> T {
        CURRENT_CONTEXT.with(|cx| cx.borrow().map_current_cx(f))
    }

    /// The value bound to `key`, if present and of type `T`.
    pub fn get<T: 'static>(&self, key: &ContextKey) -> Option<&T> {
        self.entries.as_ref()?.get(&key.id)?.downcast_ref()
    }

    /// A copy of this context with `value` bound to `key`.
    ///
    /// The receiver is not modified; an existing binding for `key` is
    /// shadowed in the returned context only.
    pub fn with_value<T: 'static + Send + Sync>(&self, key: &ContextKey, value: T) -> Self {
        let entries = if let Some(current_entries) = &self.entries {
            let mut inner_entries = (**current_entries).clone();
            inner_entries.insert(key.id, Arc::new(value));
            Some(Arc::new(inner_entries))
        } else {
            let mut entries = EntryMap::default();
            entries.insert(key.id, Arc::new(value));
            Some(Arc::new(entries))
        };
        Context {
            span: self.span.clone(),
            entries,
        }
    }

    /// Replaces the current context on this thread with this context.
    ///
    /// Dropping the returned [`ContextGuard`] restores the previous context,
    /// also when guards are dropped out of order.
    ///
    /// # Examples
    ///
    /// ```
    /// use contrail::{Context, ContextKey};
    ///
    /// let key = ContextKey::named("example");
    /// let my_cx = Context::new().with_value(&key, 7i64);
    ///
    /// {
    ///     let _guard = my_cx.attach();
    ///     assert_eq!(Context::current().get::<i64>(&key), Some(&7));
    /// }
    ///
    /// // Back in the default empty context
    /// assert_eq!(Context::current().get::<i64>(&key), None);
    /// ```
    pub fn attach(self) -> ContextGuard {
        let cx_pos = CURRENT_CONTEXT.with(|cx| cx.borrow_mut().push(self));

        ContextGuard {
            cx_pos,
            _marker: PhantomData,
        }
    }

    pub(crate) fn current_with_synchronized_span(value: SynchronizedSpan) -> Self {
        Self::map_current(|cx| Context {
            span: Some(Arc::new(value)),
            entries: cx.entries.clone(),
        })
    }

    pub(crate) fn with_synchronized_span(&self, value: SynchronizedSpan) -> Self {
        Context {
            span: Some(Arc::new(value)),
            entries: self.entries.clone(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Context");
        match &self.span {
            Some(span) => dbg.field("span", span.span_context()),
            None => dbg.field("span", &"None"),
        };
        dbg.field("entries", &self.entries.as_ref().map_or(0, |e| e.len()))
            .finish()
    }
}

/// A guard that resets the current context to the prior context when dropped.
#[derive(Debug)]
pub struct ContextGuard {
    // Position of the attached context in the stack, used to pop it.
    cx_pos: u16,
    // Ensure this type is !Send as it relies on thread locals
    _marker: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let id = self.cx_pos;
        if id > ContextStack::BASE_POS && id < ContextStack::MAX_POS {
            CURRENT_CONTEXT.with(|context_stack| context_stack.borrow_mut().pop_id(id));
        }
    }
}

/// Entry keys are already unique `u64`s, so hashing them again is wasted
/// work. This hasher passes the value through.
#[derive(Clone, Default, Debug)]
struct IdHasher(u64);

impl Hasher for IdHasher {
    fn write(&mut self, _: &[u8]) {
        unreachable!("context entry keys call write_u64");
    }

    #[inline]
    fn write_u64(&mut self, id: u64) {
        self.0 = id;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

/// A stack of the [`Context`] instances that have been attached to a thread.
///
/// Guards pop contexts by position, which tolerates out-of-order drops: only
/// a pop of the topmost entry actually restores the previous context, other
/// positions are tombstoned and cleaned up when the top is popped. Ids
/// handed out by this stack never travel to other threads because
/// [`ContextGuard`] is `!Send`, so they are always in bounds.
struct ContextStack {
    /// The context currently active on this thread, kept out of the `stack`
    /// for fast access.
    current_cx: Context,
    /// Previously attached contexts, tombstones for out-of-order drops.
    stack: Vec<Option<Context>>,
    /// Ensure this type is !Send as it relies on thread locals
    _marker: PhantomData<*const ()>,
}

impl ContextStack {
    const BASE_POS: u16 = 0;
    const MAX_POS: u16 = u16::MAX;
    const INITIAL_CAPACITY: usize = 8;

    #[inline(always)]
    fn push(&mut self, cx: Context) -> u16 {
        // Next id is the stack length plus one, since the top of the stack
        // lives in `current_cx`.
        let next_id = self.stack.len() + 1;
        if next_id < ContextStack::MAX_POS.into() {
            let current_cx = std::mem::replace(&mut self.current_cx, cx);
            self.stack.push(Some(current_cx));
            next_id as u16
        } else {
            trail_warn!(
                name: "Context.AttachFailed",
                message = "attached context limit reached, the current context is unchanged"
            );
            ContextStack::MAX_POS
        }
    }

    #[inline(always)]
    fn pop_id(&mut self, pos: u16) {
        if pos == ContextStack::BASE_POS || pos == ContextStack::MAX_POS {
            // The base context cannot be popped and the overflow position is
            // invalid.
            return;
        }
        let len: u16 = self.stack.len() as u16;
        if pos == len {
            // Popping the top: restore the previous context, skipping over
            // entries already popped out of order.
            while let Some(None) = self.stack.last() {
                _ = self.stack.pop();
            }
            if let Some(Some(next_cx)) = self.stack.pop() {
                self.current_cx = next_cx;
            }
        } else {
            if pos > len {
                trail_warn!(
                    name: "Context.PopOutOfBounds",
                    position = pos,
                    stack_length = len
                );
                return;
            }
            // Out-of-order pop, tombstone the entry.
            _ = self.stack[pos as usize].take();
        }
    }

    #[inline(always)]
    fn map_current_cx<T>(&self, f: impl FnOnce(&Context) -> T) -> T {
        f(&self.current_cx)
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        ContextStack {
            current_cx: Context::default(),
            stack: Vec::with_capacity(ContextStack::INITIAL_CAPACITY),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layering_never_mutates_the_parent() {
        let key_a = ContextKey::named("a");
        let key_b = ContextKey::named("b");

        let base = Context::new().with_value(&key_a, 1i64);
        let layered = base.with_value(&key_b, 2i64);

        assert_eq!(base.get::<i64>(&key_a), Some(&1));
        assert_eq!(base.get::<i64>(&key_b), None);
        assert_eq!(layered.get::<i64>(&key_a), Some(&1));
        assert_eq!(layered.get::<i64>(&key_b), Some(&2));
    }

    #[test]
    fn innermost_binding_wins() {
        let key = ContextKey::named("flag");
        let outer = Context::new().with_value(&key, false);
        let inner = outer.with_value(&key, true);

        assert_eq!(outer.get::<bool>(&key), Some(&false));
        assert_eq!(inner.get::<bool>(&key), Some(&true));
    }

    #[test]
    fn distinct_keys_with_equal_names_do_not_collide() {
        let first = ContextKey::named("shared-name");
        let second = ContextKey::named("shared-name");

        let cx = Context::new().with_value(&first, 1i64);
        assert_eq!(cx.get::<i64>(&first), Some(&1));
        assert_eq!(cx.get::<i64>(&second), None);
        assert_ne!(first, second);
    }

    #[test]
    fn attach_and_restore() {
        let key = ContextKey::named("attach");
        assert_eq!(Context::current().get::<i64>(&key), None);
        {
            let _outer = Context::new().with_value(&key, 1i64).attach();
            assert_eq!(Context::current().get::<i64>(&key), Some(&1));
            {
                let _inner = Context::current().with_value(&key, 2i64).attach();
                assert_eq!(Context::current().get::<i64>(&key), Some(&2));
            }
            assert_eq!(Context::current().get::<i64>(&key), Some(&1));
        }
        assert_eq!(Context::current().get::<i64>(&key), None);
    }

    #[test]
    fn out_of_order_guard_drop() {
        let key = ContextKey::named("out-of-order");
        let outer = Context::new().with_value(&key, 1i64).attach();
        let inner = Context::current().with_value(&key, 2i64).attach();

        // Dropping the outer guard first tombstones its slot, the inner
        // context stays current.
        drop(outer);
        assert_eq!(Context::current().get::<i64>(&key), Some(&2));

        // Dropping the inner guard unwinds past the tombstone to the base.
        drop(inner);
        assert_eq!(Context::current().get::<i64>(&key), None);
    }
}
