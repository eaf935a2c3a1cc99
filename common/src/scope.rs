//! Stack of value snapshots used for cascading configuration
//!
//! Every nested configuration region inherits its parent's settings by value. Entering a
//! region truncates the stack back to the depth of the region's parent, optionally resets
//! the parent's scope-local state and (when the region declares its own settings) pushes a
//! copy of the parent that the region is free to modify. Leaving a region needs no
//! bookkeeping: the next descent to a shallower depth simply discards it.
//!
//! ```
//! use common::scope::ScopeStack;
//!
//! let mut stack = ScopeStack::new(0u8);
//! *stack.descend(1, |_, _| {}, true) = 7;
//! assert_eq!(stack.depth(), 2);
//! // back to depth 1, the child override is gone
//! assert_eq!(*stack.descend(1, |_, _| {}, false), 0);
//! ```

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeStack<T> {
    entries: Vec<T>,
}

impl<T: Clone> ScopeStack<T> {
    /// Creates a stack holding only the root scope.
    pub fn new(root: T) -> Self {
        Self {
            entries: vec![root],
        }
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn top(&self) -> &T {
        self.entries
            .last()
            .expect("scope stack must always hold the root scope")
    }

    pub fn top_mut(&mut self) -> &mut T {
        self.entries
            .last_mut()
            .expect("scope stack must always hold the root scope")
    }

    /// Enter a scope whose parent lives at `max_depth`.
    ///
    /// 1. entries deeper than `max_depth` are dropped
    /// 2. `reset` is called with the resulting depth and the top entry
    /// 3. if `push_new` is set, a copy of the top entry is pushed
    ///
    /// Returns the top entry after these steps.
    ///
    /// # Panics
    ///
    /// Panics if `max_depth` is 0: the root scope can never be discarded.
    pub fn descend<F>(&mut self, max_depth: usize, reset: F, push_new: bool) -> &mut T
    where
        F: FnOnce(usize, &mut T),
    {
        assert!(max_depth > 0, "the root scope can not be discarded");
        self.entries.truncate(max_depth);
        let depth = self.entries.len();
        reset(depth, self.top_mut());
        if push_new {
            let inherited = self.top().clone();
            self.entries.push(inherited);
        }
        self.top_mut()
    }
}

impl<T: Clone + Default> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
