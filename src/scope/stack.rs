//! Per-chain scope stack.
//!
//! A [`ScopeContext`] belongs to one logical call chain. It keeps, per model
//! collection, the criteria currently "in scope" and whether the default scope
//! is suppressed. Independent chains use independent contexts, so nothing is
//! shared between threads or coroutines.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use crate::criteria::Criteria;

/// Scope stacks and default-scope suppression flags of one call chain
#[derive(Default)]
pub struct ScopeContext {
    stacks: HashMap<String, Vec<Box<dyn Any>>>,
    suppressed: HashSet<String>,
}

impl std::fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let depths: HashMap<&str, usize> = self
            .stacks
            .iter()
            .map(|(collection, frames)| (collection.as_str(), frames.len()))
            .collect();
        f.debug_struct("ScopeContext")
            .field("depths", &depths)
            .field("suppressed", &self.suppressed)
            .finish()
    }
}

impl ScopeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `criteria` onto its model's stack
    ///
    /// The returned guard pops the frame when dropped, whatever the exit path.
    pub fn push<R: 'static>(&mut self, criteria: Criteria<R>) -> ScopeGuard<'_, R> {
        let collection = criteria.model().collection().to_string();
        let frames = self.stacks.entry(collection.clone()).or_default();
        frames.push(Box::new(criteria));
        let depth = frames.len();
        ScopeGuard {
            ctx: self,
            collection,
            depth,
            _record: PhantomData,
        }
    }

    /// Pop the top frame of `collection` if it holds a `Criteria<R>`
    pub fn pop<R: 'static>(&mut self, collection: &str) -> Option<Criteria<R>> {
        let frames = self.stacks.get_mut(collection)?;
        if !frames.last()?.is::<Criteria<R>>() {
            return None;
        }
        let frame = frames.pop()?;
        frame.downcast::<Criteria<R>>().ok().map(|criteria| *criteria)
    }

    /// Criteria on top of `collection`'s stack
    pub fn top<R: 'static>(&self, collection: &str) -> Option<&Criteria<R>> {
        self.stacks
            .get(collection)?
            .last()?
            .downcast_ref::<Criteria<R>>()
    }

    pub fn depth(&self, collection: &str) -> usize {
        self.stacks.get(collection).map_or(0, Vec::len)
    }

    /// Run `f` with `criteria` on top of its model's stack
    ///
    /// The frame is popped after `f` returns or unwinds.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use lifeguard_search::{ScopeContext, Searchable};
    /// # use lifeguard_search::test_helpers::{MemoryStore, MockBackend};
    /// # let model: Searchable<String> =
    /// #     Searchable::new("people", Arc::new(MockBackend::new()), Arc::new(MemoryStore::new()));
    /// let mut ctx = ScopeContext::new();
    /// let selector = ctx.with_scope(model.filter(("name", "Joe")), |scope| {
    ///     // Class-level entry points continue from the stacked criteria
    ///     model.criteria_in(scope).filter(("age", 3)).selector().to_string()
    /// });
    /// assert_eq!(selector, "(name:Joe) AND (age:3)");
    /// assert_eq!(ctx.depth("people"), 0);
    /// ```
    pub fn with_scope<R: 'static, T>(
        &mut self,
        criteria: Criteria<R>,
        f: impl FnOnce(&mut ScopeGuard<'_, R>) -> T,
    ) -> T {
        let mut guard = self.push(criteria);
        f(&mut guard)
    }

    /// Mark the default scope of `collection` as suppressed for this chain
    pub fn suppress_default_scope(&mut self, collection: &str) {
        self.suppressed.insert(collection.to_string());
    }

    pub fn is_default_scope_suppressed(&self, collection: &str) -> bool {
        self.suppressed.contains(collection)
    }
}

/// Frame on a [`ScopeContext`], popped on drop
///
/// Dereferences to the context so nested calls can keep using it.
pub struct ScopeGuard<'a, R: 'static> {
    ctx: &'a mut ScopeContext,
    collection: String,
    depth: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R: 'static> ScopeGuard<'_, R> {
    /// The criteria this guard pushed
    pub fn criteria(&self) -> Option<&Criteria<R>> {
        self.ctx.top(&self.collection)
    }
}

impl<R: 'static> Deref for ScopeGuard<'_, R> {
    type Target = ScopeContext;

    fn deref(&self) -> &ScopeContext {
        self.ctx
    }
}

impl<R: 'static> DerefMut for ScopeGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut ScopeContext {
        self.ctx
    }
}

impl<R: 'static> Drop for ScopeGuard<'_, R> {
    fn drop(&mut self) {
        // Frames left above ours by a leaked guard go too
        if let Some(frames) = self.ctx.stacks.get_mut(&self.collection) {
            frames.truncate(self.depth.saturating_sub(1));
        }
    }
}
