// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use crate::ir::{StmtId, TypeId};
use crate::pta::heap::ObjId;
use crate::util::{new_index, IndexVec};

new_index! {
    /// The unique identifier for each context.
    pub struct ContextId
}

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {}

impl ContextElement for StmtId {}

impl ContextElement for ObjId {}

impl ContextElement for TypeId {}

/// A calling-history (or allocation-history) string. The solver treats
/// contexts as opaque; only selectors look inside.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    context_elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.context_elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context {
            context_elems: Vec::new(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.context_elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context_elems.is_empty()
    }

    pub fn elems(&self) -> &[E] {
        &self.context_elems
    }

    /// Derives a k-limited context from `base`. When `elem` is given it
    /// becomes the newest (first) element; only the `k` newest elements
    /// survive. With no new element this is plain truncation.
    pub fn derive(base: &Rc<Context<E>>, elem: Option<E>, k: usize) -> Rc<Self> {
        if elem.is_none() && base.len() <= k {
            return base.clone();
        }
        let context_elems = elem
            .into_iter()
            .chain(base.context_elems.iter().cloned())
            .take(k)
            .collect();
        Rc::new(Context { context_elems })
    }
}

/// Interning store for contexts. The empty context is interned first, so
/// its id is the zero index for every cache.
#[derive(Debug)]
pub struct ContextCache<E: ContextElement> {
    context_list: IndexVec<ContextId, Rc<Context<E>>>,
    context_to_index_map: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        let mut cache = ContextCache {
            context_list: IndexVec::new(),
            context_to_index_map: HashMap::new(),
        };
        cache.get_context_id(&Context::new_empty());
        cache
    }

    /// Returns the id under which `context` is interned, interning it on
    /// first sight.
    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        let context_list = &mut self.context_list;
        *self
            .context_to_index_map
            .entry(context.clone())
            .or_insert_with(|| context_list.push(context.clone()))
    }

    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.context_list.get(id).map(Rc::clone)
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::util::Idx;

    #[test]
    fn empty_context_is_id_zero() {
        let mut cache: ContextCache<u32> = ContextCache::new();
        let id = cache.get_context_id(&Context::new_empty());
        assert_eq!(id, ContextId::new(0));
        assert!(cache.get_context(id).unwrap().is_empty());
    }

    impl ContextElement for u32 {}

    #[test]
    fn interning_is_idempotent() {
        let mut cache: ContextCache<u32> = ContextCache::new();
        let ctx = Context::derive(&Context::new_empty(), Some(7), 2);
        let a = cache.get_context_id(&ctx);
        let b = cache.get_context_id(&ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn k_limiting_keeps_newest_elements() {
        let empty = Context::new_empty();
        let c1 = Context::derive(&empty, Some(1u32), 2);
        let c2 = Context::derive(&c1, Some(2), 2);
        let c3 = Context::derive(&c2, Some(3), 2);
        assert_eq!(c3.elems(), &[3, 2]);
    }

    #[test]
    fn zero_limit_stays_empty() {
        let empty = Context::new_empty();
        let c = Context::derive(&empty, Some(1u32), 0);
        assert!(c.is_empty());
    }

    #[test]
    fn truncation() {
        let empty = Context::new_empty();
        let c1 = Context::derive(&empty, Some(1u32), 3);
        let c2 = Context::derive(&c1, Some(2), 3);
        let c3 = Context::derive(&c2, Some(3), 3);
        let t = Context::derive(&c3, None, 1);
        assert_eq!(t.elems(), &[3]);
        let same = Context::derive(&c3, None, 5);
        assert_eq!(same.elems(), c3.elems());
        assert!(Rc::ptr_eq(&same, &c3));
    }
}
