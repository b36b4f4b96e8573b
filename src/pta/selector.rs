// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context selectors.
//!
//! The solver is parameterized by a selector and never inspects context
//! contents; each selector owns its interning cache, keyed by its own kind
//! of context element. The empty context is always id zero.

use std::rc::Rc;

use crate::ir::{MethodId, StmtId, TypeId};
use crate::pta::context::{Context, ContextCache, ContextElement, ContextId};
use crate::pta::elements::{CSCallSite, CSMethod, CSObj};
use crate::pta::heap::ObjId;
use crate::util::Idx;

pub trait ContextSelector {
    /// The identity context under which context-insensitive entities live.
    fn empty_context(&mut self) -> ContextId;

    /// The heap context for an object allocated in `method`.
    fn select_heap_context(&mut self, method: CSMethod, obj: ObjId) -> ContextId;

    /// The callee context for a static call.
    fn select_static_context(&mut self, site: CSCallSite, callee: MethodId) -> ContextId;

    /// The callee context for an instance call on `recv` with declared
    /// type `recv_ty`.
    fn select_instance_context(
        &mut self,
        site: CSCallSite,
        recv: CSObj,
        recv_ty: TypeId,
        callee: MethodId,
    ) -> ContextId;
}

fn context_of<E: ContextElement>(cache: &ContextCache<E>, id: ContextId) -> Rc<Context<E>> {
    cache.get_context(id).unwrap_or_else(Context::new_empty)
}

/// The trivial selector: everything lives under the empty context. Running
/// the solver under it is the context-insensitive whole-program analysis.
pub struct ContextInsensitive;

impl ContextSelector for ContextInsensitive {
    fn empty_context(&mut self) -> ContextId {
        ContextId::new(0)
    }

    fn select_heap_context(&mut self, _method: CSMethod, _obj: ObjId) -> ContextId {
        ContextId::new(0)
    }

    fn select_static_context(&mut self, _site: CSCallSite, _callee: MethodId) -> ContextId {
        ContextId::new(0)
    }

    fn select_instance_context(
        &mut self,
        _site: CSCallSite,
        _recv: CSObj,
        _recv_ty: TypeId,
        _callee: MethodId,
    ) -> ContextId {
        ContextId::new(0)
    }
}

/// k-limited call-site sensitivity: the callee context is the call string
/// of the last `k` call sites; heap contexts keep `k - 1` elements.
pub struct KCallSiteSensitive {
    k: usize,
    ctx_cache: ContextCache<StmtId>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ctx_cache: ContextCache::new(),
        }
    }

    fn new_context(&mut self, site: CSCallSite) -> ContextId {
        let caller_ctx = context_of(&self.ctx_cache, site.ctx);
        let callee_ctx = Context::derive(&caller_ctx, Some(site.invoke), self.k);
        self.ctx_cache.get_context_id(&callee_ctx)
    }
}

impl ContextSelector for KCallSiteSensitive {
    fn empty_context(&mut self) -> ContextId {
        self.ctx_cache.get_context_id(&Context::new_empty())
    }

    fn select_heap_context(&mut self, method: CSMethod, _obj: ObjId) -> ContextId {
        let method_ctx = context_of(&self.ctx_cache, method.ctx);
        let heap_ctx = Context::derive(&method_ctx, None, self.k.saturating_sub(1));
        self.ctx_cache.get_context_id(&heap_ctx)
    }

    fn select_static_context(&mut self, site: CSCallSite, _callee: MethodId) -> ContextId {
        self.new_context(site)
    }

    fn select_instance_context(
        &mut self,
        site: CSCallSite,
        _recv: CSObj,
        _recv_ty: TypeId,
        _callee: MethodId,
    ) -> ContextId {
        self.new_context(site)
    }
}

/// k-limited object sensitivity: the callee context is the allocation
/// string of the receiver object; static calls stay in the caller context.
pub struct KObjectSensitive {
    k: usize,
    ctx_cache: ContextCache<ObjId>,
}

impl KObjectSensitive {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ctx_cache: ContextCache::new(),
        }
    }
}

impl ContextSelector for KObjectSensitive {
    fn empty_context(&mut self) -> ContextId {
        self.ctx_cache.get_context_id(&Context::new_empty())
    }

    fn select_heap_context(&mut self, method: CSMethod, _obj: ObjId) -> ContextId {
        let method_ctx = context_of(&self.ctx_cache, method.ctx);
        let heap_ctx = Context::derive(&method_ctx, None, self.k.saturating_sub(1));
        self.ctx_cache.get_context_id(&heap_ctx)
    }

    fn select_static_context(&mut self, site: CSCallSite, _callee: MethodId) -> ContextId {
        site.ctx
    }

    fn select_instance_context(
        &mut self,
        _site: CSCallSite,
        recv: CSObj,
        _recv_ty: TypeId,
        _callee: MethodId,
    ) -> ContextId {
        let recv_ctx = context_of(&self.ctx_cache, recv.ctx);
        let callee_ctx = Context::derive(&recv_ctx, Some(recv.obj), self.k);
        self.ctx_cache.get_context_id(&callee_ctx)
    }
}

/// k-limited type sensitivity: like object sensitivity, but contexts are
/// built from the receiver object's declared type.
pub struct KTypeSensitive {
    k: usize,
    ctx_cache: ContextCache<TypeId>,
}

impl KTypeSensitive {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ctx_cache: ContextCache::new(),
        }
    }
}

impl ContextSelector for KTypeSensitive {
    fn empty_context(&mut self) -> ContextId {
        self.ctx_cache.get_context_id(&Context::new_empty())
    }

    fn select_heap_context(&mut self, method: CSMethod, _obj: ObjId) -> ContextId {
        let method_ctx = context_of(&self.ctx_cache, method.ctx);
        let heap_ctx = Context::derive(&method_ctx, None, self.k.saturating_sub(1));
        self.ctx_cache.get_context_id(&heap_ctx)
    }

    fn select_static_context(&mut self, site: CSCallSite, _callee: MethodId) -> ContextId {
        site.ctx
    }

    fn select_instance_context(
        &mut self,
        _site: CSCallSite,
        recv: CSObj,
        recv_ty: TypeId,
        _callee: MethodId,
    ) -> ContextId {
        let recv_ctx = context_of(&self.ctx_cache, recv.ctx);
        let callee_ctx = Context::derive(&recv_ctx, Some(recv_ty), self.k);
        self.ctx_cache.get_context_id(&callee_ctx)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn site(ctx: ContextId, invoke: usize) -> CSCallSite {
        CSCallSite {
            ctx,
            invoke: StmtId::new(invoke),
        }
    }

    #[test]
    fn insensitive_selector_never_leaves_empty() {
        let mut sel = ContextInsensitive;
        let empty = sel.empty_context();
        let m = CSMethod {
            ctx: empty,
            method: MethodId::new(0),
        };
        assert_eq!(sel.select_heap_context(m, ObjId::new(0)), empty);
        assert_eq!(sel.select_static_context(site(empty, 1), MethodId::new(1)), empty);
    }

    #[test]
    fn call_site_selector_distinguishes_sites() {
        let mut sel = KCallSiteSensitive::new(2);
        let empty = sel.empty_context();
        let c1 = sel.select_static_context(site(empty, 1), MethodId::new(0));
        let c2 = sel.select_static_context(site(empty, 2), MethodId::new(0));
        assert_ne!(c1, c2);
        // same site from the same caller context interns to the same id
        assert_eq!(c1, sel.select_static_context(site(empty, 1), MethodId::new(0)));
    }

    #[test]
    fn call_site_selector_k_limits() {
        let mut sel = KCallSiteSensitive::new(1);
        let empty = sel.empty_context();
        let c1 = sel.select_static_context(site(empty, 1), MethodId::new(0));
        let c2 = sel.select_static_context(site(c1, 2), MethodId::new(0));
        let c2_again = sel.select_static_context(site(empty, 2), MethodId::new(0));
        // with k = 1 only the most recent call site survives
        assert_eq!(c2, c2_again);
    }

    #[test]
    fn one_call_site_heap_context_is_empty() {
        let mut sel = KCallSiteSensitive::new(1);
        let empty = sel.empty_context();
        let c1 = sel.select_static_context(site(empty, 1), MethodId::new(0));
        let m = CSMethod {
            ctx: c1,
            method: MethodId::new(0),
        };
        assert_eq!(sel.select_heap_context(m, ObjId::new(0)), empty);
    }

    #[test]
    fn object_selector_uses_receiver_allocation() {
        let mut sel = KObjectSensitive::new(1);
        let empty = sel.empty_context();
        let recv_a = CSObj {
            ctx: empty,
            obj: ObjId::new(0),
        };
        let recv_b = CSObj {
            ctx: empty,
            obj: ObjId::new(1),
        };
        let ty = TypeId::new(0);
        let ca = sel.select_instance_context(site(empty, 1), recv_a, ty, MethodId::new(0));
        let cb = sel.select_instance_context(site(empty, 1), recv_b, ty, MethodId::new(0));
        assert_ne!(ca, cb);
        // static calls inherit the caller context
        assert_eq!(sel.select_static_context(site(ca, 2), MethodId::new(1)), ca);
    }
}
