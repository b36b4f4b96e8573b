// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-sensitive program elements and their interning store.
//!
//! Every pointer, object, method and call site paired with a context is
//! interned to a dense handle; equality of interned entities is handle
//! equality, and repeated lookups return the identical handle.

use std::collections::HashMap;

use crate::ir::{FieldId, MethodId, StmtId, VarId};
use crate::pta::context::ContextId;
use crate::pta::heap::ObjId;
use crate::util::{new_index, IndexVec};

new_index! {
    /// Handle of an interned pointer, a node of the pointer flow graph.
    pub struct PointerId
}

new_index! {
    /// Handle of an interned (context, object) pair.
    pub struct CSObjId
}

new_index! {
    /// Handle of an interned (context, method) pair.
    pub struct CSMethodId
}

new_index! {
    /// Handle of an interned (context, invoke) pair.
    pub struct CSCallSiteId
}

/// A pointer: the node kinds of the pointer flow graph.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Pointer {
    /// A variable under a context.
    CSVar { ctx: ContextId, var: VarId },
    /// An instance field of an abstract object.
    InstanceField { base: CSObjId, field: FieldId },
    /// The summarized element of an abstract array object.
    ArrayIndex { base: CSObjId },
    /// A static field.
    StaticField { field: FieldId },
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSObj {
    pub ctx: ContextId,
    pub obj: ObjId,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSMethod {
    pub ctx: ContextId,
    pub method: MethodId,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSCallSite {
    pub ctx: ContextId,
    pub invoke: StmtId,
}

/// The interning store for context-sensitive elements, one map per kind.
pub struct CSManager {
    pointers: IndexVec<PointerId, Pointer>,
    cs_var_map: HashMap<(ContextId, VarId), PointerId>,
    instance_field_map: HashMap<(CSObjId, FieldId), PointerId>,
    array_index_map: HashMap<CSObjId, PointerId>,
    static_field_map: HashMap<FieldId, PointerId>,

    cs_objs: IndexVec<CSObjId, CSObj>,
    cs_obj_map: HashMap<(ContextId, ObjId), CSObjId>,

    cs_methods: IndexVec<CSMethodId, CSMethod>,
    cs_method_map: HashMap<(ContextId, MethodId), CSMethodId>,

    cs_call_sites: IndexVec<CSCallSiteId, CSCallSite>,
    cs_call_site_map: HashMap<(ContextId, StmtId), CSCallSiteId>,
}

impl CSManager {
    pub fn new() -> Self {
        CSManager {
            pointers: IndexVec::new(),
            cs_var_map: HashMap::new(),
            instance_field_map: HashMap::new(),
            array_index_map: HashMap::new(),
            static_field_map: HashMap::new(),
            cs_objs: IndexVec::new(),
            cs_obj_map: HashMap::new(),
            cs_methods: IndexVec::new(),
            cs_method_map: HashMap::new(),
            cs_call_sites: IndexVec::new(),
            cs_call_site_map: HashMap::new(),
        }
    }

    pub fn get_cs_var(&mut self, ctx: ContextId, var: VarId) -> PointerId {
        if let Some(id) = self.cs_var_map.get(&(ctx, var)) {
            return *id;
        }
        let id = self.pointers.push(Pointer::CSVar { ctx, var });
        self.cs_var_map.insert((ctx, var), id);
        id
    }

    /// The interned pointer for `(ctx, var)` if it has ever been created.
    pub fn find_cs_var(&self, ctx: ContextId, var: VarId) -> Option<PointerId> {
        self.cs_var_map.get(&(ctx, var)).copied()
    }

    pub fn get_instance_field(&mut self, base: CSObjId, field: FieldId) -> PointerId {
        if let Some(id) = self.instance_field_map.get(&(base, field)) {
            return *id;
        }
        let id = self.pointers.push(Pointer::InstanceField { base, field });
        self.instance_field_map.insert((base, field), id);
        id
    }

    pub fn get_array_index(&mut self, base: CSObjId) -> PointerId {
        if let Some(id) = self.array_index_map.get(&base) {
            return *id;
        }
        let id = self.pointers.push(Pointer::ArrayIndex { base });
        self.array_index_map.insert(base, id);
        id
    }

    pub fn get_static_field(&mut self, field: FieldId) -> PointerId {
        if let Some(id) = self.static_field_map.get(&field) {
            return *id;
        }
        let id = self.pointers.push(Pointer::StaticField { field });
        self.static_field_map.insert(field, id);
        id
    }

    pub fn get_cs_obj(&mut self, ctx: ContextId, obj: ObjId) -> CSObjId {
        if let Some(id) = self.cs_obj_map.get(&(ctx, obj)) {
            return *id;
        }
        let id = self.cs_objs.push(CSObj { ctx, obj });
        self.cs_obj_map.insert((ctx, obj), id);
        id
    }

    pub fn get_cs_method(&mut self, ctx: ContextId, method: MethodId) -> CSMethodId {
        if let Some(id) = self.cs_method_map.get(&(ctx, method)) {
            return *id;
        }
        let id = self.cs_methods.push(CSMethod { ctx, method });
        self.cs_method_map.insert((ctx, method), id);
        id
    }

    pub fn get_cs_call_site(&mut self, ctx: ContextId, invoke: StmtId) -> CSCallSiteId {
        if let Some(id) = self.cs_call_site_map.get(&(ctx, invoke)) {
            return *id;
        }
        let id = self.cs_call_sites.push(CSCallSite { ctx, invoke });
        self.cs_call_site_map.insert((ctx, invoke), id);
        id
    }

    #[inline]
    pub fn pointer(&self, id: PointerId) -> Pointer {
        self.pointers[id]
    }

    #[inline]
    pub fn cs_obj(&self, id: CSObjId) -> CSObj {
        self.cs_objs[id]
    }

    #[inline]
    pub fn cs_method(&self, id: CSMethodId) -> CSMethod {
        self.cs_methods[id]
    }

    #[inline]
    pub fn cs_call_site(&self, id: CSCallSiteId) -> CSCallSite {
        self.cs_call_sites[id]
    }

    /// All interned pointers in creation order.
    pub fn iter_pointers(&self) -> impl Iterator<Item = (PointerId, Pointer)> + '_ {
        self.pointers.iter_enumerated().map(|(id, p)| (id, *p))
    }

    pub fn num_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn num_cs_objs(&self) -> usize {
        self.cs_objs.len()
    }
}

impl Default for CSManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::Idx;

    #[test]
    fn interning_returns_identical_handles() {
        let mut csm = CSManager::new();
        let ctx = ContextId::new(0);
        let var = VarId::new(3);
        let a = csm.get_cs_var(ctx, var);
        let b = csm.get_cs_var(ctx, var);
        assert_eq!(a, b);
        assert_eq!(csm.find_cs_var(ctx, var), Some(a));
        assert_eq!(csm.num_pointers(), 1);

        let obj = csm.get_cs_obj(ctx, ObjId::new(0));
        assert_eq!(obj, csm.get_cs_obj(ctx, ObjId::new(0)));

        let f = FieldId::new(1);
        assert_eq!(csm.get_instance_field(obj, f), csm.get_instance_field(obj, f));
        assert_eq!(csm.get_array_index(obj), csm.get_array_index(obj));
        assert_eq!(csm.get_static_field(f), csm.get_static_field(f));
        assert_eq!(csm.num_pointers(), 4);
    }

    #[test]
    fn distinct_contexts_intern_distinct_pointers() {
        let mut csm = CSManager::new();
        let var = VarId::new(0);
        let a = csm.get_cs_var(ContextId::new(0), var);
        let b = csm.get_cs_var(ContextId::new(1), var);
        assert_ne!(a, b);
        assert!(matches!(csm.pointer(a), Pointer::CSVar { var: v, .. } if v == var));
    }

    #[test]
    fn unseen_cs_var_is_absent() {
        let csm = CSManager::new();
        assert_eq!(csm.find_cs_var(ContextId::new(0), VarId::new(9)), None);
    }
}
