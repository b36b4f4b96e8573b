// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use crate::ir::{StmtId, TypeId};
use crate::util::{new_index, IndexVec};

new_index! {
    /// Handle of an abstract object.
    pub struct ObjId
}

/// What an abstract object stands for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ObjKind {
    /// All runtime objects created at one allocation site.
    Alloc { site: StmtId },
    /// Data that originated at a taint source call. Never carries an
    /// allocation site.
    Taint { source: StmtId },
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Obj {
    pub kind: ObjKind,
    /// The declared type of the object.
    pub ty: TypeId,
}

impl Obj {
    pub fn is_taint(&self) -> bool {
        matches!(self.kind, ObjKind::Taint { .. })
    }
}

/// The allocation-site heap abstraction. The same `New` statement always
/// yields the same object handle; taint objects are interned by their
/// (source invoke, taint type) pair.
pub struct HeapModel {
    objs: IndexVec<ObjId, Obj>,
    alloc_objs: HashMap<StmtId, ObjId>,
    taint_objs: HashMap<(StmtId, TypeId), ObjId>,
}

impl HeapModel {
    pub fn new() -> Self {
        HeapModel {
            objs: IndexVec::new(),
            alloc_objs: HashMap::new(),
            taint_objs: HashMap::new(),
        }
    }

    /// The abstract object of an allocation site.
    pub fn get_obj(&mut self, site: StmtId, ty: TypeId) -> ObjId {
        if let Some(id) = self.alloc_objs.get(&site) {
            return *id;
        }
        let id = self.objs.push(Obj {
            kind: ObjKind::Alloc { site },
            ty,
        });
        self.alloc_objs.insert(site, id);
        id
    }

    /// Manufactures the taint object for a source call and taint type.
    pub fn get_taint_obj(&mut self, source: StmtId, ty: TypeId) -> ObjId {
        if let Some(id) = self.taint_objs.get(&(source, ty)) {
            return *id;
        }
        let id = self.objs.push(Obj {
            kind: ObjKind::Taint { source },
            ty,
        });
        self.taint_objs.insert((source, ty), id);
        id
    }

    #[inline]
    pub fn obj(&self, id: ObjId) -> Obj {
        self.objs[id]
    }

    #[inline]
    pub fn is_taint(&self, id: ObjId) -> bool {
        self.objs[id].is_taint()
    }

    /// The source call of a taint object; `None` for regular objects.
    pub fn taint_source(&self, id: ObjId) -> Option<StmtId> {
        match self.objs[id].kind {
            ObjKind::Taint { source } => Some(source),
            ObjKind::Alloc { .. } => None,
        }
    }

    pub fn num_objs(&self) -> usize {
        self.objs.len()
    }

    pub fn num_taint_objs(&self) -> usize {
        self.taint_objs.len()
    }
}

impl Default for HeapModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::util::Idx;

    #[test]
    fn allocation_sites_are_stable() {
        let mut heap = HeapModel::new();
        let site = StmtId::new(4);
        let ty = TypeId::new(0);
        let a = heap.get_obj(site, ty);
        let b = heap.get_obj(site, ty);
        assert_eq!(a, b);
        assert!(!heap.is_taint(a));
        assert_eq!(heap.taint_source(a), None);
    }

    #[test]
    fn taint_identity_is_source_and_type() {
        let mut heap = HeapModel::new();
        let call = StmtId::new(7);
        let t0 = TypeId::new(0);
        let t1 = TypeId::new(1);
        let a = heap.get_taint_obj(call, t0);
        let b = heap.get_taint_obj(call, t0);
        let c = heap.get_taint_obj(call, t1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(heap.is_taint(a));
        assert_eq!(heap.taint_source(a), Some(call));
        assert_eq!(heap.num_taint_objs(), 2);
    }

    #[test]
    fn taint_and_alloc_never_collide() {
        let mut heap = HeapModel::new();
        let s = StmtId::new(1);
        let ty = TypeId::new(0);
        let alloc = heap.get_obj(s, ty);
        let taint = heap.get_taint_obj(s, ty);
        assert_ne!(alloc, taint);
    }
}
