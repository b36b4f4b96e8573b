// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use crate::ir::stmt::{Invoke, CallKind, MethodRef, Stmt, StmtId, Var, VarId};
use crate::util::{new_index, Idx, IndexVec};

new_index! {
    pub struct TypeId
}

new_index! {
    pub struct ClassId
}

new_index! {
    pub struct FieldId
}

new_index! {
    /// The unique identifier for each method of the analyzed program.
    pub struct MethodId
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeKind {
    Class(ClassId),
    Array(TypeId),
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub ty: TypeId,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) methods: Vec<MethodId>,
}

#[derive(Debug)]
pub struct Field {
    pub class: ClassId,
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug)]
pub struct Method {
    pub class: ClassId,
    pub name: String,
    pub is_static: bool,
    pub is_abstract: bool,
    /// The `this` variable; `None` for static and abstract methods.
    pub this_var: Option<VarId>,
    pub params: Vec<VarId>,
    pub return_vars: Vec<VarId>,
    pub stmts: Vec<StmtId>,
}

/// The analysis world: type and class arenas, the method bodies, and the
/// dispatch oracle. Threaded explicitly through the analyses instead of
/// living in ambient globals.
pub struct World {
    pub(crate) types: IndexVec<TypeId, TypeKind>,
    pub(crate) classes: IndexVec<ClassId, Class>,
    pub(crate) fields: IndexVec<FieldId, Field>,
    pub(crate) methods: IndexVec<MethodId, Method>,
    pub(crate) vars: IndexVec<VarId, Var>,
    pub(crate) stmts: IndexVec<StmtId, Stmt>,

    class_names: HashMap<String, ClassId>,
    array_types: HashMap<TypeId, TypeId>,
    entry: Option<MethodId>,
}

impl World {
    pub fn new() -> Self {
        World {
            types: IndexVec::new(),
            classes: IndexVec::new(),
            fields: IndexVec::new(),
            methods: IndexVec::new(),
            vars: IndexVec::new(),
            stmts: IndexVec::new(),
            class_names: HashMap::new(),
            array_types: HashMap::new(),
            entry: None,
        }
    }

    /// Declares a class. Class names are unique within a world.
    pub fn add_class(&mut self, name: impl Into<String>, superclass: Option<ClassId>) -> ClassId {
        let name = name.into();
        assert!(
            !self.class_names.contains_key(&name),
            "duplicate class `{name}`"
        );
        let class_id = ClassId::new(self.classes.len());
        let ty = self.types.push(TypeKind::Class(class_id));
        let id = self.classes.push(Class {
            name: name.clone(),
            superclass,
            ty,
            fields: Vec::new(),
            methods: Vec::new(),
        });
        self.class_names.insert(name, id);
        id
    }

    pub fn add_field(&mut self, class: ClassId, name: impl Into<String>, ty: TypeId) -> FieldId {
        let id = self.fields.push(Field {
            class,
            name: name.into(),
            ty,
        });
        self.classes[class].fields.push(id);
        id
    }

    /// The class type of `class`.
    pub fn class_type(&self, class: ClassId) -> TypeId {
        self.classes[class].ty
    }

    /// Interns the array type with the given element type.
    pub fn array_type(&mut self, elem: TypeId) -> TypeId {
        if let Some(ty) = self.array_types.get(&elem) {
            return *ty;
        }
        let ty = self.types.push(TypeKind::Array(elem));
        self.array_types.insert(elem, ty);
        ty
    }

    pub fn set_entry(&mut self, method: MethodId) {
        self.entry = Some(method);
    }

    /// The program's main method, if one was declared.
    pub fn entry_point(&self) -> Option<MethodId> {
        self.entry
    }

    #[inline]
    pub fn type_kind(&self, ty: TypeId) -> TypeKind {
        self.types[ty]
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    /// The invoke expression of an invoke statement.
    ///
    /// Panics if `id` is not an invoke; callers only reach this through the
    /// per-variable invoke indices or the call graph, which both hold
    /// invoke statements by construction.
    pub fn invoke(&self, id: StmtId) -> &Invoke {
        self.stmts[id]
            .as_invoke()
            .unwrap_or_else(|| panic!("{id:?} is not an invoke statement"))
    }

    pub fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    /// Looks up a method by its textual signature, either `Class.method`
    /// or the bracketed form `<Class: method>`.
    pub fn lookup_method(&self, sig: &str) -> Option<MethodId> {
        let sig = sig.trim();
        let (class_name, method_name) = if let Some(inner) = sig
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let (c, m) = inner.split_once(':')?;
            (c.trim(), m.trim())
        } else {
            let (c, m) = sig.rsplit_once('.')?;
            (c, m)
        };
        let class = self.lookup_class(class_name)?;
        self.find_declared_method(class, method_name)
    }

    /// The `Class.method` signature of a method.
    pub fn method_sig(&self, method: MethodId) -> String {
        let m = &self.methods[method];
        format!("{}.{}", self.classes[m.class].name, m.name)
    }

    pub fn type_name(&self, ty: TypeId) -> String {
        match self.types[ty] {
            TypeKind::Class(c) => self.classes[c].name.clone(),
            TypeKind::Array(elem) => format!("{}[]", self.type_name(elem)),
        }
    }

    /// Is `sub` equal to or a subclass of `sup`?
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut cur = Some(sub);
        while let Some(c) = cur {
            if c == sup {
                return true;
            }
            cur = self.classes[c].superclass;
        }
        false
    }

    fn find_declared_method(&self, class: ClassId, name: &str) -> Option<MethodId> {
        self.classes[class]
            .methods
            .iter()
            .copied()
            .find(|&m| self.methods[m].name == name)
    }

    /// Walks the hierarchy upwards from `class` for a method matching
    /// `name`. The result may be abstract; the caller decides what an
    /// abstract target means.
    pub fn resolve_method(&self, class: ClassId, name: &str) -> Option<MethodId> {
        let mut cur = Some(class);
        while let Some(c) = cur {
            if let Some(m) = self.find_declared_method(c, name) {
                return Some(m);
            }
            cur = self.classes[c].superclass;
        }
        None
    }

    /// Dispatches a method reference against the declared type of the
    /// receiver object. A `None` type is "type-free dispatch": resolution
    /// starts at the reference's declared class.
    pub fn dispatch(&self, recv_ty: Option<TypeId>, mref: &MethodRef) -> Option<MethodId> {
        let start = match recv_ty.map(|ty| self.types[ty]) {
            Some(TypeKind::Class(c)) => c,
            // Arrays inherit their methods from the reference's class.
            Some(TypeKind::Array(_)) | None => mref.class,
        };
        self.resolve_method(start, &mref.name)
    }

    /// Resolves the callee of an invoke. Virtual and interface calls
    /// dispatch on the receiver object's declared type; static and special
    /// calls resolve from the declared class of the method reference.
    pub fn resolve_invoke(&self, invoke: &Invoke, recv_ty: Option<TypeId>) -> Option<MethodId> {
        match invoke.kind {
            CallKind::Static | CallKind::Special => self.dispatch(None, &invoke.method_ref),
            CallKind::Virtual | CallKind::Interface => self.dispatch(recv_ty, &invoke.method_ref),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
