// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Programmatic construction of method bodies.
//!
//! The builder appends statements to the world's arenas and wires the
//! per-variable relevant-statement indices as it goes, so a finished world
//! is immediately analyzable.

use crate::ir::stmt::{CallKind, Invoke, MethodRef, Stmt, StmtId, StmtKind, Var, VarId};
use crate::ir::world::{ClassId, FieldId, Method, MethodId, TypeId, World};

pub struct MethodBuilder<'w> {
    world: &'w mut World,
    method: MethodId,
}

impl<'w> MethodBuilder<'w> {
    /// Starts an instance method. A `this` variable of the declaring class
    /// type is created implicitly.
    pub fn instance(world: &'w mut World, class: ClassId, name: impl Into<String>) -> Self {
        let mut b = Self::start(world, class, name, false, false);
        let class_ty = b.world.class_type(class);
        let this_var = b.fresh_var("this", class_ty);
        b.world.methods[b.method].this_var = Some(this_var);
        b
    }

    /// Starts a static method.
    pub fn static_method(world: &'w mut World, class: ClassId, name: impl Into<String>) -> Self {
        Self::start(world, class, name, true, false)
    }

    /// Declares an abstract method; it has no body and cannot be built
    /// further except for parameters.
    pub fn abstract_method(world: &'w mut World, class: ClassId, name: impl Into<String>) -> Self {
        Self::start(world, class, name, false, true)
    }

    fn start(
        world: &'w mut World,
        class: ClassId,
        name: impl Into<String>,
        is_static: bool,
        is_abstract: bool,
    ) -> Self {
        let method = world.methods.push(Method {
            class,
            name: name.into(),
            is_static,
            is_abstract,
            this_var: None,
            params: Vec::new(),
            return_vars: Vec::new(),
            stmts: Vec::new(),
        });
        world.classes[class].methods.push(method);
        MethodBuilder { world, method }
    }

    pub fn id(&self) -> MethodId {
        self.method
    }

    /// The implicit `this` variable of an instance method.
    pub fn this(&self) -> VarId {
        self.world.methods[self.method]
            .this_var
            .expect("static or abstract method has no `this`")
    }

    /// Declares a parameter. Parameters are positional in declaration
    /// order; argument-to-parameter edges pair them up by position.
    pub fn param(&mut self, name: impl Into<String>, ty: TypeId) -> VarId {
        let var = self.fresh_var(name, ty);
        self.world.methods[self.method].params.push(var);
        var
    }

    /// Declares a local variable.
    pub fn var(&mut self, name: impl Into<String>, ty: TypeId) -> VarId {
        self.fresh_var(name, ty)
    }

    /// `lhs = new T()`
    pub fn new_obj(&mut self, lhs: VarId, ty: TypeId) -> StmtId {
        self.push_stmt(StmtKind::New { lhs, ty })
    }

    /// `lhs = rhs`
    pub fn copy(&mut self, lhs: VarId, rhs: VarId) -> StmtId {
        self.push_stmt(StmtKind::Copy { lhs, rhs })
    }

    /// `lhs = base.field`
    pub fn load_field(&mut self, lhs: VarId, base: VarId, field: FieldId) -> StmtId {
        let stmt = self.push_stmt(StmtKind::LoadField {
            lhs,
            base: Some(base),
            field,
        });
        self.world.vars[base].load_fields.push(stmt);
        stmt
    }

    /// `base.field = rhs`
    pub fn store_field(&mut self, base: VarId, field: FieldId, rhs: VarId) -> StmtId {
        let stmt = self.push_stmt(StmtKind::StoreField {
            base: Some(base),
            field,
            rhs,
        });
        self.world.vars[base].store_fields.push(stmt);
        stmt
    }

    /// `lhs = T.field`
    pub fn load_static(&mut self, lhs: VarId, field: FieldId) -> StmtId {
        self.push_stmt(StmtKind::LoadField {
            lhs,
            base: None,
            field,
        })
    }

    /// `T.field = rhs`
    pub fn store_static(&mut self, field: FieldId, rhs: VarId) -> StmtId {
        self.push_stmt(StmtKind::StoreField {
            base: None,
            field,
            rhs,
        })
    }

    /// `lhs = base[*]`
    pub fn load_array(&mut self, lhs: VarId, base: VarId) -> StmtId {
        let stmt = self.push_stmt(StmtKind::LoadArray { lhs, base });
        self.world.vars[base].load_arrays.push(stmt);
        stmt
    }

    /// `base[*] = rhs`
    pub fn store_array(&mut self, base: VarId, rhs: VarId) -> StmtId {
        let stmt = self.push_stmt(StmtKind::StoreArray { base, rhs });
        self.world.vars[base].store_arrays.push(stmt);
        stmt
    }

    pub fn invoke_virtual(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method_ref: MethodRef,
        args: Vec<VarId>,
    ) -> StmtId {
        self.push_invoke(CallKind::Virtual, result, Some(base), method_ref, args)
    }

    pub fn invoke_interface(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method_ref: MethodRef,
        args: Vec<VarId>,
    ) -> StmtId {
        self.push_invoke(CallKind::Interface, result, Some(base), method_ref, args)
    }

    pub fn invoke_special(
        &mut self,
        result: Option<VarId>,
        base: VarId,
        method_ref: MethodRef,
        args: Vec<VarId>,
    ) -> StmtId {
        self.push_invoke(CallKind::Special, result, Some(base), method_ref, args)
    }

    pub fn invoke_static(
        &mut self,
        result: Option<VarId>,
        method_ref: MethodRef,
        args: Vec<VarId>,
    ) -> StmtId {
        self.push_invoke(CallKind::Static, result, None, method_ref, args)
    }

    /// `return value`
    pub fn ret(&mut self, value: Option<VarId>) -> StmtId {
        if let Some(v) = value {
            let method = &mut self.world.methods[self.method];
            if !method.return_vars.contains(&v) {
                method.return_vars.push(v);
            }
        }
        self.push_stmt(StmtKind::Return { value })
    }

    /// A statement shape the pointer analysis ignores.
    pub fn nop(&mut self) -> StmtId {
        self.push_stmt(StmtKind::Nop)
    }

    pub fn finish(self) -> MethodId {
        self.method
    }

    fn fresh_var(&mut self, name: impl Into<String>, ty: TypeId) -> VarId {
        self.world.vars.push(Var::new(self.method, name.into(), ty))
    }

    fn push_invoke(
        &mut self,
        kind: CallKind,
        result: Option<VarId>,
        base: Option<VarId>,
        method_ref: MethodRef,
        args: Vec<VarId>,
    ) -> StmtId {
        let invoke = Invoke {
            kind,
            result,
            base,
            method_ref,
            args: args.clone(),
        };
        let stmt = self.push_stmt(StmtKind::Invoke(invoke));
        if let Some(base) = base {
            self.world.vars[base].invokes.push(stmt);
        }
        for arg in args {
            let arg_invokes = &mut self.world.vars[arg].arg_invokes;
            // A variable passed in several positions still names one invoke.
            if arg_invokes.last() != Some(&stmt) {
                arg_invokes.push(stmt);
            }
        }
        stmt
    }

    fn push_stmt(&mut self, kind: StmtKind) -> StmtId {
        assert!(
            !self.world.methods[self.method].is_abstract,
            "abstract method {:?} cannot have a body",
            self.method
        );
        let stmt = self.world.stmts.push(Stmt {
            method: self.method,
            kind,
        });
        self.world.methods[self.method].stmts.push(stmt);
        stmt
    }
}
