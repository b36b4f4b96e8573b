// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use crate::ir::world::{ClassId, FieldId, MethodId, TypeId};
use crate::util::new_index;

new_index! {
    /// The unique identifier of a variable in the world's variable arena.
    pub struct VarId
}

new_index! {
    /// The unique identifier of a statement. Statement ids are assigned in
    /// program order, which makes them a total order for result sorting.
    pub struct StmtId
}

/// A local variable, parameter, `this`, or return-value temporary.
///
/// Besides its declaration, a variable carries the relevant-statement
/// indices the solver consults when the variable's points-to set grows.
#[derive(Debug)]
pub struct Var {
    pub method: MethodId,
    pub name: String,
    pub ty: TypeId,

    pub(crate) store_fields: Vec<StmtId>,
    pub(crate) load_fields: Vec<StmtId>,
    pub(crate) store_arrays: Vec<StmtId>,
    pub(crate) load_arrays: Vec<StmtId>,
    pub(crate) invokes: Vec<StmtId>,
    pub(crate) arg_invokes: Vec<StmtId>,
}

impl Var {
    pub(crate) fn new(method: MethodId, name: String, ty: TypeId) -> Self {
        Var {
            method,
            name,
            ty,
            store_fields: Vec::new(),
            load_fields: Vec::new(),
            store_arrays: Vec::new(),
            load_arrays: Vec::new(),
            invokes: Vec::new(),
            arg_invokes: Vec::new(),
        }
    }

    /// Instance field stores with this variable as the base.
    pub fn store_fields(&self) -> &[StmtId] {
        &self.store_fields
    }

    /// Instance field loads with this variable as the base.
    pub fn load_fields(&self) -> &[StmtId] {
        &self.load_fields
    }

    /// Array stores with this variable as the array base.
    pub fn store_arrays(&self) -> &[StmtId] {
        &self.store_arrays
    }

    /// Array loads with this variable as the array base.
    pub fn load_arrays(&self) -> &[StmtId] {
        &self.load_arrays
    }

    /// Invokes with this variable as the receiver.
    pub fn invokes(&self) -> &[StmtId] {
        &self.invokes
    }

    /// Invokes with this variable in an argument position.
    pub fn arg_invokes(&self) -> &[StmtId] {
        &self.arg_invokes
    }
}

/// How a call site is dispatched.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

/// A symbolic method reference at a call site: the declared class and the
/// method name. The modelled language has no overloading, so the pair
/// identifies a method within a hierarchy.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodRef {
    pub class: ClassId,
    pub name: String,
}

impl MethodRef {
    pub fn new(class: ClassId, name: impl Into<String>) -> Self {
        MethodRef {
            class,
            name: name.into(),
        }
    }
}

/// A call site.
#[derive(Clone, Debug)]
pub struct Invoke {
    pub kind: CallKind,
    /// The variable receiving the call's result, if any.
    pub result: Option<VarId>,
    /// The receiver variable; `None` for static calls.
    pub base: Option<VarId>,
    pub method_ref: MethodRef,
    pub args: Vec<VarId>,
}

/// A statement together with its containing method.
#[derive(Debug)]
pub struct Stmt {
    pub method: MethodId,
    pub kind: StmtKind,
}

/// The statement shapes the pointer analysis distinguishes. Control flow
/// and primitive computation are opaque to the solver and collapse to
/// `Nop`; they matter only to the excluded dataflow collaborators.
#[derive(Debug)]
pub enum StmtKind {
    /// `x = new T()`
    New { lhs: VarId, ty: TypeId },
    /// `x = y`
    Copy { lhs: VarId, rhs: VarId },
    /// `x = y.f` (instance) or `x = T.f` (static, `base` is `None`)
    LoadField {
        lhs: VarId,
        base: Option<VarId>,
        field: FieldId,
    },
    /// `y.f = x` (instance) or `T.f = x` (static, `base` is `None`)
    StoreField {
        base: Option<VarId>,
        field: FieldId,
        rhs: VarId,
    },
    /// `x = y[*]` — a single summarized index per array object
    LoadArray { lhs: VarId, base: VarId },
    /// `y[*] = x`
    StoreArray { base: VarId, rhs: VarId },
    Invoke(Invoke),
    Return { value: Option<VarId> },
    Nop,
}

impl Stmt {
    pub fn as_invoke(&self) -> Option<&Invoke> {
        match &self.kind {
            StmtKind::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }
}
