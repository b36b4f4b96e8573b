// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The three-address IR of the analyzed bytecode language, plus the world
//! that owns the class hierarchy and the dispatch oracle.
//!
//! Parsing and IR construction are host concerns; hosts (and tests) build
//! programs through [`builder::MethodBuilder`] and the `World` methods.

pub mod builder;
pub mod stmt;
pub mod world;

pub use stmt::{CallKind, Invoke, MethodRef, Stmt, StmtId, StmtKind, Var, VarId};
pub use world::{Class, ClassId, Field, FieldId, Method, MethodId, TypeId, TypeKind, World};
