// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The taint-rule document.
//!
//! A YAML file with three arrays: `sources`, `sinks` and `transfers`.
//! Methods are named by signature (`Class.method` or `<Class: method>`),
//! taint types by class name, and transfer endpoints are the literal
//! tokens `base` / `result` or a non-negative argument index.
//!
//! Structural problems fail eagerly; this is the only fatal path of the
//! analysis. Rules naming methods or types the world does not know are
//! skipped with a warning, so one configuration can serve many programs.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use log::*;
use serde::Deserialize;
use thiserror::Error;

use crate::ir::{MethodId, TypeId, World};

#[derive(Error, Debug)]
pub enum TaintConfigError {
    #[error("failed to read taint config `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse taint config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid transfer endpoint `{0}`: expected `base`, `result` or a non-negative index")]
    BadEndpoint(String),

    #[error("negative argument index {0}")]
    NegativeIndex(i64),
}

/// A taint-carrying position at a call site.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TransferPoint {
    Base,
    Result,
    Arg(usize),
}

impl fmt::Display for TransferPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPoint::Base => write!(f, "base"),
            TransferPoint::Result => write!(f, "result"),
            TransferPoint::Arg(i) => write!(f, "{i}"),
        }
    }
}

/// A taint transfer through a call: taint at `from` reappears at `to`,
/// retyped to `ty`.
#[derive(Copy, Clone, Debug)]
pub struct TaintTransfer {
    pub from: TransferPoint,
    pub to: TransferPoint,
    pub ty: TypeId,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    sinks: Vec<RawSink>,
    #[serde(default)]
    transfers: Vec<RawTransfer>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    method: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct RawSink {
    method: String,
    index: i64,
}

#[derive(Debug, Deserialize)]
struct RawTransfer {
    method: String,
    from: RawPoint,
    to: RawPoint,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Index(i64),
    Token(String),
}

impl RawPoint {
    fn resolve(&self) -> Result<TransferPoint, TaintConfigError> {
        match self {
            RawPoint::Index(i) if *i >= 0 => Ok(TransferPoint::Arg(*i as usize)),
            RawPoint::Index(i) => Err(TaintConfigError::NegativeIndex(*i)),
            RawPoint::Token(tok) => match tok.as_str() {
                "base" => Ok(TransferPoint::Base),
                "result" => Ok(TransferPoint::Result),
                _ => Err(TaintConfigError::BadEndpoint(tok.clone())),
            },
        }
    }
}

/// The resolved taint rules, keyed by callee method.
#[derive(Debug, Default)]
pub struct TaintConfig {
    sources: HashMap<MethodId, Vec<TypeId>>,
    sinks: HashMap<MethodId, Vec<usize>>,
    transfers: HashMap<MethodId, Vec<TaintTransfer>>,
}

impl TaintConfig {
    /// Reads and resolves a taint-rule document.
    pub fn load(path: impl AsRef<Path>, world: &World) -> Result<Self, TaintConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TaintConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, world)
    }

    /// Resolves a taint-rule document given as text.
    pub fn parse(text: &str, world: &World) -> Result<Self, TaintConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        let mut config = TaintConfig::default();

        for source in &raw.sources {
            let (Some(method), Some(ty)) = (
                lookup_method(world, &source.method),
                lookup_type(world, &source.ty),
            ) else {
                continue;
            };
            config.sources.entry(method).or_default().push(ty);
        }

        for sink in &raw.sinks {
            if sink.index < 0 {
                return Err(TaintConfigError::NegativeIndex(sink.index));
            }
            let Some(method) = lookup_method(world, &sink.method) else {
                continue;
            };
            let sinks = config.sinks.entry(method).or_default();
            let index = sink.index as usize;
            if !sinks.contains(&index) {
                sinks.push(index);
            }
        }

        for transfer in &raw.transfers {
            let from = transfer.from.resolve()?;
            let to = transfer.to.resolve()?;
            let (Some(method), Some(ty)) = (
                lookup_method(world, &transfer.method),
                lookup_type(world, &transfer.ty),
            ) else {
                continue;
            };
            config
                .transfers
                .entry(method)
                .or_default()
                .push(TaintTransfer { from, to, ty });
        }

        info!(
            "taint config: {} source rules, {} sink rules, {} transfer rules",
            config.sources.values().map(Vec::len).sum::<usize>(),
            config.sinks.values().map(Vec::len).sum::<usize>(),
            config.transfers.values().map(Vec::len).sum::<usize>(),
        );
        Ok(config)
    }

    pub fn sources_of(&self, method: MethodId) -> &[TypeId] {
        self.sources.get(&method).map_or(&[], Vec::as_slice)
    }

    pub fn sinks_of(&self, method: MethodId) -> &[usize] {
        self.sinks.get(&method).map_or(&[], Vec::as_slice)
    }

    pub fn transfers_of(&self, method: MethodId) -> &[TaintTransfer] {
        self.transfers.get(&method).map_or(&[], Vec::as_slice)
    }
}

fn lookup_method(world: &World, sig: &str) -> Option<MethodId> {
    let method = world.lookup_method(sig);
    if method.is_none() {
        warn!("taint config names unknown method `{sig}`, rule skipped");
    }
    method
}

fn lookup_type(world: &World, name: &str) -> Option<TypeId> {
    let ty = world.lookup_class(name).map(|c| world.class_type(c));
    if ty.is_none() {
        warn!("taint config names unknown type `{name}`, rule skipped");
    }
    ty
}
