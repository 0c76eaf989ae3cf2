/*
 Copyright (c) 2025 Mark Hughes

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as published by
 the Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

//! Diff engines used to compute and apply deltas between versions.
//!
//! An engine is identified on the wire by its instance-manipulation token,
//! which is what clients list in `A-IM` and what the server echoes in `IM`.

pub mod diffjson;
pub mod matcher;
pub mod vcdiff;

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

pub use diffjson::DiffJsonEngine;
pub use vcdiff::VcdiffEngine;

pub const VCDIFF_TOKEN: &str = "vcdiff";
pub const DIFFJSON_TOKEN: &str = "diffjson";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    #[error("not a vcdiff stream (bad magic)")]
    BadMagic,
    #[error("unsupported delta feature: {0}")]
    Unsupported(String),
    #[error("delta truncated while reading {0}")]
    Truncated(&'static str),
    #[error("invalid delta: {0}")]
    Invalid(String),
    #[error("delta address {address} out of range (limit {limit})")]
    AddressOutOfRange { address: u64, limit: u64 },
    #[error("delta would produce {size} bytes, more than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("target size mismatch: expected {expected} bytes, produced {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("invalid JSON patch: {0}")]
    Json(String),
    #[error("content is not valid UTF-8 text at byte {0}")]
    NotText(usize),
    #[error("delta does not reproduce the current version")]
    Inconsistent,
}

/// Computes patches between two byte sequences and applies them.
///
/// Implementations must guarantee `apply(base, encode(base, target)) == target`.
pub trait DiffEngine: Send + Sync {
    /// The instance-manipulation token naming this format in `A-IM` / `IM`
    fn token(&self) -> &str;

    fn encode(&self, base: &[u8], target: &[u8]) -> Result<Vec<u8>, DeltaError>;

    fn apply(&self, base: &[u8], patch: &[u8]) -> Result<Vec<u8>, DeltaError>;
}

/// The engines shipped with deltaweb, selectable by token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Vcdiff,
    DiffJson,
}

impl EngineKind {
    pub fn token(&self) -> &'static str {
        match self {
            EngineKind::Vcdiff => VCDIFF_TOKEN,
            EngineKind::DiffJson => DIFFJSON_TOKEN,
        }
    }

    pub fn new_engine(&self) -> Arc<dyn DiffEngine> {
        match self {
            EngineKind::Vcdiff => Arc::new(VcdiffEngine::new()),
            EngineKind::DiffJson => Arc::new(DiffJsonEngine::new()),
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim() {
            VCDIFF_TOKEN => Ok(EngineKind::Vcdiff),
            DIFFJSON_TOKEN => Ok(EngineKind::DiffJson),
            other => Err(format!(
                "unknown delta engine '{other}' (expected '{VCDIFF_TOKEN}' or '{DIFFJSON_TOKEN}')"
            )),
        }
    }
}

impl Display for EngineKind {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{}", self.token())
    }
}
