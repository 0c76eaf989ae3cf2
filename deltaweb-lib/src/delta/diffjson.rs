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

//! A text oriented delta format, negotiated as `diffjson`.
//!
//! A patch is a JSON array of operations applied in order to build the target:
//!
//! ```json
//! [{"copy": {"start": 0, "len": 24}}, {"insert": "2"}, {"copy": {"start": 25, "len": 40}}]
//! ```
//!
//! Only UTF-8 targets can be encoded. Binary content is an encoding error, which
//! the responder treats like any other engine failure (full response).

use serde::{Deserialize, Serialize};

use super::matcher::{match_blocks, Instruction, MIN_MATCH};
use super::{DeltaError, DiffEngine, DIFFJSON_TOKEN};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Copy `len` bytes of the base starting at byte offset `start`
    Copy { start: usize, len: usize },
    /// Literal text
    Insert(String),
}

/// The `diffjson` diff engine
#[derive(Debug, Clone, Default)]
pub struct DiffJsonEngine {}

impl DiffJsonEngine {
    pub fn new() -> Self {
        DiffJsonEngine {}
    }
}

impl DiffEngine for DiffJsonEngine {
    fn token(&self) -> &str {
        DIFFJSON_TOKEN
    }

    fn encode(&self, base: &[u8], target: &[u8]) -> Result<Vec<u8>, DeltaError> {
        let ops = patch_ops(base, target)?;
        serde_json::to_vec(&ops).map_err(|e| DeltaError::Json(e.to_string()))
    }

    fn apply(&self, base: &[u8], patch: &[u8]) -> Result<Vec<u8>, DeltaError> {
        let ops: Vec<PatchOp> =
            serde_json::from_slice(patch).map_err(|e| DeltaError::Json(e.to_string()))?;

        let mut target = Vec::new();
        for op in ops {
            match op {
                PatchOp::Copy { start, len } => {
                    let copied = start
                        .checked_add(len)
                        .and_then(|end| base.get(start..end))
                        .ok_or(DeltaError::AddressOutOfRange {
                            address: start as u64,
                            limit: base.len() as u64,
                        })?;
                    target.extend_from_slice(copied);
                }
                PatchOp::Insert(text) => target.extend_from_slice(text.as_bytes()),
            }
        }
        Ok(target)
    }
}

/// Build the operations for a patch, keeping every insert on UTF-8 character boundaries
pub fn patch_ops(base: &[u8], target: &[u8]) -> Result<Vec<PatchOp>, DeltaError> {
    let text = std::str::from_utf8(target).map_err(|e| DeltaError::NotText(e.valid_up_to()))?;

    let mut ops = Vec::new();
    let mut literal_from: Option<usize> = None;
    let mut position = 0;

    for instruction in match_blocks(base, target) {
        match instruction {
            Instruction::Add { len, .. } => {
                literal_from.get_or_insert(position);
                position += len;
            }
            Instruction::Copy {
                start: base_start,
                len,
            } => {
                let copy_start = position;
                let copy_end = position + len;
                position = copy_end;

                // A match can begin or end inside a multi-byte character
                let mut start = copy_start;
                let mut end = copy_end;
                while start < end && !text.is_char_boundary(start) {
                    start += 1;
                }
                while end > start && !text.is_char_boundary(end) {
                    end -= 1;
                }
                if end - start < MIN_MATCH {
                    literal_from.get_or_insert(copy_start);
                    continue;
                }
                if start > copy_start {
                    literal_from.get_or_insert(copy_start);
                }
                if let Some(from) = literal_from.take() {
                    ops.push(PatchOp::Insert(slice(text, from, start)?));
                }
                ops.push(PatchOp::Copy {
                    start: base_start + (start - copy_start),
                    len: end - start,
                });
                if end < copy_end {
                    literal_from = Some(end);
                }
            }
        }
    }

    if let Some(from) = literal_from {
        ops.push(PatchOp::Insert(slice(text, from, text.len())?));
    }
    Ok(ops)
}

fn slice(text: &str, from: usize, to: usize) -> Result<String, DeltaError> {
    text.get(from..to)
        .map(str::to_string)
        .ok_or(DeltaError::NotText(from))
}
