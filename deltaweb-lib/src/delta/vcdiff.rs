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

//! VCDIFF (RFC 3284) delta encoding, negotiated as `vcdiff`.
//!
//! The encoder writes a single window whose source segment is the whole
//! base, using ADD and COPY (VCD_SELF addressing) from the default code
//! table. The decoder accepts anything expressible with the default code
//! table: RUN, paired instructions, every address mode and target windows
//! that use an earlier part of the target as their source segment.
//!
//! Secondary compression and custom code tables are not supported.

use std::borrow::Cow;
use std::sync::LazyLock;

use super::matcher::{match_blocks, Instruction};
use super::{DeltaError, DiffEngine, VCDIFF_TOKEN};

const MAGIC: [u8; 4] = [0xD6, 0xC3, 0xC4, 0x00];

/// Largest target a delta may decode to, across all of its windows
pub const MAX_TARGET_SIZE: u64 = 1 << 30;

// Header indicator bits
const VCD_DECOMPRESS: u8 = 0x01;
const VCD_CODETABLE: u8 = 0x02;
const VCD_APPHEADER: u8 = 0x04;

// Window indicator bits
const VCD_SOURCE: u8 = 0x01;
const VCD_TARGET: u8 = 0x02;

// Instruction types
const NOOP: u8 = 0;
const ADD: u8 = 1;
const RUN: u8 = 2;
const COPY: u8 = 3;

// Address cache dimensions for the default code table
const NEAR_SIZE: usize = 4;
const SAME_SIZE: usize = 3;

// Opcodes used by the encoder (default code table)
const ADD_EXPLICIT_SIZE: u8 = 1;
const ADD_MAX_IMPLICIT: usize = 17;
const COPY_SELF_EXPLICIT_SIZE: u8 = 19;
const COPY_MIN_IMPLICIT: usize = 4;
const COPY_MAX_IMPLICIT: usize = 18;

#[derive(Debug, Clone, Copy, Default)]
struct CodeEntry {
    inst1: u8,
    size1: u8,
    mode1: u8,
    inst2: u8,
    size2: u8,
    mode2: u8,
}

static CODE_TABLE: LazyLock<[CodeEntry; 256]> = LazyLock::new(default_code_table);

/// Build the RFC 3284 default instruction code table (section 5.6)
fn default_code_table() -> [CodeEntry; 256] {
    let mut table = [CodeEntry::default(); 256];
    let single = |inst: u8, size: u8, mode: u8| CodeEntry {
        inst1: inst,
        size1: size,
        mode1: mode,
        ..CodeEntry::default()
    };
    let pair = |inst1: u8, size1: u8, mode1: u8, inst2: u8, size2: u8, mode2: u8| CodeEntry {
        inst1,
        size1,
        mode1,
        inst2,
        size2,
        mode2,
    };

    let mut index = 0;
    table[index] = single(RUN, 0, 0);
    index += 1;

    for size in 0..=17 {
        table[index] = single(ADD, size, 0);
        index += 1;
    }

    for mode in 0..9 {
        table[index] = single(COPY, 0, mode);
        index += 1;
        for size in 4..=18 {
            table[index] = single(COPY, size, mode);
            index += 1;
        }
    }

    for mode in 0..6 {
        for add_size in 1..=4 {
            for copy_size in 4..=6 {
                table[index] = pair(ADD, add_size, 0, COPY, copy_size, mode);
                index += 1;
            }
        }
    }

    for mode in 6..9 {
        for add_size in 1..=4 {
            table[index] = pair(ADD, add_size, 0, COPY, 4, mode);
            index += 1;
        }
    }

    for mode in 0..9 {
        table[index] = pair(COPY, 4, mode, ADD, 1, 0);
        index += 1;
    }

    debug_assert_eq!(index, 256);
    table
}

/// The `vcdiff` diff engine
#[derive(Debug, Clone, Default)]
pub struct VcdiffEngine {}

impl VcdiffEngine {
    pub fn new() -> Self {
        VcdiffEngine {}
    }
}

impl DiffEngine for VcdiffEngine {
    fn token(&self) -> &str {
        VCDIFF_TOKEN
    }

    fn encode(&self, base: &[u8], target: &[u8]) -> Result<Vec<u8>, DeltaError> {
        Ok(encode(base, target))
    }

    fn apply(&self, base: &[u8], patch: &[u8]) -> Result<Vec<u8>, DeltaError> {
        decode(base, patch)
    }
}

pub fn encode(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut instructions = Vec::new();
    let mut addresses = Vec::new();

    for instruction in match_blocks(base, target) {
        match instruction {
            Instruction::Add { start, len } => {
                data.extend_from_slice(&target[start..start + len]);
                if (1..=ADD_MAX_IMPLICIT).contains(&len) {
                    instructions.push((len + 1) as u8);
                } else {
                    instructions.push(ADD_EXPLICIT_SIZE);
                    write_varint(&mut instructions, len as u64);
                }
            }
            Instruction::Copy { start, len } => {
                if (COPY_MIN_IMPLICIT..=COPY_MAX_IMPLICIT).contains(&len) {
                    instructions.push((len + 16) as u8);
                } else {
                    instructions.push(COPY_SELF_EXPLICIT_SIZE);
                    write_varint(&mut instructions, len as u64);
                }
                write_varint(&mut addresses, start as u64);
            }
        }
    }

    let mut encoding = Vec::with_capacity(data.len() + instructions.len() + addresses.len() + 16);
    write_varint(&mut encoding, target.len() as u64);
    encoding.push(0); // Delta_Indicator: no secondary compression
    write_varint(&mut encoding, data.len() as u64);
    write_varint(&mut encoding, instructions.len() as u64);
    write_varint(&mut encoding, addresses.len() as u64);
    encoding.extend_from_slice(&data);
    encoding.extend_from_slice(&instructions);
    encoding.extend_from_slice(&addresses);

    let mut delta = Vec::with_capacity(encoding.len() + 16);
    delta.extend_from_slice(&MAGIC);
    delta.push(0); // Hdr_Indicator
    if base.is_empty() {
        delta.push(0);
    } else {
        delta.push(VCD_SOURCE);
        write_varint(&mut delta, base.len() as u64);
        write_varint(&mut delta, 0);
    }
    write_varint(&mut delta, encoding.len() as u64);
    delta.extend_from_slice(&encoding);
    delta
}

pub fn decode(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, DeltaError> {
    let mut reader = Reader::new(delta, "header");
    if reader.take(MAGIC.len()).map_err(|_| DeltaError::BadMagic)? != MAGIC.as_slice() {
        return Err(DeltaError::BadMagic);
    }

    let indicator = reader.byte()?;
    if indicator & VCD_DECOMPRESS != 0 {
        return Err(DeltaError::Unsupported("secondary compression".to_string()));
    }
    if indicator & VCD_CODETABLE != 0 {
        return Err(DeltaError::Unsupported("custom code table".to_string()));
    }
    if indicator & !(VCD_DECOMPRESS | VCD_CODETABLE | VCD_APPHEADER) != 0 {
        return Err(DeltaError::Invalid(format!(
            "unknown header indicator {indicator:#04x}"
        )));
    }
    if indicator & VCD_APPHEADER != 0 {
        let len = to_usize(reader.varint()?)?;
        reader.take(len)?;
    }

    let mut target = Vec::new();
    while !reader.is_empty() {
        decode_window(&mut reader, base, &mut target)?;
    }
    Ok(target)
}

fn decode_window(reader: &mut Reader, base: &[u8], target: &mut Vec<u8>) -> Result<(), DeltaError> {
    reader.section = "window header";
    let indicator = reader.byte()?;
    if indicator & !(VCD_SOURCE | VCD_TARGET) != 0 {
        return Err(DeltaError::Unsupported(format!(
            "window indicator {indicator:#04x}"
        )));
    }
    if indicator & VCD_SOURCE != 0 && indicator & VCD_TARGET != 0 {
        return Err(DeltaError::Invalid(
            "window declares both source and target segments".to_string(),
        ));
    }

    let segment: Cow<[u8]> = if indicator & (VCD_SOURCE | VCD_TARGET) != 0 {
        let len = to_usize(reader.varint()?)?;
        let position = to_usize(reader.varint()?)?;
        let available: &[u8] = if indicator & VCD_SOURCE != 0 {
            base
        } else {
            &target[..]
        };
        let end = position
            .checked_add(len)
            .filter(|end| *end <= available.len())
            .ok_or(DeltaError::AddressOutOfRange {
                address: position as u64,
                limit: available.len() as u64,
            })?;
        if indicator & VCD_SOURCE != 0 {
            Cow::Borrowed(&base[position..end])
        } else {
            Cow::Owned(target[position..end].to_vec())
        }
    } else {
        Cow::Borrowed(&[])
    };

    let encoding_len = to_usize(reader.varint()?)?;
    let mut encoding = Reader::new(reader.take(encoding_len)?, "delta encoding");
    let target_len = encoding.varint()?;
    let decoded = target.len() as u64;
    if target_len > MAX_TARGET_SIZE.saturating_sub(decoded) {
        return Err(DeltaError::TooLarge {
            size: decoded.saturating_add(target_len),
            limit: MAX_TARGET_SIZE,
        });
    }
    if encoding.byte()? != 0 {
        return Err(DeltaError::Unsupported(
            "compressed delta sections".to_string(),
        ));
    }
    let data_len = to_usize(encoding.varint()?)?;
    let instructions_len = to_usize(encoding.varint()?)?;
    let addresses_len = to_usize(encoding.varint()?)?;
    let mut data = Reader::new(encoding.take(data_len)?, "data section");
    let mut instructions = Reader::new(encoding.take(instructions_len)?, "instructions section");
    let mut addresses = Reader::new(encoding.take(addresses_len)?, "addresses section");
    if !encoding.is_empty() {
        return Err(DeltaError::Invalid(
            "trailing bytes after delta encoding sections".to_string(),
        ));
    }

    let window_start = target.len();
    let segment_len = segment.len() as u64;
    let mut cache = AddressCache::new();
    let table = &*CODE_TABLE;

    while !instructions.is_empty() {
        let entry = table[usize::from(instructions.byte()?)];
        for (inst, size, mode) in [
            (entry.inst1, entry.size1, entry.mode1),
            (entry.inst2, entry.size2, entry.mode2),
        ] {
            if inst == NOOP {
                continue;
            }
            let size = if size == 0 {
                instructions.varint()?
            } else {
                u64::from(size)
            };
            let written = (target.len() - window_start) as u64;
            if written.saturating_add(size) > target_len {
                return Err(DeltaError::SizeMismatch {
                    expected: target_len,
                    actual: written.saturating_add(size),
                });
            }
            let count = to_usize(size)?;
            target.try_reserve(count).map_err(|_| DeltaError::TooLarge {
                size: written.saturating_add(size),
                limit: MAX_TARGET_SIZE,
            })?;

            match inst {
                ADD => target.extend_from_slice(data.take(count)?),
                RUN => {
                    let byte = data.byte()?;
                    target.resize(target.len() + count, byte);
                }
                COPY => {
                    let here = segment_len + written;
                    let address = cache.decode(here, mode, &mut addresses)?;
                    copy_from(&segment, target, window_start, address, count)?;
                }
                _ => {
                    return Err(DeltaError::Invalid(format!("instruction type {inst}")));
                }
            }
        }
    }

    let produced = (target.len() - window_start) as u64;
    if produced != target_len {
        return Err(DeltaError::SizeMismatch {
            expected: target_len,
            actual: produced,
        });
    }
    Ok(())
}

/// Copy `count` bytes starting at `address` in the combined (segment, window) address space.
///
/// Bytes past the segment come from this window, which may overlap the copy
/// itself. Reading a byte not yet written is an error.
fn copy_from(
    segment: &[u8],
    target: &mut Vec<u8>,
    window_start: usize,
    address: u64,
    count: usize,
) -> Result<(), DeltaError> {
    let segment_len = segment.len();
    let out_of_range = || DeltaError::AddressOutOfRange {
        address,
        limit: segment_len as u64,
    };
    let start = usize::try_from(address).map_err(|_| out_of_range())?;
    let end = start.checked_add(count).ok_or_else(out_of_range)?;
    if end <= segment_len {
        target.extend_from_slice(&segment[start..end]);
        return Ok(());
    }
    for position in start..end {
        let byte = if position < segment_len {
            segment[position]
        } else {
            *target
                .get(window_start + (position - segment_len))
                .ok_or_else(out_of_range)?
        };
        target.push(byte);
    }
    Ok(())
}

struct AddressCache {
    near: [u64; NEAR_SIZE],
    next_slot: usize,
    same: [u64; SAME_SIZE * 256],
}

impl AddressCache {
    fn new() -> Self {
        AddressCache {
            near: [0; NEAR_SIZE],
            next_slot: 0,
            same: [0; SAME_SIZE * 256],
        }
    }

    fn decode(&mut self, here: u64, mode: u8, addresses: &mut Reader) -> Result<u64, DeltaError> {
        let mode = usize::from(mode);
        let address = match mode {
            0 => addresses.varint()?,
            1 => here
                .checked_sub(addresses.varint()?)
                .ok_or_else(|| DeltaError::Invalid("VCD_HERE offset beyond start".to_string()))?,
            m if m < 2 + NEAR_SIZE => self.near[m - 2]
                .checked_add(addresses.varint()?)
                .ok_or_else(|| DeltaError::Invalid("near address overflow".to_string()))?,
            m if m < 2 + NEAR_SIZE + SAME_SIZE => {
                let byte = usize::from(addresses.byte()?);
                self.same[(m - 2 - NEAR_SIZE) * 256 + byte]
            }
            _ => return Err(DeltaError::Invalid(format!("address mode {mode}"))),
        };

        if address >= here {
            return Err(DeltaError::AddressOutOfRange {
                address,
                limit: here,
            });
        }
        self.update(address);
        Ok(address)
    }

    fn update(&mut self, address: u64) {
        self.near[self.next_slot] = address;
        self.next_slot = (self.next_slot + 1) % NEAR_SIZE;
        self.same[(address % (SAME_SIZE as u64 * 256)) as usize] = address;
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
    section: &'static str,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], section: &'static str) -> Self {
        Reader {
            bytes,
            position: 0,
            section,
        }
    }

    fn is_empty(&self) -> bool {
        self.position >= self.bytes.len()
    }

    fn byte(&mut self) -> Result<u8, DeltaError> {
        let byte = *self
            .bytes
            .get(self.position)
            .ok_or(DeltaError::Truncated(self.section))?;
        self.position += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DeltaError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DeltaError::Truncated(self.section))?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Read a big-endian base 128 integer
    fn varint(&mut self) -> Result<u64, DeltaError> {
        let mut value: u64 = 0;
        loop {
            let byte = self.byte()?;
            if value > (u64::MAX >> 7) {
                return Err(DeltaError::Invalid(format!(
                    "integer overflow in {}",
                    self.section
                )));
            }
            value = (value << 7) | u64::from(byte & 0x7f);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
    }
}

/// Write a big-endian base 128 integer
fn write_varint(out: &mut Vec<u8>, value: u64) {
    let mut buffer = [0u8; 10];
    let mut start = buffer.len() - 1;
    let mut value = value;
    buffer[start] = (value & 0x7f) as u8;
    value >>= 7;
    while value > 0 {
        start -= 1;
        buffer[start] = 0x80 | (value & 0x7f) as u8;
        value >>= 7;
    }
    out.extend_from_slice(&buffer[start..]);
}

fn to_usize(value: u64) -> Result<usize, DeltaError> {
    usize::try_from(value).map_err(|_| DeltaError::Invalid(format!("size {value} too large")))
}
