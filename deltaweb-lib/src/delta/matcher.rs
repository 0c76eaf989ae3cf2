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

//! Greedy block matching shared by the diff engines.
//!
//! The base is indexed by every MIN_MATCH byte window. The target is then
//! scanned left to right taking the longest base match available at each
//! position. Anything that does not match becomes a literal run.

use std::collections::HashMap;

/// Shortest match worth a COPY (anything shorter is cheaper as literal data)
pub const MIN_MATCH: usize = 4;

// Bounds the work per target position for highly repetitive bases
const MAX_CANDIDATES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Copy `len` bytes of the base starting at `start`
    Copy { start: usize, len: usize },
    /// Take `len` literal bytes of the target starting at `start`
    Add { start: usize, len: usize },
}

type BaseIndex = HashMap<[u8; MIN_MATCH], Vec<usize>>;

/// Describe `target` as a sequence of copies from `base` and literal runs
pub fn match_blocks(base: &[u8], target: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::new();
    if target.is_empty() {
        return instructions;
    }

    let index = index_base(base);
    let mut literal_start: Option<usize> = None;
    let mut position = 0;
    while position < target.len() {
        match longest_match(base, target, position, &index) {
            Some((start, len)) => {
                if let Some(literal) = literal_start.take() {
                    instructions.push(Instruction::Add {
                        start: literal,
                        len: position - literal,
                    });
                }
                instructions.push(Instruction::Copy { start, len });
                position += len;
            }
            None => {
                literal_start.get_or_insert(position);
                position += 1;
            }
        }
    }

    if let Some(literal) = literal_start {
        instructions.push(Instruction::Add {
            start: literal,
            len: target.len() - literal,
        });
    }
    instructions
}

fn index_base(base: &[u8]) -> BaseIndex {
    let mut index = BaseIndex::new();
    for (start, window) in base.windows(MIN_MATCH).enumerate() {
        let Ok(key) = <[u8; MIN_MATCH]>::try_from(window) else {
            continue;
        };
        let candidates = index.entry(key).or_default();
        if candidates.len() < MAX_CANDIDATES {
            candidates.push(start);
        }
    }
    index
}

fn longest_match(
    base: &[u8],
    target: &[u8],
    position: usize,
    index: &BaseIndex,
) -> Option<(usize, usize)> {
    let window = target.get(position..position + MIN_MATCH)?;
    let key = <[u8; MIN_MATCH]>::try_from(window).ok()?;
    let candidates = index.get(&key)?;

    let mut best: Option<(usize, usize)> = None;
    for &start in candidates {
        let len = base[start..]
            .iter()
            .zip(&target[position..])
            .take_while(|(a, b)| a == b)
            .count();
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((start, len));
        }
    }
    best.filter(|(_, len)| *len >= MIN_MATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuild(base: &[u8], target: &[u8], instructions: &[Instruction]) -> Vec<u8> {
        let mut out = Vec::new();
        for instruction in instructions {
            match *instruction {
                Instruction::Copy { start, len } => out.extend_from_slice(&base[start..start + len]),
                Instruction::Add { start, len } => {
                    out.extend_from_slice(&target[start..start + len])
                }
            }
        }
        out
    }

    #[test]
    fn identical_content_is_one_copy() {
        let text = b"the quick brown fox jumps over the lazy dog";
        let instructions = match_blocks(text, text);
        assert_eq!(
            instructions,
            vec![Instruction::Copy {
                start: 0,
                len: text.len()
            }]
        );
    }

    #[test]
    fn empty_base_is_one_literal() {
        let target = b"fresh content";
        let instructions = match_blocks(b"", target);
        assert_eq!(
            instructions,
            vec![Instruction::Add {
                start: 0,
                len: target.len()
            }]
        );
    }

    #[test]
    fn edits_keep_unchanged_runs_as_copies() {
        let base = b"<html><body><p>counter: 1</p><footer>static footer text</footer></body></html>";
        let target = b"<html><body><p>counter: 2</p><footer>static footer text</footer></body></html>";
        let instructions = match_blocks(base, target);

        assert_eq!(rebuild(base, target, &instructions), target.to_vec());
        let literal_bytes: usize = instructions
            .iter()
            .map(|instruction| match instruction {
                Instruction::Add { len, .. } => *len,
                Instruction::Copy { .. } => 0,
            })
            .sum();
        assert!(literal_bytes < 8, "too much literal data: {literal_bytes}");
    }

    #[test]
    fn short_target_never_matches() {
        assert_eq!(
            match_blocks(b"abc", b"abc"),
            vec![Instruction::Add { start: 0, len: 3 }]
        );
        assert!(match_blocks(b"abc", b"").is_empty());
    }
}
