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

//! The ordered record of every version served for one resource.

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::version::{Version, VersionId};

/// Append-only list of Versions for one resource
///
/// Insertion order is recency order, so the last Version is always the
/// current one. When `max_versions` is set the oldest Versions are dropped
/// once it is exceeded, but the current Version is never dropped.
#[derive(Debug)]
pub struct History {
    versions: VecDeque<Version>,
    /// VersionId to sequence number. Sequence numbers are contiguous, so the
    /// position in `versions` is the offset from the oldest retained Version.
    index: HashMap<VersionId, u64>,
    next_sequence: u64,
    max_versions: Option<usize>,
    evicted: u64,
}

impl History {
    pub fn new(max_versions: Option<usize>) -> History {
        History {
            versions: VecDeque::new(),
            index: HashMap::new(),
            next_sequence: 1,
            max_versions,
            evicted: 0,
        }
    }

    /// Append content as the new current Version
    ///
    /// Identical content is not deduplicated: each call is a new Version. The
    /// caller mints `id` and must not reuse one already in this History.
    pub fn add_version(&mut self, id: VersionId, content: Bytes) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.index.insert(id.clone(), sequence);
        self.versions.push_back(Version::new(id, content, sequence));
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        let Some(max_versions) = self.max_versions else {
            return;
        };
        let max_versions = max_versions.max(1);
        while self.versions.len() > max_versions {
            if let Some(oldest) = self.versions.pop_front() {
                self.index.remove(oldest.id());
                self.evicted += 1;
            }
        }
    }

    pub fn has_version(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn version(&self, id: &str) -> Option<&Version> {
        let sequence = *self.index.get(id)?;
        let oldest = self.versions.front()?.sequence();
        let position = usize::try_from(sequence.checked_sub(oldest)?).ok()?;
        self.versions.get(position)
    }

    /// The most recently added Version
    pub fn current(&self) -> Option<&Version> {
        self.versions.back()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.iter()
    }

    /// Number of Versions dropped to respect `max_versions`
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn summary(&self, resource_id: &str) -> HistorySummary {
        HistorySummary {
            resource_id: resource_id.to_string(),
            versions: self
                .versions
                .iter()
                .map(|version| VersionSummary {
                    id: version.id().to_string(),
                    size: version.size(),
                    created: version.created(),
                })
                .collect(),
            evicted: self.evicted,
        }
    }
}

/// Description of a History without its content
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HistorySummary {
    pub resource_id: String,
    /// Oldest first, the last entry is the current version
    pub versions: Vec<VersionSummary>,
    pub evicted: u64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VersionSummary {
    pub id: String,
    pub size: usize,
    pub created: DateTime<Utc>,
}
