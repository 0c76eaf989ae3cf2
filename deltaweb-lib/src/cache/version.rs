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

use std::fmt::{self, Display, Formatter};

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Key for a cacheable entity, by default the request path
pub type ResourceId = String;

/// ETag value of one served version, unique across the whole store
pub type VersionId = String;

/// One body served for a resource. Immutable once created.
#[derive(Clone, Debug)]
pub struct Version {
    id: VersionId,
    content: Bytes,
    /// Arrival order within the History
    sequence: u64,
    created: DateTime<Utc>,
}

impl Version {
    pub(crate) fn new(id: VersionId, content: Bytes, sequence: u64) -> Version {
        Version {
            id,
            content,
            sequence,
            created: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Display for Version {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(
            formatter,
            "Version \"{}\" ({} bytes, created {})",
            self.id,
            self.content.len(),
            self.created.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
