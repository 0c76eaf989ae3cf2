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

//! The version cache remembers every body served for each resource so that a
//! client presenting an old ETag can be sent a delta instead of the whole
//! body. Without it the server would have nothing to diff against.
//!
//! Histories live in memory only and are lost when the server stops, so
//! ETags issued by an earlier process degrade to full responses.

// This module includes:

pub mod history;
pub mod version;
pub mod version_store;

pub use history::{History, HistorySummary, VersionSummary};
pub use version::{ResourceId, Version, VersionId};
pub use version_store::{DeltaOutcome, StoreConfig, VersionStore};
