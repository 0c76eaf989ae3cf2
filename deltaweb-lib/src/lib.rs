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

//! # deltaweb
//!
//! Delta encoding for HTTP responses (RFC 3229). Every body served for a
//! resource is remembered as a version, tagged by its ETag. When a client
//! presents an ETag it already holds and declares support for the server's
//! delta format in `A-IM`, it is sent only the patch that brings its copy
//! up to date (226 IM Used) instead of the full body.
//!
//! - [`cache`] holds the per-resource version histories
//! - [`delta`] provides the diff engines (vcdiff and diffjson)
//! - [`web`] parses the caching headers and renders responses

pub mod cache;
pub mod delta;
pub mod web;
