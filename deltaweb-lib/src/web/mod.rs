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

//! HTTP side of delta encoding: header parsing, the DeltaResponder that
//! picks between 200, 304 and 226 responses, and a client that understands them.

pub mod etag;
pub mod request;
pub mod responder;

pub use responder::{DeltaResponder, DeltaResponse, Negotiation};

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_HTTP_PORT_STR: &str = "8080";
pub const LOCALHOST_STR: &str = "127.0.0.1";

// RFC 3229 headers (lower case as they appear in a HeaderMap)
pub const HEADER_A_IM: &str = "a-im";
pub const HEADER_IM: &str = "im";
pub const HEADER_DELTA_BASE: &str = "delta-base";

/// Prefix for the inspection API served alongside delta encoded content
pub const DELTAWEB_API_ROUTE: &str = "/deltaweb/v0";
