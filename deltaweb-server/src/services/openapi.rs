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

use actix_web::HttpResponse;
use utoipa::OpenApi;

use super::api_delta::v0::history;

pub(crate) const JSON_PATH: &str = "/api/openapi.json";

#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "deltaweb",
        description = "
### Inspect the version histories of a deltaweb server
<p>
Every body the server sends is remembered as a version of its resource. Clients
that present the ETag of a version they hold, and list the server's delta format
in <code>A-IM</code>, receive a <b>226 IM Used</b> delta rather than the full body
(RFC 3229).
</p>"
    ),
    paths(history::history_list, history::history_get),
    components(schemas(history::HistoryJson, history::VersionJson)),
    tags(
        [name = "deltaweb", description = "version history APIs"],
    ),
)]
pub(crate) struct DeltaWebApiDoc;

/// The OpenAPI document for the deltaweb APIs
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(DeltaWebApiDoc::openapi())
}
