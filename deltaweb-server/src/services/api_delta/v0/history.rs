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

use actix_web::{get, web, web::Data, HttpRequest, HttpResponse, Responder};
use log::debug;
use qstring::QString;
use serde::Serialize;
use utoipa::ToSchema;

use deltaweb::cache::{HistorySummary, VersionSummary};

use crate::services::ServerState;

/// The versions held for one resource, oldest first
#[derive(Serialize, ToSchema, Debug)]
pub struct HistoryJson {
    #[schema(example = "/index.html")]
    resource_id: String,
    /// The last entry is the current version
    versions: Vec<VersionJson>,
    /// How many older versions have been dropped
    evicted: u64,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct VersionJson {
    /// The version's ETag value (unquoted)
    #[schema(example = "1f2e3d4c-17")]
    id: String,
    /// Size of the body in bytes
    size: usize,
    /// When the body was served, RFC 3339
    created: String,
}

impl From<VersionSummary> for VersionJson {
    fn from(version: VersionSummary) -> Self {
        VersionJson {
            id: version.id,
            size: version.size,
            created: version.created.to_rfc3339(),
        }
    }
}

impl From<HistorySummary> for HistoryJson {
    fn from(summary: HistorySummary) -> Self {
        HistoryJson {
            resource_id: summary.resource_id,
            versions: summary.versions.into_iter().map(VersionJson::from).collect(),
            evicted: summary.evicted,
        }
    }
}

/// List the resources which have a version history
///
/// url: <code>http://127.0.0.1:8080/deltaweb/v0/history</code>
#[utoipa::path(
    path = "/deltaweb/v0/history",
    responses(
        (status = StatusCode::OK,
            description = "JSON list of ResourceIds", body = Vec<String>, example = json!(["/index.html", "demo-log"]))
        ),
    tags = ["deltaweb"],
)]
#[get("/history")]
pub async fn history_list(state: Data<ServerState>) -> impl Responder {
    debug!("history_list()...");
    HttpResponse::Ok().json(state.store().resources())
}

/// Describe the version history of one resource
///
/// The resource is the rest of the path (a leading '/' is added if the
/// history is not found without one), or the 'resource' query parameter
/// which takes precedence and allows ids such as <code>demo-log</code>.
///
/// url: <code>http://127.0.0.1:8080/deltaweb/v0/history/index.html</code>
#[utoipa::path(
    path = "/deltaweb/v0/history/{resource}",
    responses(
        (status = StatusCode::OK,
            description = "The versions held for the resource", body = HistoryJson),
        (status = StatusCode::NOT_FOUND,
            description = "No history for the resource", body = str)
        ),
    tags = ["deltaweb"],
    params(
        ("resource" = String, Path, description = "ResourceId, normally the request path of the resource"),
        ("resource" = Option<String>, Query, description = "ResourceId, overrides the path"),
    )
)]
#[get("/history/{resource:.*}")]
pub async fn history_get(
    request: HttpRequest,
    resource: web::Path<String>,
    state: Data<ServerState>,
) -> impl Responder {
    let qs = QString::from(request.query_string());
    let resource = match qs.get("resource") {
        Some(resource) => resource.to_string(),
        None => resource.into_inner(),
    };
    debug!("history_get({resource})...");

    let store = state.store();
    let summary = if resource.starts_with('/') {
        store.summary(&resource)
    } else {
        store
            .summary(&format!("/{resource}"))
            .or_else(|| store.summary(&resource))
    };

    match summary {
        Some(summary) => HttpResponse::Ok().json(HistoryJson::from(summary)),
        None => HttpResponse::NotFound().body(format!("no history for '{resource}'")),
    }
}
