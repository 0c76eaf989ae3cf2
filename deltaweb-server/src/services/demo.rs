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

//! A document that changes on every request, to watch delta encoding at work.
//!
//! Each GET appends a timestamped line, so a client holding an earlier
//! version is sent a small delta while the document keeps growing.

use actix_web::{http::header::ContentType, web::Data, HttpRequest, HttpResponse};
use chrono::Utc;
use log::debug;
use parking_lot::Mutex;

use super::ServerState;

pub const DEMO_LOG_ROUTE: &str = "/demo/log";
pub const DEMO_LOG_ANY_ROUTE: &str = "/demo/log/{_:.*}";

/// Every path variant of the demo shares this one history
pub const DEMO_LOG_RESOURCE: &str = "demo-log";

const DEMO_LOG_HEADING: &str = "deltaweb demo log: one line per request\n\n";

pub(crate) struct DemoLog {
    text: Mutex<String>,
    requests: Mutex<u64>,
}

impl Default for DemoLog {
    fn default() -> Self {
        DemoLog {
            text: Mutex::new(DEMO_LOG_HEADING.to_string()),
            requests: Mutex::new(0),
        }
    }
}

impl DemoLog {
    /// Append a line for `path` and return the whole log
    pub(crate) fn append(&self, path: &str) -> String {
        let mut requests = self.requests.lock();
        *requests += 1;
        let line = format!(
            "{:>6} {} GET {path}\n",
            *requests,
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f")
        );
        let mut text = self.text.lock();
        text.push_str(&line);
        text.clone()
    }
}

/// Demo document, delta encoded under one ResourceId for all paths
///
/// url: <code>http://127.0.0.1:8080/demo/log</code>
pub async fn demo_log(request: HttpRequest, state: Data<ServerState>) -> HttpResponse {
    let body = state.demo_log().append(request.path());
    debug!("demo_log() now {} bytes", body.len());
    state.responder().respond(
        &request,
        Some(DEMO_LOG_RESOURCE),
        Some(ContentType::plaintext()),
        body,
    )
}
