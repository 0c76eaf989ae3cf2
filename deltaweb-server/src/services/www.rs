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

use std::path::{Path, PathBuf};

use actix_web::{http::header::ContentType, web, web::Data, HttpRequest, HttpResponse};
use log::debug;

use super::helpers::not_found_page;
use super::ServerState;

const INDEX_FILE: &str = "index.html";

/// Serve files under the server's root directory with delta encoding:
///     http://localhost:<PORT>/here/is/a/path.html
///
/// Each request path has its own version history, so a client that presents
/// the ETag of an earlier copy of a file receives a delta to the current file.
pub async fn www_handler(request: HttpRequest, state: Data<ServerState>) -> HttpResponse {
    let path = request.path().to_string();
    debug!("www_handler({path})...");

    let Some(root) = state.root() else {
        return not_found_page("- no directory is being served");
    };
    let Some(file) = file_for_path(root, &path) else {
        return not_found_page(&format!("- invalid path '{path}'"));
    };

    let file_for_read = file.clone();
    let content = match web::block(move || std::fs::read(file_for_read)).await {
        Ok(Ok(content)) => content,
        Ok(Err(e)) => {
            debug!("www_handler() cannot read {}: {e}", file.display());
            return not_found_page(&format!("- file not found '{path}'"));
        }
        Err(e) => {
            debug!("www_handler() blocking read failed: {e}");
            return not_found_page(&format!("- file not found '{path}'"));
        }
    };

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    state
        .responder()
        .respond(&request, None, Some(ContentType(mime)), content)
}

/// The file a request path refers to, or None if it escapes `root`
///
/// Directories (and the empty path) are served by their index.html.
fn file_for_path(root: &Path, path: &str) -> Option<PathBuf> {
    let mut file = root.to_path_buf();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        if segment == ".." || segment == "." || segment.contains('\\') {
            return None;
        }
        file.push(segment);
    }
    if file.is_dir() {
        file.push(INDEX_FILE);
    }
    Some(file)
}

#[cfg(test)]
mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test as actix_test, App};

    use super::*;
    use crate::services::configure_services;
    use crate::ServerConfig;

    #[test]
    fn paths_stay_under_root() {
        let root = Path::new("/srv/www");
        assert_eq!(
            file_for_path(root, "/docs/page.html"),
            Some(PathBuf::from("/srv/www/docs/page.html"))
        );
        assert_eq!(file_for_path(root, "/docs/../../etc/passwd"), None);
        assert_eq!(file_for_path(root, "/./page.html"), None);
    }

    #[actix_web::test]
    async fn files_are_served_with_delta_encoding() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("page.txt"), "line one\nline two\n").expect("write");
        std::fs::write(dir.path().join(INDEX_FILE), "<h1>home</h1>").expect("write");

        let config = ServerConfig {
            root: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let state = Data::new(ServerState::new(&config));
        let app = actix_test::init_service(App::new().configure(|cfg| configure_services(cfg, state))).await;

        let request = actix_test::TestRequest::get().uri("/page.txt").to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .expect("etag");

        std::fs::write(dir.path().join("page.txt"), "line one\nline two\nline three\n")
            .expect("write");
        let request = actix_test::TestRequest::get()
            .uri("/page.txt")
            .insert_header((header::IF_NONE_MATCH, etag))
            .insert_header(("A-IM", "vcdiff"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::IM_USED);

        let request = actix_test::TestRequest::get().uri("/").to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(response).await, "<h1>home</h1>");
    }

    #[actix_web::test]
    async fn missing_files_and_traversal_are_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServerConfig {
            root: Some(dir.path().to_path_buf()),
            ..ServerConfig::default()
        };
        let state = Data::new(ServerState::new(&config));
        let app = actix_test::init_service(App::new().configure(|cfg| configure_services(cfg, state))).await;

        for uri in ["/missing.html", "/a/../../secret"] {
            let request = actix_test::TestRequest::get().uri(uri).to_request();
            let response = actix_test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "for {uri}");
        }
    }

    #[actix_web::test]
    async fn without_a_root_nothing_is_served() {
        let state = Data::new(ServerState::new(&ServerConfig::default()));
        let app = actix_test::init_service(App::new().configure(|cfg| configure_services(cfg, state))).await;
        let request = actix_test::TestRequest::get().uri("/index.html").to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
