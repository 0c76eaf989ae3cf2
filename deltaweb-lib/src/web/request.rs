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

//! Client side helpers: a delta-aware HTTP client and a plain JSON request
//! to a running deltaweb server.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use color_eyre::eyre::{eyre, Result};
use log::debug;
use reqwest::header::{HeaderMap, ETAG, IF_NONE_MATCH};
use reqwest::StatusCode;

use super::etag::{quoted, unquote};
use super::{HEADER_A_IM, HEADER_DELTA_BASE, HEADER_IM};
use crate::delta::DiffEngine;

/// Outcome of one DeltaClient::get()
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResult {
    pub status: StatusCode,
    /// The reconstructed, current body
    pub body: Bytes,
    /// Unquoted ETag of `body`
    pub etag: Option<String>,
    /// Size of the response payload as received (the patch for a 226)
    pub bytes_transferred: usize,
}

#[derive(Clone, Debug)]
struct CachedBody {
    etag: String,
    body: Bytes,
}

/// An HTTP client that remembers the last body fetched from each URL and
/// asks for deltas against it using the same diff engine as the server.
pub struct DeltaClient {
    client: reqwest::Client,
    engine: Arc<dyn DiffEngine>,
    bodies: HashMap<String, CachedBody>,
}

impl DeltaClient {
    pub fn new(engine: Arc<dyn DiffEngine>) -> Result<DeltaClient> {
        Ok(DeltaClient {
            client: reqwest::Client::builder().build()?,
            engine,
            bodies: HashMap::new(),
        })
    }

    pub fn engine(&self) -> &Arc<dyn DiffEngine> {
        &self.engine
    }

    /// The last body received for `url`, and its ETag
    pub fn cached(&self, url: &str) -> Option<(&str, &Bytes)> {
        self.bodies
            .get(url)
            .map(|cached| (cached.etag.as_str(), &cached.body))
    }

    /// GET `url`, offering the cached version as a delta base
    pub async fn get(&mut self, url: &str) -> Result<FetchResult> {
        let mut request = self
            .client
            .get(url)
            .header(HEADER_A_IM, self.engine.token());
        if let Some(cached) = self.bodies.get(url) {
            request = request.header(IF_NONE_MATCH, quoted(&cached.etag));
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let payload = response.bytes().await?;
        debug!(
            "DeltaClient GET {url} {status} with {} byte payload",
            payload.len()
        );
        self.receive(url, status, &headers, payload)
    }

    /// Rebuild the current body from a response and remember it
    fn receive(
        &mut self,
        url: &str,
        status: StatusCode,
        headers: &HeaderMap,
        payload: Bytes,
    ) -> Result<FetchResult> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| unquote(value.trim()).to_string())
        };
        let etag = header(ETAG.as_str());
        let bytes_transferred = payload.len();

        let body = match status {
            StatusCode::OK => payload,
            StatusCode::NOT_MODIFIED => match self.bodies.get(url) {
                Some(cached) => cached.body.clone(),
                None => return Err(eyre!("304 Not Modified for {url} with nothing cached")),
            },
            StatusCode::IM_USED => {
                let token = self.engine.token();
                let im = header(HEADER_IM).unwrap_or_default();
                if im != token {
                    return Err(eyre!("226 IM Used for {url} with IM '{im}', expected '{token}'"));
                }
                let Some(cached) = self.bodies.get(url) else {
                    return Err(eyre!("226 IM Used for {url} with nothing cached"));
                };
                let delta_base = header(HEADER_DELTA_BASE).unwrap_or_default();
                if delta_base != cached.etag {
                    return Err(eyre!(
                        "226 IM Used for {url} is based on \"{delta_base}\" but we hold \"{}\"",
                        cached.etag
                    ));
                }
                Bytes::from(self.engine.apply(&cached.body, &payload)?)
            }
            other => return Err(eyre!("GET {url} failed: {other}")),
        };

        match &etag {
            Some(etag) => {
                self.bodies.insert(
                    url.to_string(),
                    CachedBody {
                        etag: etag.clone(),
                        body: body.clone(),
                    },
                );
            }
            None => {
                self.bodies.remove(url);
            }
        }

        Ok(FetchResult {
            status,
            body,
            etag,
            bytes_transferred,
        })
    }
}

/// Submit a request to a deltaweb server and return the JSON body on success
///
/// url_path should begin with '/' and contains the API path and any parameters for the
/// request. You don't need to provide host or port unless you wish to override the defaults.
pub async fn server_request(
    url_path: &str,
    host: Option<&String>,
    port: Option<u16>,
) -> Result<String> {
    let url_string = make_server_url(host, port, url_path);
    debug!("server_request() request: {url_string}");

    let response: reqwest::Response = reqwest::Client::builder()
        .build()?
        .get(&url_string)
        .header("Accept", "application/json")
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(eyre!("{url_string} returned {status}: {body}"));
    }
    Ok(body)
}

pub fn make_server_url(host: Option<&String>, port: Option<u16>, url_path: &str) -> String {
    let default_host = crate::web::LOCALHOST_STR.to_string();
    let host = host.unwrap_or(&default_host);
    let port = port.unwrap_or(crate::web::DEFAULT_HTTP_PORT);
    format!("http://{host}:{port}{url_path}")
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;
    use crate::delta::EngineKind;

    const URL: &str = "http://127.0.0.1:8080/page";

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_str(value).expect("header value"));
        }
        headers
    }

    fn client() -> DeltaClient {
        DeltaClient::new(EngineKind::Vcdiff.new_engine()).expect("client")
    }

    #[test]
    fn server_urls_default_to_localhost() {
        assert_eq!(
            make_server_url(None, None, "/deltaweb/v0/history"),
            "http://127.0.0.1:8080/deltaweb/v0/history"
        );
        let host = "example.com".to_string();
        assert_eq!(make_server_url(Some(&host), Some(9000), "/x"), "http://example.com:9000/x");
    }

    #[test]
    fn full_not_modified_and_delta_bodies_are_rebuilt() {
        let mut client = client();
        let first = client
            .receive(URL, StatusCode::OK, &headers(&[("etag", "\"s-1\"")]), Bytes::from_static(b"body 1"))
            .expect("200");
        assert_eq!(first.etag.as_deref(), Some("s-1"));
        assert_eq!(client.cached(URL).map(|(etag, _)| etag), Some("s-1"));

        let same = client
            .receive(URL, StatusCode::NOT_MODIFIED, &headers(&[("etag", "\"s-2\"")]), Bytes::new())
            .expect("304");
        assert_eq!(same.body, Bytes::from_static(b"body 1"));
        assert_eq!(same.bytes_transferred, 0);

        let patch = client.engine().encode(b"body 1", b"body 2").expect("encode");
        let delta = client
            .receive(
                URL,
                StatusCode::IM_USED,
                &headers(&[("etag", "\"s-3\""), ("im", "vcdiff"), ("delta-base", "\"s-2\"")]),
                Bytes::from(patch),
            )
            .expect("226");
        assert_eq!(delta.body, Bytes::from_static(b"body 2"));
        assert_eq!(client.cached(URL).map(|(etag, _)| etag), Some("s-3"));
    }

    #[test]
    fn protocol_violations_are_errors() {
        let mut client = client();
        assert!(client
            .receive(URL, StatusCode::NOT_MODIFIED, &HeaderMap::new(), Bytes::new())
            .is_err());

        client
            .receive(URL, StatusCode::OK, &headers(&[("etag", "\"s-1\"")]), Bytes::from_static(b"body 1"))
            .expect("200");
        let patch = Bytes::from(client.engine().encode(b"body 1", b"body 2").expect("encode"));
        let wrong_im = headers(&[("etag", "\"s-2\""), ("im", "diffjson"), ("delta-base", "\"s-1\"")]);
        assert!(client
            .receive(URL, StatusCode::IM_USED, &wrong_im, patch.clone())
            .is_err());
        let wrong_base = headers(&[("etag", "\"s-2\""), ("im", "vcdiff"), ("delta-base", "\"s-0\"")]);
        assert!(client
            .receive(URL, StatusCode::IM_USED, &wrong_base, patch)
            .is_err());
        assert!(client
            .receive(URL, StatusCode::NOT_FOUND, &HeaderMap::new(), Bytes::new())
            .is_err());
    }
}
