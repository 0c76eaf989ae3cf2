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

//! Decides, for each response body produced, whether the client is sent the
//! full body (200), nothing (304) or a delta against a version it holds (226).
//!
//! Every call registers the body as a new version first, so the ETag sent is
//! always the id of the version just registered, even on 304 and 226.
//!
//! Which ResourceId a body is filed under is the caller's decision. By default
//! it is the request path, and callers may pass an explicit id to share one
//! history between several paths. Using both for the same logical resource
//! gives two unrelated histories, so pick one per resource.

use std::sync::Arc;

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder};
use bytes::Bytes;
use log::{debug, warn};

use super::etag::{self, accepts_token, parse_if_none_match, quoted};
use super::{HEADER_DELTA_BASE, HEADER_IM};
use crate::cache::{DeltaOutcome, VersionId, VersionStore};

/// The caching headers of one request, independent of any HTTP framework
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Negotiation<'a> {
    pub resource_id: &'a str,
    /// Raw If-None-Match value
    pub if_none_match: Option<&'a str>,
    /// Raw A-IM value
    pub a_im: Option<&'a str>,
}

impl<'a> Negotiation<'a> {
    pub fn new(resource_id: &'a str) -> Negotiation<'a> {
        Negotiation {
            resource_id,
            if_none_match: None,
            a_im: None,
        }
    }
}

/// The chosen response. Each variant carries the id of the newly registered version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaResponse {
    /// 200 OK with the whole body
    Full { etag: VersionId, body: Bytes },
    /// 304 Not Modified, the client's copy is current
    NotModified { etag: VersionId },
    /// 226 IM Used with a patch from `delta_base` to the new version
    ImUsed {
        etag: VersionId,
        im: String,
        delta_base: VersionId,
        patch: Bytes,
    },
}

impl DeltaResponse {
    pub fn etag(&self) -> &str {
        match self {
            DeltaResponse::Full { etag, .. }
            | DeltaResponse::NotModified { etag }
            | DeltaResponse::ImUsed { etag, .. } => etag,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DeltaResponse::Full { .. } => StatusCode::OK,
            DeltaResponse::NotModified { .. } => StatusCode::NOT_MODIFIED,
            DeltaResponse::ImUsed { .. } => StatusCode::IM_USED,
        }
    }

    /// Render as an actix-web response. `content_type` is only set on a 200.
    pub fn into_http_response(self, content_type: Option<ContentType>) -> HttpResponse {
        let mut builder = HttpResponseBuilder::new(self.status());
        builder.insert_header(etag::etag(self.etag()));

        match self {
            DeltaResponse::Full { body, .. } => {
                if let Some(content_type) = content_type {
                    builder.insert_header(content_type);
                }
                builder.body(body)
            }
            DeltaResponse::NotModified { .. } => builder.finish(),
            DeltaResponse::ImUsed {
                im,
                delta_base,
                patch,
                ..
            } => builder
                .insert_header((HEADER_IM, im))
                .insert_header((HEADER_DELTA_BASE, quoted(&delta_base)))
                .body(patch),
        }
    }
}

/// Delta encoding for response bodies, backed by a shared VersionStore
#[derive(Clone)]
pub struct DeltaResponder {
    store: Arc<VersionStore>,
}

impl DeltaResponder {
    pub fn new(store: Arc<VersionStore>) -> DeltaResponder {
        DeltaResponder { store }
    }

    pub fn store(&self) -> &Arc<VersionStore> {
        &self.store
    }

    /// Register `body` as the new version of the resource and choose the response
    pub fn negotiate(&self, negotiation: &Negotiation, body: impl Into<Bytes>) -> DeltaResponse {
        let resource_id = negotiation.resource_id;
        let body: Bytes = body.into();
        let new_id = self.store.add_version(resource_id, body.clone());

        let base_id = negotiation.if_none_match.and_then(|if_none_match| {
            parse_if_none_match(if_none_match)
                .into_iter()
                .find(|id| self.store.has_version(resource_id, id))
                .map(str::to_string)
        });
        let Some(base_id) = base_id else {
            debug!("'{resource_id}' 200 (no known version) \"{new_id}\" {} bytes", body.len());
            return DeltaResponse::Full { etag: new_id, body };
        };

        let token = self.store.token();
        let delta_capable = negotiation
            .a_im
            .is_some_and(|a_im| accepts_token(a_im, token));

        if !delta_capable {
            // No need to diff when all the client can receive is 304 or 200
            let unchanged = self
                .store
                .version(resource_id, &base_id)
                .is_some_and(|base| *base.content() == body);
            return if unchanged {
                debug!("'{resource_id}' 304 base \"{base_id}\" new \"{new_id}\"");
                DeltaResponse::NotModified { etag: new_id }
            } else {
                debug!(
                    "'{resource_id}' 200 (no A-IM for '{token}') base \"{base_id}\" new \"{new_id}\" {} bytes",
                    body.len()
                );
                DeltaResponse::Full { etag: new_id, body }
            };
        }

        match self.store.get_delta_to(resource_id, &base_id, &new_id) {
            Ok(Some(DeltaOutcome::Unchanged)) => {
                debug!("'{resource_id}' 304 base \"{base_id}\" new \"{new_id}\"");
                DeltaResponse::NotModified { etag: new_id }
            }
            Ok(Some(DeltaOutcome::Patch(patch))) => {
                debug!(
                    "'{resource_id}' 226 {token} base \"{base_id}\" new \"{new_id}\" {} bytes for {} byte body",
                    patch.len(),
                    body.len()
                );
                DeltaResponse::ImUsed {
                    etag: new_id,
                    im: token.to_string(),
                    delta_base: base_id,
                    patch,
                }
            }
            Ok(None) => {
                // Base evicted since it was found
                debug!("'{resource_id}' 200 (base \"{base_id}\" gone) new \"{new_id}\"");
                DeltaResponse::Full { etag: new_id, body }
            }
            Err(e) => {
                warn!("'{resource_id}' {token} delta from \"{base_id}\" failed, sending full body: {e}");
                DeltaResponse::Full { etag: new_id, body }
            }
        }
    }

    /// Negotiate using the request's headers and render the response
    ///
    /// The ResourceId is the request path unless `resource_id` is given.
    pub fn respond(
        &self,
        request: &HttpRequest,
        resource_id: Option<&str>,
        content_type: Option<ContentType>,
        body: impl Into<Bytes>,
    ) -> HttpResponse {
        let resource_id = resource_id.unwrap_or(request.path());
        let if_none_match = etag::if_none_match(request);
        let a_im = etag::a_im(request);
        let negotiation = Negotiation {
            resource_id,
            if_none_match: if_none_match.as_deref(),
            a_im: a_im.as_deref(),
        };
        self.negotiate(&negotiation, body)
            .into_http_response(content_type)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use actix_web::http::header;
    use actix_web::test::TestRequest;

    use super::*;
    use crate::delta::{DeltaError, DiffEngine, EngineKind};

    fn responder(kind: EngineKind) -> DeltaResponder {
        DeltaResponder::new(Arc::new(VersionStore::new(kind.new_engine())))
    }

    struct FailingEngine {}

    impl DiffEngine for FailingEngine {
        fn token(&self) -> &str {
            "vcdiff"
        }

        fn encode(&self, _base: &[u8], _target: &[u8]) -> Result<Vec<u8>, DeltaError> {
            Err(DeltaError::Unsupported("always fails".to_string()))
        }

        fn apply(&self, _base: &[u8], _patch: &[u8]) -> Result<Vec<u8>, DeltaError> {
            Err(DeltaError::Unsupported("always fails".to_string()))
        }
    }

    #[test]
    fn first_request_gets_the_full_body() {
        let responder = responder(EngineKind::Vcdiff);
        let response = responder.negotiate(&Negotiation::new("/page"), "body 1");
        let DeltaResponse::Full { etag, body } = response else {
            panic!("expected a full response");
        };
        assert_eq!(body, Bytes::from_static(b"body 1"));
        assert!(responder.store().has_version("/page", &etag));
    }

    #[test]
    fn changed_content_is_sent_as_a_delta() {
        for kind in [EngineKind::Vcdiff, EngineKind::DiffJson] {
            let responder = responder(kind);
            let e1 = responder
                .negotiate(&Negotiation::new("/page"), "body 1")
                .etag()
                .to_string();
            let if_none_match = quoted(&e1);
            let negotiation = Negotiation {
                resource_id: "/page",
                if_none_match: Some(&if_none_match),
                a_im: Some(kind.token()),
            };

            let DeltaResponse::ImUsed {
                etag,
                im,
                delta_base,
                patch,
            } = responder.negotiate(&negotiation, "body 2")
            else {
                panic!("expected 226 for {kind}");
            };
            assert_ne!(etag, e1);
            assert_eq!(im, kind.token());
            assert_eq!(delta_base, e1);
            let rebuilt = responder.store().engine().apply(b"body 1", &patch);
            assert_eq!(rebuilt, Ok(b"body 2".to_vec()));
            assert_eq!(
                responder.store().current("/page").map(|v| v.id().to_string()),
                Some(etag)
            );
        }
    }

    #[test]
    fn unchanged_content_is_not_modified_with_a_new_etag() {
        let responder = responder(EngineKind::Vcdiff);
        let e1 = responder
            .negotiate(&Negotiation::new("/page"), "same")
            .etag()
            .to_string();

        for a_im in [Some("vcdiff"), None] {
            let negotiation = Negotiation {
                resource_id: "/page",
                if_none_match: Some(&e1),
                a_im,
            };
            let response = responder.negotiate(&negotiation, "same");
            assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
            assert_ne!(response.etag(), e1);
        }
    }

    #[test]
    fn unknown_or_foreign_etags_get_the_full_body() {
        let responder = responder(EngineKind::Vcdiff);
        let other = responder
            .negotiate(&Negotiation::new("/other"), "body")
            .etag()
            .to_string();
        responder.negotiate(&Negotiation::new("/page"), "body 1");

        for if_none_match in ["\"unmatchable_etag\"", other.as_str(), "", "*"] {
            let negotiation = Negotiation {
                resource_id: "/page",
                if_none_match: Some(if_none_match),
                a_im: Some("vcdiff"),
            };
            let response = responder.negotiate(&negotiation, "body 2");
            assert_eq!(response.status(), StatusCode::OK, "for {if_none_match}");
        }
    }

    #[test]
    fn clients_without_the_token_get_the_full_body() {
        let responder = responder(EngineKind::Vcdiff);
        let e1 = responder
            .negotiate(&Negotiation::new("/page"), "body 1")
            .etag()
            .to_string();

        for a_im in [None, Some("diffjson"), Some("gzip, VCDIFF")] {
            let negotiation = Negotiation {
                resource_id: "/page",
                if_none_match: Some(&e1),
                a_im,
            };
            let response = responder.negotiate(&negotiation, "body 2");
            assert!(matches!(response, DeltaResponse::Full { .. }), "for {a_im:?}");
        }
    }

    #[test]
    fn first_listed_known_etag_is_the_base() {
        let responder = responder(EngineKind::Vcdiff);
        let e1 = responder
            .negotiate(&Negotiation::new("/page"), "version one text")
            .etag()
            .to_string();
        let e2 = responder
            .negotiate(&Negotiation::new("/page"), "version two text")
            .etag()
            .to_string();

        let if_none_match = format!("\"nope\", \"{e1}\", \"{e2}\"");
        let negotiation = Negotiation {
            resource_id: "/page",
            if_none_match: Some(&if_none_match),
            a_im: Some("vcdiff"),
        };
        let DeltaResponse::ImUsed { delta_base, .. } =
            responder.negotiate(&negotiation, "version three text")
        else {
            panic!("expected 226");
        };
        assert_eq!(delta_base, e1);
    }

    #[test]
    fn engine_failure_falls_back_to_the_full_body() {
        let responder = DeltaResponder::new(Arc::new(VersionStore::new(Arc::new(FailingEngine {}))));
        let e1 = responder
            .negotiate(&Negotiation::new("/page"), "body 1")
            .etag()
            .to_string();
        let negotiation = Negotiation {
            resource_id: "/page",
            if_none_match: Some(&e1),
            a_im: Some("vcdiff"),
        };
        assert_eq!(
            responder.negotiate(&negotiation, "body 2"),
            DeltaResponse::Full {
                etag: responder
                    .store()
                    .current("/page")
                    .map(|v| v.id().to_string())
                    .unwrap_or_default(),
                body: Bytes::from_static(b"body 2"),
            }
        );
    }

    #[actix_web::test]
    async fn responses_carry_the_delta_headers() {
        let responder = responder(EngineKind::Vcdiff);
        let request = TestRequest::get().uri("/page?query=ignored").to_http_request();
        let first = responder.respond(&request, None, Some(ContentType::plaintext()), "body 1");
        assert_eq!(first.status(), StatusCode::OK);
        assert!(first.headers().get(header::CONTENT_TYPE).is_some());
        assert!(first.headers().get(HEADER_IM).is_none());
        let e1 = first
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .expect("etag");
        assert!(e1.starts_with('"') && e1.ends_with('"'));

        let request = TestRequest::get()
            .uri("/page")
            .insert_header((header::IF_NONE_MATCH, e1.as_str()))
            .insert_header(("A-IM", "vcdiff"))
            .to_http_request();
        let second = responder.respond(&request, None, Some(ContentType::plaintext()), "body 2");
        assert_eq!(second.status(), StatusCode::IM_USED);
        assert_eq!(
            second.headers().get(HEADER_IM).and_then(|v| v.to_str().ok()),
            Some("vcdiff")
        );
        assert_eq!(
            second
                .headers()
                .get(HEADER_DELTA_BASE)
                .and_then(|v| v.to_str().ok()),
            Some(e1.as_str())
        );
        assert!(second.headers().get(header::CONTENT_TYPE).is_none());

        let patch = to_bytes(second.into_body()).await.expect("body");
        let rebuilt = responder.store().engine().apply(b"body 1", &patch);
        assert_eq!(rebuilt, Ok(b"body 2".to_vec()));
    }

    #[actix_web::test]
    async fn explicit_resource_ids_share_history_across_paths() {
        let responder = responder(EngineKind::Vcdiff);
        let request = TestRequest::get().uri("/a").to_http_request();
        let first = responder.respond(&request, Some("shared"), None, "shared body");
        let e1 = first
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .expect("etag");

        let request = TestRequest::get()
            .uri("/b")
            .insert_header((header::IF_NONE_MATCH, e1.as_str()))
            .to_http_request();
        let second = responder.respond(&request, Some("shared"), None, "shared body");
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        let body = to_bytes(second.into_body()).await.expect("body");
        assert!(body.is_empty());
        assert!(responder.store().summary("/a").is_none());
    }

    #[test]
    fn known_etag_on_a_later_header_line_is_used() {
        let responder = responder(EngineKind::Vcdiff);
        let e1 = responder
            .negotiate(&Negotiation::new("/page"), "body 1")
            .etag()
            .to_string();

        let request = TestRequest::get()
            .uri("/page")
            .append_header((header::IF_NONE_MATCH, "\"unknown\""))
            .append_header((header::IF_NONE_MATCH, quoted(&e1)))
            .append_header(("A-IM", "diffjson"))
            .append_header(("A-IM", "vcdiff"))
            .to_http_request();
        let response = responder.respond(&request, None, None, "body 2");
        assert_eq!(response.status(), StatusCode::IM_USED);
        assert_eq!(
            response
                .headers()
                .get(HEADER_DELTA_BASE)
                .and_then(|v| v.to_str().ok()),
            Some(quoted(&e1).as_str())
        );
    }
}
