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

//! Parsing and formatting of the caching headers used for delta encoding
//! (ETag, If-None-Match and A-IM).
//!
//! ref: https://datatracker.ietf.org/doc/html/rfc3229

use std::borrow::Cow;

use actix_web::http::header::{self, ETag, EntityTag};
use actix_web::HttpRequest;
use url::Url;

use crate::cache::ResourceId;

/// Strong ETag for a VersionId, rendered as `"<id>"`
pub fn etag(version_id: &str) -> ETag {
    ETag(EntityTag::new_strong(version_id.to_string()))
}

/// Quote an id the way ETag and Delta-Base values are written
pub fn quoted(version_id: &str) -> String {
    format!("\"{version_id}\"")
}

/// Strip one layer of surrounding double quotes, if present
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|unquoted| unquoted.strip_suffix('"'))
        .unwrap_or(value)
}

/// The version ids listed in an If-None-Match value, in the order given
///
/// Entries are split on commas, trimmed and unquoted. Empty entries are
/// dropped, as is `*` which never names a version.
pub fn parse_if_none_match(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(|entry| unquote(entry.trim()))
        .filter(|id| !id.is_empty() && *id != "*")
        .collect()
}

/// The instance-manipulation tokens listed in an A-IM value, without
/// parameters (`vcdiff;q=0.9` gives `vcdiff`)
pub fn parse_a_im(value: &str) -> Vec<&str> {
    value
        .split(',')
        .filter_map(|entry| entry.split(';').next())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// True if an A-IM value lists `token`. Comparison is verbatim.
pub fn accepts_token(a_im: &str, token: &str) -> bool {
    parse_a_im(a_im).contains(&token)
}

/// Value of a list-valued request header
///
/// Repeated field lines are joined with ", " as if sent on one line. Lines
/// which are not visible ASCII are ignored.
pub fn header_value<'a>(request: &'a HttpRequest, name: &str) -> Option<Cow<'a, str>> {
    let mut lines = request
        .headers()
        .get_all(name)
        .filter_map(|value| value.to_str().ok());
    let first = lines.next()?;
    let mut joined: Option<String> = None;
    for line in lines {
        let joined = joined.get_or_insert_with(|| first.to_string());
        joined.push_str(", ");
        joined.push_str(line);
    }
    Some(joined.map_or(Cow::Borrowed(first), Cow::Owned))
}

pub fn if_none_match(request: &HttpRequest) -> Option<Cow<'_, str>> {
    header_value(request, header::IF_NONE_MATCH.as_str())
}

pub fn a_im(request: &HttpRequest) -> Option<Cow<'_, str>> {
    header_value(request, super::HEADER_A_IM)
}

/// The ResourceId used for a URL when the caller doesn't supply one: its path
///
/// Accepts absolute URLs and relative references. Scheme, host, query and
/// fragment are discarded.
pub fn resource_id_from_url(url: &str) -> ResourceId {
    let parsed = Url::parse(url).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(url))
    });

    match parsed {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn etags_are_quoted() {
        assert_eq!(etag("a1b2c3d4-7").to_string(), "\"a1b2c3d4-7\"");
        assert_eq!(quoted("a1b2c3d4-7"), "\"a1b2c3d4-7\"");
    }

    #[test]
    fn if_none_match_keeps_client_order() {
        assert_eq!(
            parse_if_none_match("\"e2\", \"e1\", e3"),
            vec!["e2", "e1", "e3"]
        );
        assert_eq!(parse_if_none_match("\"\"e1\"\""), vec!["\"e1\""]);
        assert_eq!(parse_if_none_match(" , \"\",*"), Vec::<&str>::new());
        assert_eq!(parse_if_none_match("e1,e2"), vec!["e1", "e2"]);
    }

    #[test]
    fn a_im_tokens_drop_parameters() {
        assert_eq!(
            parse_a_im("vcdiff;q=0.9, diffjson , gzip"),
            vec!["vcdiff", "diffjson", "gzip"]
        );
        assert!(accepts_token("gzip, vcdiff", "vcdiff"));
        assert!(!accepts_token("VCDIFF", "vcdiff"));
        assert!(!accepts_token("", "vcdiff"));
    }

    #[test]
    fn resource_id_is_the_path() {
        assert_eq!(
            resource_id_from_url("https://example.com:8443/docs/page.html?v=2#top"),
            "/docs/page.html"
        );
        assert_eq!(resource_id_from_url("/demo/log?x=1"), "/demo/log");
        assert_eq!(resource_id_from_url("http://example.com"), "/");
        assert_eq!(resource_id_from_url("relative/path"), "/relative/path");
    }

    #[test]
    fn headers_are_read_from_the_request() {
        let request = TestRequest::default()
            .insert_header((header::IF_NONE_MATCH, "\"e1\""))
            .insert_header(("A-IM", "vcdiff"))
            .to_http_request();
        assert_eq!(if_none_match(&request).as_deref(), Some("\"e1\""));
        assert_eq!(a_im(&request).as_deref(), Some("vcdiff"));

        let bare = TestRequest::default().to_http_request();
        assert_eq!(if_none_match(&bare), None);
        assert_eq!(a_im(&bare), None);
    }

    #[test]
    fn repeated_header_lines_form_one_list() {
        let request = TestRequest::default()
            .append_header((header::IF_NONE_MATCH, "\"e1\""))
            .append_header((header::IF_NONE_MATCH, "\"e2\", \"e3\""))
            .append_header(("A-IM", "gzip"))
            .append_header(("A-IM", "vcdiff;q=0.5"))
            .to_http_request();

        let if_none_match = if_none_match(&request);
        assert_eq!(if_none_match.as_deref(), Some("\"e1\", \"e2\", \"e3\""));
        assert_eq!(
            parse_if_none_match(if_none_match.as_deref().unwrap_or_default()),
            vec!["e1", "e2", "e3"]
        );
        let a_im = a_im(&request);
        assert!(a_im.as_deref().is_some_and(|a_im| accepts_token(a_im, "vcdiff")));
    }
}
