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

use actix_web::{
    http::{header, StatusCode},
    HttpResponse, HttpResponseBuilder,
};

pub(crate) fn make_error_response_page(
    status_code: Option<StatusCode>,
    response_builder: &mut HttpResponseBuilder,
    heading: String,
    message: &str,
) -> HttpResponse {
    let status_code = if let Some(status_code) = status_code {
        &format!("{status_code}")
    } else {
        ""
    };

    let body = format!(
        "
    <!DOCTYPE html><head></head><body>
    <h3>{heading} error</h3>
    {status_code} {message}
    <br/><br/><a href='/'>Home</a>
    </body>"
    );

    response_builder
        .insert_header(header::ContentType(mime::TEXT_HTML))
        .body(body)
}

pub(crate) fn not_found_page(message: &str) -> HttpResponse {
    make_error_response_page(
        Some(StatusCode::NOT_FOUND),
        &mut HttpResponse::NotFound(),
        "deltaweb server".to_string(),
        message,
    )
}
