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

use std::io::Write;
use std::time::Duration;

use color_eyre::Result;

use deltaweb::delta::EngineKind;
use deltaweb::web::request::{make_server_url, DeltaClient};

/// Treat a URL beginning with '/' as a path on the local server
pub(crate) fn resolve_url(url: &str, host: Option<&String>, port: Option<u16>) -> String {
    if url.starts_with('/') {
        make_server_url(host, port, url)
    } else {
        url.to_string()
    }
}

/// Fetch `url` `repeat` times, reporting what came over the wire each time
pub(crate) async fn handle_fetch(
    url: &str,
    repeat: u32,
    interval_ms: u64,
    engine: EngineKind,
    print_body: bool,
) -> Result<()> {
    let mut client = DeltaClient::new(engine.new_engine())?;
    let mut last_body = None;
    let mut total_transferred = 0;
    let mut total_size = 0;

    for round in 1..=repeat.max(1) {
        if round > 1 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }

        let result = client.get(url).await?;
        total_transferred += result.bytes_transferred;
        total_size += result.body.len();
        println!(
            "{round:>4}: {} {:>8} bytes transferred, body {:>8} bytes, etag {}",
            result.status,
            result.bytes_transferred,
            result.body.len(),
            result.etag.as_deref().unwrap_or("(none)")
        );
        last_body = Some(result.body);
    }

    if repeat > 1 && total_size > 0 {
        println!(
            "transferred {total_transferred} of {total_size} bytes ({:.1}%)",
            total_transferred as f64 * 100.0 / total_size as f64
        );
    }

    if print_body {
        if let Some(body) = last_body {
            std::io::stdout().write_all(&body)?;
        }
    }
    Ok(())
}
