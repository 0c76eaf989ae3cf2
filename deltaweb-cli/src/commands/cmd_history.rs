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

use color_eyre::Result;

use deltaweb::web::request::server_request;
use deltaweb::web::DELTAWEB_API_ROUTE;

/// Print the history JSON for `resource`, or the list of resources
pub(crate) async fn handle_history(
    resource: Option<&str>,
    host: Option<&String>,
    port: Option<u16>,
) -> Result<()> {
    let url_path = history_path(resource);
    let json = server_request(&url_path, host, port).await?;
    println!("{json}");
    Ok(())
}

fn history_path(resource: Option<&str>) -> String {
    match resource {
        Some(resource) => {
            let query: String = url::form_urlencoded::byte_serialize(resource.as_bytes()).collect();
            format!("{DELTAWEB_API_ROUTE}/history/?resource={query}")
        }
        None => format!("{DELTAWEB_API_ROUTE}/history"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_are_passed_as_a_query() {
        assert_eq!(history_path(None), "/deltaweb/v0/history");
        assert_eq!(
            history_path(Some("/docs/a page.html")),
            "/deltaweb/v0/history/?resource=%2Fdocs%2Fa+page.html"
        );
    }
}
