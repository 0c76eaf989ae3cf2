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

use color_eyre::{eyre::eyre, Result};
use log::info;

use deltaweb_server::ServerConfig;

/// Run the server until it is stopped (e.g. with Ctrl-C)
pub(crate) async fn start_in_foreground(config: ServerConfig) -> Result<()> {
    let host = config.host.clone();
    let port = config.port;
    info!(
        "starting deltaweb server at http://{host}:{port} (try http://{host}:{port}/demo/log)"
    );

    match deltaweb_server::serve(config).await {
        Ok(()) => Ok(()),
        Err(e) => Err(eyre!("deltaweb server on {host}:{port} failed: {e}")),
    }
}
