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

use std::path::PathBuf;

use deltaweb::cache::StoreConfig;
use deltaweb::delta::EngineKind;
use deltaweb::web::{DEFAULT_HTTP_PORT, LOCALHOST_STR};

/// Settings for one deltaweb server instance
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of files to serve. Without one only the demo and API routes respond.
    pub root: Option<PathBuf>,
    /// Delta format offered to clients (one per deployment)
    pub engine: EngineKind,
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: LOCALHOST_STR.to_string(),
            port: DEFAULT_HTTP_PORT,
            root: None,
            engine: EngineKind::default(),
            store: StoreConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_localhost_and_vcdiff() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.engine.token(), "vcdiff");
        assert!(config.root.is_none());
        assert!(!config.store.verify_deltas);
    }
}
