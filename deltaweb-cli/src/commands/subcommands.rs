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

use deltaweb::cache::StoreConfig;
use deltaweb_server::ServerConfig;

use crate::cli_options::{Opt, Subcommands};

pub async fn cli_commands(opt: Opt) -> Result<()> {
    match opt.cmd {
        Some(Subcommands::Serve {
            host,
            port,
            root,
            engine,
            max_versions,
            max_resources,
            verify_deltas,
        }) => {
            let config = ServerConfig {
                host,
                port,
                root,
                engine,
                store: StoreConfig {
                    max_versions_per_resource: max_versions,
                    max_resources,
                    verify_deltas,
                },
            };
            crate::commands::server::start_in_foreground(config).await?;
        }

        Some(Subcommands::Fetch {
            url,
            repeat,
            interval_ms,
            engine,
            print_body,
            host,
            port,
        }) => {
            let url = crate::commands::cmd_fetch::resolve_url(&url, host.as_ref(), port);
            crate::commands::cmd_fetch::handle_fetch(&url, repeat, interval_ms, engine, print_body)
                .await?;
        }

        Some(Subcommands::History {
            resource,
            host,
            port,
        }) => {
            crate::commands::cmd_history::handle_history(resource.as_deref(), host.as_ref(), port)
                .await?;
        }

        Some(Subcommands::Diff {
            base,
            target,
            engine,
            output,
        }) => {
            crate::commands::cmd_diff::handle_diff(&base, &target, engine, output.as_deref())?;
        }

        Some(Subcommands::Patch {
            base,
            patch,
            engine,
            output,
        }) => {
            crate::commands::cmd_diff::handle_patch(&base, &patch, engine, output.as_deref())?;
        }

        None => {
            println!("Nothing to do. Try 'deltaweb --help'");
        }
    }

    Ok(())
}
