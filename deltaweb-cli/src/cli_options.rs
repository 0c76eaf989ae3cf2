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

use clap::{Parser, Subcommand};

use deltaweb::delta::EngineKind;
use deltaweb::web::{DEFAULT_HTTP_PORT_STR, LOCALHOST_STR};

#[derive(Parser, Debug)]
#[command(name = "deltaweb", version)]
#[command(about = "Serve and fetch HTTP resources with RFC 3229 delta encoding")]
pub struct Opt {
    /// Log filter such as 'debug' or 'deltaweb=debug,actix_web=info' (overrides RUST_LOG)
    #[clap(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[clap(subcommand)]
    pub cmd: Option<Subcommands>,
}

#[derive(Subcommand, Debug)]
pub enum Subcommands {
    /// Start a server which sends deltas (226 IM Used) to clients holding an
    /// earlier version of a resource.
    ///
    /// Files under --root are served by path, and /demo/log is a document that
    /// grows on every request. Version histories can be inspected at
    /// /deltaweb/v0/history
    Serve {
        /// Host address to listen on
        #[clap(long, default_value = LOCALHOST_STR)]
        host: String,

        /// Port to listen on
        #[clap(long, short = 'p', default_value = DEFAULT_HTTP_PORT_STR)]
        port: u16,

        /// Directory of files to serve
        #[clap(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Delta format to offer: vcdiff or diffjson
        #[clap(long, default_value_t = EngineKind::Vcdiff)]
        engine: EngineKind,

        /// Keep at most this many versions per resource (default: keep all)
        #[clap(long, value_name = "COUNT")]
        max_versions: Option<usize>,

        /// Keep histories for at most this many resources
        #[clap(long, value_name = "COUNT", default_value_t = deltaweb::cache::version_store::DEFAULT_MAX_RESOURCES)]
        max_resources: u32,

        /// Check each delta reproduces the current version before sending it
        #[clap(long)]
        verify_deltas: bool,
    },

    /// Fetch a URL one or more times, requesting deltas against the previous copy.
    ///
    /// A URL starting with '/' is fetched from the local server (see --host and --port)
    Fetch {
        /// URL, or path on the local server
        url: String,

        /// Number of times to fetch
        #[clap(long, default_value = "1")]
        repeat: u32,

        /// Pause between fetches in milliseconds
        #[clap(long, default_value = "1000")]
        interval_ms: u64,

        /// Delta format to accept: vcdiff or diffjson
        #[clap(long, default_value_t = EngineKind::Vcdiff)]
        engine: EngineKind,

        /// Write the final body to stdout
        #[clap(long)]
        print_body: bool,

        /// Host of the local server
        #[clap(long)]
        host: Option<String>,

        /// Port of the local server
        #[clap(long)]
        port: Option<u16>,
    },

    /// Show the version histories held by a running server
    History {
        /// ResourceId to describe. Without one the ResourceIds are listed.
        resource: Option<String>,

        #[clap(long)]
        host: Option<String>,

        #[clap(long)]
        port: Option<u16>,
    },

    /// Create a patch which turns BASE into TARGET
    Diff {
        base: PathBuf,
        target: PathBuf,

        #[clap(long, default_value_t = EngineKind::Vcdiff)]
        engine: EngineKind,

        /// File for the patch (default: stdout)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Apply a patch created by 'deltaweb diff' to BASE
    Patch {
        base: PathBuf,
        patch: PathBuf,

        #[clap(long, default_value_t = EngineKind::Vcdiff)]
        engine: EngineKind,

        /// File for the result (default: stdout)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },
}
