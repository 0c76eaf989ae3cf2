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

pub(crate) mod api_delta;
pub(crate) mod demo;
pub(crate) mod helpers;
pub(crate) mod openapi;
pub(crate) mod www;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::header,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};
use log::{debug, info};

use deltaweb::cache::VersionStore;
use deltaweb::web::{DeltaResponder, DELTAWEB_API_ROUTE, HEADER_DELTA_BASE, HEADER_IM};

use crate::ServerConfig;
use demo::DemoLog;

pub const CONNECTION_TIMEOUT: u64 = 75;

/// Everything the handlers share. One per server instance, so every worker
/// sees the same VersionStore.
pub struct ServerState {
    responder: DeltaResponder,
    root: Option<PathBuf>,
    demo_log: DemoLog,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> ServerState {
        let store = VersionStore::with_config(config.engine.new_engine(), config.store.clone());
        ServerState {
            responder: DeltaResponder::new(Arc::new(store)),
            root: config.root.clone(),
            demo_log: DemoLog::default(),
        }
    }

    pub fn responder(&self) -> &DeltaResponder {
        &self.responder
    }

    pub fn store(&self) -> &Arc<VersionStore> {
        self.responder.store()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub(crate) fn demo_log(&self) -> &DemoLog {
        &self.demo_log
    }
}

/// Register the deltaweb routes. Also used to build the App in tests.
pub fn configure_services(cfg: &mut web::ServiceConfig, state: Data<ServerState>) {
    cfg.app_data(state)
        .service(
            web::resource([demo::DEMO_LOG_ROUTE, demo::DEMO_LOG_ANY_ROUTE])
                .route(web::get().to(demo::demo_log)),
        )
        .service(
            web::scope(DELTAWEB_API_ROUTE)
                .service(api_delta::v0::history::history_list)
                .service(api_delta::v0::history::history_get),
        )
        .route(openapi::JSON_PATH, web::get().to(openapi::openapi_json))
        .default_service(web::get().to(www::www_handler));
}

/// Bind a deltaweb server and start its workers
///
/// Fails if the address can't be bound. The returned Server must be awaited
/// to serve requests, and its handle can stop it from another thread. Call
/// from within an actix System.
pub fn init_delta_server(config: ServerConfig) -> io::Result<Server> {
    let host = config.host.clone();
    let port = config.port;
    let state = Data::new(ServerState::new(&config));
    let token = state.store().token().to_string();

    let server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_header()
                    .allow_any_method()
                    .expose_headers([header::ETAG.as_str(), HEADER_IM, HEADER_DELTA_BASE]),
            )
            // Access log using env_logger
            .wrap(Logger::default())
            // Log requests and responses
            .wrap_fn(|req, srv| {
                debug!("HttpRequest : {} {}", req.head().method, req.path());
                let fut = srv.call(req);
                async {
                    let res = fut.await?;

                    let reason = res.response().head().reason();
                    let reason = if !reason.is_empty() && reason != "OK" {
                        format!(" ({reason})")
                    } else {
                        String::new()
                    };
                    debug!("HttpResponse: {}{reason}", res.status());

                    Ok(res)
                }
            })
            .configure(|cfg| configure_services(cfg, state))
    })
    .keep_alive(Duration::from_secs(CONNECTION_TIMEOUT));

    let server = server.bind((host.as_str(), port))?.run();

    info!("deltaweb server listening on {host}:{port} offering '{token}' deltas");
    if let Some(root) = &config.root {
        info!("serving files from {}", root.display());
    }
    Ok(server)
}

/// Run a deltaweb server in the foreground
pub async fn serve(config: ServerConfig) -> io::Result<()> {
    init_delta_server(config)?.await
}
