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

//! # deltaweb-server
//!
//! An actix-web server that sends delta encoded responses (RFC 3229). It
//! serves files from a directory and a demo document that grows on every
//! request, plus a small JSON API for inspecting the version histories.
//!
//! Use [`serve`] to run in the foreground, or [`DeltaService`] to run on a
//! background thread that can be stopped and restarted.

mod config;
pub mod services;

use std::io;
use std::sync::mpsc;
use std::thread::JoinHandle;

use actix_web::{dev::ServerHandle, web};
use log::{info, warn};

pub use config::ServerConfig;
pub use services::{configure_services, init_delta_server, serve, ServerState};

/// A deltaweb server running on its own thread
pub struct DeltaService {
    config: ServerConfig,
    is_started: bool,
    port: Option<u16>,
    stop: Option<web::Data<StopHandle>>,
    server: Option<JoinHandle<io::Result<()>>>,
}

impl DeltaService {
    pub fn new(config: ServerConfig) -> Self {
        DeltaService {
            config,
            is_started: false,
            stop: None,
            server: None,
            port: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// Activate the listener on the specified port, replacing any running on another port
    ///
    /// A port of 0 stops the service. Returns once the port is bound, or with
    /// the error if it could not be.
    pub fn start(&mut self, port: u16) -> io::Result<()> {
        if let Some(active_port) = self.port {
            // If already listening at the correct port, we're good
            if active_port == port && self.is_started {
                return Ok(());
            }
        }

        self.stop();
        self.port = Some(port);

        if port == 0 {
            info!("DeltaService listener is disabled");
            return Ok(());
        }

        let stop_handle = web::Data::new(StopHandle::default());
        let cloned_stop_handle = stop_handle.clone();
        let (bound_sender, bound) = mpsc::channel();
        let mut config = self.config.clone();
        config.port = port;
        self.server = Some(std::thread::spawn(move || {
            actix_web::rt::System::new().block_on(async move {
                let server = match init_delta_server(config) {
                    Ok(server) => server,
                    Err(e) => {
                        let _ = bound_sender.send(Err(io::Error::new(e.kind(), e.to_string())));
                        return Err(e);
                    }
                };
                cloned_stop_handle.register(server.handle());
                let _ = bound_sender.send(Ok(()));
                server.await
            })
        }));

        let result = bound.recv().unwrap_or_else(|_| {
            Err(io::Error::other("DeltaService server thread ended before binding"))
        });
        match result {
            Ok(()) => {
                self.is_started = true;
                self.stop = Some(stop_handle);
                Ok(())
            }
            Err(e) => {
                warn!("DeltaService failed to start on port {port}: {e}");
                if let Some(server) = self.server.take() {
                    let _ = server.join();
                }
                Err(e)
            }
        }
    }

    /// Stop the server (if running) and wait for its thread to finish
    pub fn stop(&mut self) {
        if let Some(stop_handle) = self.stop.take() {
            stop_handle.stop(false);
        }

        if let Some(server) = self.server.take() {
            match server.join() {
                Ok(Err(e)) => warn!("DeltaService server ended with error: {e}"),
                Err(e) => warn!("DeltaService server thread panicked: {e:?}"),
                Ok(Ok(())) => {}
            }
        }
        self.is_started = false;
    }
}

impl Drop for DeltaService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Default)]
pub struct StopHandle {
    inner: parking_lot::Mutex<Option<ServerHandle>>,
}

impl StopHandle {
    /// Sets the server handle to stop.
    pub(crate) fn register(&self, handle: ServerHandle) {
        *self.inner.lock() = Some(handle);
    }

    /// Sends stop signal through contained server handle.
    pub(crate) fn stop(&self, graceful: bool) {
        if let Some(h) = self.inner.lock().as_ref() {
            #[allow(clippy::let_underscore_future)]
            let _ = h.stop(graceful);
        }
    }
}
