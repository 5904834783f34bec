//! HTTP control surface for the train board.
//!
//! Serves the routes parsed by [`ControlCommand::from_path`] from one
//! wildcard GET handler. Handlers never touch the hardware: they queue the
//! command in [`Esp32SharedState`] and answer with the last status the main
//! loop published. The main loop drains the queue once per tick.
//!
//! # Responses
//!
//! - `200` with `state=Moving speed=255 lights=25`, or the JSON form when the
//!   request carries `Accept: application/json`
//! - `404` for unknown paths
//! - `503` when the command queue is full
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{Arc, Mutex};
//! use rs_conductor::config::WebConfig;
//! use rs_conductor::hal::esp32::{Esp32HttpServer, Esp32SharedState};
//!
//! let shared = Arc::new(Mutex::new(Esp32SharedState::default()));
//! let _server = Esp32HttpServer::new(&WebConfig::default(), shared.clone())?;
//!
//! loop {
//!     let pending = shared.lock().map(|mut s| s.take_pending()).unwrap_or_default();
//!     for cmd in pending {
//!         controller.apply_control(cmd)?;
//!     }
//!     // tick...
//! }
//! ```

use std::sync::{Arc, Mutex};

use esp_idf_hal::io::Write;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::{Headers, Method};
use esp_idf_svc::io::EspIOError;

use crate::config::WebConfig;
use crate::control::{ControlCommand, ControlStatus};
use crate::train::TrainState;

/// Commands that can wait between two ticks.
pub const PENDING_CAPACITY: usize = 8;

/// State shared between the server task and the main loop.
pub struct Esp32SharedState {
    /// Last status published by the main loop.
    pub status: ControlStatus,
    /// Commands received since the last drain, oldest first.
    pub pending: heapless::Deque<ControlCommand, PENDING_CAPACITY>,
}

impl Default for Esp32SharedState {
    fn default() -> Self {
        Self {
            status: ControlStatus {
                state: TrainState::Stopped,
                speed: 0,
                lights: 0,
            },
            pending: heapless::Deque::new(),
        }
    }
}

impl Esp32SharedState {
    /// Queue a command. Returns false if the queue is full.
    pub fn queue(&mut self, cmd: ControlCommand) -> bool {
        self.pending.push_back(cmd).is_ok()
    }

    /// Remove and return every queued command.
    pub fn take_pending(&mut self) -> heapless::Vec<ControlCommand, PENDING_CAPACITY> {
        let mut out = heapless::Vec::new();
        while let Some(cmd) = self.pending.pop_front() {
            let _ = out.push(cmd);
        }
        out
    }

    /// Publish a fresh status snapshot.
    pub fn publish(&mut self, status: ControlStatus) {
        self.status = status;
    }
}

/// Running control server. Dropping it stops the server.
pub struct Esp32HttpServer {
    _server: EspHttpServer<'static>,
}

enum Reply {
    Status(ControlStatus),
    NotFound,
    Busy,
    Unavailable,
}

fn handle(shared: &Mutex<Esp32SharedState>, uri: &str) -> Reply {
    let Some(cmd) = ControlCommand::from_path(uri) else {
        return Reply::NotFound;
    };
    let Ok(mut state) = shared.lock() else {
        return Reply::Unavailable;
    };
    if cmd.is_mutating() && !state.queue(cmd) {
        log::warn!("http: queue full, dropping {:?}", cmd);
        return Reply::Busy;
    }
    log::debug!("http: {} -> {:?}", uri, cmd);
    Reply::Status(state.status)
}

impl Esp32HttpServer {
    /// Start serving on `config.port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to start.
    pub fn new(config: &WebConfig, shared: Arc<Mutex<Esp32SharedState>>) -> anyhow::Result<Self> {
        let server_config = Configuration {
            http_port: config.port,
            uri_match_wildcard: true,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&server_config)?;

        server.fn_handler("/*", Method::Get, move |req| {
            let mut uri: heapless::String<128> = heapless::String::new();
            let _ = uri.push_str(req.uri());
            let wants_json = req
                .header("Accept")
                .is_some_and(|accept| accept.contains("application/json"));

            match handle(&shared, &uri) {
                Reply::Status(status) => {
                    if wants_json {
                        if let Some(json) = status.to_json() {
                            let mut resp = req.into_response(
                                200,
                                None,
                                &[("Content-Type", "application/json")],
                            )?;
                            resp.write_all(json.as_bytes())?;
                            return Ok::<_, EspIOError>(());
                        }
                    }
                    let mut resp = req.into_ok_response()?;
                    resp.write_all(status.to_text().as_bytes())?;
                }
                Reply::NotFound => {
                    let mut resp = req.into_status_response(404)?;
                    resp.write_all(b"unknown route")?;
                }
                Reply::Busy => {
                    let mut resp = req.into_status_response(503)?;
                    resp.write_all(b"busy")?;
                }
                Reply::Unavailable => {
                    let mut resp = req.into_status_response(500)?;
                    resp.write_all(b"state unavailable")?;
                }
            }
            Ok::<_, EspIOError>(())
        })?;

        log::info!("http: control surface on port {}", config.port);
        Ok(Self { _server: server })
    }
}
