use crate::preview::model::PreviewModel;
use crate::preview::PreviewSink;
use anyhow::Context;
use image::{ImageFormat, RgbImage};
use log::{info, warn};
use serde_json::json;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, PoisonError, RwLock};
use std::thread;
use tokio::runtime::Builder;
use warp::http::StatusCode;
use warp::{Filter, Reply};

#[derive(Default)]
struct PreviewState {
    model: PreviewModel,
    frame_jpeg: Option<Vec<u8>>,
}

type SharedState = Arc<RwLock<PreviewState>>;

/// Live view of the monitor over HTTP: the latest annotated frame, its
/// status, and a stop switch that ends the frame loop. Only started when
/// `preview_http` is set.
pub struct PreviewBridge {
    state: SharedState,
    local_addr: SocketAddr,
}

impl PreviewBridge {
    /// Binds `addr` on a dedicated thread and returns once the listener is up.
    pub fn start(addr: SocketAddr, stop: Arc<AtomicBool>) -> anyhow::Result<Self> {
        let state: SharedState = Arc::new(RwLock::new(PreviewState::default()));
        let filter = routes(state.clone(), stop);
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<SocketAddr>>();

        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = ready_tx.send(Err(err.into()));
                    return;
                }
            };
            runtime.block_on(async move {
                match warp::serve(filter).try_bind_ephemeral(addr) {
                    Ok((bound, server)) => {
                        let _ = ready_tx.send(Ok(bound));
                        server.await;
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err.into()));
                    }
                }
            });
        });

        let local_addr = ready_rx
            .recv()
            .context("preview server thread exited before binding")?
            .with_context(|| format!("binding preview server on {}", addr))?;
        Ok(Self { state, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Replaces the published model and frame.
    pub fn update(&self, model: PreviewModel, frame: &RgbImage) {
        let mut encoded = Vec::new();
        let written = frame.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg);
        let frame_jpeg = match written {
            Ok(()) => Some(encoded),
            Err(err) => {
                warn!("[preview] could not encode frame: {}", err);
                None
            }
        };
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        guard.model = model;
        if frame_jpeg.is_some() {
            guard.frame_jpeg = frame_jpeg;
        }
    }

    #[cfg(test)]
    fn snapshot(&self) -> PreviewModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .model
            .clone()
    }
}

impl PreviewSink for PreviewBridge {
    fn publish(&mut self, model: PreviewModel, frame: &RgbImage) {
        self.update(model, frame);
    }
}

fn routes(
    state: SharedState,
    stop: Arc<AtomicBool>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());
    let stop_filter = warp::any().map(move || stop.clone());

    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: SharedState| {
            let guard = state.read().unwrap_or_else(PoisonError::into_inner);
            warp::reply::json(&guard.model)
        });

    let frame_route = warp::path("frame.jpg")
        .and(warp::path::end())
        .and(warp::get())
        .and(state_filter)
        .map(|state: SharedState| {
            let guard = state.read().unwrap_or_else(PoisonError::into_inner);
            match guard.frame_jpeg.as_ref() {
                Some(bytes) => {
                    warp::reply::with_header(bytes.clone(), "content-type", "image/jpeg")
                        .into_response()
                }
                None => warp::reply::with_status("no frame yet", StatusCode::NOT_FOUND)
                    .into_response(),
            }
        });

    let stop_route = warp::path("stop")
        .and(warp::path::end())
        .and(warp::post())
        .and(stop_filter)
        .map(|stop: Arc<AtomicBool>| {
            stop.store(true, Ordering::SeqCst);
            info!("[preview] stop requested over HTTP");
            warp::reply::json(&json!({"status": "stopping"}))
        });

    status_route.or(frame_route).or(stop_route)
}
