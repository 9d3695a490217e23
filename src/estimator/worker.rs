//! Off-thread position estimation.
//!
//! The estimator is stateful, so the worker enforces one request in flight
//! and applies requests strictly in order. Every request carries the
//! generation it was issued under; `reset` starts a new generation and any
//! response from an older one is dropped on receipt.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, warn};

use crate::config::EstimatorConfig;
use crate::error::{TrackError, TrackResult};
use crate::estimator::{PositionEstimator, PositionUpdateRequest};
use crate::types::Pose;

enum WorkerMessage {
    Update {
        generation: u64,
        request: PositionUpdateRequest,
    },
    Reset {
        generation: u64,
    },
    Shutdown,
}

/// Outcome of one request, tagged with the request's generation
#[derive(Clone, Debug, PartialEq)]
pub struct PositionUpdateResponse {
    pub generation: u64,
    pub result: TrackResult<Pose>,
}

pub struct EstimatorWorker {
    requests: Sender<WorkerMessage>,
    responses: Receiver<PositionUpdateResponse>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
    in_flight: bool,
    stale_dropped: u64,
}

impl EstimatorWorker {
    pub fn spawn(config: EstimatorConfig) -> TrackResult<Self> {
        let (req_tx, req_rx) = unbounded::<WorkerMessage>();
        let (resp_tx, resp_rx) = unbounded::<PositionUpdateResponse>();

        let handle = thread::Builder::new()
            .name("estimator-worker".to_string())
            .spawn(move || worker_loop(config, req_rx, resp_tx))
            .map_err(|e| TrackError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            requests: req_tx,
            responses: resp_rx,
            handle: Some(handle),
            generation: 0,
            in_flight: false,
            stale_dropped: 0,
        })
    }

    /// Sends a request. Fails if the previous response has not been consumed.
    pub fn submit(&mut self, request: PositionUpdateRequest) -> TrackResult<()> {
        if self.in_flight {
            return Err(TrackError::RequestInFlight(self.generation));
        }
        if let Err(e) = request.validate() {
            warn!("Rejected estimator request: {}", e);
            return Err(e);
        }
        self.requests
            .send(WorkerMessage::Update {
                generation: self.generation,
                request,
            })
            .map_err(|_| TrackError::WorkerDisconnected)?;
        self.in_flight = true;
        Ok(())
    }

    /// Non-blocking check for the current generation's response.
    pub fn poll(&mut self) -> TrackResult<Option<Pose>> {
        loop {
            match self.responses.try_recv() {
                Ok(resp) => {
                    if let Some(result) = self.accept(resp) {
                        return result.map(Some);
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(TrackError::WorkerDisconnected),
            }
        }
    }

    /// Waits up to `timeout` for the pending response. `Ok(None)` on timeout
    /// lets a caller-level watchdog decide what a stall means.
    pub fn poll_timeout(&mut self, timeout: Duration) -> TrackResult<Option<Pose>> {
        if !self.in_flight {
            return Err(TrackError::NothingInFlight);
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok(resp) => {
                    if let Some(result) = self.accept(resp) {
                        return result.map(Some);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TrackError::WorkerDisconnected)
                }
            }
        }
    }

    /// Sends a request and blocks until its correlated response arrives.
    pub fn round_trip(&mut self, request: PositionUpdateRequest) -> TrackResult<Pose> {
        self.submit(request)?;
        loop {
            let resp = self
                .responses
                .recv()
                .map_err(|_| TrackError::WorkerDisconnected)?;
            if let Some(result) = self.accept(resp) {
                return result;
            }
        }
    }

    /// Discards the remote estimator state. Responses still on their way
    /// for the old generation will be ignored.
    pub fn reset(&mut self) -> TrackResult<()> {
        self.generation += 1;
        self.in_flight = false;
        self.requests
            .send(WorkerMessage::Reset {
                generation: self.generation,
            })
            .map_err(|_| TrackError::WorkerDisconnected)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    fn accept(&mut self, resp: PositionUpdateResponse) -> Option<TrackResult<Pose>> {
        if resp.generation != self.generation {
            self.stale_dropped += 1;
            debug!(
                "Dropped stale estimator response (generation {} != {})",
                resp.generation, self.generation
            );
            return None;
        }
        self.in_flight = false;
        Some(resp.result)
    }
}

impl Drop for EstimatorWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Estimator worker panicked during shutdown");
            }
        }
    }
}

fn worker_loop(
    config: EstimatorConfig,
    requests: Receiver<WorkerMessage>,
    responses: Sender<PositionUpdateResponse>,
) {
    let mut estimator = PositionEstimator::new(config);
    for msg in requests.iter() {
        match msg {
            WorkerMessage::Update {
                generation,
                request,
            } => {
                debug!(
                    "Applying request at {:.0}ms (generation {})",
                    request.timestamp_ms(),
                    generation
                );
                let result = estimator.apply(&request);
                if responses.send(PositionUpdateResponse { generation, result }).is_err() {
                    break;
                }
            }
            WorkerMessage::Reset { generation } => {
                debug!("Estimator reset for generation {}", generation);
                estimator.reset();
            }
            WorkerMessage::Shutdown => break,
        }
    }
}
