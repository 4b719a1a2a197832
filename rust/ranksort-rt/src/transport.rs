//! Point-to-point message transport between workers.
//!
//! A [`Domain`] holds one [`Endpoint`] per worker. Endpoints exchange
//! [`Frame`]s: tagged, ordered payloads of values with no explicit length
//! field. A receiver discovers a pending frame's sender and length by
//! [`probing`](Endpoint::probe) before completing the matching receive,
//! mirroring a probe-then-receive wire contract.
//!
//! Ownership of a segment transfers with the frame: the payload `Vec` is
//! moved into the channel on send, so the sender cannot touch the memory
//! afterwards and the receiver owns it exclusively once the receive
//! completes. Sends never block (channels are unbounded); receives block
//! with no timeout.
//!
//! Every blocking wait multiplexes the data channel with a pool-wide
//! control channel, so a worker stuck in a receive can still be unwound
//! when another worker aborts the run, and idle helpers can be released
//! once the coordinator holds the final result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{self as cb, Select};

use ranksort_core::{Rank, SortError, Value};

/// Tag carried by every frame belonging to the sort protocol,
/// distinguishing it from unrelated traffic on a shared domain.
pub const SORT_TAG: u32 = 123;

// ---------------------------------------------------------------------------
// Frames and control messages
// ---------------------------------------------------------------------------

/// One message: an ordered payload of values from `src`, with no length
/// prefix. The length is discovered by probing on the receiving side.
#[derive(Debug)]
pub struct Frame {
    pub src: Rank,
    pub tag: u32,
    pub payload: Vec<Value>,
}

/// Pool-wide control traffic, delivered out of band from data frames.
#[derive(Debug, Clone)]
enum Control {
    /// A worker hit an unrecoverable error; everyone unwinds.
    Abort { origin: Rank, reason: String },
    /// The run is complete; helpers still waiting for work may exit.
    Release,
}

/// Outcome of a wildcard probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// A protocol frame is pending from `src` carrying `len` values.
    Frame { src: Rank, len: usize },
    /// The run completed without delegating to this worker.
    Released,
}

/// One recorded frame delivery, for traffic accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub src: Rank,
    pub dst: Rank,
    pub len: usize,
}

// ---------------------------------------------------------------------------
// Traffic log
// ---------------------------------------------------------------------------

/// Shared record of every frame sent within a domain.
///
/// Degenerate runs (segment length ≤ 1, pool size 1) are specified to send
/// zero messages; the log makes that observable.
#[derive(Debug, Clone, Default)]
pub struct TrafficLog {
    count: Arc<AtomicUsize>,
    routes: Arc<Mutex<Vec<Route>>>,
}

impl TrafficLog {
    fn record(&self, route: Route) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.routes.lock().unwrap().push(route);
    }

    /// Total number of frames sent so far.
    pub fn messages(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Snapshot of every delivery recorded so far, in send order per sender.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Control handle
// ---------------------------------------------------------------------------

/// A worker's handle on the pool-wide control channels.
///
/// Cheap to clone; survives the endpoint itself, which lets a panic guard
/// broadcast an abort while the worker thread unwinds.
#[derive(Clone)]
pub struct ControlHandle {
    rank: Rank,
    peers: Vec<cb::Sender<Control>>,
}

impl ControlHandle {
    /// Broadcast an abort notice to every other worker. Delivery failures
    /// are ignored: a peer that already exited needs no unblocking.
    pub fn abort(&self, reason: &str) {
        for (i, tx) in self.peers.iter().enumerate() {
            if i == self.rank.as_usize() {
                continue;
            }
            let _ = tx.send(Control::Abort {
                origin: self.rank,
                reason: reason.to_string(),
            });
        }
    }

    /// Release every other worker still blocked waiting for work.
    pub fn release(&self) {
        for (i, tx) in self.peers.iter().enumerate() {
            if i == self.rank.as_usize() {
                continue;
            }
            let _ = tx.send(Control::Release);
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Internal result of one blocking wait on the data/control pair.
enum Waited {
    Frame(Frame),
    Released,
}

/// One worker's connection to the domain.
pub struct Endpoint {
    rank: Rank,
    data_rx: cb::Receiver<Frame>,
    control_rx: cb::Receiver<Control>,
    data_peers: Vec<cb::Sender<Frame>>,
    control: ControlHandle,
    /// Frames that arrived while this worker was selectively waiting on a
    /// different sender. Legitimate in-protocol traffic, served later.
    pending: Vec<Frame>,
    traffic: TrafficLog,
}

impl Endpoint {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// A clonable handle for abort/release broadcasts.
    pub fn control_handle(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Send a protocol frame to `dst`. Non-blocking; the payload moves into
    /// the channel and this worker keeps no handle on it.
    pub fn send(&self, dst: Rank, payload: Vec<Value>) -> Result<(), SortError> {
        self.send_tagged(dst, SORT_TAG, payload)
    }

    /// General form of [`send`](Self::send) with an explicit tag. Frames
    /// carrying anything other than [`SORT_TAG`] are foreign traffic and
    /// fail the receiver's tag check.
    pub fn send_tagged(&self, dst: Rank, tag: u32, payload: Vec<Value>) -> Result<(), SortError> {
        let tx = self
            .data_peers
            .get(dst.as_usize())
            .ok_or_else(|| SortError::Protocol {
                rank: self.rank,
                detail: format!("send addressed to {dst} outside the pool"),
            })?;
        let route = Route {
            src: self.rank,
            dst,
            len: payload.len(),
        };
        tx.send(Frame {
            src: self.rank,
            tag,
            payload,
        })
        .map_err(|_| SortError::Disconnected(format!("{dst} is gone; frame not delivered")))?;
        self.traffic.record(route);
        Ok(())
    }

    /// Blocking wildcard probe: report the sender and payload length of the
    /// next pending protocol frame without surrendering it, or
    /// [`Probe::Released`] if the run finished without work for this worker.
    pub fn probe(&mut self) -> Result<Probe, SortError> {
        if let Some(frame) = self.pending.first() {
            return Ok(Probe::Frame {
                src: frame.src,
                len: frame.payload.len(),
            });
        }
        match self.wait()? {
            Waited::Released => Ok(Probe::Released),
            Waited::Frame(frame) => {
                let probe = Probe::Frame {
                    src: frame.src,
                    len: frame.payload.len(),
                };
                self.pending.push(frame);
                Ok(probe)
            }
        }
    }

    /// Blocking selective receive of `expected_len` values from `src`.
    ///
    /// Frames from other senders are buffered and served to later receives;
    /// a frame from `src` with the wrong length is a protocol violation.
    pub fn recv_from(&mut self, src: Rank, expected_len: usize) -> Result<Vec<Value>, SortError> {
        if let Some(pos) = self.pending.iter().position(|f| f.src == src) {
            let frame = self.pending.remove(pos);
            return self.take_payload(frame, expected_len);
        }
        loop {
            match self.wait()? {
                Waited::Released => {
                    return Err(SortError::Protocol {
                        rank: self.rank,
                        detail: format!("released while awaiting a result from {src}"),
                    });
                }
                Waited::Frame(frame) if frame.src == src => {
                    return self.take_payload(frame, expected_len);
                }
                Waited::Frame(frame) => self.pending.push(frame),
            }
        }
    }

    fn take_payload(&self, frame: Frame, expected_len: usize) -> Result<Vec<Value>, SortError> {
        if frame.payload.len() != expected_len {
            return Err(SortError::Protocol {
                rank: self.rank,
                detail: format!(
                    "{} delivered {} values, expected {expected_len}",
                    frame.src,
                    frame.payload.len()
                ),
            });
        }
        Ok(frame.payload)
    }

    /// Block on the data/control channel pair until something arrives.
    /// Frames are tag-checked on intake.
    fn wait(&mut self) -> Result<Waited, SortError> {
        let mut select = Select::new();
        let data = select.recv(&self.data_rx);
        let control = select.recv(&self.control_rx);
        let op = select.select();
        match op.index() {
            i if i == data => {
                let frame = op
                    .recv(&self.data_rx)
                    .map_err(|_| SortError::Disconnected("data channel closed mid-run".into()))?;
                if frame.tag != SORT_TAG {
                    return Err(SortError::Protocol {
                        rank: self.rank,
                        detail: format!(
                            "frame from {} carries foreign tag {}",
                            frame.src, frame.tag
                        ),
                    });
                }
                Ok(Waited::Frame(frame))
            }
            i if i == control => match op.recv(&self.control_rx) {
                Ok(Control::Abort { origin, reason }) => Err(SortError::Aborted { origin, reason }),
                Ok(Control::Release) => Ok(Waited::Released),
                // Control senders never all drop while any endpoint is
                // alive (each endpoint holds the full set), so a closed
                // control channel means the pool tore down.
                Err(_) => Err(SortError::Disconnected(
                    "control channel closed mid-run".into(),
                )),
            },
            _ => unreachable!("select returned an unregistered operation"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// A private communication domain: one endpoint per worker, fully
/// connected, plus the shared traffic log.
pub struct Domain {
    pub endpoints: Vec<Endpoint>,
    pub traffic: TrafficLog,
}

impl Domain {
    /// Build a domain for `pool_size` workers, ranks `0..pool_size`.
    pub fn new(pool_size: usize) -> Self {
        let traffic = TrafficLog::default();

        let mut data_txs = Vec::with_capacity(pool_size);
        let mut data_rxs = Vec::with_capacity(pool_size);
        let mut control_txs = Vec::with_capacity(pool_size);
        let mut control_rxs = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let (tx, rx) = cb::unbounded::<Frame>();
            data_txs.push(tx);
            data_rxs.push(rx);
            let (tx, rx) = cb::unbounded::<Control>();
            control_txs.push(tx);
            control_rxs.push(rx);
        }

        let endpoints = data_rxs
            .into_iter()
            .zip(control_rxs)
            .enumerate()
            .map(|(i, (data_rx, control_rx))| {
                let rank = Rank::new(i as u32);
                Endpoint {
                    rank,
                    data_rx,
                    control_rx,
                    data_peers: data_txs.clone(),
                    control: ControlHandle {
                        rank,
                        peers: control_txs.clone(),
                    },
                    pending: Vec::new(),
                    traffic: traffic.clone(),
                }
            })
            .collect();

        Self { endpoints, traffic }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
