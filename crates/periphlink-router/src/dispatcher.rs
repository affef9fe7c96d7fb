use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use periphlink_frame::{FrameDelimiter, ResponseWriter, SysexDelimiter};
use periphlink_transport::{Transport, TransportError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::Board;
use crate::error::{Result, RouterError};
use crate::router::{is_frame_local, CommandRouter, Outcome};

/// Default wait for inbound bytes between polls.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(10);

/// Configuration for [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How long [`Dispatcher::run`] waits for input when idle. Default: 10 ms.
    pub idle_wait: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            idle_wait: DEFAULT_IDLE_WAIT,
        }
    }
}

/// Frame counters kept by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Frames handed to the router.
    pub frames: u64,
    /// Frames that produced a reply.
    pub replied: u64,
    /// Frames dropped without a reply.
    pub dropped: u64,
    /// Frames aborted by a decode error.
    pub failed: u64,
    /// Envelopes discarded by the frame delimiter.
    pub discarded: u64,
}

/// Result of one [`Dispatcher::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// No complete frame was buffered.
    Idle,
    /// A frame was routed.
    Routed(Outcome),
    /// A frame was malformed and skipped.
    Failed,
}

/// Pulls complete frames off a transport and feeds them to a router, one
/// at a time.
pub struct Dispatcher<T, B, D = SysexDelimiter> {
    transport: T,
    router: CommandRouter<B>,
    delimiter: D,
    config: DispatchConfig,
    stats: DispatchStats,
}

impl<T: Transport, B: Board> Dispatcher<T, B> {
    /// Create a dispatcher using SysEx framing.
    pub fn new(transport: T, router: CommandRouter<B>) -> Self {
        Self::with_delimiter(transport, router, SysexDelimiter::new())
    }
}

impl<T: Transport, B: Board, D: FrameDelimiter> Dispatcher<T, B, D> {
    /// Create a dispatcher with an explicit framing layer.
    pub fn with_delimiter(transport: T, router: CommandRouter<B>, delimiter: D) -> Self {
        Self {
            transport,
            router,
            delimiter,
            config: DispatchConfig::default(),
            stats: DispatchStats::default(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Process at most one complete frame.
    ///
    /// Decode errors and failed reply writes abort only the frame that caused
    /// them and are reported as [`Poll::Failed`]. A closed transport and read
    /// errors are returned.
    pub fn poll(&mut self) -> Result<Poll> {
        let frame = match self.delimiter.next_frame(&mut self.transport) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(Poll::Idle),
            Err(err) => {
                self.stats.discarded = self.delimiter.discarded();
                return Err(err.into());
            }
        };
        self.stats.discarded = self.delimiter.discarded();
        self.stats.frames += 1;

        let writer_config = self.router.config().writer_config();
        let mut writer = ResponseWriter::with_config(&mut self.transport, writer_config);

        match self.router.dispatch(&frame, &mut writer) {
            Ok(outcome) => {
                match outcome {
                    Outcome::Replied => self.stats.replied += 1,
                    Outcome::Dropped(_) => self.stats.dropped += 1,
                }
                Ok(Poll::Routed(outcome))
            }
            Err(err) if is_frame_local(&err) => {
                warn!(
                    seq = frame.sequence_id(),
                    selector = frame.selector_byte(),
                    target = frame.target_id(),
                    error = %err,
                    "frame aborted"
                );
                self.stats.failed += 1;
                Ok(Poll::Failed)
            }
            Err(err) => Err(RouterError::Frame(err)),
        }
    }

    /// Poll until the transport closes or `stop` is set.
    ///
    /// A closed transport ends the loop normally. A reply that fails to write
    /// only fails its own frame; other read or wait errors are returned.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<DispatchStats> {
        info!(
            platform = %self.router.config().platform_id,
            libraries = self.router.registry().len(),
            "dispatcher started"
        );

        while !stop.load(Ordering::Relaxed) {
            match self.poll() {
                Ok(Poll::Idle) => {}
                Ok(_) => continue,
                Err(err) if err.is_closed() => {
                    debug!("transport closed");
                    break;
                }
                Err(err) => return Err(err),
            }

            match self.transport.wait_readable(self.config.idle_wait) {
                Ok(_) => {}
                Err(TransportError::Closed) => {
                    debug!("transport closed while idle");
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            frames = self.stats.frames,
            replied = self.stats.replied,
            dropped = self.stats.dropped,
            failed = self.stats.failed,
            "dispatcher stopped"
        );
        Ok(self.stats.clone())
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn router(&self) -> &CommandRouter<B> {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut CommandRouter<B> {
        &mut self.router
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the dispatcher and return the transport and router.
    pub fn into_parts(self) -> (T, CommandRouter<B>) {
        (self.transport, self.router)
    }
}
