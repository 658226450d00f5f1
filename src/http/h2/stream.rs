//! HTTP/2 stream management
//!
//! This module implements stream bookkeeping as defined in RFC 7540
//! Section 5.1, from the client side only.

use super::error::{Error, Result};
use std::collections::HashMap;

/// Stream ID type
pub type StreamId = u32;

/// Stream state as defined in RFC 7540 Section 5.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Idle: No frames have been sent/received
    Idle,
    /// Open: Both sides can send frames
    Open,
    /// Half-closed (local): We can't send, they can
    HalfClosedLocal,
    /// Half-closed (remote): They can't send, we can
    HalfClosedRemote,
    /// Closed: Stream is closed
    Closed,
}

impl StreamState {
    /// Check if stream can receive data
    pub fn can_receive(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    /// Check if stream is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed)
    }
}

/// HTTP/2 stream
#[derive(Debug)]
pub struct H2Stream {
    id: StreamId,
    state: StreamState,
    /// Set when the stream was closed by our RST_STREAM
    reset_locally: bool,
}

impl H2Stream {
    /// Create a new stream
    pub fn new(id: StreamId) -> Self {
        H2Stream {
            id,
            state: StreamState::Idle,
            reset_locally: false,
        }
    }

    /// Get stream ID
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Get stream state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Whether we cancelled this stream ourselves
    pub fn reset_locally(&self) -> bool {
        self.reset_locally
    }

    /// Prepare to send HEADERS
    pub fn send_headers(&mut self, end_stream: bool) -> Result<()> {
        match self.state {
            StreamState::Idle => {
                self.state = if end_stream {
                    StreamState::HalfClosedLocal
                } else {
                    StreamState::Open
                };
            }
            StreamState::Open | StreamState::HalfClosedRemote => {
                if end_stream {
                    self.state = StreamState::HalfClosedLocal;
                }
            }
            _ => {
                return Err(Error::Protocol(format!(
                    "Cannot send HEADERS in state {:?}",
                    self.state
                )));
            }
        }

        Ok(())
    }

    /// Record a HEADERS block received from the peer
    pub fn receive_headers(&mut self, end_stream: bool) -> Result<()> {
        if !self.state.can_receive() {
            return Err(Error::Protocol(format!(
                "Cannot receive HEADERS on stream {} in state {:?}",
                self.id, self.state
            )));
        }

        if end_stream {
            self.remote_end();
        }

        Ok(())
    }

    /// Peer sent END_STREAM
    pub fn remote_end(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        };
    }

    /// Prepare to send RST_STREAM
    ///
    /// Resetting an idle stream is a connection error (RFC 7540 Section 6.4),
    /// so it is refused here rather than put on the wire.
    pub fn send_reset(&mut self) -> Result<()> {
        match self.state {
            StreamState::Idle => Err(Error::Protocol(format!(
                "Cannot reset idle stream {}",
                self.id
            ))),
            StreamState::Closed => Err(Error::Protocol(format!(
                "Stream {} is already closed",
                self.id
            ))),
            _ => {
                self.state = StreamState::Closed;
                self.reset_locally = true;
                Ok(())
            }
        }
    }

    /// Close the stream
    pub fn close(&mut self) {
        self.state = StreamState::Closed;
    }
}

/// Stream manager
///
/// Tracks the client-initiated (odd) streams of one connection.
#[derive(Debug)]
pub struct StreamManager {
    streams: HashMap<StreamId, H2Stream>,
    next_stream_id: StreamId,
    /// Maximum number of concurrent streams (from the peer's SETTINGS)
    max_concurrent_streams: Option<u32>,
}

impl StreamManager {
    /// Create a new stream manager
    pub fn new() -> Self {
        StreamManager {
            streams: HashMap::new(),
            next_stream_id: 1,
            max_concurrent_streams: None,
        }
    }

    /// Create a manager for a connection reached through an h2c upgrade
    ///
    /// Stream 1 already carries the upgraded request and is half-closed
    /// (local) from the start (RFC 7540 Section 3.2).
    pub fn after_upgrade() -> Self {
        let mut manager = StreamManager::new();
        let mut stream = H2Stream::new(1);
        stream.state = StreamState::HalfClosedLocal;
        manager.streams.insert(1, stream);
        manager.next_stream_id = 3;
        manager
    }

    /// Set maximum concurrent streams
    pub fn set_max_concurrent_streams(&mut self, max: Option<u32>) {
        self.max_concurrent_streams = max;
    }

    /// Allocate next stream ID and create stream
    pub fn create_stream(&mut self) -> Result<StreamId> {
        if let Some(max) = self.max_concurrent_streams {
            if self.active_stream_count() >= max as usize {
                return Err(Error::TooManyStreams);
            }
        }

        let stream_id = self.next_stream_id;
        if stream_id > super::MAX_STREAM_ID {
            return Err(Error::InvalidStreamId(stream_id));
        }
        self.next_stream_id += 2;

        self.streams.insert(stream_id, H2Stream::new(stream_id));
        Ok(stream_id)
    }

    /// Get a mutable stream by ID
    pub fn get_stream_mut(&mut self, stream_id: StreamId) -> Option<&mut H2Stream> {
        self.streams.get_mut(&stream_id)
    }

    /// Get number of active streams
    pub fn active_stream_count(&self) -> usize {
        self.streams
            .values()
            .filter(|s| !s.state().is_closed())
            .count()
    }
}

impl Default for StreamManager {
    fn default() -> Self {
        Self::new()
    }
}
