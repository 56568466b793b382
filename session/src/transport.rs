use std::{collections::VecDeque, fs, path::Path};

use serde_json::Value as JsonValue;
use tracing::debug;

/// Event surfaced by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// One raw message from the producer.
    Message(String),
    /// The producer closed the stream.
    Closed,
}

/// Failures raised by transports.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A recorded stream could not be read.
    #[error("failed to read recorded stream {path}: {source}")]
    Read {
        /// Path of the recording.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A recorded stream is neither a JSON array nor JSON lines.
    #[error("recorded stream is not valid JSON: {0}")]
    Recording(#[source] serde_json::Error),
    /// The outbound pull request could not be delivered.
    #[error("failed to send pull request: {0}")]
    Send(String),
}

/// Bidirectional channel to the event producer.
///
/// Pull requests flow out through [`Transport::request_more`]; messages and
/// closure flow back through [`Transport::poll`], which never blocks.
pub trait Transport {
    /// Asks the producer for the next message.
    fn request_more(&mut self) -> Result<(), TransportError>;

    /// Returns the next inbound event, if one is ready.
    fn poll(&mut self) -> Option<Inbound>;
}

/// Transport serving a recorded stream, one message per pull request.
#[derive(Debug, Default)]
pub struct ReplayTransport {
    messages: VecDeque<String>,
    pending: usize,
    closed: bool,
}

impl ReplayTransport {
    /// Creates a transport serving the given raw messages in order.
    #[must_use]
    pub fn new<I>(messages: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            messages: messages.into_iter().collect(),
            pending: 0,
            closed: false,
        }
    }

    /// Parses a recording that is either a JSON array of envelopes or one
    /// envelope per line.
    pub fn from_recording(contents: &str) -> Result<Self, TransportError> {
        let trimmed = contents.trim_start();
        if trimmed.starts_with('[') {
            let envelopes: Vec<JsonValue> =
                serde_json::from_str(trimmed).map_err(TransportError::Recording)?;
            let messages = envelopes
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()
                .map_err(TransportError::Recording)?;
            return Ok(Self::new(messages));
        }

        let messages = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned);
        Ok(Self::new(messages))
    }

    /// Reads a recording from disk.
    pub fn open(path: &Path) -> Result<Self, TransportError> {
        let contents = fs::read_to_string(path).map_err(|source| TransportError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let transport = Self::from_recording(&contents)?;
        debug!(
            path = %path.display(),
            messages = transport.remaining(),
            "recording loaded"
        );
        Ok(transport)
    }

    /// Number of messages not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.messages.len()
    }
}

impl Transport for ReplayTransport {
    fn request_more(&mut self) -> Result<(), TransportError> {
        self.pending += 1;
        Ok(())
    }

    fn poll(&mut self) -> Option<Inbound> {
        if self.closed || self.pending == 0 {
            return None;
        }
        self.pending -= 1;
        match self.messages.pop_front() {
            Some(message) => Some(Inbound::Message(message)),
            None => {
                self.closed = true;
                Some(Inbound::Closed)
            }
        }
    }
}
