// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for lerobot2mcap.
//!
//! Every fatal condition of a conversion run is one variant of
//! [`ConvertError`]. Each variant carries enough context (stream key,
//! episode index, chunk sequence) to diagnose the failure without inspecting
//! engine internals.

use std::fmt;

/// Errors that can occur while converting a dataset into a container.
#[derive(Debug, Clone)]
pub enum ConvertError {
    /// A stream key was registered again with a different shape
    SchemaConflict {
        /// Episode being written when the conflict surfaced
        episode: Option<u64>,
        /// Stream key
        stream_key: String,
        /// Shape registered first
        existing: String,
        /// Shape requested now
        requested: String,
    },

    /// A topic was registered again with a different schema
    ChannelConflict {
        /// Episode being written when the conflict surfaced
        episode: Option<u64>,
        /// Topic name
        topic: String,
        /// Schema id registered first
        existing_schema: u16,
        /// Schema id requested now
        requested_schema: u16,
    },

    /// A stream's own timestamps went backwards
    NonMonotonicSource {
        /// Episode index
        episode: u64,
        /// Stream key
        stream_key: String,
        /// Last timestamp emitted for the stream
        previous: u64,
        /// Offending timestamp
        timestamp: u64,
    },

    /// Chunk compression failed
    EncodingFailure {
        /// Episode whose messages filled the chunk, if known
        episode: Option<u64>,
        /// Chunk sequence number
        chunk_sequence: u64,
        /// Codec name
        codec: String,
        /// Error message
        message: String,
    },

    /// Operation not permitted in the current writer state
    InvalidState {
        /// State the writer was in
        state: String,
        /// Attempted operation
        operation: String,
    },

    /// The dataset source could not provide the requested data
    SourceUnavailable {
        /// Episode index, if the failure is episode-scoped
        episode: Option<u64>,
        /// Stream key, if the failure is stream-scoped
        stream_key: Option<String>,
        /// Error message
        message: String,
    },

    /// A record does not fit the shape registered for its stream
    PayloadMismatch {
        /// Episode the record belongs to
        episode: Option<u64>,
        /// Stream key
        stream_key: String,
        /// What was wrong
        reason: String,
    },

    /// Parse error in metadata, configuration or container bytes
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Output stream failure
    Io {
        /// Error message
        message: String,
    },

    /// Remote repository failure
    Network {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },
}

impl ConvertError {
    /// Create a schema conflict error.
    pub fn schema_conflict(
        stream_key: impl Into<String>,
        existing: impl Into<String>,
        requested: impl Into<String>,
    ) -> Self {
        ConvertError::SchemaConflict {
            episode: None,
            stream_key: stream_key.into(),
            existing: existing.into(),
            requested: requested.into(),
        }
    }

    /// Create a channel conflict error.
    pub fn channel_conflict(
        topic: impl Into<String>,
        existing_schema: u16,
        requested_schema: u16,
    ) -> Self {
        ConvertError::ChannelConflict {
            episode: None,
            topic: topic.into(),
            existing_schema,
            requested_schema,
        }
    }

    /// Create a non-monotonic source error.
    pub fn non_monotonic(
        episode: u64,
        stream_key: impl Into<String>,
        previous: u64,
        timestamp: u64,
    ) -> Self {
        ConvertError::NonMonotonicSource {
            episode,
            stream_key: stream_key.into(),
            previous,
            timestamp,
        }
    }

    /// Create an encoding failure error.
    pub fn encoding_failure(
        chunk_sequence: u64,
        codec: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConvertError::EncodingFailure {
            episode: None,
            chunk_sequence,
            codec: codec.into(),
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(state: impl Into<String>, operation: impl Into<String>) -> Self {
        ConvertError::InvalidState {
            state: state.into(),
            operation: operation.into(),
        }
    }

    /// Create a source error scoped to an episode and optionally a stream.
    pub fn source(
        episode: Option<u64>,
        stream_key: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        ConvertError::SourceUnavailable {
            episode,
            stream_key: stream_key.map(str::to_string),
            message: message.into(),
        }
    }

    /// Create a payload mismatch error.
    pub fn payload_mismatch(stream_key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConvertError::PayloadMismatch {
            episode: None,
            stream_key: stream_key.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        ConvertError::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Attach an episode index to an episode-scoped error that has none yet.
    ///
    /// Errors that are not tied to an episode are returned unchanged.
    pub fn in_episode(mut self, index: u64) -> Self {
        if let Some(slot) = self.episode_slot() {
            slot.get_or_insert(index);
        }
        self
    }

    /// Episode the error is scoped to, if any.
    pub fn episode(&self) -> Option<u64> {
        match self {
            ConvertError::NonMonotonicSource { episode, .. } => Some(*episode),
            ConvertError::SchemaConflict { episode, .. }
            | ConvertError::ChannelConflict { episode, .. }
            | ConvertError::EncodingFailure { episode, .. }
            | ConvertError::SourceUnavailable { episode, .. }
            | ConvertError::PayloadMismatch { episode, .. } => *episode,
            _ => None,
        }
    }

    fn episode_slot(&mut self) -> Option<&mut Option<u64>> {
        match self {
            ConvertError::SchemaConflict { episode, .. }
            | ConvertError::ChannelConflict { episode, .. }
            | ConvertError::EncodingFailure { episode, .. }
            | ConvertError::SourceUnavailable { episode, .. }
            | ConvertError::PayloadMismatch { episode, .. } => Some(episode),
            _ => None,
        }
    }

    /// Whether this error came from the dataset source rather than the engine.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            ConvertError::SourceUnavailable { .. } | ConvertError::Network { .. }
        )
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(4);
        if let Some(episode) = self.episode() {
            fields.push(("episode", episode.to_string()));
        }
        fields.extend(self.detail_fields());
        fields
    }

    fn detail_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            ConvertError::SchemaConflict {
                stream_key,
                existing,
                requested,
                ..
            } => vec![
                ("stream", stream_key.clone()),
                ("existing", existing.clone()),
                ("requested", requested.clone()),
            ],
            ConvertError::ChannelConflict {
                topic,
                existing_schema,
                requested_schema,
                ..
            } => vec![
                ("topic", topic.clone()),
                ("existing_schema", existing_schema.to_string()),
                ("requested_schema", requested_schema.to_string()),
            ],
            ConvertError::NonMonotonicSource {
                stream_key,
                previous,
                timestamp,
                ..
            } => vec![
                ("stream", stream_key.clone()),
                ("previous", previous.to_string()),
                ("timestamp", timestamp.to_string()),
            ],
            ConvertError::EncodingFailure {
                chunk_sequence,
                codec,
                message,
                ..
            } => vec![
                ("chunk", chunk_sequence.to_string()),
                ("codec", codec.clone()),
                ("message", message.clone()),
            ],
            ConvertError::InvalidState { state, operation } => {
                vec![("state", state.clone()), ("operation", operation.clone())]
            }
            ConvertError::SourceUnavailable {
                stream_key,
                message,
                ..
            } => {
                let mut fields = Vec::with_capacity(2);
                if let Some(stream_key) = stream_key {
                    fields.push(("stream", stream_key.clone()));
                }
                fields.push(("message", message.clone()));
                fields
            }
            ConvertError::PayloadMismatch {
                stream_key, reason, ..
            } => {
                vec![("stream", stream_key.clone()), ("reason", reason.clone())]
            }
            ConvertError::ParseError { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            ConvertError::Io { message } => vec![("message", message.clone())],
            ConvertError::Network { url, message } => {
                vec![("url", url.clone()), ("message", message.clone())]
            }
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::SchemaConflict {
                episode,
                stream_key,
                existing,
                requested,
            } => write!(
                f,
                "Schema conflict for stream '{stream_key}'{}: registered as {existing}, requested {requested}",
                InEpisode(*episode)
            ),
            ConvertError::ChannelConflict {
                episode,
                topic,
                existing_schema,
                requested_schema,
            } => write!(
                f,
                "Channel conflict for topic '{topic}'{}: bound to schema {existing_schema}, requested schema {requested_schema}",
                InEpisode(*episode)
            ),
            ConvertError::NonMonotonicSource {
                episode,
                stream_key,
                previous,
                timestamp,
            } => write!(
                f,
                "Non-monotonic source in episode {episode}, stream '{stream_key}': timestamp {timestamp} after {previous}"
            ),
            ConvertError::EncodingFailure {
                episode,
                chunk_sequence,
                codec,
                message,
            } => write!(
                f,
                "Encoding failure in chunk {chunk_sequence} ({codec}){}: {message}",
                InEpisode(*episode)
            ),
            ConvertError::InvalidState { state, operation } => {
                write!(f, "Invalid state: cannot {operation} while {state}")
            }
            ConvertError::SourceUnavailable {
                episode,
                stream_key,
                message,
            } => {
                write!(f, "Source unavailable")?;
                if let Some(episode) = episode {
                    write!(f, " (episode {episode}")?;
                    if let Some(stream_key) = stream_key {
                        write!(f, ", stream '{stream_key}'")?;
                    }
                    write!(f, ")")?;
                } else if let Some(stream_key) = stream_key {
                    write!(f, " (stream '{stream_key}')")?;
                }
                write!(f, ": {message}")
            }
            ConvertError::PayloadMismatch {
                episode,
                stream_key,
                reason,
            } => write!(
                f,
                "Payload mismatch for stream '{stream_key}'{}: {reason}",
                InEpisode(*episode)
            ),
            ConvertError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            ConvertError::Io { message } => write!(f, "I/O error: {message}"),
            ConvertError::Network { url, message } => {
                write!(f, "Network error for {url}: {message}")
            }
        }
    }
}

/// Renders ` in episode N` when an episode is known.
struct InEpisode(Option<u64>);

impl fmt::Display for InEpisode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(episode) => write!(f, " in episode {episode}"),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<std::io::Error> for ConvertError {
    fn from(err: std::io::Error) -> Self {
        ConvertError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for lerobot2mcap operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
