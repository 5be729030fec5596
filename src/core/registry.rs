// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Run-scoped schema and channel registries.
//!
//! Both registries only grow. They are owned by a single [`RunContext`] that
//! lives exactly as long as one conversion run and is passed explicitly to
//! the stages that need it.

use std::collections::{BTreeMap, HashMap};

use super::error::{ConvertError, Result};
use super::shape::StreamShape;
use crate::encoding::message::{schema_for, MESSAGE_ENCODING};

/// First schema id. Schema id 0 means "no schema" in MCAP.
pub const FIRST_SCHEMA_ID: u16 = 1;

/// First channel id.
pub const FIRST_CHANNEL_ID: u16 = 0;

/// A registered schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    /// Schema id
    pub id: u16,
    /// Stream key the schema was derived from
    pub stream_key: String,
    /// Registered shape
    pub shape: StreamShape,
    /// Schema name (e.g. `lerobot_msgs/msg/ObservationState`)
    pub name: String,
    /// Schema encoding (e.g. `ros2msg`)
    pub encoding: String,
    /// Serialized schema descriptor
    pub data: Vec<u8>,
}

/// Schema registry keyed by stream key.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: Vec<SchemaEntry>,
    by_key: HashMap<String, u16>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream shape and return its schema id.
    ///
    /// Registering the same `(stream_key, shape)` again returns the same id.
    /// Registering a known key with another shape fails with
    /// [`ConvertError::SchemaConflict`] and leaves the registry unchanged.
    pub fn register(&mut self, stream_key: &str, shape: &StreamShape) -> Result<u16> {
        if let Some(&id) = self.by_key.get(stream_key) {
            let existing = &self.entries[(id - FIRST_SCHEMA_ID) as usize];
            if &existing.shape != shape {
                return Err(ConvertError::schema_conflict(
                    stream_key,
                    existing.shape.to_string(),
                    shape.to_string(),
                ));
            }
            return Ok(id);
        }

        let id = u16::try_from(self.entries.len())
            .ok()
            .and_then(|n| n.checked_add(FIRST_SCHEMA_ID))
            .ok_or_else(|| {
                ConvertError::invalid_state("registering schemas", "exceed 65535 schemas")
            })?;

        let descriptor = schema_for(stream_key, shape);
        self.entries.push(SchemaEntry {
            id,
            stream_key: stream_key.to_string(),
            shape: shape.clone(),
            name: descriptor.name,
            encoding: descriptor.encoding.to_string(),
            data: descriptor.data,
        });
        self.by_key.insert(stream_key.to_string(), id);
        Ok(id)
    }

    /// Get a schema by id.
    pub fn get(&self, id: u16) -> Option<&SchemaEntry> {
        id.checked_sub(FIRST_SCHEMA_ID)
            .and_then(|i| self.entries.get(i as usize))
    }

    /// Get the schema id registered for a stream key.
    pub fn id_for(&self, stream_key: &str) -> Option<u16> {
        self.by_key.get(stream_key).copied()
    }

    /// All schemas in registration order.
    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A registered channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEntry {
    /// Channel id
    pub id: u16,
    /// Topic name
    pub topic: String,
    /// Bound schema id
    pub schema_id: u16,
    /// Message encoding (e.g. `cdr`)
    pub message_encoding: String,
    /// Channel metadata, sorted by key
    pub metadata: BTreeMap<String, String>,
}

/// Channel registry keyed by topic name.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    entries: Vec<ChannelEntry>,
    by_topic: HashMap<String, u16>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic bound to a schema and return its channel id.
    ///
    /// Ids are handed out in first-registration order starting at
    /// [`FIRST_CHANNEL_ID`]. Re-registering a topic with the same schema
    /// returns the same id; with another schema it fails with
    /// [`ConvertError::ChannelConflict`].
    pub fn register(&mut self, topic: &str, schema_id: u16) -> Result<u16> {
        self.register_with_metadata(topic, schema_id, BTreeMap::new())
    }

    /// Register a topic and attach metadata on first registration.
    pub fn register_with_metadata(
        &mut self,
        topic: &str,
        schema_id: u16,
        metadata: BTreeMap<String, String>,
    ) -> Result<u16> {
        if let Some(&id) = self.by_topic.get(topic) {
            let existing = &self.entries[(id - FIRST_CHANNEL_ID) as usize];
            if existing.schema_id != schema_id {
                return Err(ConvertError::channel_conflict(
                    topic,
                    existing.schema_id,
                    schema_id,
                ));
            }
            return Ok(id);
        }

        let id = u16::try_from(self.entries.len())
            .ok()
            .and_then(|n| n.checked_add(FIRST_CHANNEL_ID))
            .ok_or_else(|| {
                ConvertError::invalid_state("registering channels", "exceed 65535 channels")
            })?;

        self.entries.push(ChannelEntry {
            id,
            topic: topic.to_string(),
            schema_id,
            message_encoding: MESSAGE_ENCODING.to_string(),
            metadata,
        });
        self.by_topic.insert(topic.to_string(), id);
        Ok(id)
    }

    /// Get a channel by id.
    pub fn get(&self, id: u16) -> Option<&ChannelEntry> {
        id.checked_sub(FIRST_CHANNEL_ID)
            .and_then(|i| self.entries.get(i as usize))
    }

    /// Get the channel id for a topic.
    pub fn id_for(&self, topic: &str) -> Option<u16> {
        self.by_topic.get(topic).copied()
    }

    /// All channels in registration order.
    pub fn entries(&self) -> &[ChannelEntry] {
        &self.entries
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schema and channel ids bound to one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBinding {
    /// Schema id
    pub schema_id: u16,
    /// Channel id
    pub channel_id: u16,
}

/// All mutable state that spans a conversion run.
#[derive(Debug, Default)]
pub struct RunContext {
    /// Schema registry
    pub schemas: SchemaRegistry,
    /// Channel registry
    pub channels: ChannelRegistry,
}

impl RunContext {
    /// Create a fresh context for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream's schema and channel in one step.
    pub fn register_stream(
        &mut self,
        stream_key: &str,
        shape: &StreamShape,
        topic: &str,
    ) -> Result<StreamBinding> {
        let schema_id = self.schemas.register(stream_key, shape)?;
        let mut metadata = BTreeMap::new();
        metadata.insert("stream_key".to_string(), stream_key.to_string());
        metadata.insert("shape".to_string(), shape.to_string());
        let channel_id = self
            .channels
            .register_with_metadata(topic, schema_id, metadata)?;
        Ok(StreamBinding {
            schema_id,
            channel_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::{PixelFormat, ScalarType};

    #[test]
    fn test_schema_register_idempotent() {
        let mut registry = SchemaRegistry::new();
        let shape = StreamShape::vector(ScalarType::Float32, 6);

        let first = registry.register("observation.state", &shape).unwrap();
        let second = registry.register("observation.state", &shape).unwrap();

        assert_eq!(first, FIRST_SCHEMA_ID);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_schema_conflict_does_not_overwrite() {
        let mut registry = SchemaRegistry::new();
        let shape = StreamShape::vector(ScalarType::Float32, 6);
        registry.register("action", &shape).unwrap();

        let err = registry
            .register("action", &StreamShape::vector(ScalarType::Float32, 7))
            .unwrap_err();
        assert!(matches!(err, ConvertError::SchemaConflict { .. }));

        let entry = registry.get(registry.id_for("action").unwrap()).unwrap();
        assert_eq!(entry.shape, shape);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_schema_ids_are_sequential() {
        let mut registry = SchemaRegistry::new();
        let a = registry
            .register("a", &StreamShape::vector(ScalarType::Float32, 1))
            .unwrap();
        let b = registry
            .register("b", &StreamShape::image(4, 4, 3, PixelFormat::Rgb8))
            .unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(registry.get(0), None);
        assert_eq!(registry.get(2).unwrap().stream_key, "b");
    }

    #[test]
    fn test_schema_content_is_pure_function_of_key_and_shape() {
        let shape = StreamShape::vector(ScalarType::Float64, 3);
        let mut r1 = SchemaRegistry::new();
        let mut r2 = SchemaRegistry::new();
        r1.register("observation.state", &shape).unwrap();
        r2.register("other", &StreamShape::vector(ScalarType::Int8, 1))
            .unwrap();
        r2.register("observation.state", &shape).unwrap();

        let e1 = r1.get(r1.id_for("observation.state").unwrap()).unwrap();
        let e2 = r2.get(r2.id_for("observation.state").unwrap()).unwrap();
        assert_eq!(e1.name, e2.name);
        assert_eq!(e1.data, e2.data);
    }

    #[test]
    fn test_channel_register_idempotent() {
        let mut registry = ChannelRegistry::new();
        let first = registry.register("/state", 1).unwrap();
        let second = registry.register("/state", 1).unwrap();
        assert_eq!(first, FIRST_CHANNEL_ID);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_channel_conflict() {
        let mut registry = ChannelRegistry::new();
        registry.register("/state", 1).unwrap();
        let err = registry.register("/state", 2).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::ChannelConflict {
                existing_schema: 1,
                requested_schema: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_channel_order_is_registration_order() {
        let mut registry = ChannelRegistry::new();
        registry.register("/z", 1).unwrap();
        registry.register("/a", 2).unwrap();
        let topics: Vec<_> = registry.entries().iter().map(|c| c.topic.as_str()).collect();
        assert_eq!(topics, vec!["/z", "/a"]);
        assert_eq!(registry.id_for("/a"), Some(1));
    }

    #[test]
    fn test_run_context_register_stream() {
        let mut ctx = RunContext::new();
        let shape = StreamShape::vector(ScalarType::Float32, 2);
        let binding = ctx.register_stream("action", &shape, "/action").unwrap();
        let again = ctx.register_stream("action", &shape, "/action").unwrap();
        assert_eq!(binding, again);

        let channel = ctx.channels.get(binding.channel_id).unwrap();
        assert_eq!(channel.metadata.get("stream_key").unwrap(), "action");
        assert_eq!(channel.message_encoding, "cdr");
    }
}
