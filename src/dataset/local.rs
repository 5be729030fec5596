// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Exported dataset directory on disk.
//!
//! Expected layout:
//!
//! ```text
//! <root>/meta/info.json
//! <root>/meta/episodes.jsonl
//! <root>/data/chunk-000/episode_000000.parquet
//! <root>/images/<key>/episode_000000/frame_000000.png
//! ```
//!
//! `info.json` declares the features. Each data file holds one row per
//! frame with a `timestamp` in seconds relative to the episode start, a
//! `frame_index`, and one value per numeric feature. Data files are parquet,
//! or line-delimited JSON when the `data_path` template ends in `.jsonl`.
//!
//! Image features are stored inline in the data file or as per-frame files;
//! their bytes are passed through without decoding. Video features are only
//! converted when their frames were extracted to per-frame files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{columnar, DatasetSource};
use crate::core::{ConvertError, Payload, PixelFormat, Result, ScalarType, StreamShape};
use crate::types::{DatasetInfo, EpisodeMetadata, SourceSample};

/// Default data file template.
pub const DEFAULT_DATA_PATH: &str =
    "data/chunk-{episode_chunk:03d}/episode_{episode_index:06d}.parquet";

/// Default frame file template, without extension.
pub const DEFAULT_IMAGE_PATH: &str =
    "images/{image_key}/episode_{episode_index:06d}/frame_{frame_index:06d}";

/// Default number of episodes per data chunk directory.
pub const DEFAULT_CHUNKS_SIZE: u64 = 1000;

/// Per-frame columns that are bookkeeping, not streams.
const RESERVED_COLUMNS: [&str; 5] = [
    "timestamp",
    "frame_index",
    "episode_index",
    "index",
    "task_index",
];

/// One feature declared in `meta/info.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeatureSpec {
    /// Element type, or `image` / `video`
    pub dtype: String,
    /// Dimensions; `[height, width, channels]` for images
    #[serde(default)]
    pub shape: Vec<u64>,
    /// Element names: a list, a map of lists, or null
    #[serde(default)]
    pub names: Option<serde_json::Value>,
    /// Extra feature information
    #[serde(default)]
    pub info: Option<BTreeMap<String, serde_json::Value>>,
}

impl FeatureSpec {
    /// Whether frames of this feature live in per-frame files.
    pub fn is_visual(&self) -> bool {
        matches!(self.dtype.as_str(), "image" | "video")
    }

    /// Flattened element names, if they match the element count.
    fn element_names(&self, len: usize) -> Option<Vec<String>> {
        let names: Vec<String> = match self.names.as_ref()? {
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            serde_json::Value::Object(groups) => groups
                .values()
                .filter_map(|v| v.as_array())
                .flatten()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => return None,
        };
        (names.len() == len).then_some(names)
    }

    /// Pixel format named in `info`, if any.
    fn declared_pixel_format(&self) -> Option<&str> {
        self.info.as_ref()?.get("pixel_format")?.as_str()
    }

    /// Position of a named image dimension, falling back to `[h, w, c]`.
    fn image_dim(&self, name: &str, fallback: usize) -> Option<u64> {
        let position = match &self.names {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .position(|v| v.as_str() == Some(name))
                .unwrap_or(fallback),
            _ => fallback,
        };
        self.shape.get(position).copied()
    }
}

/// Contents of `meta/info.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatasetLayout {
    /// Frames per second
    #[serde(default)]
    pub fps: Option<f64>,
    /// Robot type
    #[serde(default)]
    pub robot_type: Option<String>,
    /// Repository id, when the export records it
    #[serde(default)]
    pub repo_id: Option<String>,
    /// Data file template
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Frame file template, without extension
    #[serde(default = "default_image_path")]
    pub image_path: String,
    /// Episodes per chunk directory
    #[serde(default = "default_chunks_size")]
    pub chunks_size: u64,
    /// Declared features
    #[serde(default)]
    pub features: BTreeMap<String, FeatureSpec>,
}

fn default_data_path() -> String {
    DEFAULT_DATA_PATH.to_string()
}

fn default_image_path() -> String {
    DEFAULT_IMAGE_PATH.to_string()
}

fn default_chunks_size() -> u64 {
    DEFAULT_CHUNKS_SIZE
}

/// One line of `meta/episodes.jsonl`.
#[derive(Debug, Clone, Deserialize)]
struct EpisodeEntry {
    episode_index: u64,
    /// Absolute start time in seconds
    #[serde(default)]
    start_time: Option<f64>,
}

/// One frame of a data file.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct FrameRow {
    /// Seconds since the episode start
    pub(super) timestamp: f64,
    pub(super) frame_index: u64,
    /// Remaining columns
    #[serde(flatten)]
    pub(super) values: BTreeMap<String, serde_json::Value>,
    /// Encoded images stored inline, keyed by feature
    #[serde(skip)]
    pub(super) images: BTreeMap<String, Vec<u8>>,
}

/// Encoding of the per-episode data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Parquet,
    JsonLines,
}

impl DataFormat {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") | Some("json") => DataFormat::JsonLines,
            _ => DataFormat::Parquet,
        }
    }
}

/// A dataset exported to a local directory.
pub struct LocalDataset {
    root: PathBuf,
    name: String,
    layout: DatasetLayout,
    /// Episode index to absolute start (ns), when the export records one
    episodes: BTreeMap<u64, Option<u64>>,
    frames: Mutex<Option<(u64, Arc<Vec<FrameRow>>)>>,
}

impl std::fmt::Debug for LocalDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDataset")
            .field("root", &self.root)
            .field("name", &self.name)
            .field("episodes", &self.episodes.len())
            .finish()
    }
}

impl LocalDataset {
    /// Open a dataset directory.
    ///
    /// Episodes come from `meta/episodes.jsonl`. When that file is missing,
    /// episode indices are taken from the data file names instead.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let info_path = root.join("meta").join("info.json");
        let text = fs::read_to_string(&info_path).map_err(|e| {
            ConvertError::source(None, None, format!("{}: {e}", info_path.display()))
        })?;
        let layout: DatasetLayout = serde_json::from_str(&text)
            .map_err(|e| ConvertError::parse("meta/info.json", e.to_string()))?;

        let episodes_path = root.join("meta").join("episodes.jsonl");
        let episodes = if episodes_path.exists() {
            read_episode_entries(&episodes_path)?
        } else {
            debug!(root = %root.display(), "no episodes.jsonl, scanning data files");
            scan_episode_files(&root.join("data"))?
        };

        let name = layout.repo_id.clone().unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        debug!(
            root = %root.display(),
            episodes = episodes.len(),
            features = layout.features.len(),
            "opened local dataset"
        );

        Ok(Self {
            root,
            name,
            layout,
            episodes,
            frames: Mutex::new(None),
        })
    }

    /// Dataset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed `meta/info.json`.
    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Path of an episode's data file.
    pub fn data_file(&self, index: u64) -> Result<PathBuf> {
        let chunk = index / self.layout.chunks_size.max(1);
        let relative = expand_template(
            &self.layout.data_path,
            &[("episode_chunk", chunk), ("episode_index", index)],
            &[],
        )?;
        Ok(self.root.join(relative))
    }

    /// Path of one frame file, without extension.
    fn frame_stem(&self, key: &str, index: u64, frame: u64) -> Result<PathBuf> {
        let relative = expand_template(
            &self.layout.image_path,
            &[("episode_index", index), ("frame_index", frame)],
            &[("image_key", key)],
        )?;
        Ok(self.root.join(relative))
    }

    fn start_nanos(&self, index: u64) -> Result<Option<u64>> {
        self.episodes
            .get(&index)
            .copied()
            .ok_or_else(|| ConvertError::source(Some(index), None, "episode not in dataset"))
    }

    fn lock_frames(&self) -> Result<MutexGuard<'_, Option<(u64, Arc<Vec<FrameRow>>)>>> {
        self.frames
            .lock()
            .map_err(|e| ConvertError::source(None, None, format!("frame cache poisoned: {e}")))
    }

    /// Parsed rows of an episode's data file.
    ///
    /// The most recent episode is cached so that per-stream reads of the
    /// same episode parse the file once.
    fn frame_rows(&self, index: u64) -> Result<Arc<Vec<FrameRow>>> {
        let mut cache = self.lock_frames()?;
        if let Some((cached, rows)) = cache.as_ref() {
            if *cached == index {
                return Ok(Arc::clone(rows));
            }
        }

        let path = self.data_file(index)?;
        let rows = match DataFormat::of(&path) {
            DataFormat::Parquet => {
                let visual: BTreeSet<&str> = self
                    .layout
                    .features
                    .iter()
                    .filter(|(_, spec)| spec.is_visual())
                    .map(|(key, _)| key.as_str())
                    .collect();
                columnar::read_rows(&path, index, &visual)?
            }
            DataFormat::JsonLines => read_json_rows(&path, index)?,
        };
        debug!(episode = index, rows = rows.len(), path = %path.display(), "read data file");

        let rows = Arc::new(rows);
        *cache = Some((index, Arc::clone(&rows)));
        Ok(rows)
    }

    /// Resolve the shape of one feature for one episode.
    fn feature_shape(&self, key: &str, spec: &FeatureSpec, index: u64) -> Result<Option<StreamShape>> {
        if spec.is_visual() {
            return self.image_shape(key, spec, index);
        }

        let Some(dtype) = ScalarType::try_from_str(&spec.dtype) else {
            debug!(stream = key, dtype = %spec.dtype, "skipping non-numeric feature");
            return Ok(None);
        };
        let len = spec.shape.iter().product::<u64>().max(1) as usize;
        Ok(Some(match spec.element_names(len) {
            Some(names) => StreamShape::named_vector(dtype, names),
            None => StreamShape::vector(dtype, len),
        }))
    }

    fn image_shape(&self, key: &str, spec: &FeatureSpec, index: u64) -> Result<Option<StreamShape>> {
        let dim = |name: &str, fallback: usize| -> Result<u32> {
            spec.image_dim(name, fallback)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    ConvertError::parse(
                        "meta/info.json",
                        format!("feature '{key}' has no usable {name} in shape {:?}", spec.shape),
                    )
                })
        };
        let height = dim("height", 0)?;
        let width = dim("width", 1)?;
        let channels = spec.image_dim("channels", 2).unwrap_or(3) as u32;

        let pixel_format = match spec.declared_pixel_format() {
            Some(name) => name.parse()?,
            None => match self.detect_pixel_format(key, index, channels)? {
                Some(format) => format,
                None if spec.dtype == "video" => {
                    warn!(
                        stream = key,
                        episode = index,
                        "skipping video feature without extracted frames"
                    );
                    return Ok(None);
                }
                None => {
                    return Err(ConvertError::source(
                        Some(index),
                        Some(key),
                        "no inline image or frame file for the first frame",
                    ))
                }
            },
        };
        Ok(Some(StreamShape::image(width, height, channels, pixel_format)))
    }

    /// Guess the pixel format from the first frame of the episode.
    ///
    /// Returns `None` when the first frame is neither inline nor on disk.
    fn detect_pixel_format(&self, key: &str, index: u64, channels: u32) -> Result<Option<PixelFormat>> {
        let rows = self.frame_rows(index)?;
        let first = rows.first();
        if let Some(bytes) = first.and_then(|row| row.images.get(key)) {
            return PixelFormat::sniff(bytes).map(Some).ok_or_else(|| {
                ConvertError::source(Some(index), Some(key), "unrecognized inline image encoding")
            });
        }

        let stem = self.frame_stem(key, index, first.map(|row| row.frame_index).unwrap_or(0))?;
        for ext in ["png", "jpg", "jpeg"] {
            if stem.with_extension(ext).exists() {
                return Ok(PixelFormat::from_extension(ext));
            }
        }
        if ["raw", "bin"].iter().any(|ext| stem.with_extension(ext).exists()) {
            return raw_format_for_channels(channels).map(Some).ok_or_else(|| {
                ConvertError::source(
                    Some(index),
                    Some(key),
                    format!("cannot infer pixel format for {channels} channels"),
                )
            });
        }
        Ok(None)
    }

    fn read_frame(&self, key: &str, index: u64, frame: u64, format: PixelFormat) -> Result<Vec<u8>> {
        let stem = self.frame_stem(key, index, frame)?;
        let candidates: &[&str] = match format {
            PixelFormat::Png => &["png"],
            PixelFormat::Jpeg => &["jpg", "jpeg"],
            _ => &["raw", "bin"],
        };
        for ext in candidates {
            let path = stem.with_extension(ext);
            if path.exists() {
                return fs::read(&path).map_err(|e| {
                    ConvertError::source(Some(index), Some(key), format!("{}: {e}", path.display()))
                });
            }
        }
        Err(ConvertError::source(
            Some(index),
            Some(key),
            format!("missing frame file {}.{}", stem.display(), candidates[0]),
        ))
    }
}

impl DatasetSource for LocalDataset {
    fn episode_indices(&self) -> Result<Vec<u64>> {
        Ok(self.episodes.keys().copied().collect())
    }

    fn episode_metadata(&self, index: u64) -> Result<EpisodeMetadata> {
        let mut episode = match self.start_nanos(index)? {
            Some(start_time) => EpisodeMetadata::new(index, start_time),
            None => EpisodeMetadata::relative(index),
        };
        episode.rate_hint = self.layout.fps;

        for (key, spec) in &self.layout.features {
            if RESERVED_COLUMNS.contains(&key.as_str()) {
                continue;
            }
            if let Some(shape) = self.feature_shape(key, spec, index)? {
                episode.streams.insert(key.clone(), shape);
            }
        }
        Ok(episode)
    }

    fn stream_records(&self, index: u64, stream_key: &str) -> Result<Vec<SourceSample>> {
        let start_time = self.start_nanos(index)?.unwrap_or(0);
        let spec = self.layout.features.get(stream_key).ok_or_else(|| {
            ConvertError::source(Some(index), Some(stream_key), "feature not declared")
        })?;
        let shape = self
            .feature_shape(stream_key, spec, index)?
            .ok_or_else(|| {
                ConvertError::source(Some(index), Some(stream_key), "feature is not convertible")
            })?;
        let rows = self.frame_rows(index)?;

        let mut samples = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            let offset = seconds_to_nanos(row.timestamp).ok_or_else(|| {
                ConvertError::parse(
                    format!("episode {index} frame {}", row.frame_index),
                    format!("invalid timestamp {}", row.timestamp),
                )
            })?;
            let timestamp = start_time.saturating_add(offset);

            let payload = match &shape {
                StreamShape::Vector { .. } => {
                    let value = row.values.get(stream_key).ok_or_else(|| {
                        ConvertError::source(
                            Some(index),
                            Some(stream_key),
                            format!("frame {} has no value", row.frame_index),
                        )
                    })?;
                    Payload::Numeric(numeric_values(value).ok_or_else(|| {
                        ConvertError::parse(
                            format!("episode {index} frame {}", row.frame_index),
                            format!("'{stream_key}' is not numeric"),
                        )
                    })?)
                }
                StreamShape::Image {
                    width,
                    height,
                    pixel_format,
                    ..
                } => Payload::Image {
                    width: *width,
                    height: *height,
                    pixel_format: *pixel_format,
                    data: match row.images.get(stream_key) {
                        Some(bytes) => bytes.clone(),
                        None => self.read_frame(stream_key, index, row.frame_index, *pixel_format)?,
                    },
                },
            };
            samples.push(SourceSample::new(timestamp, payload));
        }
        Ok(samples)
    }

    fn dataset_info(&self) -> DatasetInfo {
        DatasetInfo {
            name: self.name.clone(),
            fps: self.layout.fps,
            robot_type: self.layout.robot_type.clone(),
        }
    }
}

fn read_json_rows(path: &Path, index: u64) -> Result<Vec<FrameRow>> {
    let text = fs::read_to_string(path).map_err(|e| {
        ConvertError::source(Some(index), None, format!("{}: {e}", path.display()))
    })?;
    let mut rows = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: FrameRow = serde_json::from_str(line).map_err(|e| {
            ConvertError::parse(format!("{}:{}", path.display(), line_no + 1), e.to_string())
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn read_episode_entries(path: &Path) -> Result<BTreeMap<u64, Option<u64>>> {
    let text = fs::read_to_string(path)
        .map_err(|e| ConvertError::source(None, None, format!("{}: {e}", path.display())))?;
    let mut episodes = BTreeMap::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: EpisodeEntry = serde_json::from_str(line).map_err(|e| {
            ConvertError::parse(format!("meta/episodes.jsonl:{}", line_no + 1), e.to_string())
        })?;
        let start = match entry.start_time {
            Some(seconds) => Some(seconds_to_nanos(seconds).ok_or_else(|| {
                ConvertError::parse(
                    "meta/episodes.jsonl",
                    format!("episode {} has invalid start_time {seconds}", entry.episode_index),
                )
            })?),
            None => None,
        };
        episodes.insert(entry.episode_index, start);
    }
    Ok(episodes)
}

fn scan_episode_files(dir: &Path) -> Result<BTreeMap<u64, Option<u64>>> {
    static EPISODE_FILE: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = EPISODE_FILE
        .get_or_init(|| Regex::new(r"^episode_(\d+)\.(?:parquet|jsonl)$").ok())
        .as_ref()
        .ok_or_else(|| ConvertError::parse("episode file pattern", "invalid regex"))?;

    let mut episodes = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if current == dir => {
                return Err(ConvertError::source(
                    None,
                    None,
                    format!("{}: {e}", current.display()),
                ))
            }
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(captures) = pattern.captures(&file_name) else {
                continue;
            };
            if let Ok(index) = captures[1].parse::<u64>() {
                episodes.insert(index, None);
            }
        }
    }
    Ok(episodes)
}

/// Expand `{name}` / `{name:0Nd}` placeholders.
fn expand_template(template: &str, numbers: &[(&str, u64)], strings: &[(&str, &str)]) -> Result<String> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([a-z_]+)(?::0?(\d+)d)?\}").ok())
        .as_ref()
        .ok_or_else(|| ConvertError::parse("path template", "invalid placeholder regex"))?;

    let mut out = String::with_capacity(template.len() + 16);
    let mut last = 0;
    for captures in pattern.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        let name = &captures[1];
        let width = captures
            .get(2)
            .and_then(|w| w.as_str().parse::<usize>().ok())
            .unwrap_or(0);

        if let Some((_, value)) = numbers.iter().find(|(n, _)| *n == name) {
            out.push_str(&format!("{value:0width$}"));
        } else if let Some((_, value)) = strings.iter().find(|(n, _)| *n == name) {
            out.push_str(value);
        } else {
            return Err(ConvertError::parse(
                "path template",
                format!("unknown placeholder '{name}' in {template}"),
            ));
        }
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn seconds_to_nanos(seconds: f64) -> Option<u64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let nanos = (seconds * 1e9).round();
    (nanos <= u64::MAX as f64).then_some(nanos as u64)
}

fn numeric_values(value: &serde_json::Value) -> Option<Vec<f64>> {
    fn scalar(value: &serde_json::Value) -> Option<f64> {
        match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    match value {
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    serde_json::Value::Array(_) => out.extend(numeric_values(item)?),
                    other => out.push(scalar(other)?),
                }
            }
            Some(out)
        }
        other => scalar(other).map(|v| vec![v]),
    }
}

fn raw_format_for_channels(channels: u32) -> Option<PixelFormat> {
    match channels {
        1 => Some(PixelFormat::Mono8),
        3 => Some(PixelFormat::Rgb8),
        4 => Some(PixelFormat::Rgba8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template_default_data_path() {
        let path = expand_template(
            DEFAULT_DATA_PATH,
            &[("episode_chunk", 0), ("episode_index", 42)],
            &[],
        )
        .unwrap();
        assert_eq!(path, "data/chunk-000/episode_000042.parquet");
    }

    #[test]
    fn test_data_format_from_extension() {
        assert_eq!(
            DataFormat::of(Path::new("data/chunk-000/episode_000000.parquet")),
            DataFormat::Parquet
        );
        assert_eq!(
            DataFormat::of(Path::new("data/chunk-000/episode_000000.jsonl")),
            DataFormat::JsonLines
        );
    }

    #[test]
    fn test_json_row_keeps_feature_columns() {
        let row: FrameRow = serde_json::from_str(
            r#"{"timestamp": 0.2, "frame_index": 2, "action": [1.0, 2.0]}"#,
        )
        .unwrap();
        assert_eq!(row.frame_index, 2);
        assert_eq!(numeric_values(&row.values["action"]), Some(vec![1.0, 2.0]));
        assert!(row.images.is_empty());
    }

    #[test]
    fn test_expand_template_strings_and_unknown() {
        let path = expand_template(
            DEFAULT_IMAGE_PATH,
            &[("episode_index", 1), ("frame_index", 7)],
            &[("image_key", "observation.images.top")],
        )
        .unwrap();
        assert_eq!(
            path,
            "images/observation.images.top/episode_000001/frame_000007"
        );

        assert!(expand_template("{video_key}", &[], &[]).is_err());
    }

    #[test]
    fn test_seconds_to_nanos() {
        assert_eq!(seconds_to_nanos(0.0), Some(0));
        assert_eq!(seconds_to_nanos(0.1), Some(100_000_000));
        assert_eq!(seconds_to_nanos(1.5), Some(1_500_000_000));
        assert_eq!(seconds_to_nanos(-1.0), None);
        assert_eq!(seconds_to_nanos(f64::NAN), None);
    }

    #[test]
    fn test_numeric_values() {
        let json: serde_json::Value = serde_json::from_str("[1, 2.5, true]").unwrap();
        assert_eq!(numeric_values(&json), Some(vec![1.0, 2.5, 1.0]));

        let nested: serde_json::Value = serde_json::from_str("[[1, 2], [3]]").unwrap();
        assert_eq!(numeric_values(&nested), Some(vec![1.0, 2.0, 3.0]));

        let scalar: serde_json::Value = serde_json::from_str("4").unwrap();
        assert_eq!(numeric_values(&scalar), Some(vec![4.0]));

        let text: serde_json::Value = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(numeric_values(&text), None);
    }

    #[test]
    fn test_feature_names_from_map() {
        let spec: FeatureSpec = serde_json::from_str(
            r#"{"dtype": "float32", "shape": [2], "names": {"motors": ["x", "y"]}}"#,
        )
        .unwrap();
        assert_eq!(spec.element_names(2), Some(vec!["x".to_string(), "y".to_string()]));
        assert_eq!(spec.element_names(3), None);
    }

    #[test]
    fn test_image_dims_follow_names() {
        let spec: FeatureSpec = serde_json::from_str(
            r#"{"dtype": "video", "shape": [3, 96, 128], "names": ["channels", "height", "width"]}"#,
        )
        .unwrap();
        assert!(spec.is_visual());
        assert_eq!(spec.image_dim("height", 0), Some(96));
        assert_eq!(spec.image_dim("width", 1), Some(128));
        assert_eq!(spec.image_dim("channels", 2), Some(3));
    }

    #[test]
    fn test_layout_defaults() {
        let layout: DatasetLayout = serde_json::from_str(r#"{"fps": 10}"#).unwrap();
        assert_eq!(layout.fps, Some(10.0));
        assert_eq!(layout.data_path, DEFAULT_DATA_PATH);
        assert_eq!(layout.chunks_size, DEFAULT_CHUNKS_SIZE);
        assert!(layout.features.is_empty());
    }
}
