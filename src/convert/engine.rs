// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The conversion engine.
//!
//! Episodes are processed strictly one after another. For each episode the
//! per-stream source reads run on a dedicated rayon pool; everything after
//! that (merge, encode, chunking, container writes) happens on the calling
//! thread, which is the single owner of the [`RunContext`], the
//! [`ChunkWriter`] and the [`ContainerAssembler`].

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::config::{ConvertConfig, OutputLayout};
use crate::core::{ConvertError, Result, RunContext, StreamShape};
use crate::dataset::DatasetSource;
use crate::encoding::encode;
use crate::io::formats::mcap::chunk_writer::ChunkCodec;
use crate::io::formats::mcap::compression::compress;
use crate::io::formats::mcap::{ChunkWriter, ContainerAssembler};
use crate::io::metadata::{
    dataset_metadata, EpisodeSummary, DATASET_METADATA_NAME, EPISODE_METADATA_NAME,
};
use crate::io::StreamFilter;
use crate::timeline::TimelineMerger;
use crate::types::{CompressedChunk, SourceSample};

/// Shared cancellation flag.
///
/// Cloning shares the flag. The engine checks it between episodes and
/// between records; once set, the run stops and the container is finalized
/// with the episodes written so far.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Create an unset handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether an abort was requested.
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Totals of a conversion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertStats {
    /// Episodes fully written
    pub episodes: u64,
    /// Messages written
    pub messages: u64,
    /// Chunks written
    pub chunks: u64,
    /// Container bytes written
    pub bytes_written: u64,
    /// Messages per topic
    pub channel_messages: BTreeMap<String, u64>,
    /// Whether the run stopped on an abort request
    pub aborted: bool,
    /// Containers produced
    pub outputs: Vec<PathBuf>,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

type EpisodeCallback = Box<dyn Fn(&EpisodeSummary) + Send + Sync>;

/// Per-container state owned by the writing thread.
struct ContainerRun {
    ctx: RunContext,
    chunks: ChunkWriter,
    /// Episodes fully written into this container
    completed: u64,
    /// Earliest start for the next episode without an absolute start
    resume_at: u64,
}

impl ContainerRun {
    fn new(chunks: ChunkWriter) -> Self {
        Self {
            ctx: RunContext::new(),
            chunks,
            completed: 0,
            resume_at: 0,
        }
    }
}

/// Converts a [`DatasetSource`] into MCAP containers.
///
/// # Example
///
/// ```no_run
/// use lerobot2mcap::convert::{ConversionEngine, ConvertConfig};
/// use lerobot2mcap::dataset::LocalDataset;
///
/// # fn main() -> lerobot2mcap::Result<()> {
/// let dataset = LocalDataset::open("data/lerobot/pusht")?;
/// let engine = ConversionEngine::new(dataset, ConvertConfig::default())?;
/// let stats = engine.convert("out")?;
/// println!("{} messages in {} chunks", stats.messages, stats.chunks);
/// # Ok(())
/// # }
/// ```
pub struct ConversionEngine<S: DatasetSource> {
    source: S,
    config: ConvertConfig,
    filter: StreamFilter,
    pool: rayon::ThreadPool,
    abort: AbortHandle,
    on_episode: Option<EpisodeCallback>,
    chunk_codec: ChunkCodec,
}

impl<S: DatasetSource> ConversionEngine<S> {
    /// Create an engine for a source.
    pub fn new(source: S, config: ConvertConfig) -> Result<Self> {
        config.validate()?;

        let num_threads = config.decode_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("lerobot2mcap-decode-{index}"))
            .build()
            .map_err(|e| ConvertError::Io {
                message: format!("failed to create decode pool: {e}"),
            })?;

        Ok(Self {
            filter: config.stream_filter(),
            source,
            config,
            pool,
            abort: AbortHandle::new(),
            on_episode: None,
            chunk_codec: compress,
        })
    }

    /// Replace the stream filter derived from the configuration.
    pub fn with_filter(mut self, filter: StreamFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Use an externally created abort handle.
    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Call `f` after every fully written episode.
    pub fn on_episode<F>(mut self, f: F) -> Self
    where
        F: Fn(&EpisodeSummary) + Send + Sync + 'static,
    {
        self.on_episode = Some(Box::new(f));
        self
    }

    /// Compress chunks with `codec` instead of the built-in codecs.
    pub fn with_chunk_codec(mut self, codec: ChunkCodec) -> Self {
        self.chunk_codec = codec;
        self
    }

    /// Handle that cancels this engine's runs.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// The dataset source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Episodes this engine will convert, in order.
    pub fn episodes(&self) -> Result<Vec<u64>> {
        match &self.config.episodes {
            Some(selected) => Ok(selected.clone()),
            None => self.source.episode_indices(),
        }
    }

    /// Convert into `output_dir` following the configured layout.
    pub fn convert<P: AsRef<Path>>(&self, output_dir: P) -> Result<ConvertStats> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir).map_err(|e| ConvertError::Io {
            message: format!("failed to create {}: {e}", output_dir.display()),
        })?;

        let started = Instant::now();
        let episodes = self.episodes()?;
        let mut stats = ConvertStats::default();
        info!(
            dataset = %self.source.dataset_info().name,
            episodes = episodes.len(),
            layout = %self.config.layout,
            output = %output_dir.display(),
            "Starting conversion"
        );

        let result = match self.config.layout {
            OutputLayout::Single => {
                let path = output_dir.join(format!("{}.mcap", self.output_stem()));
                self.convert_file(&path, &episodes, &mut stats)
            }
            OutputLayout::PerEpisode => {
                let mut result = Ok(());
                for &index in &episodes {
                    if self.abort.is_aborted() {
                        stats.aborted = true;
                        break;
                    }
                    let path = output_dir.join(format!("episode_{index:06}.mcap"));
                    result = self.convert_file(&path, &[index], &mut stats);
                    if result.is_err() {
                        break;
                    }
                }
                result
            }
        };

        stats.elapsed = started.elapsed();
        result?;
        self.log_finished(&stats);
        Ok(stats)
    }

    /// Convert every selected episode into one container written to
    /// `writer`, ignoring the configured layout.
    ///
    /// Returns the writer once the container is closed.
    pub fn convert_to_writer<W: Write>(&self, writer: W) -> Result<(ConvertStats, W)> {
        let started = Instant::now();
        let episodes = self.episodes()?;
        let mut stats = ConvertStats::default();

        let mut assembler = self.assembler(writer);
        self.run_container(&mut assembler, &episodes, &mut stats)?;
        stats.elapsed = started.elapsed();
        self.log_finished(&stats);

        let writer = assembler
            .into_inner()
            .ok_or_else(|| ConvertError::invalid_state("finalizing", "release writer"))?;
        Ok((stats, writer))
    }

    fn log_finished(&self, stats: &ConvertStats) {
        if stats.aborted {
            warn!(
                episodes = stats.episodes,
                messages = stats.messages,
                "Conversion aborted, containers truncated"
            );
        } else {
            info!(
                episodes = stats.episodes,
                messages = stats.messages,
                chunks = stats.chunks,
                bytes = stats.bytes_written,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "Conversion complete"
            );
        }
    }

    fn output_stem(&self) -> String {
        if let Some(name) = &self.config.output_name {
            return name.clone();
        }
        let name = self.source.dataset_info().name;
        let stem: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if stem.is_empty() {
            "dataset".to_string()
        } else {
            stem
        }
    }

    fn assembler<W: Write>(&self, writer: W) -> ContainerAssembler<W> {
        ContainerAssembler::with_header(
            writer,
            &self.config.profile,
            &crate::io::formats::mcap::writer::library_name(),
        )
    }

    fn convert_file(&self, path: &Path, episodes: &[u64], stats: &mut ConvertStats) -> Result<()> {
        let file = fs::File::create(path).map_err(|e| ConvertError::Io {
            message: format!("failed to create {}: {e}", path.display()),
        })?;
        let mut assembler = self.assembler(std::io::BufWriter::with_capacity(1024 * 1024, file));
        stats.outputs.push(path.to_path_buf());
        debug!(path = %path.display(), episodes = episodes.len(), "Writing container");
        self.run_container(&mut assembler, episodes, stats)
    }

    /// Write `episodes` into one container with a fresh run context.
    ///
    /// The container is finalized whether the episodes succeed, fail or are
    /// aborted. On failure the original error is returned.
    fn run_container<W: Write>(
        &self,
        assembler: &mut ContainerAssembler<W>,
        episodes: &[u64],
        stats: &mut ConvertStats,
    ) -> Result<()> {
        let mut run = ContainerRun::new(
            ChunkWriter::new(self.config.chunk).with_codec(self.chunk_codec),
        );

        let outcome = self.write_episodes(assembler, &mut run, episodes, stats);

        if let Err(e) = &outcome {
            let fields: Vec<String> = e
                .log_fields()
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            error!(error = %e, fields = %fields.join(" "), "Conversion failed, finalizing container");
        }

        let truncated = outcome.is_err() || stats.aborted;
        let finalized = self.finalize(assembler, &mut run, truncated, stats);
        match (outcome, finalized) {
            (Err(e), Err(finalize_error)) => {
                warn!(error = %finalize_error, "Could not finalize container after failure");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), finalized) => finalized,
        }
    }

    fn write_episodes<W: Write>(
        &self,
        assembler: &mut ContainerAssembler<W>,
        run: &mut ContainerRun,
        episodes: &[u64],
        stats: &mut ConvertStats,
    ) -> Result<()> {
        assembler.start()?;
        for &index in episodes {
            if self.abort.is_aborted() {
                stats.aborted = true;
                return Ok(());
            }
            match self.write_episode(assembler, run, index, stats)? {
                Some(summary) => {
                    run.completed += 1;
                    stats.episodes += 1;
                    if let Some(callback) = &self.on_episode {
                        callback(&summary);
                    }
                }
                None => {
                    stats.aborted = true;
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Write one episode. Returns `None` when aborted midway.
    ///
    /// An episode without an absolute start is shifted to begin one frame
    /// period after the latest message already in the container.
    fn write_episode<W: Write>(
        &self,
        assembler: &mut ContainerAssembler<W>,
        run: &mut ContainerRun,
        index: u64,
        stats: &mut ConvertStats,
    ) -> Result<Option<EpisodeSummary>> {
        let episode = self
            .source
            .episode_metadata(index)
            .map_err(|e| e.in_episode(index))?;
        let offset = if episode.relative_time { run.resume_at } else { 0 };
        if offset > 0 {
            debug!(episode = index, offset, "Placing episode without absolute start");
        }

        let mut bindings: BTreeMap<&str, (u16, &StreamShape)> = BTreeMap::new();
        for (key, shape) in &episode.streams {
            if !self.filter.should_include(key) {
                continue;
            }
            let binding = run
                .ctx
                .register_stream(key, shape, &self.config.topic_for(key))
                .map_err(|e| e.in_episode(index))?;
            if let Some(schema) = run.ctx.schemas.get(binding.schema_id) {
                assembler.write_schema(schema)?;
            }
            if let Some(channel) = run.ctx.channels.get(binding.channel_id) {
                assembler.write_channel(channel)?;
            }
            bindings.insert(key.as_str(), (binding.channel_id, shape));
        }

        let streams = self.read_streams(index, bindings.keys().copied().collect())?;
        let mut summary = EpisodeSummary {
            episode_index: index,
            start_time: u64::MAX,
            end_time: 0,
            message_count: 0,
            time_offset: offset,
        };

        for record in TimelineMerger::new(index, streams) {
            if self.abort.is_aborted() {
                debug!(episode = index, "Abort requested mid-episode");
                return Ok(None);
            }
            let record = record?;
            let Some(&(channel_id, shape)) = bindings.get(record.stream_key.as_str()) else {
                continue;
            };
            let timestamp = record.timestamp.saturating_add(offset);
            let data = encode(&record, shape).map_err(|e| e.in_episode(index))?;
            let emitted = run
                .chunks
                .append(channel_id, timestamp, &data)
                .map_err(|e| e.in_episode(index))?;
            for chunk in emitted {
                write_chunk(assembler, &chunk, stats)?;
            }

            summary.start_time = summary.start_time.min(timestamp);
            summary.end_time = summary.end_time.max(timestamp);
            summary.message_count += 1;
        }

        if let Some(chunk) = run.chunks.flush().map_err(|e| e.in_episode(index))? {
            write_chunk(assembler, &chunk, stats)?;
        }
        if summary.message_count == 0 {
            summary.start_time = episode.start_time.saturating_add(offset);
            summary.end_time = summary.start_time;
        } else {
            let next = summary
                .end_time
                .saturating_add(frame_period(episode.rate_hint));
            run.resume_at = run.resume_at.max(next);
        }
        assembler.write_metadata(EPISODE_METADATA_NAME, &summary.to_metadata())?;

        debug!(
            episode = index,
            messages = summary.message_count,
            start = summary.start_time,
            end = summary.end_time,
            "Episode written"
        );
        Ok(Some(summary))
    }

    /// Read the selected streams of one episode on the decode pool.
    fn read_streams(
        &self,
        index: u64,
        keys: Vec<&str>,
    ) -> Result<BTreeMap<String, Vec<SourceSample>>> {
        let source = &self.source;
        let reads: Vec<(String, Result<Vec<SourceSample>>)> = self.pool.install(|| {
            keys.par_iter()
                .map(|&key| (key.to_string(), source.stream_records(index, key)))
                .collect()
        });

        let mut streams = BTreeMap::new();
        for (key, samples) in reads {
            let samples = samples.map_err(|e| e.in_episode(index))?;
            streams.insert(key, samples);
        }
        Ok(streams)
    }

    fn finalize<W: Write>(
        &self,
        assembler: &mut ContainerAssembler<W>,
        run: &mut ContainerRun,
        truncated: bool,
        stats: &mut ConvertStats,
    ) -> Result<()> {
        match run.chunks.flush() {
            Ok(Some(chunk)) => write_chunk(assembler, &chunk, stats)?,
            Ok(None) => {}
            // The failed chunk's messages are dropped; the rest is intact.
            Err(e) => warn!(error = %e, "Dropping buffered messages"),
        }

        let info = self.source.dataset_info();
        assembler.write_metadata(
            DATASET_METADATA_NAME,
            &dataset_metadata(&info, run.completed, truncated),
        )?;

        // Only messages inside written chunks count.
        stats.messages += assembler.index().message_count();
        for (&channel_id, &count) in assembler.index().channel_message_counts() {
            if let Some(channel) = run.ctx.channels.get(channel_id) {
                *stats
                    .channel_messages
                    .entry(channel.topic.clone())
                    .or_default() += count;
            }
        }

        stats.bytes_written += assembler.finish()?;
        Ok(())
    }
}

/// Gap left after the previous episode when placing one without an
/// absolute start.
fn frame_period(rate_hint: Option<f64>) -> u64 {
    rate_hint
        .filter(|hz| hz.is_finite() && *hz > 0.0)
        .map(|hz| (1e9 / hz).round() as u64)
        .unwrap_or(1)
        .max(1)
}

fn write_chunk<W: Write>(
    assembler: &mut ContainerAssembler<W>,
    chunk: &CompressedChunk,
    stats: &mut ConvertStats,
) -> Result<()> {
    assembler.write_chunk(chunk)?;
    stats.chunks += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::config::ConvertConfigBuilder;
    use crate::core::{Payload, PixelFormat, ScalarType};
    use crate::dataset::InMemoryDataset;
    use crate::io::formats::mcap::ContainerReader;
    use crate::types::Compression;

    fn scenario() -> InMemoryDataset {
        let state = StreamShape::vector(ScalarType::Float32, 2);
        let camera = StreamShape::image(2, 1, 1, PixelFormat::Mono8);
        let mut dataset = InMemoryDataset::new("test/scenario");
        dataset.add_stream(0, "state", state.clone());
        dataset.add_stream(0, "camera", camera);
        dataset.add_stream(1, "state", state);
        for t in [0, 10, 20] {
            dataset.push_sample(0, "state", t, Payload::Numeric(vec![t as f64, 1.0]));
        }
        for t in [5, 15] {
            dataset.push_sample(
                0,
                "camera",
                t,
                Payload::Image {
                    width: 2,
                    height: 1,
                    pixel_format: PixelFormat::Mono8,
                    data: vec![t as u8, 0],
                },
            );
        }
        for t in [0, 10] {
            dataset.push_sample(1, "state", t, Payload::Numeric(vec![t as f64, 2.0]));
        }
        dataset
    }

    fn config(max_messages: usize) -> ConvertConfig {
        ConvertConfigBuilder::new()
            .max_chunk_messages(max_messages)
            .compression(Compression::None)
            .decode_threads(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_abort_handle_shared() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_aborted());
        clone.abort();
        assert!(handle.is_aborted());
    }

    #[test]
    fn test_convert_to_writer_scenario() {
        let engine = ConversionEngine::new(scenario(), config(3)).unwrap();
        let (stats, bytes) = engine.convert_to_writer(Vec::new()).unwrap();

        assert_eq!(stats.episodes, 2);
        assert_eq!(stats.messages, 7);
        assert!(stats.chunks >= 3);
        assert!(!stats.aborted);
        assert_eq!(stats.channel_messages["/state"], 5);
        assert_eq!(stats.channel_messages["/camera"], 2);
        assert_eq!(stats.bytes_written, bytes.len() as u64);

        let reader = ContainerReader::from_bytes(bytes).unwrap();
        let statistics = reader.statistics();
        assert_eq!(statistics.channel_count, 2);
        assert_eq!(statistics.message_start_time, 0);
        assert_eq!(statistics.message_end_time, 20);
    }

    #[test]
    fn test_merged_order_of_first_episode() {
        let engine = ConversionEngine::new(scenario(), config(100)).unwrap();
        let (_, bytes) = engine.convert_to_writer(Vec::new()).unwrap();
        let reader = ContainerReader::from_bytes(bytes).unwrap();

        let topics: BTreeMap<u16, String> = reader
            .summary()
            .channels
            .values()
            .map(|c| (c.id, c.topic.clone()))
            .collect();
        let order: Vec<(String, u64)> = reader
            .messages()
            .map(|m| m.unwrap())
            .take(5)
            .map(|m| (topics[&m.channel_id].clone(), m.log_time))
            .collect();
        assert_eq!(
            order,
            vec![
                ("/state".to_string(), 0),
                ("/camera".to_string(), 5),
                ("/state".to_string(), 10),
                ("/camera".to_string(), 15),
                ("/state".to_string(), 20),
            ]
        );
    }

    #[test]
    fn test_episode_metadata_records() {
        let engine = ConversionEngine::new(scenario(), config(3)).unwrap();
        let (_, bytes) = engine.convert_to_writer(Vec::new()).unwrap();
        let reader = ContainerReader::from_bytes(bytes).unwrap();

        let metadata = reader.metadata().unwrap();
        let episodes: Vec<EpisodeSummary> = metadata
            .iter()
            .filter(|m| m.name == EPISODE_METADATA_NAME)
            .map(|m| EpisodeSummary::from_metadata(&m.metadata).unwrap())
            .collect();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].message_count, 5);
        assert_eq!((episodes[0].start_time, episodes[0].end_time), (0, 20));
        assert_eq!(episodes[1].message_count, 2);

        let dataset = metadata
            .iter()
            .find(|m| m.name == DATASET_METADATA_NAME)
            .unwrap();
        assert_eq!(dataset.metadata["episode_count"], "2");
        assert_eq!(dataset.metadata["complete"], "true");
        assert_eq!(reader.summary().metadata_indexes.len(), 3);
    }

    #[test]
    fn test_abort_before_start_writes_valid_empty_container() {
        let engine = ConversionEngine::new(scenario(), config(3)).unwrap();
        engine.abort_handle().abort();
        let (stats, bytes) = engine.convert_to_writer(Vec::new()).unwrap();
        assert!(stats.aborted);
        assert_eq!(stats.episodes, 0);

        let reader = ContainerReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.statistics().message_count, 0);
    }

    #[test]
    fn test_abort_after_first_episode() {
        let abort = AbortHandle::new();
        let trigger = abort.clone();
        let engine = ConversionEngine::new(scenario(), config(3))
            .unwrap()
            .with_abort_handle(abort)
            .on_episode(move |_| trigger.abort());
        let (stats, bytes) = engine.convert_to_writer(Vec::new()).unwrap();

        assert!(stats.aborted);
        assert_eq!(stats.episodes, 1);
        let reader = ContainerReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.statistics().message_count, 5);
    }

    #[test]
    fn test_stream_filter_skips_streams() {
        let engine = ConversionEngine::new(scenario(), config(3))
            .unwrap()
            .with_filter(StreamFilter::exclude(["camera"]));
        let (stats, bytes) = engine.convert_to_writer(Vec::new()).unwrap();
        assert_eq!(stats.messages, 5);
        let reader = ContainerReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.summary().channels.len(), 1);
    }

    #[test]
    fn test_selected_episodes() {
        let config = ConvertConfigBuilder::from_config(config(3))
            .episodes(vec![1])
            .build()
            .unwrap();
        let engine = ConversionEngine::new(scenario(), config).unwrap();
        let (stats, _) = engine.convert_to_writer(Vec::new()).unwrap();
        assert_eq!(stats.episodes, 1);
        assert_eq!(stats.messages, 2);
    }

    #[test]
    fn test_non_monotonic_source_still_finalizes() {
        let mut dataset = scenario();
        dataset.push_sample(1, "state", 5, Payload::Numeric(vec![0.0, 0.0]));
        let engine = ConversionEngine::new(dataset, config(3)).unwrap();

        let mut out = Vec::new();
        let err = match engine.convert_to_writer(&mut out) {
            Err(e) => e,
            Ok(_) => panic!("expected failure"),
        };
        assert!(matches!(
            err,
            ConvertError::NonMonotonicSource {
                episode: 1,
                previous: 10,
                timestamp: 5,
                ..
            }
        ));

        let reader = ContainerReader::from_bytes(out).unwrap();
        let metadata = reader.metadata().unwrap();
        let dataset = metadata
            .iter()
            .find(|m| m.name == DATASET_METADATA_NAME)
            .unwrap();
        assert_eq!(dataset.metadata["complete"], "false");
        assert_eq!(dataset.metadata["episode_count"], "1");
    }

    #[test]
    fn test_payload_mismatch_is_fatal() {
        let mut dataset = scenario();
        dataset.push_sample(1, "state", 30, Payload::Numeric(vec![1.0]));
        let engine = ConversionEngine::new(dataset, config(3)).unwrap();
        let err = engine.convert_to_writer(Vec::new()).map(|_| ()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::PayloadMismatch {
                episode: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn test_schema_conflict_across_episodes() {
        let mut dataset = scenario();
        dataset.add_stream(2, "state", StreamShape::vector(ScalarType::Float32, 3));
        let engine = ConversionEngine::new(dataset, config(3)).unwrap();
        let err = engine.convert_to_writer(Vec::new()).map(|_| ()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::SchemaConflict {
                episode: Some(2),
                ..
            }
        ));
        assert_eq!(err.log_fields()[0], ("episode", "2".to_string()));
        assert!(err.to_string().contains("in episode 2"));
    }

    fn unavailable_codec(
        _: Compression,
        _: i32,
        _: &[u8],
    ) -> std::result::Result<Vec<u8>, String> {
        Err("codec unavailable".to_string())
    }

    #[test]
    fn test_encoding_failure_surfaces_and_container_stays_valid() {
        let engine = ConversionEngine::new(scenario(), config(3))
            .unwrap()
            .with_chunk_codec(unavailable_codec);
        let mut out = Vec::new();
        let err = match engine.convert_to_writer(&mut out) {
            Err(e) => e,
            Ok(_) => panic!("expected failure"),
        };
        assert!(matches!(
            err,
            ConvertError::EncodingFailure {
                episode: Some(0),
                chunk_sequence: 0,
                ..
            }
        ));

        let reader = ContainerReader::from_bytes(out).unwrap();
        assert!(reader.summary().chunk_indexes.is_empty());
        assert_eq!(reader.statistics().message_count, 0);
        let metadata = reader.metadata().unwrap();
        let dataset = metadata
            .iter()
            .find(|m| m.name == DATASET_METADATA_NAME)
            .unwrap();
        assert_eq!(dataset.metadata["complete"], "false");
        assert_eq!(dataset.metadata["episode_count"], "0");
    }

    #[test]
    fn test_message_totals_come_from_written_chunks() {
        let abort = AbortHandle::new();
        let trigger = abort.clone();
        let engine = ConversionEngine::new(scenario(), config(100))
            .unwrap()
            .with_abort_handle(abort)
            .on_episode(move |_| trigger.abort());
        let (stats, bytes) = engine.convert_to_writer(Vec::new()).unwrap();

        let reader = ContainerReader::from_bytes(bytes).unwrap();
        assert_eq!(stats.messages, reader.statistics().message_count);
        assert_eq!(stats.messages, stats.channel_messages.values().sum::<u64>());
        assert_eq!(stats.messages, 5);
    }

    fn relative_dataset(episodes: u64, frames: u64) -> InMemoryDataset {
        let state = StreamShape::vector(ScalarType::Float32, 2);
        let mut dataset = InMemoryDataset::new("test/relative").with_fps(10.0);
        for episode in 0..episodes {
            dataset.add_relative_episode(episode);
            dataset.add_stream(episode, "state", state.clone());
            for frame in 0..frames {
                dataset.push_sample(
                    episode,
                    "state",
                    frame * 100_000_000,
                    Payload::Numeric(vec![frame as f64, episode as f64]),
                );
            }
        }
        dataset
    }

    #[test]
    fn test_relative_episodes_are_placed_back_to_back() {
        let engine = ConversionEngine::new(relative_dataset(3, 3), config(2)).unwrap();
        let (_, bytes) = engine.convert_to_writer(Vec::new()).unwrap();
        let reader = ContainerReader::from_bytes(bytes).unwrap();

        let chunks = &reader.summary().chunk_indexes;
        assert!(chunks.len() >= 3);
        for pair in chunks.windows(2) {
            assert!(pair[0].message_start_time <= pair[1].message_start_time);
            assert!(pair[0].message_end_time < pair[1].message_end_time);
        }

        let episodes: Vec<EpisodeSummary> = reader
            .metadata()
            .unwrap()
            .iter()
            .filter(|m| m.name == EPISODE_METADATA_NAME)
            .map(|m| EpisodeSummary::from_metadata(&m.metadata).unwrap())
            .collect();
        let placed: Vec<(u64, u64, u64)> = episodes
            .iter()
            .map(|e| (e.time_offset, e.start_time, e.end_time))
            .collect();
        assert_eq!(
            placed,
            vec![
                (0, 0, 200_000_000),
                (300_000_000, 300_000_000, 500_000_000),
                (600_000_000, 600_000_000, 800_000_000),
            ]
        );
        assert_eq!(reader.statistics().message_end_time, 800_000_000);
    }

    #[test]
    fn test_absolute_episodes_keep_source_time() {
        let engine = ConversionEngine::new(scenario(), config(100)).unwrap();
        let (_, bytes) = engine.convert_to_writer(Vec::new()).unwrap();
        let reader = ContainerReader::from_bytes(bytes).unwrap();
        let offsets: Vec<u64> = reader
            .metadata()
            .unwrap()
            .iter()
            .filter(|m| m.name == EPISODE_METADATA_NAME)
            .map(|m| EpisodeSummary::from_metadata(&m.metadata).unwrap().time_offset)
            .collect();
        assert_eq!(offsets, vec![0, 0]);
    }

    #[test]
    fn test_frame_period() {
        assert_eq!(frame_period(Some(10.0)), 100_000_000);
        assert_eq!(frame_period(Some(30.0)), 33_333_333);
        assert_eq!(frame_period(None), 1);
        assert_eq!(frame_period(Some(0.0)), 1);
        assert_eq!(frame_period(Some(f64::INFINITY)), 1);
    }
}
