// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dataset download from the Hugging Face Hub.
//!
//! The client lists the repository tree, keeps the `meta/` files plus the
//! files belonging to the requested episodes, and mirrors them under an
//! output directory with the same relative paths. Files already present
//! with the expected size are skipped.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::{ConvertError, Result};

/// Default Hub endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Default revision.
pub const DEFAULT_REVISION: &str = "main";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Default local directory for a dataset id: `./data/<dataset-id>`.
pub fn default_download_dir(dataset_id: &str) -> PathBuf {
    Path::new("data").join(dataset_id)
}

/// One file in the remote repository.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteFile {
    /// Path relative to the repository root
    pub path: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Entry type, `file` or `directory`
    #[serde(rename = "type")]
    pub kind: String,
}

impl RemoteFile {
    fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// Summary of a finished download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    /// Files fetched
    pub downloaded: usize,
    /// Files already present
    pub skipped: usize,
    /// Bytes fetched
    pub bytes: u64,
}

/// Blocking client for the Hub's dataset endpoints.
#[derive(Debug, Clone)]
pub struct HubClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    revision: String,
    token: Option<String>,
}

impl HubClient {
    /// Create a client for the public Hub.
    ///
    /// A token is picked up from `HF_TOKEN` when set.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(crate::io::formats::mcap::writer::library_name())
            .build()
            .map_err(|e| ConvertError::network(DEFAULT_ENDPOINT, e.to_string()))?;
        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            token: std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    /// Use another endpoint (mirrors, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Use another revision.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Use an access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn tree_url(&self, dataset_id: &str) -> String {
        format!(
            "{}/api/datasets/{dataset_id}/tree/{}?recursive=true",
            self.endpoint, self.revision
        )
    }

    fn file_url(&self, dataset_id: &str, path: &str) -> String {
        format!(
            "{}/datasets/{dataset_id}/resolve/{}/{path}",
            self.endpoint, self.revision
        )
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|e| ConvertError::network(url, e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConvertError::network(url, format!("HTTP {}", response.status())));
        }
        Ok(response)
    }

    /// List every file in the repository.
    pub fn list_files(&self, dataset_id: &str) -> Result<Vec<RemoteFile>> {
        let mut files = Vec::new();
        let mut next = Some(self.tree_url(dataset_id));
        while let Some(url) = next.take() {
            let response = self.get(&url)?;
            next = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);
            let page: Vec<RemoteFile> = response
                .json()
                .map_err(|e| ConvertError::network(&url, format!("invalid tree listing: {e}")))?;
            files.extend(page.into_iter().filter(RemoteFile::is_file));
        }
        debug!(dataset = dataset_id, files = files.len(), "listed repository");
        Ok(files)
    }

    /// Fetch one file into `output_dir`. Returns the bytes written, or
    /// `None` when an up-to-date copy already exists.
    pub fn download_file(
        &self,
        dataset_id: &str,
        file: &RemoteFile,
        output_dir: &Path,
    ) -> Result<Option<u64>> {
        let target = output_dir.join(&file.path);
        if let Ok(existing) = fs::metadata(&target) {
            if existing.len() == file.size {
                return Ok(None);
            }
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = self.file_url(dataset_id, &file.path);
        let mut response = self.get(&url)?;
        let mut partial = target.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);
        let mut out = BufWriter::new(fs::File::create(&partial)?);
        let bytes = response
            .copy_to(&mut out)
            .map_err(|e| ConvertError::network(&url, e.to_string()))?;
        out.into_inner()
            .map_err(|e| ConvertError::from(e.into_error()))?
            .sync_all()?;
        fs::rename(&partial, &target)?;
        Ok(Some(bytes))
    }

    /// Download the metadata and the requested episodes of a dataset.
    pub fn download(
        &self,
        dataset_id: &str,
        output_dir: &Path,
        episodes: Option<&[u64]>,
    ) -> Result<DownloadStats> {
        let files = select_files(self.list_files(dataset_id)?, episodes);
        info!(
            dataset = dataset_id,
            files = files.len(),
            output = %output_dir.display(),
            "downloading dataset"
        );

        let mut stats = DownloadStats::default();
        for file in &files {
            match self.download_file(dataset_id, file, output_dir)? {
                Some(bytes) => {
                    stats.downloaded += 1;
                    stats.bytes += bytes;
                }
                None => stats.skipped += 1,
            }
        }
        Ok(stats)
    }
}

/// Keep `meta/` files and the files of the requested episodes.
///
/// With no episode list every file is kept.
pub fn select_files(files: Vec<RemoteFile>, episodes: Option<&[u64]>) -> Vec<RemoteFile> {
    let Some(episodes) = episodes else {
        return files;
    };
    let tags: Vec<String> = episodes.iter().map(|e| format!("episode_{e:06}")).collect();
    files
        .into_iter()
        .filter(|file| {
            file.path.starts_with("meta/")
                || file.path.split('/').any(|part| {
                    let stem = part.split('.').next().unwrap_or(part);
                    tags.iter().any(|tag| stem == tag)
                })
        })
        .collect()
}

/// Extract the `rel="next"` target of a `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|p| p.trim() == r#"rel="next""#)
            .then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    })
}
