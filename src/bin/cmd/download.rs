// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Download command - fetch a dataset from the Hugging Face Hub.

use std::path::PathBuf;

use clap::Args;

use crate::common::{ProgressBar, Result};
use indicatif::HumanBytes;
use lerobot2mcap::dataset::{default_download_dir, hub::select_files, HubClient};

/// Download a dataset.
#[derive(Args, Clone, Debug)]
pub struct DownloadCmd {
    /// Dataset id (e.g. lerobot/pusht)
    #[arg(value_name = "DATASET_ID")]
    dataset_id: String,

    /// Output directory (default: ./data/<DATASET_ID>)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Episodes to download (default: all)
    #[arg(short, long, num_args = 1..)]
    episodes: Vec<u64>,

    /// Repository revision
    #[arg(long, default_value = "main")]
    revision: String,

    /// Hub endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

impl DownloadCmd {
    pub fn run(self) -> Result<()> {
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| default_download_dir(&self.dataset_id));

        println!("Downloading: {}", self.dataset_id);
        if !self.episodes.is_empty() {
            println!("  Episodes: {:?}", self.episodes);
        }
        println!("  Output: {}", output_dir.display());

        let mut client = HubClient::new()?.with_revision(&self.revision);
        if let Some(endpoint) = self.endpoint {
            client = client.with_endpoint(endpoint);
        }

        let episodes = (!self.episodes.is_empty()).then_some(self.episodes.as_slice());
        let files = select_files(client.list_files(&self.dataset_id)?, episodes);
        let progress = ProgressBar::new(files.len() as u64, "download");

        let mut downloaded = 0usize;
        let mut skipped = 0usize;
        let mut bytes = 0u64;
        for file in &files {
            match client.download_file(&self.dataset_id, file, &output_dir)? {
                Some(n) => {
                    downloaded += 1;
                    bytes += n;
                }
                None => skipped += 1,
            }
            progress.inc(file.path.clone());
        }
        progress.finish_with_message("done".to_string());

        println!(
            "Downloaded {} files ({}), {} already present",
            downloaded,
            HumanBytes(bytes),
            skipped
        );
        Ok(())
    }
}
