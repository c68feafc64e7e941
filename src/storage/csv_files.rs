use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{CommitRecord, RatedCommit};

pub const COMMITS_PREFIX: &str = "commits";
pub const RATED_PREFIX: &str = "rated_commits";

/// Flat-file persistence for both pipelines. Every save creates a new timestamped file.
pub struct Storage {
    output_dir: PathBuf,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn save_commits(&self, commits: &[CommitRecord]) -> Result<PathBuf> {
        let path = self.new_file(COMMITS_PREFIX);
        write_records(&path, commits)?;
        tracing::info!("Successfully wrote {} commits to {}", commits.len(), path.display());
        Ok(path)
    }

    pub fn save_rated(&self, commits: &[RatedCommit]) -> Result<PathBuf> {
        let path = self.new_file(RATED_PREFIX);
        write_records(&path, commits)?;
        tracing::info!("Saved rated commits to {}", path.display());
        Ok(path)
    }

    /// Newest `commits_*.csv` in the output directory by modification time.
    pub fn latest_commits_file(&self) -> Result<PathBuf> {
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.output_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !(name.starts_with(&format!("{}_", COMMITS_PREFIX)) && name.ends_with(".csv")) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            candidates.push((modified, name, entry.path()));
        }

        let (_, _, path) = candidates.into_iter().max().ok_or_else(|| {
            Error::NoInputFile(
                format!("{}_*.csv", COMMITS_PREFIX),
                self.output_dir.display().to_string(),
            )
        })?;
        tracing::info!("Using latest commits file: {}", path.display());
        Ok(path)
    }

    pub fn load_commits<P: AsRef<Path>>(path: P) -> Result<Vec<CommitRecord>> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let commits = reader
            .deserialize()
            .collect::<std::result::Result<Vec<CommitRecord>, _>>()?;
        tracing::info!(
            "Successfully read {} commits from {}",
            commits.len(),
            path.as_ref().display()
        );
        Ok(commits)
    }

    fn new_file(&self, prefix: &str) -> PathBuf {
        self.output_dir
            .join(timestamped_file_name(prefix, Local::now()))
    }
}

pub fn timestamped_file_name(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}_{}.csv", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Header comes from the record's field order.
fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
