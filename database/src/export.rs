//! File export fan-out: every run mirrors its batch to timestamped CSV and
//! JSON files, independent of the SQLite sink.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use prospect_core::{Comment, CoreError, Post};
use serde::Serialize;
use tracing::info;

/// Run-start stamp embedded in export file names, e.g. `20260825_143005`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub posts_csv: PathBuf,
    pub posts_json: PathBuf,
    pub comments_csv: Option<PathBuf>,
    pub comments_json: Option<PathBuf>,
}

/// Write the batch to `<dir>/reddit_posts_<stamp>.{csv,json}` plus comment
/// files when comments exist. The stamp comes from the run's start time, so
/// repeated runs never collide.
pub fn export_batch(
    dir: &Path,
    run_started_at: DateTime<Utc>,
    posts: &[Post],
    comments: &[Comment],
) -> Result<ExportPaths, CoreError> {
    fs::create_dir_all(dir)?;
    let stamp = run_started_at.format(TIMESTAMP_FORMAT).to_string();

    let posts_csv = dir.join(format!("reddit_posts_{stamp}.csv"));
    write_csv(&posts_csv, posts)?;
    info!("Posts exported to {}", posts_csv.display());

    let posts_json = dir.join(format!("reddit_posts_{stamp}.json"));
    write_json(&posts_json, posts)?;
    info!("Posts exported to {}", posts_json.display());

    let (comments_csv, comments_json) = if comments.is_empty() {
        (None, None)
    } else {
        let csv_path = dir.join(format!("reddit_comments_{stamp}.csv"));
        write_csv(&csv_path, comments)?;
        let json_path = dir.join(format!("reddit_comments_{stamp}.json"));
        write_json(&json_path, comments)?;
        info!("{} comments exported alongside posts", comments.len());
        (Some(csv_path), Some(json_path))
    };

    Ok(ExportPaths {
        posts_csv,
        posts_json,
        comments_csv,
        comments_json,
    })
}

fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<(), CoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<(), CoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}
