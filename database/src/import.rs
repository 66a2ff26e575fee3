//! Bulk reimport of previously exported JSON files. Serde's chrono support
//! coerces the serialized timestamp strings back into calendar timestamps,
//! and the primary-key upsert makes repeated imports idempotent.

use std::path::{Path, PathBuf};

use prospect_core::{Comment, CoreError, Post};
use serde::de::DeserializeOwned;
use tracing::{error, info};

use crate::Database;

const POSTS_PREFIX: &str = "reddit_posts_";
const COMMENTS_PREFIX: &str = "reddit_comments_";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub posts: u64,
    pub comments: u64,
    pub skipped_files: u64,
}

/// Import every exported JSON file under `dir` into the store. A file that
/// fails to parse is logged and skipped; a storage write failure surfaces
/// to the caller.
pub async fn import_directory(db: &Database, dir: &Path) -> Result<ImportSummary, CoreError> {
    // Table creation must precede any write
    db.run_migrations().await?;

    let (post_files, comment_files) = scan_exports(dir)?;
    info!(
        "Found {} post files and {} comment files in {}",
        post_files.len(),
        comment_files.len(),
        dir.display()
    );

    let mut summary = ImportSummary::default();

    for file in &post_files {
        match parse_export::<Post>(file) {
            Ok(posts) => {
                summary.posts += db.upsert_posts(&posts).await?;
                info!("Imported post file {}", file.display());
            }
            Err(e) => {
                error!("Importing post file {} failed: {}", file.display(), e);
                summary.skipped_files += 1;
            }
        }
    }

    for file in &comment_files {
        match parse_export::<Comment>(file) {
            Ok(comments) => {
                summary.comments += db.upsert_comments(&comments).await?;
                info!("Imported comment file {}", file.display());
            }
            Err(e) => {
                error!("Importing comment file {} failed: {}", file.display(), e);
                summary.skipped_files += 1;
            }
        }
    }

    info!(
        "Import finished: {} posts, {} comments, {} files skipped",
        summary.posts, summary.comments, summary.skipped_files
    );
    Ok(summary)
}

/// Exported JSON files under `dir`, split by record kind and sorted by name
/// (name order is stamp order).
fn scan_exports(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), CoreError> {
    let mut post_files = Vec::new();
    let mut comment_files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }
        if name.starts_with(POSTS_PREFIX) {
            post_files.push(path);
        } else if name.starts_with(COMMENTS_PREFIX) {
            comment_files.push(path);
        }
    }

    post_files.sort();
    comment_files.sort();
    Ok((post_files, comment_files))
}

fn parse_export<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CoreError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
