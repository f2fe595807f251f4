//! Indexing of pre-chunked course bundles.
//!
//! A bundle is a JSON file holding one course and its chunks:
//!
//! ```json
//! {"course": {"title": "...", "lessons": [...]}, "chunks": [...]}
//! ```

use crate::error::Result;
use crate::models::{Course, CourseBundle, CourseChunk};
use crate::vector_store::VectorStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Index one course and its chunks. Returns the number of chunks added.
#[instrument(skip_all, fields(title = %course.title))]
pub async fn add_course(store: &VectorStore, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
    store.add_course_metadata(course).await?;
    store.add_course_content(chunks).await?;
    Ok(chunks.len())
}

/// Index every `*.json` course bundle in `dir`.
///
/// Courses already in the catalog are skipped, as are files that fail to parse.
/// Returns `(courses_added, chunks_added)`; a missing directory yields `(0, 0)`.
#[instrument(skip(store))]
pub async fn add_course_folder(
    store: &VectorStore,
    dir: &Path,
    clear_existing: bool,
) -> Result<(usize, usize)> {
    if clear_existing {
        info!("Clearing existing course data");
        store.clear_all_data().await?;
    }

    if !dir.is_dir() {
        warn!("Course folder {:?} does not exist", dir);
        return Ok((0, 0));
    }

    let mut existing: HashSet<String> = store
        .get_existing_course_titles()
        .await?
        .into_iter()
        .collect();

    let mut courses_added = 0;
    let mut chunks_added = 0;

    for path in bundle_files(dir)? {
        let bundle = match read_bundle(&path) {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if existing.contains(&bundle.course.title) {
            info!("Course already indexed: {}", bundle.course.title);
            continue;
        }

        chunks_added += add_course(store, &bundle.course, &bundle.chunks).await?;
        courses_added += 1;
        existing.insert(bundle.course.title);
    }

    info!("Added {} courses with {} chunks", courses_added, chunks_added);
    Ok((courses_added, chunks_added))
}

/// `*.json` files directly inside `dir`, sorted by path.
fn bundle_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_bundle(path: &Path) -> Result<CourseBundle> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
