use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use rand::Rng;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::collection::{ImageCollection, ImageRef, Intake, is_remote};
use crate::config::Configuration;

/// Recursively collect image files under the library root, in path order.
#[instrument(skip(cfg), fields(root = %cfg.photo_library_path.display()))]
pub fn discover_images(cfg: &Configuration) -> Result<Vec<PathBuf>> {
    let root = cfg.photo_library_path.as_path();
    ensure!(
        root.is_dir(),
        "photo library {} is not a directory",
        root.display()
    );

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    info!(discovered = files.len(), "library scan complete");
    Ok(files)
}

/// Scan the library and load it into a fresh collection, shuffling once when
/// configured to.
pub fn load_collection<R: Rng + ?Sized>(
    cfg: &Configuration,
    rng: &mut R,
) -> Result<(ImageCollection, Intake)> {
    let files = discover_images(cfg).context("failed to scan photo library")?;
    let mut collection = ImageCollection::new();
    let intake = collection.add_paths(files.iter().map(PathBuf::as_path));
    if cfg.startup_shuffle {
        collection.shuffle(rng);
        debug!("startup shuffle applied");
    }
    info!(
        added = intake.added,
        duplicates = intake.duplicates,
        rejected = intake.rejected,
        "image collection ready"
    );
    Ok((collection, intake))
}

/// Add explicitly named sources, e.g. from an `add` command. Each one is a
/// local file or an `http(s)` image URL; anything else is rejected.
pub fn add_files(collection: &mut ImageCollection, sources: &[PathBuf]) -> Intake {
    let mut local: Vec<&Path> = Vec::new();
    let mut remote: Vec<ImageRef> = Vec::new();
    let mut rejected = 0usize;
    for source in sources {
        match source.to_str().filter(|raw| is_remote(raw)) {
            Some(url) => match ImageRef::from_remote(url) {
                Some(image) => remote.push(image),
                None => {
                    warn!(%url, "only image files are allowed");
                    rejected += 1;
                }
            },
            None if source.is_file() => local.push(source),
            None => {
                debug!(path = %source.display(), "no such file");
                rejected += 1;
            }
        }
    }

    let mut intake = collection.add_paths(local);
    let offered = remote.len();
    let added = collection.extend_unique(remote);
    intake.added += added;
    intake.duplicates += offered - added;
    intake.rejected += rejected;
    intake
}
