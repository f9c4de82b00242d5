//! Ordered image list shown by the slideshow.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "avif", "svg", "tif", "tiff", "ico",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    /// Unique within a collection; the file name for local files.
    pub name: String,
    pub url: String,
}

impl ImageRef {
    /// Build a reference for a local file, or `None` when it is not an image.
    pub fn from_path(path: &Path) -> Option<Self> {
        if !is_image(path) {
            return None;
        }
        let name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            name,
            url: path.display().to_string(),
        })
    }

    /// Remote images are identified by their URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: url.clone(),
            url,
        }
    }

    /// Accept an `http(s)` URL whose path names an image file.
    pub fn from_remote(url: &str) -> Option<Self> {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))?;
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        let (_host, path) = path.split_once('/')?;
        is_image(Path::new(path)).then(|| Self::from_url(url))
    }
}

pub fn is_remote(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

#[inline]
pub fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if IMAGE_EXTENSIONS.contains(&e.as_str())
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCollection {
    images: Vec<ImageRef>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn as_slice(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn get(&self, index: usize) -> Option<&ImageRef> {
        self.images.get(index)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.images.iter().position(|image| image.name == name)
    }

    pub fn to_shared(&self) -> Arc<[ImageRef]> {
        Arc::from(self.images.as_slice())
    }

    /// Append images whose names are not already present. Returns how many
    /// were added.
    pub fn extend_unique<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = ImageRef>,
    {
        let mut names: HashSet<String> = self.images.iter().map(|i| i.name.clone()).collect();
        let before = self.images.len();
        for image in incoming {
            if names.insert(image.name.clone()) {
                self.images.push(image);
            } else {
                debug!(name = %image.name, "skipping duplicate image");
            }
        }
        self.images.len() - before
    }

    /// Add local files, rejecting anything that is not an image.
    pub fn add_paths<'a, I>(&mut self, paths: I) -> Intake
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut accepted = Vec::new();
        let mut rejected = 0usize;
        for path in paths {
            match ImageRef::from_path(path) {
                Some(image) => accepted.push(image),
                None => {
                    debug!(path = %path.display(), "rejected non-image file");
                    rejected += 1;
                }
            }
        }
        if rejected > 0 {
            warn!(rejected, "only image files are allowed");
        }
        let offered = accepted.len();
        let added = self.extend_unique(accepted);
        Intake {
            added,
            duplicates: offered - added,
            rejected,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ImageRef> {
        let idx = self.position_of(name)?;
        Some(self.images.remove(idx))
    }

    /// Move the image at `from` so that it ends up at index `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.images.len() || to >= self.images.len() {
            return false;
        }
        if from != to {
            let image = self.images.remove(from);
            self.images.insert(to, image);
        }
        true
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.images.shuffle(rng);
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Replace the ordering wholesale, e.g. after a shuffle-on-loop.
    pub fn replace(&mut self, images: Vec<ImageRef>) {
        self.images = images;
    }
}

impl FromIterator<ImageRef> for ImageCollection {
    fn from_iter<T: IntoIterator<Item = ImageRef>>(iter: T) -> Self {
        let mut collection = Self::new();
        collection.extend_unique(iter);
        collection
    }
}

/// Outcome of handing a batch of files to the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intake {
    pub added: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::path::PathBuf;

    fn names(collection: &ImageCollection) -> Vec<&str> {
        collection.as_slice().iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn remote_images_need_an_image_path() {
        let cat = ImageRef::from_remote("https://example.com/pets/cat.JPG?size=large").unwrap();
        assert_eq!(cat.name, "https://example.com/pets/cat.JPG?size=large");
        assert_eq!(cat.url, cat.name);
        assert!(ImageRef::from_remote("http://example.com/a.png#top").is_some());
        assert!(ImageRef::from_remote("https://example.com/").is_none());
        assert!(ImageRef::from_remote("https://example.com").is_none());
        assert!(ImageRef::from_remote("https://example.com/readme.txt").is_none());
        assert!(ImageRef::from_remote("ftp://example.com/a.png").is_none());
    }

    #[test]
    fn add_paths_filters_and_dedupes() {
        let mut collection = ImageCollection::new();
        let paths = [
            PathBuf::from("/a/one.jpg"),
            PathBuf::from("/a/notes.txt"),
            PathBuf::from("/b/one.jpg"),
            PathBuf::from("/a/two.PNG"),
        ];
        let intake = collection.add_paths(paths.iter().map(PathBuf::as_path));
        assert_eq!(
            intake,
            Intake {
                added: 2,
                duplicates: 1,
                rejected: 1
            }
        );
        assert_eq!(names(&collection), ["one.jpg", "two.PNG"]);
    }

    #[test]
    fn url_images_use_url_as_name() {
        let image = ImageRef::from_url("https://example.com/cat.png");
        assert_eq!(image.name, "https://example.com/cat.png");
    }

    #[test]
    fn move_item_reorders() {
        let mut collection: ImageCollection = ["a", "b", "c", "d"]
            .into_iter()
            .map(ImageRef::from_url)
            .collect();
        assert!(collection.move_item(0, 2));
        assert_eq!(names(&collection), ["b", "c", "a", "d"]);
        assert!(collection.move_item(3, 0));
        assert_eq!(names(&collection), ["d", "b", "c", "a"]);
        assert!(!collection.move_item(4, 0));
    }

    #[test]
    fn remove_and_clear() {
        let mut collection: ImageCollection =
            ["a", "b"].into_iter().map(ImageRef::from_url).collect();
        assert_eq!(collection.remove("a").map(|i| i.name), Some("a".into()));
        assert!(collection.remove("a").is_none());
        collection.clear();
        assert!(collection.is_empty());
    }

    #[test]
    fn shuffle_keeps_members() {
        let mut collection: ImageCollection = (0..10)
            .map(|i| ImageRef::from_url(format!("img-{i}")))
            .collect();
        let mut rng = StdRng::seed_from_u64(3);
        collection.shuffle(&mut rng);
        let mut sorted: Vec<_> = names(&collection).into_iter().map(String::from).collect();
        sorted.sort();
        let mut expected: Vec<_> = (0..10).map(|i| format!("img-{i}")).collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
