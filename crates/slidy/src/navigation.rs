//! Position resolution for the slideshow: clamping, wraparound and
//! shuffle-on-loop.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::collection::ImageRef;
use crate::settings::PlaybackSettings;

/// Result of a navigation request. A reorder, when present, must be applied
/// together with the position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub position: usize,
    pub reordered: Option<Vec<ImageRef>>,
}

impl Resolved {
    fn at(position: usize) -> Self {
        Self {
            position,
            reordered: None,
        }
    }
}

/// Map a raw requested position onto the collection.
///
/// In-range requests pass through. Out-of-range requests are clamped, or
/// wrapped when looping; looping with shuffle also draws a fresh ordering in
/// which the image at the landing position differs from the one currently
/// shown.
pub fn resolve_position<R: Rng + ?Sized>(
    requested: i64,
    images: &[ImageRef],
    current: usize,
    settings: &PlaybackSettings,
    rng: &mut R,
) -> Resolved {
    let len = images.len();
    if len == 0 {
        return Resolved::at(0);
    }
    let len_i = len as i64;
    if (0..len_i).contains(&requested) {
        return Resolved::at(requested as usize);
    }
    if !settings.loop_images {
        return Resolved::at(requested.clamp(0, len_i - 1) as usize);
    }

    let wrapped = requested.rem_euclid(len_i) as usize;
    if !settings.shuffle_loop || len < 2 {
        return Resolved::at(wrapped);
    }

    let reordered = shuffle_avoiding_repeat(images, current, wrapped, rng);
    Resolved {
        position: wrapped,
        reordered: Some(reordered),
    }
}

/// Draw permutations until the image at `landing` is not the one at
/// `current`. Requires at least two images.
fn shuffle_avoiding_repeat<R: Rng + ?Sized>(
    images: &[ImageRef],
    current: usize,
    landing: usize,
    rng: &mut R,
) -> Vec<ImageRef> {
    let Some(shown) = images.get(current).map(|image| image.name.as_str()) else {
        let mut shuffled = images.to_vec();
        shuffled.shuffle(rng);
        return shuffled;
    };

    let mut shuffled = images.to_vec();
    // Names are unique in a collection; without that no permutation could succeed.
    if images.iter().all(|image| image.name == shown) {
        return shuffled;
    }
    let mut draws = 0u32;
    loop {
        shuffled.shuffle(rng);
        draws += 1;
        if shuffled[landing].name != shown {
            break;
        }
    }
    trace!(draws, landing, "shuffle-on-loop accepted permutation");
    shuffled
}

pub fn can_go_previous(position: usize, settings: &PlaybackSettings) -> bool {
    settings.loop_images || position > 0
}

pub fn can_go_next(position: usize, len: usize, settings: &PlaybackSettings) -> bool {
    settings.loop_images || position + 1 < len
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn images(n: usize) -> Vec<ImageRef> {
        (0..n)
            .map(|i| ImageRef::from_url(format!("img-{i}")))
            .collect()
    }

    fn settings(loop_images: bool, shuffle_loop: bool) -> PlaybackSettings {
        PlaybackSettings {
            loop_images,
            shuffle_loop,
            ..PlaybackSettings::default()
        }
    }

    #[test]
    fn empty_collection_is_inert() {
        let mut rng = StdRng::seed_from_u64(1);
        let resolved = resolve_position(3, &[], 0, &settings(true, true), &mut rng);
        assert_eq!(resolved, Resolved::at(0));
    }

    #[test]
    fn in_range_passes_through() {
        let mut rng = StdRng::seed_from_u64(1);
        let imgs = images(5);
        for requested in 0..5 {
            let resolved = resolve_position(requested, &imgs, 0, &settings(true, true), &mut rng);
            assert_eq!(resolved, Resolved::at(requested as usize));
        }
    }

    #[test]
    fn clamps_without_loop() {
        let mut rng = StdRng::seed_from_u64(1);
        let imgs = images(5);
        let s = settings(false, true);
        assert_eq!(resolve_position(-1, &imgs, 0, &s, &mut rng).position, 0);
        assert_eq!(resolve_position(5, &imgs, 4, &s, &mut rng).position, 4);
        assert_eq!(resolve_position(i64::MIN, &imgs, 2, &s, &mut rng).position, 0);
        assert_eq!(resolve_position(i64::MAX, &imgs, 2, &s, &mut rng).position, 4);
        assert!(resolve_position(5, &imgs, 4, &s, &mut rng).reordered.is_none());
    }

    #[test]
    fn wraps_with_loop() {
        let mut rng = StdRng::seed_from_u64(1);
        let imgs = images(5);
        let s = settings(true, false);
        assert_eq!(resolve_position(-1, &imgs, 0, &s, &mut rng), Resolved::at(4));
        assert_eq!(resolve_position(5, &imgs, 4, &s, &mut rng), Resolved::at(0));
        assert_eq!(resolve_position(-12, &imgs, 0, &s, &mut rng), Resolved::at(3));
        assert_eq!(resolve_position(17, &imgs, 0, &s, &mut rng), Resolved::at(2));
    }

    #[test]
    fn single_image_shuffle_loop_short_circuits() {
        let mut rng = StdRng::seed_from_u64(1);
        let imgs = images(1);
        let resolved = resolve_position(1, &imgs, 0, &settings(true, true), &mut rng);
        assert_eq!(resolved, Resolved::at(0));
    }

    #[test]
    fn shuffle_loop_never_repeats_current_image() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 2..8 {
            let imgs = images(n);
            for _ in 0..50 {
                let current = n - 1;
                let resolved =
                    resolve_position(n as i64, &imgs, current, &settings(true, true), &mut rng);
                let reordered = resolved.reordered.expect("shuffle expected");
                assert_eq!(reordered.len(), n);
                assert_eq!(resolved.position, 0);
                assert_ne!(reordered[0].name, imgs[current].name);
            }
        }
    }

    #[test]
    fn prev_next_availability() {
        let no_loop = settings(false, false);
        assert!(!can_go_previous(0, &no_loop));
        assert!(can_go_previous(1, &no_loop));
        assert!(can_go_next(3, 5, &no_loop));
        assert!(!can_go_next(4, 5, &no_loop));
        let looping = settings(true, false);
        assert!(can_go_previous(0, &looping));
        assert!(can_go_next(4, 5, &looping));
    }
}
