use anyhow::Result;
use tokio::select;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::collection::ImageRef;
use crate::session::{Session, SessionHandle, SessionMode, SessionSnapshot};
use crate::settings::PlaybackSettings;

/// One-shot autoplay deadline.
///
/// The deadline always measures from the most recent state change; it never
/// repeats on its own, so a manual navigation restarts the wait window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AutoplayTimer {
    deadline: Option<Instant>,
}

impl AutoplayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any pending deadline and, if autoplay is on, arm a fresh one.
    pub fn rearm(&mut self, now: Instant, settings: &PlaybackSettings) -> Option<Instant> {
        self.deadline = settings
            .autoplay
            .then(|| now + settings.autoplay_interval());
        self.deadline
    }

    /// Re-arm from a published session state. Only a running show advances.
    pub fn sync(&mut self, snapshot: &SessionSnapshot, now: Instant) -> Option<Instant> {
        match snapshot.mode {
            SessionMode::Showing if !snapshot.images.is_empty() => {
                self.rearm(now, &snapshot.settings)
            }
            _ => {
                self.cancel();
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Advance the show by one image whenever the autoplay deadline passes.
///
/// Rules:
/// - Every published session change (navigation, settings, mode) cancels the
///   pending deadline and arms a new one from that moment.
/// - Leaving the show or turning autoplay off leaves no deadline armed.
/// - When an advance changes nothing (end of a non-looping show) the timer
///   stays idle until the next change.
pub async fn run(session: SessionHandle, cancel: CancellationToken) -> Result<()> {
    let mut updates = session.subscribe();
    let mut timer = AutoplayTimer::new();
    {
        let snapshot = updates.borrow_and_update();
        timer.sync(&snapshot, Instant::now());
    }

    loop {
        let deadline = timer.deadline();
        select! {
            _ = cancel.cancelled() => break,

            changed = updates.changed() => {
                if changed.is_err() {
                    debug!("session closed; stopping autoplay");
                    break;
                }
                let snapshot = updates.borrow_and_update();
                let armed = timer.sync(&snapshot, Instant::now());
                trace!(revision = snapshot.revision, armed = armed.is_some(), "autoplay re-armed");
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                timer.cancel();
                let moved = session.with(|s| s.step(1))?;
                if moved {
                    debug!("autoplay advanced");
                } else {
                    debug!("autoplay reached the end of the show");
                }
            }
        }
    }

    Ok(())
}

/// Images an uninterrupted autoplay run would show, starting
/// with the current one. Stops early when an advance changes nothing.
pub fn simulate(session: &mut Session, iterations: usize) -> Vec<ImageRef> {
    if session.mode() != SessionMode::Showing && !session.start(None) {
        return Vec::new();
    }
    let mut plan = Vec::with_capacity(iterations);
    for i in 0..iterations {
        if let Some(image) = session.current_image() {
            plan.push(image.clone());
        }
        if i + 1 < iterations && !session.step(1) {
            break;
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ImageCollection;
    use rand::{SeedableRng, rngs::StdRng};
    use std::time::Duration;

    fn session(n: usize, settings: PlaybackSettings) -> Session {
        let images: ImageCollection = (0..n)
            .map(|i| ImageRef::from_url(format!("img-{i}")))
            .collect();
        Session::new(images, settings, StdRng::seed_from_u64(5))
    }

    #[test]
    fn simulate_stops_at_end_without_loop() {
        let mut s = session(
            3,
            PlaybackSettings {
                loop_images: false,
                ..PlaybackSettings::default()
            },
        );
        let names: Vec<_> = simulate(&mut s, 10).into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["img-0", "img-1", "img-2"]);
    }

    #[test]
    fn simulate_loops() {
        let mut s = session(2, PlaybackSettings::default());
        let names: Vec<_> = simulate(&mut s, 5).into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["img-0", "img-1", "img-0", "img-1", "img-0"]);
    }

    #[test]
    fn rearm_measures_from_latest_change() {
        let settings = PlaybackSettings::default();
        let t0 = Instant::now();
        let mut timer = AutoplayTimer::new();
        timer.rearm(t0, &settings);
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_millis(5000)));

        let t2 = t0 + Duration::from_millis(2000);
        timer.rearm(t2, &settings);
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_millis(7000)));
    }

    #[test]
    fn autoplay_off_disarms() {
        let mut timer = AutoplayTimer::new();
        let now = Instant::now();
        timer.rearm(now, &PlaybackSettings::default());
        let off = PlaybackSettings {
            autoplay: false,
            ..PlaybackSettings::default()
        };
        assert!(timer.rearm(now, &off).is_none());
        assert!(timer.deadline().is_none());
    }
}
