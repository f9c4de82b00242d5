//! Slideshow session: selection vs. showing, current position and ordering.
//!
//! The session is the only writer of position and ordering. Every change is
//! published as a [`SessionSnapshot`] on a `watch` channel so observers
//! (renderer, autoplay timer) react to one consistent state.

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use rand::rngs::StdRng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::collection::{ImageCollection, ImageRef};
use crate::navigation::{self, resolve_position};
use crate::settings::PlaybackSettings;
use crate::transition::{TransitionIntent, TransitionPlan, plan_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Selecting,
    Showing,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub position: usize,
    pub images: Arc<[ImageRef]>,
    pub settings: PlaybackSettings,
    /// Last position change; `None` right after the show starts.
    pub intent: Option<TransitionIntent>,
    /// Bumped on every published change.
    pub revision: u64,
}

impl SessionSnapshot {
    pub fn current_image(&self) -> Option<&ImageRef> {
        match self.mode {
            SessionMode::Showing => self.images.get(self.position),
            SessionMode::Selecting => None,
        }
    }

    pub fn transition_plan(&self, container_width: Option<f32>) -> TransitionPlan {
        match (self.intent.as_ref(), self.settings.animation) {
            (Some(intent), Some(style)) => plan_for(intent, style, container_width),
            _ => TransitionPlan::Immediate,
        }
    }

    pub fn can_go_previous(&self) -> bool {
        navigation::can_go_previous(self.position, &self.settings)
    }

    pub fn can_go_next(&self) -> bool {
        navigation::can_go_next(self.position, self.images.len(), &self.settings)
    }
}

pub struct Session {
    mode: SessionMode,
    images: ImageCollection,
    position: usize,
    intent: Option<TransitionIntent>,
    settings: PlaybackSettings,
    rng: StdRng,
    revision: u64,
    updates: watch::Sender<SessionSnapshot>,
}

impl Session {
    pub fn new(
        images: ImageCollection,
        settings: PlaybackSettings,
        rng: StdRng,
    ) -> Self {
        let settings = settings.normalized();
        let initial = SessionSnapshot {
            mode: SessionMode::Selecting,
            position: 0,
            images: images.to_shared(),
            settings: settings.clone(),
            intent: None,
            revision: 0,
        };
        let (updates, _) = watch::channel(initial);
        Self {
            mode: SessionMode::Selecting,
            images,
            position: 0,
            intent: None,
            settings,
            rng,
            revision: 0,
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn images(&self) -> &ImageCollection {
        &self.images
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn intent(&self) -> Option<TransitionIntent> {
        self.intent
    }

    pub fn current_image(&self) -> Option<&ImageRef> {
        match self.mode {
            SessionMode::Showing => self.images.get(self.position),
            SessionMode::Selecting => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            position: self.position,
            images: self.images.to_shared(),
            settings: self.settings.clone(),
            intent: self.intent,
            revision: self.revision,
        }
    }

    /// Enter the show at `from` (clamped), or at the first image.
    ///
    /// Returns `false` when there is nothing to show.
    pub fn start(&mut self, from: Option<usize>) -> bool {
        if self.images.is_empty() {
            warn!("cannot start slideshow without images");
            return false;
        }
        self.mode = SessionMode::Showing;
        self.position = from.unwrap_or(0).min(self.images.len() - 1);
        self.intent = None;
        info!(
            position = self.position,
            images = self.images.len(),
            "slideshow started"
        );
        self.publish();
        true
    }

    pub fn exit(&mut self) -> bool {
        if self.mode == SessionMode::Selecting {
            return false;
        }
        self.mode = SessionMode::Selecting;
        self.intent = None;
        info!(position = self.position, "slideshow exited");
        self.publish();
        true
    }

    /// Move to a raw requested position. Returns whether anything changed.
    pub fn navigate(&mut self, requested: i64) -> bool {
        if self.mode != SessionMode::Showing || self.images.is_empty() {
            return false;
        }
        let resolved = resolve_position(
            requested,
            self.images.as_slice(),
            self.position,
            &self.settings,
            &mut self.rng,
        );
        let reordered = resolved.reordered.is_some();
        if resolved.position == self.position && !reordered {
            debug!(requested, position = self.position, "navigation at boundary");
            return false;
        }

        let previous = self.position;
        if let Some(images) = resolved.reordered {
            self.images.replace(images);
            info!(position = resolved.position, "collection reshuffled on loop");
        }
        self.position = resolved.position;
        self.intent = Some(TransitionIntent::new(
            Some(previous),
            self.position,
            self.images.len(),
        ));
        debug!(
            requested,
            previous,
            position = self.position,
            name = self.current_image().map(|i| i.name.as_str()),
            "position changed"
        );
        self.publish();
        true
    }

    pub fn step(&mut self, delta: i64) -> bool {
        self.navigate((self.position as i64).saturating_add(delta))
    }

    /// Apply `edit` to the settings and publish. Persisting is left to
    /// whoever watches the snapshots, so no file I/O runs under the lock.
    pub fn update_settings<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut PlaybackSettings),
    {
        let mut next = self.settings.clone();
        edit(&mut next);
        let next = next.normalized();
        if next == self.settings {
            return false;
        }
        self.settings = next;
        info!(settings = ?self.settings, "settings changed");
        self.publish();
        true
    }

    /// Flip autoplay and return the new value.
    pub fn toggle_autoplay(&mut self) -> bool {
        self.update_settings(|s| s.autoplay = !s.autoplay);
        self.settings.autoplay
    }

    /// Edit the collection while selecting images. Returns `None` during the
    /// show, where the ordering belongs to navigation.
    pub fn edit_images<F, T>(&mut self, edit: F) -> Option<T>
    where
        F: FnOnce(&mut ImageCollection, &mut StdRng) -> T,
    {
        if self.mode != SessionMode::Selecting {
            debug!("ignoring collection edit while showing");
            return None;
        }
        let out = edit(&mut self.images, &mut self.rng);
        self.position = self.position.min(self.images.len().saturating_sub(1));
        self.publish();
        Some(out)
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        self.updates.send_replace(snapshot);
    }
}

/// Shared access to a session from the input loop and the autoplay task.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
    updates: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        let updates = session.subscribe();
        Self {
            inner: Arc::new(Mutex::new(session)),
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    /// Run `f` with the session locked. The lock is never held across an
    /// await point.
    pub fn with<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        Ok(f(&mut *guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn session(n: usize, settings: PlaybackSettings) -> Session {
        let images: ImageCollection = (0..n)
            .map(|i| ImageRef::from_url(format!("img-{i}")))
            .collect();
        Session::new(images, settings, StdRng::seed_from_u64(9))
    }

    #[test]
    fn start_clamps_and_seeds_no_previous() {
        let mut s = session(3, PlaybackSettings::default());
        assert!(s.start(Some(10)));
        assert_eq!(s.mode(), SessionMode::Showing);
        assert_eq!(s.position(), 2);
        assert!(s.intent().is_none());
        assert_eq!(s.snapshot().transition_plan(None), TransitionPlan::Immediate);
    }

    #[test]
    fn start_refuses_empty_collection() {
        let mut s = session(0, PlaybackSettings::default());
        assert!(!s.start(None));
        assert_eq!(s.mode(), SessionMode::Selecting);
    }

    #[test]
    fn navigation_ignored_while_selecting() {
        let mut s = session(3, PlaybackSettings::default());
        assert!(!s.step(1));
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn navigation_records_intent() {
        let mut s = session(5, PlaybackSettings::default());
        s.start(Some(4));
        assert!(s.step(1));
        assert_eq!(s.position(), 0);
        let intent = s.intent().unwrap();
        assert_eq!(intent.previous, Some(4));
        assert!(intent.is_forward);
        assert!(s.snapshot().transition_plan(Some(640.0)).is_animated());
    }

    #[test]
    fn boundary_without_loop_publishes_nothing() {
        let mut s = session(
            3,
            PlaybackSettings {
                loop_images: false,
                ..PlaybackSettings::default()
            },
        );
        s.start(Some(2));
        let rx = s.subscribe();
        let before = rx.borrow().revision;
        assert!(!s.step(1));
        assert_eq!(s.position(), 2);
        assert_eq!(rx.borrow().revision, before);
    }

    #[test]
    fn shuffle_loop_replaces_ordering_atomically() {
        let mut s = session(
            4,
            PlaybackSettings {
                shuffle_loop: true,
                ..PlaybackSettings::default()
            },
        );
        s.start(Some(3));
        let shown = s.current_image().unwrap().name.clone();
        let rx = s.subscribe();
        assert!(s.step(1));
        let snap = rx.borrow().clone();
        assert_eq!(snap.position, 0);
        assert_ne!(snap.images[0].name, shown);
        assert_eq!(snap.images.as_ref(), s.images().as_slice());
    }

    #[test]
    fn edits_only_while_selecting() {
        let mut s = session(3, PlaybackSettings::default());
        s.start(None);
        assert!(s.edit_images(|images, _| images.clear()).is_none());
        s.exit();
        assert_eq!(s.edit_images(|images, _| images.len()), Some(3));
    }

    #[test]
    fn toggle_autoplay_flips_setting() {
        let mut s = session(2, PlaybackSettings::default());
        assert!(!s.toggle_autoplay());
        assert!(s.toggle_autoplay());
    }
}
