use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::events::ViewerCommand;
use crate::session::{SessionHandle, SessionMode, SessionSnapshot};
use crate::shell::{Fullscreen, PointerActivity};
use crate::transition::{AnimatedTransition, TransitionPlan};

/// What the viewer last put on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Shown {
    mode: SessionMode,
    position: usize,
    name: Option<String>,
}

impl Shown {
    fn of(snapshot: &SessionSnapshot) -> Self {
        Self {
            mode: snapshot.mode,
            position: snapshot.position,
            name: snapshot.current_image().map(|i| i.name.clone()),
        }
    }
}

/// One image as the viewer presents it, including which navigation
/// controls are enabled.
#[derive(Debug, Clone, PartialEq)]
struct Displayed {
    position: usize,
    total: usize,
    name: String,
    url: String,
    transition: TransitionPlan,
    can_prev: bool,
    can_next: bool,
}

fn displayed(snapshot: &SessionSnapshot) -> Option<Displayed> {
    let image = snapshot.current_image()?;
    Some(Displayed {
        position: snapshot.position,
        total: snapshot.images.len(),
        name: image.name.clone(),
        url: image.url.clone(),
        // A terminal has no measurable container; slides use percentages.
        transition: snapshot.transition_plan(None),
        can_prev: snapshot.can_go_previous(),
        can_next: snapshot.can_go_next(),
    })
}

/// Terminal stand-in for the slideshow surface: reports each displayed image
/// with the transition that brings it in, and tracks fullscreen and
/// pointer-driven control visibility.
pub async fn run(
    session: SessionHandle,
    mut control: Receiver<ViewerCommand>,
    cancel: CancellationToken,
    pointer_timeout: Duration,
) -> Result<()> {
    let mut updates = session.subscribe();
    let mut fullscreen = Fullscreen::default();
    let mut pointer = PointerActivity::new(pointer_timeout, Instant::now());
    let mut controls_visible = true;
    let mut shown: Option<Shown> = None;
    let mut animating: Option<(AnimatedTransition, Instant)> = None;

    {
        let snapshot = updates.borrow_and_update();
        present(&snapshot, &mut shown);
    }

    loop {
        let hide_at = pointer.inactive_at();
        let settle_at = animating.map(|(anim, started)| started + anim.duration);
        select! {
            _ = cancel.cancelled() => break,

            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update();
                if snapshot.mode == SessionMode::Selecting && fullscreen.is_active() {
                    fullscreen.exit();
                    info!("fullscreen exited with the slideshow");
                }
                if let Some(anim) = present(&snapshot, &mut shown) {
                    animating = Some((anim, Instant::now()));
                }
            }

            cmd = control.recv() => {
                match cmd {
                    Some(ViewerCommand::ToggleFullscreen) => {
                        let active = fullscreen.toggle();
                        info!(active, "fullscreen toggled");
                    }
                    Some(ViewerCommand::ExitFullscreen) => fullscreen.exit(),
                    Some(ViewerCommand::PointerMoved) => {
                        pointer.on_move(Instant::now());
                        if !controls_visible {
                            controls_visible = true;
                            debug!("controls shown");
                        }
                    }
                    None => {
                        // Input side closed; keep presenting until cancelled.
                        debug!("viewer control channel closed");
                        cancel.cancelled().await;
                        break;
                    }
                }
            }

            _ = sleep_until(hide_at.unwrap_or_else(Instant::now)), if controls_visible && hide_at.is_some() => {
                controls_visible = false;
                debug!(fullscreen = fullscreen.is_active(), "pointer inactive; controls hidden");
            }

            _ = sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
                match animating.take() {
                    Some((anim, started)) if anim.is_finished(started.elapsed()) => {
                        let (_, incoming) = anim.frames_at(started.elapsed());
                        trace!(
                            opacity = incoming.opacity,
                            translate = ?incoming.translate_x,
                            "transition settled"
                        );
                    }
                    pending => animating = pending,
                }
            }
        }
    }

    Ok(())
}

/// Report a newly displayed image. Returns the transition that brings it in,
/// if it animates.
fn present(snapshot: &SessionSnapshot, shown: &mut Option<Shown>) -> Option<AnimatedTransition> {
    let now_shown = Shown::of(snapshot);
    if shown.as_ref() == Some(&now_shown) {
        debug!(
            revision = snapshot.revision,
            autoplay = snapshot.settings.autoplay,
            can_prev = snapshot.can_go_previous(),
            can_next = snapshot.can_go_next(),
            "session updated"
        );
        return None;
    }
    *shown = Some(now_shown);

    let Some(view) = displayed(snapshot) else {
        info!(images = snapshot.images.len(), "selecting images");
        return None;
    };
    info!(
        position = view.position,
        total = view.total,
        name = %view.name,
        url = %view.url,
        transition = %describe_plan(&view.transition),
        fill = ?snapshot.settings.image_fill_mode,
        can_prev = view.can_prev,
        can_next = view.can_next,
        "displaying"
    );
    match view.transition {
        TransitionPlan::Animated(anim) => Some(anim),
        TransitionPlan::Immediate => None,
    }
}

pub fn describe_plan(plan: &TransitionPlan) -> String {
    match plan {
        TransitionPlan::Immediate => "immediate".to_string(),
        TransitionPlan::Animated(anim) => format!(
            "{} {:?} {}ms",
            anim.style,
            anim.direction,
            anim.duration.as_millis()
        )
        .to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{ImageCollection, ImageRef};
    use crate::session::Session;
    use crate::settings::{AnimationStyle, PlaybackSettings};
    use crate::transition::resolve_transition;
    use rand::{SeedableRng, rngs::StdRng};

    fn session(n: usize, loop_images: bool) -> Session {
        let images: ImageCollection = (0..n)
            .map(|i| ImageRef::from_url(format!("img-{i}")))
            .collect();
        let settings = PlaybackSettings {
            loop_images,
            ..PlaybackSettings::default()
        };
        Session::new(images, settings, StdRng::seed_from_u64(2))
    }

    #[test]
    fn displayed_reports_control_availability() {
        let mut s = session(3, false);
        assert_eq!(displayed(&s.snapshot()), None);

        s.start(None);
        let first = displayed(&s.snapshot()).unwrap();
        assert_eq!(first.name, "img-0");
        assert!(!first.can_prev);
        assert!(first.can_next);
        assert_eq!(first.transition, TransitionPlan::Immediate);

        s.step(2);
        let last = displayed(&s.snapshot()).unwrap();
        assert_eq!((last.position, last.total), (2, 3));
        assert!(last.can_prev);
        assert!(!last.can_next);
        assert!(last.transition.is_animated());
    }

    #[test]
    fn looping_keeps_both_controls_enabled() {
        let mut s = session(3, true);
        s.start(Some(2));
        let view = displayed(&s.snapshot()).unwrap();
        assert!(view.can_prev && view.can_next);
    }

    #[test]
    fn present_hands_back_new_animations_once() {
        let mut s = session(3, true);
        s.start(None);
        let mut shown = None;
        assert!(present(&s.snapshot(), &mut shown).is_none());
        s.step(1);
        let anim = present(&s.snapshot(), &mut shown).unwrap();
        assert!(anim.is_finished(anim.duration));
        assert!(present(&s.snapshot(), &mut shown).is_none());
    }

    #[test]
    fn describes_plans() {
        assert_eq!(describe_plan(&TransitionPlan::Immediate), "immediate");
        let plan = resolve_transition(Some(0), 1, 3, Some(AnimationStyle::SlideFade), None);
        assert_eq!(describe_plan(&plan), "slide-fade forward 150ms");
    }
}
