//! Line-oriented terminal input standing in for keyboard and control clicks.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::ViewerCommand;
use crate::session::{Session, SessionHandle, SessionMode};
use crate::settings::{AnimationStyle, ImageFillMode, PlaybackSettings};
use crate::shell::{Key, KeyPress, Modifiers, ShellAction, dispatch_key};
use crate::tasks::files;

pub const HELP: &str = "\
keys:     right | left | up | down | space | shift+space | f | p   (prefix ctrl+/alt+/meta+ allowed)
show:     goto N | start [N] | exit
images:   list | add PATH|URL... | remove NAME | move FROM TO | shuffle | clear
settings: settings | set autoplay|loop|shuffle-loop on|off
          set interval 5s | set fill cover|contain | set animation none|fade|slide|slide-fade
other:    help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Key(KeyPress),
    Goto(i64),
    Start(Option<usize>),
    Exit,
    List,
    Add(Vec<PathBuf>),
    Remove(String),
    Move { from: usize, to: usize },
    Shuffle,
    Clear,
    ShowSettings,
    Set(SettingChange),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingChange {
    Autoplay(bool),
    Interval(Duration),
    Loop(bool),
    ShuffleLoop(bool),
    Fill(ImageFillMode),
    Animation(Option<AnimationStyle>),
}

impl SettingChange {
    fn apply(self, settings: &mut PlaybackSettings) {
        match self {
            Self::Autoplay(v) => settings.autoplay = v,
            Self::Interval(d) => {
                settings.autoplay_interval_ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
            }
            Self::Loop(v) => settings.loop_images = v,
            Self::ShuffleLoop(v) => settings.shuffle_loop = v,
            Self::Fill(fill) => settings.image_fill_mode = fill,
            Self::Animation(style) => settings.animation = style,
        }
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let cmd = match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("goto", [n]) => ConsoleCommand::Goto(n.parse().context("goto expects an integer")?),
        ("start", []) => ConsoleCommand::Start(None),
        ("start", [n]) => {
            ConsoleCommand::Start(Some(n.parse().context("start expects an image index")?))
        }
        ("exit", []) => ConsoleCommand::Exit,
        ("list" | "ls", []) => ConsoleCommand::List,
        ("add", paths) if !paths.is_empty() => {
            ConsoleCommand::Add(paths.iter().map(PathBuf::from).collect())
        }
        ("remove" | "rm", [name]) => ConsoleCommand::Remove((*name).to_string()),
        ("move" | "mv", [from, to]) => ConsoleCommand::Move {
            from: from.parse().context("move expects two indices")?,
            to: to.parse().context("move expects two indices")?,
        },
        ("shuffle", []) => ConsoleCommand::Shuffle,
        ("clear", []) => ConsoleCommand::Clear,
        ("settings", []) => ConsoleCommand::ShowSettings,
        ("set", [key, value]) => ConsoleCommand::Set(parse_setting(key, value)?),
        ("help" | "?", []) => ConsoleCommand::Help,
        ("quit" | "q", []) => ConsoleCommand::Quit,
        (_, []) => ConsoleCommand::Key(parse_key(head)?),
        _ => bail!("unrecognised command: {line}"),
    };
    Ok(Some(cmd))
}

fn parse_key(raw: &str) -> Result<KeyPress> {
    let mut parts: Vec<&str> = raw.split('+').collect();
    let key_name = parts.pop().filter(|k| !k.is_empty()).ok_or_else(|| anyhow!("missing key in {raw}"))?;
    let mut modifiers = Modifiers::NONE;
    for part in parts {
        match part.to_ascii_lowercase().as_str() {
            "shift" => modifiers.shift = true,
            "ctrl" => modifiers.ctrl = true,
            "alt" => modifiers.alt = true,
            "meta" | "cmd" => modifiers.meta = true,
            other => bail!("unknown modifier: {other}"),
        }
    }
    let key = match key_name.to_ascii_lowercase().as_str() {
        "right" | "l" => Key::ArrowRight,
        "left" | "h" => Key::ArrowLeft,
        "up" | "k" => Key::ArrowUp,
        "down" | "j" => Key::ArrowDown,
        "space" => Key::Space,
        single if single.chars().count() == 1 => {
            Key::Char(single.chars().next().unwrap_or_default())
        }
        other => bail!("unknown key or command: {other}"),
    };
    Ok(KeyPress::new(key).with_modifiers(modifiers))
}

fn parse_setting(key: &str, value: &str) -> Result<SettingChange> {
    let flag = || -> Result<bool> {
        match value.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" => Ok(true),
            "off" | "false" | "no" => Ok(false),
            other => bail!("expected on/off, got {other}"),
        }
    };
    let change = match key.to_ascii_lowercase().as_str() {
        "autoplay" => SettingChange::Autoplay(flag()?),
        "loop" => SettingChange::Loop(flag()?),
        "shuffle-loop" => SettingChange::ShuffleLoop(flag()?),
        "interval" => {
            let interval = match value.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => humantime::parse_duration(value)
                    .with_context(|| format!("invalid interval: {value}"))?,
            };
            SettingChange::Interval(interval)
        }
        "fill" => SettingChange::Fill(match value {
            "cover" | "fill" => ImageFillMode::Cover,
            "contain" | "fit" => ImageFillMode::Contain,
            other => bail!("unknown fill mode: {other}"),
        }),
        "animation" => SettingChange::Animation(
            AnimationStyle::parse_optional(value)
                .ok_or_else(|| anyhow!("unknown animation: {value}"))?,
        ),
        other => bail!("unknown setting: {other}"),
    };
    Ok(change)
}

/// Read input lines until `quit`, end of input, or cancellation.
///
/// Every line counts as pointer activity for the viewer. Shortcuts only act
/// while the show is running; collection edits only while selecting.
pub async fn run(
    mut lines: Receiver<String>,
    session: SessionHandle,
    viewer: Sender<ViewerCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let line = select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            info!("input closed; initiating shutdown");
            cancel.cancel();
            break;
        };

        let _ = viewer.send(ViewerCommand::PointerMoved).await;
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(err) => {
                warn!("{err:#}");
                continue;
            }
        };
        debug!(?cmd, "console command");

        if cmd == ConsoleCommand::Quit {
            info!("quit requested; initiating shutdown");
            cancel.cancel();
            break;
        }
        if let Some(request) = session.with(|s| apply(s, &cmd))? {
            if viewer.send(request).await.is_err() {
                warn!("viewer channel closed");
            }
        }
    }
    Ok(())
}

/// Apply a command to the session, returning any request for the viewer.
pub fn apply(session: &mut Session, cmd: &ConsoleCommand) -> Option<ViewerCommand> {
    match cmd {
        ConsoleCommand::Key(press) => {
            if session.mode() != SessionMode::Showing {
                debug!(?press, "shortcut ignored while selecting");
                return None;
            }
            match dispatch_key(press)? {
                ShellAction::Step(delta) => {
                    session.step(delta);
                }
                ShellAction::ToggleAutoplay => {
                    let on = session.toggle_autoplay();
                    info!(autoplay = on, "autoplay toggled");
                }
                ShellAction::ToggleFullscreen => return Some(ViewerCommand::ToggleFullscreen),
            }
        }
        ConsoleCommand::Goto(n) => {
            session.navigate(*n);
        }
        ConsoleCommand::Start(from) => {
            session.start(*from);
        }
        ConsoleCommand::Exit => {
            session.exit();
            return Some(ViewerCommand::ExitFullscreen);
        }
        ConsoleCommand::List => {
            for (idx, image) in session.images().as_slice().iter().enumerate() {
                let marker = if session.mode() == SessionMode::Showing && idx == session.position() {
                    '>'
                } else {
                    ' '
                };
                println!("{marker}{idx:>4}: {}", image.name);
            }
        }
        ConsoleCommand::Add(paths) => {
            if let Some(intake) = session.edit_images(|images, _| files::add_files(images, paths)) {
                info!(
                    added = intake.added,
                    duplicates = intake.duplicates,
                    rejected = intake.rejected,
                    "images added"
                );
            }
        }
        ConsoleCommand::Remove(name) => {
            if let Some(None) = session.edit_images(|images, _| images.remove(name)) {
                warn!(%name, "no such image");
            }
        }
        ConsoleCommand::Move { from, to } => {
            if let Some(false) = session.edit_images(|images, _| images.move_item(*from, *to)) {
                warn!(from, to, "move out of range");
            }
        }
        ConsoleCommand::Shuffle => {
            session.edit_images(|images, rng| images.shuffle(rng));
        }
        ConsoleCommand::Clear => {
            session.edit_images(|images, _| images.clear());
        }
        ConsoleCommand::ShowSettings => {
            let s = session.settings();
            println!(
                "autoplay: {}\ninterval: {} (image will change every {})\nloop: {}\nshuffle-loop: {}\nfill: {:?}\nanimation: {}",
                s.autoplay,
                s.autoplay_interval_ms,
                s.describe_interval(),
                s.loop_images,
                s.shuffle_loop,
                s.image_fill_mode,
                s.animation.map_or_else(|| "none".to_string(), |a| a.to_string()),
            );
        }
        ConsoleCommand::Set(change) => {
            let change = *change;
            session.update_settings(|s| change.apply(s));
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
    None
}
