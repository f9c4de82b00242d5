use anyhow::{Context, Result};
use tokio::select;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::SessionHandle;
use crate::settings::{PlaybackSettings, SettingsStore};

/// Write playback settings to `store` whenever a published snapshot carries
/// settings other than `saved`, the ones last known to be on disk.
///
/// Writes run on the blocking pool; a failed write is logged and retried with
/// the next change. Pending settings are flushed on shutdown.
pub async fn run(
    session: SessionHandle,
    store: SettingsStore,
    mut saved: PlaybackSettings,
    cancel: CancellationToken,
) -> Result<()> {
    let mut updates = session.subscribe();

    loop {
        select! {
            _ = cancel.cancelled() => break,

            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let settings = updates.borrow_and_update().settings.clone();
                if settings != saved && save(&store, settings.clone()).await {
                    saved = settings;
                }
            }
        }
    }

    let latest = updates.borrow().settings.clone();
    if latest != saved {
        debug!("flushing settings on shutdown");
        save(&store, latest).await;
    }
    Ok(())
}

async fn save(store: &SettingsStore, settings: PlaybackSettings) -> bool {
    let store = store.clone();
    let res = task::spawn_blocking(move || store.save(&settings))
        .await
        .context("settings writer panicked")
        .and_then(|res| res);
    match res {
        Ok(()) => true,
        Err(err) => {
            warn!("failed to persist settings: {err:#}");
            false
        }
    }
}
