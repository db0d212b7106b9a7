//! Configuration file watcher for hot reload.
//!
//! # Design Decisions
//! - Watches the directory holding the file, not the file itself: editors that
//!   save by writing a temp file and renaming it over the original replace the
//!   inode, and a watch on the old inode would go quiet
//! - Events are filtered down to the config file's name
//! - A burst of events is coalesced into one reload once writes settle, so a
//!   half-written file is not parsed mid-save
//! - Invalid configs are logged and dropped; the running routes stay as they are

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::MuxConfig;

/// Quiet period after the last file event before the config is re-read.
const SETTLE: Duration = Duration::from_millis(200);

/// Pushes every valid edit of a config file onto a channel.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<MuxConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<MuxConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// Updates stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (touch_tx, touch_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &file_name) => {
                    let _ = touch_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(reload_on_change(self.path.clone(), touch_rx, self.update_tx));

        tracing::info!(path = ?self.path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` changed the contents or identity of `file_name`.
fn touches(event: &Event, file_name: &OsString) -> bool {
    let content_change = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    );
    content_change
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

async fn reload_on_change(
    path: PathBuf,
    mut touched: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<MuxConfig>,
) {
    while touched.recv().await.is_some() {
        tokio::time::sleep(SETTLE).await;
        while touched.try_recv().is_ok() {}

        match load_config(&path) {
            Ok(config) => {
                tracing::info!(path = ?path, agents = config.agents.len(), "Config reloaded");
                if updates.send(config).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(
                    path = ?path,
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RenameMode};
    use tokio::time::timeout;

    fn agent_toml(segment: &str) -> String {
        format!("[[agents]]\nsegment = \"{segment}\"\nupstream = \"http://127.0.0.1:9000\"\n")
    }

    /// Wait for an update naming `segment`, skipping stale ones.
    async fn next_with(updates: &mut mpsc::UnboundedReceiver<MuxConfig>, segment: &str) {
        timeout(Duration::from_secs(5), async {
            loop {
                let config = updates.recv().await.unwrap();
                if config.agents.first().map(|a| a.segment.as_str()) == Some(segment) {
                    return;
                }
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_touches_filters_kind_and_name() {
        let name = OsString::from("mux.toml");
        let event = |kind: EventKind, path: &str| Event::new(kind).add_path(PathBuf::from(path));

        let write = || EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(touches(&event(write(), "/etc/mux/mux.toml"), &name));
        assert!(touches(
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), "/etc/mux/mux.toml"),
            &name
        ));
        assert!(touches(&event(EventKind::Create(CreateKind::File), "mux.toml"), &name));

        assert!(!touches(&event(write(), "/etc/mux/mux.toml.swp"), &name));
        assert!(!touches(
            &event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)), "mux.toml"),
            &name
        ));
    }

    #[tokio::test]
    async fn test_reloads_across_atomic_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mux.toml");
        std::fs::write(&path, agent_toml("initial")).unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        for segment in ["reverser", "uppercaser"] {
            let staged = dir.path().join("mux.toml.tmp");
            std::fs::write(&staged, agent_toml(segment)).unwrap();
            std::fs::rename(&staged, &path).unwrap();
            next_with(&mut updates, segment).await;
        }
    }

    #[tokio::test]
    async fn test_ignores_other_files_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mux.toml");
        std::fs::write(&path, agent_toml("initial")).unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();

        std::fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();
        assert!(timeout(SETTLE * 3, updates.recv()).await.is_err());
    }
}
