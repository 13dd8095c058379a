use std::sync::Arc;

use lovemission_core::theme::{Palette, ThemeMode};
use tokio::sync::watch;
use tracing::debug;

/// App-lifetime theme state.
///
/// Built once at the application root and handed to whoever needs it;
/// clones share the same mode. Readers either poll [`ThemeState::mode`] or
/// [`ThemeState::subscribe`] to be woken on change. Always starts light.
#[derive(Clone)]
pub struct ThemeState {
    tx: Arc<watch::Sender<ThemeMode>>,
}

impl Default for ThemeState {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ThemeMode::Light);
        Self { tx: Arc::new(tx) }
    }

    pub fn mode(&self) -> ThemeMode {
        *self.tx.borrow()
    }

    pub fn palette(&self) -> &'static Palette {
        self.mode().palette()
    }

    pub fn set_mode(&self, mode: ThemeMode) {
        let previous = self.tx.send_replace(mode);
        if previous != mode {
            debug!(from = %previous, to = %mode, "theme changed");
        }
    }

    pub fn toggle(&self) -> ThemeMode {
        let next = self.mode().toggled();
        self.set_mode(next);
        next
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeMode> {
        self.tx.subscribe()
    }
}
