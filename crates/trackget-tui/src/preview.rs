//! Audio preview — an external mpv process playing the resolved link.
//!
//! Play/stop only, no IPC. The preview is independent of the lookup state
//! machine except that it is stopped on reset and on quit.

use anyhow::Context;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use trackget_core::platform;

pub struct Preview {
    child: Option<Child>,
}

impl Preview {
    pub fn new() -> Self {
        Self { child: None }
    }

    pub fn is_playing(&mut self) -> bool {
        match self.child.as_mut() {
            // try_wait() = Ok(None) while the process is still running
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Toggle playback of `url`. Returns `true` when now playing.
    pub fn toggle(&mut self, url: &str) -> anyhow::Result<bool> {
        if self.is_playing() {
            self.stop();
            return Ok(false);
        }

        let mpv = platform::find_mpv_binary().context("mpv not found")?;
        debug!("preview: spawning {} for {}", mpv.display(), url);
        let child = Command::new(&mpv)
            .arg("--no-video")
            .arg("--really-quiet")
            .arg(url)
            .spawn()
            .with_context(|| format!("failed to start {}", mpv.display()))?;
        self.child = Some(child);
        Ok(true)
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!("preview: failed to stop mpv: {}", e);
            }
        }
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        self.stop();
    }
}
