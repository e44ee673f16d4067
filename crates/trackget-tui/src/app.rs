//! App — event loop and dispatch.
//!
//! The `App` owns the `Session` and all UI chrome. A `tokio::mpsc` channel
//! carries `AppMessage` events in from background tasks (the blocking
//! keyboard reader, the lookup task, the download task); the loop draws a
//! frame, then awaits the next message or timer tick. The session is only
//! ever mutated here.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use trackget_core::api::{FetchError, TrackApi, TrackResult};
use trackget_core::config::Config;
use trackget_core::download::{self, format_size_mb, target_filename};
use trackget_core::history::{HistoryEntry, HistoryStore};
use trackget_core::session::{Session, View};
use trackget_core::validate::is_valid_track_url;

use crate::preview::Preview;
use crate::ui;
use crate::widgets::toast::ToastManager;
use crate::widgets::url_input::{UrlAction, UrlInput};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    /// The lookup task is about to wait before retry `n`.
    LookupRetry(u32),
    LookupComplete(TrackResult),
    /// Terminal failure, retry budget spent.
    LookupFailed(FetchError),
    DownloadComplete {
        filename: String,
        bytes: u64,
    },
    DownloadFailed(String),
}

// ── Persistence serde structs ─────────────────────────────────────────────────

/// Best-effort marker of where the session last stood; not load-bearing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
struct UiSessionState {
    last_view: String,
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    pub(crate) session: Session,
    pub(crate) input: UrlInput,
    pub(crate) toast: ToastManager,
    pub(crate) recent: Vec<HistoryEntry>,
    pub(crate) downloading: bool,
    pub(crate) retry_budget: u32,

    api: Arc<TrackApi>,
    history: HistoryStore,
    preview: Preview,
    downloads_dir: PathBuf,
    ui_state_path: PathBuf,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, data_dir: PathBuf) -> anyhow::Result<Self> {
        let api = Arc::new(TrackApi::new(&config.api)?);
        let history = HistoryStore::new(data_dir.clone());
        let recent = history.load_lookups();
        let ui_state_path = data_dir.join("ui_state.json");

        if let Ok(content) = std::fs::read_to_string(&ui_state_path) {
            if let Ok(state) = serde_json::from_str::<UiSessionState>(&content) {
                debug!("last session ended in {} view", state.last_view);
            }
        }

        Ok(Self {
            session: Session::new(),
            input: UrlInput::default(),
            toast: ToastManager::new(),
            recent,
            downloading: false,
            retry_budget: config.api.retries,
            api,
            history,
            preview: Preview::new(),
            downloads_dir: config.paths.downloads_dir,
            ui_state_path,
            should_quit: false,
        })
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        info!("trackget ready");

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        // Decorative progress: +0.5% per tick while loading, capped at 90.
        let mut progress_tick = tokio::time::interval(Duration::from_millis(100));
        progress_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Toast expiry check.
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| ui::draw(f, &self))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg, &tx);
                }

                _ = progress_tick.tick() => {
                    if self.session.view() == View::Loading {
                        self.session.tick_progress();
                        needs_redraw = true;
                    }
                }

                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown: stop preview, restore terminal, persist view marker ─────
        self.preview.stop();
        self.save_ui_state();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        info!("trackget exiting");
        Ok(())
    }

    // ── Message dispatch ──────────────────────────────────────────────────────

    fn handle_message(&mut self, msg: AppMessage, tx: &mpsc::Sender<AppMessage>) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key, tx),
            AppMessage::Event(Event::Resize(..)) => true,
            AppMessage::Event(_) => false,

            AppMessage::LookupRetry(attempt) => {
                self.session.note_retry(attempt);
                true
            }

            AppMessage::LookupComplete(track) => {
                info!("lookup resolved: {} - {}", track.artist, track.title);
                self.history.record_lookup(&track);
                self.recent = self.history.load_lookups();
                self.session.complete(track);
                self.save_ui_state();
                self.toast.success("Track ready");
                true
            }

            AppMessage::LookupFailed(err) => {
                error!("lookup failed after retries: {}", err);
                self.session.fail(&err);
                self.save_ui_state();
                if let Some(info) = self.session.error() {
                    let message = info.message.clone();
                    self.toast.error(message);
                }
                true
            }

            AppMessage::DownloadComplete { filename, bytes } => {
                self.downloading = false;
                self.history.record_download(&filename);
                self.toast
                    .success(format!("Saved {} ({})", filename, format_size_mb(bytes)));
                true
            }

            AppMessage::DownloadFailed(message) => {
                self.downloading = false;
                error!("download failed: {}", message);
                self.toast.error(format!("Download failed: {}", message));
                true
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, tx: &mpsc::Sender<AppMessage>) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        // Global quit
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return true;
        }

        match self.session.view() {
            View::Input => match self.input.handle_key(key) {
                UrlAction::Submitted => {
                    self.submit(tx);
                    true
                }
                UrlAction::Changed(_) => true,
                UrlAction::Cleared => {
                    self.toast.info("Input cleared");
                    true
                }
            },

            View::Loading => match key.code {
                KeyCode::Enter => {
                    // The processing guard made visible.
                    self.toast.info("Already processing a track");
                    true
                }
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    true
                }
                _ => false,
            },

            View::Result => match key.code {
                KeyCode::Char('d') => {
                    self.start_download(tx);
                    true
                }
                KeyCode::Char('p') => {
                    self.toggle_preview();
                    true
                }
                KeyCode::Char('y') => {
                    self.share();
                    true
                }
                KeyCode::Char('r') | KeyCode::Esc => {
                    self.reset();
                    true
                }
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    true
                }
                _ => false,
            },

            View::Error => match key.code {
                KeyCode::Char('r') | KeyCode::Enter | KeyCode::Esc => {
                    self.session.retry();
                    self.save_ui_state();
                    true
                }
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    true
                }
                _ => false,
            },
        }
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    fn submit(&mut self, tx: &mpsc::Sender<AppMessage>) {
        let url = self.input.text().trim().to_string();
        if url.is_empty() {
            self.toast.error("Please enter a Spotify URL");
            return;
        }
        if !is_valid_track_url(&url) {
            self.toast.error("Invalid Spotify URL format");
            return;
        }
        if let Err(msg) = self.session.begin_lookup() {
            self.toast.info(msg);
            return;
        }
        self.save_ui_state();
        info!("lookup started: {}", url);

        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let retry_tx = tx.clone();
            let result = api
                .lookup(&url, move |attempt| {
                    let _ = retry_tx.try_send(AppMessage::LookupRetry(attempt));
                })
                .await;
            let msg = match result {
                Ok(track) => AppMessage::LookupComplete(track),
                Err(err) => AppMessage::LookupFailed(err),
            };
            let _ = tx.send(msg).await;
        });
    }

    fn start_download(&mut self, tx: &mpsc::Sender<AppMessage>) {
        if self.downloading {
            self.toast.info("Download already in progress");
            return;
        }
        let Some(track) = self.session.track() else {
            return;
        };
        let filename = target_filename(&track.artist, &track.title);
        let url = track.download_url.clone();
        let dir = self.downloads_dir.clone();
        let client = self.api.http_client();

        self.downloading = true;
        self.toast.info(format!("Downloading {}", filename));

        let tx = tx.clone();
        tokio::spawn(async move {
            let msg = match download::save_track(&client, &url, &dir, &filename).await {
                Ok(saved) => AppMessage::DownloadComplete {
                    filename,
                    bytes: saved.bytes,
                },
                Err(e) => AppMessage::DownloadFailed(e.to_string()),
            };
            let _ = tx.send(msg).await;
        });
    }

    fn toggle_preview(&mut self) {
        let Some(track) = self.session.track() else {
            return;
        };
        let url = track.download_url.clone();
        match self.preview.toggle(&url) {
            Ok(true) => self.toast.info("Playing preview…"),
            Ok(false) => self.toast.info("Preview stopped"),
            Err(e) => {
                warn!("preview unavailable: {}", e);
                self.toast.warning(format!("Preview unavailable: {}", e));
            }
        }
    }

    fn share(&mut self) {
        let Some(track) = self.session.track() else {
            return;
        };
        let text = format!(
            "{} - {}\n{}",
            track.title, track.artist, track.download_url
        );
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text)) {
            Ok(()) => self.toast.success("Link copied to clipboard"),
            Err(e) => {
                warn!("clipboard error: {}", e);
                self.toast.error("Failed to copy to clipboard");
            }
        }
    }

    fn reset(&mut self) {
        self.preview.stop();
        self.session.reset();
        self.input.clear();
        self.save_ui_state();
        self.toast.info("Ready for new search");
    }

    fn save_ui_state(&self) {
        let state = UiSessionState {
            last_view: self.session.view().name().to_string(),
        };
        match serde_json::to_string(&state) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&self.ui_state_path, content) {
                    warn!("failed to save ui state: {}", e);
                }
            }
            Err(e) => warn!("failed to serialize ui state: {}", e),
        }
    }
}
