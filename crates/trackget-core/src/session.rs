//! Session — the lookup view state machine.
//!
//! A `Session` is a pure state object; the TUI owns it, feeds it events and
//! projects it to the screen each frame. Exactly one view is active at a
//! time, transitions are the only way to change it, and at most one lookup
//! is in flight (`processing` guard — a second submission is rejected, not
//! queued).

use tracing::{debug, warn};

use crate::api::{FetchError, TrackResult};

/// The four mutually exclusive views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Input,
    Loading,
    Result,
    Error,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Input => "input",
            View::Loading => "loading",
            View::Result => "result",
            View::Error => "error",
        }
    }
}

/// Human-readable title/message pair shown in the error view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub title: String,
    pub message: String,
}

/// Map a terminal fetch failure onto error-view copy by category.
pub fn categorize(err: &FetchError) -> ErrorInfo {
    match err {
        FetchError::Timeout => ErrorInfo {
            title: "Request Timeout".to_string(),
            message: "The request took too long. Check your connection and try again.".to_string(),
        },
        FetchError::Network(_) => ErrorInfo {
            title: "Network Error".to_string(),
            message: "Unable to reach the server. Check your connection.".to_string(),
        },
        FetchError::Http(code) => ErrorInfo {
            title: "Server Error".to_string(),
            message: format!("The server returned HTTP {}. Try again later.", code),
        },
        FetchError::Server(msg) => ErrorInfo {
            title: "Processing Error".to_string(),
            message: msg.clone(),
        },
    }
}

/// Decorative progress cap while the fetch is still unresolved.
const PROGRESS_CEILING: f64 = 90.0;
const PROGRESS_STEP: f64 = 0.5;
/// Bounded view trail (best-effort back-navigation record, not load-bearing).
const TRAIL_CAP: usize = 32;

pub struct Session {
    view: View,
    track: Option<TrackResult>,
    error: Option<ErrorInfo>,
    processing: bool,
    progress: f64,
    /// Last retry attempt reported by the fetch task (0 = first attempt).
    attempt: u32,
    trail: Vec<View>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            view: View::Input,
            track: None,
            error: None,
            processing: false,
            progress: 0.0,
            attempt: 0,
            trail: vec![View::Input],
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Non-null whenever the view is `Result`.
    pub fn track(&self) -> Option<&TrackResult> {
        self.track.as_ref()
    }

    /// Set whenever the view is `Error`.
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Views visited this session, oldest first, capped at `TRAIL_CAP`.
    pub fn trail(&self) -> &[View] {
        &self.trail
    }

    fn enter(&mut self, view: View) {
        if self.view == view {
            return;
        }
        debug!("view {} -> {}", self.view.name(), view.name());
        self.view = view;
        self.trail.push(view);
        if self.trail.len() > TRAIL_CAP {
            self.trail.remove(0);
        }
    }

    /// Start a lookup: `Input`/`Result`/`Error` → `Loading`.
    /// Rejected while another lookup is in flight; the view is unchanged.
    pub fn begin_lookup(&mut self) -> Result<(), String> {
        if self.processing {
            return Err("Already processing a track".to_string());
        }
        self.processing = true;
        self.progress = 0.0;
        self.attempt = 0;
        self.error = None;
        self.enter(View::Loading);
        Ok(())
    }

    /// Record a retry attempt for the loading view's subtitle.
    pub fn note_retry(&mut self, attempt: u32) {
        if self.view == View::Loading {
            self.attempt = attempt;
        }
    }

    /// Lookup resolved: `Loading` → `Result`. Stale completions (arriving
    /// after a reset) are dropped.
    pub fn complete(&mut self, track: TrackResult) {
        if self.view != View::Loading {
            warn!("dropping lookup result outside loading view");
            return;
        }
        self.progress = 100.0;
        self.processing = false;
        self.track = Some(track);
        self.enter(View::Result);
    }

    /// Lookup failed after the retry budget: `Loading` → `Error`.
    pub fn fail(&mut self, err: &FetchError) {
        if self.view != View::Loading {
            warn!("dropping lookup failure outside loading view");
            return;
        }
        self.processing = false;
        self.error = Some(categorize(err));
        self.enter(View::Error);
    }

    /// Discard any result and return to `Input`.
    pub fn reset(&mut self) {
        self.track = None;
        self.error = None;
        self.processing = false;
        self.progress = 0.0;
        self.attempt = 0;
        self.enter(View::Input);
    }

    /// Recovery from the error view: back to `Input`.
    pub fn retry(&mut self) {
        if self.view == View::Error {
            self.reset();
        }
    }

    /// Advance the decorative progress indicator (100 ms cadence). Capped at
    /// 90 % until the fetch actually resolves.
    pub fn tick_progress(&mut self) {
        if self.view == View::Loading && self.progress < PROGRESS_CEILING {
            self.progress += PROGRESS_STEP;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration in seconds as `m:ss`; `--:--` when absent or invalid.
pub fn format_duration(secs: Option<f64>) -> String {
    match secs {
        Some(s) if s.is_finite() && s >= 0.0 => {
            let total = s as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> TrackResult {
        TrackResult {
            title: "T".to_string(),
            artist: "A".to_string(),
            cover_url: None,
            duration_secs: Some(215.0),
            size_label: Some("4.9 MB".to_string()),
            download_url: "http://x/y.mp3".to_string(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = Session::new();
        assert_eq!(session.view(), View::Input);

        session.begin_lookup().unwrap();
        assert_eq!(session.view(), View::Loading);
        assert!(session.is_processing());

        session.complete(track());
        assert_eq!(session.view(), View::Result);
        assert!(!session.is_processing());
        assert_eq!(session.progress(), 100.0);
        // Result view always carries a track.
        assert_eq!(session.track().unwrap().title, "T");

        session.reset();
        assert_eq!(session.view(), View::Input);
        assert!(session.track().is_none());
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_failure_path_and_retry() {
        let mut session = Session::new();
        session.begin_lookup().unwrap();
        session.fail(&FetchError::Timeout);

        assert_eq!(session.view(), View::Error);
        // Error view always carries a message.
        let info = session.error().unwrap();
        assert_eq!(info.title, "Request Timeout");

        session.retry();
        assert_eq!(session.view(), View::Input);
        assert!(session.error().is_none());
    }

    #[test]
    fn test_second_submission_rejected_while_processing() {
        let mut session = Session::new();
        session.begin_lookup().unwrap();
        session.tick_progress();
        let progress = session.progress();

        assert!(session.begin_lookup().is_err());
        assert_eq!(session.view(), View::Loading);
        assert_eq!(session.progress(), progress);
    }

    #[test]
    fn test_progress_caps_at_ninety_until_resolution() {
        let mut session = Session::new();
        session.begin_lookup().unwrap();
        for _ in 0..500 {
            session.tick_progress();
        }
        assert_eq!(session.progress(), 90.0);

        session.complete(track());
        assert_eq!(session.progress(), 100.0);
    }

    #[test]
    fn test_stale_completion_dropped_after_reset() {
        let mut session = Session::new();
        session.begin_lookup().unwrap();
        session.reset();

        session.complete(track());
        assert_eq!(session.view(), View::Input);
        assert!(session.track().is_none());
    }

    #[test]
    fn test_retry_is_noop_outside_error_view() {
        let mut session = Session::new();
        session.begin_lookup().unwrap();
        session.retry();
        assert_eq!(session.view(), View::Loading);
        assert!(session.is_processing());
    }

    #[test]
    fn test_trail_records_transitions() {
        let mut session = Session::new();
        session.begin_lookup().unwrap();
        session.complete(track());
        session.reset();
        assert_eq!(
            session.trail(),
            &[View::Input, View::Loading, View::Result, View::Input]
        );
    }

    #[test]
    fn test_note_retry_only_while_loading() {
        let mut session = Session::new();
        session.note_retry(2);
        assert_eq!(session.attempt(), 0);

        session.begin_lookup().unwrap();
        session.note_retry(2);
        assert_eq!(session.attempt(), 2);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(215.0)), "3:35");
        assert_eq!(format_duration(Some(59.9)), "0:59");
        assert_eq!(format_duration(Some(-1.0)), "--:--");
        assert_eq!(format_duration(Some(f64::NAN)), "--:--");
        assert_eq!(format_duration(None), "--:--");
    }
}
