//! Render projection: `draw(frame, &App)` maps the session state onto the
//! four views. No state lives here.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use trackget_core::download::target_filename;
use trackget_core::session::{format_duration, View};
use trackget_core::validate::is_valid_track_url;

use crate::app::App;
use crate::theme::{
    style_accent, style_default, style_error, style_muted, style_secondary, C_PANEL_BORDER,
};
use crate::widgets::progress_bar::draw_progress;

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let chunks = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).split(area);

    draw_header(frame, chunks[0]);

    let body = chunks[1];
    match app.session.view() {
        View::Input => draw_input(frame, body, app),
        View::Loading => draw_loading(frame, body, app),
        View::Result => draw_result(frame, body, app),
        View::Error => draw_error(frame, body, app),
    }

    app.toast.draw(frame, area);
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" trackget", style_accent().add_modifier(Modifier::BOLD)),
        Span::styled(" — spotify track downloader", style_secondary()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// A centered card of at most `width`×`height` within `area`.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn card(frame: &mut Frame, area: Rect, width: u16, height: u16) -> Rect {
    let outer = centered(area, width, height);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_PANEL_BORDER));
    let inner = block.inner(outer);
    frame.render_widget(block, outer);
    inner
}

fn draw_input(frame: &mut Frame, area: Rect, app: &App) {
    let recent_rows = app.recent.len().min(4) as u16;
    let height = 8 + if recent_rows > 0 { recent_rows + 2 } else { 0 };
    let inner = card(frame, area, 64, height);

    let mut constraints = vec![
        Constraint::Length(1), // prompt
        Constraint::Length(1),
        Constraint::Length(1), // input bar
        Constraint::Length(1), // validity / shapes hint
        Constraint::Length(1),
        Constraint::Length(1), // keys
    ];
    if recent_rows > 0 {
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Length(1)); // "recent" label
        constraints.push(Constraint::Min(0));
    }
    let rows = Layout::vertical(constraints).split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            "Paste a track, album, playlist or artist link",
            style_default(),
        )),
        rows[0],
    );

    let value = app.input.text().trim();
    let valid = is_valid_track_url(value);
    app.input.draw(frame, rows[2], valid || value.is_empty());

    let hint = if !value.is_empty() && !valid {
        Span::styled("not a recognised spotify link", style_error())
    } else {
        Span::styled(
            "open.spotify.com/track|album|playlist|artist · spotify.link",
            style_muted(),
        )
    };
    frame.render_widget(Paragraph::new(hint), rows[3]);

    frame.render_widget(
        Paragraph::new(Span::styled(
            "enter fetch · esc clear · ctrl-c quit",
            style_muted(),
        )),
        rows[5],
    );

    if recent_rows > 0 {
        frame.render_widget(
            Paragraph::new(Span::styled("recent", style_secondary())),
            rows[7],
        );
        let lines: Vec<Line> = app
            .recent
            .iter()
            .take(recent_rows as usize)
            .map(|e| {
                Line::from(vec![
                    Span::styled(e.artist.clone(), style_secondary()),
                    Span::styled(" — ", style_muted()),
                    Span::styled(e.title.clone(), style_default()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), rows[8]);
    }
}

fn draw_loading(frame: &mut Frame, area: Rect, app: &App) {
    let inner = card(frame, area, 54, 8);
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            "Fetching track info",
            style_accent().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        rows[0],
    );

    let subtitle = if app.session.attempt() > 0 {
        format!(
            "Connection issue, retrying ({}/{})…",
            app.session.attempt(),
            app.retry_budget
        )
    } else {
        "Contacting server…".to_string()
    };
    frame.render_widget(
        Paragraph::new(Span::styled(subtitle, style_secondary())).alignment(Alignment::Center),
        rows[1],
    );

    draw_progress(frame, rows[3], app.session.progress());

    frame.render_widget(
        Paragraph::new(Span::styled("ctrl-c quit", style_muted())).alignment(Alignment::Center),
        rows[5],
    );
}

fn draw_result(frame: &mut Frame, area: Rect, app: &App) {
    // Invariant upstream: the result view always has a track.
    let Some(track) = app.session.track() else {
        return;
    };

    let inner = card(frame, area, 64, 11);
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            track.title.clone(),
            style_default().add_modifier(Modifier::BOLD),
        )),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(track.artist.clone(), style_accent())),
        rows[1],
    );

    let mut meta = format!("duration {}", format_duration(track.duration_secs));
    if let Some(size) = &track.size_label {
        meta.push_str(&format!(" · size {}", size));
    }
    frame.render_widget(
        Paragraph::new(Span::styled(meta, style_secondary())),
        rows[3],
    );

    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("file {}", target_filename(&track.artist, &track.title)),
            style_muted(),
        )),
        rows[4],
    );

    if app.downloading {
        frame.render_widget(
            Paragraph::new(Span::styled("downloading…", style_accent())),
            rows[6],
        );
    }

    frame.render_widget(
        Paragraph::new(Span::styled(
            "d download · p preview · y copy link · r new search · q quit",
            style_muted(),
        )),
        rows[8],
    );
}

fn draw_error(frame: &mut Frame, area: Rect, app: &App) {
    // Invariant upstream: the error view always has a message.
    let Some(info) = app.session.error() else {
        return;
    };

    let inner = card(frame, area, 56, 8);
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            info.title.clone(),
            style_error().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(info.message.clone(), style_secondary()))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rows[2],
    );
    frame.render_widget(
        Paragraph::new(Span::styled("r try again · q quit", style_muted()))
            .alignment(Alignment::Center),
        rows[4],
    );
}
