//! Smooth Unicode progress bar widget.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_ACCENT, C_SECONDARY};

/// Render a smooth progress bar in `area`. `percent` is 0.0..=100.0 and is
/// also printed as the right-hand label.
pub fn draw_progress(frame: &mut Frame, area: Rect, percent: f64) {
    if area.width < 8 || area.height == 0 {
        return;
    }

    let label = format!("{:3.0}%", percent.clamp(0.0, 100.0));
    let bar_w = area.width.saturating_sub(label.len() as u16 + 1).max(4) as usize;

    // Unicode smooth fill: 8 eighths per cell
    let eighths = (percent.clamp(0.0, 100.0) / 100.0 * bar_w as f64 * 8.0) as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

    let mut bar = String::with_capacity(bar_w + 4);
    for _ in 0..full_blocks {
        bar.push('█');
    }
    if full_blocks < bar_w {
        bar.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..bar_w {
            bar.push(' ');
        }
    }

    let spans = vec![
        Span::styled(bar, Style::default().fg(C_ACCENT)),
        Span::styled(format!(" {}", label), Style::default().fg(C_SECONDARY)),
    ];

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
