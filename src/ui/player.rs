//! Player screen
//!
//! Title, play state and playhead of whatever the player has loaded.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::models::{PlayState, PlaybackStatus};
use crate::ui::Theme;

/// Format duration as HH:MM:SS or MM:SS
pub fn format_duration(seconds: f64) -> String {
    let total_secs = seconds as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

pub fn render(frame: &mut Frame, area: Rect, status: &PlaybackStatus) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border(true))
        .title(Span::styled(" ▶ NOW PLAYING ", Theme::success()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let state = match status.state {
        PlayState::Playing => Span::styled("▶ Playing", Theme::success()),
        PlayState::Paused => Span::styled("❚❚ Paused", Theme::reg_code()),
        PlayState::Idle => Span::styled("Nothing loaded", Theme::dimmed()),
    };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(status.title.clone(), Theme::title())),
        Line::from(""),
        Line::from(state),
        Line::from(Span::styled(format_duration(status.position.as_secs_f64()), Theme::dimmed())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ENTER ", Theme::keybind()),
            Span::styled(" Play/Pause  ", Theme::dimmed()),
            Span::styled(" ←→ ", Theme::keybind()),
            Span::styled(" Seek 30s  ", Theme::dimmed()),
            Span::styled(" BKSP ", Theme::keybind()),
            Span::styled(" Back", Theme::dimmed()),
        ]),
    ];

    frame.render_widget(Paragraph::new(content).alignment(Alignment::Center), inner);
}
