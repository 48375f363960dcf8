//! Home grid
//!
//! One row of media tiles. The focused tile gets the focus ring.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use crate::app::FocusRegion;
use crate::models::Video;
use crate::ui::{Theme, TuiSurface};

pub fn render(frame: &mut Frame, area: Rect, catalog: &[Video], surface: &TuiSurface) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border(surface.region_focused(FocusRegion::Grid)))
        .title(Span::styled(" HOME ", Theme::title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if catalog.is_empty() {
        frame.render_widget(Paragraph::new("Nothing to watch").style(Theme::dimmed()), inner);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, catalog.len() as u32); catalog.len()])
        .split(inner);

    for (index, (video, cell)) in catalog.iter().zip(columns.iter()).enumerate() {
        render_tile(frame, *cell, video, surface.is_focused(FocusRegion::Grid, index));
    }
}

fn render_tile(frame: &mut Frame, area: Rect, video: &Video, focused: bool) {
    let mut lines = vec![Line::from(""), Line::from(Span::styled(video.title.clone(), Theme::text()))];
    if video.is_live {
        lines.push(Line::from(Span::styled("● LIVE", Theme::live())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Thick
        } else {
            BorderType::Plain
        })
        .border_style(Theme::border(focused));

    let tile = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(if focused { Theme::focused() } else { Theme::text() })
        .block(block);
    frame.render_widget(tile, area);
}
