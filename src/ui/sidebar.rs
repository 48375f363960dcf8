//! Sidebar panel
//!
//! Collapsed it shows one icon per item with the shown screen marked;
//! expanded it shows labels and the focus ring.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem},
};

use crate::app::FocusRegion;
use crate::sidebar::{NavItem, Sidebar};
use crate::ui::{Theme, TuiSurface};

/// Width of the collapsed and expanded panel
pub const COLLAPSED_WIDTH: u16 = 5;
pub const EXPANDED_WIDTH: u16 = 16;

fn icon(item: NavItem) -> &'static str {
    match item {
        NavItem::Home => "⌂",
        NavItem::Profile => "☺",
    }
}

pub fn render(frame: &mut Frame, area: Rect, surface: &TuiSurface) {
    let expanded = surface.sidebar_expanded();
    let current = Sidebar::index_for_screen(surface.screen());

    let items: Vec<ListItem> = NavItem::ALL
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let text = if expanded {
                format!(" {} {}", icon(*item), item.label())
            } else {
                format!(" {}", icon(*item))
            };
            let style = if surface.is_focused(FocusRegion::Sidebar, index) {
                Theme::focused()
            } else if current == Some(index) {
                Theme::title()
            } else {
                Theme::text()
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(Theme::border(expanded));
    frame.render_widget(List::new(items).block(block), area);
}
