//! Profile screen
//!
//! Shows the registration code while a sign-in runs, the account and a
//! sign-out button when signed in.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::app::FocusRegion;
use crate::profile::ProfileView;
use crate::ui::{Theme, TuiSurface};

pub fn render(frame: &mut Frame, area: Rect, surface: &TuiSurface) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border(surface.region_focused(FocusRegion::Profile)))
        .title(Span::styled(" PROFILE ", Theme::title()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = match surface.profile() {
        ProfileView::GeneratingCode => vec![
            Line::from(""),
            Line::from(Span::styled("Generating code...", Theme::dimmed())),
        ],
        ProfileView::ShowCode(code) => vec![
            Line::from(""),
            Line::from("Enter this code in the mobile app"),
            Line::from(""),
            Line::from(Span::styled(code.clone(), Theme::reg_code())),
            Line::from(""),
            Line::from(Span::styled("Back to cancel", Theme::dimmed())),
        ],
        ProfileView::SignedIn { email } => {
            let button = if surface.is_focused(FocusRegion::Profile, 0) {
                Theme::focused()
            } else {
                Theme::text()
            };
            vec![
                Line::from(""),
                Line::from(Span::styled("Signed in", Theme::success())),
                Line::from(email.clone()),
                Line::from(""),
                Line::from(Span::styled(" Sign out ", button)),
            ]
        }
        ProfileView::SignedOut => vec![
            Line::from(""),
            Line::from("Not signed in"),
            Line::from(Span::styled("Sign in from the mobile app", Theme::dimmed())),
        ],
    };

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}
