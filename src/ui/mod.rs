//! Terminal UI
//!
//! [`TuiSurface`] is the render-side view model: the shell tells it what
//! changed through [`FocusSurface`] and [`draw`] paints it each frame.

pub mod grid;
pub mod player;
pub mod profile;
pub mod sidebar;
pub mod theme;

use ratatui::{
    prelude::*,
    widgets::{Block, Clear, Paragraph},
};

use crate::app::FocusRegion;
use crate::profile::ProfileView;
use crate::shell::{FocusSurface, Shell};

pub use theme::Theme;

/// What the terminal currently shows
#[derive(Debug, Clone)]
pub struct TuiSurface {
    screen: FocusRegion,
    focus: Option<(FocusRegion, usize)>,
    sidebar_expanded: bool,
    sidebar_visible: bool,
    profile: ProfileView,
}

impl Default for TuiSurface {
    fn default() -> Self {
        Self {
            screen: FocusRegion::Grid,
            focus: None,
            sidebar_expanded: false,
            sidebar_visible: true,
            profile: ProfileView::SignedOut,
        }
    }
}

impl TuiSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> FocusRegion {
        self.screen
    }

    /// Element holding focus, if any
    pub fn focus(&self) -> Option<(FocusRegion, usize)> {
        self.focus
    }

    pub fn is_focused(&self, region: FocusRegion, index: usize) -> bool {
        self.focus == Some((region, index))
    }

    pub fn region_focused(&self, region: FocusRegion) -> bool {
        matches!(self.focus, Some((r, _)) if r == region)
    }

    pub fn sidebar_expanded(&self) -> bool {
        self.sidebar_expanded
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn profile(&self) -> &ProfileView {
        &self.profile
    }
}

impl FocusSurface for TuiSurface {
    fn set_focus(&mut self, region: FocusRegion, index: usize) {
        self.focus = Some((region, index));
    }

    fn show_screen(&mut self, screen: FocusRegion) {
        self.screen = screen;
    }

    fn set_sidebar_expanded(&mut self, expanded: bool) {
        self.sidebar_expanded = expanded;
    }

    fn set_sidebar_visible(&mut self, visible: bool) {
        self.sidebar_visible = visible;
    }

    fn blur(&mut self) {
        self.focus = None;
    }

    fn render_profile(&mut self, view: &ProfileView) {
        self.profile = view.clone();
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Paint the whole frame
pub fn draw(frame: &mut Frame, shell: &Shell<TuiSurface>) {
    let area = frame.area();
    let surface = shell.surface();

    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(Theme::text()), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let content = if surface.sidebar_visible() {
        let width = if surface.sidebar_expanded() {
            sidebar::EXPANDED_WIDTH
        } else {
            sidebar::COLLAPSED_WIDTH
        };
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(width), Constraint::Min(1)])
            .split(rows[0]);
        sidebar::render(frame, columns[0], surface);
        columns[1]
    } else {
        rows[0]
    };

    match surface.screen() {
        FocusRegion::Player => player::render(frame, content, &shell.player().status()),
        FocusRegion::Profile => profile::render(frame, content, surface),
        FocusRegion::Grid | FocusRegion::Sidebar => {
            grid::render(frame, content, shell.router().catalog(), surface)
        }
    }

    render_status_bar(frame, rows[1], shell);
}

fn render_status_bar(frame: &mut Frame, area: Rect, shell: &Shell<TuiSurface>) {
    let region = shell.router().state().active_region();
    let account = match shell.profile().email() {
        Some(email) => Span::styled(format!(" {} ", email), Theme::success()),
        None => Span::styled(" signed out ", Theme::dimmed()),
    };

    let line = Line::from(vec![
        Span::styled(format!(" {:?} ", region).to_uppercase(), Theme::focused()),
        account,
        Span::raw(" │ "),
        Span::styled("1:sign-in request  2:deeplink  q:quit", Theme::dimmed()),
    ]);
    frame.render_widget(Paragraph::new(line).style(Theme::status_bar()), area);
}
