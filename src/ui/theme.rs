//! Color palette and style helpers for the terminal front-end

use ratatui::style::{Color, Modifier, Style};

/// TV-style dark palette
pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // CORE PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// Background: #101014
    pub const BACKGROUND: Color = Color::Rgb(0x10, 0x10, 0x14);

    /// Primary: #4fc3f7 (focus ring blue)
    pub const PRIMARY: Color = Color::Rgb(0x4f, 0xc3, 0xf7);

    /// Accent: #ffb300 (amber, registration codes)
    pub const ACCENT: Color = Color::Rgb(0xff, 0xb3, 0x00);

    /// Text: #e0e0e0
    pub const TEXT: Color = Color::Rgb(0xe0, 0xe0, 0xe0);

    /// Dim: #5a5a66
    pub const DIM: Color = Color::Rgb(0x5a, 0x5a, 0x66);

    /// Success: #66bb6a
    pub const SUCCESS: Color = Color::Rgb(0x66, 0xbb, 0x6a);

    /// Live badge: #ef5350
    pub const LIVE: Color = Color::Rgb(0xef, 0x53, 0x50);

    /// Border color when not focused
    pub const BORDER: Color = Color::Rgb(0x2e, 0x3a, 0x46);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND)
    }

    /// Element holding remote focus
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn dimmed() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn title() -> Style {
        Style::default().fg(Self::PRIMARY).add_modifier(Modifier::BOLD)
    }

    pub fn border(focused: bool) -> Style {
        if focused {
            Style::default().fg(Self::PRIMARY)
        } else {
            Style::default().fg(Self::BORDER)
        }
    }

    pub fn reg_code() -> Style {
        Style::default().fg(Self::ACCENT).add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS).add_modifier(Modifier::BOLD)
    }

    pub fn live() -> Style {
        Style::default().fg(Self::LIVE).add_modifier(Modifier::BOLD)
    }

    pub fn keybind() -> Style {
        Style::default().fg(Self::BACKGROUND).bg(Self::DIM)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BORDER)
    }
}
