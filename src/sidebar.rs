//! Sidebar expansion sub-state
//!
//! The sidebar is either collapsed (icons only, never focused) or expanded
//! with one of its nav items focused. Focus on expand is deferred by
//! [`FOCUS_DELAY`] so the render side has attached its targets; collapse
//! blurs immediately.

use std::time::Duration;

use crate::app::FocusRegion;

/// Wait before focusing a freshly expanded sidebar
pub const FOCUS_DELAY: Duration = Duration::from_millis(100);

/// Sidebar navigation entries, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Home,
    Profile,
}

impl NavItem {
    pub const ALL: [NavItem; 2] = [NavItem::Home, NavItem::Profile];

    pub fn label(&self) -> &'static str {
        match self {
            NavItem::Home => "Home",
            NavItem::Profile => "Profile",
        }
    }

    /// Screen this item switches to
    pub fn screen(&self) -> FocusRegion {
        match self {
            NavItem::Home => FocusRegion::Grid,
            NavItem::Profile => FocusRegion::Profile,
        }
    }
}

/// Effect of expanding or collapsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarEffect {
    /// Focus item `index` after `delay`, if still expanded by then
    FocusLater { index: usize, delay: Duration, generation: u64 },
    /// Drop element focus now
    Blur,
}

#[derive(Debug, Clone, Default)]
pub struct Sidebar {
    expanded: bool,
    focus_index: usize,
    /// Bumped on every expand so a late focus timer from an earlier
    /// expansion can be told apart
    generation: u64,
}

impl Sidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn focus_index(&self) -> usize {
        self.focus_index
    }

    pub fn focused_item(&self) -> NavItem {
        NavItem::ALL[self.focus_index.min(NavItem::ALL.len() - 1)]
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_focus_index(&mut self, index: usize) {
        self.focus_index = index.min(NavItem::ALL.len() - 1);
    }

    /// Nav index of the item that shows `screen` (the player has none)
    pub fn index_for_screen(screen: FocusRegion) -> Option<usize> {
        NavItem::ALL.iter().position(|item| item.screen() == screen)
    }

    pub fn toggle(&mut self) -> SidebarEffect {
        if self.expanded {
            self.collapse()
        } else {
            self.expand()
        }
    }

    pub fn expand(&mut self) -> SidebarEffect {
        self.expanded = true;
        self.generation += 1;
        SidebarEffect::FocusLater {
            index: self.focus_index,
            delay: FOCUS_DELAY,
            generation: self.generation,
        }
    }

    pub fn collapse(&mut self) -> SidebarEffect {
        self.expanded = false;
        SidebarEffect::Blur
    }

    /// Move focus up one item; no wrap. Returns whether it moved.
    pub fn up(&mut self) -> bool {
        if !self.expanded || self.focus_index == 0 {
            return false;
        }
        self.focus_index -= 1;
        true
    }

    /// Move focus down one item; no wrap. Returns whether it moved.
    pub fn down(&mut self) -> bool {
        if !self.expanded || self.focus_index + 1 >= NavItem::ALL.len() {
            return false;
        }
        self.focus_index += 1;
        true
    }

    /// Whether a deferred focus from `generation` should still be applied
    pub fn focus_ready(&self, generation: u64) -> bool {
        self.expanded && self.generation == generation
    }
}
