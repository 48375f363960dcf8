//! Focus routing and navigation state
//!
//! The [`Router`] owns [`NavigationState`] and turns remote intents into
//! state transitions plus a list of [`Command`]s for the render, player,
//! profile and continuity collaborators. It never talks to them directly
//! and never fails; the shell applies the commands.

use crossterm::event::{KeyCode, KeyEvent, MediaKeyCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Video;
use crate::sidebar::{Sidebar, SidebarEffect};

/// Seek step for left/right in the player, in seconds
pub const SEEK_STEP_SECS: f64 = 30.0;

// =============================================================================
// Regions and Intents
// =============================================================================

/// A screen or panel that can hold input focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusRegion {
    #[default]
    Grid,
    Player,
    Sidebar,
    Profile,
}

/// Device-independent input action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    PlayPause,
}

/// Map a terminal key to an intent. Besides the arrows, `p`/`n` step
/// left/right as on the desktop build, and Esc doubles as Back.
pub fn intent_for_key(key: KeyEvent) -> Option<Intent> {
    match key.code {
        KeyCode::Left | KeyCode::Char('p') | KeyCode::Char('P') => Some(Intent::Left),
        KeyCode::Right | KeyCode::Char('n') | KeyCode::Char('N') => Some(Intent::Right),
        KeyCode::Up => Some(Intent::Up),
        KeyCode::Down => Some(Intent::Down),
        KeyCode::Enter => Some(Intent::Select),
        KeyCode::Backspace | KeyCode::Esc => Some(Intent::Back),
        KeyCode::Char(' ')
        | KeyCode::Media(MediaKeyCode::PlayPause)
        | KeyCode::Media(MediaKeyCode::Play)
        | KeyCode::Media(MediaKeyCode::Pause) => Some(Intent::PlayPause),
        _ => None,
    }
}

/// What happens at the ends of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Stop at the last item
    #[default]
    Clamp,
    /// Right on the last item goes back to the first
    Wrap,
}

// =============================================================================
// Commands
// =============================================================================

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FocusGrid(usize),
    FocusSidebar(usize),
    /// Focus a sidebar item once the expanded sidebar is ready
    FocusSidebarLater { index: usize, delay: Duration, generation: u64 },
    FocusProfile,
    /// Drop element-level focus
    Blur,
    ExpandSidebar,
    CollapseSidebar,
    SetSidebarVisible(bool),
    ShowScreen(FocusRegion),
    LoadVideo(Video),
    Seek(f64),
    TogglePlayPause,
    UnloadPlayer,
    /// Tell the continuity layer playback stopped
    NotifyStopVideo,
    CancelSignIn,
    SignOut,
    RenderProfile,
    Exit,
}

impl From<SidebarEffect> for Command {
    fn from(effect: SidebarEffect) -> Self {
        match effect {
            SidebarEffect::FocusLater {
                index,
                delay,
                generation,
            } => Command::FocusSidebarLater {
                index,
                delay,
                generation,
            },
            SidebarEffect::Blur => Command::Blur,
        }
    }
}

/// The slice of profile state the router is allowed to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileFlags {
    pub signed_in: bool,
    pub sign_in_in_progress: bool,
}

// =============================================================================
// Navigation State
// =============================================================================

/// Which region has focus, which screen is shown, and where focus sits
/// inside each. `active_region == Sidebar` only while the sidebar is
/// expanded.
#[derive(Debug, Clone)]
pub struct NavigationState {
    active_region: FocusRegion,
    active_screen: FocusRegion,
    return_screen: FocusRegion,
    grid_focus_index: usize,
    grid_len: usize,
    sidebar: Sidebar,
    boundary: BoundaryPolicy,
    now_playing: Option<Video>,
}

impl NavigationState {
    pub fn new(grid_len: usize, boundary: BoundaryPolicy) -> Self {
        Self {
            active_region: FocusRegion::Grid,
            active_screen: FocusRegion::Grid,
            return_screen: FocusRegion::Grid,
            grid_focus_index: 0,
            grid_len,
            sidebar: Sidebar::new(),
            boundary,
            now_playing: None,
        }
    }

    pub fn active_region(&self) -> FocusRegion {
        self.active_region
    }

    /// Screen currently shown (never `Sidebar`)
    pub fn active_screen(&self) -> FocusRegion {
        self.active_screen
    }

    /// Screen the player returns to on Back
    pub fn return_screen(&self) -> FocusRegion {
        self.return_screen
    }

    pub fn grid_focus_index(&self) -> usize {
        self.grid_focus_index
    }

    pub fn grid_len(&self) -> usize {
        self.grid_len
    }

    pub fn sidebar(&self) -> &Sidebar {
        &self.sidebar
    }

    pub fn sidebar_expanded(&self) -> bool {
        self.sidebar.is_expanded()
    }

    pub fn sidebar_focus_index(&self) -> usize {
        self.sidebar.focus_index()
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    pub fn now_playing(&self) -> Option<&Video> {
        self.now_playing.as_ref()
    }
}

// =============================================================================
// Router
// =============================================================================

/// Navigation state machine
#[derive(Debug, Clone)]
pub struct Router {
    state: NavigationState,
    catalog: Vec<Video>,
}

impl Router {
    pub fn new(catalog: Vec<Video>, boundary: BoundaryPolicy) -> Self {
        Self {
            state: NavigationState::new(catalog.len(), boundary),
            catalog,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn catalog(&self) -> &[Video] {
        &self.catalog
    }

    /// Route an intent from the remote
    pub fn handle(&mut self, intent: Intent, profile: ProfileFlags) -> Vec<Command> {
        if intent == Intent::PlayPause && self.state.active_region != FocusRegion::Player {
            return Vec::new();
        }

        let commands = match self.state.active_region {
            FocusRegion::Grid => self.handle_grid(intent),
            FocusRegion::Sidebar => self.handle_sidebar(intent),
            FocusRegion::Player => self.handle_player(intent),
            FocusRegion::Profile => self.handle_profile(intent, profile),
        };

        debug_assert!(
            self.state.active_region != FocusRegion::Sidebar || self.state.sidebar.is_expanded(),
            "sidebar focused while collapsed"
        );
        commands
    }

    /// Play a video requested from another device. Behaves like selecting
    /// a tile: the current screen becomes the return target.
    pub fn activate_deeplink(&mut self, video: Video) -> Vec<Command> {
        self.enter_player(video)
    }

    /// Deferred sidebar focus timer fired
    pub fn sidebar_focus_ready(&mut self, generation: u64) -> Vec<Command> {
        if self.state.active_region == FocusRegion::Sidebar && self.state.sidebar.focus_ready(generation) {
            vec![Command::FocusSidebar(self.state.sidebar.focus_index())]
        } else {
            Vec::new()
        }
    }

    fn handle_grid(&mut self, intent: Intent) -> Vec<Command> {
        match intent {
            Intent::Left => {
                if self.state.grid_focus_index == 0 {
                    self.state.sidebar.set_focus_index(0);
                    self.enter_sidebar()
                } else {
                    self.state.grid_focus_index -= 1;
                    vec![Command::FocusGrid(self.state.grid_focus_index)]
                }
            }
            Intent::Right => {
                let len = self.state.grid_len;
                if len == 0 {
                    return Vec::new();
                }
                let next = if self.state.grid_focus_index + 1 < len {
                    self.state.grid_focus_index + 1
                } else {
                    match self.state.boundary {
                        BoundaryPolicy::Clamp => return Vec::new(),
                        BoundaryPolicy::Wrap => 0,
                    }
                };
                self.state.grid_focus_index = next;
                vec![Command::FocusGrid(next)]
            }
            Intent::Select => match self.catalog.get(self.state.grid_focus_index).cloned() {
                Some(video) => self.enter_player(video),
                None => Vec::new(),
            },
            Intent::Back => vec![Command::Exit],
            _ => Vec::new(),
        }
    }

    fn handle_sidebar(&mut self, intent: Intent) -> Vec<Command> {
        match intent {
            Intent::Up => {
                if self.state.sidebar.up() {
                    vec![Command::FocusSidebar(self.state.sidebar.focus_index())]
                } else {
                    Vec::new()
                }
            }
            Intent::Down => {
                if self.state.sidebar.down() {
                    vec![Command::FocusSidebar(self.state.sidebar.focus_index())]
                } else {
                    Vec::new()
                }
            }
            // Only reachable while expanded, so this always collapses
            Intent::Left => {
                let effect = self.state.sidebar.toggle();
                self.state.active_region = self.state.active_screen;
                vec![Command::CollapseSidebar, effect.into()]
            }
            Intent::Right => {
                if let Some(index) = Sidebar::index_for_screen(self.state.active_screen) {
                    self.state.sidebar.set_focus_index(index);
                }
                let mut commands = self.leave_sidebar();
                commands.extend(self.refocus(self.state.active_screen));
                commands
            }
            Intent::Select => {
                let screen = self.state.sidebar.focused_item().screen();
                let mut commands = self.leave_sidebar();
                self.state.active_screen = screen;
                self.state.active_region = screen;
                commands.push(Command::ShowScreen(screen));
                if screen == FocusRegion::Profile {
                    commands.push(Command::RenderProfile);
                }
                commands.extend(self.refocus(screen));
                commands
            }
            Intent::Back => vec![Command::Exit],
            Intent::PlayPause => Vec::new(),
        }
    }

    fn handle_player(&mut self, intent: Intent) -> Vec<Command> {
        match intent {
            Intent::Left => vec![Command::Seek(-SEEK_STEP_SECS)],
            Intent::Right => vec![Command::Seek(SEEK_STEP_SECS)],
            Intent::Select | Intent::PlayPause => vec![Command::TogglePlayPause],
            Intent::Back => {
                let screen = self.state.return_screen;
                self.state.active_screen = screen;
                self.state.active_region = screen;
                self.state.now_playing = None;

                let mut commands = vec![
                    Command::UnloadPlayer,
                    Command::NotifyStopVideo,
                    Command::ShowScreen(screen),
                    Command::SetSidebarVisible(true),
                ];
                commands.extend(self.refocus(screen));
                commands
            }
            Intent::Up | Intent::Down => Vec::new(),
        }
    }

    fn handle_profile(&mut self, intent: Intent, profile: ProfileFlags) -> Vec<Command> {
        match intent {
            Intent::Left => self.enter_sidebar(),
            Intent::Back if profile.sign_in_in_progress => {
                vec![Command::CancelSignIn, Command::RenderProfile]
            }
            Intent::Back => self.enter_sidebar(),
            // Signed in, the sign-out button is the only focusable element
            Intent::Select if profile.signed_in => vec![Command::SignOut, Command::RenderProfile],
            _ => Vec::new(),
        }
    }

    fn enter_sidebar(&mut self) -> Vec<Command> {
        self.state.active_region = FocusRegion::Sidebar;
        let effect = self.state.sidebar.expand();
        vec![Command::ExpandSidebar, effect.into()]
    }

    fn leave_sidebar(&mut self) -> Vec<Command> {
        let effect = self.state.sidebar.collapse();
        self.state.active_region = self.state.active_screen;
        vec![Command::CollapseSidebar, effect.into()]
    }

    fn enter_player(&mut self, video: Video) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.state.sidebar.is_expanded() {
            let effect = self.state.sidebar.collapse();
            commands.extend([Command::CollapseSidebar, effect.into()]);
        }
        if self.state.active_screen != FocusRegion::Player {
            self.state.return_screen = self.state.active_screen;
        }
        self.state.active_screen = FocusRegion::Player;
        self.state.active_region = FocusRegion::Player;
        self.state.now_playing = Some(video.clone());

        commands.extend([
            Command::SetSidebarVisible(false),
            Command::ShowScreen(FocusRegion::Player),
            Command::LoadVideo(video),
        ]);
        commands
    }

    fn refocus(&self, screen: FocusRegion) -> Vec<Command> {
        match screen {
            FocusRegion::Grid => vec![Command::FocusGrid(self.state.grid_focus_index)],
            FocusRegion::Profile => vec![Command::FocusProfile],
            FocusRegion::Player | FocusRegion::Sidebar => Vec::new(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
