//! Shell - the single coordinating task
//!
//! Every input reaches the app as an [`AppEvent`] on one channel: key
//! intents, handshake progress, deeplinks, sign-in requests and timers.
//! The shell owns the [`Router`] and the collaborators and is the only
//! place state changes, so nothing here needs a lock.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::{Command, FocusRegion, Intent, ProfileFlags, Router};
use crate::continuity::{from_wire_video, to_wire_video, ContinuityLayer, LoopbackContinuity, WireVideo};
use crate::models::{SignInRequest, SignInStatus, Video};
use crate::profile::{Profile, ProfileEvent, ProfileNotifier, ProfileView};
use crate::sleep::{Sleeper, TokioSleeper};
use crate::stream::{HeadlessPlayer, Player};

/// Everything the shell reacts to
#[derive(Debug)]
pub enum AppEvent {
    Input(Intent),
    Profile(ProfileEvent),
    Deeplink(WireVideo),
    SignInRequested {
        request: SignInRequest,
        status_tx: mpsc::UnboundedSender<SignInStatus>,
    },
    /// Deferred sidebar focus for the given expansion
    SidebarFocusReady(u64),
    Quit,
}

/// Notifier that posts profile results back onto the event channel
pub fn profile_notifier(events: mpsc::UnboundedSender<AppEvent>) -> ProfileNotifier {
    Arc::new(move |event| {
        if events.send(AppEvent::Profile(event)).is_err() {
            debug!("Event channel closed; dropping profile event");
        }
    })
}

/// Render side. Implementations move their own focus highlight and
/// visibility; the shell only says what changed.
pub trait FocusSurface {
    /// Focus item `index` inside `region`
    fn set_focus(&mut self, region: FocusRegion, index: usize);
    fn show_screen(&mut self, screen: FocusRegion);
    fn set_sidebar_expanded(&mut self, expanded: bool);
    fn set_sidebar_visible(&mut self, visible: bool);
    fn blur(&mut self);
    fn render_profile(&mut self, view: &ProfileView);
}

pub struct Shell<S: FocusSurface> {
    router: Router,
    profile: Profile,
    player: Box<dyn Player>,
    continuity: Arc<dyn ContinuityLayer>,
    surface: S,
    sleeper: Arc<dyn Sleeper>,
    events: mpsc::UnboundedSender<AppEvent>,
    exit: bool,
}

impl<S: FocusSurface> Shell<S> {
    /// Build a shell with a headless player and a loopback continuity layer.
    /// `events` must be the sender side of the channel later passed to
    /// [`Shell::run`] (or drained into [`Shell::handle_event`]).
    pub fn new(router: Router, profile: Profile, surface: S, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let mut shell = Self {
            router,
            profile,
            player: Box::new(HeadlessPlayer::new()),
            continuity: Arc::new(LoopbackContinuity::default()),
            surface,
            sleeper: Arc::new(TokioSleeper),
            events,
            exit: false,
        };
        shell.render_initial();
        shell
    }

    pub fn with_player(mut self, player: Box<dyn Player>) -> Self {
        self.player = player;
        self
    }

    pub fn with_continuity(mut self, continuity: Arc<dyn ContinuityLayer>) -> Self {
        self.continuity = continuity;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn player(&self) -> &dyn Player {
        self.player.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn should_exit(&self) -> bool {
        self.exit
    }

    /// Drain events until exit is requested or every sender is gone
    pub async fn run(&mut self, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        while !self.exit {
            match rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(intent) => {
                let flags = ProfileFlags {
                    signed_in: self.profile.is_signed_in(),
                    sign_in_in_progress: self.profile.is_in_progress(),
                };
                let commands = self.router.handle(intent, flags);
                debug!(?intent, region = ?self.router.state().active_region(), ?commands, "Routed");
                self.apply(commands);
            }
            AppEvent::Profile(ProfileEvent::SignIn(id, event)) => {
                let released = self.profile.apply_sign_in_event(id, event);
                self.refresh_profile();
                if let Some(video) = released {
                    self.play_deeplink(video);
                }
            }
            AppEvent::Profile(ProfileEvent::SignedOut(result)) => {
                self.profile.finish_sign_out(result);
                self.refresh_profile();
            }
            AppEvent::Deeplink(wire) => {
                let video = from_wire_video(wire);
                match self.profile.defer_deeplink(video) {
                    Ok(()) => info!("Sign-in in progress; deeplink deferred"),
                    Err(video) => self.play_deeplink(video),
                }
            }
            AppEvent::SignInRequested { request, status_tx } => {
                if self.profile.start_sign_in(request, status_tx) {
                    self.refresh_profile();
                }
            }
            AppEvent::SidebarFocusReady(generation) => {
                let commands = self.router.sidebar_focus_ready(generation);
                self.apply(commands);
            }
            AppEvent::Quit => self.exit = true,
        }
    }

    fn render_initial(&mut self) {
        let state = self.router.state();
        let (screen, index) = (state.active_screen(), state.grid_focus_index());
        self.surface.show_screen(screen);
        self.surface.set_sidebar_visible(true);
        self.surface.set_sidebar_expanded(false);
        self.surface.set_focus(screen, index);
        self.refresh_profile();
    }

    fn refresh_profile(&mut self) {
        let view = self.profile.view();
        self.surface.render_profile(&view);
    }

    fn play_deeplink(&mut self, video: Video) {
        info!(title = %video.title, start_ms = ?video.start_position_ms, "Playing deeplink");
        let commands = self.router.activate_deeplink(video);
        self.apply(commands);
    }

    fn apply(&mut self, commands: Vec<Command>) {
        let mut released = None;

        for command in commands {
            match command {
                Command::FocusGrid(index) => self.surface.set_focus(FocusRegion::Grid, index),
                Command::FocusSidebar(index) => self.surface.set_focus(FocusRegion::Sidebar, index),
                Command::FocusSidebarLater {
                    index,
                    delay,
                    generation,
                } => {
                    debug!(index, generation, "Arming sidebar focus");
                    let sleeper = self.sleeper.clone();
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        sleeper.sleep(delay).await;
                        if events.send(AppEvent::SidebarFocusReady(generation)).is_err() {
                            debug!(generation, "Event channel closed; dropping sidebar focus");
                        }
                    });
                }
                Command::FocusProfile => self.surface.set_focus(FocusRegion::Profile, 0),
                Command::Blur => self.surface.blur(),
                Command::ExpandSidebar => self.surface.set_sidebar_expanded(true),
                Command::CollapseSidebar => self.surface.set_sidebar_expanded(false),
                Command::SetSidebarVisible(visible) => self.surface.set_sidebar_visible(visible),
                Command::ShowScreen(screen) => self.surface.show_screen(screen),
                Command::LoadVideo(video) => {
                    if let Err(e) = self.player.load(&video.source()) {
                        error!(error = %e, title = %video.title, "Failed to load video");
                    }
                    self.continuity.update_video_info(&to_wire_video(&video));
                }
                Command::Seek(delta) => {
                    if let Err(e) = self.player.seek(delta) {
                        warn!(error = %e, "Seek failed");
                    }
                }
                Command::TogglePlayPause => {
                    if let Err(e) = self.player.toggle_play_pause() {
                        warn!(error = %e, "Play/pause failed");
                    }
                }
                Command::UnloadPlayer => self.player.unload(),
                Command::NotifyStopVideo => self.continuity.stop_video(),
                Command::CancelSignIn => released = self.profile.cancel_sign_in(),
                Command::SignOut => {
                    self.profile.sign_out();
                }
                Command::RenderProfile => self.refresh_profile(),
                Command::Exit => {
                    info!("Exit requested");
                    self.exit = true;
                }
            }
        }

        if let Some(video) = released {
            self.play_deeplink(video);
        }
    }
}

impl<S: FocusSurface> std::fmt::Debug for Shell<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("router", &self.router)
            .field("profile", &self.profile)
            .field("exit", &self.exit)
            .finish()
    }
}
