//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the appropriate backend services.
//! Each handler takes CLI args, the loaded Config and Output, returns ExitCode.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::{AccountStatus, ConvertCmd, ExitCode, Output, SigninCmd, StatusOk};
use crate::config::Config;
use crate::continuity::to_wire_video;
use crate::models::{catalog, SignInInfo, SignInRequest, SignInStatus};
use crate::profile::{Profile, ProfileEvent, ProfileNotifier};
use crate::signin::{SignInError, SignInPoller};
use crate::sleep::TokioSleeper;
use crate::storage::{CredentialStore, FileStore};

/// Open the profile backed by the on-disk credential store
pub fn open_profile(config: &mut Config, notify: ProfileNotifier) -> anyhow::Result<Profile> {
    let store = FileStore::open_default()?;
    let poller = SignInPoller::new(
        Arc::new(config.sso_client()),
        Arc::new(TokioSleeper),
        config.poller_settings(),
    );
    Ok(Profile::new(Box::new(store), poller, notify))
}

fn channel_notifier() -> (ProfileNotifier, mpsc::UnboundedReceiver<ProfileEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let notify: ProfileNotifier = Arc::new(move |event| {
        if tx.send(event).is_err() {
            debug!("Command finished; dropping profile event");
        }
    });
    (notify, rx)
}

// =============================================================================
// Media Command
// =============================================================================

pub async fn media_cmd(output: &Output) -> ExitCode {
    let media = catalog();

    if output.json {
        if let Err(e) = output.print(&media) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        for video in &media {
            output.line(format!("{:<20} {}", video.stream_id, video));
        }
    }
    ExitCode::Success
}

// =============================================================================
// Status Command
// =============================================================================

pub async fn status_cmd(config: &mut Config, output: &Output) -> ExitCode {
    let credentials = FileStore::open_default().ok().and_then(|store| store.load());
    let status = AccountStatus {
        signed_in: credentials.is_some(),
        email: credentials.map(|c| c.email),
        device_id: config.get_device_id(),
    };

    if output.json {
        if let Err(e) = output.print(&status) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
    } else {
        match &status.email {
            Some(email) => output.line(format!("Signed in as {}", email)),
            None => output.line("Not signed in"),
        }
    }
    ExitCode::Success
}

// =============================================================================
// Sign-in Command
// =============================================================================

pub async fn signin_cmd(cmd: SigninCmd, config: &mut Config, output: &Output) -> ExitCode {
    let (notify, mut events) = channel_notifier();
    let mut profile = match open_profile(config, notify) {
        Ok(profile) => profile,
        Err(e) => return output.error(format!("Failed to open profile: {}", e), ExitCode::Error),
    };

    if let Some(email) = profile.email() {
        output.info(format!("Already signed in as {}", email));
        return ExitCode::Success;
    }

    let (status_tx, mut statuses) = mpsc::unbounded_channel();
    let request = SignInRequest::new(SignInInfo {
        sign_in_type: cmd.sign_in_type,
        is_signed_in: cmd.mobile_signed_in,
    });
    if !profile.start_sign_in(request, status_tx) {
        return output.error("Could not start sign-in", ExitCode::Error);
    }
    output.info("Requesting registration code...");

    loop {
        tokio::select! {
            Some(ProfileEvent::SignIn(id, event)) = events.recv() => {
                profile.apply_sign_in_event(id, event);
            }
            Some(status) = statuses.recv() => {
                match status {
                    SignInStatus::Progress { reg_code, .. } => {
                        if let Some(reg_code) = code_to_show(reg_code, cmd.mobile_signed_in) {
                            if output.json {
                                let _ = output.print(serde_json::json!({ "reg_code": reg_code }));
                            } else {
                                output.line(format!("Enter code {} on your phone", reg_code));
                            }
                        }
                        output.info("Waiting for sign-in (Ctrl-C to cancel)...");
                    }
                    SignInStatus::Success { email, .. } => {
                        if output.json {
                            let _ = output.print(serde_json::json!({ "email": email }));
                        } else {
                            output.line(format!("Signed in as {}", email));
                        }
                        return ExitCode::Success;
                    }
                    SignInStatus::Failure { reason, is_user_cancelled: true, .. } => {
                        return output.error(reason, ExitCode::Cancelled);
                    }
                    SignInStatus::Failure { reason, .. } => {
                        let code = match profile.session().last_error() {
                            Some(SignInError::Network(_)) => ExitCode::NetworkError,
                            _ => ExitCode::SignInFailed,
                        };
                        return output.error(reason, code);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                profile.cancel_sign_in();
            }
            else => return output.error("Sign-in ended unexpectedly", ExitCode::Error),
        }
    }
}

/// The registration code is only shown when the phone is not signed in yet
fn code_to_show(reg_code: String, mobile_signed_in: bool) -> Option<String> {
    (!mobile_signed_in).then_some(reg_code)
}

// =============================================================================
// Sign-out Command
// =============================================================================

pub async fn signout_cmd(config: &mut Config, output: &Output) -> ExitCode {
    let (notify, mut events) = channel_notifier();
    let mut profile = match open_profile(config, notify) {
        Ok(profile) => profile,
        Err(e) => return output.error(format!("Failed to open profile: {}", e), ExitCode::Error),
    };

    if !profile.sign_out() {
        return output.error("Not signed in", ExitCode::NotSignedIn);
    }
    output.info("Signing out...");

    while let Some(event) = events.recv().await {
        if let ProfileEvent::SignedOut(result) = event {
            let failed = result.as_ref().err().map(|e| e.to_string());
            profile.finish_sign_out(result);
            return match failed {
                None => {
                    if output.json {
                        let _ = output.print(StatusOk::default());
                    } else {
                        output.line("Signed out");
                    }
                    ExitCode::Success
                }
                Some(e) => output.error(format!("Sign-out failed: {}", e), ExitCode::NetworkError),
            };
        }
    }
    output.error("Sign-out ended unexpectedly", ExitCode::Error)
}

// =============================================================================
// Convert Command
// =============================================================================

pub async fn convert_cmd(cmd: ConvertCmd, output: &Output) -> ExitCode {
    let Some(mut video) = catalog().into_iter().find(|v| v.stream_id == cmd.stream_id) else {
        return output.error(format!("No catalog entry '{}'", cmd.stream_id), ExitCode::NotFound);
    };
    if let Some(ms) = cmd.start_ms {
        video = video.with_start_position(ms);
    }

    if let Err(e) = output.print(to_wire_video(&video)) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}
