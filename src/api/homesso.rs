//! Registration-code sign-in endpoints
//!
//! Typed wrappers over the three account endpoints the TV uses:
//! request a code, poll for completion, and sign out.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::http::{HttpError, RequestClient, RequestOptions};

/// Default account service
pub const DEFAULT_BASE_URL: &str = "https://homesso.vizbee.tv";

const REGCODE_ENDPOINT: &str = "/v1/accountregcode";
const POLL_ENDPOINT: &str = "/v1/accountregcode/poll";
const SIGNOUT_ENDPOINT: &str = "/v1/signout";

const CALL_TIMEOUT: Duration = Duration::from_secs(5);
const REGCODE_RETRIES: u32 = 10;
const POLL_RETRIES: u32 = 10;
const SIGNOUT_RETRIES: u32 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegCodeRequest<'a> {
    device_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PollRequest<'a> {
    device_id: &'a str,
    reg_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegCodeResponse {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollResponseRaw {
    #[serde(default)]
    status: Option<String>,
    email: Option<String>,
    auth_token: Option<String>,
}

/// Outcome of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The companion device has not finished yet
    Pending,
    /// Sign-in finished with these credentials
    Done { email: String, auth_token: String },
}

/// Client for the account registration-code service
pub struct HomeSsoClient {
    http: RequestClient,
    device_id: String,
}

impl HomeSsoClient {
    /// Create a client against the default account service
    pub fn new(device_id: impl Into<String>) -> Self {
        Self::with_client(RequestClient::new(DEFAULT_BASE_URL), device_id)
    }

    /// Create a client over an existing request client (custom base URL or transport)
    pub fn with_client(http: RequestClient, device_id: impl Into<String>) -> Self {
        Self {
            http,
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Ask for a registration code to show on screen
    pub async fn request_reg_code(&self) -> Result<String, HttpError> {
        self.request_reg_code_until(&CancellationToken::new()).await
    }

    /// [`request_reg_code`](Self::request_reg_code) that stops retrying once `cancel` fires
    pub async fn request_reg_code_until(&self, cancel: &CancellationToken) -> Result<String, HttpError> {
        let body = RegCodeRequest {
            device_id: &self.device_id,
        };
        let options = RequestOptions::new()
            .timeout(CALL_TIMEOUT)
            .retries(REGCODE_RETRIES)
            .cancel_on(cancel);

        let response: RegCodeResponse = self.http.post(REGCODE_ENDPOINT, &body, options).await?.json()?;

        response
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| HttpError::Protocol("registration code missing from response".into()))
    }

    /// Check whether the code has been redeemed
    pub async fn poll(&self, reg_code: &str) -> Result<PollOutcome, HttpError> {
        self.poll_until(reg_code, &CancellationToken::new()).await
    }

    /// [`poll`](Self::poll) that stops retrying once `cancel` fires
    pub async fn poll_until(&self, reg_code: &str, cancel: &CancellationToken) -> Result<PollOutcome, HttpError> {
        let body = PollRequest {
            device_id: &self.device_id,
            reg_code,
        };
        let options = RequestOptions::new()
            .timeout(CALL_TIMEOUT)
            .retries(POLL_RETRIES)
            .cancel_on(cancel);

        let response: PollResponseRaw = self.http.post(POLL_ENDPOINT, &body, options).await?.json()?;

        if response.status.as_deref() != Some("done") {
            return Ok(PollOutcome::Pending);
        }

        match (response.email, response.auth_token) {
            (Some(email), Some(auth_token)) => Ok(PollOutcome::Done { email, auth_token }),
            _ => Err(HttpError::Protocol(
                "sign-in reported done without credentials".into(),
            )),
        }
    }

    /// Invalidate `auth_token` on the server
    pub async fn sign_out(&self, auth_token: &str) -> Result<(), HttpError> {
        let options = RequestOptions::new()
            .timeout(CALL_TIMEOUT)
            .retries(SIGNOUT_RETRIES)
            .header("Authorization", auth_token);

        self.http
            .post(SIGNOUT_ENDPOINT, &serde_json::json!({}), options)
            .await?;
        Ok(())
    }
}
