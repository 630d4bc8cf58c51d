use log::{debug, error, info, warn};
use reqwest::header::AUTHORIZATION;
use serde::de::IgnoredAny;

use super::{read_reply, ApiClient, Reply};
use crate::error::VoteError;
use crate::models::auth::{RefreshResponse, TelegramAuthRequest, TelegramAuthResponse};
use crate::models::Profile;

/// Exchanges Telegram `init_data` for a token and profile.
pub async fn telegram_login(api: &ApiClient, init_data: &str) -> Result<(String, Profile), VoteError> {
    debug!("Exchanging identity proof ({} bytes)", init_data.len());
    let url = api.url("/auth/telegram");
    let request = TelegramAuthRequest { init_data };
    let resp = api
        .http()
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| VoteError::AuthUnavailable(e.to_string()))?;

    let reply = read_reply::<TelegramAuthResponse>(resp)
        .await
        .map_err(|e| match e {
            VoteError::Network(msg) => VoteError::AuthUnavailable(msg),
            other => VoteError::AuthRejected(other.to_string()),
        })?;

    match reply {
        Reply::Success(TelegramAuthResponse {
            token: Some(token),
            user: Some(user),
        }) if !token.is_empty() => {
            info!("Authenticated as user {}", user.id);
            Ok((token, user))
        }
        Reply::Success(_) => {
            error!("Login response is missing token or user");
            Err(VoteError::AuthRejected("incomplete login response".into()))
        }
        Reply::Failure { status, message } if status.is_server_error() => {
            error!("Login failed, server unavailable: {} {}", status, message);
            Err(VoteError::AuthUnavailable(message))
        }
        Reply::Failure { status, message } => {
            error!("Login rejected: {} {}", status, message);
            Err(VoteError::AuthRejected(message))
        }
    }
}

/// Asks for a new token using the current one. Never goes through refresh itself.
pub async fn refresh_token(api: &ApiClient, token: &str) -> Result<String, VoteError> {
    let url = api.url("/auth/refresh");
    let resp = api
        .http()
        .post(&url)
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .send()
        .await?;

    match read_reply::<RefreshResponse>(resp).await? {
        Reply::Success(RefreshResponse { token: Some(token) }) if !token.is_empty() => {
            info!("Access token refreshed");
            Ok(token)
        }
        Reply::Success(_) => Err(VoteError::Decode("refresh response without token".into())),
        Reply::Failure { status, message } => {
            warn!("Token refresh refused: {} {}", status, message);
            Err(VoteError::SessionExpired)
        }
    }
}

pub async fn logout(api: &ApiClient, token: &str) -> Result<(), VoteError> {
    let url = api.url("/auth/logout");
    let resp = api
        .http()
        .post(&url)
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .send()
        .await?;

    match read_reply::<IgnoredAny>(resp).await? {
        Reply::Success(_) => {
            debug!("Server acknowledged logout");
            Ok(())
        }
        Reply::Failure { status, message } => Err(super::unexpected(status, message)),
    }
}
