use log::{error, info};
use reqwest::StatusCode;

use super::{read_reply, unexpected, Reply};
use crate::credentials::CredentialStore;
use crate::error::VoteError;
use crate::models::session::CurrentSessionResponse;
use crate::models::VotingSession;

/// Fetches the active session. `None` when the server has no active session.
pub async fn get_current_session(
    store: &CredentialStore,
) -> Result<Option<VotingSession>, VoteError> {
    let url = store.api().url("/sessions/current");
    let request = store.api().http().get(&url).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<CurrentSessionResponse>(resp).await? {
        Reply::Success(response) => {
            let session = response.into_session();
            match &session {
                Some(s) => info!("Current session {} (active: {})", s.session_id, s.active),
                None => info!("No current session"),
            }
            Ok(session)
        }
        Reply::Failure { status, .. } if status == StatusCode::NOT_FOUND => {
            info!("No active session");
            Ok(None)
        }
        Reply::Failure { status, message } => {
            error!("Failed to get current session: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}
