use log::{error, info};

use super::{read_reply, unexpected, Reply};
use crate::credentials::CredentialStore;
use crate::error::VoteError;
use crate::models::results::{MyResults, SessionResultsResponse};
use crate::models::{SessionId, SessionResult};

pub async fn get_my_results(store: &CredentialStore) -> Result<MyResults, VoteError> {
    let url = store.api().url("/results/me");
    let request = store.api().http().get(&url).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<MyResults>(resp).await? {
        Reply::Success(results) => {
            info!("Received {} personal results", results.results.len());
            Ok(results)
        }
        Reply::Failure { status, message } => {
            error!("Failed to get personal results: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}

pub async fn get_session_results(
    store: &CredentialStore,
    session_id: SessionId,
) -> Result<Vec<SessionResult>, VoteError> {
    let url = store.api().url(&format!("/results/session/{}", session_id));
    let request = store.api().http().get(&url).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<SessionResultsResponse>(resp).await? {
        Reply::Success(response) => {
            info!("Received results for session {}", session_id);
            Ok(response.results)
        }
        Reply::Failure { status, message } => {
            error!("Failed to get session results: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}
