use log::{error, info, warn};
use reqwest::StatusCode;
use serde::de::IgnoredAny;

use super::{read_reply, unexpected, Reply};
use crate::credentials::CredentialStore;
use crate::error::VoteError;
use crate::models::vote::SubmitVotesRequest;

/// Posts a complete vote set. Sent exactly once; never retried here.
pub async fn submit_votes(
    store: &CredentialStore,
    request: &SubmitVotesRequest,
) -> Result<(), VoteError> {
    let url = store.api().url("/votes");
    let http_request = store.api().http().post(&url).json(request).build()?;
    let resp = store.execute(http_request).await?;

    match read_reply::<IgnoredAny>(resp).await? {
        Reply::Success(_) => {
            info!(
                "Submitted {} votes for session {}",
                request.votes.len(),
                request.session_id
            );
            Ok(())
        }
        Reply::Failure { status, .. } if status == StatusCode::CONFLICT => {
            warn!("Votes for session {} were already submitted", request.session_id);
            Err(VoteError::AlreadySubmitted(request.session_id))
        }
        Reply::Failure { status, message }
            if status.is_success()
                || status == StatusCode::UNPROCESSABLE_ENTITY
                || status == StatusCode::BAD_REQUEST =>
        {
            error!("Votes rejected: {} {}", status, message);
            Err(VoteError::SubmissionRejected(message))
        }
        Reply::Failure { status, message } => {
            error!("Failed to submit votes: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}
