use log::{error, info};

use super::{read_reply, Reply};
use crate::credentials::CredentialStore;
use crate::error::VoteError;
use crate::models::participant::ParticipantsResponse;
use crate::models::{Participant, SessionId};

/// Loads every participant of a session. Failures other than an expired
/// credential surface as [`VoteError::RosterUnavailable`].
pub async fn get_participants(
    store: &CredentialStore,
    session_id: SessionId,
) -> Result<Vec<Participant>, VoteError> {
    let url = store.api().url(&format!("/sessions/{}/participants", session_id));
    let result = async {
        let request = store.api().http().get(&url).build()?;
        let resp = store.execute(request).await?;
        read_reply::<ParticipantsResponse>(resp).await
    }
    .await;

    match result {
        Ok(Reply::Success(response)) => {
            info!(
                "Received {} participants for session {}",
                response.participants.len(),
                session_id
            );
            Ok(response.participants)
        }
        Ok(Reply::Failure { status, message }) => {
            error!("Failed to get participants: {} {}", status, message);
            Err(VoteError::RosterUnavailable(message))
        }
        Err(VoteError::SessionExpired) => Err(VoteError::SessionExpired),
        Err(e) => {
            error!("Failed to get participants: {}", e);
            Err(VoteError::RosterUnavailable(e.to_string()))
        }
    }
}
