//! Session lifecycle and vote moderation endpoints. Callers check the role first.

use log::{error, info};
use serde::de::IgnoredAny;
use serde_json::Value;

use super::{read_reply, unexpected, Reply};
use crate::credentials::CredentialStore;
use crate::error::VoteError;
use crate::models::admin::{
    CloseSessionRequest, CreatedSessionResponse, SessionVotesResponse, UpdateVoteRequest,
};
use crate::models::results::SessionResultsResponse;
use crate::models::{
    AdminVote, NewParticipant, NewSession, ParticipantUpdate, SessionId, SessionResult,
    SessionStats, VotingSession,
};

async fn acknowledged(
    store: &CredentialStore,
    request: reqwest::Request,
    action: &str,
) -> Result<(), VoteError> {
    let resp = store.execute(request).await?;
    match read_reply::<IgnoredAny>(resp).await? {
        Reply::Success(_) => {
            info!("{} succeeded", action);
            Ok(())
        }
        Reply::Failure { status, message } => {
            error!("{} failed: {} {}", action, status, message);
            Err(unexpected(status, message))
        }
    }
}

pub async fn create_session(
    store: &CredentialStore,
    session: &NewSession,
) -> Result<VotingSession, VoteError> {
    let url = store.api().url("/sessions");
    let request = store.api().http().post(&url).json(session).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<CreatedSessionResponse>(resp).await? {
        Reply::Success(CreatedSessionResponse {
            session: Some(created),
        }) => {
            info!("Created session {}", created.session_id);
            Ok(created)
        }
        Reply::Success(_) => Err(VoteError::Decode("create response without session".into())),
        Reply::Failure { status, message } => {
            error!("Failed to create session: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}

pub async fn close_session(
    store: &CredentialStore,
    session_id: SessionId,
    forced: bool,
) -> Result<(), VoteError> {
    let url = store.api().url(&format!("/sessions/{}/close", session_id));
    let request = store
        .api()
        .http()
        .post(&url)
        .json(&CloseSessionRequest { forced })
        .build()?;
    acknowledged(store, request, &format!("Closing session {}", session_id)).await
}

pub async fn reopen_session(store: &CredentialStore, session_id: SessionId) -> Result<(), VoteError> {
    let url = store.api().url(&format!("/sessions/{}/reopen", session_id));
    let request = store.api().http().post(&url).build()?;
    acknowledged(store, request, &format!("Reopening session {}", session_id)).await
}

pub async fn get_session_stats(
    store: &CredentialStore,
    session_id: SessionId,
) -> Result<SessionStats, VoteError> {
    let url = store.api().url(&format!("/admin/sessions/{}/stats", session_id));
    let request = store.api().http().get(&url).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<Value>(resp).await? {
        Reply::Success(value) => {
            // Some deployments nest the counters under "stats".
            let stats = value.get("stats").cloned().unwrap_or(value);
            serde_json::from_value(stats).map_err(|e| VoteError::Decode(e.to_string()))
        }
        Reply::Failure { status, message } => {
            error!("Failed to get session stats: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}

pub async fn add_participants(
    store: &CredentialStore,
    session_id: SessionId,
    participants: &[NewParticipant],
) -> Result<(), VoteError> {
    let url = store
        .api()
        .url(&format!("/admin/sessions/{}/participants", session_id));
    let request = store.api().http().post(&url).json(participants).build()?;
    acknowledged(
        store,
        request,
        &format!("Adding {} participants to session {}", participants.len(), session_id),
    )
    .await
}

pub async fn update_participant(
    store: &CredentialStore,
    session_id: SessionId,
    participant_id: i64,
    update: &ParticipantUpdate,
) -> Result<(), VoteError> {
    let url = store.api().url(&format!(
        "/admin/sessions/{}/participants/{}",
        session_id, participant_id
    ));
    let request = store.api().http().patch(&url).json(update).build()?;
    acknowledged(
        store,
        request,
        &format!("Updating participant {} of session {}", participant_id, session_id),
    )
    .await
}

pub async fn get_session_votes(
    store: &CredentialStore,
    session_id: SessionId,
) -> Result<Vec<AdminVote>, VoteError> {
    let url = store.api().url(&format!("/admin/sessions/{}/votes", session_id));
    let request = store.api().http().get(&url).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<SessionVotesResponse>(resp).await? {
        Reply::Success(response) => {
            info!(
                "Received {} votes for session {}",
                response.votes.len(),
                session_id
            );
            Ok(response.votes)
        }
        Reply::Failure { status, message } => {
            error!("Failed to get session votes: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}

pub async fn update_vote(
    store: &CredentialStore,
    vote_id: i64,
    new_score: u8,
    reason: &str,
) -> Result<(), VoteError> {
    let url = store.api().url(&format!("/admin/votes/{}", vote_id));
    let request = store
        .api()
        .http()
        .patch(&url)
        .json(&UpdateVoteRequest { new_score, reason })
        .build()?;
    acknowledged(store, request, &format!("Updating vote {}", vote_id)).await
}

pub async fn delete_vote(store: &CredentialStore, vote_id: i64) -> Result<(), VoteError> {
    let url = store.api().url(&format!("/admin/votes/{}", vote_id));
    let request = store.api().http().delete(&url).build()?;
    acknowledged(store, request, &format!("Deleting vote {}", vote_id)).await
}

pub async fn recalculate_results(
    store: &CredentialStore,
    session_id: SessionId,
) -> Result<Vec<SessionResult>, VoteError> {
    let url = store
        .api()
        .url(&format!("/admin/sessions/{}/recalculate", session_id));
    let request = store.api().http().post(&url).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<SessionResultsResponse>(resp).await? {
        Reply::Success(response) => {
            info!("Recalculated results for session {}", session_id);
            Ok(response.results)
        }
        Reply::Failure { status, message } => {
            error!("Failed to recalculate results: {} {}", status, message);
            Err(unexpected(status, message))
        }
    }
}
