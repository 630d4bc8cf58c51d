//! Administrator operations: session lifecycle, participants, and vote moderation.

use log::info;

use crate::api;
use crate::ballot::{MAX_SCORE, MIN_SCORE};
use crate::credentials::CredentialStore;
use crate::directory::SessionDirectory;
use crate::error::VoteError;
use crate::models::{
    AdminVote, NewParticipant, NewSession, ParticipantUpdate, Permission, SessionId,
    SessionResult, SessionStats, VotingSession,
};

/// Borrowed view over the client for administrators. Every call checks the
/// caller's role before anything is sent.
pub struct SessionAdmin<'a> {
    credentials: &'a CredentialStore,
    directory: &'a SessionDirectory,
}

impl<'a> SessionAdmin<'a> {
    pub(crate) fn new(credentials: &'a CredentialStore, directory: &'a SessionDirectory) -> Self {
        Self {
            credentials,
            directory,
        }
    }

    /// Opens a new round. The cached current session is dropped so the next
    /// refresh picks it up.
    pub async fn create_session(&self, session: &NewSession) -> Result<VotingSession, VoteError> {
        self.credentials.require(Permission::SessionsManage)?;
        if session.end_date < session.start_date {
            return Err(VoteError::Config(format!(
                "session ends ({}) before it starts ({})",
                session.end_date, session.start_date
            )));
        }
        let created = api::admin::create_session(self.credentials, session).await?;
        self.directory.invalidate();
        Ok(created)
    }

    /// Closes a round; the server computes results on close.
    pub async fn close_session(&self, session_id: SessionId, forced: bool) -> Result<(), VoteError> {
        self.credentials.require(Permission::SessionsManage)?;
        api::admin::close_session(self.credentials, session_id, forced).await?;
        info!("Session {} closed", session_id);
        self.directory.invalidate();
        Ok(())
    }

    pub async fn reopen_session(&self, session_id: SessionId) -> Result<(), VoteError> {
        self.credentials.require(Permission::SessionsManage)?;
        api::admin::reopen_session(self.credentials, session_id).await?;
        info!("Session {} reopened", session_id);
        self.directory.invalidate();
        Ok(())
    }

    pub async fn session_stats(&self, session_id: SessionId) -> Result<SessionStats, VoteError> {
        self.credentials.require(Permission::SessionsManage)?;
        api::admin::get_session_stats(self.credentials, session_id).await
    }

    pub async fn add_participants(
        &self,
        session_id: SessionId,
        participants: &[NewParticipant],
    ) -> Result<(), VoteError> {
        self.credentials.require(Permission::SessionsManage)?;
        if participants.is_empty() {
            return Ok(());
        }
        api::admin::add_participants(self.credentials, session_id, participants).await
    }

    pub async fn update_participant(
        &self,
        session_id: SessionId,
        participant_id: i64,
        update: &ParticipantUpdate,
    ) -> Result<(), VoteError> {
        self.credentials.require(Permission::SessionsManage)?;
        api::admin::update_participant(self.credentials, session_id, participant_id, update).await
    }

    pub async fn session_votes(&self, session_id: SessionId) -> Result<Vec<AdminVote>, VoteError> {
        self.credentials.require(Permission::VotesManage)?;
        api::admin::get_session_votes(self.credentials, session_id).await
    }

    /// Overrides the score of a cast vote. Scores follow the ballot's range.
    pub async fn update_vote(
        &self,
        vote: &AdminVote,
        new_score: i64,
        reason: &str,
    ) -> Result<(), VoteError> {
        self.credentials.require(Permission::VotesManage)?;
        if !(MIN_SCORE..=MAX_SCORE).contains(&new_score) {
            return Err(VoteError::InvalidScore {
                user_id: vote.target_id,
                reason: format!("{} is outside {}..={}", new_score, MIN_SCORE, MAX_SCORE),
            });
        }
        api::admin::update_vote(self.credentials, vote.vote_id, new_score as u8, reason).await
    }

    pub async fn delete_vote(&self, vote_id: i64) -> Result<(), VoteError> {
        self.credentials.require(Permission::VotesManage)?;
        api::admin::delete_vote(self.credentials, vote_id).await
    }

    /// Results of every participant of a session.
    pub async fn session_results(&self, session_id: SessionId) -> Result<Vec<SessionResult>, VoteError> {
        self.credentials.require(Permission::ResultsManage)?;
        api::results::get_session_results(self.credentials, session_id).await
    }

    pub async fn recalculate_results(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionResult>, VoteError> {
        self.credentials.require(Permission::ResultsManage)?;
        api::admin::recalculate_results(self.credentials, session_id).await
    }
}
