//! Composition root wiring the components together.

use std::sync::Arc;

use chrono::Local;
use futures_util::future;
use log::{info, warn};

use crate::admin::SessionAdmin;
use crate::api::{self, ApiClient};
use crate::ballot::VoteBallot;
use crate::cache::TokenCache;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::directory::SessionDirectory;
use crate::error::VoteError;
use crate::models::results::MyResults;
use crate::models::{
    Participant, Permission, Profile, SessionId, SessionResult, UserId, VotingSession,
};
use crate::roster::ParticipantRoster;
use crate::status::VotingStatus;

pub struct VotingClient {
    credentials: Arc<CredentialStore>,
    directory: Arc<SessionDirectory>,
    roster: Arc<ParticipantRoster>,
    ballot: Arc<VoteBallot>,
}

impl VotingClient {
    pub fn new(config: &Config) -> Result<Self, VoteError> {
        let api = ApiClient::new(&config.api)?;
        let cache = config.cache.token_path.clone().map(TokenCache::new);
        let credentials = Arc::new(CredentialStore::new(api, cache));
        let roster = Arc::new(ParticipantRoster::new(credentials.clone()));
        let ballot = Arc::new(VoteBallot::new());
        let directory = Arc::new(
            SessionDirectory::new(credentials.clone())
                .with_observer(roster.clone())
                .with_observer(ballot.clone()),
        );

        Ok(Self {
            credentials,
            directory,
            roster,
            ballot,
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn roster(&self) -> &ParticipantRoster {
        &self.roster
    }

    pub fn ballot(&self) -> &VoteBallot {
        &self.ballot
    }

    /// Signs in. Signing in as someone else drops everything scoped to the
    /// previous user.
    pub async fn authenticate(&self, init_data: &str) -> Result<Profile, VoteError> {
        let previous = self.credentials.profile().map(|user| user.id);
        let user = self
            .credentials
            .authenticate(init_data)
            .await
            .map_err(|e| self.on_error(e))?;
        if previous.is_some_and(|id| id != user.id) {
            info!("Signed in as a different user, dropping session state");
            self.directory.invalidate();
        }
        Ok(user)
    }

    pub async fn restore(&self) -> Result<bool, VoteError> {
        self.credentials.restore().await
    }

    /// Logs out and forgets all session-scoped state.
    pub fn logout(&self) {
        self.credentials.logout();
        self.directory.invalidate();
    }

    /// Re-reads the current session and, if it is active, its roster and the
    /// caller's own votes.
    ///
    /// The ballot is (re)scoped to the eligible targets of the fetched session.
    /// Votes already cast in it mark the session as voted.
    pub async fn refresh(&self) -> Result<Option<VotingSession>, VoteError> {
        let session = match self.directory.fetch_current().await {
            Ok(session) => session,
            Err(e) => return Err(self.on_error(e)),
        };

        let Some(active) = session.as_ref().filter(|s| s.active) else {
            return Ok(session);
        };
        let user = self.credentials.profile().ok_or(VoteError::SessionExpired)?;

        let (targets, mine) = future::join(
            self.roster.fetch_for(active.session_id, user.id),
            api::results::get_my_results(&self.credentials),
        )
        .await;
        let targets = match targets {
            Ok(targets) => targets,
            Err(e) => return Err(self.on_error(e)),
        };
        let already_voted = match mine {
            Ok(mine) => mine.has_voted_in(active.session_id),
            Err(VoteError::SessionExpired) => return Err(self.on_error(VoteError::SessionExpired)),
            Err(e) => {
                warn!("Could not load own votes: {}", e);
                false
            }
        };
        if self.directory.current_id() != Some(active.session_id) {
            return Err(VoteError::Superseded);
        }
        if already_voted {
            self.directory.mark_voted(active.session_id);
        }
        self.ballot
            .open(active.session_id, targets.iter().map(|p| p.user_id));
        info!(
            "Ready to vote in session {}: {} targets",
            active.session_id,
            targets.len()
        );
        Ok(session)
    }

    pub fn set_score(&self, user_id: UserId, score: i64) -> Result<(), VoteError> {
        self.ballot.set_score(user_id, score)
    }

    pub async fn submit(&self) -> Result<(), VoteError> {
        self.credentials.require(Permission::VoteSubmit)?;
        self.ballot
            .submit(&self.credentials, &self.directory)
            .await
            .map_err(|e| self.on_error(e))
    }

    pub fn status(&self) -> VotingStatus {
        let session = self.directory.current();
        VotingStatus::compute(
            session.as_ref(),
            self.directory.has_voted(),
            self.ballot.snapshot(),
            Local::now().naive_local(),
        )
    }

    pub fn participant(&self, user_id: UserId) -> Option<Participant> {
        self.roster.participant(user_id)
    }

    pub fn score_for(&self, user_id: UserId) -> Option<u8> {
        self.ballot.score(user_id)
    }

    pub async fn my_results(&self) -> Result<MyResults, VoteError> {
        self.credentials.require(Permission::ResultsView)?;
        api::results::get_my_results(&self.credentials)
            .await
            .map_err(|e| self.on_error(e))
    }

    /// Results of every participant of a session. Admin only.
    pub async fn session_results(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<SessionResult>, VoteError> {
        self.admin()
            .session_results(session_id)
            .await
            .map_err(|e| self.on_error(e))
    }

    /// Administrator operations. Each call fails with
    /// [`VoteError::Forbidden`] unless the signed-in role allows it.
    pub fn admin(&self) -> SessionAdmin<'_> {
        SessionAdmin::new(&self.credentials, &self.directory)
    }

    fn on_error(&self, e: VoteError) -> VoteError {
        if e.is_fatal_to_session() {
            warn!("Credential lost, dropping session state");
            self.directory.invalidate();
        }
        e
    }
}
