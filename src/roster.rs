use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::api;
use crate::credentials::CredentialStore;
use crate::directory::SessionObserver;
use crate::error::VoteError;
use crate::models::{Participant, SessionId, UserId, VotingSession};

struct Roster {
    session_id: SessionId,
    participants: Vec<Participant>,
    eligible: BTreeSet<UserId>,
}

/// Participants of one session and the subset the current user may score.
pub struct ParticipantRoster {
    credentials: Arc<CredentialStore>,
    roster: Mutex<Option<Roster>>,
    issued: AtomicU64,
}

impl ParticipantRoster {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            credentials,
            roster: Mutex::new(None),
            issued: AtomicU64::new(0),
        }
    }

    /// Loads the roster of `session_id`, replacing whatever was held before,
    /// and returns the eligible targets. An empty result is not an error.
    pub async fn fetch_for(
        &self,
        session_id: SessionId,
        current_user: UserId,
    ) -> Result<Vec<Participant>, VoteError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let participants = api::participants::get_participants(&self.credentials, session_id).await?;

        let mut roster = self.roster.lock();
        if self.issued.load(Ordering::SeqCst) != ticket {
            debug!("Discarding superseded roster fetch for session {}", session_id);
            return Err(VoteError::Superseded);
        }

        let targets = eligible_targets(&participants, current_user);
        info!(
            "Session {}: {} participants, {} eligible targets",
            session_id,
            participants.len(),
            targets.len()
        );
        *roster = Some(Roster {
            session_id,
            eligible: targets.iter().map(|p| p.user_id).collect(),
            participants,
        });
        Ok(targets)
    }

    /// Forgets the roster and discards any fetch still in flight.
    pub fn invalidate(&self) {
        let mut roster = self.roster.lock();
        self.issued.fetch_add(1, Ordering::SeqCst);
        if let Some(old) = roster.take() {
            debug!("Roster for session {} invalidated", old.session_id);
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.roster.lock().as_ref().map(|r| r.session_id)
    }

    pub fn eligible_count(&self) -> usize {
        self.roster.lock().as_ref().map_or(0, |r| r.eligible.len())
    }

    pub fn participant(&self, user_id: UserId) -> Option<Participant> {
        self.roster
            .lock()
            .as_ref()
            .and_then(|r| r.participants.iter().find(|p| p.user_id == user_id).cloned())
    }
}

impl SessionObserver for ParticipantRoster {
    fn session_changed(&self, _previous: Option<SessionId>, _current: Option<&VotingSession>) {
        self.invalidate();
    }
}

/// Participants `current_user` must score, in roster order.
pub fn eligible_targets(participants: &[Participant], current_user: UserId) -> Vec<Participant> {
    let mut seen = BTreeSet::new();
    participants
        .iter()
        .filter(|p| p.is_eligible_target(current_user))
        .filter(|p| seen.insert(p.user_id))
        .cloned()
        .collect()
}
