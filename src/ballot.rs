//! The in-progress set of scores and its exactly-once submission.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::api;
use crate::credentials::CredentialStore;
use crate::directory::{SessionDirectory, SessionObserver};
use crate::error::VoteError;
use crate::models::vote::SubmitVotesRequest;
use crate::models::{SessionId, UserId, VoteEntry, VotingSession};

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 10;

#[derive(Debug, Default)]
struct BallotState {
    session_id: Option<SessionId>,
    targets: BTreeSet<UserId>,
    scores: BTreeMap<UserId, u8>,
}

/// Counts the status projection reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BallotSnapshot {
    pub session_id: Option<SessionId>,
    pub scored: usize,
    pub eligible: usize,
    pub complete: bool,
}

#[derive(Debug, Default)]
pub struct VoteBallot {
    state: Mutex<BallotState>,
    submitting: AtomicBool,
}

impl VoteBallot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes the ballot to `session_id` with the given eligible targets.
    ///
    /// Switching session starts empty; reopening the same session keeps the
    /// scores whose target is still eligible.
    pub fn open(&self, session_id: SessionId, targets: impl IntoIterator<Item = UserId>) {
        let mut state = self.state.lock();
        let targets: BTreeSet<UserId> = targets.into_iter().collect();
        if state.session_id == Some(session_id) {
            state.scores.retain(|user_id, _| targets.contains(user_id));
        } else {
            state.scores.clear();
            state.session_id = Some(session_id);
        }
        debug!("Ballot for session {} has {} targets", session_id, targets.len());
        state.targets = targets;
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.lock().session_id
    }

    pub fn set_score(&self, user_id: UserId, score: i64) -> Result<(), VoteError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(VoteError::InvalidScore {
                user_id,
                reason: format!("{} is outside {}..={}", score, MIN_SCORE, MAX_SCORE),
            });
        }
        let mut state = self.state.lock();
        if !state.targets.contains(&user_id) {
            return Err(VoteError::InvalidScore {
                user_id,
                reason: "not an eligible target".to_string(),
            });
        }
        state.scores.insert(user_id, score as u8);
        Ok(())
    }

    pub fn score(&self, user_id: UserId) -> Option<u8> {
        self.state.lock().scores.get(&user_id).copied()
    }

    pub fn scores(&self) -> Vec<VoteEntry> {
        self.state
            .lock()
            .scores
            .iter()
            .map(|(&user_id, &score)| VoteEntry { user_id, score })
            .collect()
    }

    pub fn clear(&self) {
        self.state.lock().scores.clear();
    }

    pub fn is_complete(&self) -> bool {
        let state = self.state.lock();
        state.scores.len() == state.targets.len()
            && state.scores.keys().all(|id| state.targets.contains(id))
    }

    pub fn progress(&self) -> u8 {
        let state = self.state.lock();
        progress_percent(state.scores.len(), state.targets.len())
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> BallotSnapshot {
        let state = self.state.lock();
        BallotSnapshot {
            session_id: state.session_id,
            scored: state.scores.len(),
            eligible: state.targets.len(),
            complete: state.scores.len() == state.targets.len(),
        }
    }

    /// Submits the ballot once.
    ///
    /// The session is re-fetched before posting; if it is gone, inactive or
    /// replaced, the submission fails with [`VoteError::SessionClosed`]. A
    /// failed submission is never retried here.
    pub async fn submit(
        &self,
        credentials: &CredentialStore,
        directory: &SessionDirectory,
    ) -> Result<(), VoteError> {
        let _in_flight = InFlight::acquire(&self.submitting)?;

        let (session_id, votes) = {
            let state = self.state.lock();
            let session_id = state.session_id.ok_or(VoteError::SessionClosed)?;
            if directory.current_id() == Some(session_id) && directory.has_voted() {
                return Err(VoteError::AlreadySubmitted(session_id));
            }
            let missing = state
                .targets
                .iter()
                .filter(|id| !state.scores.contains_key(id))
                .count();
            if missing > 0 {
                return Err(VoteError::IncompleteBallot { missing });
            }
            let votes: Vec<VoteEntry> = state
                .scores
                .iter()
                .map(|(&user_id, &score)| VoteEntry { user_id, score })
                .collect();
            (session_id, votes)
        };

        let latest = match directory.fetch_current().await {
            Ok(session) => session,
            // A newer fetch already replaced the cache; check against that.
            Err(VoteError::Superseded) => directory.current(),
            Err(e) => return Err(e),
        };
        match latest {
            Some(session) if session.session_id == session_id && session.active => {}
            _ => {
                warn!("Session {} is no longer open for voting", session_id);
                return Err(VoteError::SessionClosed);
            }
        }
        if directory.has_voted() {
            return Err(VoteError::AlreadySubmitted(session_id));
        }

        if votes.is_empty() {
            info!("Session {} has nobody to vote on", session_id);
        } else {
            let request = SubmitVotesRequest { session_id, votes };
            match api::votes::submit_votes(credentials, &request).await {
                Ok(()) => {}
                Err(VoteError::AlreadySubmitted(id)) => {
                    directory.mark_voted(id);
                    return Err(VoteError::AlreadySubmitted(id));
                }
                Err(e) => return Err(e),
            }
        }

        {
            let mut state = self.state.lock();
            if state.session_id == Some(session_id) {
                state.scores.clear();
            }
        }
        directory.mark_voted(session_id);
        Ok(())
    }
}

impl SessionObserver for VoteBallot {
    fn session_changed(&self, previous: Option<SessionId>, _current: Option<&VotingSession>) {
        let mut state = self.state.lock();
        if state.session_id.is_some() {
            debug!("Clearing ballot for session {:?}", previous);
        }
        *state = BallotState::default();
    }
}

/// `round(100 * scored / eligible)`, 0 when there is nothing to score.
pub fn progress_percent(scored: usize, eligible: usize) -> u8 {
    if eligible == 0 {
        return 0;
    }
    ((200 * scored + eligible) / (2 * eligible)).min(100) as u8
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, VoteError> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(VoteError::SubmissionInProgress);
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(targets: &[UserId]) -> VoteBallot {
        let ballot = VoteBallot::new();
        ballot.open(1, targets.iter().copied());
        ballot
    }

    #[test]
    fn every_valid_score_is_stored() {
        let ballot = ballot(&[7]);
        for score in MIN_SCORE..=MAX_SCORE {
            ballot.set_score(7, score).unwrap();
            assert_eq!(ballot.score(7), Some(score as u8));
        }
    }

    #[test]
    fn out_of_range_scores_leave_ballot_unchanged() {
        let ballot = ballot(&[7]);
        ballot.set_score(7, 4).unwrap();
        for score in [-1, 11, 100, i64::MIN, i64::MAX] {
            let err = ballot.set_score(7, score).unwrap_err();
            assert!(matches!(err, VoteError::InvalidScore { user_id: 7, .. }));
            assert_eq!(ballot.score(7), Some(4));
        }
    }

    #[test]
    fn non_eligible_target_is_rejected() {
        let ballot = ballot(&[1, 2]);
        ballot.set_score(1, 5).unwrap();
        ballot.set_score(2, 5).unwrap();
        assert!(ballot.is_complete());

        assert!(ballot.set_score(3, 5).is_err());
        assert!(ballot.is_complete());
        assert_eq!(ballot.score(3), None);
    }

    #[test]
    fn three_target_progress() {
        let ballot = ballot(&[10, 20, 30]);
        ballot.set_score(10, 10).unwrap();
        ballot.set_score(20, 5).unwrap();
        assert_eq!(ballot.progress(), 67);
        assert!(!ballot.is_complete());

        ballot.set_score(30, 0).unwrap();
        assert_eq!(ballot.progress(), 100);
        assert!(ballot.is_complete());
    }

    #[test]
    fn progress_never_decreases_while_scoring() {
        let targets: Vec<UserId> = (1..=7).collect();
        let ballot = ballot(&targets);
        let mut last = ballot.progress();
        for id in &targets {
            ballot.set_score(*id, 3).unwrap();
            ballot.set_score(*id, 9).unwrap();
            let now = ballot.progress();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn empty_ballot_is_vacuously_complete() {
        let ballot = ballot(&[]);
        assert_eq!(ballot.progress(), 0);
        assert!(ballot.is_complete());
    }

    #[test]
    fn clear_is_idempotent() {
        let ballot = ballot(&[1, 2]);
        ballot.set_score(1, 1).unwrap();
        ballot.clear();
        let once = ballot.snapshot();
        ballot.clear();
        assert_eq!(ballot.snapshot(), once);
        assert_eq!(once.scored, 0);
        assert_eq!(once.eligible, 2);
    }

    #[test]
    fn reopen_same_session_drops_ineligible_scores() {
        let ballot = ballot(&[1, 2]);
        ballot.set_score(1, 1).unwrap();
        ballot.set_score(2, 2).unwrap();
        ballot.open(1, [2, 3]);
        assert_eq!(ballot.score(1), None);
        assert_eq!(ballot.score(2), Some(2));

        ballot.open(2, [2, 3]);
        assert_eq!(ballot.score(2), None);
        assert_eq!(ballot.session_id(), Some(2));
    }

    #[test]
    fn session_change_resets_scope() {
        let ballot = ballot(&[1]);
        ballot.set_score(1, 1).unwrap();
        ballot.session_changed(Some(1), None);
        assert_eq!(ballot.snapshot(), BallotSnapshot::default());
        assert!(ballot.set_score(1, 1).is_err());
    }

    #[test]
    fn in_flight_guard_rejects_second_holder() {
        let flag = AtomicBool::new(false);
        let first = InFlight::acquire(&flag).unwrap();
        assert!(matches!(
            InFlight::acquire(&flag),
            Err(VoteError::SubmissionInProgress)
        ));
        drop(first);
        assert!(InFlight::acquire(&flag).is_ok());
    }

    #[test]
    fn progress_rounding() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(1, 2), 50);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(0, 0), 0);
    }
}
