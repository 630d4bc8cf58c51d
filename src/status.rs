use chrono::NaiveDateTime;
use serde::Serialize;

use crate::ballot::{progress_percent, BallotSnapshot};
use crate::directory::{days_remaining, formatted_range, human_remaining};
use crate::models::VotingSession;

/// Read-only view for presentation. Built fresh on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotingStatus {
    pub session_active: bool,
    pub can_vote: bool,
    pub has_voted: bool,
    pub progress: u8,
    pub complete: bool,
    pub scored: usize,
    pub eligible: usize,
    pub days_remaining: Option<u32>,
    pub time_remaining: Option<String>,
    pub date_range: Option<String>,
}

impl VotingStatus {
    pub fn compute(
        session: Option<&VotingSession>,
        has_voted: bool,
        ballot: BallotSnapshot,
        now: NaiveDateTime,
    ) -> Self {
        let session_active = session.is_some_and(|s| s.active);
        let can_vote = session_active
            && session.is_some_and(|s| s.current_user_can_vote)
            && !has_voted;

        // A ballot left over from another session counts as empty.
        let ballot = match session {
            Some(s) if ballot.session_id == Some(s.session_id) => ballot,
            _ => BallotSnapshot::default(),
        };
        let days = session.map(|s| days_remaining(s.end_date, now));

        Self {
            session_active,
            can_vote,
            has_voted,
            progress: progress_percent(ballot.scored, ballot.eligible),
            complete: ballot.complete,
            scored: ballot.scored,
            eligible: ballot.eligible,
            days_remaining: days,
            time_remaining: days.map(human_remaining),
            date_range: session.map(formatted_range),
        }
    }
}
