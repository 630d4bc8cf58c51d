use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ParticipantStatus, SessionId, UserId};

#[derive(Serialize, Debug, Clone)]
pub struct NewSession {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
    pub auto_participants: bool,
}

#[derive(Serialize, Debug)]
pub struct CloseSessionRequest {
    pub forced: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct NewParticipant {
    pub user_id: UserId,
    pub can_vote: bool,
    pub can_receive_votes: bool,
    pub status: ParticipantStatus,
}

impl NewParticipant {
    /// An active participant who votes and can be voted for.
    pub fn active(user_id: UserId) -> Self {
        Self {
            user_id,
            can_vote: true,
            can_receive_votes: true,
            status: ParticipantStatus::Active,
        }
    }
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct ParticipantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_vote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_receive_votes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ParticipantStatus>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    #[serde(default)]
    pub participants_count: Option<u32>,
    #[serde(default)]
    pub active_participants_count: Option<u32>,
    #[serde(default)]
    pub voters_count: Option<u32>,
    #[serde(default)]
    pub votes_count: Option<u32>,
    #[serde(default)]
    pub participation_rate: Option<f64>,
}

/// A single vote as seen by an administrator.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AdminVote {
    pub vote_id: i64,
    pub session_id: SessionId,
    pub voter_id: UserId,
    pub target_id: UserId,
    pub score: u8,
    #[serde(default)]
    pub modified_by_admin: bool,
}

#[derive(Serialize, Debug)]
pub struct UpdateVoteRequest<'a> {
    pub new_score: u8,
    pub reason: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct CreatedSessionResponse {
    pub session: Option<super::VotingSession>,
}

#[derive(Deserialize, Debug)]
pub struct SessionVotesResponse {
    #[serde(default)]
    pub votes: Vec<AdminVote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_update_sends_only_changed_fields() {
        let update = ParticipantUpdate {
            status: Some(ParticipantStatus::Excluded),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"status": "excluded"})
        );
    }
}
