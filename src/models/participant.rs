use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Active,
    Excluded,
    #[serde(alias = "vacation", alias = "sick_leave")]
    OnLeave,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Participant {
    pub user_id: UserId,
    #[serde(rename = "name", alias = "display_name", default)]
    pub display_name: String,
    #[serde(default)]
    pub can_vote: bool,
    #[serde(default)]
    pub can_receive_votes: bool,
    pub status: ParticipantStatus,
}

impl Participant {
    /// Whether `current_user` may score this participant.
    pub fn is_eligible_target(&self, current_user: UserId) -> bool {
        self.can_receive_votes
            && self.status == ParticipantStatus::Active
            && self.user_id != current_user
    }
}

#[derive(Deserialize, Debug)]
pub struct ParticipantsResponse {
    #[serde(default)]
    pub participants: Vec<Participant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_statuses_collapse_to_on_leave() {
        for raw in ["\"vacation\"", "\"sick_leave\"", "\"on_leave\""] {
            let status: ParticipantStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(status, ParticipantStatus::OnLeave);
        }
    }
}
