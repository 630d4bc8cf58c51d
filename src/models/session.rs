use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SessionId;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VotingSession {
    pub session_id: SessionId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
    #[serde(rename = "can_vote", alias = "can_user_vote", default)]
    pub current_user_can_vote: bool,
    #[serde(default)]
    pub has_voted: bool,
}

#[derive(Deserialize, Debug)]
pub struct CurrentSessionResponse {
    pub session: Option<VotingSession>,
    pub can_user_vote: Option<bool>,
}

impl CurrentSessionResponse {
    pub fn into_session(self) -> Option<VotingSession> {
        let can_user_vote = self.can_user_vote;
        self.session.map(|mut session| {
            if let Some(flag) = can_user_vote {
                session.current_user_can_vote = flag;
            }
            session
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_vote_flag_overrides_nested_one() {
        let response: CurrentSessionResponse = serde_json::from_str(
            r#"{
                "session": {"session_id": 3, "start_date": "2025-03-03",
                            "end_date": "2025-03-09", "active": true},
                "can_user_vote": true
            }"#,
        )
        .unwrap();
        let session = response.into_session().unwrap();
        assert!(session.current_user_can_vote);
        assert!(!session.has_voted);
    }

    #[test]
    fn null_session_is_none() {
        let response: CurrentSessionResponse =
            serde_json::from_str(r#"{"status": "success", "session": null}"#).unwrap();
        assert!(response.into_session().is_none());
    }
}
