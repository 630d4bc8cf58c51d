use serde::{Deserialize, Serialize};

use super::{SessionId, UserId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub average_score: Option<f64>,
    pub rank: Option<u32>,
    pub total_bonus: Option<f64>,
    pub votes_received: Option<u32>,
    pub calculated_at: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct MyResults {
    #[serde(default)]
    pub results: Vec<SessionResult>,
    /// Votes the caller cast, when the server reports them.
    #[serde(default)]
    pub votes: Vec<CastVote>,
}

/// One vote cast by the caller, as reported by `GET /results/me`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CastVote {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(alias = "target_id")]
    pub user_id: UserId,
    pub score: u8,
}

impl MyResults {
    /// Whether the caller already voted in `session_id`. Votes without a
    /// session id belong to the current session.
    pub fn has_voted_in(&self, session_id: SessionId) -> bool {
        self.votes
            .iter()
            .any(|vote| vote.session_id.map_or(true, |id| id == session_id))
    }
}

#[derive(Deserialize, Debug)]
pub struct SessionResultsResponse {
    #[serde(default)]
    pub results: Vec<SessionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn votes_decide_has_voted() {
        let results: MyResults = serde_json::from_str(
            r#"{"status": "success", "results": [], "votes": [{"target_id": 2, "score": 7}]}"#,
        )
        .unwrap();
        assert!(results.has_voted_in(10));

        let scoped: MyResults = serde_json::from_str(
            r#"{"votes": [{"session_id": 9, "target_id": 2, "score": 7}]}"#,
        )
        .unwrap();
        assert!(scoped.has_voted_in(9));
        assert!(!scoped.has_voted_in(10));

        assert!(!MyResults::default().has_voted_in(10));
    }
}
