use serde::{Deserialize, Serialize};

use super::{SessionId, UserId};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteEntry {
    #[serde(alias = "target_id")]
    pub user_id: UserId,
    pub score: u8,
}

#[derive(Serialize, Debug)]
pub struct SubmitVotesRequest {
    pub session_id: SessionId,
    pub votes: Vec<VoteEntry>,
}
