pub mod admin;
pub mod auth;
pub mod participant;
pub mod results;
pub mod session;
pub mod vote;

pub use admin::{AdminVote, NewParticipant, NewSession, ParticipantUpdate, SessionStats};
pub use auth::{Permission, Profile, ProfileUpdate, Role};
pub use participant::{Participant, ParticipantStatus};
pub use results::{CastVote, SessionResult};
pub use session::VotingSession;
pub use vote::VoteEntry;

pub type UserId = i64;
pub type SessionId = i64;
