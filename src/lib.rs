//! Client core for the bonus-voting backend: credentials, the current
//! voting session, the participant roster, exactly-once ballot submission,
//! and the administrator's session and vote management.

pub mod admin;
pub mod api;
pub mod ballot;
pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod models;
pub mod roster;
pub mod status;

pub use client::VotingClient;
pub use config::Config;
pub use error::VoteError;
