use log::{error, info};

use super::{read_reply, unexpected, Reply};
use crate::credentials::CredentialStore;
use crate::error::VoteError;
use crate::models::auth::MeResponse;
use crate::models::Profile;

pub async fn get_me(store: &CredentialStore) -> Result<Profile, VoteError> {
    let url = store.api().url("/users/me");
    let request = store.api().http().get(&url).build()?;
    let resp = store.execute(request).await?;

    match read_reply::<MeResponse>(resp).await? {
        Reply::Success(MeResponse { user: Some(user) }) => {
            info!("Profile received successfully");
            Ok(user)
        }
        Reply::Success(_) => Err(VoteError::Decode("profile response without user".into())),
        Reply::Failure { status, message } => {
            error!("Failed to get profile: {} {}", status, message);
            if status == reqwest::StatusCode::UNAUTHORIZED {
                Err(VoteError::SessionExpired)
            } else {
                Err(unexpected(status, message))
            }
        }
    }
}
