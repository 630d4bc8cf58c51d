//! Token and profile ownership, plus the refresh-on-401 protocol.
//!
//! Every authenticated request goes through [`CredentialStore::execute`]. A
//! 401 triggers at most one refresh per request; concurrent 401s join the
//! refresh already in flight instead of starting their own.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response, StatusCode};

use crate::api::{self, ApiClient};
use crate::cache::TokenCache;
use crate::error::VoteError;
use crate::models::{Permission, Profile, ProfileUpdate};

type SharedRefresh = Shared<BoxFuture<'static, Result<String, String>>>;

#[derive(Debug, Default, Clone)]
struct Credential {
    token: Option<String>,
    user: Option<Profile>,
}

enum RefreshState {
    Idle,
    Refreshing {
        generation: u64,
        from: String,
        task: SharedRefresh,
    },
    Failed,
}

struct RefreshSlot {
    state: RefreshState,
    generation: u64,
    /// Last generation whose outcome was applied or revoked.
    resolved: u64,
}

/// Observable phase of the refresh state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
    Failed,
}

pub struct CredentialStore {
    api: ApiClient,
    cache: Option<TokenCache>,
    credential: RwLock<Credential>,
    refresh: Mutex<RefreshSlot>,
}

impl CredentialStore {
    pub fn new(api: ApiClient, cache: Option<TokenCache>) -> Self {
        Self {
            api,
            cache,
            credential: RwLock::new(Credential::default()),
            refresh: Mutex::new(RefreshSlot {
                state: RefreshState::Idle,
                generation: 0,
                resolved: 0,
            }),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn is_authenticated(&self) -> bool {
        let credential = self.credential.read();
        credential.token.is_some() && credential.user.is_some()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.credential.read().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.credential.read().token.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.credential
            .read()
            .user
            .as_ref()
            .is_some_and(Profile::is_admin)
    }

    /// Fails with [`VoteError::SessionExpired`] when signed out and
    /// [`VoteError::Forbidden`] when the role does not grant `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), VoteError> {
        let role = self
            .credential
            .read()
            .user
            .as_ref()
            .map(|user| user.role)
            .ok_or(VoteError::SessionExpired)?;
        if role.allows(permission) {
            Ok(())
        } else {
            Err(VoteError::Forbidden(format!("{:?} is not permitted for {:?}", permission, role)))
        }
    }

    pub fn refresh_phase(&self) -> RefreshPhase {
        match self.refresh.lock().state {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::Refreshing { .. } => RefreshPhase::Refreshing,
            RefreshState::Failed => RefreshPhase::Failed,
        }
    }

    pub async fn authenticate(&self, proof: &str) -> Result<Profile, VoteError> {
        match api::auth::telegram_login(&self.api, proof).await {
            Ok((token, user)) => {
                self.install(token, user.clone());
                Ok(user)
            }
            Err(e) => {
                if matches!(e, VoteError::AuthRejected(_)) {
                    self.clear_credentials();
                }
                Err(e)
            }
        }
    }

    /// Adopts a cached token and validates it by loading the profile.
    pub async fn restore(&self) -> Result<bool, VoteError> {
        let Some(cache) = &self.cache else {
            return Ok(false);
        };
        let Some(token) = cache.load() else {
            return Ok(false);
        };
        debug!("Restoring cached credential from {}", cache.path().display());
        {
            let mut slot = self.refresh.lock();
            slot.state = RefreshState::Idle;
            *self.credential.write() = Credential {
                token: Some(token),
                user: None,
            };
        }

        match api::users::get_me(self).await {
            Ok(user) => {
                info!("Restored session for user {}", user.id);
                let mut credential = self.credential.write();
                if credential.token.is_some() {
                    credential.user = Some(user);
                }
                drop(credential);
                Ok(self.is_authenticated())
            }
            Err(e) => {
                warn!("Cached credential is no longer valid: {}", e);
                self.clear_credentials();
                match e {
                    VoteError::Network(_) => Err(e),
                    _ => Ok(false),
                }
            }
        }
    }

    pub fn update_profile(&self, update: ProfileUpdate) {
        if let Some(user) = self.credential.write().user.as_mut() {
            user.merge(update);
        }
    }

    /// Clears local credentials at once; the server is notified in the background.
    pub fn logout(&self) {
        let token = self.credential.read().token.clone();
        self.refresh.lock().state = RefreshState::Idle;
        self.clear_credentials();
        info!("Logged out");

        if let Some(token) = token {
            self.revoke_in_background(token);
        }
    }

    fn revoke_in_background(&self, token: String) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let api = self.api.clone();
                handle.spawn(async move {
                    if let Err(e) = api::auth::logout(&api, &token).await {
                        debug!("Logout notification failed: {}", e);
                    }
                });
            }
            Err(_) => debug!("No runtime available, skipping logout notification"),
        }
    }

    /// Injects the bearer token if one is present. Returns the token used.
    pub fn attach_to_request(&self, request: &mut Request) -> Option<String> {
        let token = self.credential.read().token.clone()?;
        match bearer(&token) {
            Ok(value) => {
                request.headers_mut().insert(AUTHORIZATION, value);
                Some(token)
            }
            Err(e) => {
                warn!("Stored token is not a valid header value: {}", e);
                None
            }
        }
    }

    /// Sends `request` with credentials, recovering a single 401 by refresh-and-replay.
    pub async fn execute(&self, request: Request) -> Result<Response, VoteError> {
        let replay = request.try_clone();
        let mut request = request;
        let sent_with = self.attach_to_request(&mut request);
        debug!("-> {} {}", request.method(), request.url().path());
        let response = self.api.http().execute(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        match replay {
            Some(original) => self.handle_unauthorized(original, sent_with).await,
            None => Ok(response),
        }
    }

    /// Refreshes once (or joins a refresh in flight) and replays `original` once.
    pub async fn handle_unauthorized(
        &self,
        original: Request,
        stale_token: Option<String>,
    ) -> Result<Response, VoteError> {
        debug!("401 on {}, recovering credential", original.url().path());
        let token = self.refreshed_token(stale_token.as_deref()).await?;

        let mut replay = original;
        replay.headers_mut().insert(AUTHORIZATION, bearer(&token)?);
        let response = self.api.http().execute(replay).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Replay rejected with a fresh token, dropping credentials");
            self.fail_refresh();
            return Err(VoteError::SessionExpired);
        }
        Ok(response)
    }

    /// Returns a token to replay with. A refresh result is only handed out
    /// while the store still holds the credential it was refreshed from.
    async fn refreshed_token(&self, stale_token: Option<&str>) -> Result<String, VoteError> {
        let (generation, task) = {
            let mut slot = self.refresh.lock();
            let in_flight = match &slot.state {
                RefreshState::Refreshing {
                    generation, task, ..
                } => Some((*generation, task.clone())),
                RefreshState::Failed => return Err(VoteError::SessionExpired),
                RefreshState::Idle => None,
            };
            match in_flight {
                Some(joined) => joined,
                None => {
                    let current = self.credential.read().token.clone();
                    match current {
                        // Someone else already refreshed past the token this request used.
                        Some(token) if Some(token.as_str()) != stale_token => return Ok(token),
                        Some(token) => {
                            slot.generation += 1;
                            let generation = slot.generation;
                            let task = self.spawn_refresh(token.clone());
                            slot.state = RefreshState::Refreshing {
                                generation,
                                from: token,
                                task: task.clone(),
                            };
                            (generation, task)
                        }
                        None => return Err(VoteError::SessionExpired),
                    }
                }
            }
        };

        let outcome = task.await;

        let mut slot = self.refresh.lock();
        let owned_from = match &slot.state {
            RefreshState::Refreshing {
                generation: g,
                from,
                ..
            } if *g == generation => Some(from.clone()),
            _ => None,
        };
        let current = self.credential.read().token.clone();

        match outcome {
            Ok(token) => {
                if current.as_deref() == Some(token.as_str()) {
                    return Ok(token);
                }
                let first = slot.resolved < generation;
                slot.resolved = slot.resolved.max(generation);
                match owned_from {
                    Some(from) if current.as_deref() == Some(from.as_str()) => {
                        slot.state = RefreshState::Idle;
                        self.store_token(&token);
                        Ok(token)
                    }
                    owned => {
                        if owned.is_some() {
                            slot.state = RefreshState::Idle;
                        }
                        drop(slot);
                        if first {
                            warn!("Credential changed during refresh, revoking the refreshed token");
                            self.revoke_in_background(token);
                        }
                        Err(VoteError::SessionExpired)
                    }
                }
            }
            Err(reason) => {
                slot.resolved = slot.resolved.max(generation);
                if owned_from.is_some() {
                    warn!("Token refresh failed: {}", reason);
                    slot.state = RefreshState::Failed;
                    self.clear_credentials();
                }
                Err(VoteError::SessionExpired)
            }
        }
    }

    fn spawn_refresh(&self, token: String) -> SharedRefresh {
        let api = self.api.clone();
        async move {
            api::auth::refresh_token(&api, &token)
                .await
                .map_err(|e| e.to_string())
        }
        .boxed()
        .shared()
    }

    fn fail_refresh(&self) {
        self.refresh.lock().state = RefreshState::Failed;
        self.clear_credentials();
    }

    fn install(&self, token: String, user: Profile) {
        let mut slot = self.refresh.lock();
        slot.state = RefreshState::Idle;
        if let Some(cache) = &self.cache {
            cache.store(&token);
        }
        *self.credential.write() = Credential {
            token: Some(token),
            user: Some(user),
        };
    }

    fn store_token(&self, token: &str) {
        if let Some(cache) = &self.cache {
            cache.store(token);
        }
        self.credential.write().token = Some(token.to_string());
    }

    fn clear_credentials(&self) {
        *self.credential.write() = Credential::default();
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

fn bearer(token: &str) -> Result<HeaderValue, VoteError> {
    HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| VoteError::AuthRejected(format!("unusable token: {e}")))
}
