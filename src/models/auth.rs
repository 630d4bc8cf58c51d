use serde::{Deserialize, Serialize};

use super::UserId;

#[derive(Serialize, Debug)]
pub struct TelegramAuthRequest<'a> {
    pub init_data: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct TelegramAuthResponse {
    pub token: Option<String>,
    pub user: Option<Profile>,
}

#[derive(Deserialize, Debug)]
pub struct RefreshResponse {
    pub token: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct MeResponse {
    pub user: Option<Profile>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Manager,
    Admin,
}

/// Actions gated by role. Admins may do everything; everyone else may vote
/// and read their own results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    VoteSubmit,
    ResultsView,
    ResultsManage,
    SessionsManage,
    VotesManage,
}

impl Role {
    pub fn allows(self, permission: Permission) -> bool {
        match self {
            Role::Admin => true,
            Role::User | Role::Manager => {
                matches!(permission, Permission::VoteSubmit | Permission::ResultsView)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    #[serde(rename = "user_id", alias = "id")]
    pub id: UserId,
    #[serde(rename = "name", alias = "display_name")]
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn merge(&mut self, update: ProfileUpdate) {
        if let Some(display_name) = update.display_name {
            self.display_name = display_name;
        }
        if let Some(role) = update.role {
            self.role = role;
        }
    }
}

/// Partial profile fields pushed by the server.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProfileUpdate {
    #[serde(rename = "name", alias = "display_name")]
    pub display_name: Option<String>,
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_accepts_both_field_spellings() {
        let a: Profile =
            serde_json::from_str(r#"{"user_id": 7, "name": "Ann", "role": "manager"}"#).unwrap();
        let b: Profile =
            serde_json::from_str(r#"{"id": 7, "display_name": "Ann", "role": "manager"}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.role, Role::Manager);
    }

    #[test]
    fn role_permissions() {
        assert!(Role::User.allows(Permission::VoteSubmit));
        assert!(Role::User.allows(Permission::ResultsView));
        assert!(!Role::User.allows(Permission::ResultsManage));
        assert!(Role::Manager.allows(Permission::ResultsView));
        assert!(!Role::Manager.allows(Permission::SessionsManage));
        assert!(!Role::Manager.allows(Permission::VotesManage));
        assert!(Role::Admin.allows(Permission::SessionsManage));
        assert!(Role::Admin.allows(Permission::VotesManage));
    }

    #[test]
    fn merge_only_touches_present_fields() {
        let mut profile = Profile {
            id: 1,
            display_name: "Ann".into(),
            role: Role::User,
        };
        profile.merge(ProfileUpdate {
            display_name: None,
            role: Some(Role::Admin),
        });
        assert_eq!(profile.display_name, "Ann");
        assert!(profile.is_admin());
    }
}
