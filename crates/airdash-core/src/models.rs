//! Data model shared by the HTTP client, the stores and the session runtime.
//!
//! Wire types use camelCase keys to match the dashboard backend.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role granted to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Server-side account state, as reported by the profile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    #[default]
    Active,
    Suspended,
    Deleted,
}

/// The authenticated user's profile and favorites as held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(alias = "_id")]
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub favorites: BTreeSet<String>,
    #[serde(default)]
    pub has_password: bool,
    /// Account state; older backends omit it and signal suspension through `isActive`.
    #[serde(default, skip_serializing_if = "is_active_state")]
    pub status: AccountState,
    #[serde(default = "default_true", skip_serializing)]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn is_active_state(state: &AccountState) -> bool {
    *state == AccountState::Active
}

impl Session {
    /// Display name used in greetings ("First Last", falling back to email).
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    pub fn is_favorite(&self, city_id: &str) -> bool {
        self.favorites.contains(city_id)
    }

    /// Returns true if the backend reports the account as suspended.
    pub fn is_suspended(&self) -> bool {
        self.status == AccountState::Suspended || !self.is_active
    }
}

/// The opaque bearer token identifying a logged-in session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            issued_at: Utc::now(),
        }
    }

    /// Masks the token for display, keeping only the edges.
    pub fn masked(&self) -> String {
        mask_token(&self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.masked())
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Masks a token for display (`abcd...wxyz`).
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// What the token store persists: the credential and the profile it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuth {
    pub credential: Credential,
    pub user: Session,
}

/// Result of polling whether the account is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    Ok,
    AccountDeleted,
    AccountSuspended,
    RoleChanged,
}

impl StatusEvent {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StatusEvent::Ok)
    }
}

/// A status check result, carrying the fresh profile when the account is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub event: StatusEvent,
    pub user: Option<Session>,
}

impl StatusReport {
    pub fn ok(user: Session) -> Self {
        Self {
            event: StatusEvent::Ok,
            user: Some(user),
        }
    }

    pub fn terminal(event: StatusEvent) -> Self {
        Self { event, user: None }
    }
}

/// A city reference as handed over by the city page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityRef {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl CityRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
        }
    }
}

/// An entry of the recently viewed list.
///
/// `formatted_time` is a presentation cache; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCity {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub viewed_at: DateTime<Utc>,
    #[serde(skip)]
    pub formatted_time: String,
}

impl RecentCity {
    pub fn viewed(city: CityRef, viewed_at: DateTime<Utc>) -> Self {
        Self {
            id: city.id,
            name: city.name,
            slug: city.slug,
            viewed_at,
            formatted_time: String::new(),
        }
    }
}

/// Registration form payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Partial profile update; absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

/// Password change. Accounts created through Google have no current password.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_accepts_mongo_id_alias() {
        let json = r#"{
            "_id": "u1",
            "email": "an@example.com",
            "firstName": "An",
            "lastName": "Nguyen",
            "role": "admin",
            "favorites": ["hanoi", "hue"],
            "hasPassword": true
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.role, Role::Admin);
        assert!(session.is_favorite("hue"));
        assert!(!session.is_suspended());
        assert_eq!(session.display_name(), "An Nguyen");
    }

    #[test]
    fn test_session_suspended_via_is_active_flag() {
        let json = r#"{"id": "u1", "email": "a@b.c", "isActive": false}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert!(session.is_suspended());
        assert_eq!(session.display_name(), "a@b.c");
    }

    #[test]
    fn test_credential_debug_masks_token() {
        let cred = Credential::new("eyJhbGciOiJIUzI1NiJ9.payload.signature");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("payload"));
        assert!(debug.contains("eyJh...ture"));
    }

    #[test]
    fn test_recent_city_formatted_time_not_persisted() {
        let mut city = RecentCity::viewed(CityRef::new("hanoi", "Hà Nội", "ha-noi"), Utc::now());
        city.formatted_time = "Vừa xong".to_string();
        let json = serde_json::to_string(&city).unwrap();
        assert!(!json.contains("formattedTime"));
        assert!(json.contains("viewedAt"));
    }
}
