use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account status. No other value is valid anywhere in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            other => Err(format!("invalid user status '{}'", other)),
        }
    }
}

/// A user record as the dashboard sees it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned identifier, never reassigned
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub status: UserStatus,
    /// Set once on creation
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful mutation
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserData {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub status: UserStatus,
}

impl CreateUserData {
    /// Trim the required fields and turn blank optional fields into `None`
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.as_deref().and_then(non_empty),
            address: self.address.as_deref().and_then(non_empty),
            status: self.status,
        }
    }
}

/// Partial update of a user.
///
/// There is deliberately no `id` or `createdAt` field: both keys are dropped
/// when a patch is deserialized, so they can never be overwritten. For
/// `phone` and `address`, an empty string clears the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email.map(|e| e.trim().to_string()),
            phone: self.phone.map(|p| p.trim().to_string()),
            address: self.address.map(|a| a.trim().to_string()),
            status: self.status,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let ts = "2024-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        User {
            id: "abc".to_string(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            phone: Some("+15551234".to_string()),
            address: None,
            status: UserStatus::Active,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("active".parse::<UserStatus>().unwrap(), UserStatus::Active);
        assert_eq!("inactive".parse::<UserStatus>().unwrap(), UserStatus::Inactive);
        assert!("Active".parse::<UserStatus>().is_err());
        assert!("banned".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_user_serializes_iso_timestamps() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert_eq!(json["createdAt"], "2024-05-01T10:00:00Z");
        assert_eq!(json["status"], "active");
        assert!(json.get("address").is_none());
    }

    #[test]
    fn test_patch_drops_id_and_created_at() {
        let patch: UserPatch = serde_json::from_str(
            r#"{"id":"other","createdAt":"2000-01-01T00:00:00Z","name":"Annie"}"#,
        )
        .unwrap();

        assert_eq!(patch.name.as_deref(), Some("Annie"));
        let json = serde_json::to_value(&patch).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_create_data_normalized() {
        let data = CreateUserData {
            name: "  Bo ".to_string(),
            email: " bo@example.com".to_string(),
            phone: Some("   ".to_string()),
            address: Some("1 Main St".to_string()),
            status: UserStatus::Inactive,
        }
        .normalized();

        assert_eq!(data.name, "Bo");
        assert_eq!(data.email, "bo@example.com");
        assert_eq!(data.phone, None);
        assert_eq!(data.address.as_deref(), Some("1 Main St"));
    }
}
