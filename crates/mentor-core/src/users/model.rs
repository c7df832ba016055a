use crate::constants::profile::UNSPECIFIED;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("admin") {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::User => "Kullanıcı",
            UserRole::Admin => "Yönetici",
        }
    }
}

/// A client of the counsellor. `password` is only filled in admin listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub marital_status: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub notes: String,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Builds a profile from a `dto_users` row, filling the defaults the forms expect.
    pub fn from_row(row: &Value) -> Option<Self> {
        let id = id_string(row.get("id")?)?;
        let text = |key: &str| -> String {
            row.get(key)
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_default()
        };
        let or_unspecified = |s: String| {
            if s.is_empty() {
                UNSPECIFIED.to_string()
            } else {
                s
            }
        };

        Some(Self {
            id,
            username: text("username"),
            password: None,
            role: UserRole::parse(&text("role")),
            name: text("full_name"),
            age: text("age"),
            gender: or_unspecified(text("gender")),
            marital_status: or_unspecified(text("marital_status")),
            job: text("job"),
            notes: text("notes"),
        })
    }

    /// Columns written by the profile form. Role is deliberately absent.
    pub fn profile_columns(&self) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("full_name".into(), Value::String(self.name.clone()));
        map.insert("age".into(), Value::String(self.age.clone()));
        map.insert("gender".into(), Value::String(self.gender.clone()));
        map.insert(
            "marital_status".into(),
            Value::String(self.marital_status.clone()),
        );
        map.insert("job".into(), Value::String(self.job.clone()));
        map.insert("notes".into(), Value::String(self.notes.clone()));
        map
    }
}

/// Row as shown in the admin user list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub password: Option<String>,
    pub role: UserRole,
    pub name: String,
    pub created_at: Option<String>,
}

impl UserSummary {
    pub fn from_row(row: &Value) -> Option<Self> {
        let str_field = |key: &str| row.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Some(Self {
            id: id_string(row.get("id")?)?,
            username: str_field("username").unwrap_or_default(),
            password: str_field("password"),
            role: UserRole::parse(&str_field("role").unwrap_or_default()),
            name: str_field("full_name").unwrap_or_default(),
            created_at: str_field("created_at"),
        })
    }
}

/// Ids come back as strings (uuid) or numbers (serial) depending on the table.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_row_fills_defaults() {
        let row = serde_json::json!({
            "id": "u-1",
            "username": "ahmet",
            "role": null,
            "full_name": "Ahmet",
            "age": 34,
        });
        let profile = UserProfile::from_row(&row).unwrap();

        assert_eq!(profile.role, UserRole::User);
        assert_eq!(profile.age, "34");
        assert_eq!(profile.gender, UNSPECIFIED);
        assert_eq!(profile.marital_status, UNSPECIFIED);
        assert_eq!(profile.job, "");
        assert!(profile.password.is_none());
    }

    #[test]
    fn test_profile_columns_exclude_role() {
        let profile = UserProfile {
            id: "1".into(),
            role: UserRole::Admin,
            name: "Ayşe".into(),
            ..Default::default()
        };
        let cols = profile.profile_columns();
        assert!(!cols.contains_key("role"));
        assert_eq!(cols["full_name"], "Ayşe");
    }

    #[test]
    fn test_summary_keeps_password() {
        let row = serde_json::json!({
            "id": 7,
            "username": "mehmet",
            "password": "gizli",
            "role": "admin",
            "full_name": "Mehmet",
            "created_at": "2024-05-01T10:00:00Z",
        });
        let summary = UserSummary::from_row(&row).unwrap();
        assert_eq!(summary.id, "7");
        assert_eq!(summary.password.as_deref(), Some("gizli"));
        assert_eq!(summary.role, UserRole::Admin);
    }
}
