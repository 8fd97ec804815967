use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub language: String,
    pub notify_global_enable: bool,
    pub notify_station_ids: Vec<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    It,
}

impl UserRole {
    /// Admin capability: admins manage shifts, IT staff are a superset.
    pub fn can_manage_shifts(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::It)
    }

    pub fn is_it(&self) -> bool {
        matches!(self, UserRole::It)
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
            UserRole::It => write!(f, "it"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            "it" => Ok(UserRole::It),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for UserRole {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for UserRole {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.to_string(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for UserRole {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        s.parse::<UserRole>().map_err(|e| e.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub global_enable: bool,
    pub subscribed_station_ids: Vec<Uuid>,
}

/// Serializable user view without the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub language: String,
    pub notification_preferences: NotificationPreferences,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            language: user.language,
            notification_preferences: NotificationPreferences {
                global_enable: user.notify_global_enable,
                subscribed_station_ids: user.notify_station_ids,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub special_code: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Field-level settings patch. Absent fields leave the stored value
/// untouched; present fields replace it wholesale. This is the explicit
/// replacement for the document-store merge-on-write pattern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsPatch {
    pub language: Option<String>,
    pub notification_preferences: Option<NotificationPreferencesPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferencesPatch {
    pub global_enable: Option<bool>,
    pub subscribed_station_ids: Option<Vec<Uuid>>,
}

impl UserSettingsPatch {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(ref language) = self.language {
            user.language = language.clone();
        }
        if let Some(ref prefs) = self.notification_preferences {
            if let Some(global_enable) = prefs.global_enable {
                user.notify_global_enable = global_enable;
            }
            if let Some(ref station_ids) = prefs.subscribed_station_ids {
                user.notify_station_ids = station_ids.clone();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.language.is_none() && self.notification_preferences.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "nurse@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "nurse".to_string(),
            role: UserRole::User,
            language: "de".to_string(),
            notify_global_enable: true,
            notify_station_ids: vec![],
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut user = sample_user();
        let station = Uuid::new_v4();

        let patch = UserSettingsPatch {
            language: None,
            notification_preferences: Some(NotificationPreferencesPatch {
                global_enable: None,
                subscribed_station_ids: Some(vec![station]),
            }),
        };
        patch.apply_to(&mut user);

        assert_eq!(user.language, "de");
        assert!(user.notify_global_enable);
        assert_eq!(user.notify_station_ids, vec![station]);
    }

    #[test]
    fn patch_replaces_present_fields_wholesale() {
        let mut user = sample_user();
        user.notify_station_ids = vec![Uuid::new_v4(), Uuid::new_v4()];

        let patch = UserSettingsPatch {
            language: Some("en".to_string()),
            notification_preferences: Some(NotificationPreferencesPatch {
                global_enable: Some(false),
                subscribed_station_ids: Some(vec![]),
            }),
        };
        patch.apply_to(&mut user);

        assert_eq!(user.language, "en");
        assert!(!user.notify_global_enable);
        assert!(user.notify_station_ids.is_empty());
    }

    #[test]
    fn unknown_role_fails_to_parse() {
        assert!("superuser".parse::<UserRole>().is_err());
        assert_eq!("IT".parse::<UserRole>().unwrap(), UserRole::It);
    }
}
