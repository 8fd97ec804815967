use chrono::NaiveDateTime;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::UserRole;

/// One-time signup token. Consumed atomically with user creation; a used
/// code never grants a second signup.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SpecialCode {
    pub code: String,
    pub role: UserRole,
    pub is_used: bool,
    pub used_by: Option<Uuid>,
    pub used_at: Option<NaiveDateTime>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecialCodeInput {
    pub role: UserRole,
}

impl SpecialCode {
    pub fn generate_code() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_distinct_and_alphanumeric() {
        let a = SpecialCode::generate_code();
        let b = SpecialCode::generate_code();

        assert_eq!(a.len(), 10);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
