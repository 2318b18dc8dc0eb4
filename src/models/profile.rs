use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Profile {
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    /// Centimetres.
    pub height: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_complete(&self) -> bool {
        self.age.is_some() && self.gender.is_some() && self.height.is_some()
    }

    /// Overlay the fields present in `patch`, keeping the rest.
    pub fn merge(&mut self, patch: &ProfilePatch) {
        if let Some(age) = patch.age {
            self.age = Some(age);
        }
        if let Some(gender) = patch.gender {
            self.gender = Some(gender);
        }
        if let Some(height) = patch.height {
            self.height = Some(height);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "gender_identity", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
    PreferNotToSay,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub height: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut profile = Profile {
            age: Some(34),
            gender: Some(Gender::Female),
            height: None,
            updated_at: None,
        };
        assert!(!profile.is_complete());

        profile.merge(&ProfilePatch {
            height: Some(168),
            ..Default::default()
        });
        assert_eq!(profile.age, Some(34));
        assert_eq!(profile.height, Some(168));
        assert!(profile.is_complete());
    }

    #[test]
    fn test_gender_wire_format() {
        let json = serde_json::to_string(&Gender::PreferNotToSay).unwrap();
        assert_eq!(json, r#""prefer-not-to-say""#);
    }
}
