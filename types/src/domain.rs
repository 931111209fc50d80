use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1))]
    pub full_name: String,
}

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Body returned by both `/auth/register` and `/auth/login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_hair_profile: Option<bool>,
}

impl From<&AuthToken> for User {
    fn from(token: &AuthToken) -> Self {
        Self {
            id: token.user_id,
            email: token.email.clone(),
            full_name: None,
            created_at: None,
            has_hair_profile: None,
        }
    }
}

/// Account record served by `/users/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default, deserialize_with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_scans: u32,
}

#[derive(Debug, Default, Validate, Serialize, Deserialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[validate(email)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Porosity {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, Display)]
pub enum CurlPattern {
    #[serde(rename = "3a")]
    #[strum(serialize = "3a")]
    Type3A,
    #[serde(rename = "3b")]
    #[strum(serialize = "3b")]
    Type3B,
    #[serde(rename = "3c")]
    #[strum(serialize = "3c")]
    #[default]
    Type3C,
    #[serde(rename = "4a")]
    #[strum(serialize = "4a")]
    Type4A,
    #[serde(rename = "4b")]
    #[strum(serialize = "4b")]
    Type4B,
    #[serde(rename = "4c")]
    #[strum(serialize = "4c")]
    Type4C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScalpType {
    Dry,
    #[default]
    Normal,
    Oily,
    Sensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Density {
    Low,
    #[default]
    Medium,
    High,
}

/// Fixed-size enumerations that a form can step through with the arrow keys.
pub trait Choice: Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    fn next(self) -> Self {
        let index = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl Choice for Porosity {
    const ALL: &'static [Self] = &[Porosity::Low, Porosity::Medium, Porosity::High];
}

impl Choice for CurlPattern {
    const ALL: &'static [Self] = &[
        CurlPattern::Type3A,
        CurlPattern::Type3B,
        CurlPattern::Type3C,
        CurlPattern::Type4A,
        CurlPattern::Type4B,
        CurlPattern::Type4C,
    ];
}

impl Choice for ScalpType {
    const ALL: &'static [Self] = &[
        ScalpType::Dry,
        ScalpType::Normal,
        ScalpType::Oily,
        ScalpType::Sensitive,
    ];
}

impl Choice for Density {
    const ALL: &'static [Self] = &[Density::Low, Density::Medium, Density::High];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HairProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub porosity: Porosity,
    pub curl_pattern: CurlPattern,
    pub scalp_type: ScalpType,
    pub density: Density,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::time::lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HairProfileCreate {
    pub porosity: Porosity,
    pub curl_pattern: CurlPattern,
    pub scalp_type: ScalpType,
    pub density: Density,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HairProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub porosity: Option<Porosity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curl_pattern: Option<CurlPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalp_type: Option<ScalpType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<Density>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&HairProfile> for HairProfileCreate {
    fn from(profile: &HairProfile) -> Self {
        Self {
            porosity: profile.porosity,
            curl_pattern: profile.curl_pattern,
            scalp_type: profile.scalp_type,
            density: profile.density,
            notes: profile.notes.clone(),
        }
    }
}

impl HairProfileUpdate {
    /// Fields of `draft` that differ from `current`.
    pub fn diff(current: &HairProfile, draft: &HairProfileCreate) -> Self {
        Self {
            porosity: (current.porosity != draft.porosity).then_some(draft.porosity),
            curl_pattern: (current.curl_pattern != draft.curl_pattern)
                .then_some(draft.curl_pattern),
            scalp_type: (current.scalp_type != draft.scalp_type).then_some(draft.scalp_type),
            density: (current.density != draft.density).then_some(draft.density),
            notes: (current.notes != draft.notes)
                .then(|| draft.notes.clone().unwrap_or_default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Form inputs are never sent as empty strings.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
