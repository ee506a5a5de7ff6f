//! Wire types for the auth backend, the CRM proxy and Bitrix24.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A persisted session: both bearer tokens plus the cached profile.
///
/// Tokens are opaque strings issued by the auth backend. `user` may lag the
/// tokens (e.g. right after login, before the profile fetch lands).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived access token, replaced on refresh.
    pub access: String,
    /// Long-lived refresh token.
    pub refresh: String,
    /// Cached profile, if one has been fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Profile as served by the auth backend's user detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_joined: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(default)]
    pub profile: ProfileDetails,
}

impl UserProfile {
    /// Merges a partial update into this profile, keeping existing values
    /// for fields the patch does not carry.
    #[must_use]
    pub fn merged_with(mut self, patch: UserPatch) -> UserProfile {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(date_joined) = patch.date_joined {
            self.date_joined = Some(date_joined);
        }
        if let Some(last_login) = patch.last_login {
            self.last_login = Some(last_login);
        }
        if let Some(profile) = patch.profile {
            self.profile = profile;
        }
        self
    }

    /// Display name for CLI output.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Nested profile block (image, bio, contact details).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Partial profile returned by update responses; all fields optional so a
/// merge never clobbers cached values with absences.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_joined: Option<String>,
    pub last_login: Option<String>,
    pub profile: Option<ProfileDetails>,
}

impl UserPatch {
    /// Promotes a patch into a full profile when it carries the identity
    /// fields. Used when there is no cached profile to merge into.
    pub fn into_profile(self) -> Option<UserProfile> {
        Some(UserProfile {
            id: self.id?,
            email: self.email?,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            date_joined: self.date_joined,
            last_login: self.last_login,
            profile: self.profile.unwrap_or_default(),
        })
    }
}

/// Token pair issued on login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

/// `POST /users/login/` response envelope.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub access: String,
    pub refresh: String,
}

/// `POST /users/` (registration) response envelope.
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: UserProfile,
    pub tokens: Tokens,
}

/// `PATCH /users/update_profile/` response envelope.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: UserPatch,
}

/// Generic `{"message": ...}` envelope (logout, password change).
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// A file attached to a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Reads a file from disk, sniffing the MIME type from content with an
    /// extension-based fallback.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file {}", path.display()))?;
        let mime = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| mime_for_extension(path).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self {
            filename,
            mime,
            bytes,
        })
    }
}

/// MIME type from file extension for the image formats the backend accepts.
fn mime_for_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Fields submitted at registration.
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    /// When present, registration goes out as multipart form data.
    pub profile_image: Option<FileUpload>,
}

/// Fields submitted on profile update. Always multipart (the endpoint
/// accepts an optional image replacement alongside text fields).
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub profile_image: Option<FileUpload>,
}

/// Contact row served by the CRM backend proxy.
#[derive(Debug, Clone, Deserialize)]
pub struct BitrixContact {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl BitrixContact {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// Deal row from `crm.deal.list`. Bitrix24 serializes scalars as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Deal {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "TITLE")]
    pub title: String,
    #[serde(rename = "STAGE_ID")]
    pub stage_id: String,
    #[serde(rename = "OPPORTUNITY", default)]
    pub opportunity: Option<String>,
    #[serde(rename = "CURRENCY_ID", default)]
    pub currency_id: Option<String>,
    #[serde(rename = "CONTACT_ID", default)]
    pub contact_id: Option<String>,
    #[serde(rename = "COMPANY_ID", default)]
    pub company_id: Option<String>,
    #[serde(rename = "DATE_CREATE", default)]
    pub date_create: Option<String>,
    #[serde(rename = "DATE_MODIFY", default)]
    pub date_modify: Option<String>,
}

/// Fields for `crm.deal.add`.
#[derive(Debug, Clone, Default)]
pub struct NewDeal {
    pub title: String,
    pub amount: f64,
    pub currency: Option<String>,
    /// Paid deals go straight to the won stage.
    pub paid: bool,
    pub responsible_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub company_id: Option<i64>,
    pub category_id: Option<i64>,
    pub tax_registration: Option<String>,
    pub contract: bool,
    pub comments: Option<String>,
}

/// Fields for `tasks.task.add`, bound to a deal.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub deal_id: String,
    pub tax_registration: Option<String>,
    pub contract: bool,
}
