//! Multipart form parsing for the profile and admin user forms.

use axum::extract::Multipart;
use tracing::debug;
use ums_core::images::{ImageError, ImageUpload, MAX_IMAGE_BYTES};
use ums_core::models::user::Role;

use crate::error::{AppError, AppResult};

/// Text fields and optional image from a user form. Every field is optional
/// here; each operation decides which ones it requires.
#[derive(Debug, Default)]
pub struct UserForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<Role>,
    pub is_blocked: Option<bool>,
    pub image: Option<ImageUpload>,
}

impl UserForm {
    /// Read all parts of `multipart`. Unknown fields are skipped and empty
    /// text values count as absent.
    pub async fn parse(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UserForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if name == "profileImage" {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(ImageError::TooLarge(bytes.len()).into());
                }
                form.image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
                continue;
            }

            let value = field.text().await?;
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match name.as_str() {
                "name" => form.name = Some(value.to_owned()),
                "email" => form.email = Some(value.to_owned()),
                "mobile" => form.mobile = Some(value.to_owned()),
                "role" => {
                    let role = value
                        .parse::<Role>()
                        .map_err(|e| AppError::Validation(e.to_string()))?;
                    form.role = Some(role);
                }
                "isBlocked" => form.is_blocked = Some(parse_bool(value)?),
                other => debug!(field = other, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }

    /// Name, email and mobile, or a validation error naming what is missing.
    pub fn required_identity(&self) -> AppResult<(&str, &str, &str)> {
        match (&self.name, &self.email, &self.mobile) {
            (Some(name), Some(email), Some(mobile)) => Ok((name, email, mobile)),
            _ => Err(AppError::Validation(
                "Name, email and mobile are required".into(),
            )),
        }
    }
}

fn parse_bool(value: &str) -> AppResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "isBlocked must be true or false, got '{value}'"
        ))),
    }
}
