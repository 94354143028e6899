//! Statically declared form schemas.
//!
//! Each form names its fields, types, and validation explicitly; conversion
//! into application input is the single place malformed submissions are
//! turned into user-facing messages.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::posts::PostInput;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct FormError {
    pub message: String,
}

impl FormError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostForm {
    pub text: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub image: String,
}

impl PostForm {
    pub fn into_input(self) -> Result<PostInput, FormError> {
        let group_id = match self.group_id.trim() {
            "" => None,
            raw => Some(
                Uuid::parse_str(raw).map_err(|_| FormError::new("invalid group selection"))?,
            ),
        };

        let image = {
            let trimmed = self.image.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };

        Ok(PostInput {
            text: self.text,
            group_id,
            image,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
}
