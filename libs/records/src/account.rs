//! Account payloads: sign-in and password reset.

use serde::Deserialize;
use validator::Validate;

use crate::{RecordError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    pub medical_record_number: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPassword {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPassword {
    #[validate(length(
        min = 8,
        max = 128,
        message = "password must be between 8 and 128 characters"
    ))]
    pub password: String,
}

impl ForgotPassword {
    pub fn validated(mut self) -> Result<Self> {
        self.email = self.email.trim().to_string();
        self.validate()
            .map_err(|e| RecordError::invalid("forgot password", e))?;
        Ok(self)
    }
}

impl NewPassword {
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| RecordError::invalid("new password", e))?;
        Ok(self)
    }
}
