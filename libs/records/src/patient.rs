//! Patient demographics and the payloads that create or change them.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{RecordError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
}

/// Demographic part of a patient record, stored as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 150))]
    pub age: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[validate(nested)]
    pub contact_information: ContactInformation,
    #[serde(default)]
    #[validate(nested)]
    pub emergency_contact: EmergencyContact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_observations: Option<String>,
    #[serde(default)]
    pub profile_picture: String,
}

impl PatientProfile {
    /// Lower-cased contact email, the key registration uniqueness is checked on.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.contact_information.email)
    }

    /// Apply a partial update in place and re-validate.
    pub fn apply(&mut self, update: PatientUpdate) -> Result<()> {
        update
            .validate()
            .map_err(|e| RecordError::invalid("patient update", e))?;

        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
        }
        if let Some(age) = update.age {
            self.age = Some(age);
        }
        if let Some(gender) = update.gender {
            self.gender = Some(gender);
        }
        if let Some(observations) = update.patient_observations {
            self.patient_observations = Some(observations);
        }
        if let Some(picture) = update.profile_picture {
            self.profile_picture = picture;
        }
        if let Some(contact) = update.contact_information {
            if let Some(phone) = contact.phone_number {
                self.contact_information.phone_number = Some(phone);
            }
            if let Some(address) = contact.address {
                self.contact_information.address = Some(address);
            }
        }
        if let Some(emergency) = update.emergency_contact {
            self.emergency_contact.apply(emergency);
        }

        self.validate()
            .map_err(|e| RecordError::invalid("patient", e))
    }
}

impl EmergencyContact {
    /// Field-wise overwrite; fields absent from the update are kept.
    pub fn apply(&mut self, update: EmergencyContactUpdate) {
        if let Some(name) = update.name {
            self.name = Some(name);
        }
        if let Some(phone) = update.phone_number {
            self.phone_number = Some(phone);
        }
        if let Some(relationship) = update.relationship {
            self.relationship = Some(relationship);
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
    }
}

/// Registration payload: the profile plus the plaintext secret.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(range(max = 150))]
    pub age: Option<u16>,
    #[serde(default)]
    pub gender: Option<String>,
    #[validate(nested)]
    pub contact_information: ContactInformation,
    #[serde(default)]
    #[validate(nested)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub patient_observations: Option<String>,
    #[validate(length(
        min = 8,
        max = 128,
        message = "password must be between 8 and 128 characters"
    ))]
    pub password: String,
}

impl Registration {
    /// Validate and split into the stored profile and the secret to hash.
    pub fn into_parts(mut self) -> Result<(PatientProfile, String)> {
        self.full_name = self.full_name.trim().to_string();
        self.contact_information.email = self.contact_information.email.trim().to_string();
        self.validate()
            .map_err(|e| RecordError::invalid("registration", e))?;

        let profile = PatientProfile {
            full_name: self.full_name,
            age: self.age,
            gender: self.gender,
            contact_information: self.contact_information,
            emergency_contact: self.emergency_contact,
            patient_observations: self.patient_observations,
            profile_picture: String::new(),
        };
        Ok((profile, self.password))
    }
}

/// Partial update of demographics. Identity fields (id, medical record
/// number, credential, contact email) are not part of this shape, so naming
/// them is rejected rather than silently ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatientUpdate {
    #[validate(length(min = 1, message = "full name cannot be empty"))]
    pub full_name: Option<String>,
    #[validate(range(max = 150))]
    pub age: Option<u16>,
    pub gender: Option<String>,
    pub patient_observations: Option<String>,
    pub profile_picture: Option<String>,
    pub contact_information: Option<ContactUpdate>,
    #[validate(nested)]
    pub emergency_contact: Option<EmergencyContactUpdate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactUpdate {
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmergencyContactUpdate {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub relationship: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
}

impl EmergencyContactUpdate {
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| RecordError::invalid("emergency contact", e))?;
        Ok(self)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
