//! Medical record numbers.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::RecordError;

pub const MRN_LENGTH: usize = 10;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Human-facing patient code: ten characters drawn from `A-Z0-9`.
///
/// Distinct from the opaque record id. Uniqueness is enforced by the store,
/// not by generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MedicalRecordNumber(String);

impl MedicalRecordNumber {
    /// Draw a fresh candidate from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..MRN_LENGTH)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MedicalRecordNumber {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == MRN_LENGTH
            && s
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(RecordError::InvalidMedicalRecordNumber(s.to_string()))
        }
    }
}

impl TryFrom<String> for MedicalRecordNumber {
    type Error = RecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MedicalRecordNumber> for String {
    fn from(value: MedicalRecordNumber) -> Self {
        value.0
    }
}

impl fmt::Display for MedicalRecordNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
