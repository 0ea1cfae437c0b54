//! Registration, sign-in and password reset.

use carebase_records::{
    account::{ForgotPassword, Login, NewPassword},
    patient::Registration,
    MedicalRecordNumber,
};
use chrono::{Duration, Utc};
use std::future::Future;
use std::sync::Arc;

use crate::{
    auth::{TokenIssuer, TokenPurpose},
    config::Config,
    credentials::{digest_token, digests_match, CredentialHasher},
    db::RecordStore,
    error::UniqueKey,
    mail::{self, MailSender},
    metrics::{LOGINS_TOTAL, MRN_COLLISIONS_TOTAL, REGISTRATIONS_TOTAL},
    models::{PatientRecord, PatientSummary},
    Error, Result,
};

/// Fresh record numbers drawn before registration gives up.
pub const MRN_ALLOCATION_ATTEMPTS: u32 = 5;

/// Outcome of a successful sign-in.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
    pub patient: PatientSummary,
}

pub struct AccountService {
    store: Arc<dyn RecordStore>,
    tokens: Arc<TokenIssuer>,
    hasher: CredentialHasher,
    mailer: Arc<dyn MailSender>,
    mail_from: String,
    reset_link_base_url: String,
    reset_ttl: Duration,
}

impl AccountService {
    pub fn new(
        config: &Config,
        store: Arc<dyn RecordStore>,
        tokens: Arc<TokenIssuer>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            store,
            tokens,
            hasher: CredentialHasher::new(config.auth.password_hash_iterations),
            mailer,
            mail_from: config.mail.from.clone(),
            reset_link_base_url: config.mail.reset_link_base_url.clone(),
            reset_ttl: Duration::seconds(config.auth.reset_token_ttl_seconds as i64),
        }
    }

    /// Create a record and mail its medical record number to the patient.
    pub async fn register(&self, registration: Registration) -> Result<PatientSummary> {
        let (profile, password) = registration.into_parts()?;

        if self
            .store
            .find_patient_by_email(&profile.contact_information.email)
            .await?
            .is_some()
        {
            REGISTRATIONS_TOTAL.with_label_values(&["conflict"]).inc();
            return Err(duplicate_email());
        }

        let credential_hash = self.hasher.hash_blocking(password).await?;

        let result = insert_with_fresh_mrn(MedicalRecordNumber::generate, |mrn| {
            let record = PatientRecord::new(profile.clone(), credential_hash.clone(), mrn);
            async move {
                self.store.insert_patient(&record).await?;
                Ok(record)
            }
        })
        .await;

        let record = match result {
            Ok(record) => record,
            Err(Error::Duplicate(UniqueKey::Email)) => {
                REGISTRATIONS_TOTAL.with_label_values(&["conflict"]).inc();
                return Err(duplicate_email());
            }
            Err(e) => {
                REGISTRATIONS_TOTAL.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };

        REGISTRATIONS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(patient_id = %record.id, "Patient registered");

        mail::dispatch(
            self.mailer.clone(),
            self.mail_from.clone(),
            mail::registration_message(
                &record.profile.contact_information.email,
                &record.profile.full_name,
                record.medical_record_number.as_str(),
            ),
        );

        Ok(record.summary())
    }

    /// Check a medical record number and password and open a session.
    pub async fn login(&self, login: Login) -> Result<Session> {
        let mrn = login.medical_record_number.trim();
        let Some(record) = self.store.find_patient_by_mrn(mrn).await? else {
            LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            return Err(Error::InvalidCredentials);
        };

        let verified = self
            .hasher
            .verify_blocking(login.password, record.credential_hash.clone())
            .await?;
        if !verified {
            LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            tracing::info!(patient_id = %record.id, "Login rejected");
            return Err(Error::InvalidCredentials);
        }

        let token = self.tokens.issue(
            record.id,
            record.medical_record_number.as_str(),
            TokenPurpose::Session,
        )?;
        LOGINS_TOTAL.with_label_values(&["success"]).inc();

        Ok(Session {
            token,
            expires_in: self.tokens.session_ttl_seconds(),
            patient: record.summary(),
        })
    }

    /// Issue a single-use reset token and mail the link.
    pub async fn forgot_password(&self, request: ForgotPassword) -> Result<()> {
        let request = request.validated()?;
        let Some(record) = self.store.find_patient_by_email(&request.email).await? else {
            return Err(Error::not_found("Patient"));
        };

        let token = self.tokens.issue(
            record.id,
            record.medical_record_number.as_str(),
            TokenPurpose::PasswordReset,
        )?;

        let expires_at = Utc::now() + self.reset_ttl;
        if !self
            .store
            .set_reset_token(record.id, &digest_token(&token), expires_at)
            .await?
        {
            return Err(Error::not_found("Patient"));
        }

        let link = format!(
            "{}/{}",
            self.reset_link_base_url.trim_end_matches('/'),
            token
        );
        mail::dispatch(
            self.mailer.clone(),
            self.mail_from.clone(),
            mail::password_reset_message(
                &record.profile.contact_information.email,
                &link,
                self.reset_ttl.num_minutes(),
            ),
        );

        tracing::info!(patient_id = %record.id, "Password reset requested");
        Ok(())
    }

    /// Replace the credential using a reset token. The token is spent.
    pub async fn reset_password(&self, token: &str, request: NewPassword) -> Result<()> {
        let request = request.validated()?;

        let claims = self
            .tokens
            .verify(token, TokenPurpose::PasswordReset)
            .ok_or(Error::InvalidResetToken)?;
        let record = self
            .store
            .find_patient(claims.sub)
            .await?
            .ok_or(Error::InvalidResetToken)?;

        // Cheap check first so unusable tokens never pay for a hash.
        let digest = digest_token(token);
        let outstanding = match (&record.reset_token_hash, record.reset_token_expires_at) {
            (Some(stored), Some(expires_at)) => {
                expires_at > Utc::now() && digests_match(stored, &digest)
            }
            _ => false,
        };
        if !outstanding {
            return Err(Error::InvalidResetToken);
        }

        let credential_hash = self.hasher.hash_blocking(request.password).await?;
        if !self
            .store
            .redeem_reset_token(record.id, &digest, Utc::now(), &credential_hash)
            .await?
        {
            return Err(Error::InvalidResetToken);
        }

        tracing::info!(patient_id = %record.id, "Password reset completed");
        Ok(())
    }
}

fn duplicate_email() -> Error {
    Error::Conflict("A patient with this email already exists".to_string())
}

/// Insert under freshly drawn record numbers until one is not taken.
///
/// Only a record-number conflict triggers another draw; every other error
/// is returned as is.
async fn insert_with_fresh_mrn<G, F, Fut, T>(mut generate: G, mut insert: F) -> Result<T>
where
    G: FnMut() -> MedicalRecordNumber,
    F: FnMut(MedicalRecordNumber) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=MRN_ALLOCATION_ATTEMPTS {
        match insert(generate()).await {
            Err(Error::Duplicate(UniqueKey::MedicalRecordNumber)) => {
                MRN_COLLISIONS_TOTAL.inc();
                tracing::warn!(attempt, "Medical record number collision, drawing again");
            }
            other => return other,
        }
    }

    Err(Error::Internal(format!(
        "no unique medical record number after {MRN_ALLOCATION_ATTEMPTS} attempts"
    )))
}
