//! Sub-collection CRUD, one implementation for every entry type.

use carebase_records::{
    decode_entry, encode_entry,
    entries::{BillingInformation, PaymentRecord, TreatmentPlan},
    merge_entry, Collection, Entry,
};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::require_patient;
use crate::{db::RecordStore, models::StoredEntry, Error, Result};

pub struct EntryService {
    store: Arc<dyn RecordStore>,
}

impl EntryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Decode, validate and append an entry; returns the whole collection.
    ///
    /// The first append to a collection initialises it.
    pub async fn append<T: Entry>(
        &self,
        patient_id: Uuid,
        payload: JsonValue,
    ) -> Result<Vec<StoredEntry>> {
        require_patient(self.store.as_ref(), patient_id).await?;

        let entry: T = decode_entry(payload)?;
        let stored = StoredEntry::new(encode_entry(&entry)?);
        self.store
            .append_entry(patient_id, T::COLLECTION, &stored)
            .await?;

        tracing::debug!(
            patient_id = %patient_id,
            collection = %T::COLLECTION,
            entry_id = %stored.id,
            "Entry appended"
        );
        self.list::<T>(patient_id).await
    }

    /// Entries in insertion order.
    ///
    /// Collections that start unset report NotFound until the first append.
    pub async fn list<T: Entry>(&self, patient_id: Uuid) -> Result<Vec<StoredEntry>> {
        require_patient(self.store.as_ref(), patient_id).await?;

        match self.store.list_entries(patient_id, T::COLLECTION).await? {
            Some(entries) => Ok(entries),
            None if T::COLLECTION.initialized_by_default() => Ok(Vec::new()),
            None => Err(Error::not_found(T::COLLECTION.label())),
        }
    }

    pub async fn get<T: Entry>(&self, patient_id: Uuid, entry_id: Uuid) -> Result<StoredEntry> {
        require_patient(self.store.as_ref(), patient_id).await?;
        self.find(patient_id, T::COLLECTION, entry_id).await
    }

    /// Shallow-merge `patch` over the stored entry and persist the touched
    /// fields only.
    pub async fn update<T: Entry>(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        patch: JsonValue,
    ) -> Result<StoredEntry> {
        require_patient(self.store.as_ref(), patient_id).await?;
        let current = self.find(patient_id, T::COLLECTION, entry_id).await?;

        let outcome = merge_entry::<T>(&current.fields, patch)?;
        if outcome.is_noop() {
            return Ok(current);
        }

        self.store
            .merge_entry(
                patient_id,
                T::COLLECTION,
                entry_id,
                &outcome.set,
                &outcome.removed,
            )
            .await?
            .ok_or_else(|| Error::not_found(T::COLLECTION.label()))
    }

    pub async fn remove<T: Entry>(&self, patient_id: Uuid, entry_id: Uuid) -> Result<()> {
        if !T::COLLECTION.supports_removal() {
            return Err(Error::Validation(format!(
                "{} entries cannot be removed",
                T::COLLECTION.label()
            )));
        }
        require_patient(self.store.as_ref(), patient_id).await?;

        if !self
            .store
            .remove_entry(patient_id, T::COLLECTION, entry_id)
            .await?
        {
            return Err(Error::not_found(T::COLLECTION.label()));
        }
        tracing::debug!(
            patient_id = %patient_id,
            collection = %T::COLLECTION,
            entry_id = %entry_id,
            "Entry removed"
        );
        Ok(())
    }

    /// Record a payment against one billing entry.
    pub async fn append_payment(
        &self,
        patient_id: Uuid,
        entry_id: Uuid,
        payload: JsonValue,
    ) -> Result<StoredEntry> {
        require_patient(self.store.as_ref(), patient_id).await?;

        let payment: PaymentRecord = serde_json::from_value(payload)
            .map_err(|e| Error::Validation(format!("Malformed payment: {e}")))?;
        payment.validate().map_err(|e| {
            Error::Validation(format!(
                "Invalid payment: {}",
                carebase_records::error::describe_validation_errors(&e)
            ))
        })?;
        let payment = serde_json::to_value(&payment)
            .map_err(|e| Error::Internal(format!("serialization failed: {e}")))?;

        self.store
            .append_payment(patient_id, entry_id, payment)
            .await?
            .ok_or_else(|| Error::not_found(BillingInformation::COLLECTION.label()))
    }

    /// Mark every treatment plan of the patient approved; returns the plans.
    ///
    /// Plans already approved are left untouched.
    pub async fn approve_treatment_plans(&self, patient_id: Uuid) -> Result<Vec<StoredEntry>> {
        let plans = self.list::<TreatmentPlan>(patient_id).await?;

        let mut approved = Map::new();
        approved.insert("approved".to_string(), JsonValue::Bool(true));

        let mut updated = Vec::with_capacity(plans.len());
        for plan in plans {
            if plan.fields.get("approved") == Some(&JsonValue::Bool(true)) {
                updated.push(plan);
                continue;
            }
            // A plan removed meanwhile simply drops out of the result.
            if let Some(plan) = self
                .store
                .merge_entry(patient_id, TreatmentPlan::COLLECTION, plan.id, &approved, &[])
                .await?
            {
                updated.push(plan);
            }
        }

        tracing::info!(
            patient_id = %patient_id,
            plans = updated.len(),
            "Treatment plans approved"
        );
        Ok(updated)
    }

    async fn find(
        &self,
        patient_id: Uuid,
        collection: Collection,
        entry_id: Uuid,
    ) -> Result<StoredEntry> {
        self.store
            .get_entry(patient_id, collection, entry_id)
            .await?
            .ok_or_else(|| Error::not_found(collection.label()))
    }
}
