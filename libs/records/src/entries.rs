//! Typed sub-collection entries.
//!
//! Field names serialize in camelCase. Absent optional fields are left out of
//! the stored JSON rather than written as `null`, and unknown fields are
//! dropped on decode.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::Collection;

/// A typed entry of one patient sub-collection.
pub trait Entry: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    const COLLECTION: Collection;
}

macro_rules! entry {
    ($ty:ty => $collection:ident) => {
        impl Entry for $ty {
            const COLLECTION: Collection = Collection::$collection;
        }
    };
}

/// Point in time, accepted as RFC 3339 or as a bare `YYYY-MM-DD` date
/// (midnight UTC). Always written back as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Self(parsed.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| Self(midnight.and_utc()))
            .ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "invalid date '{raw}', expected RFC 3339 or YYYY-MM-DD"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDetails {
    pub admission_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<Timestamp>,
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
}
entry!(AdmissionDetails => AdmissionDetails);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub oxygen_saturation: Option<f64>,
    #[serde(default = "Timestamp::now")]
    pub date_recorded: Timestamp,
}
entry!(VitalSigns => VitalSigns);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub surgeries: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub family_history: Vec<String>,
    #[serde(default = "Timestamp::now")]
    pub date_recorded: Timestamp,
}
entry!(MedicalHistory => MedicalHistory);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default)]
    pub administration_times: Vec<String>,
}
entry!(Medication => Medications);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub upcoming_procedures: Vec<String>,
    /// Set for every plan of a patient at once, see the approve endpoint.
    #[serde(default)]
    pub approved: bool,
}
entry!(TreatmentPlan => TreatmentPlans);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}
entry!(LabResult => LabResults);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImagingResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imaging_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}
entry!(ImagingResult => ImagingResults);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CareNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}
entry!(CareNote => CareNotes);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCareActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
entry!(ScheduledCareActivity => ScheduledCareActivities);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}
entry!(Alert => Alerts);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
}
entry!(InsuranceDetails => InsuranceDetails);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InterimPayment {
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(default = "Timestamp::now")]
    pub payment_date: Timestamp,
    #[validate(range(min = 0.0))]
    pub amount_paid: f64,
}

/// Billing entry. Amounts default to zero, text to empty, lists to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillingInformation {
    #[serde(default)]
    pub billing_status: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub pending_payments: f64,
    #[serde(default)]
    pub itemized_bill: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub initial_charges: f64,
    #[serde(default)]
    #[validate(nested)]
    pub interim_payments: Vec<InterimPayment>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub final_bill: f64,
    #[serde(default)]
    #[validate(nested)]
    pub payment_history: Vec<PaymentRecord>,
}
entry!(BillingInformation => BillingInformation);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsentForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<Timestamp>,
}
entry!(ConsentForm => ConsentForms);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DischargePlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_discharge_care: Option<String>,
}
entry!(DischargePlan => DischargePlanning);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(rename = "BMI", default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default = "Timestamp::now")]
    pub date: Timestamp,
}
entry!(Statistics => Statistics);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_times: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_success_rates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_satisfaction_scores: Option<String>,
}
entry!(PerformanceMetrics => PerformanceMetrics);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        alias = "visit_summary",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub visit_summary: Option<String>,
    #[serde(default)]
    pub diagnoses: Vec<String>,
    #[serde(alias = "follow_up", default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}
entry!(Appointment => Appointments);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BillingStage {
    #[validate(length(min = 1, message = "stage is required"))]
    pub stage: String,
    pub due_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub paid: bool,
}
entry!(BillingStage => BillingStages);

/// What a checkup cost and whether it has been settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckupPayment {
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub amount: f64,
    /// Id of the billing entry the charge was booked on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_id: Option<String>,
    #[serde(default)]
    pub paid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Checkup {
    #[serde(default = "Timestamp::now")]
    pub checkup_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub payment: Option<CheckupPayment>,
}
entry!(Checkup => Checkups);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Immunization {
    #[serde(alias = "immunization_name")]
    #[validate(length(min = 1, message = "immunizationName is required"))]
    pub immunization_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Timestamp>,
    #[serde(
        alias = "administered_by",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub administered_by: Option<String>,
}
entry!(Immunization => Immunizations);
