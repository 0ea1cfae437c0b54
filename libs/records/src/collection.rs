//! Sub-collections embedded in a patient record.

use std::fmt;
use std::str::FromStr;

use crate::RecordError;

/// Every sub-collection a patient record carries.
///
/// Each variant knows its URL path segment, the table that stores its
/// entries and the key it is reported under in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    AdmissionDetails,
    VitalSigns,
    MedicalHistory,
    Medications,
    TreatmentPlans,
    LabResults,
    ImagingResults,
    CareNotes,
    ScheduledCareActivities,
    Alerts,
    InsuranceDetails,
    BillingInformation,
    ConsentForms,
    DischargePlanning,
    Statistics,
    PerformanceMetrics,
    Appointments,
    BillingStages,
    Checkups,
    Immunizations,
}

impl Collection {
    pub const ALL: [Collection; 20] = [
        Collection::AdmissionDetails,
        Collection::VitalSigns,
        Collection::MedicalHistory,
        Collection::Medications,
        Collection::TreatmentPlans,
        Collection::LabResults,
        Collection::ImagingResults,
        Collection::CareNotes,
        Collection::ScheduledCareActivities,
        Collection::Alerts,
        Collection::InsuranceDetails,
        Collection::BillingInformation,
        Collection::ConsentForms,
        Collection::DischargePlanning,
        Collection::Statistics,
        Collection::PerformanceMetrics,
        Collection::Appointments,
        Collection::BillingStages,
        Collection::Checkups,
        Collection::Immunizations,
    ];

    /// Path segment under `/patients/:id/`.
    pub fn segment(self) -> &'static str {
        match self {
            Collection::AdmissionDetails => "admission",
            Collection::VitalSigns => "vital-signs",
            Collection::MedicalHistory => "medical-history",
            Collection::Medications => "medications",
            Collection::TreatmentPlans => "treatment-plans",
            Collection::LabResults => "lab-results",
            Collection::ImagingResults => "imaging-results",
            Collection::CareNotes => "care-notes",
            Collection::ScheduledCareActivities => "scheduled-care",
            Collection::Alerts => "alerts",
            Collection::InsuranceDetails => "insurance",
            Collection::BillingInformation => "billing",
            Collection::ConsentForms => "consent-forms",
            Collection::DischargePlanning => "discharge-planning",
            Collection::Statistics => "statistics",
            Collection::PerformanceMetrics => "performance-metrics",
            Collection::Appointments => "appointments",
            Collection::BillingStages => "billing-stages",
            Collection::Checkups => "checkups",
            Collection::Immunizations => "immunizations",
        }
    }

    /// Backing table name. Only ever interpolated from this fixed set.
    pub fn table(self) -> &'static str {
        match self {
            Collection::AdmissionDetails => "admission_details",
            Collection::VitalSigns => "vital_signs",
            Collection::MedicalHistory => "medical_history",
            Collection::Medications => "medications",
            Collection::TreatmentPlans => "treatment_plans",
            Collection::LabResults => "lab_results",
            Collection::ImagingResults => "imaging_results",
            Collection::CareNotes => "care_notes",
            Collection::ScheduledCareActivities => "scheduled_care_activities",
            Collection::Alerts => "alerts",
            Collection::InsuranceDetails => "insurance_details",
            Collection::BillingInformation => "billing_information",
            Collection::ConsentForms => "consent_forms",
            Collection::DischargePlanning => "discharge_planning",
            Collection::Statistics => "statistics",
            Collection::PerformanceMetrics => "performance_metrics",
            Collection::Appointments => "appointments",
            Collection::BillingStages => "billing_stages",
            Collection::Checkups => "checkups",
            Collection::Immunizations => "immunizations",
        }
    }

    /// JSON key the collection is reported under.
    pub fn response_key(self) -> &'static str {
        match self {
            Collection::AdmissionDetails => "admissionDetails",
            Collection::VitalSigns => "vitalSigns",
            Collection::MedicalHistory => "medicalHistory",
            Collection::Medications => "medications",
            Collection::TreatmentPlans => "treatmentPlans",
            Collection::LabResults => "labResults",
            Collection::ImagingResults => "imagingResults",
            Collection::CareNotes => "careNotes",
            Collection::ScheduledCareActivities => "scheduledCareActivities",
            Collection::Alerts => "alerts",
            Collection::InsuranceDetails => "insuranceDetails",
            Collection::BillingInformation => "billingInformation",
            Collection::ConsentForms => "consentForms",
            Collection::DischargePlanning => "dischargePlanning",
            Collection::Statistics => "statistics",
            Collection::PerformanceMetrics => "performanceMetrics",
            Collection::Appointments => "appointments",
            Collection::BillingStages => "billingStages",
            Collection::Checkups => "checkups",
            Collection::Immunizations => "immunizations",
        }
    }

    /// Human label used in "X not found" messages.
    pub fn label(self) -> &'static str {
        match self {
            Collection::AdmissionDetails => "Admission details",
            Collection::VitalSigns => "Vital signs",
            Collection::MedicalHistory => "Medical history",
            Collection::Medications => "Medication",
            Collection::TreatmentPlans => "Treatment plan",
            Collection::LabResults => "Lab result",
            Collection::ImagingResults => "Imaging result",
            Collection::CareNotes => "Care note",
            Collection::ScheduledCareActivities => "Scheduled care activity",
            Collection::Alerts => "Alert",
            Collection::InsuranceDetails => "Insurance details",
            Collection::BillingInformation => "Billing information",
            Collection::ConsentForms => "Consent form",
            Collection::DischargePlanning => "Discharge planning",
            Collection::Statistics => "Statistics",
            Collection::PerformanceMetrics => "Performance metrics",
            Collection::Appointments => "Appointment",
            Collection::BillingStages => "Billing stage",
            Collection::Checkups => "Checkup",
            Collection::Immunizations => "Immunization",
        }
    }

    /// Whether an untouched record reports this collection as `[]`.
    ///
    /// The remaining collections start unset: reading them before the first
    /// append is NotFound rather than an empty list.
    pub fn initialized_by_default(self) -> bool {
        !matches!(
            self,
            Collection::AdmissionDetails
                | Collection::VitalSigns
                | Collection::MedicalHistory
                | Collection::BillingStages
        )
    }

    /// Whether entries can be hard-deleted individually.
    pub fn supports_removal(self) -> bool {
        matches!(
            self,
            Collection::Medications | Collection::Appointments | Collection::BillingStages
        )
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for Collection {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.segment() == s || c.table() == s)
            .ok_or_else(|| RecordError::Invalid {
                context: "collection",
                message: format!("unknown collection '{s}'"),
            })
    }
}
