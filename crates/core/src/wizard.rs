//! The multi-step admission wizard.
//!
//! Steps only group fields; the operator may move between them freely and nothing is
//! validated until submit. The wizard also owns the patient option list and the inline
//! quick-add form.

use crate::admission::{Admission, AdmissionDraft};
use crate::display::patient_option_label;
use crate::patient::{BirthdatePolicy, Patient, PatientDraft};
use crate::repositories::admissions::AdmissionService;
use crate::repositories::patients::PatientService;
use crate::TraumaResult;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardStep {
    #[default]
    PatientAndInjury,
    History,
    Vitals,
    ExamAndLabs,
    Diagnosis,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::PatientAndInjury,
        WizardStep::History,
        WizardStep::Vitals,
        WizardStep::ExamAndLabs,
        WizardStep::Diagnosis,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::PatientAndInjury => "Patient & Injury",
            WizardStep::History => "History",
            WizardStep::Vitals => "Vitals",
            WizardStep::ExamAndLabs => "Exam & Labs",
            WizardStep::Diagnosis => "Diagnosis",
        }
    }

    fn index(&self) -> usize {
        WizardStep::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }
}

/// A patient choice in the wizard's option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientOption {
    pub id: String,
    pub label: String,
}

impl From<&Patient> for PatientOption {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            label: patient_option_label(patient),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdmissionWizard {
    step: WizardStep,
    pub draft: AdmissionDraft,
    patients: Vec<Patient>,
    quick_add: Option<PatientDraft>,
    error: Option<String>,
}

impl AdmissionWizard {
    pub fn new(patients: Vec<Patient>) -> Self {
        Self {
            patients,
            ..Self::default()
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn go_to(&mut self, step: WizardStep) {
        self.step = step;
    }

    pub fn next(&mut self) {
        let i = (self.step.index() + 1).min(WizardStep::ALL.len() - 1);
        self.step = WizardStep::ALL[i];
    }

    pub fn back(&mut self) {
        self.step = WizardStep::ALL[self.step.index().saturating_sub(1)];
    }

    pub fn is_last_step(&self) -> bool {
        self.step == WizardStep::Diagnosis
    }

    /// The blocking error from the last submit or quick add, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn options(&self) -> Vec<PatientOption> {
        self.patients.iter().map(PatientOption::from).collect()
    }

    /// Options whose label contains `text`, ignoring case.
    pub fn search_options(&self, text: &str) -> Vec<PatientOption> {
        let needle = text.trim().to_lowercase();
        self.options()
            .into_iter()
            .filter(|o| o.label.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn select_patient(&mut self, patient_id: &str) {
        self.draft.patient_id = patient_id.to_string();
    }

    pub fn selected_patient(&self) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == self.draft.patient_id)
    }

    pub fn open_quick_add(&mut self) {
        self.quick_add.get_or_insert_with(PatientDraft::default);
    }

    pub fn close_quick_add(&mut self) {
        self.quick_add = None;
    }

    pub fn quick_add_form(&mut self) -> Option<&mut PatientDraft> {
        self.quick_add.as_mut()
    }

    /// Creates the patient typed into the quick-add form and selects it.
    ///
    /// The new patient is put at the top of the option list; the list is not re-fetched.
    /// On failure the form stays open with the error recorded.
    pub async fn quick_add(
        &mut self,
        patients: &PatientService,
        policy: BirthdatePolicy,
        today: NaiveDate,
    ) -> TraumaResult<Patient> {
        let draft = self.quick_add.clone().unwrap_or_default();
        match patients.create(&draft, None, policy, today).await {
            Ok(patient) => {
                self.patients.insert(0, patient.clone());
                self.draft.patient_id = patient.id.clone();
                self.quick_add = None;
                self.error = None;
                Ok(patient)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Validates the whole draft once and inserts it.
    ///
    /// On success the wizard is reset to an empty draft on the first step; the option list
    /// is kept.
    pub async fn submit(&mut self, admissions: &AdmissionService) -> TraumaResult<Admission> {
        match admissions.create(&self.draft).await {
            Ok(admission) => {
                self.reset();
                Ok(admission)
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.step = WizardStep::default();
        self.draft = AdmissionDraft::default();
        self.quick_add = None;
        self.error = None;
    }
}
