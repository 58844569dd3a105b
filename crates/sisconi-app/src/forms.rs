// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;
use time::macros::date;

use crate::{ChildId, FormKind, Role, ScheduleId, Sex, VaccineId, VisitId};

const BLANK_DATE: Date = date!(1970 - 01 - 01);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFormInput {
    pub first_names: String,
    pub last_names: String,
    pub document_number: String,
    pub role: Role,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccineFormInput {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleFormInput {
    pub vaccine_id: VaccineId,
    pub dose_number: i32,
    pub target_age_months: i32,
    pub min_interval_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianInput {
    pub first_names: String,
    pub last_names: String,
    pub document_number: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInput {
    pub first_names: String,
    pub last_names: String,
    pub document_number: String,
    pub birth_date: Date,
    pub sex: Sex,
}

/// The pediatric quick-registration: guardian and child created together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFormInput {
    pub guardian: GuardianInput,
    pub child: ChildInput,
    pub relationship: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitFormInput {
    pub child_id: ChildId,
    pub attended_on: Date,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFormInput {
    pub visit_id: VisitId,
    pub schedule_id: ScheduleId,
    pub applied_on: Date,
    pub lot: Option<String>,
    pub next_due: Option<Date>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPayload {
    User(UserFormInput),
    Vaccine(VaccineFormInput),
    Schedule(ScheduleFormInput),
    Registration(Box<RegistrationFormInput>),
    Visit(VisitFormInput),
    Application(ApplicationFormInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::User(_) => FormKind::User,
            Self::Vaccine(_) => FormKind::Vaccine,
            Self::Schedule(_) => FormKind::ScheduleDose,
            Self::Registration(_) => FormKind::Registration,
            Self::Visit(_) => FormKind::Visit,
            Self::Application(_) => FormKind::Application,
        }
    }

    pub fn blank_for(kind: FormKind) -> Self {
        match kind {
            FormKind::User => Self::User(UserFormInput {
                first_names: String::new(),
                last_names: String::new(),
                document_number: String::new(),
                role: Role::Representative,
                password: String::new(),
            }),
            FormKind::Vaccine => Self::Vaccine(VaccineFormInput {
                name: String::new(),
                description: String::new(),
            }),
            FormKind::ScheduleDose => Self::Schedule(ScheduleFormInput {
                vaccine_id: VaccineId::new(0),
                dose_number: 1,
                target_age_months: 0,
                min_interval_days: None,
            }),
            FormKind::Registration => Self::Registration(Box::new(RegistrationFormInput {
                guardian: GuardianInput {
                    first_names: String::new(),
                    last_names: String::new(),
                    document_number: String::new(),
                    password: String::new(),
                },
                child: ChildInput {
                    first_names: String::new(),
                    last_names: String::new(),
                    document_number: String::new(),
                    birth_date: BLANK_DATE,
                    sex: Sex::Male,
                },
                relationship: "madre".to_owned(),
                is_primary: true,
            })),
            FormKind::Visit => Self::Visit(VisitFormInput {
                child_id: ChildId::new(0),
                attended_on: BLANK_DATE,
                weight_kg: 0.0,
                height_cm: 0.0,
                notes: String::new(),
            }),
            FormKind::Application => Self::Application(ApplicationFormInput {
                visit_id: VisitId::new(0),
                schedule_id: ScheduleId::new(0),
                applied_on: BLANK_DATE,
                lot: None,
                next_due: None,
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::User(user) => user.validate(),
            Self::Vaccine(vaccine) => vaccine.validate(),
            Self::Schedule(schedule) => schedule.validate(),
            Self::Registration(registration) => registration.validate(),
            Self::Visit(visit) => visit.validate(),
            Self::Application(application) => application.validate(),
        }
    }
}

impl UserFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.first_names.trim().is_empty() || self.last_names.trim().is_empty() {
            bail!("user names are required -- enter nombres and apellidos and retry");
        }
        if self.document_number.trim().is_empty() {
            bail!("user document number is required -- enter a document and retry");
        }
        if self.password.is_empty() {
            bail!("user password is required -- enter a password and retry");
        }
        Ok(())
    }
}

impl VaccineFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("vaccine name is required -- enter a name and retry");
        }
        Ok(())
    }
}

impl ScheduleFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.vaccine_id.get() <= 0 {
            bail!("schedule vaccine is required -- choose a vaccine and retry");
        }
        if self.dose_number < 1 {
            bail!("schedule dose number must be at least 1");
        }
        if self.target_age_months < 0 {
            bail!("schedule target age cannot be negative");
        }
        if let Some(interval) = self.min_interval_days
            && interval <= 0
        {
            bail!("schedule minimum interval must be positive when set");
        }
        Ok(())
    }
}

impl RegistrationFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.guardian.first_names.trim().is_empty()
            || self.guardian.last_names.trim().is_empty()
        {
            bail!("guardian names are required -- complete the representative and retry");
        }
        if self.guardian.document_number.trim().is_empty() {
            bail!("guardian document number is required");
        }
        if self.guardian.password.is_empty() {
            bail!("guardian password is required");
        }
        if self.child.first_names.trim().is_empty() || self.child.last_names.trim().is_empty() {
            bail!("child names are required -- complete the child and retry");
        }
        if self.child.document_number.trim().is_empty() {
            bail!("child document number is required");
        }
        if self.relationship.trim().is_empty() {
            bail!("relationship is required -- madre, padre, or tutor");
        }
        Ok(())
    }
}

impl VisitFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.child_id.get() <= 0 {
            bail!("visit child is required -- choose a child and retry");
        }
        if self.weight_kg <= 0.0 {
            bail!("visit weight must be positive, in kilograms");
        }
        if self.height_cm <= 0.0 {
            bail!("visit height must be positive, in centimeters");
        }
        Ok(())
    }
}

impl ApplicationFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.visit_id.get() <= 0 {
            bail!("application visit is required -- create a visit first and retry");
        }
        if self.schedule_id.get() <= 0 {
            bail!("application dose is required -- choose a schedule dose and retry");
        }
        if let Some(next_due) = self.next_due
            && next_due < self.applied_on
        {
            bail!("application next date must be on/after the application date");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ApplicationFormInput, FormPayload, ScheduleFormInput, UserFormInput, VisitFormInput,
    };
    use crate::{ChildId, FormKind, Role, ScheduleId, VaccineId, VisitId};
    use time::macros::date;

    #[test]
    fn blank_payload_exists_for_every_form() {
        for kind in [
            FormKind::User,
            FormKind::Vaccine,
            FormKind::ScheduleDose,
            FormKind::Registration,
            FormKind::Visit,
            FormKind::Application,
        ] {
            assert_eq!(FormPayload::blank_for(kind).kind(), kind);
        }
    }

    #[test]
    fn user_validation_rejects_missing_password() {
        let payload = FormPayload::User(UserFormInput {
            first_names: "Ana".to_owned(),
            last_names: "Mera".to_owned(),
            document_number: "1304".to_owned(),
            role: Role::Representative,
            password: String::new(),
        });
        assert!(payload.validate().is_err());
    }

    #[test]
    fn schedule_validation_rejects_dose_zero() {
        let payload = FormPayload::Schedule(ScheduleFormInput {
            vaccine_id: VaccineId::new(1),
            dose_number: 0,
            target_age_months: 2,
            min_interval_days: None,
        });
        assert!(payload.validate().is_err());
    }

    #[test]
    fn schedule_validation_rejects_non_positive_interval() {
        let payload = FormPayload::Schedule(ScheduleFormInput {
            vaccine_id: VaccineId::new(1),
            dose_number: 2,
            target_age_months: 4,
            min_interval_days: Some(0),
        });
        assert!(payload.validate().is_err());
    }

    #[test]
    fn visit_validation_rejects_non_positive_measurements() {
        let payload = FormPayload::Visit(VisitFormInput {
            child_id: ChildId::new(5),
            attended_on: date!(2026 - 02 - 01),
            weight_kg: 0.0,
            height_cm: 84.0,
            notes: String::new(),
        });
        assert!(payload.validate().is_err());
    }

    #[test]
    fn application_validation_rejects_backwards_next_date() {
        let payload = FormPayload::Application(ApplicationFormInput {
            visit_id: VisitId::new(12),
            schedule_id: ScheduleId::new(3),
            applied_on: date!(2026 - 02 - 10),
            lot: Some("L-204".to_owned()),
            next_due: Some(date!(2026 - 02 - 09)),
        });
        assert!(payload.validate().is_err());
    }

    #[test]
    fn registration_blank_defaults_to_primary_mother() {
        let FormPayload::Registration(registration) = FormPayload::blank_for(FormKind::Registration)
        else {
            panic!("registration blank expected");
        };
        assert!(registration.is_primary);
        assert_eq!(registration.relationship, "madre");
    }
}
