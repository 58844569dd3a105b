// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

//! Deterministic sample data for tests. Builders cycle through fixed pools,
//! so the same call always yields the same records -- no randomness, no
//! clock reads.

use sisconi_app::{
    ApplicationId, Child, ChildId, HistoryEntry, NextDose, Role, ScheduleDose, ScheduleId, Sex,
    User, UserId, Vaccine, VaccineApplication, VaccineId, VisitId,
};
use time::Date;
use time::macros::date;

const FIRST_NAMES: [&str; 10] = [
    "María José",
    "Luis",
    "Valentina",
    "Sebastián",
    "Camila",
    "Ángel",
    "Josué",
    "Emilia",
    "Nicolás",
    "Paula",
];

const LAST_NAMES: [&str; 10] = [
    "Cedeño", "Vera", "Zambrano", "Mendoza", "García", "Loor", "Álava", "Mero", "Pico", "Delgado",
];

const VACCINES: [(&str, &str); 6] = [
    ("BCG", "Tuberculosis"),
    ("Hepatitis B", "Dosis de nacimiento"),
    ("Pentavalente", "Difteria, tétanos, tos ferina, Hib y hepatitis B"),
    ("Polio", "Antipoliomielítica oral"),
    ("Rotavirus", "Gastroenteritis por rotavirus"),
    ("Neumococo", "Enfermedad neumocócica"),
];

const BASE_BIRTH: Date = date!(2024 - 01 - 15);

pub fn sample_users() -> Vec<User> {
    let roles = [Role::Admin, Role::Pediatrician, Role::Representative];
    (0..6)
        .map(|index| User {
            id: UserId::new(index as i64 + 1),
            document_number: format!("13{:08}", 10_000 + index * 7),
            first_names: FIRST_NAMES[index % FIRST_NAMES.len()].to_owned(),
            last_names: LAST_NAMES[index % LAST_NAMES.len()].to_owned(),
            role: roles[index % roles.len()],
        })
        .collect()
}

pub fn sample_vaccines() -> Vec<Vaccine> {
    VACCINES
        .iter()
        .enumerate()
        .map(|(index, (name, description))| Vaccine {
            id: VaccineId::new(index as i64 + 1),
            name: (*name).to_owned(),
            description: (*description).to_owned(),
            // The last catalog entry is retired, so deactivation paths get
            // exercised too.
            active: index + 1 < VACCINES.len(),
        })
        .collect()
}

pub fn sample_schedule() -> Vec<ScheduleDose> {
    let plan: [(usize, i32, i32, Option<i32>); 7] = [
        (0, 1, 0, None),
        (1, 1, 0, None),
        (2, 1, 2, None),
        (2, 2, 4, Some(60)),
        (2, 3, 6, Some(60)),
        (3, 1, 2, None),
        (3, 2, 4, Some(60)),
    ];
    plan.iter()
        .enumerate()
        .map(|(index, (vaccine, dose, age, interval))| ScheduleDose {
            schedule_id: ScheduleId::new(index as i64 + 1),
            vaccine_id: Some(VaccineId::new(*vaccine as i64 + 1)),
            vaccine_name: VACCINES[*vaccine].0.to_owned(),
            dose_number: *dose,
            target_age_months: *age,
            min_interval_days: *interval,
        })
        .collect()
}

pub fn sample_children(count: usize) -> Vec<Child> {
    let sexes = [Sex::Male, Sex::Female, Sex::Other];
    (0..count)
        .map(|index| Child {
            id: ChildId::new(index as i64 + 1),
            document_number: format!("09{:08}", 20_000 + index * 13),
            first_names: FIRST_NAMES[index % FIRST_NAMES.len()].to_owned(),
            last_names: LAST_NAMES[(index * 3) % LAST_NAMES.len()].to_owned(),
            birth_date: shifted_birth(index),
            sex: sexes[index % sexes.len()],
        })
        .collect()
}

fn shifted_birth(index: usize) -> Date {
    let mut date = BASE_BIRTH;
    for _ in 0..index {
        date = date.next_day().unwrap_or(date);
    }
    date
}

pub fn sample_next_doses() -> Vec<NextDose> {
    sample_schedule()
        .into_iter()
        .enumerate()
        .map(|(index, dose)| NextDose {
            schedule_id: dose.schedule_id,
            vaccine_name: dose.vaccine_name,
            dose_number: dose.dose_number,
            target_age_months: dose.target_age_months,
            recommended_date: date!(2026 - 03 - 01).replace_day((index as u8 % 27) + 1).ok(),
            status: if index % 3 == 0 {
                NextDose::OVERDUE_STATUS.to_owned()
            } else {
                "AL_DIA".to_owned()
            },
        })
        .collect()
}

pub fn sample_history() -> Vec<HistoryEntry> {
    sample_applications()
        .into_iter()
        .zip(sample_schedule())
        .map(|(application, dose)| HistoryEntry {
            vaccine_name: dose.vaccine_name,
            dose_number: Some(dose.dose_number),
            applied_on: Some(application.applied_on),
            note: application.lot.map(|lot| format!("lote {lot}")),
        })
        .collect()
}

pub fn sample_applications() -> Vec<VaccineApplication> {
    (0..4)
        .map(|index| VaccineApplication {
            id: ApplicationId::new(index + 1),
            visit_id: VisitId::new(index + 1),
            schedule_id: ScheduleId::new(index + 1),
            applied_on: date!(2026 - 01 - 08)
                .replace_day((index as u8 * 7) + 2)
                .unwrap_or(date!(2026 - 01 - 08)),
            lot: (index % 2 == 0).then(|| format!("L-{}", 200 + index)),
            next_due: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{sample_children, sample_next_doses, sample_schedule, sample_users, sample_vaccines};

    #[test]
    fn builders_are_deterministic() {
        assert_eq!(sample_children(8), sample_children(8));
        assert_eq!(sample_users(), sample_users());
        assert_eq!(sample_next_doses(), sample_next_doses());
    }

    #[test]
    fn catalog_has_one_retired_vaccine() {
        let vaccines = sample_vaccines();
        assert_eq!(vaccines.iter().filter(|vaccine| !vaccine.active).count(), 1);
    }

    #[test]
    fn schedule_references_catalog_entries() {
        let vaccines = sample_vaccines();
        for dose in sample_schedule() {
            assert!(
                vaccines
                    .iter()
                    .any(|vaccine| vaccine.name == dose.vaccine_name)
            );
        }
    }

    #[test]
    fn children_have_distinct_ids_and_documents() {
        let children = sample_children(10);
        for (index, child) in children.iter().enumerate() {
            for other in &children[index + 1..] {
                assert_ne!(child.id, other.id);
                assert_ne!(child.document_number, other.document_number);
            }
        }
    }
}
