// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;

use crate::ids::*;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "PEDIATRA")]
    Pediatrician,
    #[serde(rename = "REPRESENTANTE")]
    Representative,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Admin, Self::Pediatrician, Self::Representative];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Pediatrician => "PEDIATRA",
            Self::Representative => "REPRESENTANTE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "PEDIATRA" => Some(Self::Pediatrician),
            "REPRESENTANTE" => Some(Self::Representative),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "administración",
            Self::Pediatrician => "pediatría",
            Self::Representative => "representante",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "OTRO")]
    Other,
}

impl Sex {
    pub const ALL: [Self; 3] = [Self::Male, Self::Female, Self::Other];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Other => "OTRO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            "OTRO" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "numero_documento")]
    pub document_number: String,
    #[serde(rename = "nombres")]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    pub last_names: String,
    #[serde(rename = "rol")]
    pub role: Role,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vaccine {
    pub id: VaccineId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "activo", default = "active_default")]
    pub active: bool,
}

fn active_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDose {
    pub schedule_id: ScheduleId,
    #[serde(default)]
    pub vaccine_id: Option<VaccineId>,
    #[serde(rename = "vaccine_nombre")]
    pub vaccine_name: String,
    #[serde(rename = "dosis_numero")]
    pub dose_number: i32,
    #[serde(rename = "edad_objetivo_meses")]
    pub target_age_months: i32,
    #[serde(rename = "intervalo_min_dias", default)]
    pub min_interval_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: ChildId,
    #[serde(rename = "numero_documento")]
    pub document_number: String,
    #[serde(rename = "nombres")]
    pub first_names: String,
    #[serde(rename = "apellidos")]
    pub last_names: String,
    #[serde(rename = "fecha_nacimiento", with = "iso_date")]
    pub birth_date: Date,
    #[serde(rename = "sexo")]
    pub sex: Sex,
}

impl Child {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
    }

    /// Surname-first form used by pickers and default name ordering.
    pub fn listing_name(&self) -> String {
        format!("{} {}", self.last_names, self.first_names)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub child_id: ChildId,
    #[serde(rename = "fecha_atencion", with = "iso_date")]
    pub attended_on: Date,
    #[serde(rename = "peso_kg")]
    pub weight_kg: f64,
    #[serde(rename = "talla_cm")]
    pub height_cm: f64,
    #[serde(rename = "observaciones", default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccineApplication {
    pub id: ApplicationId,
    pub visit_id: VisitId,
    pub schedule_id: ScheduleId,
    #[serde(rename = "fecha_aplicacion", with = "iso_date")]
    pub applied_on: Date,
    #[serde(rename = "lote", default)]
    pub lot: Option<String>,
    #[serde(rename = "proxima_fecha", default, with = "iso_date::option")]
    pub next_due: Option<Date>,
}

/// One pending dose for a child. `status` ("estado") is computed by the
/// backend; the client never derives due-ness from dates and only recognizes
/// the overdue label for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextDose {
    pub schedule_id: ScheduleId,
    #[serde(rename = "vaccine_nombre")]
    pub vaccine_name: String,
    #[serde(rename = "dosis_numero")]
    pub dose_number: i32,
    #[serde(rename = "edad_objetivo_meses")]
    pub target_age_months: i32,
    #[serde(rename = "fecha_recomendada", default, with = "iso_date::option")]
    pub recommended_date: Option<Date>,
    #[serde(rename = "estado")]
    pub status: String,
}

impl NextDose {
    pub const OVERDUE_STATUS: &'static str = "ATRASADA";

    pub fn is_overdue(&self) -> bool {
        self.status == Self::OVERDUE_STATUS
    }
}

/// One applied-dose line of the printable record. The backend has shipped
/// several spellings of these fields over time, hence the aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "vaccine_nombre", alias = "vaccine", alias = "nombre")]
    pub vaccine_name: String,
    #[serde(rename = "dosis_numero", alias = "dosis", default)]
    pub dose_number: Option<i32>,
    #[serde(
        rename = "fecha_aplicacion",
        alias = "fecha_atencion",
        alias = "date",
        default,
        with = "iso_date::option"
    )]
    pub applied_on: Option<Date>,
    #[serde(rename = "observacion", alias = "note", default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OverviewCounts {
    pub users: usize,
    pub children: usize,
    pub active_vaccines: usize,
    pub schedule_doses: usize,
}

/// Whole months between birth and `today`, with the original day-of-month
/// adjustment: the month only counts once the birthday's day has passed.
pub fn age_in_months(birth_date: Date, today: Date) -> i32 {
    let mut months = (today.year() - birth_date.year()) * 12
        + (i32::from(u8::from(today.month())) - i32::from(u8::from(birth_date.month())));
    if today.day() < birth_date.day() {
        months -= 1;
    }
    months.max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Overview,
    Users,
    Children,
    Vaccines,
    Schedule,
    NextDoses,
    History,
}

impl TabKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overview => "resumen",
            Self::Users => "usuarios",
            Self::Children => "niños",
            Self::Vaccines => "vacunas",
            Self::Schedule => "esquema",
            Self::NextDoses => "próximas",
            Self::History => "historial",
        }
    }

    /// The tabs a signed-in role may see, in display order.
    pub const fn visible_for(role: Role) -> &'static [Self] {
        match role {
            Role::Admin => &[
                Self::Overview,
                Self::Users,
                Self::Children,
                Self::Vaccines,
                Self::Schedule,
            ],
            Role::Pediatrician => &[Self::Overview, Self::Children, Self::Schedule],
            Role::Representative => &[
                Self::Overview,
                Self::Children,
                Self::NextDoses,
                Self::History,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    User,
    Vaccine,
    ScheduleDose,
    Registration,
    Visit,
    Application,
}

impl FormKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::User => "crear usuario",
            Self::Vaccine => "crear vacuna",
            Self::ScheduleDose => "agregar dosis al esquema",
            Self::Registration => "registro rápido",
            Self::Visit => "crear visita",
            Self::Application => "aplicar vacuna",
        }
    }

    pub const fn allowed_for(self, role: Role) -> bool {
        match role {
            Role::Admin => matches!(self, Self::User | Self::Vaccine | Self::ScheduleDose),
            Role::Pediatrician => {
                matches!(self, Self::Registration | Self::Visit | Self::Application)
            }
            Role::Representative => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Form(FormKind),
}

#[cfg(test)]
mod tests {
    use super::{
        Child, NextDose, Role, Sex, TabKind, User, Vaccine, age_in_months,
    };
    use time::{Date, Month};

    fn date(year: i32, month: Month, day: u8) -> Date {
        Date::from_calendar_date(year, month, day).expect("valid test date")
    }

    #[test]
    fn role_round_trips_through_wire_strings() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("MEDICO"), None);
    }

    #[test]
    fn sex_round_trips_through_wire_strings() {
        for sex in Sex::ALL {
            assert_eq!(Sex::parse(sex.as_str()), Some(sex));
        }
        assert_eq!(Sex::parse("X"), None);
    }

    #[test]
    fn age_counts_whole_months_only() {
        let birth = date(2025, Month::March, 15);
        assert_eq!(age_in_months(birth, date(2025, Month::September, 15)), 6);
        assert_eq!(age_in_months(birth, date(2025, Month::September, 14)), 5);
        assert_eq!(age_in_months(birth, date(2026, Month::March, 14)), 11);
    }

    #[test]
    fn age_never_goes_negative() {
        let birth = date(2026, Month::June, 1);
        assert_eq!(age_in_months(birth, date(2026, Month::May, 1)), 0);
    }

    #[test]
    fn user_decodes_spanish_wire_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":7,"numero_documento":"1312456789","nombres":"María José","apellidos":"Cedeño","rol":"PEDIATRA"}"#,
        )
        .expect("user should decode");
        assert_eq!(user.role, Role::Pediatrician);
        assert_eq!(user.full_name(), "María José Cedeño");
    }

    #[test]
    fn vaccine_defaults_to_active_when_flag_is_absent() {
        let vaccine: Vaccine =
            serde_json::from_str(r#"{"id":1,"nombre":"BCG"}"#).expect("vaccine should decode");
        assert!(vaccine.active);
        assert_eq!(vaccine.description, "");
    }

    #[test]
    fn child_birth_date_uses_iso_form() {
        let child: Child = serde_json::from_str(
            r#"{"id":3,"numero_documento":"1399","nombres":"Luis","apellidos":"Vera","fecha_nacimiento":"2024-11-03","sexo":"M"}"#,
        )
        .expect("child should decode");
        assert_eq!(child.birth_date, date(2024, Month::November, 3));
        assert_eq!(child.listing_name(), "Vera Luis");
    }

    #[test]
    fn overdue_flag_only_recognizes_the_server_label() {
        let overdue: NextDose = serde_json::from_str(
            r#"{"schedule_id":9,"vaccine_nombre":"Polio","dosis_numero":2,"edad_objetivo_meses":4,"fecha_recomendada":"2026-01-10","estado":"ATRASADA"}"#,
        )
        .expect("dose should decode");
        assert!(overdue.is_overdue());

        let pending: NextDose = serde_json::from_str(
            r#"{"schedule_id":9,"vaccine_nombre":"Polio","dosis_numero":2,"edad_objetivo_meses":4,"fecha_recomendada":null,"estado":"AL_DIA"}"#,
        )
        .expect("dose should decode");
        assert!(!pending.is_overdue());
        assert_eq!(pending.recommended_date, None);
    }

    #[test]
    fn tabs_are_gated_by_role() {
        assert!(TabKind::visible_for(Role::Admin).contains(&TabKind::Users));
        assert!(!TabKind::visible_for(Role::Representative).contains(&TabKind::Users));
        assert!(TabKind::visible_for(Role::Representative).contains(&TabKind::History));
        assert!(!TabKind::visible_for(Role::Pediatrician).contains(&TabKind::Vaccines));
    }
}
