// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

//! Blocking client for the external SISCONI REST API.
//!
//! All business rules live on the server: it computes dose due-ness, enforces
//! permissions, and persists every record. This crate only shapes requests,
//! attaches the bearer token, and normalizes the handful of response envelopes
//! the backend has shipped over time.
//!
//! Authentication is an explicit lifecycle: [`Client::login`] constructs a
//! [`Session`] owning the token, and dropping the session (or calling
//! [`Session::logout`]) tears it down. No token ever lives in process-global
//! state.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::Date;
use url::Url;

use sisconi_app::{
    ApplicationFormInput, ApplicationId, Child, ChildId, HistoryEntry, NextDose,
    RegistrationFormInput, Role, ScheduleDose, ScheduleFormInput, ScheduleId, Sex, User,
    UserFormInput, UserId, Vaccine, VaccineFormInput, VaccineId, VisitFormInput, VisitId,
};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("invalid api.base_url {base_url:?}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Exchanges credentials for a bearer token and resolves the signed-in
    /// profile. The backend sometimes returns the user inline with the token;
    /// otherwise `/auth/me` then `/users/me` are tried, and as a last resort a
    /// minimal representative profile is assumed, mirroring the most common
    /// account kind.
    pub fn login(&self, document_number: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest {
                numero_documento: document_number,
                password,
            })
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let login: LoginResponse = decode(response)?;
        let Some(token) = login.access_token.filter(|token| !token.is_empty()) else {
            bail!("login succeeded but no access_token arrived -- check the API version");
        };

        let user = match login.user {
            Some(user) => user,
            None => fetch_profile(&self.http, &self.base_url, &token, document_number),
        };

        Ok(Session {
            base_url: self.base_url.clone(),
            token,
            user,
            http: self.http.clone(),
        })
    }
}

/// An authenticated connection. Every request carries the bearer token; the
/// session's drop is the logout.
pub struct Session {
    base_url: String,
    token: String,
    user: User,
    http: HttpClient,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegistrationOutcome {
    #[serde(rename = "representante_id")]
    pub guardian_id: UserId,
    #[serde(rename = "nino_id")]
    pub child_id: ChildId,
}

impl Session {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Consumes the session. The backend keeps no server-side session state,
    /// so forgetting the token is the teardown.
    pub fn logout(self) {}

    pub fn list_users(&self) -> Result<Vec<User>> {
        decode(self.get("/users/")?)
    }

    pub fn create_user(&self, form: &UserFormInput) -> Result<()> {
        ensure_success(self.post_json(
            "/users/",
            &NewUser {
                nombres: &form.first_names,
                apellidos: &form.last_names,
                numero_documento: &form.document_number,
                rol: form.role,
                password: &form.password,
            },
        )?)
    }

    pub fn list_vaccines(&self) -> Result<Vec<Vaccine>> {
        decode(self.get("/vaccines/")?)
    }

    pub fn create_vaccine(&self, form: &VaccineFormInput) -> Result<()> {
        ensure_success(self.post_json(
            "/vaccines/",
            &NewVaccine {
                nombre: &form.name,
                descripcion: &form.description,
            },
        )?)
    }

    pub fn deactivate_vaccine(&self, id: VaccineId) -> Result<()> {
        ensure_success(self.delete(&format!("/vaccines/{}", id.get()))?)
    }

    pub fn full_schedule(&self) -> Result<Vec<ScheduleDose>> {
        decode(self.get("/vaccines/schedule/full")?)
    }

    pub fn create_schedule_dose(&self, form: &ScheduleFormInput) -> Result<()> {
        ensure_success(self.post_json(
            "/vaccines/schedule",
            &NewScheduleDose {
                vaccine_id: form.vaccine_id.get(),
                dosis_numero: form.dose_number,
                edad_objetivo_meses: form.target_age_months,
                intervalo_min_dias: form.min_interval_days,
            },
        )?)
    }

    pub fn delete_schedule_dose(&self, id: ScheduleId) -> Result<()> {
        ensure_success(self.delete(&format!("/vaccines/schedule/{}", id.get()))?)
    }

    pub fn list_children(&self) -> Result<Vec<Child>> {
        decode(self.get("/children/")?)
    }

    /// Children linked to the signed-in representative.
    pub fn my_children(&self) -> Result<Vec<Child>> {
        decode(self.get("/children/my")?)
    }

    pub fn register_child(&self, form: &RegistrationFormInput) -> Result<RegistrationOutcome> {
        decode(self.post_json(
            "/children/register/",
            &NewRegistration {
                representante: NewGuardian {
                    nombres: &form.guardian.first_names,
                    apellidos: &form.guardian.last_names,
                    numero_documento: &form.guardian.document_number,
                    password: &form.guardian.password,
                },
                nino: NewChild {
                    nombres: &form.child.first_names,
                    apellidos: &form.child.last_names,
                    numero_documento: &form.child.document_number,
                    fecha_nacimiento: form.child.birth_date,
                    sexo: form.child.sex,
                },
                parentesco: &form.relationship,
                es_principal: form.is_primary,
            },
        )?)
    }

    /// Pending doses with the server-computed "estado"; arrives wrapped in an
    /// `items` envelope.
    pub fn next_vaccines(&self, child: ChildId) -> Result<Vec<NextDose>> {
        let envelope: ItemsEnvelope<NextDose> =
            decode(self.get(&format!("/children/{}/next-vaccines", child.get()))?)?;
        Ok(envelope.items)
    }

    /// Applied-dose history for the printable record. Older API builds return
    /// a bare array, newer ones wrap it as `items` or `history`.
    pub fn child_history(&self, child: ChildId) -> Result<Vec<HistoryEntry>> {
        let envelope: HistoryEnvelope =
            decode(self.get(&format!("/visits/history/{}/full", child.get()))?)?;
        Ok(envelope.into_entries())
    }

    pub fn create_visit(&self, form: &VisitFormInput) -> Result<VisitId> {
        let created: CreatedId = decode(self.post_json(
            "/visits/",
            &NewVisit {
                child_id: form.child_id.get(),
                fecha_atencion: form.attended_on,
                peso_kg: form.weight_kg,
                talla_cm: form.height_cm,
                observaciones: &form.notes,
            },
        )?)?;
        Ok(VisitId::new(created.id))
    }

    pub fn apply_vaccine(&self, form: &ApplicationFormInput) -> Result<ApplicationId> {
        let created: CreatedId = decode(self.post_json(
            &format!("/visits/{}/apply", form.visit_id.get()),
            &NewApplication {
                schedule_id: form.schedule_id.get(),
                fecha_aplicacion: form.applied_on,
                lote: form.lot.as_deref(),
                proxima_fecha: form.next_due,
            },
        )?)?;
        Ok(ApplicationId::new(created.id))
    }

    fn get(&self, path: &str) -> Result<Response> {
        self.http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))
    }

    fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        self.http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))
    }

    fn delete(&self, path: &str) -> Result<Response> {
        self.http
            .delete(format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))
    }
}

fn fetch_profile(http: &HttpClient, base_url: &str, token: &str, document_number: &str) -> User {
    for path in ["/auth/me", "/users/me"] {
        let Ok(response) = http
            .get(format!("{base_url}{path}"))
            .bearer_auth(token)
            .send()
        else {
            continue;
        };
        if !response.status().is_success() {
            continue;
        }
        if let Ok(envelope) = response.json::<ProfileEnvelope>() {
            return envelope.into_user();
        }
    }

    // No profile endpoint on this backend build. Assume the most restricted
    // role so the UI never over-shows.
    User {
        id: UserId::new(0),
        document_number: document_number.to_owned(),
        first_names: String::new(),
        last_names: String::new(),
        role: Role::Representative,
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(clean_error_response(status, &body));
    }
    response.json().context("decode api response")
}

fn ensure_success(response: Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(clean_error_response(status, &body));
    }
    Ok(())
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check that the SISCONI API is running ({} )",
        base_url,
        error
    )
}

/// Decodes the backend's FastAPI-style error envelope: `detail` is usually a
/// message string, but validation failures ship a list of `{msg, loc}` items.
fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<DetailEnvelope>(body)
        && let Some(detail) = parsed.detail
    {
        match detail {
            DetailBody::Message(message) if !message.is_empty() => {
                return anyhow!("server error ({}): {}", status.as_u16(), message);
            }
            DetailBody::Items(items) if !items.is_empty() => {
                let joined = items
                    .into_iter()
                    .map(|item| item.msg)
                    .collect::<Vec<_>>()
                    .join("; ");
                return anyhow!("server error ({}): {}", status.as_u16(), joined);
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.len() < 100 && !trimmed.is_empty() && !trimmed.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), trimmed);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    numero_documento: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileEnvelope {
    Wrapped { user: User },
    Bare(User),
}

impl ProfileEnvelope {
    fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } => user,
            Self::Bare(user) => user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryEnvelope {
    Bare(Vec<HistoryEntry>),
    Items { items: Vec<HistoryEntry> },
    History { history: Vec<HistoryEntry> },
}

impl HistoryEnvelope {
    fn into_entries(self) -> Vec<HistoryEntry> {
        match self {
            Self::Bare(entries) => entries,
            Self::Items { items } => items,
            Self::History { history } => history,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedId {
    id: i64,
}

#[derive(Debug, Serialize)]
struct NewUser<'a> {
    nombres: &'a str,
    apellidos: &'a str,
    numero_documento: &'a str,
    rol: Role,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct NewVaccine<'a> {
    nombre: &'a str,
    descripcion: &'a str,
}

#[derive(Debug, Serialize)]
struct NewScheduleDose {
    vaccine_id: i64,
    dosis_numero: i32,
    edad_objetivo_meses: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    intervalo_min_dias: Option<i32>,
}

#[derive(Debug, Serialize)]
struct NewRegistration<'a> {
    representante: NewGuardian<'a>,
    nino: NewChild<'a>,
    parentesco: &'a str,
    es_principal: bool,
}

#[derive(Debug, Serialize)]
struct NewGuardian<'a> {
    nombres: &'a str,
    apellidos: &'a str,
    numero_documento: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct NewChild<'a> {
    nombres: &'a str,
    apellidos: &'a str,
    numero_documento: &'a str,
    #[serde(with = "iso_date")]
    fecha_nacimiento: Date,
    sexo: Sex,
}

#[derive(Debug, Serialize)]
struct NewVisit<'a> {
    child_id: i64,
    #[serde(with = "iso_date")]
    fecha_atencion: Date,
    peso_kg: f64,
    talla_cm: f64,
    observaciones: &'a str,
}

#[derive(Debug, Serialize)]
struct NewApplication<'a> {
    schedule_id: i64,
    #[serde(with = "iso_date")]
    fecha_aplicacion: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    lote: Option<&'a str>,
    #[serde(with = "iso_date::option", skip_serializing_if = "Option::is_none")]
    proxima_fecha: Option<Date>,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    detail: Option<DetailBody>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailBody {
    Message(String),
    Items(Vec<DetailItem>),
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    msg: String,
}

#[cfg(test)]
mod tests {
    use super::{
        Client, DetailBody, DetailEnvelope, HistoryEnvelope, LoginRequest, NewApplication,
        NewScheduleDose, ProfileEnvelope, clean_error_response,
    };
    use anyhow::Result;
    use reqwest::StatusCode;
    use std::time::Duration;
    use time::macros::date;

    #[test]
    fn new_rejects_empty_and_malformed_urls() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn new_trims_trailing_slashes() -> Result<()> {
        let client = Client::new("http://127.0.0.1:8000///", Duration::from_secs(1))?;
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
        Ok(())
    }

    #[test]
    fn login_request_uses_document_field_name() -> Result<()> {
        let encoded = serde_json::to_string(&LoginRequest {
            numero_documento: "1304567890",
            password: "secreto",
        })?;
        assert!(encoded.contains("\"numero_documento\":\"1304567890\""));
        Ok(())
    }

    #[test]
    fn schedule_payload_omits_absent_interval() -> Result<()> {
        let encoded = serde_json::to_string(&NewScheduleDose {
            vaccine_id: 2,
            dosis_numero: 1,
            edad_objetivo_meses: 2,
            intervalo_min_dias: None,
        })?;
        assert!(!encoded.contains("intervalo_min_dias"));

        let with_interval = serde_json::to_string(&NewScheduleDose {
            vaccine_id: 2,
            dosis_numero: 2,
            edad_objetivo_meses: 4,
            intervalo_min_dias: Some(60),
        })?;
        assert!(with_interval.contains("\"intervalo_min_dias\":60"));
        Ok(())
    }

    #[test]
    fn application_payload_serializes_iso_dates() -> Result<()> {
        let encoded = serde_json::to_string(&NewApplication {
            schedule_id: 3,
            fecha_aplicacion: date!(2026 - 02 - 10),
            lote: Some("L-204"),
            proxima_fecha: Some(date!(2026 - 04 - 10)),
        })?;
        assert!(encoded.contains("\"fecha_aplicacion\":\"2026-02-10\""));
        assert!(encoded.contains("\"proxima_fecha\":\"2026-04-10\""));

        let minimal = serde_json::to_string(&NewApplication {
            schedule_id: 3,
            fecha_aplicacion: date!(2026 - 02 - 10),
            lote: None,
            proxima_fecha: None,
        })?;
        assert!(!minimal.contains("lote"));
        assert!(!minimal.contains("proxima_fecha"));
        Ok(())
    }

    #[test]
    fn profile_envelope_accepts_bare_and_wrapped_users() -> Result<()> {
        let bare: ProfileEnvelope = serde_json::from_str(
            r#"{"id":1,"numero_documento":"1304","nombres":"Ana","apellidos":"Mera","rol":"ADMIN"}"#,
        )?;
        assert_eq!(bare.into_user().first_names, "Ana");

        let wrapped: ProfileEnvelope = serde_json::from_str(
            r#"{"user":{"id":1,"numero_documento":"1304","nombres":"Ana","apellidos":"Mera","rol":"ADMIN"}}"#,
        )?;
        assert_eq!(wrapped.into_user().last_names, "Mera");
        Ok(())
    }

    #[test]
    fn history_envelope_normalizes_all_three_shapes() -> Result<()> {
        let entry = r#"{"vaccine_nombre":"BCG","dosis_numero":1,"fecha_aplicacion":"2026-01-02"}"#;

        let bare: HistoryEnvelope = serde_json::from_str(&format!("[{entry}]"))?;
        assert_eq!(bare.into_entries().len(), 1);

        let items: HistoryEnvelope = serde_json::from_str(&format!(r#"{{"items":[{entry}]}}"#))?;
        assert_eq!(items.into_entries().len(), 1);

        let history: HistoryEnvelope =
            serde_json::from_str(&format!(r#"{{"history":[{entry}]}}"#))?;
        let entries = history.into_entries();
        assert_eq!(entries[0].vaccine_name, "BCG");
        assert_eq!(entries[0].applied_on, Some(date!(2026 - 01 - 02)));
        Ok(())
    }

    #[test]
    fn detail_string_errors_surface_the_message() {
        let error = clean_error_response(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Credenciales incorrectas"}"#,
        );
        let message = error.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("Credenciales incorrectas"));
    }

    #[test]
    fn detail_validation_lists_are_joined() {
        let error = clean_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"msg":"field required","loc":["body","nombres"]},{"msg":"value is not a valid date","loc":["body","fecha_nacimiento"]}]}"#,
        );
        let message = error.to_string();
        assert!(message.contains("field required"));
        assert!(message.contains("value is not a valid date"));
    }

    #[test]
    fn short_plain_bodies_pass_through() {
        let error = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(error.to_string().contains("upstream down"));
    }

    #[test]
    fn long_or_json_garbage_falls_back_to_the_status() {
        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{\"weird\":true}");
        assert_eq!(error.to_string(), "server returned 500");
    }

    #[test]
    fn detail_envelope_tolerates_unknown_shapes() {
        let parsed: DetailEnvelope =
            serde_json::from_str(r#"{"detail":"solo texto"}"#).expect("envelope should parse");
        assert!(matches!(parsed.detail, Some(DetailBody::Message(_))));
    }
}
