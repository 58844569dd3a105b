// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

//! Terminal dashboard for SISCONI: a login gate, role-gated tabs, and one
//! table pipeline per screen. Data access goes through [`AppRuntime`], so the
//! UI never talks HTTP itself and tests drive it with a scripted runtime.

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use time::Date;

use sisconi_app::{
    AppCommand, AppMode, AppState, ApplicationFormInput, ApplicationId, Child, ChildId, ChildInput,
    FormKind, FormPayload, GuardianInput, HistoryEntry, NextDose, OverviewCounts,
    RegistrationFormInput, Role, ScheduleDose, ScheduleFormInput, ScheduleId, Sex, TabKind, User,
    UserFormInput, UserId, Vaccine, VaccineFormInput, VaccineId, VisitFormInput, VisitId,
    age_in_months,
};
use sisconi_table::{Column, TableEngine, TableView};

mod cartilla;

pub use cartilla::render_cartilla;

const PAGE_SIZES: [usize; 3] = [10, 20, 50];

/// Everything the dashboard needs from the outside world. The CLI implements
/// this over the HTTP client; tests implement it over fixtures.
pub trait AppRuntime {
    fn login(&mut self, document_number: &str, password: &str) -> Result<User>;
    fn logout(&mut self);
    fn today(&mut self) -> Date;
    fn load_overview(&mut self) -> Result<OverviewCounts>;
    fn load_users(&mut self) -> Result<Vec<User>>;
    fn load_children(&mut self) -> Result<Vec<Child>>;
    fn load_vaccines(&mut self) -> Result<Vec<Vaccine>>;
    fn load_schedule(&mut self) -> Result<Vec<ScheduleDose>>;
    fn load_next_doses(&mut self, child: ChildId) -> Result<Vec<NextDose>>;
    fn load_history(&mut self, child: ChildId) -> Result<Vec<HistoryEntry>>;
    fn submit_form(&mut self, payload: &FormPayload) -> Result<SubmitOutcome>;
    fn deactivate_vaccine(&mut self, id: VaccineId) -> Result<()>;
    fn delete_schedule_dose(&mut self, id: ScheduleId) -> Result<()>;
    fn export_csv(&mut self, file_name: &str, contents: &str) -> Result<PathBuf>;
    fn export_cartilla(&mut self, file_name: &str, contents: &str) -> Result<PathBuf>;
}

/// What a successful submission produced; the ids feed follow-up forms (a new
/// visit pre-fills the vaccine application, mirroring the clinic workflow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created,
    Visit(VisitId),
    Application(ApplicationId),
    Registration {
        guardian_id: UserId,
        child_id: ChildId,
    },
}

struct TableScreen<R> {
    rows: Vec<R>,
    engine: TableEngine<R>,
    cursor: usize,
    active_col: usize,
}

impl<R> TableScreen<R> {
    fn new(columns: Vec<Column<R>>, page_size: usize) -> Self {
        Self {
            rows: Vec::new(),
            engine: TableEngine::new(columns, page_size),
            cursor: 0,
            active_col: 0,
        }
    }

    fn set_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.cursor = 0;
    }

    fn view(&self) -> TableView<'_, R> {
        self.engine.view(&self.rows)
    }

    fn selected(&self) -> Option<&R> {
        self.view().rows.get(self.cursor).copied()
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.view().rows.len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    fn move_column(&mut self, delta: isize) {
        let len = self.engine.columns().len();
        if len == 0 {
            return;
        }
        self.active_col = (self.active_col as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    fn next_page(&mut self) {
        let page = self.view().page;
        self.engine.set_page(page as i64 + 1);
        self.cursor = 0;
    }

    fn prev_page(&mut self) {
        let page = self.view().page;
        self.engine.set_page(page as i64 - 1);
        self.cursor = 0;
    }

    fn cycle_page_size(&mut self) -> usize {
        let current = self.engine.page_size();
        let index = PAGE_SIZES
            .iter()
            .position(|size| *size == current)
            .unwrap_or(0);
        let next = PAGE_SIZES[(index + 1) % PAGE_SIZES.len()];
        self.engine.set_page_size(next);
        self.cursor = 0;
        next
    }

    fn cycle_sort(&mut self) -> String {
        let Some(column) = self.engine.columns().get(self.active_col).copied() else {
            return "sin columnas para ordenar".to_owned();
        };
        self.engine.cycle_sort(column.key);
        self.cursor = 0;
        match self.engine.sort() {
            Some(spec) if spec.key == column.key => {
                format!("orden {} {}", column.header, spec.direction.label())
            }
            _ => "orden quitado".to_owned(),
        }
    }

    fn set_query(&mut self, query: &str) {
        self.engine.set_query(query);
        self.cursor = 0;
    }

    fn footer(&self) -> String {
        let view = self.view();
        let mut parts = vec![
            format!("página {}/{}", view.page, view.pages),
            format!("{} de {} registros", view.total, self.rows.len()),
        ];
        if !self.engine.query().is_empty() {
            parts.push(format!("buscar: {}", self.engine.query()));
        }
        parts.join(" · ")
    }

    fn export(&self) -> Result<String> {
        self.engine.export_csv(&self.rows)
    }
}

// Runs one table operation against whichever screen the active tab owns.
// Monomorphizes per arm, so the screens can keep their distinct record types.
macro_rules! on_table {
    ($data:expr, $tab:expr, |$screen:ident| $body:expr, $fallback:expr) => {
        match $tab {
            TabKind::Users => {
                let $screen = &mut $data.users;
                $body
            }
            TabKind::Children => {
                let $screen = &mut $data.children;
                $body
            }
            TabKind::Vaccines => {
                let $screen = &mut $data.vaccines;
                $body
            }
            TabKind::Schedule => {
                let $screen = &mut $data.schedule;
                $body
            }
            TabKind::NextDoses => {
                let $screen = &mut $data.next_doses;
                $body
            }
            TabKind::History => {
                let $screen = &mut $data.history;
                $body
            }
            TabKind::Overview => $fallback,
        }
    };
}

fn user_columns() -> Vec<Column<User>> {
    vec![
        Column::new("id", "ID", |user: &User| user.id.get().into()),
        Column::new("numero_documento", "Documento", |user: &User| {
            user.document_number.as_str().into()
        }),
        Column::new("nombres", "Nombres", |user: &User| {
            user.first_names.as_str().into()
        }),
        Column::new("apellidos", "Apellidos", |user: &User| {
            user.last_names.as_str().into()
        }),
        Column::new("rol", "Rol", |user: &User| user.role.as_str().into()),
    ]
}

fn child_columns() -> Vec<Column<Child>> {
    vec![
        Column::new("id", "ID", |child: &Child| child.id.get().into()),
        Column::new("numero_documento", "Documento", |child: &Child| {
            child.document_number.as_str().into()
        }),
        Column::new("nombres", "Nombres", |child: &Child| {
            child.first_names.as_str().into()
        }),
        Column::new("apellidos", "Apellidos", |child: &Child| {
            child.last_names.as_str().into()
        }),
        Column::new("fecha_nacimiento", "F. nacimiento", |child: &Child| {
            child.birth_date.to_string().into()
        }),
        Column::new("sexo", "Sexo", |child: &Child| child.sex.as_str().into()),
    ]
}

fn vaccine_columns() -> Vec<Column<Vaccine>> {
    vec![
        Column::new("id", "ID", |vaccine: &Vaccine| vaccine.id.get().into()),
        Column::new("nombre", "Nombre", |vaccine: &Vaccine| {
            vaccine.name.as_str().into()
        }),
        Column::new("descripcion", "Descripción", |vaccine: &Vaccine| {
            vaccine.description.as_str().into()
        }),
        // Derived badge column, same as the web StatusBadge.
        Column::new("estado", "Estado", |vaccine: &Vaccine| {
            if vaccine.active { "activa" } else { "inactiva" }.into()
        }),
    ]
}

fn schedule_columns() -> Vec<Column<ScheduleDose>> {
    vec![
        Column::new("schedule_id", "ID", |dose: &ScheduleDose| {
            dose.schedule_id.get().into()
        }),
        Column::new("vaccine_nombre", "Vacuna", |dose: &ScheduleDose| {
            dose.vaccine_name.as_str().into()
        }),
        Column::new("dosis_numero", "Dosis", |dose: &ScheduleDose| {
            dose.dose_number.into()
        }),
        Column::new("edad_objetivo_meses", "Edad (m)", |dose: &ScheduleDose| {
            dose.target_age_months.into()
        }),
        Column::new("intervalo_min_dias", "Intervalo (d)", |dose: &ScheduleDose| {
            dose.min_interval_days.into()
        }),
    ]
}

fn next_dose_columns() -> Vec<Column<NextDose>> {
    vec![
        Column::new("vaccine_nombre", "Vacuna", |dose: &NextDose| {
            dose.vaccine_name.as_str().into()
        }),
        Column::new("dosis_numero", "Dosis", |dose: &NextDose| {
            dose.dose_number.into()
        }),
        Column::new("edad_objetivo_meses", "Edad (m)", |dose: &NextDose| {
            dose.target_age_months.into()
        }),
        Column::new("fecha_recomendada", "F. recomendada", |dose: &NextDose| {
            dose.recommended_date.map(|date| date.to_string()).into()
        }),
        Column::new("estado", "Estado", |dose: &NextDose| {
            dose.status.as_str().into()
        }),
    ]
}

fn history_columns() -> Vec<Column<HistoryEntry>> {
    vec![
        Column::new("vaccine_nombre", "Vacuna", |entry: &HistoryEntry| {
            entry.vaccine_name.as_str().into()
        }),
        Column::new("dosis_numero", "Dosis", |entry: &HistoryEntry| {
            entry.dose_number.into()
        }),
        Column::new("fecha_aplicacion", "Fecha", |entry: &HistoryEntry| {
            entry.applied_on.map(|date| date.to_string()).into()
        }),
        Column::new("observacion", "Observación", |entry: &HistoryEntry| {
            entry.note.as_deref().into()
        }),
    ]
}

const fn csv_file_name(tab: TabKind) -> &'static str {
    match tab {
        TabKind::Overview => "resumen.csv",
        TabKind::Users => "usuarios.csv",
        TabKind::Children => "ninos.csv",
        TabKind::Vaccines => "vacunas.csv",
        TabKind::Schedule => "esquema.csv",
        TabKind::NextDoses => "proximas_vacunas.csv",
        TabKind::History => "historial.csv",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct LoginForm {
    document: String,
    password: String,
    field_index: usize,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormField {
    label: &'static str,
    value: String,
    masked: bool,
}

impl FormField {
    fn plain(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            masked: false,
        }
    }

    fn masked(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            masked: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormEditor {
    kind: FormKind,
    fields: Vec<FormField>,
    field_index: usize,
}

impl FormEditor {
    fn values(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.value.clone()).collect()
    }

    fn is_on_last_field(&self) -> bool {
        self.field_index + 1 == self.fields.len()
    }

    fn move_field(&mut self, delta: isize) {
        let len = self.fields.len() as isize;
        self.field_index = (self.field_index as isize + delta).rem_euclid(len) as usize;
    }
}

#[derive(Debug, Clone, Copy)]
struct FormDefaults {
    child_id: Option<ChildId>,
    visit_id: Option<VisitId>,
    today: Date,
}

fn form_editor_for(kind: FormKind, defaults: FormDefaults) -> FormEditor {
    let fields = match kind {
        FormKind::User => vec![
            FormField::plain("nombres", ""),
            FormField::plain("apellidos", ""),
            FormField::plain("documento", ""),
            FormField::plain("rol (ADMIN/PEDIATRA/REPRESENTANTE)", "REPRESENTANTE"),
            FormField::masked("password"),
        ],
        FormKind::Vaccine => vec![
            FormField::plain("nombre", ""),
            FormField::plain("descripción", ""),
        ],
        FormKind::ScheduleDose => vec![
            FormField::plain("vaccine_id", ""),
            FormField::plain("dosis número", "1"),
            FormField::plain("edad objetivo (meses)", "0"),
            FormField::plain("intervalo mínimo (días, opcional)", ""),
        ],
        FormKind::Registration => vec![
            FormField::plain("representante nombres", ""),
            FormField::plain("representante apellidos", ""),
            FormField::plain("representante documento", ""),
            FormField::masked("representante password"),
            FormField::plain("niño nombres", ""),
            FormField::plain("niño apellidos", ""),
            FormField::plain("niño documento", ""),
            FormField::plain("niño nacimiento (YYYY-MM-DD)", ""),
            FormField::plain("niño sexo (M/F/OTRO)", "M"),
            FormField::plain("parentesco", "madre"),
            FormField::plain("principal (si/no)", "si"),
        ],
        FormKind::Visit => vec![
            FormField::plain(
                "child_id",
                defaults
                    .child_id
                    .map(|id| id.get().to_string())
                    .unwrap_or_default(),
            ),
            FormField::plain("fecha atención (YYYY-MM-DD)", defaults.today.to_string()),
            FormField::plain("peso (kg)", ""),
            FormField::plain("talla (cm)", ""),
            FormField::plain("observaciones", ""),
        ],
        FormKind::Application => vec![
            FormField::plain(
                "visit_id",
                defaults
                    .visit_id
                    .map(|id| id.get().to_string())
                    .unwrap_or_default(),
            ),
            FormField::plain("schedule_id", ""),
            FormField::plain("fecha aplicación (YYYY-MM-DD)", defaults.today.to_string()),
            FormField::plain("lote (opcional)", ""),
            FormField::plain("próxima fecha (YYYY-MM-DD, opcional)", ""),
        ],
    };

    FormEditor {
        kind,
        fields,
        field_index: 0,
    }
}

fn build_payload(kind: FormKind, values: &[String]) -> Result<FormPayload> {
    let field = |index: usize| values.get(index).map(String::as_str).unwrap_or("");

    let payload = match kind {
        FormKind::User => {
            let raw_role = field(3).trim().to_uppercase();
            let Some(role) = Role::parse(&raw_role) else {
                bail!("rol {raw_role:?} no existe -- usa ADMIN, PEDIATRA o REPRESENTANTE");
            };
            FormPayload::User(UserFormInput {
                first_names: field(0).trim().to_owned(),
                last_names: field(1).trim().to_owned(),
                document_number: field(2).trim().to_owned(),
                role,
                password: field(4).to_owned(),
            })
        }
        FormKind::Vaccine => FormPayload::Vaccine(VaccineFormInput {
            name: field(0).trim().to_owned(),
            description: field(1).trim().to_owned(),
        }),
        FormKind::ScheduleDose => FormPayload::Schedule(ScheduleFormInput {
            vaccine_id: VaccineId::new(parse_i64("vaccine_id", field(0))?),
            dose_number: parse_i32("dosis número", field(1))?,
            target_age_months: parse_i32("edad objetivo", field(2))?,
            min_interval_days: parse_optional_i32("intervalo mínimo", field(3))?,
        }),
        FormKind::Registration => {
            let raw_sex = field(8).trim().to_uppercase();
            let Some(sex) = Sex::parse(&raw_sex) else {
                bail!("sexo {raw_sex:?} no existe -- usa M, F u OTRO");
            };
            FormPayload::Registration(Box::new(RegistrationFormInput {
                guardian: GuardianInput {
                    first_names: field(0).trim().to_owned(),
                    last_names: field(1).trim().to_owned(),
                    document_number: field(2).trim().to_owned(),
                    password: field(3).to_owned(),
                },
                child: ChildInput {
                    first_names: field(4).trim().to_owned(),
                    last_names: field(5).trim().to_owned(),
                    document_number: field(6).trim().to_owned(),
                    birth_date: parse_date("niño nacimiento", field(7))?,
                    sex,
                },
                relationship: field(9).trim().to_owned(),
                is_primary: matches!(field(10).trim().to_lowercase().as_str(), "si" | "sí" | "s"),
            }))
        }
        FormKind::Visit => FormPayload::Visit(VisitFormInput {
            child_id: ChildId::new(parse_i64("child_id", field(0))?),
            attended_on: parse_date("fecha atención", field(1))?,
            weight_kg: parse_f64("peso", field(2))?,
            height_cm: parse_f64("talla", field(3))?,
            notes: field(4).trim().to_owned(),
        }),
        FormKind::Application => {
            let lot = field(3).trim();
            FormPayload::Application(ApplicationFormInput {
                visit_id: VisitId::new(parse_i64("visit_id", field(0))?),
                schedule_id: ScheduleId::new(parse_i64("schedule_id", field(1))?),
                applied_on: parse_date("fecha aplicación", field(2))?,
                lot: (!lot.is_empty()).then(|| lot.to_owned()),
                next_due: parse_optional_date("próxima fecha", field(4))?,
            })
        }
    };

    Ok(payload)
}

fn parse_date(label: &str, raw: &str) -> Result<Date> {
    Date::parse(
        raw.trim(),
        &time::macros::format_description!("[year]-[month]-[day]"),
    )
    .map_err(|_| anyhow::anyhow!("{label} debe ser una fecha YYYY-MM-DD, no {raw:?}"))
}

fn parse_optional_date(label: &str, raw: &str) -> Result<Option<Date>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_date(label, raw).map(Some)
}

fn parse_i64(label: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{label} debe ser un número entero, no {raw:?}"))
}

fn parse_i32(label: &str, raw: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .with_context(|| format!("{label} debe ser un número entero, no {raw:?}"))
}

fn parse_f64(label: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{label} debe ser un número, no {raw:?}"))
}

fn parse_optional_i32(label: &str, raw: &str) -> Result<Option<i32>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_i32(label, raw).map(Some)
}

struct ViewData {
    current_user: Option<User>,
    today: Option<Date>,
    counts: OverviewCounts,
    users: TableScreen<User>,
    children: TableScreen<Child>,
    vaccines: TableScreen<Vaccine>,
    schedule: TableScreen<ScheduleDose>,
    next_doses: TableScreen<NextDose>,
    history: TableScreen<HistoryEntry>,
    selected_child: Option<Child>,
    last_visit_id: Option<VisitId>,
    sex_filter: Option<Sex>,
    overdue_only: bool,
    search_buffer: String,
    form: Option<FormEditor>,
}

impl ViewData {
    fn new(page_size: usize) -> Self {
        Self {
            current_user: None,
            today: None,
            counts: OverviewCounts::default(),
            users: TableScreen::new(user_columns(), page_size),
            children: TableScreen::new(child_columns(), page_size),
            vaccines: TableScreen::new(vaccine_columns(), page_size),
            schedule: TableScreen::new(schedule_columns(), page_size),
            next_doses: TableScreen::new(next_dose_columns(), page_size),
            history: TableScreen::new(history_columns(), page_size),
            selected_child: None,
            last_visit_id: None,
            sex_filter: None,
            overdue_only: false,
            search_buffer: String::new(),
            form: None,
        }
    }
}

enum Screen {
    Login(LoginForm),
    Main(AppState),
}

pub struct UiState {
    screen: Screen,
    data: ViewData,
    page_size: usize,
}

impl UiState {
    pub fn new(page_size: usize) -> Self {
        Self {
            screen: Screen::Login(LoginForm::default()),
            data: ViewData::new(page_size),
            page_size,
        }
    }
}

pub fn run_app<R: AppRuntime>(runtime: &mut R, page_size: usize) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut ui = UiState::new(page_size);

    let mut result = Ok(());
    loop {
        if let Err(error) = terminal.draw(|frame| render(frame, &ui)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(&mut ui, runtime, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    if matches!(ui.screen, Screen::Main(_)) {
        runtime.logout();
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

enum LoginKeyResult {
    Continue,
    Quit,
    SignedIn(User),
}

fn handle_key_event<R: AppRuntime>(ui: &mut UiState, runtime: &mut R, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    let signed_in = match &mut ui.screen {
        Screen::Login(form) => match handle_login_key(form, runtime, key) {
            LoginKeyResult::Quit => return true,
            LoginKeyResult::Continue => None,
            LoginKeyResult::SignedIn(user) => Some(user),
        },
        Screen::Main(state) => {
            return handle_main_key(state, &mut ui.data, runtime, key);
        }
    };

    if let Some(user) = signed_in {
        let mut state = AppState::new(user.role);
        state.set_status(&format!(
            "sesión iniciada: {} ({})",
            user.full_name().trim(),
            user.role.label()
        ));
        ui.data = ViewData::new(ui.page_size);
        ui.data.today = Some(runtime.today());
        ui.data.current_user = Some(user);
        if let Err(error) = reload_tab(&mut state, &mut ui.data, runtime) {
            state.set_status(&format!("carga falló: {error:#}"));
        }
        ui.screen = Screen::Main(state);
    }
    false
}

fn handle_login_key<R: AppRuntime>(
    form: &mut LoginForm,
    runtime: &mut R,
    key: KeyEvent,
) -> LoginKeyResult {
    match key.code {
        KeyCode::Esc => LoginKeyResult::Quit,
        KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => {
            form.field_index = 1 - form.field_index;
            LoginKeyResult::Continue
        }
        KeyCode::Enter => {
            if form.document.trim().is_empty() || form.password.is_empty() {
                form.error = Some("ingresa documento y contraseña".to_owned());
                return LoginKeyResult::Continue;
            }
            match runtime.login(form.document.trim(), &form.password) {
                Ok(user) => LoginKeyResult::SignedIn(user),
                Err(error) => {
                    form.error = Some(format!("{error:#}"));
                    form.password.clear();
                    LoginKeyResult::Continue
                }
            }
        }
        KeyCode::Backspace => {
            if form.field_index == 0 {
                form.document.pop();
            } else {
                form.password.pop();
            }
            LoginKeyResult::Continue
        }
        KeyCode::Char(ch) => {
            if form.field_index == 0 {
                form.document.push(ch);
            } else {
                form.password.push(ch);
            }
            LoginKeyResult::Continue
        }
        _ => LoginKeyResult::Continue,
    }
}

fn handle_main_key<R: AppRuntime>(
    state: &mut AppState,
    data: &mut ViewData,
    runtime: &mut R,
    key: KeyEvent,
) -> bool {
    match state.mode {
        AppMode::Search => {
            handle_search_key(state, data, key);
            false
        }
        AppMode::Form(kind) => {
            handle_form_key(state, data, runtime, kind, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, data, runtime, key),
    }
}

fn handle_search_key(state: &mut AppState, data: &mut ViewData, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            data.search_buffer.clear();
            apply_search(state.active_tab, data);
            state.dispatch(AppCommand::ExitToNav);
            state.set_status("búsqueda limpiada");
        }
        KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            data.search_buffer.pop();
            apply_search(state.active_tab, data);
        }
        KeyCode::Char(ch) => {
            data.search_buffer.push(ch);
            apply_search(state.active_tab, data);
        }
        _ => {}
    }
}

fn apply_search(tab: TabKind, data: &mut ViewData) {
    let query = data.search_buffer.clone();
    on_table!(data, tab, |screen| screen.set_query(&query), ());
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    data: &mut ViewData,
    runtime: &mut R,
    kind: FormKind,
    key: KeyEvent,
) {
    let Some(editor) = data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };

    match key.code {
        KeyCode::Esc => {
            data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            state.set_status("formulario cancelado");
        }
        KeyCode::Tab | KeyCode::Down => editor.move_field(1),
        KeyCode::BackTab | KeyCode::Up => editor.move_field(-1),
        KeyCode::Backspace => {
            editor.fields[editor.field_index].value.pop();
        }
        KeyCode::Char(ch) => {
            editor.fields[editor.field_index].value.push(ch);
        }
        KeyCode::Enter => {
            if !editor.is_on_last_field() {
                editor.move_field(1);
                return;
            }
            let values = editor.values();
            submit_form(state, data, runtime, kind, &values);
        }
        _ => {}
    }
}

fn submit_form<R: AppRuntime>(
    state: &mut AppState,
    data: &mut ViewData,
    runtime: &mut R,
    kind: FormKind,
    values: &[String],
) {
    let outcome = build_payload(kind, values)
        .and_then(|payload| payload.validate().map(|()| payload))
        .and_then(|payload| runtime.submit_form(&payload));

    match outcome {
        Ok(SubmitOutcome::Created) => {
            data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            if let Err(error) = reload_tab(state, data, runtime) {
                state.set_status(&format!("guardado, pero recarga falló: {error:#}"));
            } else {
                state.set_status("registro creado");
            }
        }
        Ok(SubmitOutcome::Visit(visit_id)) => {
            data.form = None;
            data.last_visit_id = Some(visit_id);
            state.dispatch(AppCommand::ExitToNav);
            state.set_status(&format!(
                "visita creada (ID {}) -- lista para aplicar vacuna",
                visit_id.get()
            ));
        }
        Ok(SubmitOutcome::Application(application_id)) => {
            data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            state.set_status(&format!("vacuna aplicada (ID {})", application_id.get()));
        }
        Ok(SubmitOutcome::Registration {
            guardian_id,
            child_id,
        }) => {
            data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            if let Err(error) = reload_tab(state, data, runtime) {
                state.set_status(&format!("registrado, pero recarga falló: {error:#}"));
            } else {
                state.set_status(&format!(
                    "registrado: representante {} / niño {}",
                    guardian_id.get(),
                    child_id.get()
                ));
            }
        }
        Err(error) => {
            // Keep the form open so the input can be corrected.
            state.set_status(&format!("{error:#}"));
        }
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    data: &mut ViewData,
    runtime: &mut R,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextTab);
            reload_with_status(state, data, runtime);
        }
        KeyCode::BackTab => {
            state.dispatch(AppCommand::PrevTab);
            reload_with_status(state, data, runtime);
        }
        KeyCode::Char('/') => {
            data.search_buffer =
                on_table!(data, state.active_tab, |screen| screen
                    .engine
                    .query()
                    .to_owned(), String::new());
            state.dispatch(AppCommand::EnterSearch);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            on_table!(data, state.active_tab, |screen| screen.move_cursor(1), ());
        }
        KeyCode::Up | KeyCode::Char('k') => {
            on_table!(data, state.active_tab, |screen| screen.move_cursor(-1), ());
        }
        KeyCode::Right | KeyCode::Char('l') => {
            on_table!(data, state.active_tab, |screen| screen.move_column(1), ());
        }
        KeyCode::Left | KeyCode::Char('h') => {
            on_table!(data, state.active_tab, |screen| screen.move_column(-1), ());
        }
        KeyCode::Char('n') => {
            on_table!(data, state.active_tab, |screen| screen.next_page(), ());
        }
        KeyCode::Char('p') => {
            on_table!(data, state.active_tab, |screen| screen.prev_page(), ());
        }
        KeyCode::Char('z') => {
            let size = on_table!(data, state.active_tab, |screen| screen.cycle_page_size(), 0);
            if size > 0 {
                state.set_status(&format!("{size} registros por página"));
            }
        }
        KeyCode::Char('s') => {
            let message = on_table!(
                data,
                state.active_tab,
                |screen| screen.cycle_sort(),
                "nada que ordenar en resumen".to_owned()
            );
            state.set_status(&message);
        }
        KeyCode::Char('r') => {
            reload_with_status(state, data, runtime);
        }
        KeyCode::Char('e') => export_active_tab(state, data, runtime),
        KeyCode::Char('x') => cycle_sex_filter(state, data),
        KeyCode::Char('o') => toggle_overdue_filter(state, data),
        KeyCode::Char('c') => {
            if let Some(kind) = creation_form_for(state.active_tab, state.role) {
                open_form(state, data, runtime, kind);
            }
        }
        KeyCode::Char('v') => {
            if state.role == Role::Pediatrician {
                open_form(state, data, runtime, FormKind::Visit);
            }
        }
        KeyCode::Char('a') => {
            if state.role == Role::Pediatrician {
                open_form(state, data, runtime, FormKind::Application);
            }
        }
        KeyCode::Char('d') => deactivate_selected(state, data, runtime),
        KeyCode::Char('w') => export_cartilla(state, data, runtime),
        KeyCode::Enter => select_child(state, data, runtime),
        _ => {}
    }
    false
}

const fn creation_form_for(tab: TabKind, role: Role) -> Option<FormKind> {
    match (role, tab) {
        (Role::Admin, TabKind::Users) => Some(FormKind::User),
        (Role::Admin, TabKind::Vaccines) => Some(FormKind::Vaccine),
        (Role::Admin, TabKind::Schedule) => Some(FormKind::ScheduleDose),
        (Role::Pediatrician, TabKind::Children) => Some(FormKind::Registration),
        _ => None,
    }
}

fn open_form<R: AppRuntime>(
    state: &mut AppState,
    data: &mut ViewData,
    runtime: &mut R,
    kind: FormKind,
) {
    let defaults = FormDefaults {
        child_id: data.selected_child.as_ref().map(|child| child.id),
        visit_id: data.last_visit_id,
        today: runtime.today(),
    };
    let events = state.dispatch(AppCommand::OpenForm(kind));
    if state.mode == AppMode::Form(kind) {
        data.form = Some(form_editor_for(kind, defaults));
    } else {
        // Role rejection already produced a status event.
        debug_assert!(!events.is_empty());
    }
}

fn reload_with_status<R: AppRuntime>(state: &mut AppState, data: &mut ViewData, runtime: &mut R) {
    data.search_buffer.clear();
    if let Err(error) = reload_tab(state, data, runtime) {
        state.set_status(&format!("carga falló: {error:#}"));
    }
}

fn reload_tab<R: AppRuntime>(
    state: &mut AppState,
    data: &mut ViewData,
    runtime: &mut R,
) -> Result<()> {
    match state.active_tab {
        TabKind::Overview => data.counts = runtime.load_overview()?,
        TabKind::Users => data.users.set_rows(runtime.load_users()?),
        TabKind::Children => data.children.set_rows(runtime.load_children()?),
        TabKind::Vaccines => data.vaccines.set_rows(runtime.load_vaccines()?),
        TabKind::Schedule => data.schedule.set_rows(runtime.load_schedule()?),
        TabKind::NextDoses => {
            let Some(child) = data.selected_child.as_ref() else {
                bail!("selecciona un niño con Enter en la pestaña niños");
            };
            let child_id = child.id;
            data.next_doses.set_rows(runtime.load_next_doses(child_id)?);
        }
        TabKind::History => {
            let Some(child) = data.selected_child.as_ref() else {
                bail!("selecciona un niño con Enter en la pestaña niños");
            };
            let child_id = child.id;
            data.history.set_rows(runtime.load_history(child_id)?);
        }
    }
    Ok(())
}

fn export_active_tab<R: AppRuntime>(state: &mut AppState, data: &mut ViewData, runtime: &mut R) {
    if state.active_tab == TabKind::Overview {
        state.set_status("nada que exportar en resumen");
        return;
    }

    let contents = on_table!(data, state.active_tab, |screen| screen.export(), Ok(String::new()));
    let result = contents.and_then(|contents| {
        if contents.is_empty() {
            bail!("sin registros que exportar");
        }
        runtime.export_csv(csv_file_name(state.active_tab), &contents)
    });
    match result {
        Ok(path) => state.set_status(&format!("exportado: {}", path.display())),
        Err(error) => state.set_status(&format!("exportar falló: {error:#}")),
    };
}

fn export_cartilla<R: AppRuntime>(state: &mut AppState, data: &mut ViewData, runtime: &mut R) {
    if state.active_tab != TabKind::History {
        return;
    }
    let Some(child) = data.selected_child.clone() else {
        state.set_status("selecciona un niño primero");
        return;
    };

    let contents = render_cartilla(&child, &data.history.rows, runtime.today());
    let file_name = format!("cartilla_{}.txt", child.document_number);
    match runtime.export_cartilla(&file_name, &contents) {
        Ok(path) => state.set_status(&format!("cartilla lista: {}", path.display())),
        Err(error) => state.set_status(&format!("cartilla falló: {error:#}")),
    };
}

fn cycle_sex_filter(state: &mut AppState, data: &mut ViewData) {
    if state.active_tab != TabKind::Children {
        return;
    }

    data.sex_filter = match data.sex_filter {
        None => Some(Sex::Male),
        Some(Sex::Male) => Some(Sex::Female),
        Some(Sex::Female) => Some(Sex::Other),
        Some(Sex::Other) => None,
    };

    match data.sex_filter {
        Some(sex) => {
            data.children
                .engine
                .set_filter("sexo", move |child: &Child| child.sex == sex);
            state.set_status(&format!("sexo: {}", sex.as_str()));
        }
        None => {
            data.children.engine.clear_filter("sexo");
            state.set_status("sexo: todos");
        }
    }
    data.children.cursor = 0;
}

fn toggle_overdue_filter(state: &mut AppState, data: &mut ViewData) {
    if state.active_tab != TabKind::NextDoses {
        return;
    }

    data.overdue_only = !data.overdue_only;
    if data.overdue_only {
        data.next_doses
            .engine
            .set_filter("atrasadas", NextDose::is_overdue);
        state.set_status("solo atrasadas");
    } else {
        data.next_doses.engine.clear_filter("atrasadas");
        state.set_status("todas las dosis");
    }
    data.next_doses.cursor = 0;
}

fn deactivate_selected<R: AppRuntime>(state: &mut AppState, data: &mut ViewData, runtime: &mut R) {
    if state.role != Role::Admin {
        return;
    }

    match state.active_tab {
        TabKind::Vaccines => {
            let Some(vaccine_id) = data.vaccines.selected().map(|vaccine| vaccine.id) else {
                state.set_status("sin vacuna seleccionada");
                return;
            };
            match runtime.deactivate_vaccine(vaccine_id) {
                Ok(()) => {
                    state.set_status("vacuna desactivada");
                    reload_with_status(state, data, runtime);
                }
                Err(error) => {
                    state.set_status(&format!("desactivar falló: {error:#}"));
                }
            }
        }
        TabKind::Schedule => {
            let Some(schedule_id) = data.schedule.selected().map(|dose| dose.schedule_id) else {
                state.set_status("sin dosis seleccionada");
                return;
            };
            match runtime.delete_schedule_dose(schedule_id) {
                Ok(()) => {
                    state.set_status("dosis eliminada del esquema");
                    reload_with_status(state, data, runtime);
                }
                Err(error) => {
                    state.set_status(&format!("eliminar falló: {error:#}"));
                }
            }
        }
        _ => {}
    }
}

fn select_child<R: AppRuntime>(state: &mut AppState, data: &mut ViewData, runtime: &mut R) {
    if state.active_tab != TabKind::Children {
        return;
    }
    let Some(child) = data.children.selected().cloned() else {
        state.set_status("sin niño seleccionado");
        return;
    };

    let name = child.full_name();
    data.selected_child = Some(child);
    state.set_status(&format!("niño seleccionado: {name}"));

    // Representatives jump straight to the pending-dose view, like the web
    // dashboard's "Próximas" button.
    if state.role == Role::Representative {
        state.active_tab = TabKind::NextDoses;
        reload_with_status(state, data, runtime);
    }
}

fn render(frame: &mut ratatui::Frame<'_>, ui: &UiState) {
    match &ui.screen {
        Screen::Login(form) => render_login(frame, form),
        Screen::Main(state) => render_main(frame, state, &ui.data),
    }
}

fn render_login(frame: &mut ratatui::Frame<'_>, form: &LoginForm) {
    let area = centered_rect(56, 42, frame.area());
    let body = Paragraph::new(render_login_text(form)).block(
        Block::default()
            .title("SISCONI")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(body, area);
}

fn render_login_text(form: &LoginForm) -> String {
    let marker = |index: usize| if form.field_index == index { "> " } else { "  " };
    let mut lines = vec![
        "Control de vacunación infantil".to_owned(),
        String::new(),
        format!("{}documento:  {}", marker(0), form.document),
        format!("{}contraseña: {}", marker(1), "•".repeat(form.password.chars().count())),
        String::new(),
    ];
    if let Some(error) = &form.error {
        lines.push(format!("error: {error}"));
        lines.push(String::new());
    }
    lines.push("Enter ingresar · Tab cambiar campo · Esc salir".to_owned());
    lines.join("\n")
}

fn render_main(frame: &mut ratatui::Frame<'_>, state: &AppState, data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let tabs_for_role = TabKind::visible_for(state.role);
    let selected = tabs_for_role
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let titles: Vec<String> = tabs_for_role
        .iter()
        .map(|tab| tab.label().to_owned())
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("SISCONI").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    if let AppMode::Form(_) = state.mode {
        render_form_body(frame, layout[1], data);
    } else {
        match state.active_tab {
            TabKind::Overview => {
                let body = Paragraph::new(render_overview_text(state, data))
                    .block(Block::default().borders(Borders::ALL).title("resumen"));
                frame.render_widget(body, layout[1]);
            }
            TabKind::Users => render_table(frame, layout[1], &data.users, "usuarios"),
            TabKind::Children => render_table(frame, layout[1], &data.children, "niños"),
            TabKind::Vaccines => render_table(frame, layout[1], &data.vaccines, "vacunas"),
            TabKind::Schedule => render_table(frame, layout[1], &data.schedule, "esquema por dosis"),
            TabKind::NextDoses => {
                render_table(frame, layout[1], &data.next_doses, "próximas vacunas")
            }
            TabKind::History => render_table(frame, layout[1], &data.history, "historial"),
        }
    }

    let status = Paragraph::new(status_text(state, data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);
}

fn render_table<Rec>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    screen: &TableScreen<Rec>,
    title: &str,
) {
    let view = screen.view();
    let columns = screen.engine.columns();

    let header = Row::new(columns.iter().enumerate().map(|(index, column)| {
        let label = if index == screen.active_col {
            format!("[{}]", column.header)
        } else {
            column.header.to_owned()
        };
        Cell::from(label)
    }))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let rows = view.rows.iter().enumerate().map(|(index, record)| {
        let row = Row::new(
            columns
                .iter()
                .map(|column| Cell::from(column.value(record).to_text())),
        );
        if index == screen.cursor {
            row.style(Style::default().add_modifier(Modifier::REVERSED))
        } else {
            row
        }
    });

    let widths: Vec<Constraint> = columns
        .iter()
        .map(|column| Constraint::Min(column.header.chars().count() as u16 + 4))
        .collect();

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{title} · {}", screen.footer())),
    );
    frame.render_widget(table, area);
}

fn render_form_body(frame: &mut ratatui::Frame<'_>, area: Rect, data: &ViewData) {
    let Some(editor) = &data.form else {
        return;
    };
    let body = Paragraph::new(render_form_text(editor)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(editor.kind.title()),
    );
    frame.render_widget(body, area);
}

fn render_form_text(editor: &FormEditor) -> String {
    let mut lines = Vec::with_capacity(editor.fields.len() + 2);
    for (index, field) in editor.fields.iter().enumerate() {
        let marker = if index == editor.field_index { "> " } else { "  " };
        let value = if field.masked {
            "•".repeat(field.value.chars().count())
        } else {
            field.value.clone()
        };
        lines.push(format!("{marker}{}: {value}", field.label));
    }
    lines.push(String::new());
    lines.push("Tab siguiente · Enter en el último campo envía · Esc cancela".to_owned());
    lines.join("\n")
}

fn render_overview_text(state: &AppState, data: &ViewData) -> String {
    let mut lines = Vec::new();
    if let Some(user) = &data.current_user {
        lines.push(format!(
            "usuario: {} · rol: {}",
            user.full_name().trim(),
            user.role.label()
        ));
    }
    lines.push(String::new());
    lines.push(format!("usuarios:        {}", data.counts.users));
    lines.push(format!("niños:           {}", data.counts.children));
    lines.push(format!("vacunas activas: {}", data.counts.active_vaccines));
    lines.push(format!("esquema (dosis): {}", data.counts.schedule_doses));
    lines.push(String::new());
    if let Some(child) = &data.selected_child {
        let age = data
            .today
            .map(|today| age_in_months(child.birth_date, today));
        lines.push(match age {
            Some(months) => format!(
                "niño seleccionado: {} · doc {} · edad aprox {} meses",
                child.full_name(),
                child.document_number,
                months
            ),
            None => format!(
                "niño seleccionado: {} · doc {}",
                child.full_name(),
                child.document_number
            ),
        });
    } else if state.role != Role::Admin {
        lines.push("ningún niño seleccionado (Enter en la pestaña niños)".to_owned());
    }
    lines.join("\n")
}

fn status_text(state: &AppState, data: &ViewData) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    match state.mode {
        AppMode::Search => format!("buscar: {}▌  (Enter aplica · Esc limpia)", data.search_buffer),
        AppMode::Form(kind) => format!("{} · Esc cancela", kind.title()),
        AppMode::Nav => {
            "q salir · Tab pestaña · / buscar · s ordenar · n/p página · z tamaño · e csv · r recargar"
                .to_owned()
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
