// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::PathBuf;
use time::{Date, OffsetDateTime};

use sisconi_api::{Client, Session};
use sisconi_app::{
    Child, ChildId, FormPayload, HistoryEntry, NextDose, OverviewCounts, Role, ScheduleDose,
    ScheduleId, User, Vaccine, VaccineId,
};
use sisconi_tui::{AppRuntime, SubmitOutcome};

/// Bridges the dashboard to the HTTP client. Holds the session for the whole
/// UI lifetime: login creates it, logout (or process exit) drops it.
pub struct ApiRuntime {
    client: Client,
    session: Option<Session>,
    export_dir: PathBuf,
}

impl ApiRuntime {
    pub fn new(client: Client, export_dir: PathBuf) -> Self {
        Self {
            client,
            session: None,
            export_dir,
        }
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| anyhow!("no hay sesión activa -- inicia sesión primero"))
    }

    fn write_export(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.export_dir).with_context(|| {
            format!("create export directory {}", self.export_dir.display())
        })?;
        let path = self.export_dir.join(file_name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

impl AppRuntime for ApiRuntime {
    fn login(&mut self, document_number: &str, password: &str) -> Result<User> {
        let session = self.client.login(document_number, password)?;
        let user = session.user().clone();
        self.session = Some(session);
        Ok(user)
    }

    fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            session.logout();
        }
    }

    fn today(&mut self) -> Date {
        OffsetDateTime::now_utc().date()
    }

    fn load_overview(&mut self) -> Result<OverviewCounts> {
        let session = self.session()?;
        // Non-admin roles get 403s on some of these endpoints; those sections
        // simply count zero instead of failing the whole overview.
        let users = session.list_users().map(|users| users.len()).unwrap_or(0);
        let children = match session.role() {
            Role::Representative => session.my_children(),
            _ => session.list_children(),
        }
        .map(|children| children.len())
        .unwrap_or(0);
        let active_vaccines = session
            .list_vaccines()
            .map(|vaccines| vaccines.iter().filter(|vaccine| vaccine.active).count())
            .unwrap_or(0);
        let schedule_doses = session
            .full_schedule()
            .map(|schedule| schedule.len())
            .unwrap_or(0);

        Ok(OverviewCounts {
            users,
            children,
            active_vaccines,
            schedule_doses,
        })
    }

    fn load_users(&mut self) -> Result<Vec<User>> {
        self.session()?.list_users()
    }

    fn load_children(&mut self) -> Result<Vec<Child>> {
        let session = self.session()?;
        match session.role() {
            Role::Representative => session.my_children(),
            _ => session.list_children(),
        }
    }

    fn load_vaccines(&mut self) -> Result<Vec<Vaccine>> {
        self.session()?.list_vaccines()
    }

    fn load_schedule(&mut self) -> Result<Vec<ScheduleDose>> {
        self.session()?.full_schedule()
    }

    fn load_next_doses(&mut self, child: ChildId) -> Result<Vec<NextDose>> {
        self.session()?.next_vaccines(child)
    }

    fn load_history(&mut self, child: ChildId) -> Result<Vec<HistoryEntry>> {
        self.session()?.child_history(child)
    }

    fn submit_form(&mut self, payload: &FormPayload) -> Result<SubmitOutcome> {
        let session = self.session()?;
        let outcome = match payload {
            FormPayload::User(form) => {
                session.create_user(form)?;
                SubmitOutcome::Created
            }
            FormPayload::Vaccine(form) => {
                session.create_vaccine(form)?;
                SubmitOutcome::Created
            }
            FormPayload::Schedule(form) => {
                session.create_schedule_dose(form)?;
                SubmitOutcome::Created
            }
            FormPayload::Registration(form) => {
                let outcome = session.register_child(form)?;
                SubmitOutcome::Registration {
                    guardian_id: outcome.guardian_id,
                    child_id: outcome.child_id,
                }
            }
            FormPayload::Visit(form) => SubmitOutcome::Visit(session.create_visit(form)?),
            FormPayload::Application(form) => {
                SubmitOutcome::Application(session.apply_vaccine(form)?)
            }
        };
        Ok(outcome)
    }

    fn deactivate_vaccine(&mut self, id: VaccineId) -> Result<()> {
        self.session()?.deactivate_vaccine(id)
    }

    fn delete_schedule_dose(&mut self, id: ScheduleId) -> Result<()> {
        self.session()?.delete_schedule_dose(id)
    }

    fn export_csv(&mut self, file_name: &str, contents: &str) -> Result<PathBuf> {
        self.write_export(file_name, contents)
    }

    fn export_cartilla(&mut self, file_name: &str, contents: &str) -> Result<PathBuf> {
        self.write_export(file_name, contents)
    }
}
