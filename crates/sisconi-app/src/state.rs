// Copyright 2026 the SISCONI authors
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, FormKind, Role, TabKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub role: Role,
    pub mode: AppMode,
    pub active_tab: TabKind,
    pub status_line: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    EnterSearch,
    ExitToNav,
    OpenForm(FormKind),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TabChanged(TabKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn new(role: Role) -> Self {
        let tabs = TabKind::visible_for(role);
        Self {
            role,
            mode: AppMode::Nav,
            active_tab: tabs[0],
            status_line: None,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::EnterSearch => {
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenForm(kind) => {
                if !kind.allowed_for(self.role) {
                    return vec![self.set_status(&format!(
                        "{} no disponible para {}",
                        kind.title(),
                        self.role.label()
                    ))];
                }
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        let tabs = TabKind::visible_for(self.role);
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_tab = tabs[next];
        vec![AppEvent::TabChanged(self.active_tab)]
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::{AppMode, FormKind, Role, TabKind};

    #[test]
    fn first_visible_tab_is_the_default() {
        let state = AppState::new(Role::Representative);
        assert_eq!(state.active_tab, TabKind::Overview);
    }

    #[test]
    fn tab_rotation_wraps_within_the_role_set() {
        let mut state = AppState::new(Role::Admin);
        state.active_tab = TabKind::Schedule;

        let events = state.dispatch(AppCommand::NextTab);
        assert_eq!(state.active_tab, TabKind::Overview);
        assert_eq!(events, vec![AppEvent::TabChanged(TabKind::Overview)]);

        state.dispatch(AppCommand::PrevTab);
        assert_eq!(state.active_tab, TabKind::Schedule);
    }

    #[test]
    fn forms_are_rejected_for_the_wrong_role() {
        let mut state = AppState::new(Role::Representative);
        let events = state.dispatch(AppCommand::OpenForm(FormKind::User));
        assert_eq!(state.mode, AppMode::Nav);
        assert!(matches!(events[0], AppEvent::StatusUpdated(_)));
        assert!(state.status_line.is_some());
    }

    #[test]
    fn allowed_form_switches_the_mode() {
        let mut state = AppState::new(Role::Pediatrician);
        state.dispatch(AppCommand::OpenForm(FormKind::Visit));
        assert_eq!(state.mode, AppMode::Form(FormKind::Visit));

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn search_mode_round_trip() {
        let mut state = AppState::new(Role::Admin);
        state.dispatch(AppCommand::EnterSearch);
        assert_eq!(state.mode, AppMode::Search);
        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn clear_status_drops_the_line() {
        let mut state = AppState::new(Role::Admin);
        state.set_status("listo");
        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status_line, None);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
    }
}
