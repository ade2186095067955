//! Sidebar view state: search, city/type filter bubbles, collapse and theme.
//!
//! State lives in one [`ViewState`] value and changes only through
//! [`ViewAction`]s passed to [`ViewStore::dispatch`]; views read the state
//! and send actions back instead of mutating shared globals.

use serde::{Deserialize, Serialize};

use crate::identity::{display_name, filter_key_of};

/// Anything listed in the sidebar by its encoded project name.
pub trait Named {
    fn full_name(&self) -> &str;
}

impl Named for String {
    fn full_name(&self) -> &str {
        self
    }
}

impl Named for &str {
    fn full_name(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub cities: Vec<String>,
    pub project_types: Vec<String>,
    pub search: String,
}

impl ProjectFilter {
    pub fn toggle_city(&mut self, city: &str) {
        toggle(&mut self.cities, city);
    }

    pub fn toggle_project_type(&mut self, project_type: &str) {
        toggle(&mut self.project_types, project_type);
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn clear(&mut self) {
        self.cities.clear();
        self.project_types.clear();
        self.search.clear();
    }

    /// Number shown on the filter badge. The search term is not counted.
    pub fn active_count(&self) -> usize {
        self.cities.len() + self.project_types.len()
    }

    pub fn has_active(&self) -> bool {
        self.active_count() > 0 || !self.search.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        if !self.search.is_empty() {
            let term = self.search.to_lowercase();
            let hit = display_name(name).to_lowercase().contains(&term)
                || name.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }

        // Names that don't follow the CITY-TYPE format are always shown.
        let Some(key) = filter_key_of(name) else {
            return true;
        };
        let city_ok = self.cities.is_empty() || self.cities.iter().any(|c| c == key.city);
        let type_ok = self.project_types.is_empty()
            || self.project_types.iter().any(|t| t == key.project_type);
        city_ok && type_ok
    }

    pub fn apply<'a, T: Named>(&self, items: &'a [T]) -> Vec<&'a T> {
        items
            .iter()
            .filter(|item| self.matches(item.full_name()))
            .collect()
    }
}

fn toggle(values: &mut Vec<String>, value: &str) {
    match values.iter().position(|v| v == value) {
        Some(i) => {
            values.remove(i);
        }
        None => values.push(value.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub filters: ProjectFilter,
    pub filters_expanded: bool,
    pub sidebar_collapsed: bool,
    pub theme: Theme,
    pub active_project: Option<i64>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            filters: ProjectFilter::default(),
            filters_expanded: true,
            sidebar_collapsed: false,
            theme: Theme::default(),
            active_project: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    ToggleCity(String),
    ToggleProjectType(String),
    SetSearch(String),
    ClearSearch,
    ClearFilters,
    ToggleFiltersExpanded,
    ToggleSidebar,
    ToggleTheme,
    SelectProject(Option<i64>),
}

impl ViewState {
    pub fn reduce(&mut self, action: ViewAction) {
        match action {
            ViewAction::ToggleCity(c) => self.filters.toggle_city(&c),
            ViewAction::ToggleProjectType(t) => self.filters.toggle_project_type(&t),
            ViewAction::SetSearch(term) => self.filters.set_search(term),
            ViewAction::ClearSearch => self.filters.search.clear(),
            ViewAction::ClearFilters => self.filters.clear(),
            ViewAction::ToggleFiltersExpanded => self.filters_expanded = !self.filters_expanded,
            ViewAction::ToggleSidebar => self.sidebar_collapsed = !self.sidebar_collapsed,
            ViewAction::ToggleTheme => self.theme = self.theme.toggled(),
            ViewAction::SelectProject(id) => self.active_project = id,
        }
    }
}

type Listener = Box<dyn FnMut(&ViewState) + Send>;

/// Owns the [`ViewState`] and notifies subscribers after every action.
#[derive(Default)]
pub struct ViewStore {
    state: ViewState,
    listeners: Vec<Listener>,
}

impl ViewStore {
    pub fn new(state: ViewState) -> Self {
        Self {
            state,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ViewState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn dispatch(&mut self, action: ViewAction) {
        self.state.reduce(action);
        for listener in &mut self.listeners {
            listener(&self.state);
        }
    }
}
