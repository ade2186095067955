//! Naming wizard: the guided City → Type → Number → Name flow that
//! produces a new project's identity string.
//!
//! All input arrives as [`WizardEvent`]s and goes through a single
//! `(step, event)` table in [`Wizard::handle`]. Each step owns exactly one
//! piece of data; stepping back discards what the departed step collected
//! and leaves the step we return to as the user left it.

use std::fmt;

use thiserror::Error;

use crate::identity::{City, IdentityError, ProjectIdentity, ProjectNumber, ProjectType};

/// Longest accepted project number input (`NN-NNN`).
pub const NUMBER_MAX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    City,
    Type,
    Number,
    Name,
}

impl Step {
    pub fn title(&self) -> &'static str {
        match self {
            Step::City => "Select Project Location",
            Step::Type => "Select Project Type",
            Step::Number => "Enter Project Number",
            Step::Name => "Name Your Project",
        }
    }

    fn previous(&self) -> Option<Step> {
        match self {
            Step::City => None,
            Step::Type => Some(Step::City),
            Step::Number => Some(Step::Type),
            Step::Name => Some(Step::Number),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::City => "city",
            Step::Type => "type",
            Step::Number => "number",
            Step::Name => "name",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    SelectCity(String),
    SelectType(String),
    /// The full current contents of the number field after a keystroke.
    EditNumber(String),
    SubmitNumber,
    EditName(String),
    SubmitName,
    Back,
    Cancel,
    Escape,
}

impl WizardEvent {
    fn kind(&self) -> &'static str {
        match self {
            WizardEvent::SelectCity(_) => "select_city",
            WizardEvent::SelectType(_) => "select_type",
            WizardEvent::EditNumber(_) => "edit_number",
            WizardEvent::SubmitNumber => "submit_number",
            WizardEvent::EditName(_) => "edit_name",
            WizardEvent::SubmitName => "submit_name",
            WizardEvent::Back => "back",
            WizardEvent::Cancel => "cancel",
            WizardEvent::Escape => "escape",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Input was accepted without changing step.
    Stay,
    Moved(Step),
    Cancelled,
    Completed(ProjectIdentity),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("Unknown city '{0}'")]
    UnknownCity(String),

    #[error("Unknown project type '{0}'")]
    UnknownProjectType(String),

    #[error("Format must be XX-XXX (e.g., 12-345)")]
    InvalidNumber(String),

    #[error("Project name cannot be empty")]
    EmptyName,

    #[error("Project name '{0}' would be read as part of the project prefix")]
    AmbiguousName(String),

    #[error("Event '{event}' is not valid on the {step} step")]
    UnexpectedEvent { step: Step, event: &'static str },

    #[error("Wizard has already finished")]
    Finished,
}

impl From<IdentityError> for WizardError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::EmptyName => WizardError::EmptyName,
            IdentityError::InvalidNumber(n) => WizardError::InvalidNumber(n),
            IdentityError::UnknownCity(c) => WizardError::UnknownCity(c),
            IdentityError::UnknownProjectType(t) => WizardError::UnknownProjectType(t),
            IdentityError::AmbiguousName(n) => WizardError::AmbiguousName(n),
        }
    }
}

/// Receiver of the wizard's terminal transitions.
pub trait WizardHost {
    fn on_complete(&mut self, identity: ProjectIdentity);
    fn on_cancel(&mut self);
}

/// Keep only digits and dashes, add the dash after the second digit, and
/// cap the length at [`NUMBER_MAX_LEN`].
pub fn sanitize_number_input(raw: &str) -> String {
    let mut value: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    if value.len() == 2 && !value.contains('-') {
        value.push('-');
    }
    value.truncate(NUMBER_MAX_LEN);
    value
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: Step,
    city: Option<City>,
    project_type: Option<ProjectType>,
    number: String,
    name: String,
    finished: bool,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: Step::City,
            city: None,
            project_type: None,
            number: String::new(),
            name: String::new(),
            finished: false,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn city(&self) -> Option<&City> {
        self.city.as_ref()
    }

    pub fn project_type(&self) -> Option<&ProjectType> {
        self.project_type.as_ref()
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fixed text rendered in front of the input on the Number and Name steps.
    pub fn prompt_prefix(&self) -> String {
        let city = self.city.as_ref().map(City::as_str).unwrap_or_default();
        let kind = self
            .project_type
            .as_ref()
            .map(ProjectType::as_str)
            .unwrap_or_default();
        match self.step {
            Step::City | Step::Type => String::new(),
            Step::Number => format!("{}-{}-", city, kind),
            Step::Name => format!("{}-{}-{}-", city, kind, self.number),
        }
    }

    /// Inline message for a partially typed, not yet valid number.
    pub fn number_error(&self) -> Option<&'static str> {
        if self.step == Step::Number
            && !self.number.is_empty()
            && !ProjectNumber::is_valid(&self.number)
        {
            Some("Format must be XX-XXX (e.g., 12-345)")
        } else {
            None
        }
    }

    /// Whether the current step's forward action would be accepted.
    pub fn can_advance(&self) -> bool {
        match self.step {
            Step::City => self.city.is_some(),
            Step::Type => self.project_type.is_some(),
            Step::Number => ProjectNumber::is_valid(&self.number),
            Step::Name => !self.name.trim().is_empty(),
        }
    }

    pub fn handle(&mut self, event: WizardEvent) -> Result<Transition, WizardError> {
        if self.finished {
            return Err(WizardError::Finished);
        }

        let transition = match (self.step, event) {
            (Step::City, WizardEvent::SelectCity(abbr)) => {
                self.city = Some(abbr.parse()?);
                self.enter(Step::Type)
            }
            (Step::Type, WizardEvent::SelectType(abbr)) => {
                self.project_type = Some(abbr.parse()?);
                self.number.clear();
                self.enter(Step::Number)
            }
            (Step::Number, WizardEvent::EditNumber(raw)) => {
                self.number = sanitize_number_input(&raw);
                Transition::Stay
            }
            (Step::Number, WizardEvent::SubmitNumber) => {
                if !ProjectNumber::is_valid(&self.number) {
                    return Err(WizardError::InvalidNumber(self.number.clone()));
                }
                self.name.clear();
                self.enter(Step::Name)
            }
            (Step::Name, WizardEvent::EditName(raw)) => {
                self.name = raw;
                Transition::Stay
            }
            (Step::Name, WizardEvent::SubmitName) => self.complete()?,
            (Step::City, WizardEvent::Escape) | (_, WizardEvent::Cancel) => {
                self.finished = true;
                Transition::Cancelled
            }
            (Step::City, WizardEvent::Back) => Transition::Stay,
            (_, WizardEvent::Back | WizardEvent::Escape) => self.back(),
            (step, event) => {
                return Err(WizardError::UnexpectedEvent {
                    step,
                    event: event.kind(),
                });
            }
        };
        Ok(transition)
    }

    /// Like [`handle`](Self::handle), but reports terminal transitions to
    /// `host` instead of returning them.
    pub fn dispatch<H: WizardHost>(
        &mut self,
        event: WizardEvent,
        host: &mut H,
    ) -> Result<Transition, WizardError> {
        let transition = self.handle(event)?;
        match &transition {
            Transition::Completed(identity) => host.on_complete(identity.clone()),
            Transition::Cancelled => host.on_cancel(),
            Transition::Stay | Transition::Moved(_) => {}
        }
        Ok(transition)
    }

    fn enter(&mut self, step: Step) -> Transition {
        self.step = step;
        Transition::Moved(step)
    }

    fn back(&mut self) -> Transition {
        match self.step {
            Step::City => {}
            Step::Type => self.project_type = None,
            Step::Number => self.number.clear(),
            Step::Name => self.name.clear(),
        }
        match self.step.previous() {
            Some(prev) => self.enter(prev),
            None => Transition::Stay,
        }
    }

    fn complete(&mut self) -> Result<Transition, WizardError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(WizardError::EmptyName);
        }
        let number: ProjectNumber = self.number.parse()?;
        let (Some(city), Some(project_type)) = (self.city.take(), self.project_type.take())
        else {
            return Err(WizardError::UnexpectedEvent {
                step: self.step,
                event: "submit_name",
            });
        };
        let identity = ProjectIdentity {
            city,
            project_type,
            number: Some(number),
            display_name: name.to_string(),
        };
        self.number.clear();
        self.name.clear();
        self.finished = true;
        Ok(Transition::Completed(identity))
    }
}
