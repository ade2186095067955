//! Interactive project naming: `vizzy new`.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};

use vizzy::client::GalleryClient;
use vizzy_common::identity::{City, ProjectIdentity, ProjectType};
use vizzy_common::wizard::{Step, Wizard, WizardEvent, WizardHost, sanitize_number_input};

/// Answers supplied on the command line; each one skips its prompt.
#[derive(Debug, Default)]
pub struct WizardAnswers {
    pub city: Option<String>,
    pub project_type: Option<String>,
    pub number: Option<String>,
    pub name: Option<String>,
}

#[derive(Default)]
struct CaptureHost {
    identity: Option<ProjectIdentity>,
}

impl WizardHost for CaptureHost {
    fn on_complete(&mut self, identity: ProjectIdentity) {
        self.identity = Some(identity);
    }

    fn on_cancel(&mut self) {
        self.identity = None;
    }
}

pub async fn cmd_new(server_url: &str, answers: WizardAnswers) -> Result<()> {
    let Some(identity) = run_wizard(answers)? else {
        println!("{}", style("Cancelled.").dim());
        return Ok(());
    };
    let name = identity.encode()?;

    let client = GalleryClient::new(server_url);
    let project = client
        .create_project(&name)
        .await
        .context("Failed to create project")?;
    println!(
        "{} {} (id {})",
        style("Created").green().bold(),
        project.name,
        project.id
    );
    Ok(())
}

fn run_wizard(mut answers: WizardAnswers) -> Result<Option<ProjectIdentity>> {
    let mut wizard = Wizard::new();
    let mut host = CaptureHost::default();

    while !wizard.is_finished() {
        let (events, scripted) = match scripted_events(&wizard, &mut answers) {
            Some(events) => (events, true),
            None => (prompt_events(&wizard)?, false),
        };
        for event in events {
            if let Err(e) = wizard.dispatch(event, &mut host) {
                if scripted {
                    anyhow::bail!(e);
                }
                println!("  {} {}", style("✗").red(), e);
                break;
            }
        }
    }
    Ok(host.identity)
}

/// Events for the current step taken from command-line answers, if given.
fn scripted_events(wizard: &Wizard, answers: &mut WizardAnswers) -> Option<Vec<WizardEvent>> {
    match wizard.step() {
        Step::City => answers
            .city
            .take()
            .map(|c| vec![WizardEvent::SelectCity(c.to_uppercase())]),
        Step::Type => answers
            .project_type
            .take()
            .map(|t| vec![WizardEvent::SelectType(t.to_uppercase())]),
        Step::Number => answers
            .number
            .take()
            .map(|n| number_events(&n)),
        Step::Name => answers
            .name
            .take()
            .map(|n| vec![WizardEvent::EditName(n), WizardEvent::SubmitName]),
    }
}

/// Replays an undashed `raw` one keystroke at a time, so `24117` becomes
/// `24-117` the same way it would while typing.
fn number_events(raw: &str) -> Vec<WizardEvent> {
    let raw = raw.trim();
    if raw.contains('-') {
        return vec![
            WizardEvent::EditNumber(raw.to_string()),
            WizardEvent::SubmitNumber,
        ];
    }
    let mut value = String::new();
    let mut events = Vec::new();
    for ch in raw.chars() {
        value.push(ch);
        value = sanitize_number_input(&value);
        events.push(WizardEvent::EditNumber(value.clone()));
    }
    events.push(WizardEvent::SubmitNumber);
    events
}

fn prompt_events(wizard: &Wizard) -> Result<Vec<WizardEvent>> {
    let theme = ColorfulTheme::default();
    let step = wizard.step();
    println!();
    println!("{}", style(step.title()).bold().cyan());

    let events = match step {
        Step::City => {
            let mut labels: Vec<String> = City::KNOWN
                .iter()
                .map(|c| format!("{} ({})", c.name().unwrap_or_default(), c))
                .collect();
            labels.push("Cancel".to_string());
            let choice = Select::with_theme(&theme)
                .items(&labels)
                .default(0)
                .interact_opt()?;
            match choice {
                Some(i) if i < City::KNOWN.len() => {
                    vec![WizardEvent::SelectCity(City::KNOWN[i].as_str().to_string())]
                }
                Some(_) => vec![WizardEvent::Cancel],
                None => vec![WizardEvent::Escape],
            }
        }
        Step::Type => {
            let mut labels: Vec<String> = ProjectType::KNOWN
                .iter()
                .map(|t| format!("{} ({})", t.name().unwrap_or_default(), t))
                .collect();
            labels.push("Back".to_string());
            let choice = Select::with_theme(&theme)
                .with_prompt(wizard.city().map(City::to_string).unwrap_or_default())
                .items(&labels)
                .default(0)
                .interact_opt()?;
            match choice {
                Some(i) if i < ProjectType::KNOWN.len() => vec![WizardEvent::SelectType(
                    ProjectType::KNOWN[i].as_str().to_string(),
                )],
                Some(_) | None => vec![WizardEvent::Back],
            }
        }
        Step::Number => {
            let raw: String = Input::with_theme(&theme)
                .with_prompt(format!("{}XX-XXX (empty to go back)", wizard.prompt_prefix()))
                .allow_empty(true)
                .interact_text()?;
            if raw.trim().is_empty() {
                vec![WizardEvent::Back]
            } else {
                number_events(&raw)
            }
        }
        Step::Name => {
            let raw: String = Input::with_theme(&theme)
                .with_prompt(format!("{} (empty to go back)", wizard.prompt_prefix()))
                .allow_empty(true)
                .interact_text()?;
            if raw.trim().is_empty() {
                vec![WizardEvent::Back]
            } else {
                vec![WizardEvent::EditName(raw), WizardEvent::SubmitName]
            }
        }
    };
    Ok(events)
}
