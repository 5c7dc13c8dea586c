//! Visibility/navigation check.
//!
//! A [`Script`] is a linear list of steps: navigation, assertions and
//! clicks. [`run_script`] executes them in order against one engine and
//! stops at the first failing step. There are no retries and no partial
//! success: a run passes only if every step passes.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::locator::{Locator, NameMatch};
use crate::page::{CONTACT_HREF, FEATURES_ANCHOR, OVERVIEW_ANCHOR};
use crate::{Engine, Error, Result};

/// One step of a check script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Load a path (or absolute URL) relative to the base URL
    Goto(String),
    /// Exactly one element matches and it is visible
    ExpectVisible(Locator),
    /// Exactly one element matches and its attribute equals `value`
    ExpectAttribute {
        locator: Locator,
        name: String,
        value: String,
    },
    /// The last fragment navigation scrolled to the element with this id
    ExpectScrolledTo(String),
    /// Click the single element matched by the locator
    Click(Locator),
}

impl Step {
    fn is_assertion(&self) -> bool {
        matches!(
            self,
            Step::ExpectVisible(_) | Step::ExpectAttribute { .. } | Step::ExpectScrolledTo(_)
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Goto(path) => write!(f, "goto {}", path),
            Step::ExpectVisible(l) => write!(f, "expect {} to be visible", l),
            Step::ExpectAttribute {
                locator,
                name,
                value,
            } => write!(f, "expect {} to have {}={:?}", locator, name, value),
            Step::ExpectScrolledTo(id) => write!(f, "expect page scrolled to #{}", id),
            Step::Click(l) => write!(f, "click {}", l),
        }
    }
}

/// An ordered list of steps with a name used in reports
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    name: String,
    steps: Vec<Step>,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn goto(self, path: impl Into<String>) -> Self {
        self.step(Step::Goto(path.into()))
    }

    pub fn expect_visible(self, locator: Locator) -> Self {
        self.step(Step::ExpectVisible(locator))
    }

    pub fn expect_attribute(self, locator: Locator, name: &str, value: &str) -> Self {
        self.step(Step::ExpectAttribute {
            locator,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn expect_scrolled_to(self, id: impl Into<String>) -> Self {
        self.step(Step::ExpectScrolledTo(id.into()))
    }

    pub fn click(self, locator: Locator) -> Self {
        self.step(Step::Click(locator))
    }

    /// Click a link, then immediately assert that `target` is visible.
    pub fn navigate(self, link: Locator, target: Locator) -> Self {
        self.click(link).expect_visible(target)
    }

    /// A script must start by loading a page, and every click must be
    /// followed immediately by a visibility assertion.
    pub fn validate(&self) -> Result<()> {
        match self.steps.first() {
            None => return Err(Error::ConfigError(format!("script {:?} has no steps", self.name))),
            Some(Step::Goto(_)) => {}
            Some(other) => {
                return Err(Error::ConfigError(format!(
                    "script {:?} must start with goto, found `{}`",
                    self.name, other
                )))
            }
        }
        for (i, step) in self.steps.iter().enumerate() {
            if let Step::Click(locator) = step {
                match self.steps.get(i + 1) {
                    Some(Step::ExpectVisible(_)) => {}
                    Some(next) if next.is_assertion() => {
                        return Err(Error::ConfigError(format!(
                            "step {}: click {} must be followed by a visibility assertion, found `{}`",
                            i + 1,
                            locator,
                            next
                        )))
                    }
                    _ => {
                        return Err(Error::ConfigError(format!(
                            "step {}: click {} is not followed by an assertion",
                            i + 1,
                            locator
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

/// The canonical landing page scenario.
pub fn landing_script() -> Script {
    let explore = Locator::link(NameMatch::contains("Explore the workflow"));
    let how = Locator::link(NameMatch::contains("See how it works"));
    let contact = Locator::link(NameMatch::contains("Contact the team"));

    Script::new("renders Git Slice landing content and navigation")
        .goto("/")
        .expect_visible(Locator::heading(1, NameMatch::contains("slice-based workflows")))
        .expect_visible(Locator::text(NameMatch::contains("Introducing Git Slice")))
        .expect_visible(explore.clone())
        .expect_visible(how.clone())
        .navigate(explore, Locator::css(format!("#{}", FEATURES_ANCHOR)))
        .expect_scrolled_to(FEATURES_ANCHOR)
        .navigate(how, Locator::css(format!("#{}", OVERVIEW_ANCHOR)))
        .expect_scrolled_to(OVERVIEW_ANCHOR)
        .expect_visible(Locator::heading(2, NameMatch::contains("Feature highlights")))
        .expect_visible(Locator::heading(3, NameMatch::exact("Speed")))
        .expect_visible(contact.clone())
        .expect_attribute(contact, "href", CONTACT_HREF)
}

/// Result of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// 1-based position in the script
    pub index: usize,
    pub step: String,
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Pass/fail report of one script run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub script: String,
    pub base_url: String,
    pub passed: bool,
    pub outcomes: Vec<StepOutcome>,
    /// Steps not executed because an earlier step failed
    pub skipped: usize,
}

impl CheckReport {
    /// The failing step, if any
    pub fn failure(&self) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.status, StepStatus::Failed(_)))
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.script, self.base_url)?;
        for outcome in &self.outcomes {
            match &outcome.status {
                StepStatus::Passed => writeln!(f, "  ok   {:>2}. {}", outcome.index, outcome.step)?,
                StepStatus::Failed(reason) => writeln!(
                    f,
                    "  FAIL {:>2}. {}\n           {}",
                    outcome.index, outcome.step, reason
                )?,
            }
        }
        if self.skipped > 0 {
            writeln!(f, "  {} step(s) skipped", self.skipped)?;
        }
        write!(f, "{}", if self.passed { "passed" } else { "failed" })
    }
}

/// Run `script` against the site at `base_url`.
///
/// Returns `Err` only when the script itself is invalid or `base_url`
/// cannot be parsed; page and assertion failures are reported as failed
/// steps.
pub fn run_script<E: Engine>(engine: &mut E, base_url: &str, script: &Script) -> Result<CheckReport> {
    script.validate()?;
    let base = Url::parse(base_url)
        .map_err(|e| Error::ConfigError(format!("invalid base URL {:?}: {}", base_url, e)))?;

    let total = script.steps().len();
    let mut outcomes = Vec::with_capacity(total);
    for (i, step) in script.steps().iter().enumerate() {
        let status = match execute(engine, &base, step) {
            Ok(()) => StepStatus::Passed,
            Err(reason) => {
                log::warn!("step {} failed: {}: {}", i + 1, step, reason);
                StepStatus::Failed(reason)
            }
        };
        let failed = matches!(status, StepStatus::Failed(_));
        outcomes.push(StepOutcome {
            index: i + 1,
            step: step.to_string(),
            status,
        });
        if failed {
            break;
        }
        log::debug!("step {} ok: {}", i + 1, step);
    }

    let passed = outcomes.len() == total && outcomes.iter().all(|o| o.status == StepStatus::Passed);
    Ok(CheckReport {
        script: script.name().to_string(),
        base_url: base.to_string(),
        passed,
        skipped: total - outcomes.len(),
        outcomes,
    })
}

fn execute<E: Engine>(engine: &mut E, base: &Url, step: &Step) -> std::result::Result<(), String> {
    match step {
        Step::Goto(path) => {
            let url = base.join(path).map_err(|e| format!("invalid path {:?}: {}", path, e))?;
            engine.load_url(url.as_str()).map_err(|e| e.to_string())
        }
        Step::ExpectVisible(locator) => {
            let el = single(engine, locator)?;
            if el.visible {
                Ok(())
            } else {
                Err(format!("{} is not visible", locator))
            }
        }
        Step::ExpectAttribute {
            locator,
            name,
            value,
        } => {
            let el = single(engine, locator)?;
            match el.attributes.get(name) {
                Some(actual) if actual == value => Ok(()),
                Some(actual) => Err(format!("expected {}={:?}, found {:?}", name, value, actual)),
                None => Err(format!("{} has no {} attribute", locator, name)),
            }
        }
        Step::ExpectScrolledTo(id) => match engine.scroll_target() {
            Some(current) if current == id => Ok(()),
            Some(current) => Err(format!("scrolled to #{}, expected #{}", current, id)),
            None => Err(format!("no fragment navigation happened, expected #{}", id)),
        },
        Step::Click(locator) => engine
            .click(locator)
            .map(|nav| log::debug!("{:?}", nav))
            .map_err(|e| e.to_string()),
    }
}

fn single<E: Engine>(engine: &E, locator: &Locator) -> std::result::Result<crate::ElementInfo, String> {
    let mut matches = engine.inspect(locator).map_err(|e| e.to_string())?;
    match matches.len() {
        0 => Err(format!("element not found: {}", locator)),
        1 => Ok(matches.remove(0)),
        n => Err(format!(
            "strict mode violation: {} resolved to {} elements",
            locator, n
        )),
    }
}
