//! The wizard: an ordered step registry with per-step submission hooks.
//!
//! Built once at application setup through [`WizardBuilder`] and then
//! immutable; all per-request state (current step, session progress) lives
//! in [`WizardController`](crate::WizardController), created fresh for each
//! request.
//!
//! ```rust
//! use formwizard::{StepBuilder, WizardBuilder, PrefixResolver, HookOutcome};
//!
//! let wizard = WizardBuilder::new()
//!     .resolver(PrefixResolver::new("/checkout"))
//!     .step(StepBuilder::action("account").name("Account"))
//!     .step(
//!         StepBuilder::action("shipping")
//!             .name("Shipping")
//!             .handler(|req| {
//!                 if req.data.contains_key("address") {
//!                     HookOutcome::Proceed
//!                 } else {
//!                     HookOutcome::Reject
//!                 }
//!             }),
//!     )
//!     .step(StepBuilder::action("review").name("Review"))
//!     .build();
//!
//! assert_eq!(wizard.index_of("/checkout/shipping"), Some(1));
//! ```

pub mod controller;
pub mod progress;
pub mod step;

pub use controller::WizardController;
pub use step::{Step, StepView, Toggle};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::request::RequestContext;

/// Default session namespace for progress state.
pub const DEFAULT_SESSION_KEY: &str = "Wizard";

/// Maps an abstract action identifier to a canonical URL path.
///
/// Called once per step at registration time. Closures taking `&str` and
/// returning `String` implement this directly.
pub trait UrlResolver {
    fn resolve(&self, action: &str) -> String;
}

impl<F> UrlResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve(&self, action: &str) -> String {
        self(action)
    }
}

/// Resolves actions by joining them onto a fixed base path:
/// `PrefixResolver::new("/checkout")` turns `review` into `/checkout/review`.
#[derive(Debug, Clone)]
pub struct PrefixResolver {
    base: String,
}

impl PrefixResolver {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { base }
    }
}

impl UrlResolver for PrefixResolver {
    fn resolve(&self, action: &str) -> String {
        format!("{}/{}", self.base, action.trim_start_matches('/'))
    }
}

/// What a step handler decided about a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Persist the (possibly mutated) request data and advance.
    Proceed,
    /// Abort: nothing is persisted, progress does not move, no redirect is
    /// issued. The host re-renders the form with validation feedback.
    Reject,
}

/// Per-step submission handler, registered at step-definition time.
///
/// Runs before anything is persisted; may mutate `req.data` (normalize
/// fields, strip noise) or veto the submission entirely.
pub type Hook = Arc<dyn Fn(&mut RequestContext) -> HookOutcome + Send + Sync>;

/// Builder for one step definition.
#[derive(Default)]
pub struct StepBuilder {
    action: String,
    name: String,
    description: String,
    hidden: Toggle,
    disabled: Toggle,
    handler: Option<Hook>,
}

impl StepBuilder {
    /// Start a step bound to `action`; the wizard resolves it to a URL when
    /// the step is registered.
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Toggle::from(hidden);
        self
    }

    /// Hide the step when `predicate` evaluates true at the point of use.
    pub fn hidden_when(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.hidden = Toggle::Computed(Arc::new(predicate));
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Toggle::from(disabled);
        self
    }

    /// Disable (auto-submit) the step when `predicate` evaluates true.
    pub fn disabled_when(mut self, predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.disabled = Toggle::Computed(Arc::new(predicate));
        self
    }

    /// Register the submission handler for this step.
    pub fn handler(
        mut self,
        handler: impl Fn(&mut RequestContext) -> HookOutcome + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

/// Builds an immutable [`Wizard`] from an ordered series of steps.
pub struct WizardBuilder {
    session_key: String,
    resolver: Box<dyn UrlResolver>,
    steps: Vec<Step>,
    hooks: HashMap<usize, Hook>,
}

impl Default for WizardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardBuilder {
    pub fn new() -> Self {
        Self {
            session_key: DEFAULT_SESSION_KEY.to_string(),
            resolver: Box::new(PrefixResolver::new("")),
            steps: Vec::new(),
            hooks: HashMap::new(),
        }
    }

    /// Session namespace for progress state (default `"Wizard"`).
    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// URL resolution for subsequent [`step`](Self::step) calls.
    pub fn resolver(mut self, resolver: impl UrlResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Append a step. Insertion order defines the required completion
    /// sequence. URL uniqueness is assumed, not enforced; a duplicate URL
    /// resolves to the first matching index in every lookup.
    pub fn step(mut self, step: StepBuilder) -> Self {
        let url = self.resolver.resolve(&step.action);
        let index = self.steps.len();
        debug!(index, url = %url, "registered wizard step");

        if let Some(handler) = step.handler {
            self.hooks.insert(index, handler);
        }
        self.steps.push(Step {
            name: step.name,
            description: step.description,
            url,
            hidden: step.hidden,
            disabled: step.disabled,
        });
        self
    }

    pub fn build(self) -> Wizard {
        Wizard {
            session_key: self.session_key,
            steps: self.steps,
            hooks: self.hooks,
        }
    }
}

/// The immutable step registry plus configuration, shared across requests.
pub struct Wizard {
    session_key: String,
    steps: Vec<Step>,
    hooks: HashMap<usize, Hook>,
}

impl Wizard {
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// All registered steps in completion order, hidden ones included.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First registry position whose URL matches.
    pub fn index_of(&self, url: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.url == url)
    }

    pub fn is_step(&self, url: &str) -> bool {
        self.index_of(url).is_some()
    }

    pub fn step_at(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn step_by_url(&self, url: &str) -> Option<&Step> {
        self.index_of(url).and_then(|index| self.step_at(index))
    }

    pub(crate) fn hook(&self, index: usize) -> Option<&Hook> {
        self.hooks.get(&index)
    }
}
