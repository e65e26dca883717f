//! Step definitions.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A step flag that is either a literal or computed on demand.
///
/// `hidden` and `disabled` can depend on runtime state (a config switch, a
/// feature check), so a step may carry a predicate instead of a plain bool.
/// The predicate is evaluated at the point of use, never at registration.
#[derive(Clone, Default)]
pub enum Toggle {
    #[default]
    Off,
    On,
    Computed(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Toggle {
    /// Evaluate the toggle.
    pub fn resolve(&self) -> bool {
        match self {
            Self::Off => false,
            Self::On => true,
            Self::Computed(predicate) => predicate(),
        }
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl fmt::Debug for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::On => write!(f, "On"),
            Self::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

/// One stage of the wizard.
///
/// A step's position in the registry is its index, the sole identity used
/// for progress comparisons. The `url` is resolved from the action name at
/// registration time and is how incoming requests are matched to steps.
#[derive(Debug, Clone)]
pub struct Step {
    /// Display name, opaque to the flow logic.
    pub name: String,
    /// Display description, opaque to the flow logic.
    pub description: String,
    /// Canonical URL identifying this step.
    pub url: String,
    /// Hidden steps are dropped from listings but stay addressable and keep
    /// their index.
    pub hidden: Toggle,
    /// Disabled steps auto-submit on any request, not only writes.
    pub disabled: Toggle,
}

/// A visible step annotated for display, as returned by
/// [`steps`](crate::WizardController::steps).
///
/// Positions in the returned listing do not match registry indices once
/// hidden steps are dropped; callers needing the index must look it up by
/// URL.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub name: String,
    pub description: String,
    pub url: String,
    /// Index strictly before the current step.
    pub completed: bool,
    /// Index equal to the current step.
    pub active: bool,
    /// `disabled` toggle, resolved.
    pub disabled: bool,
}

impl StepView {
    pub(crate) fn new(step: &Step, completed: bool, active: bool) -> Self {
        Self {
            name: step.name.clone(),
            description: step.description.clone(),
            url: step.url.clone(),
            completed,
            active,
            disabled: step.disabled.resolve(),
        }
    }
}
