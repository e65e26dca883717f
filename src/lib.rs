//! formwizard - session-backed multi-step form flow for web services.
//!
//! Sequences named steps bound to URLs, persists per-step form data in a
//! session, enforces forward-only navigation, and replays previously
//! entered data into the current request. The host framework owns HTTP,
//! session storage, and routing; this crate consumes them through
//! [`SessionStore`], [`RequestContext`], and the [`Dispatch`] outcome.
//!
//! Build a [`Wizard`] once at startup, then create a [`WizardController`]
//! per request and hand it the request via
//! [`startup`](WizardController::startup). See the `rest` module and the
//! serve binary for a full axum wiring.

pub mod config;
pub mod logging;
pub mod request;
pub mod rest;
pub mod session;
pub mod wizard;

pub use request::{Dispatch, MethodKind, RequestContext};
pub use session::{MemorySession, SessionStore};
pub use wizard::{
    Hook, HookOutcome, PrefixResolver, Step, StepBuilder, StepView, Toggle, UrlResolver, Wizard,
    WizardBuilder, WizardController,
};
