//! Shared state for the demo wizard server.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::request::RequestContext;
use crate::session::MemorySession;
use crate::wizard::{HookOutcome, PrefixResolver, StepBuilder, Wizard, WizardBuilder};

/// Shared state for the demo server: the wizard (immutable) and one
/// in-memory session per client cookie.
#[derive(Clone)]
pub struct AppState {
    pub wizard: Arc<Wizard>,
    pub sessions: Arc<RwLock<HashMap<Uuid, MemorySession>>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            wizard: Arc::new(build_checkout_wizard(config)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config.clone()),
        }
    }
}

/// The demo checkout flow: account, shipping, payment, review. Payment can
/// be switched off in config, in which case it auto-submits and back links
/// skip over it.
pub fn build_checkout_wizard(config: &Config) -> Wizard {
    let skip_payment = config.wizard.skip_payment;

    WizardBuilder::new()
        .session_key(config.session_key.clone())
        .resolver(PrefixResolver::new(config.wizard.base_path.as_str()))
        .step(
            StepBuilder::action("account")
                .name("Account")
                .description("Who is checking out")
                .handler(require_fields(&["email"])),
        )
        .step(
            StepBuilder::action("shipping")
                .name("Shipping")
                .description("Where to send the order")
                .handler(require_fields(&["address"])),
        )
        .step(
            StepBuilder::action("payment")
                .name("Payment")
                .description("How to pay")
                .disabled_when(move || skip_payment),
        )
        .step(
            StepBuilder::action("review")
                .name("Review")
                .description("Confirm the order"),
        )
        .build()
}

/// Server-side per-step validation: reject a submission missing any of the
/// given fields.
fn require_fields(
    fields: &'static [&'static str],
) -> impl Fn(&mut RequestContext) -> HookOutcome + Send + Sync + 'static {
    move |req| {
        if fields.iter().all(|field| req.data.contains_key(*field)) {
            HookOutcome::Proceed
        } else {
            HookOutcome::Reject
        }
    }
}
