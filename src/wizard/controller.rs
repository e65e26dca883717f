//! Per-request wizard controller: access guard, request interceptor, and
//! step processor.
//!
//! A controller is created fresh for each request from the shared
//! [`Wizard`] and the request's session. [`startup`](WizardController::startup)
//! is the per-request entry point; everything else is queries the host can
//! call while rendering (step listings, back links, merged data).
//!
//! Ordering inside `startup` is fixed: resolve the step, check access,
//! merge stored data under the live payload, then process if the request is
//! a write (or the step auto-submits). A URL that matches no step is a
//! passthrough, never an error.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::request::{Dispatch, RequestContext};
use crate::session::SessionStore;
use crate::wizard::{progress, HookOutcome, Step, StepView, Wizard};

/// Wizard logic bound to one request's session.
pub struct WizardController<'w, 's, S: SessionStore + ?Sized> {
    wizard: &'w Wizard,
    session: &'s mut S,
    /// Registry index of the step the current request addresses, set by
    /// `startup` or `process`.
    index: Option<usize>,
}

impl<'w, 's, S: SessionStore + ?Sized> WizardController<'w, 's, S> {
    pub fn new(wizard: &'w Wizard, session: &'s mut S) -> Self {
        Self {
            wizard,
            session,
            index: None,
        }
    }

    /// Registry index of the current step, once a request has been matched.
    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    pub fn current_step(&self) -> Option<&'w Step> {
        self.index.and_then(|index| self.wizard.step_at(index))
    }

    /// Per-request entry point.
    ///
    /// Resolves the request path to a step, applies the access guard,
    /// replays stored data into `req.data` (live request fields win on
    /// conflict), and for write requests, or steps whose `disabled` toggle
    /// resolves true, runs the step processor.
    pub fn startup(&mut self, req: &mut RequestContext) -> Result<Dispatch> {
        let Some(index) = self.wizard.index_of(&req.path) else {
            debug!(path = %req.path, "request outside wizard, passing through");
            return Ok(Dispatch::Passthrough);
        };
        self.index = Some(index);

        if !self.can_access(&req.path)? {
            let Some(expected) = self.expected_step()? else {
                // A matched URL implies a non-empty registry
                return Ok(Dispatch::Passthrough);
            };
            debug!(index, expected = %expected.url, "step not yet reachable, redirecting");
            return Ok(Dispatch::Redirect(expected.url.clone()));
        }

        let mut data = progress::merged_data(&*self.session, self.wizard.session_key(), index)?;
        progress::deep_merge(&mut data, &req.data);
        req.data = data;

        let auto_submit = self
            .wizard
            .step_at(index)
            .is_some_and(|step| step.disabled.resolve());
        if req.method.is_write() || auto_submit {
            let url = req.path.clone();
            return self.process(req, &url);
        }
        Ok(Dispatch::Continue)
    }

    /// Process a submission for the step at `url`.
    ///
    /// Re-validates access (a direct POST to an unreachable step redirects
    /// to the expected one), runs the step's registered handler if any,
    /// persists the request data deep-merged over prior data for the step,
    /// records completion, and redirects to the next step — or reports
    /// [`Dispatch::Complete`] when this was the last one.
    pub fn process(&mut self, req: &mut RequestContext, url: &str) -> Result<Dispatch> {
        if !self.wizard.is_step(url) || !self.can_access(url)? {
            return Ok(match self.expected_step()? {
                Some(expected) => Dispatch::Redirect(expected.url.clone()),
                None => Dispatch::Passthrough,
            });
        }
        // is_step held above
        let Some(index) = self.wizard.index_of(url) else {
            return Ok(Dispatch::Passthrough);
        };
        self.index = Some(index);

        if let Some(hook) = self.wizard.hook(index) {
            if hook(req) == HookOutcome::Reject {
                debug!(index, "step handler vetoed submission, nothing persisted");
                return Ok(Dispatch::Halted);
            }
        }

        let namespace = self.wizard.session_key();
        progress::store_step_data(&mut *self.session, namespace, index, &req.data)?;
        progress::set_last_completed(&mut *self.session, namespace, index)?;
        info!(index, "wizard step completed");

        match self.next_step() {
            Some(next) => Ok(Dispatch::Redirect(next.url.clone())),
            None => {
                info!("wizard finished");
                Ok(Dispatch::Complete)
            }
        }
    }

    /// Whether `url` is a step the user may currently visit: any completed
    /// step, or the one immediately following the last completion. The
    /// first step is always reachable.
    pub fn can_access(&self, url: &str) -> Result<bool> {
        let Some(index) = self.wizard.index_of(url) else {
            return Ok(false);
        };
        if index == 0 {
            return Ok(true);
        }
        let Some(expected) = self.expected_step()? else {
            return Ok(false);
        };
        let expected_index = self.wizard.index_of(&expected.url).unwrap_or(0);
        Ok(index <= expected_index)
    }

    /// The step the user should currently be on, per recorded progress.
    ///
    /// No recorded (or unreadable) progress means the first step. A fully
    /// completed wizard re-shows its last step. `None` only when no steps
    /// are registered.
    pub fn expected_step(&self) -> Result<Option<&'w Step>> {
        if self.wizard.is_empty() {
            return Ok(None);
        }
        let last = progress::last_completed(&*self.session, self.wizard.session_key())?;
        let step = match last {
            None => self.wizard.step_at(0),
            // Next uncompleted step if one exists; otherwise clamp so a
            // stale index past the end of the registry cannot fault
            Some(last) => self
                .wizard
                .step_at(last + 1)
                .or_else(|| self.wizard.step_at(last.min(self.wizard.len() - 1))),
        };
        Ok(step)
    }

    /// The step after the current one, or `None` when the current step is
    /// the last (or no request has been matched yet).
    pub fn next_step(&self) -> Option<&'w Step> {
        self.wizard.step_at(self.index? + 1)
    }

    /// Scans backward from the current step for the first one whose
    /// `disabled` toggle resolves false. Used by views to render a back
    /// link that skips auto-submitted steps.
    pub fn previous_step(&self) -> Option<&'w Step> {
        let current = self.index?;
        self.wizard.steps()[..current]
            .iter()
            .rev()
            .find(|step| !step.disabled.resolve())
    }

    /// Visible steps annotated for display. Hidden steps are dropped, so
    /// positions here are not registry indices.
    pub fn steps(&self) -> Vec<StepView> {
        self.wizard
            .steps()
            .iter()
            .enumerate()
            .filter(|(_, step)| !step.hidden.resolve())
            .map(|(index, step)| {
                StepView::new(
                    step,
                    self.index.is_some_and(|current| index < current),
                    self.index == Some(index),
                )
            })
            .collect()
    }

    /// Resolved `hidden` toggle for the step at `url`; false for unknown
    /// URLs.
    pub fn is_hidden(&self, url: &str) -> bool {
        self.wizard
            .step_by_url(url)
            .is_some_and(|step| step.hidden.resolve())
    }

    /// Resolved `disabled` toggle for the step at `url`; false for unknown
    /// URLs.
    pub fn is_disabled(&self, url: &str) -> bool {
        self.wizard
            .step_by_url(url)
            .is_some_and(|step| step.disabled.resolve())
    }

    /// Stored data for all steps up to and including the current one,
    /// merged in index order (later steps win). Empty before a request has
    /// been matched.
    pub fn merged_data(&self) -> Result<Map<String, Value>> {
        match self.index {
            Some(index) => {
                progress::merged_data(&*self.session, self.wizard.session_key(), index)
            }
            None => Ok(Map::new()),
        }
    }

    /// Raw stored data for one step index, unmerged.
    pub fn raw_data(&self, index: usize) -> Result<Map<String, Value>> {
        progress::step_data(&*self.session, self.wizard.session_key(), index)
    }

    /// Highest step index the user has completed, if any.
    pub fn last_completed_step(&self) -> Result<Option<usize>> {
        progress::last_completed(&*self.session, self.wizard.session_key())
    }

    /// Clear all recorded progress for this wizard's namespace.
    pub fn reset(&mut self) -> Result<()> {
        info!(namespace = self.wizard.session_key(), "wizard progress reset");
        progress::reset(&mut *self.session, self.wizard.session_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MethodKind;
    use crate::session::MemorySession;
    use crate::wizard::{StepBuilder, WizardBuilder};
    use serde_json::json;

    fn three_step_wizard() -> Wizard {
        WizardBuilder::new()
            .resolver(|action: &str| format!("/w/{action}"))
            .step(StepBuilder::action("a").name("A"))
            .step(StepBuilder::action("b").name("B"))
            .step(StepBuilder::action("c").name("C"))
            .build()
    }

    fn submit(data: Value) -> RequestContext {
        let Value::Object(map) = data else {
            panic!("expected object")
        };
        RequestContext::new("", MethodKind::Write).with_data(map)
    }

    #[test]
    fn test_unmatched_url_is_passthrough() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = RequestContext::new("/elsewhere", MethodKind::Read);
        let outcome = controller.startup(&mut req).unwrap();

        assert_eq!(outcome, Dispatch::Passthrough);
        assert_eq!(controller.current_index(), None);
        assert!(req.data.is_empty());
    }

    #[test]
    fn test_first_step_always_accessible() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        // Corrupt progress must not lock the user out of step 0
        session.write("Wizard.lastCompletedStep", json!("junk")).unwrap();

        let controller = WizardController::new(&wizard, &mut session);
        assert!(controller.can_access("/w/a").unwrap());
        assert!(!controller.can_access("/w/b").unwrap());
        assert!(!controller.can_access("/w/nope").unwrap());
    }

    #[test]
    fn test_forward_only_gating_redirects_to_expected() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = RequestContext::new("/w/c", MethodKind::Read);
        let outcome = controller.startup(&mut req).unwrap();

        assert_eq!(outcome, Dispatch::Redirect("/w/a".into()));
    }

    #[test]
    fn test_submission_advances_and_redirects() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = submit(json!({"x": 1}));
        req.path = "/w/a".into();
        let outcome = controller.startup(&mut req).unwrap();

        assert_eq!(outcome, Dispatch::Redirect("/w/b".into()));
        assert_eq!(controller.last_completed_step().unwrap(), Some(0));
        assert_eq!(controller.raw_data(0).unwrap()["x"], json!(1));
    }

    #[test]
    fn test_final_step_completes_without_redirect() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        progress::set_last_completed(&mut session, "Wizard", 1).unwrap();

        let mut controller = WizardController::new(&wizard, &mut session);
        let mut req = submit(json!({"z": 3}));
        req.path = "/w/c".into();

        assert_eq!(controller.startup(&mut req).unwrap(), Dispatch::Complete);
        assert_eq!(controller.last_completed_step().unwrap(), Some(2));
        assert!(controller.next_step().is_none());
    }

    #[test]
    fn test_idempotent_recompletion_keeps_progress() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        progress::set_last_completed(&mut session, "Wizard", 1).unwrap();

        // Revisit and resubmit step 0; progress must not move backward past
        // what a forward redirect implies
        let mut controller = WizardController::new(&wizard, &mut session);
        let mut req = submit(json!({"x": 9}));
        req.path = "/w/a".into();

        let outcome = controller.startup(&mut req).unwrap();
        assert_eq!(outcome, Dispatch::Redirect("/w/b".into()));
        assert_eq!(controller.last_completed_step().unwrap(), Some(0));

        // The user can immediately walk forward again through completed data
        assert!(controller.can_access("/w/b").unwrap());
    }

    #[test]
    fn test_stored_data_replayed_with_live_overrides() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        progress::store_step_data(
            &mut session,
            "Wizard",
            0,
            &submit(json!({"x": 1, "keep": true})).data,
        )
        .unwrap();
        progress::set_last_completed(&mut session, "Wizard", 0).unwrap();

        let mut controller = WizardController::new(&wizard, &mut session);
        let mut req = RequestContext::new("/w/b", MethodKind::Read)
            .with_data(submit(json!({"x": 2})).data);

        assert_eq!(controller.startup(&mut req).unwrap(), Dispatch::Continue);
        // Live request field wins; stored field without a live value replays
        assert_eq!(req.data["x"], json!(2));
        assert_eq!(req.data["keep"], json!(true));
    }

    #[test]
    fn test_direct_post_to_blocked_step_redirects() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = submit(json!({"z": 1}));
        req.path = "/w/c".into();
        let outcome = controller.process(&mut req, "/w/c").unwrap();

        assert_eq!(outcome, Dispatch::Redirect("/w/a".into()));
        assert_eq!(controller.last_completed_step().unwrap(), None);
        assert!(controller.raw_data(2).unwrap().is_empty());
    }

    #[test]
    fn test_hook_veto_halts_without_persisting() {
        let wizard = WizardBuilder::new()
            .resolver(|action: &str| format!("/w/{action}"))
            .step(StepBuilder::action("a").handler(|req| {
                if req.data.contains_key("required") {
                    HookOutcome::Proceed
                } else {
                    HookOutcome::Reject
                }
            }))
            .step(StepBuilder::action("b"))
            .build();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = submit(json!({"other": 1}));
        req.path = "/w/a".into();
        assert_eq!(controller.startup(&mut req).unwrap(), Dispatch::Halted);
        assert_eq!(controller.last_completed_step().unwrap(), None);
        assert!(controller.raw_data(0).unwrap().is_empty());

        let mut req = submit(json!({"required": 1}));
        req.path = "/w/a".into();
        assert_eq!(
            controller.startup(&mut req).unwrap(),
            Dispatch::Redirect("/w/b".into())
        );
    }

    #[test]
    fn test_hook_may_mutate_data_before_persist() {
        let wizard = WizardBuilder::new()
            .resolver(|action: &str| format!("/w/{action}"))
            .step(StepBuilder::action("a").handler(|req| {
                req.data.insert("normalized".into(), json!(true));
                HookOutcome::Proceed
            }))
            .step(StepBuilder::action("b"))
            .build();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = submit(json!({"x": 1}));
        req.path = "/w/a".into();
        controller.startup(&mut req).unwrap();

        assert_eq!(controller.raw_data(0).unwrap()["normalized"], json!(true));
    }

    #[test]
    fn test_disabled_step_auto_submits_on_read() {
        let wizard = WizardBuilder::new()
            .resolver(|action: &str| format!("/w/{action}"))
            .step(StepBuilder::action("a"))
            .step(StepBuilder::action("b").disabled(true))
            .step(StepBuilder::action("c"))
            .build();
        let mut session = MemorySession::new();
        progress::set_last_completed(&mut session, "Wizard", 0).unwrap();

        let mut controller = WizardController::new(&wizard, &mut session);
        let mut req = RequestContext::new("/w/b", MethodKind::Read);
        let outcome = controller.startup(&mut req).unwrap();

        assert_eq!(outcome, Dispatch::Redirect("/w/c".into()));
        assert_eq!(controller.last_completed_step().unwrap(), Some(1));
    }

    #[test]
    fn test_previous_step_skips_disabled() {
        let wizard = WizardBuilder::new()
            .resolver(|action: &str| format!("/w/{action}"))
            .step(StepBuilder::action("a"))
            .step(StepBuilder::action("b").disabled(true))
            .step(StepBuilder::action("c"))
            .build();
        let mut session = MemorySession::new();
        progress::set_last_completed(&mut session, "Wizard", 1).unwrap();

        let mut controller = WizardController::new(&wizard, &mut session);
        let mut req = RequestContext::new("/w/c", MethodKind::Read);
        controller.startup(&mut req).unwrap();

        assert_eq!(controller.previous_step().unwrap().url, "/w/a");
        assert!(controller.next_step().is_none());
    }

    #[test]
    fn test_previous_step_none_at_first_step() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = RequestContext::new("/w/a", MethodKind::Read);
        controller.startup(&mut req).unwrap();
        assert!(controller.previous_step().is_none());
    }

    #[test]
    fn test_hidden_step_excluded_from_listing_but_addressable() {
        let wizard = WizardBuilder::new()
            .resolver(|action: &str| format!("/w/{action}"))
            .step(StepBuilder::action("a").name("A"))
            .step(StepBuilder::action("secret").name("Secret").hidden(true))
            .step(StepBuilder::action("c").name("C"))
            .build();
        let mut session = MemorySession::new();
        progress::set_last_completed(&mut session, "Wizard", 0).unwrap();

        let mut controller = WizardController::new(&wizard, &mut session);
        let mut req = submit(json!({"s": 1}));
        req.path = "/w/secret".into();

        // Addressable and processable
        assert_eq!(
            controller.startup(&mut req).unwrap(),
            Dispatch::Redirect("/w/c".into())
        );
        assert!(controller.is_hidden("/w/secret"));

        // Absent from the listing; annotations reflect registry indices
        let listing = controller.steps();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "A");
        assert!(listing[0].completed);
        assert_eq!(listing[1].name, "C");
        assert!(!listing[1].active);
    }

    #[test]
    fn test_steps_annotations_at_current() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        progress::set_last_completed(&mut session, "Wizard", 0).unwrap();

        let mut controller = WizardController::new(&wizard, &mut session);
        let mut req = RequestContext::new("/w/b", MethodKind::Read);
        controller.startup(&mut req).unwrap();

        let listing = controller.steps();
        assert!(listing[0].completed && !listing[0].active);
        assert!(!listing[1].completed && listing[1].active);
        assert!(!listing[2].completed && !listing[2].active);
    }

    #[test]
    fn test_expected_step_clamps_stale_index() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        // A registry that shrank between deploys can leave a stale index
        progress::set_last_completed(&mut session, "Wizard", 9).unwrap();

        let mut controller = WizardController::new(&wizard, &mut session);
        assert_eq!(controller.expected_step().unwrap().unwrap().url, "/w/c");

        let mut req = RequestContext::new("/w/c", MethodKind::Read);
        assert_eq!(controller.startup(&mut req).unwrap(), Dispatch::Continue);
    }

    #[test]
    fn test_fully_completed_wizard_expects_last_step() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        progress::set_last_completed(&mut session, "Wizard", 2).unwrap();

        let controller = WizardController::new(&wizard, &mut session);
        assert_eq!(controller.expected_step().unwrap().unwrap().url, "/w/c");
    }

    #[test]
    fn test_empty_registry_never_faults() {
        let wizard = WizardBuilder::new().build();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        assert!(controller.expected_step().unwrap().is_none());
        assert!(controller.previous_step().is_none());
        assert!(controller.next_step().is_none());
        assert!(!controller.can_access("/w/a").unwrap());

        let mut req = RequestContext::new("/w/a", MethodKind::Write);
        assert_eq!(controller.startup(&mut req).unwrap(), Dispatch::Passthrough);
    }

    #[test]
    fn test_reset_returns_wizard_to_start() {
        let wizard = three_step_wizard();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = submit(json!({"x": 1}));
        req.path = "/w/a".into();
        controller.startup(&mut req).unwrap();
        assert_eq!(controller.last_completed_step().unwrap(), Some(0));

        controller.reset().unwrap();

        assert_eq!(controller.last_completed_step().unwrap(), None);
        assert_eq!(controller.expected_step().unwrap().unwrap().url, "/w/a");
        assert!(controller.raw_data(0).unwrap().is_empty());
    }

    #[test]
    fn test_custom_session_key_namespaces_progress() {
        let wizard = WizardBuilder::new()
            .session_key("Signup")
            .resolver(|action: &str| format!("/w/{action}"))
            .step(StepBuilder::action("a"))
            .step(StepBuilder::action("b"))
            .build();
        let mut session = MemorySession::new();
        let mut controller = WizardController::new(&wizard, &mut session);

        let mut req = submit(json!({"x": 1}));
        req.path = "/w/a".into();
        controller.startup(&mut req).unwrap();
        drop(controller);

        assert!(session.read("Signup.0").unwrap().is_some());
        assert!(session.read("Wizard.0").unwrap().is_none());
    }
}
