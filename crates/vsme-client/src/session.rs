use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};
use tracing::{debug, info};

use vsme_spec::{SectionKind, StateError, WizardState, flatten, readiness_issues};

use crate::client::{LegacyReceipt, Report, ReportClient};
use crate::error::SubmitError;
use crate::transport::ReportTransport;

pub const TOTAL_STEPS: u8 = 5;

/// Shared "submission in flight" marker. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFlag(Arc<AtomicBool>);

impl SubmissionFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag, or `None` when it is already set. The flag is cleared
    /// when the guard drops.
    pub fn acquire(&self) -> Option<SubmissionGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionGuard {
                flag: Arc::clone(&self.0),
            })
    }
}

#[derive(Debug)]
pub struct SubmissionGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One wizard run: the collected state, the current step and the outcome of
/// the last submission attempt.
#[derive(Debug, Clone)]
pub struct WizardSession {
    state: WizardState,
    step: u8,
    submitting: SubmissionFlag,
    last_error: Option<String>,
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new(WizardState::default())
    }
}

impl WizardSession {
    pub fn new(state: WizardState) -> Self {
        Self {
            state,
            step: 1,
            submitting: SubmissionFlag::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Replace the state with the result of `update`.
    pub fn update(&mut self, update: impl FnOnce(&WizardState) -> WizardState) {
        self.state = update(&self.state);
    }

    pub fn apply_patch(&mut self, section: SectionKind, patch: &Map<String, Value>) -> Result<(), StateError> {
        self.state = self.state.apply_patch(section, patch)?;
        Ok(())
    }

    pub fn current_step(&self) -> u8 {
        self.step
    }

    pub fn is_last_step(&self) -> bool {
        self.step == TOTAL_STEPS
    }

    pub fn next_step(&mut self) -> u8 {
        self.step = (self.step + 1).min(TOTAL_STEPS);
        self.step
    }

    pub fn previous_step(&mut self) -> u8 {
        self.step = self.step.saturating_sub(1).max(1);
        self.step
    }

    /// Jump to `step`; out-of-range steps are ignored.
    pub fn go_to_step(&mut self, step: u8) -> bool {
        if (1..=TOTAL_STEPS).contains(&step) {
            self.step = step;
            true
        } else {
            debug!(step, "ignoring out-of-range step");
            false
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    pub fn submission_flag(&self) -> SubmissionFlag {
        self.submitting.clone()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Back to step one with an empty state.
    pub fn reset(&mut self) {
        self.state = WizardState::default();
        self.step = 1;
        self.last_error = None;
        info!("wizard reset");
    }

    /// Validate, flatten and send the state for report generation.
    pub async fn submit<T: ReportTransport>(&mut self, client: &ReportClient<T>) -> Result<Report, SubmitError> {
        let _guard = self.begin()?;
        let result = self.send_report(client).await;
        self.finish(result)
    }

    /// Send the nested state to the legacy submission endpoint.
    pub async fn submit_legacy<T: ReportTransport>(
        &mut self,
        client: &ReportClient<T>,
    ) -> Result<LegacyReceipt, SubmitError> {
        let _guard = self.begin()?;
        let result = match self.check_ready() {
            Ok(()) => client.submit_legacy(&self.state).await,
            Err(error) => Err(error),
        };
        self.finish(result)
    }

    async fn send_report<T: ReportTransport>(&self, client: &ReportClient<T>) -> Result<Report, SubmitError> {
        self.check_ready()?;
        let payload = flatten(&self.state);
        if payload.is_empty() {
            return Err(SubmitError::EmptyPayload);
        }
        client.generate_report(&payload).await
    }

    fn check_ready(&self) -> Result<(), SubmitError> {
        let issues = readiness_issues(&self.state);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(SubmitError::InvalidFields(issues))
        }
    }

    fn begin(&mut self) -> Result<SubmissionGuard, SubmitError> {
        let guard = self.submitting.acquire().ok_or(SubmitError::AlreadySubmitting)?;
        self.last_error = None;
        Ok(guard)
    }

    fn finish<R>(&mut self, result: Result<R, SubmitError>) -> Result<R, SubmitError> {
        if let Err(error) = &result {
            self.last_error = Some(error.to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_stay_within_bounds() {
        let mut session = WizardSession::default();
        assert_eq!(session.previous_step(), 1);
        for _ in 0..10 {
            session.next_step();
        }
        assert_eq!(session.current_step(), TOTAL_STEPS);
        assert!(session.is_last_step());
        assert!(!session.go_to_step(0));
        assert!(!session.go_to_step(6));
        assert!(session.go_to_step(3));
        assert_eq!(session.current_step(), 3);
    }

    #[test]
    fn flag_is_exclusive_until_guard_drops() {
        let flag = SubmissionFlag::default();
        let guard = flag.acquire().expect("first acquire");
        assert!(flag.is_set());
        assert!(flag.acquire().is_none());
        drop(guard);
        assert!(!flag.is_set());
        assert!(flag.acquire().is_some());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut session = WizardSession::default();
        session.update(|state| {
            state.update_general_information(|general| general.entity_name = "Acme".into())
        });
        session.go_to_step(4);
        session.reset();
        assert_eq!(session.state(), &WizardState::default());
        assert_eq!(session.current_step(), 1);
    }
}
