//! Check orchestration.
//!
//! Every check family runs on its own freshly created surface so that
//! viewport and hover state can never leak between checks. Parallel runs put
//! each check on its own thread; a per-check wall-clock budget converts a
//! stuck check into a timeout error instead of hanging the whole run.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::checks::{self, CheckContext, CheckId, Outcome};
use crate::error::{Error, Result};
use crate::surface::Surface;

/// Configuration for one harness run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base address of the page under test
    pub base_url: String,
    /// Which check families to run, in report order
    pub checks: Vec<CheckId>,
    /// Directory holding baseline screenshots
    pub baseline_dir: PathBuf,
    /// Rewrite baselines instead of comparing against them
    pub update_baselines: bool,
    /// Wall-clock budget per check in milliseconds
    pub check_timeout_ms: u64,
    /// Run checks one at a time instead of in parallel
    pub sequential: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            checks: CheckId::ALL.to_vec(),
            baseline_dir: PathBuf::from("baselines"),
            update_baselines: false,
            check_timeout_ms: 60000,
            sequential: false,
        }
    }
}

/// Outcome of one check family, with timing
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub check: CheckId,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Aggregated results of a full run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub reports: Vec<CheckReport>,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

impl RunReport {
    fn from_reports(reports: Vec<CheckReport>) -> Self {
        let failed = reports.iter().filter(|r| r.outcome.is_failure()).count();
        let errored = reports.iter().filter(|r| r.outcome.is_error()).count();
        let passed = reports.len() - failed - errored;
        Self {
            reports,
            passed,
            failed,
            errored,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Run the configured checks, creating a fresh surface per check via
/// `factory`.
pub fn run_checks<S, F>(factory: F, config: &RunConfig) -> RunReport
where
    S: Surface,
    F: Fn() -> Result<S> + Send + Sync + 'static,
{
    let ctx = CheckContext {
        base_url: config.base_url.clone(),
        baseline_dir: config.baseline_dir.clone(),
        update_baselines: config.update_baselines,
    };
    let factory = Arc::new(factory);
    let budget = Duration::from_millis(config.check_timeout_ms);

    info!(
        "running {} check(s) against {} ({})",
        config.checks.len(),
        config.base_url,
        if config.sequential { "sequential" } else { "parallel" }
    );

    let reports = if config.sequential {
        config
            .checks
            .iter()
            .map(|&id| {
                let handle = spawn_check(id, Arc::clone(&factory), ctx.clone());
                collect(id, handle, budget)
            })
            .collect()
    } else {
        let handles: Vec<_> = config
            .checks
            .iter()
            .map(|&id| (id, spawn_check(id, Arc::clone(&factory), ctx.clone())))
            .collect();
        handles
            .into_iter()
            .map(|(id, handle)| collect(id, handle, budget))
            .collect()
    };

    RunReport::from_reports(reports)
}

struct CheckHandle {
    rx: mpsc::Receiver<Outcome>,
    started: Instant,
}

fn spawn_check<S, F>(id: CheckId, factory: Arc<F>, ctx: CheckContext) -> CheckHandle
where
    S: Surface,
    F: Fn() -> Result<S> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel();
    let started = Instant::now();
    thread::Builder::new()
        .name(format!("check-{id}"))
        .spawn(move || {
            debug!("starting {id} check");
            let outcome = match factory() {
                Ok(mut surface) => {
                    let outcome = checks::dispatch(id, &mut surface, &ctx);
                    if let Err(e) = surface.close() {
                        warn!("failed to close surface for {id}: {e}");
                    }
                    outcome
                }
                Err(e) => Outcome::Errored {
                    message: format!("failed to create surface: {e}"),
                },
            };
            // Receiver is gone if the budget already expired; nothing to do.
            let _ = tx.send(outcome);
        })
        .map(|_| CheckHandle { rx, started })
        .unwrap_or_else(|e| {
            let (tx2, rx2) = mpsc::channel();
            let _ = tx2.send(Outcome::Errored {
                message: format!("failed to spawn check thread: {e}"),
            });
            CheckHandle { rx: rx2, started }
        })
}

fn collect(id: CheckId, handle: CheckHandle, budget: Duration) -> CheckReport {
    let remaining = budget.saturating_sub(handle.started.elapsed());
    let outcome = match handle.rx.recv_timeout(remaining) {
        Ok(outcome) => outcome,
        // The worker is abandoned; it holds no shared state.
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("{id} check exceeded its {}ms budget", budget.as_millis());
            Error::Timeout(budget.as_millis() as u64).into()
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Outcome::Errored {
            message: "check worker exited without reporting".to_string(),
        },
    };
    let duration_ms = handle.started.elapsed().as_millis() as u64;
    match &outcome {
        Outcome::Passed { .. } => info!("{id}: passed ({duration_ms}ms)"),
        Outcome::Failed { mismatches } => {
            info!("{id}: failed with {} mismatch(es) ({duration_ms}ms)", mismatches.len())
        }
        Outcome::Errored { message } => warn!("{id}: errored: {message}"),
    }
    CheckReport {
        check: id,
        outcome,
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomSnapshot;
    use crate::layout::Rect;
    use crate::render::Screenshot;
    use crate::surface::{ScreenshotTarget, ScrollMetrics, WaitUntil};
    use crate::Viewport;

    /// A surface that sleeps through navigation, for exercising the budget.
    struct StuckSurface;

    impl Surface for StuckSurface {
        fn navigate(&mut self, _url: &str, _wait: WaitUntil) -> Result<()> {
            thread::sleep(Duration::from_secs(5));
            Ok(())
        }
        fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
            Ok(())
        }
        fn viewport(&self) -> Viewport {
            Viewport::default()
        }
        fn dom(&self) -> Result<DomSnapshot> {
            Ok(DomSnapshot::default())
        }
        fn computed_style(&self, _selector: &str, _property: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn computed_style_of(&self, _element: usize, _property: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn bounding_box(&self, _selector: &str) -> Result<Option<Rect>> {
            Ok(None)
        }
        fn scroll_metrics(&self) -> Result<ScrollMetrics> {
            Ok(ScrollMetrics::default())
        }
        fn hover(&mut self, _selector: &str) -> Result<()> {
            Ok(())
        }
        fn clear_hover(&mut self) -> Result<()> {
            Ok(())
        }
        fn press_key(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
        fn screenshot(&self, _target: &ScreenshotTarget) -> Result<Screenshot> {
            Err(Error::RenderError("not renderable".into()))
        }
        fn close(self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stuck_check_times_out_as_error() {
        let config = RunConfig {
            base_url: "http://127.0.0.1:1/unreachable".to_string(),
            checks: vec![CheckId::Structure],
            check_timeout_ms: 200,
            ..Default::default()
        };
        let report = run_checks(|| Ok(StuckSurface), &config);
        assert_eq!(report.errored, 1);
        assert_eq!(report.passed, 0);
        let message = match &report.reports[0].outcome {
            Outcome::Errored { message } => message.clone(),
            other => panic!("expected timeout error, got {other:?}"),
        };
        assert!(message.contains("200ms"), "unexpected message: {message}");
    }

    #[test]
    fn failed_surface_creation_is_an_error_not_a_panic() {
        let config = RunConfig {
            base_url: "http://127.0.0.1:1/".to_string(),
            checks: vec![CheckId::Structure, CheckId::Links],
            sequential: true,
            ..Default::default()
        };
        let report = run_checks::<StuckSurface, _>(
            || Err(Error::InitializationError("no backend".into())),
            &config,
        );
        assert_eq!(report.errored, 2);
        assert!(!report.is_success());
    }
}
