//! Check families and their shared report types.

pub mod accessibility;
pub mod links;
pub mod responsive;
pub mod structure;
pub mod visual;

use serde::Serialize;

use crate::error::Error;
use crate::surface::Surface;

/// The five check families the harness knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CheckId {
    /// HTML document structure: singleton landmarks, heading order, ids
    Structure,
    /// WCAG 2.1 AA rule audit
    Accessibility,
    /// Anchor integrity: hrefs, names, fragments, rel attributes
    Links,
    /// Layout facts across the six viewport profiles
    Responsive,
    /// Screenshot comparison against stored baselines
    Visual,
}

impl CheckId {
    pub const ALL: [CheckId; 5] = [
        CheckId::Structure,
        CheckId::Accessibility,
        CheckId::Links,
        CheckId::Responsive,
        CheckId::Visual,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CheckId::Structure => "structure",
            CheckId::Accessibility => "accessibility",
            CheckId::Links => "links",
            CheckId::Responsive => "responsive",
            CheckId::Visual => "visual",
        }
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single expectation that did not hold.
#[derive(Debug, Clone, Serialize)]
pub struct Mismatch {
    /// What was being measured, e.g. `container width @ desktop`
    pub fact: String,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    pub fn new(
        fact: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            fact: fact.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result of one check family.
///
/// `Failed` means the page broke an expectation; `Errored` means the harness
/// could not finish measuring (navigation failure, timeout, render error).
/// The two are kept apart so a flaky environment never reads as a page bug.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Passed {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        notes: Vec<String>,
    },
    Failed {
        mismatches: Vec<Mismatch>,
    },
    Errored {
        message: String,
    },
}

impl Outcome {
    pub fn passed() -> Self {
        Outcome::Passed { notes: Vec::new() }
    }

    /// `Failed` when any mismatch was recorded, otherwise `Passed`.
    pub fn from_mismatches(mismatches: Vec<Mismatch>, notes: Vec<String>) -> Self {
        if mismatches.is_empty() {
            Outcome::Passed { notes }
        } else {
            Outcome::Failed { mismatches }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Errored { .. })
    }
}

impl From<Error> for Outcome {
    fn from(e: Error) -> Self {
        Outcome::Errored {
            message: e.to_string(),
        }
    }
}

/// Inputs shared by every check family.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub base_url: String,
    pub baseline_dir: std::path::PathBuf,
    pub update_baselines: bool,
}

/// Run one check family against a fresh surface.
pub fn dispatch<S: Surface>(id: CheckId, surface: &mut S, ctx: &CheckContext) -> Outcome {
    let result = match id {
        CheckId::Structure => structure::run(surface, ctx),
        CheckId::Accessibility => accessibility::run(surface, ctx),
        CheckId::Links => links::run(surface, ctx),
        CheckId::Responsive => responsive::run(surface, ctx),
        CheckId::Visual => visual::run(surface, ctx),
    };
    match result {
        Ok(outcome) => outcome,
        Err(e) => e.into(),
    }
}
