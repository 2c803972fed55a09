//! On-disk baseline image store for visual regression checks.
//!
//! Baselines are plain PNG files keyed by a stable name per (check,
//! viewport). During a normal run the store is only read; a missing baseline
//! is the bootstrap case and the capture is written in its place. Explicit
//! refresh rewrites every baseline it touches.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::render::Screenshot;

/// Per-channel delta below which two pixels count as equal
pub const CHANNEL_TOLERANCE: u8 = 3;
/// Fraction of differing pixels a capture may carry and still match
pub const MAX_DIFF_RATIO: f64 = 0.001;

/// Result of comparing a capture against the store
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineOutcome {
    /// No baseline existed; the capture became the baseline (bootstrap, not
    /// a failure)
    Created,
    /// Refresh was requested; the capture replaced the baseline
    Refreshed,
    /// The capture matched within tolerance
    Matched { diff_ratio: f64 },
    /// The capture differed beyond tolerance
    Mismatched { diff_ratio: f64, detail: String },
}

/// A directory of reference images
#[derive(Debug, Clone)]
pub struct BaselineStore {
    dir: PathBuf,
}

impl BaselineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.png"))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path(key).exists()
    }

    fn write(&self, key: &str, shot: &Screenshot) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), &shot.png_data)?;
        Ok(())
    }

    /// Compare a capture against the stored baseline, bootstrapping it when
    /// missing or rewriting it when `refresh` is set.
    pub fn compare(&self, key: &str, shot: &Screenshot, refresh: bool) -> Result<BaselineOutcome> {
        if refresh {
            self.write(key, shot)?;
            info!("refreshed baseline {}", self.path(key).display());
            return Ok(BaselineOutcome::Refreshed);
        }
        let path = self.path(key);
        if !path.exists() {
            self.write(key, shot)?;
            info!("created baseline {}", path.display());
            return Ok(BaselineOutcome::Created);
        }
        let expected = fs::read(&path)?;
        diff_png(&expected, &shot.png_data)
    }
}

/// Pixel-diff two PNG buffers with the default tolerance
pub fn diff_png(expected: &[u8], actual: &[u8]) -> Result<BaselineOutcome> {
    let expected = image::load_from_memory(expected)
        .map_err(|e| Error::BaselineError(format!("failed to decode baseline: {e}")))?
        .to_rgba8();
    let actual = image::load_from_memory(actual)
        .map_err(|e| Error::BaselineError(format!("failed to decode capture: {e}")))?
        .to_rgba8();

    if expected.dimensions() != actual.dimensions() {
        return Ok(BaselineOutcome::Mismatched {
            diff_ratio: 1.0,
            detail: format!(
                "dimensions changed: baseline {}x{}, capture {}x{}",
                expected.width(),
                expected.height(),
                actual.width(),
                actual.height()
            ),
        });
    }

    let total = (expected.width() * expected.height()) as f64;
    let mut differing = 0u64;
    for (e, a) in expected.pixels().zip(actual.pixels()) {
        let beyond = e
            .0
            .iter()
            .zip(a.0.iter())
            .any(|(&ec, &ac)| ec.abs_diff(ac) > CHANNEL_TOLERANCE);
        if beyond {
            differing += 1;
        }
    }
    let diff_ratio = differing as f64 / total;
    if diff_ratio <= MAX_DIFF_RATIO {
        Ok(BaselineOutcome::Matched { diff_ratio })
    } else {
        Ok(BaselineOutcome::Mismatched {
            diff_ratio,
            detail: format!("{differing} of {total} pixels beyond tolerance"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::color::Rgba;
    use crate::render::raster::rasterize;

    fn temp_store(tag: &str) -> BaselineStore {
        let dir = std::env::temp_dir().join(format!(
            "pagecheck-baselines-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        BaselineStore::new(dir)
    }

    #[test]
    fn first_run_bootstraps_then_matches() {
        let store = temp_store("bootstrap");
        let shot = rasterize(32, 32, Rgba::WHITE, &[]).unwrap();
        assert_eq!(
            store.compare("page-desktop", &shot, false).unwrap(),
            BaselineOutcome::Created
        );
        assert!(store.exists("page-desktop"));
        match store.compare("page-desktop", &shot, false).unwrap() {
            BaselineOutcome::Matched { diff_ratio } => assert_eq!(diff_ratio, 0.0),
            other => panic!("expected match, got {other:?}"),
        }
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn changed_pixels_beyond_tolerance_mismatch() {
        let store = temp_store("mismatch");
        let white = rasterize(32, 32, Rgba::WHITE, &[]).unwrap();
        let black = rasterize(32, 32, Rgba::BLACK, &[]).unwrap();
        store.compare("k", &white, false).unwrap();
        match store.compare("k", &black, false).unwrap() {
            BaselineOutcome::Mismatched { diff_ratio, .. } => assert!(diff_ratio > 0.9),
            other => panic!("expected mismatch, got {other:?}"),
        }
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn refresh_overwrites_baseline() {
        let store = temp_store("refresh");
        let white = rasterize(16, 16, Rgba::WHITE, &[]).unwrap();
        let black = rasterize(16, 16, Rgba::BLACK, &[]).unwrap();
        store.compare("k", &white, false).unwrap();
        assert_eq!(
            store.compare("k", &black, true).unwrap(),
            BaselineOutcome::Refreshed
        );
        match store.compare("k", &black, false).unwrap() {
            BaselineOutcome::Matched { .. } => {}
            other => panic!("expected match after refresh, got {other:?}"),
        }
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn dimension_change_always_mismatches() {
        let a = rasterize(16, 16, Rgba::WHITE, &[]).unwrap();
        let b = rasterize(32, 16, Rgba::WHITE, &[]).unwrap();
        match diff_png(&a.png_data, &b.png_data).unwrap() {
            BaselineOutcome::Mismatched { detail, .. } => {
                assert!(detail.contains("dimensions changed"))
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }
}
