//! Post-run verification.
//!
//! Diagnostic only: counts, spot-check samples, the referential and
//! geometry-shape invariants, and an aggregate cross-check of mean speed
//! per time period against the source file. Never mutates data. Failing
//! checks are findings, not errors; the CLI's validation mode turns any
//! failed finding into a non-zero exit.

use std::path::Path;

use tracing::info;

use velo_core::TimePeriod;
use velo_store::Store;

use crate::source::SpeedSource;
use crate::IngestError;

/// Tolerance for the mean-speed cross-check, in mph.
pub const SPEED_TOLERANCE_MPH: f64 = 0.1;

/// Outcome of a single verification check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl Finding {
    fn new(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.to_string(),
            passed,
            detail,
        }
    }
}

/// The collected findings for one verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub findings: Vec<Finding>,
}

impl Verification {
    /// True when every check passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.findings.iter().all(|f| f.passed)
    }
}

/// Run all verification checks against `store`.
///
/// When `speeds_path` is given, mean speed per time period is additionally
/// cross-checked against the same aggregate computed from the source file.
///
/// # Errors
///
/// Returns [`IngestError`] only when a check cannot be executed at all
/// (store query failure, unreadable source); a check that runs and fails
/// becomes a failed [`Finding`].
pub fn verify(store: &Store, speeds_path: Option<&Path>) -> Result<Verification, IngestError> {
    let mut verification = Verification::default();

    let link_count = store.count_links()?;
    verification.findings.push(Finding::new(
        "links persisted",
        link_count > 0,
        format!("{link_count} links"),
    ));

    let speed_count = store.count_speed_records()?;
    verification.findings.push(Finding::new(
        "speed records persisted",
        speed_count > 0,
        format!("{speed_count} speed records"),
    ));

    match store.sample_link()? {
        Some(sample) => {
            let geometry = sample.geometry.unwrap_or_default();
            verification.findings.push(Finding::new(
                "sample link geometry",
                geometry.starts_with("SRID=4326;LINESTRING"),
                format!(
                    "link {} ({}): {}",
                    sample.link_id,
                    sample.road_name.as_deref().unwrap_or("unnamed"),
                    truncate(&geometry, 80)
                ),
            ));
        }
        None => verification.findings.push(Finding::new(
            "sample link geometry",
            false,
            "no link with geometry found".to_string(),
        )),
    }

    match store.sample_speed_record()? {
        Some(sample) => verification.findings.push(Finding::new(
            "sample speed record",
            true,
            format!(
                "link {}: {} mph at {} ({})",
                sample.link_id,
                sample.speed,
                sample.timestamp,
                sample.time_period.as_deref().unwrap_or("no period")
            ),
        )),
        None => verification.findings.push(Finding::new(
            "sample speed record",
            false,
            "no speed record found".to_string(),
        )),
    }

    let orphans = store.orphan_speed_count()?;
    verification.findings.push(Finding::new(
        "referential integrity",
        orphans == 0,
        format!("{orphans} orphaned speed records"),
    ));

    let malformed = store.malformed_geometry_count()?;
    verification.findings.push(Finding::new(
        "single-part geometries",
        malformed == 0,
        format!("{malformed} links with non-LINESTRING geometry"),
    ));

    if let Some(path) = speeds_path {
        cross_check_means(store, path, &mut verification)?;
    }

    for finding in &verification.findings {
        info!(
            check = %finding.name,
            passed = finding.passed,
            detail = %finding.detail,
            "verification"
        );
    }
    Ok(verification)
}

/// Compare persisted mean speed per period with the source aggregate.
fn cross_check_means(
    store: &Store,
    speeds_path: &Path,
    verification: &mut Verification,
) -> Result<(), IngestError> {
    let source = SpeedSource::open(speeds_path)?;
    let source_means = source.mean_speed_by_period()?;
    let store_means = store.mean_speed_by_period()?;

    for (code, source_mean) in source_means {
        let Some(period) = TimePeriod::from_code(code) else {
            // Codes outside the table were never persisted with a name.
            continue;
        };
        let Some((_, store_mean)) = store_means.iter().find(|(name, _)| name == period.name())
        else {
            verification.findings.push(Finding::new(
                &format!("mean speed: {}", period.name()),
                false,
                format!("source has {source_mean:.2} mph, store has no rows"),
            ));
            continue;
        };
        let delta = (source_mean - store_mean).abs();
        verification.findings.push(Finding::new(
            &format!("mean speed: {}", period.name()),
            delta <= SPEED_TOLERANCE_MPH,
            format!("source {source_mean:.2} vs store {store_mean:.2} mph (delta {delta:.3})"),
        ));
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max { s } else { &s[..max] }
}
