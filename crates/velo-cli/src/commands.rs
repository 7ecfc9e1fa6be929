use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use velo_config::VeloConfig;
use velo_ingest::{PipelineConfig, verify::Verification};
use velo_store::Store;

use crate::cli::{IngestArgs, VerifyArgs};

pub fn ingest(args: &IngestArgs, config: &VeloConfig) -> anyhow::Result<()> {
    let links_path = resolve_source(args.links.as_deref(), &config.ingest.links_path, "links")?;
    let speeds_path = resolve_source(args.speeds.as_deref(), &config.ingest.speeds_path, "speeds")?;
    let db_path = resolve_db(args.db.as_deref(), config);

    let mut store = open_store(&db_path)?;

    let pipeline = PipelineConfig {
        chunk_size: args.chunk_size.unwrap_or(config.ingest.chunk_size),
        link_batch_size: config.ingest.link_batch_size,
        speed_batch_size: config.ingest.speed_batch_size,
        ..PipelineConfig::new(&links_path, &speeds_path)
    };
    info!(db = %db_path.display(), chunk_size = pipeline.chunk_size, "starting ingest");

    let report = velo_ingest::run(&mut store, &pipeline)
        .with_context(|| format!("ingest into '{}' failed", db_path.display()))?;

    println!("links:  {}", report.links);
    println!("speeds: {}", report.speeds);

    if args.validate {
        let verification = velo_ingest::verify::verify(&store, Some(&speeds_path))
            .context("post-load verification could not run")?;
        print_findings(&verification);
        anyhow::ensure!(verification.all_passed(), "verification failed");
    }
    Ok(())
}

pub fn verify(args: &VerifyArgs, config: &VeloConfig) -> anyhow::Result<()> {
    let db_path = resolve_db(args.db.as_deref(), config);
    anyhow::ensure!(
        db_path.is_file(),
        "database '{}' does not exist; run 'velo ingest' first",
        db_path.display()
    );
    let store = open_store(&db_path)?;

    let verification = velo_ingest::verify::verify(&store, args.speeds.as_deref())
        .context("verification could not run")?;
    print_findings(&verification);
    anyhow::ensure!(verification.all_passed(), "verification failed");
    Ok(())
}

fn open_store(db_path: &Path) -> anyhow::Result<Store> {
    Store::open(db_path)
        .with_context(|| format!("failed to open database '{}'", db_path.display()))
}

/// CLI flag wins; config path is the fallback and must be non-empty.
fn resolve_source(flag: Option<&Path>, configured: &str, name: &str) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    anyhow::ensure!(
        !configured.is_empty(),
        "no {name} dataset given: pass --{name} or set ingest.{name}_path in velo.toml"
    );
    Ok(PathBuf::from(configured))
}

fn resolve_db(flag: Option<&Path>, config: &VeloConfig) -> PathBuf {
    flag.map_or_else(|| PathBuf::from(&config.database.path), Path::to_path_buf)
}

fn print_findings(verification: &Verification) {
    for finding in &verification.findings {
        let mark = if finding.passed { "ok  " } else { "FAIL" };
        println!("{mark} {:<28} {}", finding.name, finding.detail);
    }
}
