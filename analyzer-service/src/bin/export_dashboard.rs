use std::{
    env,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use charge_analyzer::{
    config::AppConfig,
    observability,
    pipeline::build_dashboard,
    sinks::{
        write_dashboard_json, write_sample_csv, write_sessions_csv, write_summary_csv, DashboardDocument,
        SAMPLE_FILE_NAME,
    },
    sources::ChargeSessionsCsvFileSource,
};
use charge_client::queries::{summarize_by_location, summarize_by_month, summarize_by_weekday};

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: export_dashboard <charge_sessions_csv> [out_dir]\n       export_dashboard --sample [out_dir]");
    }
    let out_dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    if args[1] == "--sample" {
        fs::create_dir_all(&out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
        write_sample_csv(create(&out_dir, SAMPLE_FILE_NAME)?)?;
        tracing::info!(out_dir = %out_dir.display(), "sample export template written");
        return Ok(());
    }
    let input = PathBuf::from(&args[1]);

    let cfg = AppConfig::load()?;
    let outcome = ChargeSessionsCsvFileSource::new(&input, cfg.analysis.tariff_eur_per_kwh).load()?;
    let table = &outcome.table;

    fs::create_dir_all(&out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;

    write_summary_csv(create(&out_dir, "monthly.csv")?, &summarize_by_month(table))?;
    write_summary_csv(create(&out_dir, "weekdays.csv")?, &summarize_by_weekday(table))?;
    match summarize_by_location(table) {
        Ok(rows) => write_summary_csv(create(&out_dir, "locations.csv")?, &rows)?,
        Err(e) => tracing::warn!(reason = %e, "skipping locations.csv"),
    }
    write_sessions_csv(create(&out_dir, "sessions.csv")?, table)?;

    let bundle = build_dashboard(table, &cfg.analysis);
    write_dashboard_json(
        create(&out_dir, "dashboard.json")?,
        &DashboardDocument::Ready {
            bundle: &bundle,
            coercion_failures: &outcome.coercion,
        },
    )?;

    tracing::info!(
        sessions = table.len(),
        out_dir = %out_dir.display(),
        "dashboard export written"
    );
    Ok(())
}
