//! Runs one dewarping pass from the command line.

use crate::Cli;
use crate::config::resolve_config;
use oar_dewarp::core::{OrtSessionConfig, OutputGroups};
use oar_dewarp::dewarp::{RunReport, SegmentOrchestratorBuilder};
use oar_dewarp::workspace::DirectoryWorkspace;
use std::time::Instant;
use tracing::info;

pub fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();

    let config = resolve_config(cli)?;
    let outputs = OutputGroups::parse(&cli.output_file_grp)?;

    info!("Loading generator from {}...", config.model_path.display());
    let mut builder = SegmentOrchestratorBuilder::new(config);
    if let Some(threads) = cli.intra_threads {
        builder = builder.ort_session(OrtSessionConfig::new().with_intra_threads(threads));
    }
    let orchestrator = builder.build()?;
    let load_time = start.elapsed();
    info!("Generator loaded in {:.2}ms", load_time.as_secs_f64() * 1000.0);

    let mut workspace = DirectoryWorkspace::open(&cli.workspace)?;
    let report = orchestrator.process(&mut workspace, &cli.input_file_grp, &outputs)?;
    let processing_time = start.elapsed() - load_time;
    info!(
        "Processed {} page(s) in {:.2}ms",
        report.pages_processed,
        processing_time.as_secs_f64() * 1000.0
    );

    output_report(&report, &cli.output)
}

fn output_report(
    report: &RunReport,
    format: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        _ => {
            println!("\n=== Dewarping Results ===");
            println!("{report}");
            for artifact in &report.artifacts {
                let status = if artifact.written { "written" } else { "skipped" };
                println!(
                    "  [{status}] {}/{} -> {}",
                    artifact.file_grp, artifact.file_id, artifact.location
                );
            }
            for warning in &report.warnings {
                println!("  warning: {warning}");
            }
        }
    }
    Ok(())
}
