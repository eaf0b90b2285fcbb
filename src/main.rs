//! Settlement engine entry point: CLI wiring and scenario-driven runs.

use std::path::Path;
use std::process;

use dr_settlement::cli::{CliOptions, parse_args};
use dr_settlement::config::ScenarioConfig;
use dr_settlement::io::export::{export_daily_csv, export_summary_csv};
use dr_settlement::run::run_scenario;
use dr_settlement::settle::SettlementReport;

fn load_scenario(cli: &CliOptions) -> Result<ScenarioConfig, String> {
    // --scenario takes priority, then --preset (the parser defaults it to demo)
    let mut scenario = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path),
        (None, Some(name)) => ScenarioConfig::from_preset(name),
        (None, None) => Ok(ScenarioConfig::demo()),
    }
    .map_err(|e| e.to_string())?;

    if let Some(path) = &cli.records {
        scenario.input.records = Some(path.clone());
    }
    if let Some(seed) = cli.seed {
        scenario.synthetic.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(lines.join("\n"));
    }
    Ok(scenario)
}

fn main() {
    env_logger::init();

    let cli = parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        dr_settlement::cli::print_usage();
        process::exit(2);
    });

    let scenario = load_scenario(&cli).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let run = run_scenario(&scenario).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    for (agent, err) in &run.rejected {
        eprintln!("rejected agent {agent}: {err}");
    }
    for w in &run.warnings {
        eprintln!("warning: {w}");
    }

    for s in run.entities.values() {
        let t = &s.totals;
        println!(
            "{:<12} {:<12} capacity={:>12.2} response={:>12.2} emergency={:>10.2} total={:>12.2}",
            s.id,
            s.role.as_str(),
            t.capacity_revenue,
            t.response_revenue,
            t.emergency_revenue,
            t.total_revenue
        );
    }

    let report = SettlementReport::from_run(&run);
    println!("\n{report}");

    if let Some(ref path) = cli.daily_out {
        if let Err(e) = export_daily_csv(&run, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Daily settlement written to {}", path.display());
    }
    if let Some(ref path) = cli.summary_out {
        if let Err(e) = export_summary_csv(&run, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Summary written to {}", path.display());
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(dr_settlement::api::AppState::new(run));
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        rt.block_on(dr_settlement::api::serve(state, addr));
    }
}
