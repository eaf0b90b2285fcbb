use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    /// Overrides the scenario's `[input] records`.
    pub records: Option<PathBuf>,
    pub seed: Option<u64>,
    pub daily_out: Option<PathBuf>,
    pub summary_out: Option<PathBuf>,
    #[cfg(feature = "api")]
    pub serve: bool,
    #[cfg(feature = "api")]
    pub port: u16,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.len() == 1 && (args[0] == "--help" || args[0] == "-h") {
        print_usage();
        std::process::exit(0);
    }
    parse_options(&args)
}

fn set_once<T>(slot: &mut Option<T>, value: T, flag: &str) -> Result<(), String> {
    if slot.replace(value).is_some() {
        return Err(format!("{flag} provided more than once"));
    }
    Ok(())
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut scenario = None;
    let mut preset = None;
    let mut records = None;
    let mut seed = None;
    let mut daily_out = None;
    let mut summary_out = None;
    #[cfg(feature = "api")]
    let mut serve = false;
    #[cfg(feature = "api")]
    let mut port = 3000u16;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                set_once(&mut scenario, PathBuf::from(path), "--scenario")?;
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --preset (expected a preset name)",
                )?;
                set_once(&mut preset, name.to_string(), "--preset")?;
            }
            "--records" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --records (expected a CSV file path)",
                )?;
                set_once(&mut records, PathBuf::from(path), "--records")?;
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                set_once(&mut seed, value, "--seed")?;
            }
            "--daily-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --daily-out (expected a file path)",
                )?;
                set_once(&mut daily_out, PathBuf::from(path), "--daily-out")?;
            }
            "--summary-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --summary-out (expected a file path)",
                )?;
                set_once(&mut summary_out, PathBuf::from(path), "--summary-out")?;
            }
            #[cfg(feature = "api")]
            "--serve" => serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port (expected a u16)")?;
                port = raw
                    .parse::<u16>()
                    .map_err(|_| format!("--port value \"{raw}\" is not a valid u16"))?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if scenario.is_some() && preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if scenario.is_none() && preset.is_none() {
        preset = Some("demo".to_string());
    }

    Ok(CliOptions {
        scenario,
        preset,
        records,
        seed,
        daily_out,
        summary_out,
        #[cfg(feature = "api")]
        serve,
        #[cfg(feature = "api")]
        port,
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("dr-settlement: demand-response revenue settlement");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  dr-settlement [--scenario <path> | --preset <name>] [--records <csv>] [--seed <u64>]"
    );
    eprintln!("                [--daily-out <path>] [--summary-out <path>]");
    #[cfg(feature = "api")]
    eprintln!("                [--serve] [--port <u16>]");
    eprintln!();
    eprintln!("Without --scenario or --preset the demo preset is used.");
    eprintln!("Set RUST_LOG=debug to trace per-agent proration.");
}
