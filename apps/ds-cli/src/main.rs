use clap::{Parser, Subcommand};
use ds_app::{
    AppError, AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, RunTimingSummary,
};
use ds_results::RunStatus;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ds-cli")]
#[command(about = "drivesim CLI - sampled-data motor drive simulation", long_about = None)]
struct Cli {
    /// Print a wall-clock breakdown (same as setting DS_TIMING)
    #[arg(long, global = true)]
    timing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate scenario file syntax and parameters
    Validate {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Rewrite a scenario file at the latest schema version
    Upgrade {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Write here instead of overwriting the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a scenario
    Run {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs for a scenario
    Runs {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export the history of a run as CSV
    Export {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Scale columns by the scenario's nominal base values
        #[arg(long)]
        per_unit: bool,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run several scenarios in parallel
    Batch {
        /// Scenario files
        #[arg(required = true)]
        scenario_paths: Vec<PathBuf>,
        /// Skip cache and force re-runs
        #[arg(long)]
        no_cache: bool,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if cli.timing {
        ds_core::timing::enable_timing();
    }

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Upgrade {
            scenario_path,
            output,
        } => cmd_upgrade(&scenario_path, output.as_deref()),
        Commands::Run {
            scenario_path,
            no_cache,
        } => cmd_run(&scenario_path, !no_cache),
        Commands::Runs { scenario_path } => cmd_runs(&scenario_path),
        Commands::ShowRun {
            scenario_path,
            run_id,
        } => cmd_show_run(&scenario_path, &run_id),
        Commands::Export {
            scenario_path,
            run_id,
            per_unit,
            output,
        } => cmd_export(&scenario_path, &run_id, per_unit, output.as_deref()),
        Commands::Batch {
            scenario_paths,
            no_cache,
        } => cmd_batch(&scenario_paths, !no_cache),
    }
}

fn cmd_validate(scenario_path: &Path) -> AppResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = ds_app::load_scenario(scenario_path)?;
    ds_app::validate(&scenario)?;
    let summary = ds_app::summarize(&scenario);
    println!("✓ Scenario is valid");
    println!(
        "  {}: {} plant, {} controller",
        summary.name, summary.plant, summary.controller
    );
    println!(
        "  Ts = {:e} s, t_stop = {} s, delay = {} period(s), {} samples",
        summary.ts, summary.t_stop, summary.delay, summary.steps
    );
    Ok(())
}

fn cmd_upgrade(scenario_path: &Path, output: Option<&Path>) -> AppResult<()> {
    let scenario = ds_app::load_scenario(scenario_path)?;
    let target = output.unwrap_or(scenario_path);
    ds_app::save_scenario(target, &scenario)?;
    println!(
        "✓ Wrote '{}' (version {}) to {}",
        scenario.name,
        scenario.version,
        target.display()
    );
    Ok(())
}

fn cmd_run(scenario_path: &Path, use_cache: bool) -> AppResult<()> {
    println!("Running scenario: {}", scenario_path.display());

    let request = RunRequest {
        scenario_path,
        options: RunOptions {
            use_cache,
            ..Default::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let response = ds_app::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let fraction = event
                .sim
                .as_ref()
                .map(|s| s.fraction_complete)
                .unwrap_or(-1.0);
            let emit_now = (fraction >= 0.0 && (fraction - last_fraction).abs() >= 0.005)
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                if fraction >= 0.0 {
                    last_fraction = fraction;
                }
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Simulation completed: {}", response.run_id);
    }
    print_status(&response.manifest.status);

    if ds_core::timing::is_enabled() {
        print_timing_summary(&response.timing);
    }

    let (manifest, records) = ds_app::load_run(scenario_path, &response.run_id)?;
    let overview = ds_app::get_run_overview(&manifest, &records)?;
    println!("  Samples: {}", overview.record_count);
    println!("  Saturation events: {}", overview.saturation_events);
    for (name, value) in &overview.final_states {
        println!("  {} (final): {:.6}", name, value);
    }

    Ok(())
}

fn print_status(status: &RunStatus) {
    if let RunStatus::Aborted { t, reason } = status {
        println!("⚠ Run aborted at t = {:.6} s: {}", t, reason);
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.sim) {
        (RunStage::Running, Some(s)) => {
            let width = 28usize;
            let filled = ((s.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.4}/{:.4}s  step={}  elapsed={:.1}s",
                bar,
                s.fraction_complete * 100.0,
                s.sim_time_s,
                s.t_stop_s,
                s.step,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    let pct = |v: f64| 100.0 * v / total;

    println!("\nTiming summary:");
    println!(
        "  Compile: {:.3}s ({:.1}%)",
        timing.compile_time_s,
        pct(timing.compile_time_s)
    );
    println!(
        "  Run:     {:.3}s ({:.1}%)",
        timing.run_time_s,
        pct(timing.run_time_s)
    );
    println!(
        "  Save:    {:.3}s ({:.1}%)",
        timing.save_time_s,
        pct(timing.save_time_s)
    );
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    }
    println!("  Total:   {:.3}s", timing.total_time_s);
    println!("  Steps:   {}", timing.steps);
}

fn cmd_runs(scenario_path: &Path) -> AppResult<()> {
    let runs = ds_app::list_runs(scenario_path)?;

    if runs.is_empty() {
        println!("No cached runs found for: {}", scenario_path.display());
    } else {
        println!("Cached runs for '{}':", scenario_path.display());
        for manifest in runs {
            let status = match &manifest.status {
                RunStatus::Finished => "finished".to_string(),
                RunStatus::Aborted { t, .. } => format!("aborted at {:.4}s", t),
            };
            println!(
                "  {} ({}, {}, {} samples)",
                manifest.run_id, manifest.timestamp, status, manifest.steps
            );
        }
    }
    Ok(())
}

fn cmd_show_run(scenario_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = ds_app::load_run(scenario_path, run_id)?;
    let overview = ds_app::get_run_overview(&manifest, &records)?;

    println!("\nRun Summary:");
    println!("  Scenario: {}", manifest.scenario_name);
    println!("  Created: {}", manifest.timestamp);
    println!("  Solver version: {}", manifest.solver_version);
    println!(
        "  Ts = {:e} s, delay = {} period(s), integrator = {}",
        manifest.ts, manifest.delay, manifest.integrator
    );
    print_status(&manifest.status);
    println!("  Samples: {}", overview.record_count);
    println!(
        "  Time range: {:.4} - {:.4} s",
        overview.time_range.0, overview.time_range.1
    );
    println!("  Saturation events: {}", overview.saturation_events);
    println!("  Wall time: {:.3} s", manifest.wall_time_s);

    println!("\nStates:");
    for (name, value) in &overview.final_states {
        println!("  {} (final {:.6})", name, value);
    }
    println!("\nActuations:");
    for ch in &manifest.actuations {
        println!("  {}", ch.name);
    }

    Ok(())
}

fn cmd_export(
    scenario_path: &Path,
    run_id: &str,
    per_unit: bool,
    output: Option<&Path>,
) -> AppResult<()> {
    let (manifest, records) = ds_app::load_run(scenario_path, run_id)?;

    let csv = if per_unit {
        let scenario = ds_app::load_scenario(scenario_path)?;
        let base = ds_app::per_unit_bases(&scenario)?;
        ds_results::to_csv_per_unit(&manifest, &records, &base)
    } else {
        ds_results::to_csv(&manifest, &records)
    };

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} samples to {}",
            records.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}

fn cmd_batch(scenario_paths: &[PathBuf], use_cache: bool) -> AppResult<()> {
    let options = RunOptions {
        use_cache,
        ..Default::default()
    };
    let results = ds_app::run_batch(scenario_paths, &options);

    let mut failures = 0;
    for (path, result) in scenario_paths.iter().zip(&results) {
        match result {
            Ok(response) => {
                let source = if response.loaded_from_cache {
                    "cached"
                } else {
                    "ran"
                };
                println!(
                    "✓ {} -> {} ({}, {} samples)",
                    path.display(),
                    response.run_id,
                    source,
                    response.manifest.steps
                );
                print_status(&response.manifest.status);
            }
            Err(e) => {
                failures += 1;
                println!("✗ {}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        return Err(AppError::InvalidInput(format!(
            "{} of {} scenarios failed",
            failures,
            scenario_paths.len()
        )));
    }
    Ok(())
}
