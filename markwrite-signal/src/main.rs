//! MarkWrite Signal - pen sample processing tool
//!
//! Smooths, differentiates and segments tablet sample files.

use markwrite_signal::analysis::StrokeSegmenter;
use markwrite_signal::app::cli::{Cli, Commands, ConfigAction, OutputFormat};
use markwrite_signal::app::config::Config;
use markwrite_signal::io::trial_file::{export_table, import_samples, TrialFile};
use markwrite_signal::pipeline::SeriesProcessor;
use markwrite_signal::Series;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config; a file named with --config must exist unless the command creates it
    let config_path = cli.config_path();
    let creates_config = matches!(
        cli.command,
        Commands::Init { .. } | Commands::Config { action: ConfigAction::Reset { .. } }
    );
    let config = if creates_config {
        Config::default()
    } else if cli.config.is_some() {
        Config::load(&config_path)?
    } else {
        Config::load_or_default(&config_path)?
    };

    match cli.command {
        Commands::Process {
            inputs,
            output,
            format,
        } => {
            run_process(&inputs, output, format, &config)?;
        }
        Commands::Regions { input, json } => {
            run_regions(&input, json, &config)?;
        }
        Commands::Init { force } => {
            run_init(force, &config_path)?;
        }
        Commands::Config { action } => {
            run_config(action, &config, &config_path)?;
        }
    }

    Ok(())
}

/// Load a series from a JSON trial file or a sample table
fn load_series(path: &Path) -> anyhow::Result<Series> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {:?}", path);
    }
    let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
    let series = if is_json {
        TrialFile::load(path)?.into_series()?
    } else {
        import_samples(path)?
    };
    info!("Loaded {} samples from {:?}", series.len(), path);
    Ok(series)
}

fn trial_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trial".to_string())
}

fn output_path(input: &Path, output_dir: Option<&Path>, format: OutputFormat) -> PathBuf {
    let extension = match format {
        OutputFormat::Tsv => "derived.txt",
        OutputFormat::Json => "derived.json",
    };
    let file_name = format!("{}.{}", trial_name(input), extension);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

fn run_process(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    format: OutputFormat,
    config: &Config,
) -> anyhow::Result<()> {
    let processor = SeriesProcessor::from_config(config)?;

    let mut batch = inputs
        .iter()
        .map(|p| load_series(p))
        .collect::<anyhow::Result<Vec<Series>>>()?;

    let results = processor.process_batch(&mut batch);

    // Single TSV with no output directory goes to stdout
    let to_stdout = output.is_none() && inputs.len() == 1 && format == OutputFormat::Tsv;
    if let Some(dir) = &output {
        std::fs::create_dir_all(dir)?;
    }

    let mut failures = 0;
    for ((input, series), result) in inputs.iter().zip(&batch).zip(results) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to process {:?}: {}", input, e);
                failures += 1;
                continue;
            }
        };
        info!(
            "Processed {:?}: {} samples, kernel {:?}",
            input, outcome.samples, outcome.filter_kernel
        );

        if to_stdout {
            export_table(series, std::io::stdout().lock())?;
            continue;
        }

        let path = output_path(input, output.as_deref(), format);
        match format {
            OutputFormat::Tsv => {
                let file = std::fs::File::create(&path)?;
                export_table(series, std::io::BufWriter::new(file))?;
            }
            OutputFormat::Json => {
                let trial = TrialFile::from_series(
                    trial_name(input),
                    Some(input.display().to_string()),
                    series,
                );
                trial.save(&path)?;
            }
        }
        info!("Wrote {:?}", path);
    }

    if failures > 0 {
        anyhow::bail!("{} of {} inputs failed to process", failures, inputs.len());
    }
    Ok(())
}

fn run_regions(input: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let processor = SeriesProcessor::from_config(config)?;
    let mut series = load_series(input)?;
    processor.process(&mut series)?;

    let segmenter = StrokeSegmenter::with_min_stroke_samples(config.segmentation.min_stroke_samples);
    let segmentation = segmenter.analyze(&series)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&segmentation)?);
        return Ok(());
    }

    println!("Sample runs ({}):", segmentation.sample_runs.len());
    for r in &segmentation.sample_runs {
        println!("  [{}, {})  {} samples", r.start, r.stop, r.length);
    }
    println!("Pressed runs ({}):", segmentation.pressed_runs.len());
    for r in &segmentation.pressed_runs {
        println!("  [{}, {})  {} samples", r.start, r.stop, r.length);
    }
    println!("Hover runs ({}):", segmentation.hover_runs.len());
    for r in &segmentation.hover_runs {
        println!("  [{}, {})  {} samples", r.start, r.stop, r.length);
    }
    println!("Strokes ({}):", segmentation.strokes.len());
    for s in &segmentation.strokes {
        println!(
            "  [{}, {})  {:.3}s  path {:.2}  peak {:.3}/sample",
            s.region.start, s.region.stop, s.duration, s.path_length, s.peak_velocity
        );
    }

    Ok(())
}

fn run_init(force: bool, config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    let config = Config::default();
    config.save(config_path)?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config, config_path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = config.to_toml()?;
            println!("Configuration ({:?}):\n", config_path);
            println!("{}", toml_str);
        }
        ConfigAction::Get { key } => {
            println!("{} = {}", key, config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            if !config_path.exists() {
                anyhow::bail!(
                    "No config file found at {:?}. Run 'markwrite-signal init' first.",
                    config_path
                );
            }

            let mut stored = Config::load(config_path)?;
            stored.set(&key, &value)?;
            stored.save(config_path)?;
            println!("Set {} = {}", key, value);
        }
        ConfigAction::Reset { force } => {
            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save(config_path)?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}
