mod cli;

use shortgen::output::{plan_lines, summary_line};
use shortgen::session::{self, GenerateRequest};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ParamArgs};
use sg_core::config::Config;
use sg_core::events::EventBus;
use sg_core::{human_duration, GenerationMode, GenerationParams};
use sg_engine::{FfmpegEngine, ToolRegistry};
use sg_pipeline::{plan, single_window, BatchController, ControllerSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "shortgen=debug,sg_pipeline=debug,sg_engine=debug,sg_core=debug".to_string()
        } else {
            "shortgen=info,sg_pipeline=info,sg_engine=info,sg_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            input,
            single,
            params,
            out_dir,
            duration,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(generate(
                input,
                single,
                &params,
                out_dir,
                duration,
                cli.config.as_deref(),
            ))
        }
        Commands::Plan {
            duration,
            single,
            length,
            offset,
            json,
        } => plan_windows(duration, single, length, offset, json, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("shortgen {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn apply_overrides(mut params: GenerationParams, args: &ParamArgs) -> GenerationParams {
    if let Some(length) = args.length {
        params.segment_length_secs = length;
    }
    if let Some(offset) = args.offset {
        params.start_offset_secs = offset;
    }
    if let Some(crf) = args.crf {
        params.crf = crf;
    }
    if let Some(preset) = args.preset {
        params.preset = preset;
    }
    if let Some(width) = args.width {
        params.out_width = width;
    }
    if let Some(height) = args.height {
        params.out_height = height;
    }
    for warning in params.warnings() {
        tracing::warn!("{warning}");
    }
    params.clamped()
}

async fn generate(
    input: PathBuf,
    single: bool,
    args: &ParamArgs,
    out_dir: Option<PathBuf>,
    duration: Option<f64>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools);
    let engine = FfmpegEngine::new(tools.clone(), config.engine.clone());
    let events = Arc::new(EventBus::default());
    let controller = Arc::new(BatchController::new(
        Box::new(engine),
        ControllerSettings::from(&config),
        events.clone(),
    ));

    let request = GenerateRequest {
        input,
        mode: if single {
            GenerationMode::Single
        } else {
            GenerationMode::AutoSplit
        },
        params: apply_overrides(config.generation.clone(), args),
        duration,
        out_dir: out_dir.unwrap_or_else(|| config.output.dir.clone()),
        interrupt: CancellationToken::new(),
    };
    let interrupt = request.interrupt.clone();

    let logger = tokio::spawn(session::log_events(events.subscribe()));
    let mut task = tokio::spawn(session::run_generate_shared(
        controller.clone(),
        tools,
        request,
    ));

    let result = tokio::select! {
        joined = &mut task => joined?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; resetting session (press Ctrl-C again to exit now)");
            interrupt.cancel();
            controller.reset();
            tokio::spawn(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
            task.await?
        }
    };
    logger.abort();

    let written = result?;
    if written.is_empty() {
        println!("No clips generated.");
    }
    for clip in &written {
        println!("{}", summary_line(&clip.artifact));
    }
    if let Some(first) = written.first() {
        if let Some(dir) = first.path.parent() {
            println!("\n{} clip(s) written to {}", written.len(), dir.display());
        }
    }

    controller.shutdown();
    Ok(())
}

fn plan_windows(
    duration: f64,
    single: bool,
    length: Option<u32>,
    offset: Option<u32>,
    json: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let params = apply_overrides(
        config.generation.clone(),
        &ParamArgs {
            length,
            offset,
            ..ParamArgs::default()
        },
    );

    let windows = if single {
        vec![single_window(
            duration,
            params.start_offset_secs,
            params.segment_length_secs,
        )]
    } else {
        plan(duration, params.start_offset_secs, params.segment_length_secs)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
        return Ok(());
    }

    println!(
        "Source {} ({duration}s), {}s segments from {}s:",
        human_duration(duration),
        params.segment_length_secs,
        params.start_offset_secs
    );
    if windows.is_empty() {
        println!("  (nothing to cut)");
    }
    for line in plan_lines(&windows, duration, config.batch.effective_min_segment_secs()) {
        println!("  {line}");
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to generate shorts.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with {} warning(s):", warnings.len());
        for w in &warnings {
            println!("  ! {w}");
        }
    }

    let g = &config.generation;
    println!(
        "  Generation: {}s segments from {}s, crf {}, preset {}, {}x{}",
        g.segment_length_secs, g.start_offset_secs, g.crf, g.preset, g.out_width, g.out_height
    );
    println!("  Skip threshold: {}s", config.batch.effective_min_segment_secs());
    println!("  Output dir: {}", config.output.dir.display());
    Ok(())
}
