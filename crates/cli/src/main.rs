mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediaconv_core::{
    check_tools, load_config_or_default, metrics, validate_config, CodecParameters,
    ConversionOutcome, ConversionRequest, ConverterDispatcher, FrameCapture, ImageOperation,
    ResizeSpec, ScratchSpace, SizeBudget, TokioProcessRunner, VideoOptions,
};

use cli::{Cli, Commands, LoudnessArgs, TargetArgs};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Runs one command. `Ok(false)` means the command itself reported failure.
async fn run(cli: Cli) -> Result<bool> {
    let config = load_config_or_default(cli.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;
    let config = Arc::new(config);

    let scratch = ScratchSpace::from_config(&config.storage);
    scratch
        .ensure()
        .await
        .context("Failed to create scratch directories")?;

    info!(
        "Using {} (timeout {}s) and {}",
        config.converter.ffmpeg_path.display(),
        config.converter.timeout_secs,
        config.converter.ffprobe_path.display()
    );

    let runner = Arc::new(TokioProcessRunner::new());
    let dispatcher = ConverterDispatcher::new(Arc::clone(&config), runner.clone());

    let succeeded = match cli.command {
        Commands::Check => {
            let health =
                check_tools(&config.converter, scratch.working_dir(), runner.as_ref()).await;
            print_json(&health)?;
            health.is_healthy()
        }
        Commands::Sweep { max_age_hours } => {
            let hours = max_age_hours.unwrap_or(config.storage.max_age_hours);
            let sweep = scratch.sweep_expired(max_age(hours)).await;
            print_json(&sweep)?;
            sweep.success()
        }
        Commands::Convert {
            target,
            scale,
            shrink_to_fit,
            fps,
            audio_format,
            loudness,
        } => {
            let video = VideoOptions {
                scale,
                shrink_to_fit,
                fps,
                audio_format,
            };
            let request = with_loudness(request_for(&target, &scratch), &loudness)
                .with_video_options(video);
            report(dispatcher.convert_staged(&scratch, request, None).await)?
        }
        Commands::ExtractAudio { target, loudness } => {
            let request =
                with_loudness(request_for(&target, &scratch), &loudness).extracting_audio();
            report(dispatcher.convert_staged(&scratch, request, None).await)?
        }
        Commands::VideoThumbnail { target, at, size } => {
            let request = request_for(&target, &scratch)
                .capturing_frame(FrameCapture { at_secs: at, size });
            report(dispatcher.convert_staged(&scratch, request, None).await)?
        }
        Commands::Resize {
            target,
            width,
            height,
            ignore_aspect,
        } => {
            let operation = ImageOperation::Resize(ResizeSpec {
                width,
                height,
                preserve_aspect: !ignore_aspect,
            });
            let request = request_for(&target, &scratch).with_image_operation(operation);
            report(dispatcher.convert_staged(&scratch, request, None).await)?
        }
        Commands::Thumbnail { target, size } => {
            let request = request_for(&target, &scratch)
                .with_image_operation(ImageOperation::Thumbnail { size });
            report(dispatcher.convert_staged(&scratch, request, None).await)?
        }
        Commands::Compress { target, max_kb } => {
            let request = request_for(&target, &scratch);
            let budget = SizeBudget::kilobytes(max_kb);
            report(
                dispatcher
                    .convert_staged(&scratch, request, Some(budget))
                    .await,
            )?
        }
    };

    if cli.print_metrics {
        eprint!("{}", metrics::render());
    }

    Ok(succeeded)
}

/// Prints an outcome and reports whether it succeeded.
fn report(outcome: ConversionOutcome) -> Result<bool> {
    print_json(&outcome)?;
    Ok(outcome.is_success())
}

fn request_for(target: &TargetArgs, scratch: &ScratchSpace) -> ConversionRequest {
    let output = resolve_output(target.output.as_deref(), &target.format, scratch);
    info!(
        "Converting {} to {} ({})",
        target.input.display(),
        output.display(),
        target.quality
    );

    ConversionRequest::new(&target.input, output, &target.format)
        .with_preset(target.quality)
        .with_overrides(CodecParameters::from(&target.overrides))
}

fn with_loudness(request: ConversionRequest, loudness: &LoudnessArgs) -> ConversionRequest {
    match loudness.normalize {
        Some(lufs) => request.normalizing_loudness(lufs),
        None => request,
    }
}

/// Sweep age from hours. Absurdly large values clamp instead of overflowing.
fn max_age(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

fn resolve_output(output: Option<&Path>, format: &str, scratch: &ScratchSpace) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => scratch.converted_path(format),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
