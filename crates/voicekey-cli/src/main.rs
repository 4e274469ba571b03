mod args;
mod model;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait};
use voicekey_core::Settings;

use model::WhisperSttModel;

fn main() {
    let cli = args::Cli::parse();
    voicekey_core::set_verbose(cli.verbose);

    let result = match cli.command {
        Some(args::Commands::Config { list, path }) => run_config(cli.config, list, path),
        Some(args::Commands::Devices) => run_devices(),
        Some(args::Commands::Run {
            preview_model,
            final_model,
        }) => run_service(cli.config, cli.mic, preview_model, final_model),
        None => run_service(cli.config, cli.mic, None, None),
    };

    if let Err(err) = result {
        eprintln!("voicekey: {err:#}");
        std::process::exit(1);
    }
}

fn load_settings(config: Option<PathBuf>) -> Settings {
    match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn run_config(config: Option<PathBuf>, list: bool, path_only: bool) -> anyhow::Result<()> {
    let path = config.clone().unwrap_or_else(Settings::path);
    if path_only {
        println!("{}", path.display());
        return Ok(());
    }
    let settings = load_settings(config);
    if list {
        println!("audio.device = {:?}", settings.audio.device);
        println!("audio.sample_rate = {}", settings.audio.sample_rate);
        println!("vad.post_speech_silence_duration = {}", settings.vad.post_speech_silence_duration);
        println!("vad.min_length_of_recording = {}", settings.vad.min_length_of_recording);
        println!("transcription.final_model_path = {:?}", settings.transcription.final_model_path);
        println!("transcription.preview_model_path = {:?}", settings.transcription.preview_model_path);
        println!("transcription.language = {:?}", settings.transcription.language);
        println!("hotkey.chord = {}", settings.hotkey.chord);
        println!("agent.agent_command_template = {:?}", settings.agent.agent_command_template);
    } else {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    }
    Ok(())
}

/// Enumerate input devices (spec.md §6's `--mic` flag needs something to
/// match against; listing them is the discoverability half of that
/// feature, grounded in `whis-cli`'s device-listing command shape).
fn run_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    let mut any = false;
    for device in host
        .input_devices()
        .context("failed to enumerate input devices")?
    {
        let Ok(name) = device.name() else { continue };
        any = true;
        if Some(&name) == default_name.as_ref() {
            println!("{name} (default)");
        } else {
            println!("{name}");
        }
    }
    if !any {
        println!("no input devices found");
    }
    Ok(())
}

fn run_service(
    config: Option<PathBuf>,
    mic: Option<String>,
    preview_model: Option<PathBuf>,
    final_model: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut settings = load_settings(config);

    if let Some(mic) = mic {
        settings.audio.device = Some(mic);
    }
    if let Some(path) = &preview_model {
        settings.transcription.preview_model_path = path.to_str().map(str::to_string);
    }
    if let Some(path) = &final_model {
        settings.transcription.final_model_path = path.to_str().map(str::to_string);
    }

    let final_model_path = settings
        .transcription
        .final_model_path
        .clone()
        .context("no final model configured; pass --final-model or set transcription.final_model_path in the config file")?;
    let preview_model_path = settings
        .transcription
        .preview_model_path
        .clone()
        .unwrap_or_else(|| final_model_path.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        // Loading happens on a blocking thread: whisper.cpp model load is
        // a synchronous, possibly multi-second, CPU-bound call (spec.md §6
        // treats the concrete model as an external collaborator; loading
        // it is this binary's concern, not voicekey-core's).
        let final_model_path_for_load = final_model_path.clone();
        let final_model = tokio::task::spawn_blocking(move || {
            WhisperSttModel::load(&final_model_path_for_load)
        })
        .await
        .context("final model load task panicked")?
        .context("failed to load final model")?;

        let preview_model = if preview_model_path == final_model_path {
            None
        } else {
            let path = preview_model_path.clone();
            Some(
                tokio::task::spawn_blocking(move || WhisperSttModel::load(&path))
                    .await
                    .context("preview model load task panicked")?
                    .context("failed to load preview model")?,
            )
        };

        let (preview_model, final_model) = match preview_model {
            Some(preview) => (Arc::new(preview), Arc::new(final_model)),
            None => {
                let shared = Arc::new(final_model);
                (shared.clone(), shared)
            }
        };

        let injector = voicekey_core::keystroke::enigo_backend::EnigoInjector::new()
            .context("failed to initialize keystroke injector")?;

        voicekey_core::service::run(settings, preview_model, final_model, injector).await
    })
}
