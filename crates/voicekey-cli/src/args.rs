use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// voicekey: a voice-driven keyboard. Arms on a global hotkey, transcribes
/// speech, and types the result into the focused application (spec.md §1,
/// SPEC_FULL.md §4).
#[derive(Parser)]
#[command(name = "voicekey")]
#[command(version)]
#[command(about = "Continuous voice dictation with a dual-model transcription pipeline")]
#[command(after_help = "Run 'voicekey' without arguments to start the dictation service.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging (VAD stage decisions, scheduler generations,
    /// keystroke queue activity).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Load settings from this path instead of
    /// `~/.config/voicekey/settings.json` (spec.md §6).
    #[arg(short, long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Select the input device by substring match against its name,
    /// overriding `audio.device` for this run (SPEC_FULL.md §6's supplement
    /// of `original_source/whisper.py`'s `--mic` flag).
    #[arg(long, global = true, value_name = "NAME")]
    pub mic: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dictation service in the foreground (the implicit default
    /// when no subcommand is given).
    Run {
        /// Path to the model file backing the fast preview pass, overriding
        /// `transcription.preview_model_path`.
        #[arg(long, value_hint = ValueHint::FilePath)]
        preview_model: Option<PathBuf>,

        /// Path to the model file backing the authoritative final pass,
        /// overriding `transcription.final_model_path`. Required unless
        /// already set in the settings file.
        #[arg(long, value_hint = ValueHint::FilePath)]
        final_model: Option<PathBuf>,
    },
    /// Print the resolved configuration.
    Config {
        /// List settings as `key = value` lines instead of raw JSON.
        #[arg(long)]
        list: bool,
        /// Print only the settings file path.
        #[arg(long)]
        path: bool,
    },
    /// List available microphone input devices.
    Devices,
}
