use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use voice_studio::{
    Config, FileStore, HttpTransport, LogPresenter, StartOutcome, VoiceStudio, WavFileProvider,
};

#[derive(Parser)]
#[command(name = "voice-studio", about = "Record a voice sample and synthesize speech in it")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/voice-studio")]
    config: String,

    /// Override the voice service URL
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the voice service and its FFmpeg dependency
    Health,
    /// List available voices
    Voices,
    /// Show the session and whether its voice is processed
    Status,
    /// Capture a voice sample from a WAV file and upload it
    Record {
        #[arg(long)]
        input: PathBuf,
    },
    /// Synthesize speech
    Synthesize {
        text: String,
        /// Voice id; the service picks one when omitted
        #[arg(long)]
        voice: Option<String>,
        /// Do not adapt to the recorded voice
        #[arg(long)]
        no_adapt: bool,
        /// Save the produced audio here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Forget the persisted session id
    Forget,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        cfg.service.base_url = base_url;
    }

    info!("Voice Studio v{}", env!("CARGO_PKG_VERSION"));
    info!("Voice service: {}", cfg.service.base_url);

    let transport = Arc::new(
        HttpTransport::new(&cfg.service).context("Failed to create voice service client")?,
    );
    let store = Arc::new(FileStore::new(&cfg.storage.path));

    let input = match &cli.command {
        Command::Record { input } => input.clone(),
        _ => PathBuf::new(),
    };
    let provider = Arc::new(WavFileProvider::new(input, cfg.recording.chunk_duration()));

    let studio = VoiceStudio::new(&cfg, transport, provider, store, Arc::new(LogPresenter));
    studio.initialize().await;

    match cli.command {
        Command::Health => {
            let health = studio.check_health().await?;
            info!(
                "Service {} on {} (ffmpeg: {})",
                health.status.as_deref().unwrap_or("up"),
                health.device.as_deref().unwrap_or("unknown device"),
                if health.ffmpeg_available { "yes" } else { "no" }
            );
        }
        Command::Voices => {
            let catalog = studio.load_voices().await?;
            if catalog.is_empty() {
                info!("The service lists no voices");
            }
        }
        Command::Status => {
            if studio.session().await.session_id.is_none() {
                info!("No session yet. Record a voice sample first.");
                return Ok(());
            }
            studio.refresh_voice_status().await?;
        }
        Command::Record { .. } => {
            if studio.start_recording().await? == StartOutcome::AlreadyRecording {
                bail!("A recording is already in progress");
            }
            // the recorder stops itself at the clip end or the deadline
            match studio.wait_for_recording().await {
                Some(Ok(receipt)) => info!(
                    "Voice sample stored for session {} (processed: {})",
                    receipt.session_id,
                    if receipt.voice_processed { "yes" } else { "no" }
                ),
                Some(Err(e)) => bail!("Voice sample was not accepted: {}", e),
                None => bail!("Recording did not start"),
            }
        }
        Command::Synthesize {
            text,
            voice,
            no_adapt,
            output,
        } => {
            if studio.session().await.session_id.is_some() {
                // adaptation can only be requested once the voice is known to be processed
                let _ = studio.refresh_voice_status().await;
            }
            if no_adapt {
                studio.set_adaptation(false).await;
            }
            let outcome = studio.synthesize(&text, voice.as_deref()).await?;
            if let Some(path) = output {
                let audio = studio.download_audio(&outcome).await?;
                tokio::fs::write(&path, &audio)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Saved {} bytes to {}", audio.len(), path.display());
            }
        }
        Command::Forget => {
            studio.forget_session()?;
        }
    }

    Ok(())
}
