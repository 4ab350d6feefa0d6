use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use entrainment_core::{
    classify_frequency, AudioTrack, EngineConfig, EntrainError, EntrainmentEngine,
    EntrainmentMode, FrequencySafety, LightScript, LightSourceCapability, PcmBuffer,
    SessionParameters, VibrationScript, MODE_TABLE,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> entrainment_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = EntrainmentEngine::new(&config);

    match cli.command {
        Commands::Detect {
            input,
            sample_rate,
            id,
        } => run_detect(&engine, &input, sample_rate, id).await,
        Commands::Generate {
            mode,
            track,
            max_frequency,
            torch,
            vibration_intensity,
            created_at,
            output,
        } => {
            let light_source = if torch {
                LightSourceCapability::torch(max_frequency)
            } else {
                LightSourceCapability::screen(max_frequency)
            };
            let params = SessionParameters {
                light_source,
                vibration_intensity,
                created_at_ms: created_at,
            };
            run_generate(&engine, &mode, track.as_deref(), &params, output.as_deref())
        }
        Commands::CheckFrequency { frequency } => print_json(&classify_frequency(frequency)),
        Commands::Modes => print_json(&MODE_TABLE),
    }
}

async fn run_detect(
    engine: &EntrainmentEngine,
    input: &Path,
    sample_rate: u32,
    id: Option<String>,
) -> entrainment_core::Result<()> {
    tracing::info!(?input, sample_rate, "running beat detection");
    let bytes = std::fs::read(input)?;
    let buffer = PcmBuffer::from_f32_le_bytes(&bytes, sample_rate);
    let id = id.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "track".to_string())
    });

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let track = engine.analyze_pcm(id, buffer, cancel.clone()).await;
    watcher.abort();

    if cancel.is_cancelled() {
        return Err(EntrainError::msg("beat detection cancelled"));
    }

    tracing::info!(beats = track.beats.len(), bpm = track.bpm, "detection finished");
    print_json(&track)
}

#[derive(Debug, Serialize)]
struct SessionOutput<'a> {
    safety: FrequencySafety,
    light: &'a LightScript,
    vibration: Option<&'a VibrationScript>,
}

fn run_generate(
    engine: &EntrainmentEngine,
    mode: &str,
    track: Option<&Path>,
    params: &SessionParameters,
    output: Option<&Path>,
) -> entrainment_core::Result<()> {
    let mode: EntrainmentMode = mode.parse()?;
    let track = match track {
        Some(path) => serde_json::from_str::<AudioTrack>(&std::fs::read_to_string(path)?)?,
        None if mode.uses_fixed_script() => AudioTrack::new("none", 0.0, 0.0, Vec::new()),
        None => {
            return Err(EntrainError::msg(format!(
                "mode `{mode}` is driven by audio and needs --track"
            )))
        }
    };
    tracing::info!(%mode, track = %track.id, "generating session scripts");

    let light = engine.generate_light_script(&track, mode, params);
    let vibration = match engine.generate_vibration_script(&track, mode, params) {
        Ok(script) => Some(script),
        Err(err) => {
            tracing::warn!("continuing with a light-only session: {err}");
            None
        }
    };

    let safety = classify_frequency(light.target_frequency());
    if let Some(advisory) = safety.advisory {
        tracing::warn!("{advisory}");
    }

    let session = SessionOutput {
        safety,
        light: &light,
        vibration: vibration.as_ref(),
    };
    match output {
        Some(path) => {
            std::fs::write(path, serde_json::to_vec_pretty(&session)?)?;
            tracing::info!(?path, events = light.events().len(), "wrote session");
            Ok(())
        }
        None => print_json(&session),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> entrainment_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Brainwave entrainment script generator", long_about = None)]
struct Cli {
    /// Optional engine configuration (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect beats in raw little-endian f32 mono PCM and print the track.
    Detect {
        /// Path to the raw PCM file.
        input: PathBuf,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
        /// Track id to record; defaults to the file stem.
        #[arg(long)]
        id: Option<String>,
    },
    /// Generate light and vibration scripts for a session.
    Generate {
        /// Entrainment mode, e.g. `alpha` or `dmn-shutdown`.
        #[arg(short, long)]
        mode: String,
        /// Analysed track (JSON). Optional for fixed-script modes.
        #[arg(short, long)]
        track: Option<PathBuf>,
        /// Highest frequency the light source can flash at.
        #[arg(long, default_value_t = 60.0)]
        max_frequency: f64,
        /// Treat the light source as a torch rather than a screen.
        #[arg(long)]
        torch: bool,
        /// Vibration preference in [0.1, 1.0].
        #[arg(long, default_value_t = 1.0)]
        vibration_intensity: f64,
        /// Creation stamp in Unix milliseconds.
        #[arg(long, default_value_t = 0)]
        created_at: u64,
        /// Output path; prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Classify a frequency against the safety bounds.
    CheckFrequency { frequency: f64 },
    /// List the entrainment modes.
    Modes,
}
