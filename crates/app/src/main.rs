mod platform;
mod script;

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use monorail_core::{
    config::parse_timeout, AssetKey, EngineState, PointerTarget, TimelineConfig, TimelineEngine,
    TimelineError, Year, YearMapper, YearNotification,
};
use tracing_subscriber::EnvFilter;

use crate::{platform::FsPlatform, script::Command};

fn main() -> monorail_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Ticks { left, width } => print_ticks(left, width),
    }
}

fn run(args: RunArgs) -> monorail_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => TimelineConfig::from_json_file(path)?,
        None => TimelineConfig::default(),
    };
    if let Some(root) = &args.assets {
        config.assets.root = root.display().to_string();
    }
    let timeout = match args.timeout.as_deref() {
        Some(raw) => parse_timeout(raw),
        None => Duration::from_millis(config.timeout_ms),
    };
    let start_muted = args.muted || config.start_muted;
    let surface_id = config.surface_id.clone();
    let poll_interval = config.poll_interval();

    tracing::info!(assets = %config.assets.root, "starting timeline");
    let mut engine = TimelineEngine::new(FsPlatform::new(&surface_id), config)?;
    engine.subscribe(|notification: YearNotification| match notification {
        YearNotification::Commit(year) => tracing::info!(%year, "year selected"),
        YearNotification::Slide(year) => tracing::debug!(year, "sliding"),
    });
    engine.initialize(&surface_id, Some(timeout.as_millis() as f64), start_muted);

    while engine.poll() == EngineState::Loading {
        thread::sleep(poll_interval);
    }
    if engine.is_timed_out() {
        tracing::error!("loading failed, check the asset directory");
    }
    engine.check()?;

    match &args.script {
        Some(path) => replay(&mut engine, BufReader::new(File::open(path)?))?,
        None => replay(&mut engine, io::stdin().lock())?,
    }

    if let Some(path) = &args.snapshot {
        save_snapshot(&engine, path)?;
    }
    Ok(())
}

fn replay(
    engine: &mut TimelineEngine<FsPlatform>,
    input: impl BufRead,
) -> monorail_core::Result<()> {
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let Some(command) = script::parse_line(&line) else {
            continue;
        };
        let command = command
            .map_err(|err| TimelineError::config(format!("line {}: {err}", index + 1)))?;
        apply(engine, command)?;
    }
    Ok(())
}

fn apply(engine: &mut TimelineEngine<FsPlatform>, command: Command) -> monorail_core::Result<()> {
    match command {
        Command::Click(x) => engine.pointer_down(PointerTarget::Track, x),
        Command::Grab(x) => engine.pointer_down(PointerTarget::Handle, x),
        Command::Move(x) => engine.pointer_move(x),
        Command::Release(x) => engine.pointer_up(x),
        Command::Cancel => engine.pointer_cancel(),
        Command::Key { key, repeat } => engine.key_down(key, repeat),
        Command::Mute => {
            let muted = engine.toggle_mute();
            tracing::info!(muted, "mute button");
        }
        Command::Repeat => engine.repeat_audio(),
        Command::Wait(duration) => thread::sleep(duration),
        Command::Snapshot(path) => save_snapshot(engine, &path)?,
        Command::Status => print_status(engine),
    }
    Ok(())
}

fn save_snapshot(engine: &TimelineEngine<FsPlatform>, path: &Path) -> monorail_core::Result<()> {
    let Some(surface) = engine.background().surface() else {
        return Err(TimelineError::config("no render surface attached"));
    };
    surface
        .save(path)
        .map_err(|err| TimelineError::config(format!("saving {}: {err}", path.display())))?;
    tracing::info!(path = %path.display(), "snapshot written");
    Ok(())
}

fn print_status(engine: &TimelineEngine<FsPlatform>) {
    let audio = engine.audio();
    let audible: Vec<String> = audio
        .playing()
        .iter()
        .chain(audio.looping())
        .filter(|key| audio.clip(key).is_some_and(|clip| clip.is_playing()))
        .map(AssetKey::to_string)
        .collect();

    let background = engine
        .background()
        .shown()
        .map_or_else(|| "none".to_string(), |year| year.to_string());
    let handle = engine
        .handle_x()
        .map_or_else(|| "off-track".to_string(), |x| format!("{x:.1}"));

    println!(
        "year={} background={} handle={} muted={} audible=[{}]",
        engine.current_year(),
        background,
        handle,
        audio.is_muted(),
        audible.join(", ")
    );
}

fn print_ticks(left: f64, width: f64) -> monorail_core::Result<()> {
    let mapper = YearMapper::new(left, width)?;
    println!("step={}px", mapper.step());
    for year in Year::all() {
        match mapper.year_x(year) {
            Some(x) => println!("{year}  x={x:>7.1}  maps back to {}", mapper.year_from_x(x)),
            None => println!("{year}  off-track"),
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Historical year slider with synced images and audio",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the assets and replay input commands against the timeline.
    Run(RunArgs),
    /// Print the marker position of every year on a slider track.
    Ticks {
        /// Left edge of the track, in pixels.
        #[arg(long, default_value_t = 40.0)]
        left: f64,
        /// Width of the track, in pixels.
        #[arg(long, default_value_t = 560.0)]
        width: f64,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Asset root directory, overriding the configuration.
    #[arg(short, long)]
    assets: Option<PathBuf>,
    /// Loading deadline in milliseconds. Unparseable values use the default.
    #[arg(short, long)]
    timeout: Option<String>,
    /// Start with audio muted.
    #[arg(long)]
    muted: bool,
    /// Script of input commands; reads stdin when omitted.
    #[arg(short, long)]
    script: Option<PathBuf>,
    /// Write the final frame to this PNG.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}
