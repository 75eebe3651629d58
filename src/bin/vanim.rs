use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "vanim", version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print duration, natural size and frame count of a clip as JSON.
    Info(InfoArgs),
    /// Export a clip as a numbered image sequence.
    Export(ExportArgs),
    /// Play a clip headlessly for a while.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Clip manifest, keyframe directory or SVG file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame rate used for the frame count.
    #[arg(long, default_value = "30")]
    fps: vanim::Fps,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Clip manifest, keyframe directory or SVG file.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Export config JSON; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output frame rate, `30` or `30000/1001`.
    #[arg(long)]
    fps: Option<vanim::Fps>,

    /// Animation seconds per output second.
    #[arg(long)]
    speed: Option<f64>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Frame image format (`png` or `bmp`).
    #[arg(long)]
    format: Option<vanim::FrameFormat>,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Clip manifest, keyframe directory or SVG file.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Player config JSON; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wall-clock seconds to play.
    #[arg(long, default_value_t = 1.0)]
    seconds: f64,

    /// Target surface width (defaults to the clip width).
    #[arg(long)]
    width: Option<u32>,

    /// Target surface height (defaults to the clip height).
    #[arg(long)]
    height: Option<u32>,

    /// Scaling mode.
    #[arg(long)]
    fill: Option<vanim::FillMode>,

    /// Scaling restriction.
    #[arg(long)]
    stretch: Option<vanim::StretchDirection>,

    /// Loops before freezing, or `infinite`.
    #[arg(long)]
    loops: Option<vanim::LoopTarget>,

    /// Playback speed multiplier.
    #[arg(long)]
    speed: Option<f64>,

    /// Redraw cap in Hz, `0` for uncapped.
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Write the last presented frame here as PNG.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Export(args) => cmd_export(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let clip = vanim::open_clip(&args.in_path)?;
    let info = vanim::ClipInfo::of(clip.as_ref());
    let frames = vanim::frame_count(info.duration_secs, args.fps, 1.0);
    let out = serde_json::json!({
        "duration_secs": info.duration_secs,
        "width": info.width,
        "height": info.height,
        "fps": args.fps.to_string(),
        "frame_count": frames,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => vanim::ExportConfig::from_path(path)?,
        None => {
            let source = args
                .in_path
                .clone()
                .context("--in is required without --config")?;
            let out = args.out.clone().context("--out is required without --config")?;
            vanim::ExportConfig::new(source, out)
        }
    };
    if let Some(p) = args.in_path {
        cfg.source = p;
    }
    if let Some(p) = args.out {
        cfg.out_dir = p;
    }
    if let Some(fps) = args.fps {
        cfg.fps = fps;
    }
    if let Some(speed) = args.speed {
        cfg.speed = speed;
    }
    if args.width.is_some() {
        cfg.width = args.width;
    }
    if args.height.is_some() {
        cfg.height = args.height;
    }
    if let Some(format) = args.format {
        cfg.format = format;
    }
    cfg.validate()?;

    let mut job = vanim::ExportJob::from_config(&cfg);
    let outcome = job.run(&vanim::CancelToken::new(), &mut |ev| {
        if let Ok(line) = serde_json::to_string(ev) {
            eprintln!("{line}");
        }
    })?;

    match outcome {
        vanim::JobOutcome::Completed { frames, .. } => {
            eprintln!("wrote {frames} frames to {}", cfg.out_dir.display());
            Ok(())
        }
        vanim::JobOutcome::Cancelled { frames_written } => {
            anyhow::bail!("export cancelled after {frames_written} frames")
        }
    }
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => vanim::PlayerConfig::from_path(path)?,
        None => vanim::PlayerConfig::new(
            args.in_path
                .clone()
                .context("--in is required without --config")?,
        ),
    };
    if let Some(p) = args.in_path {
        cfg.source = p;
    }
    if let Some(fill) = args.fill {
        cfg.fill = fill;
    }
    if let Some(stretch) = args.stretch {
        cfg.stretch = stretch;
    }
    if let Some(loops) = args.loops {
        cfg.loop_target = loops;
    }
    if let Some(speed) = args.speed {
        cfg.speed = speed;
    }
    if let Some(hz) = args.sample_rate {
        cfg.sample_rate_hz = hz;
    }
    cfg.validate()?;
    let play_for = Duration::try_from_secs_f64(args.seconds)
        .with_context(|| format!("invalid --seconds {}", args.seconds))?;

    let clip = vanim::open_clip(&cfg.source)?;
    let natural = clip.natural_size();
    let size = vanim::PixelSize::new(
        args.width.unwrap_or(natural.width),
        args.height.unwrap_or(natural.height),
    );
    let slot = vanim::FrameSlot::new(size);

    let handle =
        vanim::PlaybackHandle::spawn(Box::new(slot.clone()), vanim::SessionOpts::default())?;
    handle.set_position_callback(Some(|p: vanim::PlaybackPosition| {
        debug!(frame = p.frame_index, normalized = p.normalized, "position");
    }))?;
    handle.start(clip, cfg.start_params())?;

    let deadline = Instant::now()
        .checked_add(play_for)
        .with_context(|| format!("--seconds {} is out of range", args.seconds))?;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match handle.events().recv_timeout(left) {
            Ok(vanim::SessionEvent::StartRejected { reason }) => {
                anyhow::bail!("clip rejected: {reason}")
            }
            Ok(ev) => info!(event = ?ev, "session event"),
            Err(_) => break,
        }
    }

    let state = handle.state();
    handle.shutdown();

    let summary = serde_json::json!({
        "elapsed_secs": state.elapsed_secs,
        "loops_completed": state.loops_completed,
        "frames_presented": slot.presented(),
    });
    println!("{summary}");

    if let Some(path) = args.snapshot {
        let frame = slot.latest().context("no frame was presented")?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create snapshot dir '{}'", parent.display()))?;
        }
        frame.save(&path, vanim::FrameFormat::Png)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}
