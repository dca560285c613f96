use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "flurry", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render a numbered PNG sequence.
    Sequence(SequenceArgs),
    /// Simulate to a time and print the particle state as JSON.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct SceneArgs {
    /// Input emitter JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Emitter origin as `x,y` (defaults to bottom center).
    #[arg(long, value_parser = parse_point)]
    origin: Option<flurry::Point>,

    /// Filter effect source applied to the whole output (e.g. "invert").
    #[arg(long)]
    filter: Option<String>,

    /// Clear the background to opaque black instead of transparent.
    #[arg(long, default_value_t = false)]
    opaque: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Timeline time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SequenceArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Start time in seconds.
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Duration in seconds.
    #[arg(long)]
    duration: f64,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Output directory; frames are written as `frame_00000.png`.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Input emitter JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Timeline time in seconds.
    #[arg(long)]
    time: f64,
}

fn parse_point(s: &str) -> Result<flurry::Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'x,y', got '{s}'"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok(flurry::Point::new(x, y))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Sequence(args) => cmd_sequence(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn open_session(scene: &SceneArgs) -> anyhow::Result<flurry::RenderSession> {
    let emitter = flurry::ParticleEmitter::from_path(&scene.in_path)?;
    let opts = flurry::RenderSessionOpts {
        width: scene.width,
        height: scene.height,
        clear: scene.opaque.then_some(flurry::Color::BLACK),
        origin: scene.origin.unwrap_or_else(|| {
            flurry::Point::new(f64::from(scene.width) / 2.0, f64::from(scene.height) * 0.9)
        }),
        ..flurry::RenderSessionOpts::default()
    };
    let mut session = flurry::RenderSession::new(emitter, opts)?;
    if let Some(source) = &scene.filter {
        session.set_filter(Some(flurry::FilterEffect::new(source.as_str())));
    }
    Ok(session)
}

fn write_png(path: &Path, mut frame: flurry::FrameRGBA) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame.unpremultiply();
    image::save_buffer_with_format(
        path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args.scene)?;
    let frame = session.render_frame(args.time)?;
    write_png(&args.out, frame)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_sequence(args: SequenceArgs) -> anyhow::Result<()> {
    if !(args.duration.is_finite() && args.duration >= 0.0) {
        anyhow::bail!("duration must be a non-negative number of seconds");
    }
    if args.fps == 0 {
        anyhow::bail!("fps must be > 0");
    }
    let mut session = open_session(&args.scene)?;
    let count = (args.duration * f64::from(args.fps)).round() as u64;
    for i in 0..count {
        let time = args.start + i as f64 / f64::from(args.fps);
        let frame = session.render_frame(time)?;
        write_png(&args.out_dir.join(format!("frame_{i:05}.png")), frame)?;
    }
    let stats = session.stats();
    eprintln!(
        "wrote {count} frames to {} (cache hits {}, fills {})",
        args.out_dir.display(),
        stats.processor.cache_hits,
        stats.processor.cache_fills
    );
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let emitter = flurry::ParticleEmitter::from_path(&args.in_path)?;
    let mut sim = flurry::ParticleSimulator::default();
    sim.simulate(args.time, &emitter.params_at(args.time), 0);

    let bounds = sim.particles().iter().fold(None, |acc: Option<flurry::Rect>, p| {
        let at = flurry::Point::new(f64::from(p.x), f64::from(p.y));
        Some(match acc {
            Some(r) => r.union_pt(at),
            None => flurry::Rect::from_points(at, at),
        })
    });
    let run = sim.last_run();
    let report = serde_json::json!({
        "time": sim.time(),
        "alive": sim.alive(),
        "capacity": sim.capacity(),
        "rng_calls": sim.rng_calls(),
        "checkpoints": sim.checkpoints().len(),
        "steps": run.steps,
        "bounds": bounds.map(|b| [b.x0, b.y0, b.x1, b.y1]),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
