use clap::{Parser, ValueEnum};
use firebreak_core::grid::TerrainGenerator;
use firebreak_core::simulation::pick_ground;
use firebreak_core::{
    DifficultyMode, Framebuffer, GameConfig, GameLoop, GameState, GridCoord, InputEvent,
    IslandGenerator, Key, SoftwareBackend,
};
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Difficulty names accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl From<Difficulty> for DifficultyMode {
    fn from(value: Difficulty) -> Self {
        match value {
            Difficulty::Easy => DifficultyMode::Easy,
            Difficulty::Normal => DifficultyMode::Normal,
            Difficulty::Hard => DifficultyMode::Hard,
        }
    }
}

/// Scripted firebreak session rendered with the software backend
#[derive(Parser, Debug)]
#[command(name = "firebreak-headless")]
#[command(about = "Run a wildfire session without a window and save the last frame", long_about = None)]
struct Args {
    /// JSON game config, missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the config seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the config difficulty
    #[arg(short, long, value_enum)]
    difficulty: Option<Difficulty>,

    /// Map width in cells
    #[arg(long, default_value_t = 80)]
    map_width: usize,

    /// Map height in cells
    #[arg(long, default_value_t = 45)]
    map_height: usize,

    /// Frames to run
    #[arg(short, long, default_value_t = 600)]
    frames: u32,

    /// Simulated frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Display width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Display height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Controlled burn at grid cell X,Z on the first frame (repeatable)
    #[arg(short = 'i', long = "ignite", value_parser = parse_pair::<i32>)]
    ignite: Vec<(i32, i32)>,

    /// Controlled burn at screen pixel X,Y on the first frame (repeatable)
    #[arg(long = "click", value_parser = parse_pair::<f32>)]
    click: Vec<(f32, f32)>,

    /// Render at native resolution instead of the low-resolution look
    #[arg(long)]
    no_retro: bool,

    /// Frames between progress lines
    #[arg(short, long, default_value_t = 60)]
    report_interval: u32,

    /// Write the final frame here as a binary PPM
    #[arg(short, long, default_value = "frame.ppm")]
    output: PathBuf,
}

fn parse_pair<T: std::str::FromStr>(value: &str) -> Result<(T, T), String> {
    let (a, b) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<T>()
            .map_err(|_| format!("'{s}' is not a number"))
    };
    Ok((parse(a)?, parse(b)?))
}

fn load_config(args: &Args) -> Result<GameConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty.into();
    }
    if args.no_retro {
        config.retro.enabled = false;
    }
    Ok(config)
}

fn write_ppm(path: &Path, frame: &Framebuffer) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(fs::File::create(path)?);
    write!(file, "P6\n{} {}\n255\n", frame.width(), frame.height())?;
    file.write_all(&frame.to_rgb8())?;
    file.flush()
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    println!("=== Firebreak Headless ===\n");
    let terrain = IslandGenerator::default().generate(config.seed, args.map_width, args.map_height)?;
    println!(
        "Island {}x{}: {} houses, {} burnable cells (seed {})",
        terrain.width(),
        terrain.height(),
        terrain.house_count(),
        terrain.burnable_count(),
        config.seed
    );

    let mut game = GameLoop::new(config, terrain, SoftwareBackend::default());
    let mut surface = Framebuffer::try_new(args.width, args.height)?;
    let dt = 1.0 / args.fps.max(1.0);

    // first frame leaves the menu, the second places the scripted burns
    game.run_frame(0.0, &[InputEvent::KeyPress(Key::StartGame)], &mut surface)?;
    let session = game.session();
    let camera = session.camera();
    let mut burns: Vec<InputEvent> = args
        .ignite
        .iter()
        .map(|&(x, z)| InputEvent::Click {
            world_point: session.mapper().cell_center(GridCoord::new(x, z), 0.0),
        })
        .collect();
    for &pixel in &args.click {
        let viewport = (args.width, args.height);
        match pick_ground(&camera, viewport, pixel, session.terrain(), session.mapper()) {
            Some(world_point) => burns.push(InputEvent::Click { world_point }),
            None => warn!("Pixel ({}, {}) does not hit the ground", pixel.0, pixel.1),
        }
    }

    let mut frame = 0;
    let mut events = burns;
    while frame < args.frames {
        let out = game.run_frame(dt, &events, &mut surface)?;
        events.clear();
        frame += 1;

        if frame == 1 && (out.sim.ignitions_applied > 0 || out.sim.ignitions_rejected > 0) {
            println!(
                "Controlled burns: {} applied, {} rejected",
                out.sim.ignitions_applied, out.sim.ignitions_rejected
            );
        }
        if frame % args.report_interval.max(1) == 0 {
            let stats = out.sim.stats;
            println!(
                "frame {:>5} | tick {:>4} | burning {:>4} | ash {:>4} | houses {}/{} | land {:>5.1}% | score {}",
                frame,
                game.session().fire_state().tick(),
                stats.burning,
                stats.ash,
                stats.houses_standing,
                stats.houses_total,
                stats.burnable_fraction() * 100.0,
                out.sim.score
            );
        }
        if let GameState::Ended(outcome) = out.sim.state {
            println!("\nSession ended after {} frames: {:?}", frame, outcome);
            break;
        }
    }

    let session = game.session();
    println!(
        "Houses saved: {} | forest left: {:.1}% | burns used: {} | score: {}",
        session.houses_saved(),
        session.forest_fraction() * 100.0,
        session.burns_used(),
        session.score()
    );

    write_ppm(&args.output, &surface)?;
    info!(path = %args.output.display(), "Frame written");
    println!("Wrote {}", args.output.display());
    Ok(())
}
