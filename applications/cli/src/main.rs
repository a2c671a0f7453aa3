/// Loopweave - adaptive music inspection and offline rendering
use clap::{Parser, Subcommand};
use loopweave_audio::FsSourceLoader;
use loopweave_cli::{config::LoopweaveConfig, describe_track, render, write_wav, QueueCue, RenderPlan};
use loopweave_core::Catalog;
use loopweave_playback::{Engine, ManualClock};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "loopweave")]
#[command(about = "Adaptive music catalog tools", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LOOPWEAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Asset root holding the catalog JSON and clip audio
    #[arg(short, long, global = true)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a track's sections, clips and transitions
    Inspect {
        /// Track name
        track: String,
    },
    /// Render a scripted session to a WAV file
    Render {
        /// Track name
        track: String,
        /// Session length in seconds
        #[arg(short, long, default_value_t = 60.0)]
        seconds: f64,
        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,
        /// Section to start in (default: the track's entry section)
        #[arg(long)]
        section: Option<String>,
        /// Queue a transition at a time, as T:SECTION (repeatable)
        #[arg(long = "queue", value_name = "T:SECTION")]
        queue: Vec<QueueCue>,
        /// Stop at this many seconds into the session
        #[arg(long)]
        stop_at: Option<f64>,
        /// Stop without the fade-out
        #[arg(long)]
        no_fade: bool,
        /// Successor picker seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loopweave=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = LoopweaveConfig::load(cli.config.as_deref())?;
    if let Some(assets) = cli.assets {
        config.assets.root = assets;
    }
    config.validate()?;

    let catalog = Catalog::load_dir(&config.assets.root)?;

    match cli.command {
        Commands::Inspect { track } => {
            print!("{}", describe_track(&catalog, &track)?);
        }
        Commands::Render {
            track,
            seconds,
            out,
            section,
            queue,
            stop_at,
            no_fade,
            seed,
        } => {
            if seed.is_some() {
                config.engine.seed = seed;
            }
            let plan = RenderPlan {
                track,
                section,
                seconds,
                queue,
                stop_at,
                fade: !no_fade,
            };
            render_to_file(&config, catalog, &plan, &out)?;
        }
    }

    Ok(())
}

fn render_to_file(
    config: &LoopweaveConfig,
    catalog: Catalog,
    plan: &RenderPlan,
    out: &std::path::Path,
) -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let mut engine = Engine::new(
        Arc::new(catalog),
        Box::new(FsSourceLoader::new(&config.assets.root)),
        Box::new(clock.clone()),
        config.engine.clone(),
    );

    let rendered = render(
        &mut engine,
        &clock,
        plan,
        config.render.sample_rate,
        config.render.block_frames,
    )?;
    write_wav(out, &rendered.samples, rendered.sample_rate)?;

    for (at, clip) in &rendered.clips {
        println!("{at:>8.3}s  {clip}");
    }
    for message in &rendered.errors {
        eprintln!("warning: {message}");
    }
    Ok(())
}
