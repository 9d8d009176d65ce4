// mixer - command-line workbench: manage sources, draw, and relay mix/prompt requests
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};

use image_mixer::camera::{self, CameraCapture};
use image_mixer::client::{HttpBackend, DEFAULT_RELAY_URL};
use image_mixer::collection::ImageCollection;
use image_mixer::data_url;
use image_mixer::drawing::{DrawingCanvas, Point, SavedDrawings};
use image_mixer::image_record::ImageId;
use image_mixer::prompt::PromptBuilder;
use image_mixer::storage::{FileStore, SharedStore};
use image_mixer::upload;
use image_mixer::workbench::{Blocked, Workbench};

#[derive(Parser, Debug)]
#[command(name = "mixer", version, about = "Mix images with a text prompt")]
struct Cli {
    /// Relay base URL.
    #[arg(long, global = true, env = "MIXER_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay: String,

    /// Where the image collection and saved drawings are kept.
    #[arg(long, global = true, env = "MIXER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the source image collection.
    #[command(subcommand)]
    Images(ImagesCmd),
    /// Draw strokes on a blank canvas.
    Draw(DrawArgs),
    /// Manage saved drawings.
    #[command(subcommand)]
    Drawings(DrawingsCmd),
    /// Take a camera snapshot into the collection.
    Capture {
        /// Use the user-facing camera instead of the outward one.
        #[arg(long)]
        front: bool,
    },
    /// Mix every collected image with a prompt.
    Mix(MixArgs),
    /// Ask the model for a more descriptive prompt.
    Optimize(OptimizeArgs),
    /// Ask the model for three alternative prompts.
    Variations(PromptArgs),
    /// Render the structured figure prompt.
    BuildPrompt(BuilderArgs),
}

#[derive(Subcommand, Debug)]
enum ImagesCmd {
    /// Add image files; directories are searched recursively.
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    List,
    Remove { id: ImageId },
    Clear,
}

#[derive(Args, Debug)]
struct DrawArgs {
    /// One stroke as space-separated points, e.g. "10,10 60,40 120,40".
    #[arg(long = "stroke", required = true)]
    strokes: Vec<String>,

    /// Keep the drawing on the saved shelf instead of adding it.
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand, Debug)]
enum DrawingsCmd {
    List,
    Delete { index: usize },
    /// Load a saved drawing onto the canvas and add it to the collection.
    Add { index: usize },
}

#[derive(Args, Debug)]
struct MixArgs {
    #[arg(long, short)]
    prompt: String,

    /// Output PNG path.
    #[arg(long, default_value = "mixed.png")]
    out: PathBuf,

    /// Also put the result back into the collection.
    #[arg(long, default_value_t = false)]
    keep: bool,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    #[arg(long, short)]
    prompt: String,

    /// Print only the accepted prompt instead of a before/after review.
    #[arg(long, default_value_t = false)]
    accept: bool,
}

#[derive(Args, Debug)]
struct PromptArgs {
    #[arg(long, short)]
    prompt: String,
}

#[derive(Args, Debug)]
struct BuilderArgs {
    #[arg(long)]
    scale: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    style: Option<String>,
    #[arg(long)]
    environment: Option<String>,
    #[arg(long)]
    base: Option<String>,
    #[arg(long)]
    details: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let store = open_store(cli.data_dir)?;

    match cli.cmd {
        Command::Images(cmd) => cmd_images(cmd, store),
        Command::Draw(args) => cmd_draw(args, store),
        Command::Drawings(cmd) => cmd_drawings(cmd, store),
        Command::Capture { front } => cmd_capture(store, front),
        Command::Mix(args) => cmd_mix(args, store, &cli.relay),
        Command::Optimize(args) => cmd_optimize(args, &cli.relay),
        Command::Variations(args) => cmd_variations(args, &cli.relay),
        Command::BuildPrompt(args) => {
            println!("{}", builder_from(args).build());
            Ok(())
        }
    }
}

fn open_store(dir: Option<PathBuf>) -> Result<SharedStore> {
    let root = match dir {
        Some(d) => d,
        None => dirs::data_dir()
            .ok_or_else(|| anyhow!("no data directory on this platform; pass --data-dir"))?
            .join("image-mixer"),
    };
    let store = FileStore::open(&root).with_context(|| format!("open data dir '{}'", root.display()))?;
    log::info!("data dir: {}", store.root().display());
    Ok(Arc::new(store))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start async runtime")
}

// ── Collection ───────────────────────────────────────────────────────────

fn cmd_images(cmd: ImagesCmd, store: SharedStore) -> Result<()> {
    let mut images = ImageCollection::mirrored(store);
    match cmd {
        ImagesCmd::Add { paths } => {
            let (found, report) = runtime()?.block_on(upload::read_images(&paths));
            for image in found {
                let id = images.add(image);
                println!("{}", id);
            }
            eprintln!("{}", report.feedback());
        }
        ImagesCmd::List => {
            for rec in images.iter() {
                println!("{}\t{}\t{}\t{} bytes", rec.id(), rec.source(), rec.mime_type(), rec.byte_len());
            }
        }
        ImagesCmd::Remove { id } => {
            if !images.remove(id) {
                eprintln!("no image with id {}", id);
            }
        }
        ImagesCmd::Clear => images.clear(),
    }
    Ok(())
}

// ── Drawing ──────────────────────────────────────────────────────────────

fn parse_stroke(raw: &str) -> Result<Vec<Point>> {
    raw.split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| anyhow!("point '{}' is not x,y", pair))?;
            Ok(Point::new(
                x.trim().parse().with_context(|| format!("bad x in '{}'", pair))?,
                y.trim().parse().with_context(|| format!("bad y in '{}'", pair))?,
            ))
        })
        .collect()
}

fn cmd_draw(args: DrawArgs, store: SharedStore) -> Result<()> {
    let mut canvas = DrawingCanvas::new();
    for raw in &args.strokes {
        canvas.stroke(&parse_stroke(raw)?);
    }
    if !canvas.has_drawing() {
        bail!("nothing was drawn; a stroke needs at least two points");
    }

    if args.save {
        let mut shelf = SavedDrawings::load(store);
        if let Some(index) = canvas.save(&mut shelf)? {
            println!("saved drawing #{}", index);
        }
    } else if let Some(image) = canvas.commit()? {
        let id = ImageCollection::mirrored(store).add(image);
        println!("{}", id);
    }
    Ok(())
}

fn cmd_drawings(cmd: DrawingsCmd, store: SharedStore) -> Result<()> {
    let mut shelf = SavedDrawings::load(store.clone());
    match cmd {
        DrawingsCmd::List => {
            for (i, url) in shelf.iter().enumerate() {
                println!("#{}\t{} chars", i, url.len());
            }
        }
        DrawingsCmd::Delete { index } => {
            if shelf.delete(index).is_none() {
                eprintln!("no saved drawing #{}", index);
            }
        }
        DrawingsCmd::Add { index } => {
            let url = shelf.get(index).ok_or_else(|| anyhow!("no saved drawing #{}", index))?;
            let mut canvas = DrawingCanvas::new();
            canvas.load(url)?;
            if let Some(image) = canvas.commit()? {
                println!("{}", ImageCollection::mirrored(store).add(image));
            }
        }
    }
    Ok(())
}

fn cmd_capture(store: SharedStore, front: bool) -> Result<()> {
    let mut camera = CameraCapture::new(camera::default_device());
    if front {
        camera.switch_facing()?;
    }
    if camera.start().is_err() {
        bail!("{}", camera.error().unwrap_or("camera failed to start"));
    }
    let shot = camera.capture()?;
    camera.stop();
    println!("{}", ImageCollection::mirrored(store).add(shot));
    Ok(())
}

// ── Relayed actions ──────────────────────────────────────────────────────

fn blocked(wb: &Workbench, why: Blocked) -> anyhow::Error {
    match wb.error() {
        Some(msg) => anyhow!("{}", msg),
        None => anyhow!(why),
    }
}

fn cmd_mix(args: MixArgs, store: SharedStore, relay: &str) -> Result<()> {
    let backend = HttpBackend::new(relay)?;
    let mut wb = Workbench::new(ImageCollection::mirrored(store));
    wb.set_prompt(args.prompt);

    runtime()?
        .block_on(wb.mix(&backend))
        .map_err(|why| blocked(&wb, why))?;

    if let Some(msg) = wb.error() {
        bail!("{}", msg);
    }
    let url = wb.result().ok_or_else(|| anyhow!("no image returned"))?;
    let bytes = data_url::decode_payload(data_url::strip(url)?)?;
    std::fs::write(&args.out, bytes).with_context(|| format!("write '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());

    if args.keep {
        if let Some(id) = wb.reuse_result() {
            println!("{}", id);
        }
    }
    Ok(())
}

fn cmd_optimize(args: OptimizeArgs, relay: &str) -> Result<()> {
    let backend = HttpBackend::new(relay)?;
    let mut wb = Workbench::default();
    wb.set_prompt(args.prompt);

    runtime()?
        .block_on(wb.optimize(&backend))
        .map_err(|why| blocked(&wb, why))?;

    if let Some(msg) = wb.error() {
        bail!("{}", msg);
    }
    if args.accept {
        if wb.accept_suggestion() {
            println!("{}", wb.prompt());
        }
        return Ok(());
    }
    if let Some(suggested) = wb.suggestion() {
        println!("original:  {}", wb.prompt());
        println!("suggested: {}", suggested);
    }
    wb.dismiss_suggestion();
    Ok(())
}

fn cmd_variations(args: PromptArgs, relay: &str) -> Result<()> {
    let backend = HttpBackend::new(relay)?;
    let mut wb = Workbench::default();
    wb.set_prompt(args.prompt);

    runtime()?
        .block_on(wb.generate_variations(&backend))
        .map_err(|why| blocked(&wb, why))?;

    if let Some(msg) = wb.error() {
        bail!("{}", msg);
    }
    for (i, v) in wb.variations().iter().enumerate() {
        println!("{}. {}", i + 1, v);
    }
    Ok(())
}

fn builder_from(args: BuilderArgs) -> PromptBuilder {
    let d = PromptBuilder::default();
    PromptBuilder {
        scale:       args.scale.unwrap_or(d.scale),
        subject:     args.subject.unwrap_or(d.subject),
        style:       args.style.unwrap_or(d.style),
        environment: args.environment.unwrap_or(d.environment),
        base:        args.base.unwrap_or(d.base),
        details:     args.details.unwrap_or(d.details),
    }
}
