use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;

use diorama_runtime::{
    AssetLoader, ClickOutcome, FsAssetLoader, HeadlessRenderer, ManualClock, MemoryAssetLoader,
    PointerEvent, RenderLoop, SceneContext, SceneLayout, StaticViewport, TransitionStatus,
};

const VIEWPORT: StaticViewport = StaticViewport::new(1280, 720);
const ASSET_WAIT: Duration = Duration::from_secs(5);

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let layout = load_layout(&options.scene)?;

    let loader: Arc<dyn AssetLoader> = match &options.assets {
        Some(root) => Arc::new(FsAssetLoader::new(root)),
        None => Arc::new(MemoryAssetLoader::new()),
    };
    let context = SceneContext::from_layout(&layout, Arc::new(VIEWPORT), loader)
        .with_context(|| format!("failed to set up scene {}", layout.name))?;
    if !context.assets().wait_idle(ASSET_WAIT) {
        eprintln!("Some fonts are still loading; their text will be missing");
    }

    let mut render_loop = RenderLoop::new(context, HeadlessRenderer::new(), ManualClock::new());
    let report = render_loop.frame()?;
    println!("{}", render_loop.context().summary());
    println!("Texts added: {}", report.texts_added);

    for click in &options.clicks {
        let now = render_loop.now();
        let outcome = match click {
            Click::At(position) => {
                render_loop
                    .context()
                    .pointer_queue()
                    .push(PointerEvent::click(position.x, position.y));
                let report = render_loop.frame()?;
                report.clicks.into_iter().next().unwrap_or(ClickOutcome::Missed)
            }
            Click::On(name) => render_loop.context_mut().click_entity(name, now)?,
        };
        println!("Click {}: {}", click, describe(render_loop.context(), &outcome));
    }

    for _ in 0..options.frames {
        let report = render_loop.step(options.step)?;
        if let TransitionStatus::Completed { pose } = report.transition {
            println!("Arrived at {pose} after {:?}", render_loop.now());
        }
    }

    print_final_state(render_loop.context());
    Ok(())
}

fn load_layout(scene: &str) -> Result<SceneLayout> {
    if scene.ends_with(".xml") {
        let xml = fs::read_to_string(scene).with_context(|| format!("failed to read {scene}"))?;
        SceneLayout::from_xml(&xml).with_context(|| format!("failed to parse {scene}"))
    } else {
        SceneLayout::builtin(scene)
    }
}

fn describe(context: &SceneContext, outcome: &ClickOutcome) -> String {
    let name = |id| {
        context
            .graph()
            .get(id)
            .map(|entity| entity.name_or_default().to_string())
            .unwrap_or_else(|| "<removed>".to_string())
    };
    match outcome {
        ClickOutcome::Missed => "missed".to_string(),
        ClickOutcome::Unmapped { target } => format!("{} (no action)", name(*target)),
        ClickOutcome::Dispatched { target, pose } => format!("{} -> {pose}", name(*target)),
        ClickOutcome::Rejected { target, pose } => {
            format!("{} rejected (unknown pose {pose})", name(*target))
        }
    }
}

fn print_final_state(context: &SceneContext) {
    let rig = context.rig();
    let camera = rig.active_camera();
    let forward = camera.forward();
    println!("Final camera state:");
    println!(
        " - pose={} pos=({:.2}, {:.2}, {:.2}) forward=({:.2}, {:.2}, {:.2}) free-look={}",
        rig.active_pose_name(),
        camera.position.x,
        camera.position.y,
        camera.position.z,
        forward.x,
        forward.y,
        forward.z,
        if rig.free_look_enabled() { "on" } else { "off" }
    );
}

enum Click {
    At(Vec2),
    On(String),
}

impl std::fmt::Display for Click {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Click::At(position) => write!(f, "at ({}, {})", position.x, position.y),
            Click::On(name) => write!(f, "on {name}"),
        }
    }
}

struct CliOptions {
    scene: String,
    assets: Option<String>,
    clicks: Vec<Click>,
    frames: u32,
    step: Duration,
}

const USAGE: &str = "Usage: diorama-runtime [shop|cube|<layout.xml>] [--assets DIR] \
[--click X,Y]... [--click-on NAME]... [--frames N] [--step-ms MS]";

impl CliOptions {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            scene: "shop".to_string(),
            assets: None,
            clicks: Vec::new(),
            frames: 150,
            step: Duration::from_millis(16),
        };
        let mut args = args.peekable();
        if let Some(scene) = args.next_if(|arg| !arg.starts_with("--")) {
            options.scene = scene;
        }
        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| anyhow!("{arg} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--assets" => options.assets = Some(value()?),
                "--click" => options.clicks.push(Click::At(parse_point(&value()?)?)),
                "--click-on" => options.clicks.push(Click::On(value()?)),
                "--frames" => {
                    options.frames = value()?
                        .parse()
                        .context("--frames expects a whole number")?
                }
                "--step-ms" => {
                    let millis: u64 = value()?
                        .parse()
                        .context("--step-ms expects a whole number")?;
                    options.step = Duration::from_millis(millis);
                }
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}

fn parse_point(value: &str) -> Result<Vec2> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("expected X,Y but got `{value}`"))?;
    Ok(Vec2::new(
        x.trim().parse().context("invalid X coordinate")?,
        y.trim().parse().context("invalid Y coordinate")?,
    ))
}
