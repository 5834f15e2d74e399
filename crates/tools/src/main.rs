use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Parser, Subcommand};
use foundation::bounds::GeoBounds;
use foundation::time::Millis;
use layers::content::Content;
use layers::slider::{SliderDescriptor, SliderLayer};
use layers::tile::{TileLayer, TileLayerDescriptor};
use layers::vector::{VectorLayer, VectorLayerDescriptor};
use layers::{LayerError, LayerSlot, LifecycleState, SceneContext, SceneScope, SlotOutcome};
use scene::{CrossOrigin, DomTarget, LayerId, MapEngine};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use view::map_util::{centroid, clamp_zoom, extent_and_max_zoom};
use view::{LogNotifier, Notification, Notifier, ViewCallbacks, ViewProvider, ViewerConfig};

mod scene_file;

use scene_file::{LayerSpec, SceneFile};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect content records and dry-run map scenes")]
struct Args {
    /// Viewer config JSON (ATLAS_* environment variables otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print extent, zoom range and opening zoom of content records
    Inspect {
        /// A content record or a JSON array of them
        path: PathBuf,

        /// Apply the shared-view zoom ceiling
        #[arg(long)]
        shared: bool,
    },

    /// Mount a scene file, paint one frame and print paint order
    Render {
        path: PathBuf,

        /// Also list tile requests for the visible area
        #[arg(long)]
        tiles: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ViewerConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => ViewerConfig::from_env()?,
    };

    match args.command {
        Command::Inspect { path, shared } => inspect(&path, shared, &config)?,
        Command::Render { path, tiles } => render(&path, tiles, &config)?,
    }
    Ok(())
}

#[derive(Serialize)]
struct InspectReport {
    id: String,
    levels: Vec<u8>,
    /// `[min_x, min_y, max_x, max_y]` in EPSG:3857.
    extent: Option<[f64; 4]>,
    max_zoom: Option<f64>,
    center: Option<[f64; 2]>,
    opening_zoom: f64,
}

fn inspect(path: &Path, shared: bool, config: &ViewerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let records = match Content::list_from_json_str(&text) {
        Ok(records) => records,
        Err(_) => vec![Content::from_json_str(&text)?],
    };

    let ceiling = Some(config.shared_zoom_ceiling);
    for content in &records {
        let derived = extent_and_max_zoom(content, shared, ceiling);
        let pyramid = content.pyramid();
        let report = InspectReport {
            id: content.id.clone(),
            levels: pyramid.map(|p| p.levels()).unwrap_or_default(),
            extent: derived.extent.map(|e| [e.min[0], e.min[1], e.max[0], e.max[1]]),
            max_zoom: derived.max_zoom,
            center: pyramid
                .and_then(|p| p.coarsest())
                .map(|level| centroid(&GeoBounds::from(level.boundary)).as_array()),
            opening_zoom: clamp_zoom(pyramid, config.default_zoom, config.default_zoom, ceiling, shared),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

enum Mounted {
    Tile(LayerSlot<TileLayer>),
    Slider(LayerSlot<SliderLayer>),
    Points(LayerSlot<VectorLayer>),
}

impl Mounted {
    fn state(&self) -> LifecycleState {
        match self {
            Mounted::Tile(slot) => slot.state(),
            Mounted::Slider(slot) => slot.state(),
            Mounted::Points(slot) => slot.state(),
        }
    }

    fn tile_layers(&self) -> Vec<LayerId> {
        match self {
            Mounted::Tile(slot) => slot.get().map(|l| vec![l.id()]).unwrap_or_default(),
            Mounted::Slider(slot) => slot
                .get()
                .map(|s| vec![s.left().id(), s.right().id()])
                .unwrap_or_default(),
            Mounted::Points(_) => Vec::new(),
        }
    }
}

fn mount_layer(
    ctx: &SceneContext,
    slot: usize,
    spec: &LayerSpec,
    cross_origin: Option<CrossOrigin>,
) -> Result<Mounted, LayerError> {
    let tile = |url: &str| {
        let mut d = TileLayerDescriptor::new(url).with_slot(slot);
        d.cross_origin = cross_origin;
        d
    };
    let mounted = match spec {
        LayerSpec::Tile {
            url,
            projection,
            opacity,
        } => {
            let mut d = tile(url);
            if let Some(projection) = projection {
                d.projection = projection.clone();
            }
            d.opacity = *opacity;
            let mut layer = LayerSlot::new();
            layer.sync(ctx, Some(&d))?;
            Mounted::Tile(layer)
        }
        LayerSpec::Content { content } => {
            let d = TileLayerDescriptor::from_content(content).map(|mut d| {
                d.slot = slot;
                d.cross_origin = cross_origin;
                d
            });
            let mut layer = LayerSlot::new();
            if layer.sync(ctx, d.as_ref())? == SlotOutcome::Idle {
                info!(content = %content.id, "content has no tiles yet; nothing mounted");
            }
            Mounted::Tile(layer)
        }
        LayerSpec::Slider {
            left,
            right,
            position,
        } => {
            let d = SliderDescriptor {
                left: tile(left),
                right: tile(right),
                position: *position,
                slot,
            };
            let mut layer = LayerSlot::new();
            layer.sync(ctx, Some(&d))?;
            Mounted::Slider(layer)
        }
        LayerSpec::Points { points } => {
            let d = VectorLayerDescriptor::from_points(points).with_slot(slot);
            let mut layer = LayerSlot::new();
            layer.sync(ctx, Some(&d))?;
            Mounted::Points(layer)
        }
    };
    Ok(mounted)
}

#[derive(Serialize)]
struct RenderReport {
    target: String,
    center: [f64; 2],
    zoom: f64,
    /// Lifecycle of each layer that passed configuration checks.
    layers: Vec<String>,
    paint_order: Vec<String>,
    commands: Vec<String>,
    tiles: Vec<String>,
}

fn tile_urls(engine: &MapEngine, layers: &[Mounted]) -> Result<Vec<String>, scene::SceneError> {
    let mut urls = Vec::new();
    for id in layers.iter().flat_map(Mounted::tile_layers) {
        for coord in engine.visible_tiles(id)? {
            urls.push(engine.request_tile(id, coord)?.url);
        }
    }
    Ok(urls)
}

fn render(path: &Path, with_tiles: bool, config: &ViewerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let scene = SceneFile::from_json_str(&fs::read_to_string(path)?)?;
    let target = DomTarget::new(scene.target.id.clone(), [scene.target.width, scene.target.height]);
    let callbacks = ViewCallbacks {
        on_zoom: Some(Rc::new(|zoom: f64| debug!(zoom, "zoom changed"))),
        ..ViewCallbacks::default()
    };
    let provider = ViewProvider::mount(&target, scene.view_props(config), callbacks, config.clone())?;
    let ctx = SceneContext::from_scope(&provider.scope(&SceneScope::root()))?;
    let cross_origin = config.cross_origin()?;

    let notifier = LogNotifier;
    let mut mounted = Vec::new();
    for (slot, spec) in scene.layers.iter().enumerate() {
        match mount_layer(&ctx, slot, spec, cross_origin) {
            Ok(layer) => mounted.push(layer),
            Err(err) => match Notification::for_layer_error(&err) {
                Some(notification) => notifier.notify(notification),
                None => return Err(err.into()),
            },
        }
    }

    let frame = provider.map().borrow_mut().render_frame(Millis(0));
    let engine = provider.map().borrow();
    let tiles = if with_tiles {
        tile_urls(&engine, &mounted)?
    } else {
        Vec::new()
    };
    let report = RenderReport {
        target: engine.target_id().to_string(),
        center: engine.view().center(),
        zoom: engine.view().zoom(),
        layers: mounted.iter().map(|m| format!("{:?}", m.state())).collect(),
        paint_order: engine.paint_order().iter().map(|id| id.to_string()).collect(),
        commands: frame.commands.iter().map(|c| format!("{c:?}")).collect(),
        tiles,
    };
    drop(engine);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
