use std::collections::BTreeSet;
use std::rc::Rc;

use foundation::bounds::Aabb2;
use foundation::handles::Handle;
use runtime::event_bus::{ListenerKey, Listeners};

use crate::render::RenderContext;
use crate::source::Source;
use crate::tiles::TileCoord;
use crate::viewport::{ENGINE_MAX_ZOOM, ENGINE_MIN_ZOOM};

/// Handle of a layer in the engine's layer table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) Handle);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Properties that can be written onto a live layer without touching its source.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerProps {
    pub opacity: f64,
    pub extent: Option<Aabb2>,
    pub z_index: i64,
    /// Number of lower zoom levels to prefetch.
    pub preload: u32,
    pub visible: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for LayerProps {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            extent: None,
            z_index: 0,
            preload: 0,
            visible: true,
            min_zoom: ENGINE_MIN_ZOOM,
            max_zoom: ENGINE_MAX_ZOOM,
        }
    }
}

impl LayerProps {
    pub fn renders_at(&self, zoom: f64) -> bool {
        self.visible && zoom >= self.min_zoom && zoom <= self.max_zoom
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    PreRender,
    PostRender,
}

pub type RenderListener = dyn Fn(&mut RenderContext);
/// Pre/post render callback. Compared by pointer identity.
pub type RenderHook = Rc<RenderListener>;

/// Engine-native layer: mutable properties plus a swappable source.
pub struct LayerObject {
    props: LayerProps,
    source: Source,
    pre_render: Listeners<RenderListener>,
    post_render: Listeners<RenderListener>,
    loaded_tiles: BTreeSet<TileCoord>,
}

impl LayerObject {
    pub fn new(props: LayerProps, source: Source) -> Self {
        Self {
            props,
            source,
            pre_render: Listeners::new(),
            post_render: Listeners::new(),
            loaded_tiles: BTreeSet::new(),
        }
    }

    pub fn props(&self) -> &LayerProps {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut LayerProps {
        &mut self.props
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut Source {
        &mut self.source
    }

    /// Swaps in a new source and returns the old one. Tiles loaded for the old
    /// source are forgotten.
    pub fn set_source(&mut self, source: Source) -> Source {
        self.loaded_tiles.clear();
        std::mem::replace(&mut self.source, source)
    }

    pub fn on_render(&mut self, phase: RenderPhase, hook: RenderHook) -> ListenerKey {
        self.hooks_mut(phase).on(hook)
    }

    pub fn un_render(&mut self, phase: RenderPhase, key: ListenerKey) -> bool {
        self.hooks_mut(phase).un(key)
    }

    pub fn render_listener_count(&self, phase: RenderPhase) -> usize {
        self.hooks(phase).len()
    }

    pub(crate) fn hooks(&self, phase: RenderPhase) -> &Listeners<RenderListener> {
        match phase {
            RenderPhase::PreRender => &self.pre_render,
            RenderPhase::PostRender => &self.post_render,
        }
    }

    fn hooks_mut(&mut self, phase: RenderPhase) -> &mut Listeners<RenderListener> {
        match phase {
            RenderPhase::PreRender => &mut self.pre_render,
            RenderPhase::PostRender => &mut self.post_render,
        }
    }

    pub fn loaded_tiles(&self) -> &BTreeSet<TileCoord> {
        &self.loaded_tiles
    }

    pub(crate) fn mark_tile_loaded(&mut self, coord: TileCoord) {
        self.loaded_tiles.insert(coord);
    }
}

impl std::fmt::Debug for LayerObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerObject")
            .field("props", &self.props)
            .field("source", &self.source)
            .field("pre_render", &self.pre_render.len())
            .field("post_render", &self.post_render.len())
            .field("loaded_tiles", &self.loaded_tiles.len())
            .finish()
    }
}
