use std::rc::Rc;

use foundation::bounds::{Aabb2, GeoBounds};
use foundation::math::geo_bounds_to_mercator;
use scene::{
    CrossOrigin, DetachQueue, ENGINE_MAX_ZOOM, ENGINE_MIN_ZOOM, LayerId, LayerObject, LayerProps,
    RenderHook, RenderPhase, Source, TileErrorListener, TileLoadFn, TileSource, TileSourceOptions,
};
use tracing::debug;

use crate::content::Content;
use crate::context::{MapRef, SceneContext};
use crate::error::LayerError;
use crate::hooks::{HookBinding, TileErrorBinding};
use crate::reconciler::{Reconcile, UpdateReport, apply_props, detach_layer, log_config_error};

/// Declarative description of one raster XYZ layer.
#[derive(Clone)]
pub struct TileLayerDescriptor {
    pub url: String,
    pub projection: String,
    pub tile_load: Option<TileLoadFn>,
    /// Bumped by the caller to force a fresh source for the same url.
    pub revision: u64,
    pub cross_origin: Option<CrossOrigin>,
    /// Position among the siblings of the nearest group.
    pub slot: usize,
    pub opacity: f64,
    pub extent: Option<Aabb2>,
    pub preload: u32,
    pub visible: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pre_render: Option<RenderHook>,
    pub post_render: Option<RenderHook>,
    pub on_tile_error: Option<Rc<TileErrorListener>>,
}

impl TileLayerDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            projection: "EPSG:3857".to_string(),
            tile_load: None,
            revision: 0,
            cross_origin: None,
            slot: 0,
            opacity: 1.0,
            extent: None,
            preload: 0,
            visible: true,
            min_zoom: ENGINE_MIN_ZOOM,
            max_zoom: ENGINE_MAX_ZOOM,
            pre_render: None,
            post_render: None,
            on_tile_error: None,
        }
    }

    /// Layer for a content record's tile pyramid, limited to the coarsest
    /// level's footprint. `None` when the record has no tiles.
    pub fn from_content(content: &Content) -> Option<Self> {
        let pyramid = content.pyramid()?;
        let mut descriptor = Self::new(pyramid.url_template.clone());
        descriptor.projection = pyramid.projection.clone();
        descriptor.extent = pyramid
            .coarsest()
            .map(|level| geo_bounds_to_mercator(&GeoBounds::from(level.boundary)));
        Some(descriptor)
    }

    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    pub(crate) fn props(&self, ctx: &SceneContext) -> Result<LayerProps, LayerError> {
        Ok(LayerProps {
            opacity: self.opacity,
            extent: self.extent,
            z_index: ctx.z_index_for(self.slot)?,
            preload: self.preload,
            visible: self.visible,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
        })
    }

    fn build_source(&self) -> Result<TileSource, LayerError> {
        let options = TileSourceOptions {
            url: self.url.clone(),
            projection: self.projection.clone(),
            tile_load: self.tile_load.clone(),
            revision: self.revision,
            cross_origin: self.cross_origin,
        };
        Ok(TileSource::new(options)?)
    }
}

impl std::fmt::Debug for TileLayerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLayerDescriptor")
            .field("url", &self.url)
            .field("projection", &self.projection)
            .field("revision", &self.revision)
            .field("slot", &self.slot)
            .field("opacity", &self.opacity)
            .field("extent", &self.extent)
            .field("visible", &self.visible)
            .finish_non_exhaustive()
    }
}

/// The fields whose change requires a new source.
#[derive(Clone)]
struct SourceKey {
    url: String,
    projection: String,
    tile_load: Option<TileLoadFn>,
    revision: u64,
    cross_origin: Option<CrossOrigin>,
}

impl SourceKey {
    fn of(d: &TileLayerDescriptor) -> Self {
        Self {
            url: d.url.clone(),
            projection: d.projection.clone(),
            tile_load: d.tile_load.clone(),
            revision: d.revision,
            cross_origin: d.cross_origin,
        }
    }

    fn matches(&self, d: &TileLayerDescriptor) -> bool {
        let same_loader = match (&self.tile_load, &d.tile_load) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        same_loader
            && self.url == d.url
            && self.projection == d.projection
            && self.revision == d.revision
            && self.cross_origin == d.cross_origin
    }
}

/// A raster layer kept in sync with its descriptor.
pub struct TileLayer {
    map: MapRef,
    id: LayerId,
    detach: DetachQueue,
    source_key: SourceKey,
    pre_render: HookBinding,
    post_render: HookBinding,
    tile_error: TileErrorBinding,
}

impl TileLayer {
    pub fn id(&self) -> LayerId {
        self.id
    }
}

impl Reconcile for TileLayer {
    type Descriptor = TileLayerDescriptor;

    fn mount(ctx: &SceneContext, d: &TileLayerDescriptor) -> Result<Self, LayerError> {
        let props = d.props(ctx).map_err(|e| log_config_error("tile", e))?;
        let mut source = d.build_source().map_err(|e| log_config_error("tile", e))?;

        let mut tile_error = TileErrorBinding::default();
        tile_error.resubscribe(&mut source, d.on_tile_error.as_ref());
        let mut object = LayerObject::new(props, Source::Tile(source));
        let mut pre_render = HookBinding::new(RenderPhase::PreRender);
        let mut post_render = HookBinding::new(RenderPhase::PostRender);
        pre_render.sync(&mut object, d.pre_render.as_ref());
        post_render.sync(&mut object, d.post_render.as_ref());

        let (id, detach) = ctx.map().with_mut(|m| (m.add_layer(object), m.detach_queue()))?;
        debug!(layer = %id, url = %d.url, z_index = props.z_index, "tile layer mounted");
        Ok(Self {
            map: ctx.map().clone(),
            id,
            detach,
            source_key: SourceKey::of(d),
            pre_render,
            post_render,
            tile_error,
        })
    }

    fn update(
        &mut self,
        ctx: &SceneContext,
        d: &TileLayerDescriptor,
    ) -> Result<UpdateReport, LayerError> {
        let props = d.props(ctx).map_err(|e| log_config_error("tile", e))?;
        let replacement = if self.source_key.matches(d) {
            None
        } else {
            Some(d.build_source().map_err(|e| log_config_error("tile", e))?)
        };

        let id = self.id;
        let tile_error = &mut self.tile_error;
        let pre_render = &mut self.pre_render;
        let post_render = &mut self.post_render;
        let report = ctx.map().with_mut(|m| -> Result<UpdateReport, LayerError> {
            let layer = m.layer_mut(id)?;
            let mut report = UpdateReport {
                props_changed: apply_props(layer, props),
                ..UpdateReport::default()
            };
            match replacement {
                Some(mut source) => {
                    tile_error.resubscribe(&mut source, d.on_tile_error.as_ref());
                    layer.set_source(Source::Tile(source));
                    report.source_replaced = true;
                }
                None => {
                    if let Some(source) = layer.source_mut().as_tile_mut()
                        && tile_error.sync(source, d.on_tile_error.as_ref())
                    {
                        report.hooks_rebound += 1;
                    }
                }
            }
            if pre_render.sync(layer, d.pre_render.as_ref()) {
                report.hooks_rebound += 1;
            }
            if post_render.sync(layer, d.post_render.as_ref()) {
                report.hooks_rebound += 1;
            }
            if !report.is_noop() {
                m.changed(id)?;
            }
            Ok(report)
        })??;

        if report.source_replaced {
            self.source_key = SourceKey::of(d);
        }
        if !report.is_noop() {
            debug!(layer = %id, ?report, "tile layer updated");
        }
        Ok(report)
    }

    fn map(&self) -> &MapRef {
        &self.map
    }

    fn layer_ids(&self) -> Vec<LayerId> {
        vec![self.id]
    }
}

impl Drop for TileLayer {
    fn drop(&mut self) {
        detach_layer(&self.map, &self.detach, self.id, "tile");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use scene::{
        RenderContext, RenderHook, RenderPhase, SceneError, TileCoord, TileDelivery,
        TileErrorEvent, TileErrorListener, TileLoadFn, TileRequest, TileResponse,
    };

    use super::{TileLayer, TileLayerDescriptor};
    use crate::content::fixtures;
    use crate::context::SceneContext;
    use crate::error::LayerError;
    use crate::group::{LayerGroup, ZBand};
    use crate::reconciler::{LayerSlot, LifecycleState, Reconcile, SlotOutcome};
    use crate::testing;

    const URL: &str = "https://tiles.example/a/{z}/{x}/{y}.png";

    fn source_id_of(map: &crate::context::MapHandle, layer: &TileLayer) -> scene::SourceId {
        map.borrow().layer(layer.id()).unwrap().source().id()
    }

    #[test]
    fn mount_places_the_layer_at_its_slot() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let layer = TileLayer::mount(&ctx, &TileLayerDescriptor::new(URL).with_slot(2)).unwrap();

        let engine = map.borrow();
        assert_eq!(engine.layer_count(), 1);
        let props = engine.layer(layer.id()).unwrap().props();
        assert_eq!(props.z_index, ZBand::ROOT.slot(2).unwrap().base());
        assert_eq!(props.opacity, 1.0);
    }

    #[test]
    fn in_place_changes_keep_the_source() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let mut d = TileLayerDescriptor::new(URL);
        let mut layer = TileLayer::mount(&ctx, &d).unwrap();
        let original = source_id_of(&map, &layer);

        d.opacity = 0.4;
        d.slot = 7;
        d.visible = false;
        let report = layer.update(&ctx, &d).unwrap();
        assert!(report.props_changed);
        assert!(!report.source_replaced);
        assert_eq!(source_id_of(&map, &layer), original);

        let engine = map.borrow();
        let props = engine.layer(layer.id()).unwrap().props();
        assert_eq!(props.opacity, 0.4);
        assert_eq!(props.z_index, ZBand::ROOT.slot(7).unwrap().base());
        assert!(!props.visible);
    }

    #[test]
    fn source_defining_changes_swap_the_source_but_keep_the_layer() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let mut d = TileLayerDescriptor::new(URL);
        let mut layer = TileLayer::mount(&ctx, &d).unwrap();
        let id = layer.id();
        let first = source_id_of(&map, &layer);

        d.url = "https://tiles.example/b/{z}/{x}/{y}.png".to_string();
        let report = layer.update(&ctx, &d).unwrap();
        assert!(report.source_replaced);
        assert!(!report.props_changed);
        let second = source_id_of(&map, &layer);
        assert_ne!(first, second);
        assert_eq!(layer.id(), id);
        assert_eq!(map.borrow().layer_count(), 1);

        d.revision += 1;
        assert!(layer.update(&ctx, &d).unwrap().source_replaced);
        assert_ne!(source_id_of(&map, &layer), second);
    }

    #[test]
    fn tile_load_is_compared_by_identity() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let loader: TileLoadFn = Rc::new(|req: &mut TileRequest| req.headers.clear());
        let mut d = TileLayerDescriptor::new(URL);
        d.tile_load = Some(Rc::clone(&loader));
        let mut layer = TileLayer::mount(&ctx, &d).unwrap();

        let mut same = d.clone();
        same.tile_load = Some(Rc::clone(&loader));
        assert!(layer.update(&ctx, &same).unwrap().is_noop());

        let mut fresh = d.clone();
        fresh.tile_load = Some(Rc::new(|req: &mut TileRequest| req.headers.clear()));
        assert!(layer.update(&ctx, &fresh).unwrap().source_replaced);
    }

    #[test]
    fn identical_descriptor_is_a_noop() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let d = TileLayerDescriptor::new(URL);
        let mut layer = TileLayer::mount(&ctx, &d).unwrap();
        let before = map.borrow().repaint_requests();
        assert!(layer.update(&ctx, &d).unwrap().is_noop());
        assert_eq!(map.borrow().repaint_requests(), before);
    }

    #[test]
    fn replacing_render_hooks_never_accumulates_listeners() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let mut d = TileLayerDescriptor::new(URL);
        let mut layer = TileLayer::mount(&ctx, &d).unwrap();

        for _ in 0..10 {
            let pre: RenderHook = Rc::new(|ctx: &mut RenderContext| ctx.save());
            let post: RenderHook = Rc::new(|ctx: &mut RenderContext| ctx.restore());
            d.pre_render = Some(pre);
            d.post_render = Some(post);
            assert_eq!(layer.update(&ctx, &d).unwrap().hooks_rebound, 2);
        }
        let engine = map.borrow();
        let object = engine.layer(layer.id()).unwrap();
        assert_eq!(object.render_listener_count(RenderPhase::PreRender), 1);
        assert_eq!(object.render_listener_count(RenderPhase::PostRender), 1);
    }

    #[test]
    fn tile_errors_follow_the_current_source_only() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let listener: Rc<TileErrorListener> =
            Rc::new(move |e: &TileErrorEvent| sink.borrow_mut().push(e.message.clone()));

        let mut d = TileLayerDescriptor::new(URL);
        d.on_tile_error = Some(listener);
        let mut layer = TileLayer::mount(&ctx, &d).unwrap();
        let coord = TileCoord::new(3, 1, 1);
        let stale = map.borrow().request_tile(layer.id(), coord).unwrap();

        d.url = "https://tiles.example/b/{z}/{x}/{y}.png".to_string();
        layer.update(&ctx, &d).unwrap();
        let current = map.borrow().request_tile(layer.id(), coord).unwrap();

        let mut engine = map.borrow_mut();
        assert_eq!(
            engine.deliver_tile(TileResponse::failed(&stale, "old")).unwrap(),
            TileDelivery::Stale
        );
        assert_eq!(
            engine.deliver_tile(TileResponse::failed(&current, "404")).unwrap(),
            TileDelivery::Failed
        );
        let object = engine.layer(layer.id()).unwrap();
        assert_eq!(object.source().as_tile().unwrap().tile_error_listener_count(), 1);
        drop(engine);
        assert_eq!(*seen.borrow(), vec!["404".to_string()]);
    }

    #[test]
    fn mount_unmount_cycles_leave_nothing_behind() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let mut slot: LayerSlot<TileLayer> = LayerSlot::new();
        let d = TileLayerDescriptor::new(URL);
        for _ in 0..5 {
            assert_eq!(slot.sync(&ctx, Some(&d)).unwrap(), SlotOutcome::Mounted);
            assert_eq!(map.borrow().layer_count(), 1);
            assert_eq!(slot.sync(&ctx, None).unwrap(), SlotOutcome::Unmounted);
            assert_eq!(map.borrow().layer_count(), 0);
        }
        assert_eq!(slot.state(), LifecycleState::Unmounted);
    }

    #[test]
    fn absent_content_mounts_once_it_arrives() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let mut slot: LayerSlot<TileLayer> = LayerSlot::new();

        let empty = crate::content::Content::from_json_str(r#"{"id": "pending"}"#).unwrap();
        let d = TileLayerDescriptor::from_content(&empty);
        assert_eq!(slot.sync(&ctx, d.as_ref()).unwrap(), SlotOutcome::Idle);
        assert_eq!(map.borrow().layer_count(), 0);

        let d = TileLayerDescriptor::from_content(&fixtures::ortho());
        assert_eq!(slot.sync(&ctx, d.as_ref()).unwrap(), SlotOutcome::Mounted);
        assert_eq!(map.borrow().layer_count(), 1);
        let extent = map
            .borrow()
            .layer(slot.get().unwrap().id())
            .unwrap()
            .props()
            .extent
            .unwrap();
        assert!(extent.width() > 0.0 && extent.height() > 0.0);
    }

    #[test]
    fn group_order_decides_paint_order_regardless_of_mount_order() {
        let map = testing::map();
        let scope = testing::scope(&map);
        let lower = scope.with_group(LayerGroup::nested(&scope, "lower", 0).unwrap());
        let upper = scope.with_group(LayerGroup::nested(&scope, "upper", 1).unwrap());

        let lower_ctx = SceneContext::from_scope(&lower).unwrap();
        let upper_ctx = SceneContext::from_scope(&upper).unwrap();
        // Upper mounts first and uses a high slot inside its own band.
        let top = TileLayer::mount(&upper_ctx, &TileLayerDescriptor::new(URL)).unwrap();
        let bottom =
            TileLayer::mount(&lower_ctx, &TileLayerDescriptor::new(URL).with_slot(255)).unwrap();

        assert_eq!(map.borrow().paint_order(), vec![bottom.id(), top.id()]);
    }

    #[test]
    fn configuration_errors_are_reported_and_nothing_is_mounted() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let mut d = TileLayerDescriptor::new(URL);
        d.projection = "EPSG:99999".to_string();
        let err = TileLayer::mount(&ctx, &d).err().unwrap();
        assert_eq!(
            err,
            LayerError::Config(SceneError::InvalidProjection {
                code: "EPSG:99999".to_string()
            })
        );
        assert!(matches!(
            TileLayer::mount(&ctx, &TileLayerDescriptor::new("/tiles/{z}/{x}.png")),
            Err(LayerError::Config(SceneError::MalformedTemplate { .. }))
        ));
        assert_eq!(map.borrow().layer_count(), 0);
    }

    #[test]
    fn failed_update_leaves_the_old_source_in_place() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let mut d = TileLayerDescriptor::new(URL);
        let mut layer = TileLayer::mount(&ctx, &d).unwrap();
        let before = source_id_of(&map, &layer);
        d.url = "/broken/{z}/{x}/{y".to_string();
        assert!(layer.update(&ctx, &d).unwrap_err().is_configuration());
        assert_eq!(source_id_of(&map, &layer), before);
    }

    #[test]
    fn dropping_after_the_map_is_gone_is_quiet() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let layer = TileLayer::mount(&ctx, &TileLayerDescriptor::new(URL)).unwrap();
        drop(map);
        drop(layer);
    }

    #[test]
    fn dropping_while_the_map_is_borrowed_defers_the_removal() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let layer = TileLayer::mount(&ctx, &TileLayerDescriptor::new(URL)).unwrap();
        {
            let engine = map.borrow();
            drop(layer);
            assert_eq!(engine.layer_count(), 1);
            assert_eq!(engine.detach_queue().len(), 1);
        }
        let frame = map.borrow_mut().render_frame(foundation::time::Millis(16));
        assert!(frame.painted.is_empty());
        assert_eq!(map.borrow().layer_count(), 0);
    }

    #[test]
    fn hooks_run_around_the_layer_draw() {
        let map = testing::map();
        let ctx = testing::ctx(&map);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let mut d = TileLayerDescriptor::new(URL);
        d.pre_render = Some(Rc::new(move |_: &mut RenderContext| c.set(c.get() + 1)));
        let _layer = TileLayer::mount(&ctx, &d).unwrap();
        map.borrow_mut().render_frame(foundation::time::Millis(16));
        assert_eq!(calls.get(), 1);
    }
}
