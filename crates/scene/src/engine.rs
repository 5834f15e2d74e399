use std::cell::RefCell;
use std::rc::Rc;

use foundation::arena::Arena;
use foundation::bounds::Aabb2;
use foundation::time::Millis;
use runtime::event_bus::{ListenerKey, Listeners};
use runtime::frame::Frame;
use tracing::{debug, trace};

use crate::error::SceneError;
use crate::layer::{LayerId, LayerObject, RenderPhase};
use crate::render::{DrawCommand, FrameReport, RenderContext};
use crate::source::{Source, SourceId, TileErrorEvent, TileRequest};
use crate::target::DomTarget;
use crate::tiles::{TileCoord, tile_range};
use crate::viewport::Viewport;

/// Where a view change came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ViewChangeOrigin {
    /// Set programmatically, usually from props.
    Program,
    /// Direct user interaction with the map.
    Gesture,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ViewEvent {
    Center { center: [f64; 2], origin: ViewChangeOrigin },
    Zoom { zoom: f64, origin: ViewChangeOrigin },
    Rotation { rotation: f64, origin: ViewChangeOrigin },
}

pub type ViewListener = dyn Fn(&ViewEvent);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    Loaded,
    Failed(String),
}

/// The embedder's answer to a [`TileRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub layer: LayerId,
    pub source: SourceId,
    pub coord: TileCoord,
    pub outcome: TileOutcome,
}

impl TileResponse {
    pub fn loaded(request: &TileRequest) -> Self {
        Self {
            layer: request.layer,
            source: request.source,
            coord: request.coord,
            outcome: TileOutcome::Loaded,
        }
    }

    pub fn failed(request: &TileRequest, message: impl Into<String>) -> Self {
        Self {
            layer: request.layer,
            source: request.source,
            coord: request.coord,
            outcome: TileOutcome::Failed(message.into()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileDelivery {
    Accepted,
    Failed,
    /// The response belongs to a source that has since been replaced, or to a
    /// layer that is gone. It is dropped without painting.
    Stale,
}

#[derive(Debug)]
struct LayerEntry {
    seq: u64,
    object: LayerObject,
}

/// Layer removals requested while the engine was borrowed.
///
/// Clones share one queue. The engine applies it on the next `add_layer`,
/// `render_frame` or [`flush_view_events`].
#[derive(Debug, Clone, Default)]
pub struct DetachQueue(Rc<RefCell<Vec<LayerId>>>);

impl DetachQueue {
    pub fn push(&self, id: LayerId) {
        self.0.borrow_mut().push(id);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    fn take(&self) -> Vec<LayerId> {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

/// One map instance, bound to one target.
///
/// The layer table is a generational arena; paint order is
/// `(z_index, insertion sequence)`. View changes are queued and delivered by
/// [`flush_view_events`] once the engine is no longer borrowed.
pub struct MapEngine {
    target: String,
    view: Viewport,
    layers: Arena<LayerEntry>,
    next_seq: u64,
    repaint_requests: u64,
    last_frame: Option<Frame>,
    view_listeners: Listeners<ViewListener>,
    pending_view_events: Vec<ViewEvent>,
    detached: DetachQueue,
}

impl MapEngine {
    pub fn new(target: &DomTarget, mut view: Viewport) -> Result<Self, SceneError> {
        if !target.is_attached() {
            return Err(SceneError::TargetMissing {
                target: target.id().to_string(),
            });
        }
        view.set_size(target.size());
        debug!(target = target.id(), "map engine created");
        Ok(Self {
            target: target.id().to_string(),
            view,
            layers: Arena::new(),
            next_seq: 0,
            repaint_requests: 0,
            last_frame: None,
            view_listeners: Listeners::new(),
            pending_view_events: Vec::new(),
            detached: DetachQueue::default(),
        })
    }

    pub fn target_id(&self) -> &str {
        &self.target
    }

    pub fn view(&self) -> &Viewport {
        &self.view
    }

    // -- View --

    pub fn set_center(&mut self, center: [f64; 2]) -> bool {
        self.apply_center(center, ViewChangeOrigin::Program)
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        self.apply_zoom(zoom, ViewChangeOrigin::Program)
    }

    pub fn set_rotation(&mut self, rotation: f64) -> bool {
        self.apply_rotation(rotation, ViewChangeOrigin::Program)
    }

    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) -> bool {
        let changed = self.view.set_zoom_limits(min_zoom, max_zoom);
        if changed {
            self.queue_view_event(ViewEvent::Zoom {
                zoom: self.view.zoom(),
                origin: ViewChangeOrigin::Program,
            });
        }
        changed
    }

    pub fn set_view_extent(&mut self, extent: Option<Aabb2>) -> bool {
        let changed = self.view.set_extent(extent);
        if changed {
            self.queue_view_event(ViewEvent::Center {
                center: self.view.center(),
                origin: ViewChangeOrigin::Program,
            });
        }
        changed
    }

    pub fn interact_pan(&mut self, center: [f64; 2]) -> bool {
        self.apply_center(center, ViewChangeOrigin::Gesture)
    }

    pub fn interact_zoom(&mut self, zoom: f64) -> bool {
        self.apply_zoom(zoom, ViewChangeOrigin::Gesture)
    }

    pub fn interact_rotate(&mut self, rotation: f64) -> bool {
        self.apply_rotation(rotation, ViewChangeOrigin::Gesture)
    }

    pub fn on_view_change(&mut self, listener: Rc<ViewListener>) -> ListenerKey {
        self.view_listeners.on(listener)
    }

    pub fn un_view_change(&mut self, key: ListenerKey) -> bool {
        self.view_listeners.un(key)
    }

    pub fn view_listener_count(&self) -> usize {
        self.view_listeners.len()
    }

    fn apply_center(&mut self, center: [f64; 2], origin: ViewChangeOrigin) -> bool {
        let changed = self.view.set_center(center);
        if changed {
            self.queue_view_event(ViewEvent::Center {
                center: self.view.center(),
                origin,
            });
        }
        changed
    }

    fn apply_zoom(&mut self, zoom: f64, origin: ViewChangeOrigin) -> bool {
        let changed = self.view.set_zoom(zoom);
        if changed {
            self.queue_view_event(ViewEvent::Zoom {
                zoom: self.view.zoom(),
                origin,
            });
        }
        changed
    }

    fn apply_rotation(&mut self, rotation: f64, origin: ViewChangeOrigin) -> bool {
        let changed = self.view.set_rotation(rotation);
        if changed {
            self.queue_view_event(ViewEvent::Rotation { rotation, origin });
        }
        changed
    }

    fn queue_view_event(&mut self, event: ViewEvent) {
        trace!(?event, "view change queued");
        self.pending_view_events.push(event);
        self.repaint_requests += 1;
    }

    // -- Layers --

    pub fn add_layer(&mut self, object: LayerObject) -> LayerId {
        self.apply_detached();
        let seq = self.next_seq;
        self.next_seq += 1;
        let z_index = object.props().z_index;
        let id = LayerId(self.layers.insert(LayerEntry { seq, object }));
        self.repaint_requests += 1;
        debug!(layer = %id, z_index, "layer added");
        id
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<LayerObject, SceneError> {
        let entry = self
            .layers
            .remove(id.0)
            .ok_or(SceneError::UnknownLayer(id))?;
        self.repaint_requests += 1;
        debug!(layer = %id, "layer removed");
        Ok(entry.object)
    }

    /// Handle for requesting a removal when the engine cannot be borrowed.
    pub fn detach_queue(&self) -> DetachQueue {
        self.detached.clone()
    }

    /// Removes every queued layer. Ids already gone are skipped.
    pub fn apply_detached(&mut self) -> usize {
        let mut removed = 0;
        for id in self.detached.take() {
            if self.layers.remove(id.0).is_some() {
                removed += 1;
                debug!(layer = %id, "queued layer removal applied");
            }
        }
        if removed > 0 {
            self.repaint_requests += 1;
        }
        removed
    }

    pub fn contains_layer(&self, id: LayerId) -> bool {
        self.layers.contains(id.0)
    }

    pub fn layer(&self, id: LayerId) -> Result<&LayerObject, SceneError> {
        self.layers
            .get(id.0)
            .map(|e| &e.object)
            .ok_or(SceneError::UnknownLayer(id))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut LayerObject, SceneError> {
        self.layers
            .get_mut(id.0)
            .map(|e| &mut e.object)
            .ok_or(SceneError::UnknownLayer(id))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layers in insertion order.
    pub fn layers(&self) -> Vec<LayerId> {
        let mut ids: Vec<(u64, LayerId)> = self
            .layers
            .iter()
            .map(|(h, e)| (e.seq, LayerId(h)))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Layers bottom to top.
    pub fn paint_order(&self) -> Vec<LayerId> {
        let mut ids: Vec<(i64, u64, LayerId)> = self
            .layers
            .iter()
            .map(|(h, e)| (e.object.props().z_index, e.seq, LayerId(h)))
            .collect();
        ids.sort();
        ids.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Repaint notification after an in-place mutation.
    pub fn changed(&mut self, id: LayerId) -> Result<(), SceneError> {
        if !self.layers.contains(id.0) {
            return Err(SceneError::UnknownLayer(id));
        }
        self.repaint_requests += 1;
        Ok(())
    }

    pub fn repaint_requests(&self) -> u64 {
        self.repaint_requests
    }

    // -- Rendering --

    /// Paints every layer that renders at the current zoom, bottom first,
    /// running its pre-render hooks before and post-render hooks after.
    pub fn render_frame(&mut self, time: Millis) -> FrameReport {
        self.apply_detached();
        let frame = match self.last_frame {
            Some(prev) => prev.next(time),
            None => Frame::new(0, time),
        };
        self.last_frame = Some(frame);

        let zoom = self.view.zoom();
        let mut ctx = RenderContext::new(frame, self.view.size());
        let mut painted = Vec::new();
        for id in self.paint_order() {
            let Some(entry) = self.layers.get(id.0) else {
                continue;
            };
            let layer = &entry.object;
            if !layer.props().renders_at(zoom) {
                continue;
            }
            ctx.set_layer(Some(id));
            for hook in layer.hooks(RenderPhase::PreRender).iter() {
                hook(&mut ctx);
            }
            ctx.push(DrawCommand::DrawLayer {
                layer: id,
                z_index: layer.props().z_index,
                opacity: layer.props().opacity,
                tiles: layer.loaded_tiles().len(),
            });
            for hook in layer.hooks(RenderPhase::PostRender).iter() {
                hook(&mut ctx);
            }
            painted.push(id);
        }
        ctx.set_layer(None);
        trace!(frame = frame.index, painted = painted.len(), "frame rendered");

        FrameReport {
            frame,
            painted,
            commands: ctx.into_commands(),
        }
    }

    // -- Tiles --

    /// Builds the request for one tile, tagged with the layer's current source.
    pub fn request_tile(&self, id: LayerId, coord: TileCoord) -> Result<TileRequest, SceneError> {
        let source = self.tile_source(id)?;
        if !coord.is_valid() {
            return Err(SceneError::InvalidTile(coord));
        }
        Ok(source.build_request(id, coord))
    }

    /// Tiles covering the visible extent (clipped to the layer extent) at the
    /// nearest integer zoom.
    pub fn visible_tiles(&self, id: LayerId) -> Result<Vec<TileCoord>, SceneError> {
        let layer = self.layer(id)?;
        self.tile_source(id)?;
        let mut extent = self.view.visible_extent();
        if let Some(layer_extent) = layer.props().extent {
            if !layer_extent.intersects(&extent) {
                return Ok(Vec::new());
            }
            extent = Aabb2::new(
                [
                    extent.min[0].max(layer_extent.min[0]),
                    extent.min[1].max(layer_extent.min[1]),
                ],
                [
                    extent.max[0].min(layer_extent.max[0]),
                    extent.max[1].min(layer_extent.max[1]),
                ],
            );
        }
        let z = self.view.zoom().round().clamp(0.0, 31.0) as u8;
        Ok(tile_range(&extent, z))
    }

    /// Routes a response back to its layer.
    ///
    /// Responses tagged with a superseded source are [`TileDelivery::Stale`]:
    /// they are never painted and never reach the new source's error hooks.
    pub fn deliver_tile(&mut self, response: TileResponse) -> Result<TileDelivery, SceneError> {
        let Some(entry) = self.layers.get_mut(response.layer.0) else {
            debug!(layer = %response.layer, "tile response for removed layer dropped");
            return Ok(TileDelivery::Stale);
        };
        let layer = &mut entry.object;
        if layer.source().id() != response.source {
            debug!(
                layer = %response.layer,
                stale = %response.source,
                current = %layer.source().id(),
                "stale tile response dropped"
            );
            return Ok(TileDelivery::Stale);
        }
        match response.outcome {
            TileOutcome::Loaded => {
                layer.mark_tile_loaded(response.coord);
                self.repaint_requests += 1;
                Ok(TileDelivery::Accepted)
            }
            TileOutcome::Failed(message) => {
                let source = layer.source().as_tile().ok_or(SceneError::SourceKindMismatch {
                    layer: response.layer,
                    expected: "tile",
                })?;
                source.emit_tile_error(&TileErrorEvent {
                    layer: response.layer,
                    source: response.source,
                    coord: response.coord,
                    message,
                });
                Ok(TileDelivery::Failed)
            }
        }
    }

    fn tile_source(&self, id: LayerId) -> Result<&crate::source::TileSource, SceneError> {
        match self.layer(id)?.source() {
            Source::Tile(s) => Ok(s),
            Source::Vector(_) => Err(SceneError::SourceKindMismatch {
                layer: id,
                expected: "tile",
            }),
        }
    }

    fn take_view_events(&mut self) -> (Vec<ViewEvent>, Vec<Rc<ViewListener>>) {
        (
            std::mem::take(&mut self.pending_view_events),
            self.view_listeners.snapshot(),
        )
    }
}

impl std::fmt::Debug for MapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapEngine")
            .field("target", &self.target)
            .field("view", &self.view)
            .field("layers", &self.layers.len())
            .field("repaint_requests", &self.repaint_requests)
            .finish()
    }
}

/// Delivers queued view events to view listeners with the engine unborrowed,
/// so listeners are free to read the map. Queued layer removals are applied
/// first. Returns the number of events.
pub fn flush_view_events(map: &RefCell<MapEngine>) -> usize {
    let (events, listeners) = {
        let mut engine = map.borrow_mut();
        engine.apply_detached();
        engine.take_view_events()
    };
    for event in &events {
        for listener in &listeners {
            listener(event);
        }
    }
    events.len()
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use foundation::time::Millis;
    use pretty_assertions::assert_eq;

    use super::{
        MapEngine, TileDelivery, TileResponse, ViewChangeOrigin, ViewEvent, flush_view_events,
    };
    use crate::error::SceneError;
    use crate::layer::{LayerObject, LayerProps, RenderPhase};
    use crate::render::{DrawCommand, RenderContext};
    use crate::source::{
        Feature, Geometry, Source, TileErrorEvent, TileSource, TileSourceOptions, VectorSource,
    };
    use crate::target::DomTarget;
    use crate::tiles::TileCoord;
    use crate::viewport::Viewport;

    fn engine() -> MapEngine {
        MapEngine::new(&DomTarget::new("map", [500, 500]), Viewport::new([0.0, 0.0], 2.0)).unwrap()
    }

    fn tile_layer(z_index: i64) -> LayerObject {
        let source = TileSource::new(TileSourceOptions::new("/t/{z}/{x}/{y}.png")).unwrap();
        LayerObject::new(
            LayerProps {
                z_index,
                ..LayerProps::default()
            },
            Source::Tile(source),
        )
    }

    #[test]
    fn detached_target_is_rejected() {
        let err = MapEngine::new(&DomTarget::detached("map"), Viewport::new([0.0, 0.0], 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::TargetMissing {
                target: "map".to_string()
            }
        );
    }

    #[test]
    fn paint_order_sorts_by_z_then_insertion() {
        let mut map = engine();
        let top = map.add_layer(tile_layer(10));
        let bottom = map.add_layer(tile_layer(-5));
        let mid_a = map.add_layer(tile_layer(3));
        let mid_b = map.add_layer(tile_layer(3));
        assert_eq!(map.paint_order(), vec![bottom, mid_a, mid_b, top]);
        assert_eq!(map.layers(), vec![top, bottom, mid_a, mid_b]);
    }

    #[test]
    fn add_then_remove_restores_layer_list() {
        let mut map = engine();
        let keep = map.add_layer(tile_layer(0));
        let before = map.layers();
        let temp = map.add_layer(tile_layer(1));
        map.remove_layer(temp).unwrap();
        assert_eq!(map.layers(), before);
        assert!(map.contains_layer(keep));
        assert_eq!(map.remove_layer(temp).unwrap_err(), SceneError::UnknownLayer(temp));
    }

    #[test]
    fn render_frame_runs_hooks_around_each_layer() {
        let mut map = engine();
        let a = map.add_layer(tile_layer(1));
        let b = map.add_layer(tile_layer(0));
        map.layer_mut(a)
            .unwrap()
            .on_render(RenderPhase::PreRender, Rc::new(|ctx: &mut RenderContext| ctx.save()));
        map.layer_mut(a)
            .unwrap()
            .on_render(RenderPhase::PostRender, Rc::new(|ctx: &mut RenderContext| ctx.restore()));

        let report = map.render_frame(Millis(16));
        assert_eq!(report.painted, vec![b, a]);
        assert_eq!(
            report.commands,
            vec![
                DrawCommand::DrawLayer {
                    layer: b,
                    z_index: 0,
                    opacity: 1.0,
                    tiles: 0
                },
                DrawCommand::Save,
                DrawCommand::DrawLayer {
                    layer: a,
                    z_index: 1,
                    opacity: 1.0,
                    tiles: 0
                },
                DrawCommand::Restore,
            ]
        );
        assert_eq!(report.frame.index, 0);
        assert_eq!(map.render_frame(Millis(32)).frame.index, 1);
    }

    #[test]
    fn hidden_and_out_of_range_layers_are_skipped() {
        let mut map = engine();
        let hidden = map.add_layer(tile_layer(0));
        map.layer_mut(hidden).unwrap().props_mut().visible = false;
        let zoomed = map.add_layer(tile_layer(1));
        map.layer_mut(zoomed).unwrap().props_mut().min_zoom = 10.0;
        let shown = map.add_layer(tile_layer(2));
        assert_eq!(map.render_frame(Millis(0)).painted, vec![shown]);
    }

    #[test]
    fn stale_tile_responses_are_dropped_after_source_swap() {
        let mut map = engine();
        let id = map.add_layer(tile_layer(0));
        let errors = Rc::new(Cell::new(0));
        let old_request = map.request_tile(id, TileCoord::new(2, 1, 1)).unwrap();

        let mut fresh = TileSource::new(TileSourceOptions::new("/v2/{z}/{x}/{y}.png")).unwrap();
        let e = Rc::clone(&errors);
        fresh.on_tile_error(Rc::new(move |_: &TileErrorEvent| e.set(e.get() + 1)));
        map.layer_mut(id).unwrap().set_source(Source::Tile(fresh));

        assert_eq!(
            map.deliver_tile(TileResponse::loaded(&old_request)).unwrap(),
            TileDelivery::Stale
        );
        assert_eq!(
            map.deliver_tile(TileResponse::failed(&old_request, "404")).unwrap(),
            TileDelivery::Stale
        );
        assert_eq!(errors.get(), 0);
        assert!(map.layer(id).unwrap().loaded_tiles().is_empty());

        let new_request = map.request_tile(id, TileCoord::new(2, 1, 1)).unwrap();
        assert_eq!(new_request.url, "/v2/2/1/1.png");
        assert_eq!(
            map.deliver_tile(TileResponse::loaded(&new_request)).unwrap(),
            TileDelivery::Accepted
        );
        assert_eq!(
            map.deliver_tile(TileResponse::failed(&new_request, "500")).unwrap(),
            TileDelivery::Failed
        );
        assert_eq!(errors.get(), 1);
        assert_eq!(map.layer(id).unwrap().loaded_tiles().len(), 1);
    }

    #[test]
    fn tile_operations_reject_vector_layers() {
        let mut map = engine();
        let source = VectorSource::new(
            &[Feature::new("p", Geometry::Point([0.0, 0.0]))],
            "EPSG:4326",
            0,
        )
        .unwrap();
        let id = map.add_layer(LayerObject::new(LayerProps::default(), Source::Vector(source)));
        assert!(matches!(
            map.request_tile(id, TileCoord::new(0, 0, 0)),
            Err(SceneError::SourceKindMismatch { .. })
        ));
    }

    #[test]
    fn queued_removals_apply_on_the_next_mutation() {
        let map = RefCell::new(engine());
        let (a, b) = {
            let mut m = map.borrow_mut();
            (m.add_layer(tile_layer(0)), m.add_layer(tile_layer(1)))
        };
        let queue = map.borrow().detach_queue();
        queue.push(a);
        queue.push(a);
        assert_eq!(queue.len(), 2);
        assert_eq!(map.borrow().layer_count(), 2);

        flush_view_events(&map);
        assert!(queue.is_empty());
        assert_eq!(map.borrow().layers(), vec![b]);

        queue.push(b);
        let frame = map.borrow_mut().render_frame(Millis(0));
        assert!(frame.painted.is_empty());
        assert_eq!(map.borrow().layer_count(), 0);
    }

    #[test]
    fn out_of_grid_tiles_are_rejected() {
        let mut map = engine();
        let source = TileSource::new(TileSourceOptions::new("/t/{z}/{x}/{-y}.png")).unwrap();
        let id = map.add_layer(LayerObject::new(LayerProps::default(), Source::Tile(source)));

        assert_eq!(
            map.request_tile(id, TileCoord::new(2, 0, 9)),
            Err(SceneError::InvalidTile(TileCoord::new(2, 0, 9)))
        );
        assert_eq!(
            map.request_tile(id, TileCoord::new(40, 0, 0)),
            Err(SceneError::InvalidTile(TileCoord::new(40, 0, 0)))
        );
        assert_eq!(map.request_tile(id, TileCoord::new(2, 0, 3)).unwrap().url, "/t/2/0/0.png");
    }

    #[test]
    fn visible_tiles_cover_the_view() {
        let mut map = engine();
        let id = map.add_layer(tile_layer(0));
        // 500px at zoom 2 spans just under half the world around the origin.
        let tiles = map.visible_tiles(id).unwrap();
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(2, 1, 1),
                TileCoord::new(2, 2, 1),
                TileCoord::new(2, 1, 2),
                TileCoord::new(2, 2, 2),
            ]
        );
    }

    #[test]
    fn view_events_are_flushed_with_the_engine_unborrowed() {
        let map = Rc::new(RefCell::new(engine()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (m, s) = (Rc::downgrade(&map), Rc::clone(&seen));
        map.borrow_mut().on_view_change(Rc::new(move |event: &ViewEvent| {
            let zoom = m.upgrade().map(|m| m.borrow().view().zoom());
            s.borrow_mut().push((*event, zoom));
        }));

        map.borrow_mut().interact_rotate(0.25);
        map.borrow_mut().set_zoom(3.0);
        map.borrow_mut().set_zoom(3.0);
        assert_eq!(flush_view_events(&map), 2);
        assert_eq!(
            *seen.borrow(),
            vec![
                (
                    ViewEvent::Rotation {
                        rotation: 0.25,
                        origin: ViewChangeOrigin::Gesture
                    },
                    Some(3.0)
                ),
                (
                    ViewEvent::Zoom {
                        zoom: 3.0,
                        origin: ViewChangeOrigin::Program
                    },
                    Some(3.0)
                ),
            ]
        );
        assert_eq!(flush_view_events(&map), 0);
    }
}
