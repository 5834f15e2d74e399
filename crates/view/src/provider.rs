use std::cell::RefCell;
use std::rc::Rc;

use foundation::bounds::{Aabb2, GeoBounds};
use foundation::math::{LonLat, geo_bounds_to_mercator, lonlat_to_mercator, mercator_to_lonlat};
use layers::content::TilePyramid;
use layers::{ContextError, MapHandle, MapRef, SceneScope};
use runtime::event_bus::ListenerKey;
use scene::{
    DomTarget, ENGINE_MAX_ZOOM, ENGINE_MIN_ZOOM, MapEngine, ViewEvent, ViewListener, Viewport,
    flush_view_events,
};
use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::error::ViewError;
use crate::map_util::{centroid, clamp_zoom, fit_zoom};

/// Declarative view state for one screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewProps {
    pub center: Option<LonLat>,
    pub zoom: Option<f64>,
    /// Radians, clockwise.
    pub rotation: f64,
    /// Geographic footprint used to center the view when no center is given.
    pub boundary: Option<GeoBounds>,
    /// Projected constraint on the view center.
    pub extent: Option<Aabb2>,
    pub pyramid: Option<TilePyramid>,
    /// Public view: zoom is capped at the configured ceiling.
    pub shared: bool,
}

/// Outward view notifications. Fired for prop-driven and gesture-driven
/// changes alike, after the engine is released.
#[derive(Clone, Default)]
pub struct ViewCallbacks {
    pub on_rotation: Option<Rc<dyn Fn(f64)>>,
    pub on_center: Option<Rc<dyn Fn(LonLat)>>,
    pub on_zoom: Option<Rc<dyn Fn(f64)>>,
}

/// Which viewport fields an update actually wrote.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ViewDiff {
    pub center: bool,
    pub zoom: bool,
    pub rotation: bool,
    pub extent: bool,
    pub zoom_limits: bool,
}

impl ViewDiff {
    pub fn is_empty(&self) -> bool {
        *self == ViewDiff::default()
    }
}

fn resolve_center(props: &ViewProps, config: &ViewerConfig) -> LonLat {
    props
        .center
        .or_else(|| props.boundary.as_ref().map(centroid))
        .unwrap_or_else(|| config.default_center())
}

fn resolve_zoom(props: &ViewProps, config: &ViewerConfig) -> f64 {
    let requested = props.zoom.unwrap_or(config.default_zoom);
    if props.pyramid.is_none() {
        return requested;
    }
    clamp_zoom(
        props.pyramid.as_ref(),
        requested,
        config.default_zoom,
        Some(config.shared_zoom_ceiling),
        props.shared,
    )
}

fn zoom_limits(props: &ViewProps, config: &ViewerConfig) -> (f64, f64) {
    let Some(pyramid) = &props.pyramid else {
        return (ENGINE_MIN_ZOOM, ENGINE_MAX_ZOOM);
    };
    match (pyramid.min_zoom(), pyramid.max_zoom()) {
        (Some(min), Some(max)) => {
            let (min, max) = (f64::from(min), f64::from(max));
            let max = if props.shared {
                max.min(config.shared_zoom_ceiling).max(min)
            } else {
                max
            };
            (min, max)
        }
        _ => (ENGINE_MIN_ZOOM, ENGINE_MAX_ZOOM),
    }
}

fn echo(callbacks: ViewCallbacks) -> Rc<ViewListener> {
    Rc::new(move |event: &ViewEvent| match *event {
        ViewEvent::Rotation { rotation, .. } => {
            if let Some(cb) = &callbacks.on_rotation {
                cb(rotation);
            }
        }
        ViewEvent::Center { center, .. } => {
            if let Some(cb) = &callbacks.on_center {
                cb(mercator_to_lonlat(center));
            }
        }
        ViewEvent::Zoom { zoom, .. } => {
            if let Some(cb) = &callbacks.on_zoom {
                cb(zoom);
            }
        }
    })
}

/// Owns the one map of a screen. Descendants only ever see a [`MapRef`].
pub struct ViewProvider {
    map: MapHandle,
    props: ViewProps,
    config: ViewerConfig,
    view_key: ListenerKey,
}

impl ViewProvider {
    /// Builds the engine on `target`. The target must already be attached.
    pub fn mount(
        target: &DomTarget,
        props: ViewProps,
        callbacks: ViewCallbacks,
        config: ViewerConfig,
    ) -> Result<Self, ViewError> {
        config.validate()?;
        let center = resolve_center(&props, &config);
        let zoom = resolve_zoom(&props, &config);
        let (min_zoom, max_zoom) = zoom_limits(&props, &config);

        let mut view = Viewport::new(lonlat_to_mercator(center), zoom);
        view.set_zoom_limits(min_zoom, max_zoom);
        view.set_extent(props.extent);
        view.set_rotation(props.rotation);

        let mut engine = MapEngine::new(target, view)?;
        let view_key = engine.on_view_change(echo(callbacks));
        info!(
            target = target.id(),
            lon = center.lon,
            lat = center.lat,
            zoom = engine.view().zoom(),
            "view provider mounted"
        );
        Ok(Self {
            map: Rc::new(RefCell::new(engine)),
            props,
            config,
            view_key,
        })
    }

    pub fn map(&self) -> &MapHandle {
        &self.map
    }

    pub fn map_ref(&self) -> MapRef {
        MapRef::from_handle(&self.map)
    }

    pub fn props(&self) -> &ViewProps {
        &self.props
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Child scope with this provider's map published.
    pub fn scope(&self, parent: &SceneScope) -> SceneScope {
        parent.with_map(self.map_ref())
    }

    /// Writes the fields that differ from the previous props. The engine is
    /// kept, along with every layer attached to it.
    pub fn update(&mut self, props: ViewProps) -> Result<ViewDiff, ViewError> {
        let mut diff = ViewDiff::default();
        {
            let mut engine = self.map.try_borrow_mut().map_err(|_| ContextError::MapBusy)?;
            if props.pyramid != self.props.pyramid || props.shared != self.props.shared {
                let (min_zoom, max_zoom) = zoom_limits(&props, &self.config);
                engine.set_zoom_limits(min_zoom, max_zoom);
                diff.zoom_limits = true;
            }
            if props.extent != self.props.extent {
                engine.set_view_extent(props.extent);
                diff.extent = true;
            }
            if props.center != self.props.center || props.boundary != self.props.boundary {
                diff.center =
                    engine.set_center(lonlat_to_mercator(resolve_center(&props, &self.config)));
            }
            if props.zoom != self.props.zoom {
                diff.zoom = engine.set_zoom(resolve_zoom(&props, &self.config));
            }
            if props.rotation != self.props.rotation {
                diff.rotation = engine.set_rotation(props.rotation);
            }
        }
        self.props = props;
        let events = flush_view_events(&self.map);
        if !diff.is_empty() {
            debug!(?diff, events, "view props applied");
        }
        Ok(diff)
    }

    /// Centers on `bounds` at the largest zoom that still shows all of it.
    pub fn fit_extent(&self, bounds: &GeoBounds) -> Result<ViewDiff, ViewError> {
        let projected = geo_bounds_to_mercator(bounds);
        let mut diff = ViewDiff::default();
        {
            let mut engine = self.map.try_borrow_mut().map_err(|_| ContextError::MapBusy)?;
            let zoom = fit_zoom(&projected, engine.view().size(), self.props.pyramid.as_ref());
            diff.center = engine.set_center(projected.center());
            diff.zoom = engine.set_zoom(zoom);
        }
        flush_view_events(&self.map);
        Ok(diff)
    }

    /// Delivers view changes queued by gestures to the callbacks.
    pub fn flush_events(&self) -> usize {
        flush_view_events(&self.map)
    }

    /// The way other components ask for a recenter without touching the
    /// viewport themselves.
    pub fn recenter_requester(&self) -> RecenterRequester {
        RecenterRequester {
            map: self.map_ref(),
        }
    }
}

impl Drop for ViewProvider {
    fn drop(&mut self) {
        if let Ok(mut engine) = self.map.try_borrow_mut() {
            engine.un_view_change(self.view_key);
        }
        debug!("view provider dropped");
    }
}

impl std::fmt::Debug for ViewProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewProvider")
            .field("props", &self.props)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct RecenterRequester {
    map: MapRef,
}

impl RecenterRequester {
    /// Returns whether the center moved.
    pub fn request(&self, position: LonLat) -> Result<bool, ContextError> {
        let map = self.map.upgrade()?;
        let changed = map
            .try_borrow_mut()
            .map_err(|_| ContextError::MapBusy)?
            .set_center(lonlat_to_mercator(position));
        flush_view_events(&map);
        Ok(changed)
    }
}
