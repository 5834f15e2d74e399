//! Engine-level device location tracker.
//!
//! Hardware input arrives through [`report_position`] and [`report_error`];
//! both are ignored while tracking is off. Listeners are invoked from a
//! snapshot after the tracker borrow is released.

use std::cell::RefCell;
use std::rc::Rc;

use foundation::math::{LonLat, circular_ring, lonlat_to_mercator};
use runtime::event_bus::{ListenerKey, Listeners};
use tracing::debug;

/// Vertex count of the accuracy circle.
pub const ACCURACY_RING_VERTICES: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeolocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeolocationError {
    pub kind: GeolocationErrorKind,
    pub message: String,
}

impl GeolocationError {
    pub fn new(kind: GeolocationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "geolocation {:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for GeolocationError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeolocationEventKind {
    Position,
    AccuracyGeometry,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationEvent {
    Position {
        position: LonLat,
        /// `position` in EPSG:3857.
        projected: [f64; 2],
    },
    /// Closed ring in EPSG:3857, or `None` once cleared.
    AccuracyGeometry(Option<Vec<[f64; 2]>>),
    Error(GeolocationError),
}

pub type GeolocationListener = dyn Fn(&GeolocationEvent);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GeolocationKey {
    kind: GeolocationEventKind,
    key: ListenerKey,
}

#[derive(Debug, Default)]
pub struct Geolocation {
    tracking: bool,
    position: Option<LonLat>,
    accuracy_m: Option<f64>,
    accuracy_geometry: Option<Vec<[f64; 2]>>,
    position_listeners: Listeners<GeolocationListener>,
    accuracy_listeners: Listeners<GeolocationListener>,
    error_listeners: Listeners<GeolocationListener>,
}

pub type GeolocationHandle = Rc<RefCell<Geolocation>>;

impl Geolocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> GeolocationHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Turning tracking off releases the device and forgets the last fix.
    pub fn set_tracking(&mut self, tracking: bool) {
        if self.tracking == tracking {
            return;
        }
        self.tracking = tracking;
        if !tracking {
            self.position = None;
            self.accuracy_m = None;
            self.accuracy_geometry = None;
        }
        debug!(tracking, "device tracking toggled");
    }

    pub fn position(&self) -> Option<LonLat> {
        self.position
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy_m
    }

    pub fn accuracy_geometry(&self) -> Option<&[[f64; 2]]> {
        self.accuracy_geometry.as_deref()
    }

    pub fn on(&mut self, kind: GeolocationEventKind, listener: Rc<GeolocationListener>) -> GeolocationKey {
        let key = self.listeners_mut(kind).on(listener);
        GeolocationKey { kind, key }
    }

    pub fn un(&mut self, key: GeolocationKey) -> bool {
        self.listeners_mut(key.kind).un(key.key)
    }

    pub fn listener_count(&self) -> usize {
        self.position_listeners.len() + self.accuracy_listeners.len() + self.error_listeners.len()
    }

    fn listeners(&self, kind: GeolocationEventKind) -> &Listeners<GeolocationListener> {
        match kind {
            GeolocationEventKind::Position => &self.position_listeners,
            GeolocationEventKind::AccuracyGeometry => &self.accuracy_listeners,
            GeolocationEventKind::Error => &self.error_listeners,
        }
    }

    fn listeners_mut(&mut self, kind: GeolocationEventKind) -> &mut Listeners<GeolocationListener> {
        match kind {
            GeolocationEventKind::Position => &mut self.position_listeners,
            GeolocationEventKind::AccuracyGeometry => &mut self.accuracy_listeners,
            GeolocationEventKind::Error => &mut self.error_listeners,
        }
    }
}

fn dispatch(batch: Vec<(GeolocationEvent, Vec<Rc<GeolocationListener>>)>) {
    for (event, listeners) in batch {
        for listener in listeners {
            listener(&event);
        }
    }
}

/// Feeds a fix from the device. Emits a position event, then an accuracy
/// geometry event. Returns `false` when tracking is off.
pub fn report_position(handle: &GeolocationHandle, position: LonLat, accuracy_m: f64) -> bool {
    let batch = {
        let mut geo = handle.borrow_mut();
        if !geo.tracking {
            return false;
        }
        let ring: Vec<[f64; 2]> = circular_ring(position, accuracy_m.max(0.0), ACCURACY_RING_VERTICES)
            .into_iter()
            .map(lonlat_to_mercator)
            .collect();
        geo.position = Some(position);
        geo.accuracy_m = Some(accuracy_m);
        geo.accuracy_geometry = Some(ring.clone());
        vec![
            (
                GeolocationEvent::Position {
                    position,
                    projected: lonlat_to_mercator(position),
                },
                geo.listeners(GeolocationEventKind::Position).snapshot(),
            ),
            (
                GeolocationEvent::AccuracyGeometry(Some(ring)),
                geo.listeners(GeolocationEventKind::AccuracyGeometry).snapshot(),
            ),
        ]
    };
    dispatch(batch);
    true
}

/// Feeds a device error. Returns `false` when tracking is off.
pub fn report_error(handle: &GeolocationHandle, error: GeolocationError) -> bool {
    let batch = {
        let geo = handle.borrow();
        if !geo.tracking {
            return false;
        }
        vec![(
            GeolocationEvent::Error(error),
            geo.listeners(GeolocationEventKind::Error).snapshot(),
        )]
    };
    dispatch(batch);
    true
}
