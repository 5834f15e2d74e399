//! "Locate me" control: a four-state machine over the device tracker.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use foundation::math::LonLat;
use foundation::time::Millis;
use runtime::timer::{TimerId, Timers};
use scene::geolocation::{
    GeolocationErrorKind, GeolocationEvent, GeolocationEventKind, GeolocationHandle, GeolocationKey,
};
use tracing::{debug, info, trace, warn};

use crate::notify::{Notification, Notifier};
use crate::provider::RecenterRequester;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GeolocationState {
    NonActive,
    /// Tracking requested, no fix yet.
    Pending,
    Active,
    /// Following the user: every fix recenters the view.
    Orientation,
}

impl GeolocationState {
    pub fn is_tracking(self) -> bool {
        !matches!(self, GeolocationState::NonActive)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GeolocationInput {
    Click,
    PositionFix(LonLat),
    LocationError(GeolocationErrorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartTracking,
    StopTracking,
    StartPulse,
    StopPulse,
    /// Clear the accuracy overlay outward.
    ResetTracking,
    Recenter(LonLat),
    Notify(Notification),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: GeolocationState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: GeolocationState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }
}

/// The transition table. Pure; effects are carried out by the caller in
/// order.
pub fn transition(state: GeolocationState, input: GeolocationInput) -> Transition {
    use Effect::*;
    use GeolocationInput::*;
    use GeolocationState::*;

    match (state, input) {
        (NonActive, Click) => Transition::to(Pending, vec![StartTracking, StartPulse]),
        (Pending, Click) => Transition::to(NonActive, vec![StopPulse, StopTracking]),
        (Pending, PositionFix(_)) => Transition::to(Active, vec![StopPulse]),
        (Active, Click) => Transition::to(Orientation, Vec::new()),
        (Orientation, Click) => Transition::to(NonActive, vec![StopTracking, ResetTracking]),
        (Orientation, PositionFix(position)) => Transition::to(Orientation, vec![Recenter(position)]),
        (NonActive | Active, PositionFix(_)) => Transition::to(state, Vec::new()),
        (_, LocationError(kind)) => {
            let mut effects = match state {
                NonActive => Vec::new(),
                Pending => vec![StopPulse, StopTracking],
                Active | Orientation => vec![StopTracking, ResetTracking],
            };
            effects.push(Notify(Notification::for_location_error(kind)));
            Transition::to(NonActive, effects)
        }
    }
}

/// Receives what the control forwards outward.
pub trait GeolocationSink {
    fn position(&self, position: LonLat);

    /// Closed ring in EPSG:3857.
    fn accuracy_geometry(&self, ring: Option<&[[f64; 2]]>);

    /// Tracking ended: drop any overlay.
    fn reset(&self);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeolocationIcon {
    Idle,
    /// The two alternating frames of the pending pulse.
    Searching,
    SearchingAlt,
    Tracking,
    Following,
}

struct Shared {
    state: Cell<GeolocationState>,
    tracker: GeolocationHandle,
    timers: Timers,
    pulse_interval: Millis,
    pulse: Cell<Option<TimerId>>,
    pulse_frame: Cell<bool>,
    keys: RefCell<Vec<GeolocationKey>>,
    sink: Rc<dyn GeolocationSink>,
    notifier: Rc<dyn Notifier>,
    recenter: RecenterRequester,
}

/// Runs [`transition`] against the device tracker, a pulse timer and the
/// provider's recenter requester.
///
/// Dropping the button stops hardware tracking and removes every listener it
/// registered.
pub struct GeolocationButton {
    shared: Rc<Shared>,
}

impl GeolocationButton {
    pub fn new(
        tracker: GeolocationHandle,
        timers: Timers,
        pulse_interval: Millis,
        recenter: RecenterRequester,
        sink: Rc<dyn GeolocationSink>,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: Cell::new(GeolocationState::NonActive),
                tracker,
                timers,
                pulse_interval,
                pulse: Cell::new(None),
                pulse_frame: Cell::new(false),
                keys: RefCell::new(Vec::new()),
                sink,
                notifier,
                recenter,
            }),
        }
    }

    pub fn state(&self) -> GeolocationState {
        self.shared.state.get()
    }

    pub fn icon(&self) -> GeolocationIcon {
        match self.shared.state.get() {
            GeolocationState::NonActive => GeolocationIcon::Idle,
            GeolocationState::Pending if self.shared.pulse_frame.get() => GeolocationIcon::SearchingAlt,
            GeolocationState::Pending => GeolocationIcon::Searching,
            GeolocationState::Active => GeolocationIcon::Tracking,
            GeolocationState::Orientation => GeolocationIcon::Following,
        }
    }

    pub fn click(&self) -> GeolocationState {
        apply(&self.shared, GeolocationInput::Click)
    }

    /// Stops tracking and the pulse without notifying anyone.
    pub fn unmount(&self) {
        let shared = &self.shared;
        if shared.state.get().is_tracking() {
            stop_pulse(shared);
            stop_tracking(shared);
            shared.state.set(GeolocationState::NonActive);
            debug!("geolocation control unmounted while tracking");
        }
    }
}

impl Drop for GeolocationButton {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn apply(shared: &Rc<Shared>, input: GeolocationInput) -> GeolocationState {
    let from = shared.state.get();
    let Transition { next, effects } = transition(from, input);
    shared.state.set(next);
    if from != next {
        debug!(?from, ?next, "geolocation state changed");
    }
    for effect in effects {
        run(shared, effect);
    }
    next
}

fn run(shared: &Rc<Shared>, effect: Effect) {
    match effect {
        Effect::StartTracking => start_tracking(shared),
        Effect::StopTracking => stop_tracking(shared),
        Effect::StartPulse => start_pulse(shared),
        Effect::StopPulse => stop_pulse(shared),
        Effect::ResetTracking => shared.sink.reset(),
        Effect::Recenter(position) => {
            if let Err(err) = shared.recenter.request(position) {
                warn!(error = %err, "recenter on position fix failed");
            }
        }
        Effect::Notify(notification) => {
            info!(?notification, "geolocation notification");
            shared.notifier.notify(notification);
        }
    }
}

fn start_tracking(shared: &Rc<Shared>) {
    let weak = Rc::downgrade(shared);
    let on_event = move |event: &GeolocationEvent| {
        if let Some(shared) = Weak::upgrade(&weak) {
            handle_event(&shared, event);
        }
    };
    let listener: Rc<dyn Fn(&GeolocationEvent)> = Rc::new(on_event);

    let mut tracker = shared.tracker.borrow_mut();
    let mut keys = shared.keys.borrow_mut();
    for kind in [
        GeolocationEventKind::Position,
        GeolocationEventKind::AccuracyGeometry,
        GeolocationEventKind::Error,
    ] {
        keys.push(tracker.on(kind, Rc::clone(&listener)));
    }
    tracker.set_tracking(true);
}

fn stop_tracking(shared: &Shared) {
    let mut tracker = shared.tracker.borrow_mut();
    for key in shared.keys.borrow_mut().drain(..) {
        tracker.un(key);
    }
    tracker.set_tracking(false);
}

fn start_pulse(shared: &Rc<Shared>) {
    let weak = Rc::downgrade(shared);
    let id = shared.timers.set_interval(
        shared.pulse_interval,
        Rc::new(move || {
            if let Some(shared) = Weak::upgrade(&weak) {
                shared.pulse_frame.set(!shared.pulse_frame.get());
            }
        }),
    );
    if let Some(previous) = shared.pulse.replace(Some(id)) {
        shared.timers.clear(previous);
    }
}

fn stop_pulse(shared: &Shared) {
    if let Some(id) = shared.pulse.take() {
        shared.timers.clear(id);
    }
    shared.pulse_frame.set(false);
}

/// Events still in flight from a snapshot taken before tracking stopped are
/// dropped.
fn handle_event(shared: &Rc<Shared>, event: &GeolocationEvent) {
    if !shared.state.get().is_tracking() {
        trace!(?event, "geolocation event after tracking stopped ignored");
        return;
    }
    match event {
        GeolocationEvent::Position { position, .. } => {
            shared.sink.position(*position);
            apply(shared, GeolocationInput::PositionFix(*position));
        }
        GeolocationEvent::AccuracyGeometry(ring) => shared.sink.accuracy_geometry(ring.as_deref()),
        GeolocationEvent::Error(err) => {
            warn!(error = %err, "device location failed");
            apply(shared, GeolocationInput::LocationError(err.kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use foundation::math::{LonLat, lonlat_to_mercator};
    use foundation::time::Millis;
    use pretty_assertions::assert_eq;
    use runtime::timer::Timers;
    use scene::DomTarget;
    use scene::geolocation::{
        Geolocation, GeolocationError, GeolocationErrorKind, GeolocationHandle, report_error,
        report_position,
    };

    use super::{
        Effect, GeolocationButton, GeolocationIcon, GeolocationInput, GeolocationSink,
        GeolocationState, transition,
    };
    use crate::config::ViewerConfig;
    use crate::notify::Notification;
    use crate::provider::{ViewCallbacks, ViewProps, ViewProvider};

    #[derive(Default)]
    struct RecordingSink {
        positions: RefCell<Vec<LonLat>>,
        rings: RefCell<Vec<Option<usize>>>,
        resets: RefCell<u32>,
    }

    impl GeolocationSink for RecordingSink {
        fn position(&self, position: LonLat) {
            self.positions.borrow_mut().push(position);
        }

        fn accuracy_geometry(&self, ring: Option<&[[f64; 2]]>) {
            self.rings.borrow_mut().push(ring.map(|r| r.len()));
        }

        fn reset(&self) {
            *self.resets.borrow_mut() += 1;
        }
    }

    struct Fixture {
        provider: ViewProvider,
        tracker: GeolocationHandle,
        timers: Timers,
        sink: Rc<RecordingSink>,
        notes: Rc<RefCell<Vec<Notification>>>,
        button: GeolocationButton,
    }

    fn fixture() -> Fixture {
        let provider = ViewProvider::mount(
            &DomTarget::new("map", [400, 300]),
            ViewProps::default(),
            ViewCallbacks::default(),
            ViewerConfig::default(),
        )
        .unwrap();
        let tracker = Geolocation::shared();
        let timers = Timers::new();
        let sink = Rc::new(RecordingSink::default());
        let notes = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&notes);
        let button = GeolocationButton::new(
            Rc::clone(&tracker),
            timers.clone(),
            ViewerConfig::default().pulse_interval(),
            provider.recenter_requester(),
            sink.clone(),
            Rc::new(move |n: Notification| recorded.borrow_mut().push(n)),
        );
        Fixture {
            provider,
            tracker,
            timers,
            sink,
            notes,
            button,
        }
    }

    #[test]
    fn transition_table() {
        use GeolocationInput::*;
        use GeolocationState::*;

        let fix = PositionFix(LonLat::new(1.0, 2.0));
        assert_eq!(transition(NonActive, Click).next, Pending);
        assert_eq!(transition(Pending, Click).next, NonActive);
        assert_eq!(transition(Pending, fix).next, Active);
        assert_eq!(transition(Active, Click).next, Orientation);
        assert_eq!(transition(Active, fix).effects, Vec::new());
        assert_eq!(
            transition(Orientation, fix).effects,
            vec![Effect::Recenter(LonLat::new(1.0, 2.0))]
        );
        let back = transition(Orientation, Click);
        assert_eq!(back.next, NonActive);
        assert!(back.effects.contains(&Effect::ResetTracking));

        for state in [NonActive, Pending, Active, Orientation] {
            let t = transition(state, LocationError(GeolocationErrorKind::PermissionDenied));
            assert_eq!(t.next, NonActive);
            assert_eq!(
                t.effects.last(),
                Some(&Effect::Notify(Notification::LocationPermissionDenied))
            );
        }
    }

    #[test]
    fn full_cycle_recenters_while_following_and_resets_on_exit() {
        let f = fixture();
        assert_eq!(f.button.click(), GeolocationState::Pending);
        assert!(f.tracker.borrow().is_tracking());
        assert_eq!(f.tracker.borrow().listener_count(), 3);

        let first = LonLat::new(100.05, 38.4);
        assert!(report_position(&f.tracker, first, 15.0));
        assert_eq!(f.button.state(), GeolocationState::Active);
        assert_eq!(f.timers.active_count(), 0);
        assert_eq!(f.sink.positions.borrow().len(), 1);
        assert_eq!(*f.sink.rings.borrow(), vec![Some(65)]);

        assert_eq!(f.button.click(), GeolocationState::Orientation);
        let moved = LonLat::new(100.06, 38.41);
        report_position(&f.tracker, moved, 10.0);
        assert_eq!(f.provider.map().borrow().view().center(), lonlat_to_mercator(moved));

        assert_eq!(f.button.click(), GeolocationState::NonActive);
        assert_eq!(*f.sink.resets.borrow(), 1);
        assert!(!f.tracker.borrow().is_tracking());
        assert_eq!(f.tracker.borrow().accuracy_geometry(), None);
        assert_eq!(f.tracker.borrow().listener_count(), 0);
    }

    #[test]
    fn position_in_active_state_does_not_recenter() {
        let f = fixture();
        f.button.click();
        report_position(&f.tracker, LonLat::new(10.0, 10.0), 5.0);
        let center = f.provider.map().borrow().view().center();
        report_position(&f.tracker, LonLat::new(11.0, 11.0), 5.0);
        assert_eq!(f.provider.map().borrow().view().center(), center);
    }

    #[test]
    fn pending_pulse_alternates_and_stops() {
        let f = fixture();
        f.button.click();
        assert_eq!(f.button.icon(), GeolocationIcon::Searching);
        f.timers.advance(Millis(300));
        assert_eq!(f.button.icon(), GeolocationIcon::SearchingAlt);
        f.timers.advance(Millis(300));
        assert_eq!(f.button.icon(), GeolocationIcon::Searching);

        f.button.click();
        assert_eq!(f.button.state(), GeolocationState::NonActive);
        assert_eq!(f.timers.active_count(), 0);
        assert_eq!(f.button.icon(), GeolocationIcon::Idle);
    }

    #[test]
    fn errors_reset_and_notify_distinctly() {
        let f = fixture();
        f.button.click();
        report_error(
            &f.tracker,
            GeolocationError::new(GeolocationErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(f.button.state(), GeolocationState::NonActive);
        assert_eq!(f.timers.active_count(), 0);
        assert_eq!(f.tracker.borrow().listener_count(), 0);

        f.button.click();
        report_position(&f.tracker, LonLat::new(0.0, 0.0), 1.0);
        report_error(
            &f.tracker,
            GeolocationError::new(GeolocationErrorKind::PositionUnavailable, "no fix"),
        );
        assert_eq!(
            *f.notes.borrow(),
            vec![
                Notification::LocationPermissionDenied,
                Notification::LocationFailed
            ]
        );
        assert_eq!(*f.sink.resets.borrow(), 1);
    }

    /// Unmounts the button it is attached to on the first position fix.
    #[derive(Default)]
    struct UnmountingSink {
        inner: RecordingSink,
        button: RefCell<Weak<GeolocationButton>>,
    }

    impl GeolocationSink for UnmountingSink {
        fn position(&self, position: LonLat) {
            self.inner.position(position);
            if let Some(button) = self.button.borrow().upgrade() {
                button.unmount();
            }
        }

        fn accuracy_geometry(&self, ring: Option<&[[f64; 2]]>) {
            self.inner.accuracy_geometry(ring);
        }

        fn reset(&self) {
            self.inner.reset();
        }
    }

    #[test]
    fn accuracy_from_a_stopped_fix_never_reaches_the_sink() {
        let f = fixture();
        let sink = Rc::new(UnmountingSink::default());
        let button = Rc::new(GeolocationButton::new(
            Rc::clone(&f.tracker),
            f.timers.clone(),
            Millis(300),
            f.provider.recenter_requester(),
            sink.clone(),
            Rc::new(|_: Notification| {}),
        ));
        *sink.button.borrow_mut() = Rc::downgrade(&button);

        button.click();
        assert!(report_position(&f.tracker, LonLat::new(3.0, 4.0), 20.0));
        assert_eq!(button.state(), GeolocationState::NonActive);
        assert_eq!(sink.inner.positions.borrow().len(), 1);
        assert_eq!(*sink.inner.rings.borrow(), Vec::<Option<usize>>::new());
        assert_eq!(f.tracker.borrow().listener_count(), 0);
    }

    #[test]
    fn remounting_never_duplicates_listeners() {
        let f = fixture();
        for _ in 0..5 {
            f.button.click();
            f.button.click();
        }
        assert_eq!(f.tracker.borrow().listener_count(), 0);

        f.button.click();
        let Fixture {
            button,
            tracker,
            timers,
            ..
        } = f;
        drop(button);
        assert!(!tracker.borrow().is_tracking());
        assert_eq!(tracker.borrow().listener_count(), 0);
        assert_eq!(timers.active_count(), 0);
    }
}
