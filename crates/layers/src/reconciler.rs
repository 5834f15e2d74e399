use scene::{DetachQueue, LayerId, LayerObject, LayerProps};
use tracing::{debug, error, warn};

use crate::context::{MapRef, SceneContext};
use crate::error::{ContextError, LayerError};

/// What one update pass did to the engine.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Mutable-in-place properties were written.
    pub props_changed: bool,
    /// A new source was built and swapped in.
    pub source_replaced: bool,
    /// Number of render or source hooks re-registered.
    pub hooks_rebound: u32,
}

impl UpdateReport {
    pub fn is_noop(&self) -> bool {
        *self == UpdateReport::default()
    }

    pub fn merge(self, other: UpdateReport) -> UpdateReport {
        UpdateReport {
            props_changed: self.props_changed || other.props_changed,
            source_replaced: self.source_replaced || other.source_replaced,
            hooks_rebound: self.hooks_rebound + other.hooks_rebound,
        }
    }
}

/// Owns engine layers for the lifetime of one declarative node.
///
/// Implementors remove their layers when dropped.
pub trait Reconcile: Sized {
    type Descriptor;

    fn mount(ctx: &SceneContext, descriptor: &Self::Descriptor) -> Result<Self, LayerError>;

    fn update(
        &mut self,
        ctx: &SceneContext,
        descriptor: &Self::Descriptor,
    ) -> Result<UpdateReport, LayerError>;

    fn map(&self) -> &MapRef;

    fn layer_ids(&self) -> Vec<LayerId>;
}

/// Writes `props` onto `layer`; returns whether anything differed.
pub fn apply_props(layer: &mut LayerObject, props: LayerProps) -> bool {
    if *layer.props() == props {
        return false;
    }
    *layer.props_mut() = props;
    true
}

/// Logs configuration errors at `error` level before they propagate.
pub(crate) fn log_config_error(kind: &'static str, err: LayerError) -> LayerError {
    if err.is_configuration() {
        error!(layer = kind, error = %err, "layer configuration rejected");
    }
    err
}

/// Removes a reconciler's layer from the map. A busy map gets the removal
/// queued instead, applied by the engine's next mutation.
pub(crate) fn detach_layer(map: &MapRef, queue: &DetachQueue, id: LayerId, kind: &'static str) {
    match map.with_mut(|m| m.remove_layer(id)) {
        Ok(Ok(_)) => debug!(layer = %id, kind, "layer unmounted"),
        Ok(Err(err)) => warn!(layer = %id, kind, error = %err, "layer already detached"),
        Err(ContextError::MapBusy) => {
            queue.push(id);
            debug!(layer = %id, kind, "map busy; layer removal queued");
        }
        Err(ContextError::MapDropped) => {}
        Err(err) => warn!(layer = %id, kind, error = %err, "layer could not be detached"),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    Mounted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Nothing to render and nothing mounted.
    Idle,
    Mounted,
    Updated(UpdateReport),
    Unmounted,
}

/// Lifecycle holder for one reconciler: `Unmounted -> Mounted -> (update)* -> Unmounted`.
///
/// Rendering with no descriptor (content absent) keeps the slot empty, so no
/// layer is attached until there is something to show.
pub struct LayerSlot<R> {
    inner: Option<R>,
}

impl<R> Default for LayerSlot<R> {
    fn default() -> Self {
        Self { inner: None }
    }
}

impl<R: Reconcile> LayerSlot<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        if self.inner.is_some() {
            LifecycleState::Mounted
        } else {
            LifecycleState::Unmounted
        }
    }

    pub fn get(&self) -> Option<&R> {
        self.inner.as_ref()
    }

    pub fn sync(
        &mut self,
        ctx: &SceneContext,
        descriptor: Option<&R::Descriptor>,
    ) -> Result<SlotOutcome, LayerError> {
        let Some(descriptor) = descriptor else {
            return Ok(if self.unmount() {
                SlotOutcome::Unmounted
            } else {
                SlotOutcome::Idle
            });
        };

        match &mut self.inner {
            Some(current) if current.map().ptr_eq(ctx.map()) => {
                current.update(ctx, descriptor).map(SlotOutcome::Updated)
            }
            _ => {
                if self.unmount() {
                    debug!("map changed under a mounted layer; remounting");
                }
                self.inner = Some(R::mount(ctx, descriptor)?);
                Ok(SlotOutcome::Mounted)
            }
        }
    }

    /// Returns whether something was mounted.
    pub fn unmount(&mut self) -> bool {
        self.inner.take().is_some()
    }
}
