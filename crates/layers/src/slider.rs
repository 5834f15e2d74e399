use std::cell::Cell;
use std::rc::Rc;

use scene::{LayerId, RenderContext, RenderHook};
use tracing::debug;

use crate::context::{MapRef, SceneContext};
use crate::error::LayerError;
use crate::group::LayerGroup;
use crate::reconciler::{Reconcile, UpdateReport};
use crate::tile::{TileLayer, TileLayerDescriptor};

/// Side-by-side comparison of two rasters split at a vertical line.
///
/// The right layer's own render hooks are replaced by the clip pair.
#[derive(Debug, Clone)]
pub struct SliderDescriptor {
    pub left: TileLayerDescriptor,
    pub right: TileLayerDescriptor,
    /// Split as a fraction of the target width, `0.0..=1.0`.
    pub position: f64,
    pub slot: usize,
}

fn clamp_position(position: f64) -> f64 {
    if position.is_nan() {
        0.5
    } else {
        position.clamp(0.0, 1.0)
    }
}

pub struct SliderLayer {
    map: MapRef,
    group: LayerGroup,
    position: Rc<Cell<f64>>,
    clip: RenderHook,
    restore: RenderHook,
    left: TileLayer,
    right: TileLayer,
}

impl SliderLayer {
    pub fn left(&self) -> &TileLayer {
        &self.left
    }

    pub fn right(&self) -> &TileLayer {
        &self.right
    }

    pub fn position(&self) -> f64 {
        self.position.get()
    }

    pub fn group(&self) -> &LayerGroup {
        &self.group
    }

    fn inner_context(
        ctx: &SceneContext,
        slot: usize,
    ) -> Result<(LayerGroup, SceneContext), LayerError> {
        let scope = ctx.scope();
        let group = LayerGroup::nested(&scope, "slider", slot)?;
        let inner = SceneContext::from_scope(&scope.with_group(group.clone()))?;
        Ok((group, inner))
    }

    fn left_descriptor(d: &SliderDescriptor) -> TileLayerDescriptor {
        d.left.clone().with_slot(0)
    }

    /// The right layer always carries the clip and restore hooks, replacing
    /// any hooks on its own descriptor.
    fn right_descriptor(
        d: &SliderDescriptor,
        clip: &RenderHook,
        restore: &RenderHook,
    ) -> TileLayerDescriptor {
        let mut right = d.right.clone().with_slot(1);
        right.pre_render = Some(Rc::clone(clip));
        right.post_render = Some(Rc::clone(restore));
        right
    }
}

impl Reconcile for SliderLayer {
    type Descriptor = SliderDescriptor;

    fn mount(ctx: &SceneContext, d: &SliderDescriptor) -> Result<Self, LayerError> {
        let (group, inner) = Self::inner_context(ctx, d.slot)?;
        let position = Rc::new(Cell::new(clamp_position(d.position)));

        let split = Rc::clone(&position);
        let clip: RenderHook = Rc::new(move |rc: &mut RenderContext| {
            let [width, height] = rc.size();
            let (width, height) = (f64::from(width), f64::from(height));
            let x = width * split.get();
            rc.save();
            rc.clip_rect(x, 0.0, width - x, height);
        });
        let restore: RenderHook = Rc::new(|rc: &mut RenderContext| rc.restore());

        let left = TileLayer::mount(&inner, &Self::left_descriptor(d))?;
        let right = TileLayer::mount(&inner, &Self::right_descriptor(d, &clip, &restore))?;
        debug!(left = %left.id(), right = %right.id(), position = position.get(), "slider mounted");

        Ok(Self {
            map: ctx.map().clone(),
            group,
            position,
            clip,
            restore,
            left,
            right,
        })
    }

    fn update(
        &mut self,
        ctx: &SceneContext,
        d: &SliderDescriptor,
    ) -> Result<UpdateReport, LayerError> {
        let (group, inner) = Self::inner_context(ctx, d.slot)?;
        self.group = group;

        let left = self.left.update(&inner, &Self::left_descriptor(d))?;
        let right_descriptor = Self::right_descriptor(d, &self.clip, &self.restore);
        let right = self.right.update(&inner, &right_descriptor)?;
        let mut report = left.merge(right);

        let position = clamp_position(d.position);
        if position != self.position.get() {
            self.position.set(position);
            let id = self.right.id();
            ctx.map().with_mut(|m| m.changed(id))??;
            report.props_changed = true;
            debug!(position, "slider moved");
        }
        Ok(report)
    }

    fn map(&self) -> &MapRef {
        &self.map
    }

    fn layer_ids(&self) -> Vec<LayerId> {
        vec![self.left.id(), self.right.id()]
    }
}
