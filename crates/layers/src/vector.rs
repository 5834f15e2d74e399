use foundation::bounds::Aabb2;
use scene::{
    DetachQueue, ENGINE_MAX_ZOOM, ENGINE_MIN_ZOOM, Feature, Geometry, LayerId, LayerObject,
    LayerProps, RenderHook, RenderPhase, Source, VectorSource,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{MapRef, SceneContext};
use crate::error::LayerError;
use crate::hooks::HookBinding;
use crate::reconciler::{Reconcile, UpdateReport, apply_props, detach_layer, log_config_error};

/// A surveyed ground control point, in lon/lat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundControlPoint {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Clone)]
pub struct VectorLayerDescriptor {
    pub features: Vec<Feature>,
    /// Projection the feature coordinates are expressed in.
    pub projection: String,
    pub revision: u64,
    pub slot: usize,
    pub opacity: f64,
    pub extent: Option<Aabb2>,
    pub visible: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pre_render: Option<RenderHook>,
    pub post_render: Option<RenderHook>,
}

impl VectorLayerDescriptor {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            projection: "EPSG:4326".to_string(),
            revision: 0,
            slot: 0,
            opacity: 1.0,
            extent: None,
            visible: true,
            min_zoom: ENGINE_MIN_ZOOM,
            max_zoom: ENGINE_MAX_ZOOM,
            pre_render: None,
            post_render: None,
        }
    }

    /// One point feature per ground control point.
    pub fn from_points(points: &[GroundControlPoint]) -> Self {
        Self::new(
            points
                .iter()
                .map(|p| Feature::new(p.id.clone(), Geometry::Point([p.lon, p.lat])))
                .collect(),
        )
    }

    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = slot;
        self
    }

    fn props(&self, ctx: &SceneContext) -> Result<LayerProps, LayerError> {
        Ok(LayerProps {
            opacity: self.opacity,
            extent: self.extent,
            z_index: ctx.z_index_for(self.slot)?,
            preload: 0,
            visible: self.visible,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
        })
    }

    fn build_source(&self) -> Result<VectorSource, LayerError> {
        Ok(VectorSource::new(&self.features, &self.projection, self.revision)?)
    }
}

impl std::fmt::Debug for VectorLayerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorLayerDescriptor")
            .field("features", &self.features.len())
            .field("projection", &self.projection)
            .field("revision", &self.revision)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

/// Feature layer (GCPs, annotations) kept in sync with its descriptor.
pub struct VectorLayer {
    map: MapRef,
    id: LayerId,
    detach: DetachQueue,
    features: Vec<Feature>,
    projection: String,
    revision: u64,
    pre_render: HookBinding,
    post_render: HookBinding,
}

impl VectorLayer {
    pub fn id(&self) -> LayerId {
        self.id
    }

    fn source_matches(&self, d: &VectorLayerDescriptor) -> bool {
        self.revision == d.revision && self.projection == d.projection && self.features == d.features
    }
}

impl Reconcile for VectorLayer {
    type Descriptor = VectorLayerDescriptor;

    fn mount(ctx: &SceneContext, d: &VectorLayerDescriptor) -> Result<Self, LayerError> {
        let props = d.props(ctx).map_err(|e| log_config_error("vector", e))?;
        let source = d.build_source().map_err(|e| log_config_error("vector", e))?;
        let mut object = LayerObject::new(props, Source::Vector(source));
        let mut pre_render = HookBinding::new(RenderPhase::PreRender);
        let mut post_render = HookBinding::new(RenderPhase::PostRender);
        pre_render.sync(&mut object, d.pre_render.as_ref());
        post_render.sync(&mut object, d.post_render.as_ref());

        let (id, detach) = ctx.map().with_mut(|m| (m.add_layer(object), m.detach_queue()))?;
        debug!(layer = %id, features = d.features.len(), "vector layer mounted");
        Ok(Self {
            map: ctx.map().clone(),
            id,
            detach,
            features: d.features.clone(),
            projection: d.projection.clone(),
            revision: d.revision,
            pre_render,
            post_render,
        })
    }

    fn update(
        &mut self,
        ctx: &SceneContext,
        d: &VectorLayerDescriptor,
    ) -> Result<UpdateReport, LayerError> {
        let props = d.props(ctx).map_err(|e| log_config_error("vector", e))?;
        let replacement = if self.source_matches(d) {
            None
        } else {
            Some(d.build_source().map_err(|e| log_config_error("vector", e))?)
        };

        let id = self.id;
        let pre_render = &mut self.pre_render;
        let post_render = &mut self.post_render;
        let report = ctx.map().with_mut(|m| -> Result<UpdateReport, LayerError> {
            let layer = m.layer_mut(id)?;
            let mut report = UpdateReport {
                props_changed: apply_props(layer, props),
                ..UpdateReport::default()
            };
            if let Some(source) = replacement {
                layer.set_source(Source::Vector(source));
                report.source_replaced = true;
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
            self.features = d.features.clone();
            self.projection = d.projection.clone();
            self.revision = d.revision;
        }
        if !report.is_noop() {
            debug!(layer = %id, ?report, "vector layer updated");
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

impl Drop for VectorLayer {
    fn drop(&mut self) {
        detach_layer(&self.map, &self.detach, self.id, "vector");
    }
}
