use std::cell::RefCell;
use std::rc::{Rc, Weak};

use scene::MapEngine;

use crate::error::{ContextError, LayerError};
use crate::group::{LayerGroup, ZBand};

/// Owning handle to a map. Only the view provider holds one.
pub type MapHandle = Rc<RefCell<MapEngine>>;

/// Non-owning reference to a map, handed to every descendant.
#[derive(Clone)]
pub struct MapRef(Weak<RefCell<MapEngine>>);

impl MapRef {
    pub fn from_handle(handle: &MapHandle) -> Self {
        MapRef(Rc::downgrade(handle))
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }

    pub fn upgrade(&self) -> Result<MapHandle, ContextError> {
        self.0.upgrade().ok_or(ContextError::MapDropped)
    }

    pub fn with<T>(&self, f: impl FnOnce(&MapEngine) -> T) -> Result<T, ContextError> {
        let map = self.upgrade()?;
        let engine = map.try_borrow().map_err(|_| ContextError::MapBusy)?;
        Ok(f(&engine))
    }

    pub fn with_mut<T>(&self, f: impl FnOnce(&mut MapEngine) -> T) -> Result<T, ContextError> {
        let map = self.upgrade()?;
        let mut engine = map.try_borrow_mut().map_err(|_| ContextError::MapBusy)?;
        Ok(f(&mut engine))
    }
}

impl std::fmt::Debug for MapRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MapRef")
            .field(&if self.is_alive() { "alive" } else { "dropped" })
            .finish()
    }
}

/// Lexical scope carrying the published map and the nearest layer group.
///
/// Publishing returns a child scope; the parent is untouched, so siblings never
/// see each other's groups.
#[derive(Debug, Clone, Default)]
pub struct SceneScope {
    map: Option<MapRef>,
    group: Option<LayerGroup>,
}

impl SceneScope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn with_map(&self, map: MapRef) -> Self {
        Self {
            map: Some(map),
            group: self.group.clone(),
        }
    }

    pub fn with_group(&self, group: LayerGroup) -> Self {
        Self {
            map: self.map.clone(),
            group: Some(group),
        }
    }

    pub fn map(&self) -> Option<&MapRef> {
        self.map.as_ref()
    }

    pub fn group(&self) -> Option<&LayerGroup> {
        self.group.as_ref()
    }

    /// Band of the nearest group, or the root band.
    pub fn band(&self) -> ZBand {
        self.group.as_ref().map(|g| g.band()).unwrap_or(ZBand::ROOT)
    }
}

/// What a scene node receives: a map that is guaranteed present, plus the
/// optional nearest group.
#[derive(Debug, Clone)]
pub struct SceneContext {
    map: MapRef,
    group: Option<LayerGroup>,
}

impl SceneContext {
    pub fn from_scope(scope: &SceneScope) -> Result<Self, ContextError> {
        let map = scope.map().cloned().ok_or(ContextError::MissingMap)?;
        Ok(Self {
            map,
            group: scope.group().cloned(),
        })
    }

    pub fn map(&self) -> &MapRef {
        &self.map
    }

    pub fn group(&self) -> Option<&LayerGroup> {
        self.group.as_ref()
    }

    pub fn band(&self) -> ZBand {
        self.group.as_ref().map(|g| g.band()).unwrap_or(ZBand::ROOT)
    }

    /// z-index of the `slot`-th child declared in the current band.
    pub fn z_index_for(&self, slot: usize) -> Result<i64, LayerError> {
        Ok(self.band().slot(slot)?.base())
    }

    /// Scope for children rendered beneath this node.
    pub fn scope(&self) -> SceneScope {
        let scope = SceneScope::root().with_map(self.map.clone());
        match &self.group {
            Some(group) => scope.with_group(group.clone()),
            None => scope,
        }
    }
}
