use std::rc::Rc;

use runtime::event_bus::ListenerKey;
use scene::{LayerObject, RenderHook, RenderPhase, TileErrorListener, TileSource};

/// Tracks the one render hook a reconciler has registered for a phase.
#[derive(Clone)]
pub struct HookBinding {
    phase: RenderPhase,
    current: Option<(RenderHook, ListenerKey)>,
}

impl HookBinding {
    pub fn new(phase: RenderPhase) -> Self {
        Self {
            phase,
            current: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.current.is_some()
    }

    /// Brings the registration in line with `hook`. The old listener is removed
    /// before the new one is added, in the same call, so the layer never holds
    /// two. Returns whether anything was rebound.
    pub fn sync(&mut self, layer: &mut LayerObject, hook: Option<&RenderHook>) -> bool {
        let unchanged = match (&self.current, hook) {
            (None, None) => true,
            (Some((old, _)), Some(new)) => Rc::ptr_eq(old, new),
            _ => false,
        };
        if unchanged {
            return false;
        }
        self.detach(layer);
        if let Some(hook) = hook {
            let key = layer.on_render(self.phase, Rc::clone(hook));
            self.current = Some((Rc::clone(hook), key));
        }
        true
    }

    pub fn detach(&mut self, layer: &mut LayerObject) {
        if let Some((_, key)) = self.current.take() {
            layer.un_render(self.phase, key);
        }
    }
}

impl std::fmt::Debug for HookBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookBinding")
            .field("phase", &self.phase)
            .field("key", &self.current.as_ref().map(|(_, k)| *k))
            .finish()
    }
}

/// Source-level tile error subscription. Follows the source across swaps.
#[derive(Clone, Default)]
pub struct TileErrorBinding {
    current: Option<(Rc<TileErrorListener>, ListenerKey)>,
}

impl TileErrorBinding {
    pub fn listener(&self) -> Option<&Rc<TileErrorListener>> {
        self.current.as_ref().map(|(l, _)| l)
    }

    /// Re-points the subscription on `source` at `listener`. Returns whether
    /// anything changed.
    pub fn sync(&mut self, source: &mut TileSource, listener: Option<&Rc<TileErrorListener>>) -> bool {
        let unchanged = match (&self.current, listener) {
            (None, None) => true,
            (Some((old, _)), Some(new)) => Rc::ptr_eq(old, new),
            _ => false,
        };
        if unchanged {
            return false;
        }
        if let Some((_, key)) = self.current.take() {
            source.un_tile_error(key);
        }
        if let Some(listener) = listener {
            let key = source.on_tile_error(Rc::clone(listener));
            self.current = Some((Rc::clone(listener), key));
        }
        true
    }

    /// Subscribes `listener` on a freshly built source. The previous source
    /// is about to be dropped together with its subscriptions.
    pub fn resubscribe(&mut self, source: &mut TileSource, listener: Option<&Rc<TileErrorListener>>) {
        self.current = listener.map(|l| (Rc::clone(l), source.on_tile_error(Rc::clone(l))));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use scene::{
        LayerObject, LayerProps, RenderContext, RenderHook, RenderPhase, Source, TileSource,
        TileSourceOptions,
    };

    use super::HookBinding;

    fn layer() -> LayerObject {
        let source = TileSource::new(TileSourceOptions::new("/t/{z}/{x}/{y}.png")).unwrap();
        LayerObject::new(LayerProps::default(), Source::Tile(source))
    }

    #[test]
    fn replacing_a_hook_many_times_keeps_exactly_one_listener() {
        let mut layer = layer();
        let mut binding = HookBinding::new(RenderPhase::PreRender);
        let calls = Rc::new(Cell::new(0));
        for _ in 0..10 {
            let c = Rc::clone(&calls);
            let hook: RenderHook = Rc::new(move |_: &mut RenderContext| c.set(c.get() + 1));
            assert!(binding.sync(&mut layer, Some(&hook)));
            assert_eq!(layer.render_listener_count(RenderPhase::PreRender), 1);
        }
        assert_eq!(layer.render_listener_count(RenderPhase::PostRender), 0);
    }

    #[test]
    fn same_hook_is_not_rebound() {
        let mut layer = layer();
        let mut binding = HookBinding::new(RenderPhase::PostRender);
        let hook: RenderHook = Rc::new(|_: &mut RenderContext| {});
        assert!(binding.sync(&mut layer, Some(&hook)));
        assert!(!binding.sync(&mut layer, Some(&Rc::clone(&hook))));
        assert!(binding.sync(&mut layer, None));
        assert_eq!(layer.render_listener_count(RenderPhase::PostRender), 0);
        assert!(!binding.is_bound());
    }
}
