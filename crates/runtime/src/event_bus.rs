use std::rc::Rc;

/// Registration key returned by [`Listeners::on`]; pass it back to
/// [`Listeners::un`] to unregister.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerKey(u64);

impl ListenerKey {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Ordered registry of callbacks.
///
/// `F` is the callback type, usually `dyn Fn(&Event)`. Listeners fire in
/// registration order. Keys are never reused within one registry.
pub struct Listeners<F: ?Sized> {
    next_key: u64,
    entries: Vec<(ListenerKey, Rc<F>)>,
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for Listeners<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("keys", &self.keys())
            .finish()
    }
}

impl<F: ?Sized> Listeners<F> {
    pub fn new() -> Self {
        Self {
            next_key: 0,
            entries: Vec::new(),
        }
    }

    pub fn on(&mut self, listener: Rc<F>) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        self.entries.push((key, listener));
        key
    }

    /// Returns `false` when the key was not registered (already removed).
    pub fn un(&mut self, key: ListenerKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<ListenerKey> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<F>> {
        self.entries.iter().map(|(_, l)| l)
    }

    /// Clones the current listener list.
    ///
    /// Emit from a snapshot when the owner sits behind a `RefCell` and a
    /// listener may borrow it again.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries.iter().map(|(_, l)| Rc::clone(l)).collect()
    }
}

impl<E: ?Sized> Listeners<dyn Fn(&E)> {
    pub fn emit(&self, event: &E) {
        for listener in self.iter() {
            listener(event);
        }
    }
}
