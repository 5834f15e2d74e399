use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::time::Millis;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Interval {
    period: Millis,
    next_due: Millis,
    callback: Rc<dyn Fn()>,
}

#[derive(Default)]
struct TimerQueue {
    now: Millis,
    next_id: u64,
    intervals: BTreeMap<TimerId, Interval>,
}

impl TimerQueue {
    /// Earliest interval due at or before `deadline`. Ties go to the lower id.
    fn next_due(&self, deadline: Millis) -> Option<TimerId> {
        self.intervals
            .iter()
            .filter(|(_, iv)| iv.next_due <= deadline)
            .min_by_key(|(id, iv)| (iv.next_due, **id))
            .map(|(id, _)| *id)
    }
}

/// Interval timers on a virtual, embedder-driven clock.
///
/// Cloning shares the same queue. Callbacks run with the queue unborrowed, so
/// they may set or clear timers themselves.
#[derive(Clone, Default)]
pub struct Timers {
    inner: Rc<RefCell<TimerQueue>>,
}

impl std::fmt::Debug for Timers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let q = self.inner.borrow();
        f.debug_struct("Timers")
            .field("now", &q.now)
            .field("active", &q.intervals.len())
            .finish()
    }
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Millis {
        self.inner.borrow().now
    }

    /// Schedules `callback` every `period`, first firing one period from now.
    /// A zero period is treated as one millisecond.
    pub fn set_interval(&self, period: Millis, callback: Rc<dyn Fn()>) -> TimerId {
        let mut q = self.inner.borrow_mut();
        let period = Millis(period.0.max(1));
        let id = TimerId(q.next_id);
        q.next_id += 1;
        let next_due = q.now + period;
        q.intervals.insert(
            id,
            Interval {
                period,
                next_due,
                callback,
            },
        );
        id
    }

    pub fn clear(&self, id: TimerId) -> bool {
        self.inner.borrow_mut().intervals.remove(&id).is_some()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.inner.borrow().intervals.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.borrow().intervals.len()
    }

    /// Advances the clock by `by`, firing every interval that comes due, in
    /// due-time order. Returns the number of callbacks run.
    pub fn advance(&self, by: Millis) -> usize {
        let deadline = self.now().saturating_add(by);
        let mut fired = 0;
        loop {
            let callback = {
                let mut q = self.inner.borrow_mut();
                let Some(id) = q.next_due(deadline) else {
                    q.now = deadline;
                    break;
                };
                let Some(iv) = q.intervals.get_mut(&id) else {
                    break;
                };
                let due = iv.next_due;
                iv.next_due = due + iv.period;
                let cb = Rc::clone(&iv.callback);
                q.now = due;
                cb
            };
            callback();
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use foundation::time::Millis;

    use super::Timers;

    #[test]
    fn interval_fires_once_per_period() {
        let timers = Timers::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        timers.set_interval(Millis(300), Rc::new(move || h.set(h.get() + 1)));

        assert_eq!(timers.advance(Millis(299)), 0);
        assert_eq!(timers.advance(Millis(1)), 1);
        assert_eq!(timers.advance(Millis(900)), 3);
        assert_eq!(hits.get(), 4);
        assert_eq!(timers.now(), Millis(1200));
    }

    #[test]
    fn cleared_interval_never_fires() {
        let timers = Timers::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let id = timers.set_interval(Millis(10), Rc::new(move || h.set(h.get() + 1)));
        assert!(timers.clear(id));
        timers.advance(Millis(100));
        assert_eq!(hits.get(), 0);
        assert!(!timers.is_active(id));
    }

    #[test]
    fn callback_may_clear_its_own_timer() {
        let timers = Timers::new();
        let slot = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));
        let (t, s, h) = (timers.clone(), Rc::clone(&slot), Rc::clone(&hits));
        let id = timers.set_interval(
            Millis(5),
            Rc::new(move || {
                h.set(h.get() + 1);
                if let Some(id) = *s.borrow() {
                    t.clear(id);
                }
            }),
        );
        *slot.borrow_mut() = Some(id);
        timers.advance(Millis(50));
        assert_eq!(hits.get(), 1);
        assert_eq!(timers.active_count(), 0);
    }

    #[test]
    fn timers_fire_in_due_order() {
        let timers = Timers::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        timers.set_interval(Millis(30), Rc::new(move || l.borrow_mut().push("slow")));
        let l = Rc::clone(&log);
        timers.set_interval(Millis(20), Rc::new(move || l.borrow_mut().push("fast")));
        timers.advance(Millis(60));
        assert_eq!(*log.borrow(), vec!["fast", "slow", "fast", "slow", "fast"]);
    }
}
