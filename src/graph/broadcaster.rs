//! Thread-safe fan-out point

use std::cell::RefCell;

use parking_lot::ReentrantMutex;

use super::sink::{Sink, SinkRef, SinkWants, Source};
use super::source_base::SourceBase;

/// A sink that forwards every frame to all of its registered sinks
///
/// Registration and delivery share one lock, so producers and registrars can
/// live on different threads. The lock is reentrant: a sink may register or
/// unregister sinks on the same broadcaster from inside `on_frame`. Such a
/// change applies from the next frame on; the frame being delivered still
/// reaches every sink that was registered when delivery started.
pub struct Broadcaster<T> {
    inner: ReentrantMutex<RefCell<SourceBase<T>>>,
}

impl<T> Broadcaster<T> {
    pub fn new() -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(SourceBase::new())),
        }
    }

    /// Whether any sink is registered
    pub fn frame_wanted(&self) -> bool {
        !self.with(|inner| inner.is_empty())
    }

    /// Number of registered sinks
    pub fn sink_count(&self) -> usize {
        self.with(|inner| inner.len())
    }

    /// Combined wants of all registered sinks
    pub fn wants(&self) -> SinkWants {
        self.with(|inner| inner.aggregate_wants())
    }

    /// Register or update `sink`
    ///
    /// Returns true if this turned an empty broadcaster into a wanted one.
    pub fn attach(&self, sink: SinkRef<T>, wants: SinkWants) -> bool {
        self.with(|inner| {
            let was_empty = inner.is_empty();
            inner.add_or_update_sink(sink, wants) && was_empty
        })
    }

    /// Unregister `sink`
    ///
    /// Returns true if no sinks remain. Panics if `sink` is not registered.
    pub fn detach(&self, sink: &SinkRef<T>) -> bool {
        self.with(|inner| {
            inner.remove_sink(sink);
            inner.is_empty()
        })
    }

    /// Whether `sink` is registered
    pub fn contains(&self, sink: &SinkRef<T>) -> bool {
        self.with(|inner| inner.contains(sink))
    }

    /// Run `f` on the registry with the lock held
    ///
    /// `f` must not call back into sinks; delivery borrows a snapshot instead.
    fn with<R>(&self, f: impl FnOnce(&mut SourceBase<T>) -> R) -> R {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        f(&mut inner)
    }
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Sink<T> for Broadcaster<T> {
    fn on_frame(&self, frame: T) {
        // Held through delivery so frames from different threads stay ordered
        let guard = self.inner.lock();
        let sinks: Vec<SinkRef<T>> = guard
            .borrow()
            .sink_pairs()
            .iter()
            .map(|pair| SinkRef::clone(&pair.sink))
            .collect();

        if let Some((last, rest)) = sinks.split_last() {
            for sink in rest {
                sink.on_frame(frame.clone());
            }
            last.on_frame(frame);
        }
    }
}

impl<T> Source<T> for Broadcaster<T> {
    fn add_or_update_sink(&self, sink: SinkRef<T>, wants: SinkWants) {
        self.with(|inner| {
            inner.add_or_update_sink(sink, wants);
        });
    }

    fn remove_sink(&self, sink: &SinkRef<T>) {
        self.with(|inner| inner.remove_sink(sink));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use parking_lot::Mutex;

    use super::*;
    use crate::testing::CollectingSink;

    /// Appends its tag to a shared log on every frame
    struct Tagged {
        tag: &'static str,
        log: Arc<Mutex<Vec<(&'static str, u32)>>>,
    }

    impl Sink<u32> for Tagged {
        fn on_frame(&self, frame: u32) {
            self.log.lock().push((self.tag, frame));
        }
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a: SinkRef<u32> = Arc::new(Tagged {
            tag: "a",
            log: Arc::clone(&log),
        });
        let b: SinkRef<u32> = Arc::new(Tagged {
            tag: "b",
            log: Arc::clone(&log),
        });

        let broadcaster = Broadcaster::new();
        broadcaster.add_or_update_sink(a.clone(), SinkWants::default());
        broadcaster.add_or_update_sink(b.clone(), SinkWants::default());

        broadcaster.on_frame(1);
        assert_eq!(*log.lock(), vec![("a", 1), ("b", 1)]);

        broadcaster.remove_sink(&a);
        broadcaster.on_frame(2);
        assert_eq!(*log.lock(), vec![("a", 1), ("b", 1), ("b", 2)]);
    }

    #[test]
    fn test_frame_wanted() {
        let broadcaster: Broadcaster<u32> = Broadcaster::new();
        assert!(!broadcaster.frame_wanted());

        let sink: SinkRef<u32> = Arc::new(CollectingSink::new());
        broadcaster.add_or_update_sink(sink.clone(), SinkWants::default());
        assert!(broadcaster.frame_wanted());

        broadcaster.remove_sink(&sink);
        assert!(!broadcaster.frame_wanted());
    }

    #[test]
    fn test_attach_detach_report_transitions() {
        let broadcaster: Broadcaster<u32> = Broadcaster::new();
        let a: SinkRef<u32> = Arc::new(CollectingSink::new());
        let b: SinkRef<u32> = Arc::new(CollectingSink::new());

        assert!(broadcaster.attach(a.clone(), SinkWants::default()));
        assert!(!broadcaster.attach(b.clone(), SinkWants::default()));
        // Updating an existing sink is not a transition
        assert!(!broadcaster.attach(a.clone(), SinkWants::default().max_framerate(10)));
        assert_eq!(broadcaster.sink_count(), 2);

        assert!(!broadcaster.detach(&a));
        assert!(broadcaster.detach(&b));
    }

    #[test]
    fn test_no_sinks_drops_frame() {
        let broadcaster: Broadcaster<u32> = Broadcaster::new();
        broadcaster.on_frame(42);
        assert_eq!(broadcaster.sink_count(), 0);
    }

    /// Unregisters itself on its first frame
    struct LeaveOnFirst {
        source: Arc<Broadcaster<u32>>,
        me: Mutex<Option<SinkRef<u32>>>,
        seen: Mutex<Vec<u32>>,
    }

    impl Sink<u32> for LeaveOnFirst {
        fn on_frame(&self, frame: u32) {
            self.seen.lock().push(frame);
            if let Some(me) = self.me.lock().take() {
                self.source.remove_sink(&me);
            }
        }
    }

    #[test]
    fn test_sink_can_unregister_itself_during_delivery() {
        let broadcaster: Arc<Broadcaster<u32>> = Arc::new(Broadcaster::new());
        let leaver = Arc::new(LeaveOnFirst {
            source: Arc::clone(&broadcaster),
            me: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        });
        let handle: SinkRef<u32> = leaver.clone();
        *leaver.me.lock() = Some(handle.clone());
        let stayer: Arc<CollectingSink<u32>> = Arc::new(CollectingSink::new());

        broadcaster.add_or_update_sink(handle, SinkWants::default());
        broadcaster.add_or_update_sink(stayer.clone(), SinkWants::default());

        broadcaster.on_frame(1);
        assert_eq!(broadcaster.sink_count(), 1);
        broadcaster.on_frame(2);

        assert_eq!(*leaver.seen.lock(), vec![1]);
        assert_eq!(stayer.frames(), vec![1, 2]);
    }

    #[test]
    fn test_concurrent_registration_and_delivery() {
        let broadcaster: Arc<Broadcaster<u32>> = Arc::new(Broadcaster::new());
        let collector = Arc::new(CollectingSink::new());
        let sink: SinkRef<u32> = collector.clone();
        broadcaster.add_or_update_sink(sink, SinkWants::default());

        let producer = {
            let broadcaster = Arc::clone(&broadcaster);
            thread::spawn(move || {
                for i in 0..1000 {
                    broadcaster.on_frame(i);
                }
            })
        };
        let registrar = {
            let broadcaster = Arc::clone(&broadcaster);
            thread::spawn(move || {
                for _ in 0..100 {
                    let extra: SinkRef<u32> = Arc::new(CollectingSink::new());
                    broadcaster.add_or_update_sink(extra.clone(), SinkWants::default());
                    broadcaster.remove_sink(&extra);
                }
            })
        };

        producer.join().unwrap();
        registrar.join().unwrap();

        assert_eq!(collector.frames(), (0..1000).collect::<Vec<_>>());
        assert_eq!(broadcaster.sink_count(), 1);
    }
}
