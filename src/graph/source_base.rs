//! Sink registry shared by every source

use super::sink::{same_sink, SinkRef, SinkWants};

/// A registered sink and what it asked for
pub struct SinkPair<T> {
    pub sink: SinkRef<T>,
    pub wants: SinkWants,
}

impl<T> Clone for SinkPair<T> {
    fn clone(&self) -> Self {
        Self {
            sink: SinkRef::clone(&self.sink),
            wants: self.wants.clone(),
        }
    }
}

/// Ordered list of `(sink, wants)` without duplicate sinks
///
/// Not synchronized; [`Broadcaster`](super::Broadcaster) wraps it in a lock.
pub struct SourceBase<T> {
    sinks: Vec<SinkPair<T>>,
}

impl<T> SourceBase<T> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Register `sink` or update the wants of an existing registration in place
    ///
    /// Returns true if the sink was not registered before.
    pub fn add_or_update_sink(&mut self, sink: SinkRef<T>, wants: SinkWants) -> bool {
        if let Some(pair) = self.find_mut(&sink) {
            pair.wants = wants;
            return false;
        }

        self.sinks.push(SinkPair { sink, wants });
        true
    }

    /// Unregister `sink`
    ///
    /// Panics if `sink` is not registered.
    pub fn remove_sink(&mut self, sink: &SinkRef<T>) {
        let index = self
            .sinks
            .iter()
            .position(|pair| same_sink(&pair.sink, sink));

        match index {
            Some(i) => {
                self.sinks.remove(i);
            }
            None => panic!("remove_sink called for a sink that is not registered"),
        }
    }

    pub fn contains(&self, sink: &SinkRef<T>) -> bool {
        self.sinks.iter().any(|pair| same_sink(&pair.sink, sink))
    }

    /// Registered sinks in registration order
    pub fn sink_pairs(&self) -> &[SinkPair<T>] {
        &self.sinks
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Fold every sink's wants into one
    ///
    /// Limits take the strictest value, alignment the least common multiple,
    /// rotation is applied if any sink wants it. Exact resolutions are only
    /// kept when a single sink is registered.
    pub fn aggregate_wants(&self) -> SinkWants {
        let mut wants = self
            .sinks
            .iter()
            .fold(SinkWants::default(), |acc, pair| acc.merged(&pair.wants));

        if let [only] = self.sinks.as_slice() {
            wants.resolutions = only.wants.resolutions.clone();
        }

        wants
    }

    fn find_mut(&mut self, sink: &SinkRef<T>) -> Option<&mut SinkPair<T>> {
        self.sinks.iter_mut().find(|pair| same_sink(&pair.sink, sink))
    }
}

impl<T> Default for SourceBase<T> {
    fn default() -> Self {
        Self::new()
    }
}
