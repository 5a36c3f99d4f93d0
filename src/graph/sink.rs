//! Sink and source traits

use std::sync::Arc;

/// Receives frames of type `T`
pub trait Sink<T>: Send + Sync {
    fn on_frame(&self, frame: T);
}

/// Shared handle to a sink; identity is the allocation it points to
pub type SinkRef<T> = Arc<dyn Sink<T>>;

/// Produces frames of type `T` for registered sinks
pub trait Source<T>: Send + Sync {
    /// Register `sink`, or update its wants if it is already registered
    fn add_or_update_sink(&self, sink: SinkRef<T>, wants: SinkWants);

    /// Unregister `sink`
    ///
    /// Panics if the sink was never registered.
    fn remove_sink(&self, sink: &SinkRef<T>);
}

/// Whether two handles point at the same sink
pub fn same_sink<T>(a: &SinkRef<T>, b: &SinkRef<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// What a sink would like a source to deliver
///
/// Sources are free to ignore these; they are hints used to adapt capture
/// resolution and frame rate to what consumers can use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkWants {
    /// The sink wants frames already rotated upright
    pub rotation_applied: bool,
    /// Upper bound on pixels per frame
    pub max_pixel_count: u64,
    /// Preferred pixels per frame, if the sink has a preference
    pub target_pixel_count: Option<u64>,
    /// Upper bound on frames per second
    pub max_framerate_fps: u32,
    /// Width and height should be multiples of this
    pub resolution_alignment: u32,
    /// Exact resolutions the sink would like to receive
    pub resolutions: Vec<(u32, u32)>,
}

impl Default for SinkWants {
    fn default() -> Self {
        Self {
            rotation_applied: false,
            max_pixel_count: u64::MAX,
            target_pixel_count: None,
            max_framerate_fps: u32::MAX,
            resolution_alignment: 1,
            resolutions: Vec::new(),
        }
    }
}

impl SinkWants {
    /// Set the pixel-count limit
    pub fn max_pixel_count(mut self, pixels: u64) -> Self {
        self.max_pixel_count = pixels;
        self
    }

    /// Set the preferred pixel count
    pub fn target_pixel_count(mut self, pixels: u64) -> Self {
        self.target_pixel_count = Some(pixels);
        self
    }

    /// Set the frame-rate limit
    pub fn max_framerate(mut self, fps: u32) -> Self {
        self.max_framerate_fps = fps;
        self
    }

    /// Require frames rotated upright
    pub fn rotation_applied(mut self, applied: bool) -> Self {
        self.rotation_applied = applied;
        self
    }

    /// Set the resolution alignment (0 is treated as 1)
    pub fn resolution_alignment(mut self, alignment: u32) -> Self {
        self.resolution_alignment = alignment.max(1);
        self
    }

    /// Add a requested resolution
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolutions.push((width, height));
        self
    }

    /// Combine two sets of wants, keeping the stricter constraint of each
    ///
    /// Exact resolutions are not merged; the result has none.
    pub fn merged(&self, other: &SinkWants) -> SinkWants {
        let max_pixel_count = self.max_pixel_count.min(other.max_pixel_count);
        let target_pixel_count = match (self.target_pixel_count, other.target_pixel_count) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
        .map(|target| target.min(max_pixel_count));

        SinkWants {
            rotation_applied: self.rotation_applied || other.rotation_applied,
            max_pixel_count,
            target_pixel_count,
            max_framerate_fps: self.max_framerate_fps.min(other.max_framerate_fps),
            resolution_alignment: lcm(self.resolution_alignment, other.resolution_alignment),
            resolutions: Vec::new(),
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Saturates at `u32::MAX` for alignments whose product does not fit
fn lcm(a: u32, b: u32) -> u32 {
    let (a, b) = (a.max(1), b.max(1));
    (a / gcd(a, b)).saturating_mul(b)
}
