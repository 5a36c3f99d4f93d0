//! Raw video frames

use std::sync::Arc;

use crate::buffer::{BufferType, CropRect, PixelBuffer, PixelFormat};

/// One captured picture
///
/// Cheap to clone: the pixel buffer is shared.
#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    id: u64,
    buffer: Option<Arc<dyn PixelBuffer>>,
    timestamp_us: u64,
    crop_rect: Option<CropRect>,
}

impl VideoFrame {
    /// Create a frame around a buffer
    pub fn new(buffer: Arc<dyn PixelBuffer>, timestamp_us: u64) -> Self {
        Self {
            id: 0,
            buffer: Some(buffer),
            timestamp_us,
            crop_rect: None,
        }
    }

    /// Set the frame id
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    pub fn set_timestamp_us(&mut self, timestamp_us: u64) {
        self.timestamp_us = timestamp_us;
    }

    /// The attached pixel buffer
    pub fn buffer(&self) -> Option<&Arc<dyn PixelBuffer>> {
        self.buffer.as_ref()
    }

    /// Width of the attached buffer, 0 if none
    pub fn width(&self) -> u32 {
        self.buffer.as_ref().map_or(0, |b| b.width())
    }

    /// Height of the attached buffer, 0 if none
    pub fn height(&self) -> u32 {
        self.buffer.as_ref().map_or(0, |b| b.height())
    }

    /// Pixel count of the attached buffer, 0 if none
    pub fn size(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn buffer_type(&self) -> Option<BufferType> {
        self.buffer.as_ref().map(|b| b.buffer_type())
    }

    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.buffer.as_ref().map(|b| b.pixel_format())
    }

    /// Region of the buffer that holds the picture
    ///
    /// Defaults to the whole buffer.
    pub fn crop_rect(&self) -> CropRect {
        self.crop_rect
            .unwrap_or_else(|| CropRect::full(self.width(), self.height()))
    }

    /// Whether a crop rectangle smaller than the buffer has been set
    pub fn has_crop(&self) -> bool {
        self.crop_rect
            .map_or(false, |r| r != CropRect::full(self.width(), self.height()))
    }

    /// Restrict the picture to a sub-rectangle of the buffer
    ///
    /// Panics if the rectangle does not fit inside the buffer.
    pub fn set_rect(&mut self, rect: CropRect) {
        assert!(
            rect.fits_within(self.width(), self.height()),
            "crop rectangle {:?} is outside the {}x{} frame",
            rect,
            self.width(),
            self.height()
        );
        self.crop_rect = Some(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Planar8;

    fn frame(width: u32, height: u32) -> VideoFrame {
        VideoFrame::new(Arc::new(Planar8::create(width, height).unwrap()), 1_000)
    }

    #[test]
    fn test_accessors() {
        let frame = frame(640, 480).with_id(7);
        assert_eq!(frame.id(), 7);
        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.size(), 640 * 480);
        assert_eq!(frame.timestamp_us(), 1_000);
        assert_eq!(frame.pixel_format(), Some(PixelFormat::I420));
        assert_eq!(frame.buffer_type(), Some(BufferType::Normal));
    }

    #[test]
    fn test_empty_frame() {
        let frame = VideoFrame::default();
        assert_eq!(frame.width(), 0);
        assert_eq!(frame.height(), 0);
        assert_eq!(frame.size(), 0);
        assert!(frame.buffer().is_none());
    }

    #[test]
    fn test_crop_rect_defaults_to_full() {
        let frame = frame(320, 240);
        assert_eq!(frame.crop_rect(), CropRect::full(320, 240));
        assert!(!frame.has_crop());
    }

    #[test]
    fn test_set_rect() {
        let mut frame = frame(320, 240);
        frame.set_rect(CropRect::new(10, 10, 100, 100));
        assert_eq!(frame.crop_rect(), CropRect::new(10, 10, 100, 100));
        assert!(frame.has_crop());
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_set_rect_out_of_bounds_panics() {
        let mut frame = frame(320, 240);
        frame.set_rect(CropRect::new(300, 0, 100, 100));
    }

    #[test]
    fn test_clone_shares_buffer() {
        let a = frame(64, 64);
        let b = a.clone();
        let (pa, pb) = (a.buffer().unwrap(), b.buffer().unwrap());
        assert!(Arc::ptr_eq(pa, pb));
    }
}
