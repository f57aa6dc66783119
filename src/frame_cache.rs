//! Decoded frame images and a bounded in-memory cache for them.

use std::collections::{HashMap, VecDeque};

use vxt_service::Sequence;

use crate::constants::DEFAULT_FRAME_CACHE_SIZE;

/// A decoded frame as RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for FrameImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

impl FrameImage {
    /// Decode an encoded image (JPEG, PNG, ...) into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}

/// Cache key: the sequence id plus the exact timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    sequence_id: String,
    timestamp_bits: u64,
}

impl FrameKey {
    pub fn new(sequence: &Sequence, timestamp: f64) -> Self {
        Self {
            sequence_id: sequence.sequence_id(),
            timestamp_bits: timestamp.to_bits(),
        }
    }
}

/// Frames fetched earlier in the session, evicted oldest-first.
#[derive(Debug)]
pub struct FrameCache {
    capacity: usize,
    frames: HashMap<FrameKey, FrameImage>,
    order: VecDeque<FrameKey>,
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_CACHE_SIZE)
    }
}

impl FrameCache {
    /// Create a cache holding at most `capacity` frames (0 disables caching).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            frames: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &FrameKey) -> Option<&FrameImage> {
        self.frames.get(key)
    }

    pub fn contains(&self, key: &FrameKey) -> bool {
        self.frames.contains_key(key)
    }

    pub fn insert(&mut self, key: FrameKey, frame: FrameImage) {
        if self.capacity == 0 {
            return;
        }
        if self.frames.insert(key.clone(), frame).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.frames.remove(&oldest);
                log::trace!("Evicted frame {oldest:?}");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame(width: u32) -> FrameImage {
        FrameImage {
            width,
            height: 1,
            rgba: vec![0; width as usize * 4],
        }
    }

    fn key(ts: f64) -> FrameKey {
        FrameKey::new(&Sequence::new("vs", "cam", "Undefined"), ts)
    }

    #[test]
    fn test_decode_png() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = FrameImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(&decoded.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(FrameImage::decode(b"not an image").is_err());
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = FrameCache::new(2);
        cache.insert(key(1.0), frame(1));
        cache.insert(key(2.0), frame(2));
        cache.insert(key(3.0), frame(3));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(1.0)));
        assert_eq!(cache.get(&key(3.0)).map(|f| f.width), Some(3));
    }

    #[test]
    fn test_reinsert_does_not_duplicate() {
        let mut cache = FrameCache::new(2);
        cache.insert(key(1.0), frame(1));
        cache.insert(key(1.0), frame(5));
        cache.insert(key(2.0), frame(2));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key(1.0)).map(|f| f.width), Some(5));
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut cache = FrameCache::new(0);
        cache.insert(key(1.0), frame(1));
        assert!(cache.is_empty());
    }
}
