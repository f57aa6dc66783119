//! Screen ⇄ frame coordinate mapping under letterboxing, zoom and pan.
//!
//! The frame is first scaled to fit the container without cropping
//! (letterboxing, centered on the unconstrained axis). The resulting layer is
//! then zoomed around the letterboxed image origin and panned, as one affine
//! transform applied to the whole overlay.

use crate::constants::zoom;

/// A point in display pixels, relative to the container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in frame-native pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FramePoint {
    pub x: f32,
    pub y: f32,
}

impl FramePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in layer (letterboxed, untransformed) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Display size of the image container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

impl ContainerSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Native size of the displayed frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameGeometry {
    pub native_width: f32,
    pub native_height: f32,
}

impl FrameGeometry {
    pub fn new(native_width: f32, native_height: f32) -> Self {
        Self {
            native_width,
            native_height,
        }
    }

    /// Whether the geometry has been loaded.
    pub fn is_known(&self) -> bool {
        self.native_width > 0.0 && self.native_height > 0.0
    }
}

impl From<vxt_service::FrameSize> for FrameGeometry {
    fn from(size: vxt_service::FrameSize) -> Self {
        Self::new(size.width as f32, size.height as f32)
    }
}

/// Zoom and pan of the overlay layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Viewport {
    /// Create a viewport, clamping zoom into the allowed range.
    pub fn new(zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        Self {
            zoom: zoom.clamp(zoom::MIN, zoom::MAX),
            pan_x,
            pan_y,
        }
    }

    /// Zoom 1, no pan.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Change zoom while keeping the point under `anchor_x, anchor_y` fixed.
    ///
    /// The anchor is measured relative to the letterboxed image origin, which
    /// is the point the zoom scales around.
    pub fn zoom_around(&self, new_zoom: f32, anchor_x: f32, anchor_y: f32) -> Viewport {
        let new_zoom = new_zoom.clamp(zoom::MIN, zoom::MAX);
        let ratio = new_zoom / self.zoom;
        Viewport {
            zoom: new_zoom,
            pan_x: anchor_x - (anchor_x - self.pan_x) * ratio,
            pan_y: anchor_y - (anchor_y - self.pan_y) * ratio,
        }
    }

    pub fn pan_by(&self, dx: f32, dy: f32) -> Viewport {
        Viewport {
            zoom: self.zoom,
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}

/// Fit of the frame inside the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Letterbox {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Scale to fit without cropping, centering the padded axis.
    pub fn fit(container: ContainerSize, frame: FrameGeometry) -> Self {
        if !frame.is_known() || container.width <= 0.0 || container.height <= 0.0 {
            return Self::identity();
        }
        let container_aspect = container.width / container.height;
        let frame_aspect = frame.native_width / frame.native_height;
        let scale = if container_aspect > frame_aspect {
            container.height / frame.native_height
        } else {
            container.width / frame.native_width
        };
        Self {
            scale,
            offset_x: (container.width - frame.native_width * scale) / 2.0,
            offset_y: (container.height - frame.native_height * scale) / 2.0,
        }
    }
}

/// The affine transform applied to the overlay layer as a group:
/// `screen = layer * zoom + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTransform {
    pub zoom: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl LayerTransform {
    pub fn apply(&self, x: f32, y: f32) -> ScreenPoint {
        ScreenPoint::new(
            x * self.zoom + self.translate_x,
            y * self.zoom + self.translate_y,
        )
    }
}

/// Maps pointer positions to frame coordinates and frame boxes to the overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateTransform {
    container: ContainerSize,
    frame: FrameGeometry,
    viewport: Viewport,
}

impl CoordinateTransform {
    pub fn new(container: ContainerSize, frame: FrameGeometry, viewport: Viewport) -> Self {
        Self {
            container,
            frame,
            viewport: Viewport::new(viewport.zoom, viewport.pan_x, viewport.pan_y),
        }
    }

    pub fn container(&self) -> ContainerSize {
        self.container
    }

    pub fn frame(&self) -> FrameGeometry {
        self.frame
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_container(&mut self, container: ContainerSize) {
        self.container = container;
    }

    pub fn set_frame(&mut self, frame: FrameGeometry) {
        self.frame = frame;
    }

    pub fn letterbox(&self) -> Letterbox {
        Letterbox::fit(self.container, self.frame)
    }

    /// Whether conversions are meaningful (both sizes known).
    pub fn is_mapped(&self) -> bool {
        self.frame.is_known() && self.container.width > 0.0 && self.container.height > 0.0
    }

    /// Convert a pointer position to frame coordinates.
    pub fn screen_to_frame(&self, p: ScreenPoint) -> FramePoint {
        if !self.is_mapped() {
            return FramePoint::new(p.x, p.y);
        }
        let lb = self.letterbox();
        let v = self.viewport;
        FramePoint::new(
            ((p.x - lb.offset_x - v.pan_x) / v.zoom) / lb.scale,
            ((p.y - lb.offset_y - v.pan_y) / v.zoom) / lb.scale,
        )
    }

    /// Convert a frame point to where it appears on screen (inverse of
    /// [`screen_to_frame`](Self::screen_to_frame)).
    pub fn frame_to_screen(&self, p: FramePoint) -> ScreenPoint {
        if !self.is_mapped() {
            return ScreenPoint::new(p.x, p.y);
        }
        let layer = self.frame_to_layer(p);
        self.layer_transform().apply(layer.x, layer.y)
    }

    /// Convert a frame point to the untransformed overlay layer.
    pub fn frame_to_layer(&self, p: FramePoint) -> ScreenPoint {
        if !self.is_mapped() {
            return ScreenPoint::new(p.x, p.y);
        }
        let lb = self.letterbox();
        ScreenPoint::new(p.x * lb.scale + lb.offset_x, p.y * lb.scale + lb.offset_y)
    }

    /// Convert a frame-space box to the untransformed overlay layer.
    pub fn frame_rect_to_layer(&self, x: f32, y: f32, width: f32, height: f32) -> LayerRect {
        let top_left = self.frame_to_layer(FramePoint::new(x, y));
        let scale = if self.is_mapped() {
            self.letterbox().scale
        } else {
            1.0
        };
        LayerRect {
            x: top_left.x,
            y: top_left.y,
            width: width * scale,
            height: height * scale,
        }
    }

    /// The group transform for the overlay: zoom around the image origin, then pan.
    pub fn layer_transform(&self) -> LayerTransform {
        if !self.is_mapped() {
            return LayerTransform {
                zoom: 1.0,
                translate_x: 0.0,
                translate_y: 0.0,
            };
        }
        let lb = self.letterbox();
        let v = self.viewport;
        LayerTransform {
            zoom: v.zoom,
            translate_x: lb.offset_x * (1.0 - v.zoom) + v.pan_x,
            translate_y: lb.offset_y * (1.0 - v.zoom) + v.pan_y,
        }
    }

    /// Set the zoom, keeping the frame point under `pointer` fixed.
    pub fn zoom_at(&mut self, new_zoom: f32, pointer: ScreenPoint) {
        let lb = self.letterbox();
        self.viewport = self.viewport.zoom_around(
            new_zoom,
            pointer.x - lb.offset_x,
            pointer.y - lb.offset_y,
        );
        log::trace!("Zoom {:.2}x at ({:.0}, {:.0})", self.viewport.zoom, pointer.x, pointer.y);
    }

    /// Wheel handler: positive `notches` zoom in.
    pub fn on_wheel(&mut self, pointer: ScreenPoint, notches: f32) {
        let new_zoom = self.viewport.zoom * zoom::WHEEL_FACTOR.powf(notches);
        self.zoom_at(new_zoom, pointer);
    }

    /// Drag handler for panning.
    pub fn on_pan(&mut self, dx: f32, dy: f32) {
        self.viewport = self.viewport.pan_by(dx, dy);
    }

    /// Double-click handler.
    pub fn reset_viewport(&mut self) {
        self.viewport = Viewport::identity();
        log::debug!("Viewport reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn hd_in(width: f32, height: f32) -> CoordinateTransform {
        CoordinateTransform::new(
            ContainerSize::new(width, height),
            FrameGeometry::new(1920.0, 1080.0),
            Viewport::identity(),
        )
    }

    #[test]
    fn test_letterbox_pads_vertically() {
        let lb = hd_in(800.0, 600.0).letterbox();
        assert!((lb.scale - 0.41667).abs() < 1e-4);
        assert!(approx_eq(lb.offset_x, 0.0));
        assert!(approx_eq(lb.offset_y, 75.0));
    }

    #[test]
    fn test_letterbox_exact_fit() {
        let lb = hd_in(960.0, 540.0).letterbox();
        assert_eq!(lb.scale, 0.5);
        assert_eq!(lb.offset_x, 0.0);
        assert_eq!(lb.offset_y, 0.0);
    }

    #[test]
    fn test_letterbox_pads_horizontally() {
        let lb = hd_in(1000.0, 270.0).letterbox();
        assert!(approx_eq(lb.scale, 0.25));
        assert!(approx_eq(lb.offset_x, 260.0));
        assert!(approx_eq(lb.offset_y, 0.0));
    }

    #[test]
    fn test_unknown_geometry_is_identity() {
        let mut t = CoordinateTransform::new(
            ContainerSize::new(800.0, 600.0),
            FrameGeometry::default(),
            Viewport::new(3.0, 40.0, -10.0),
        );
        assert_eq!(t.letterbox(), Letterbox::identity());
        let p = ScreenPoint::new(123.0, 45.0);
        assert_eq!(t.screen_to_frame(p), FramePoint::new(123.0, 45.0));
        assert_eq!(t.frame_to_screen(FramePoint::new(7.0, 8.0)), ScreenPoint::new(7.0, 8.0));

        t.set_frame(FrameGeometry::new(0.0, 1080.0));
        assert_eq!(t.screen_to_frame(p), FramePoint::new(123.0, 45.0));
    }

    #[test]
    fn test_screen_to_frame_formula() {
        let t = CoordinateTransform::new(
            ContainerSize::new(800.0, 600.0),
            FrameGeometry::new(1920.0, 1080.0),
            Viewport::new(2.0, 10.0, 20.0),
        );
        let lb = t.letterbox();
        let f = t.screen_to_frame(ScreenPoint::new(400.0, 300.0));
        assert!(approx_eq(f.x, ((400.0 - lb.offset_x - 10.0) / 2.0) / lb.scale));
        assert!(approx_eq(f.y, ((300.0 - lb.offset_y - 20.0) / 2.0) / lb.scale));
    }

    #[test]
    fn test_round_trip_over_zoom_and_pan() {
        let sizes = [
            ((800.0, 600.0), (1920.0, 1080.0)),
            ((640.0, 640.0), (1280.0, 720.0)),
            ((300.0, 900.0), (640.0, 480.0)),
        ];
        let zooms = [1.0, 1.5, 2.75, 5.0];
        let pans = [(-40.0, 0.0), (0.0, 0.0), (13.0, -7.0), (250.0, 120.0)];

        for ((cw, ch), (fw, fh)) in sizes {
            for z in zooms {
                for (px, py) in pans {
                    let t = CoordinateTransform::new(
                        ContainerSize::new(cw, ch),
                        FrameGeometry::new(fw, fh),
                        Viewport::new(z, px, py),
                    );
                    for (sx, sy) in [(0.0, 0.0), (cw / 3.0, ch / 2.0), (cw, ch)] {
                        let screen = ScreenPoint::new(sx, sy);
                        let back = t.frame_to_screen(t.screen_to_frame(screen));
                        assert!(
                            approx_eq(back.x, sx) && approx_eq(back.y, sy),
                            "round trip failed for zoom {z} pan ({px},{py}): {screen:?} -> {back:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_zoom_keeps_point_under_pointer() {
        let mut t = CoordinateTransform::new(
            ContainerSize::new(800.0, 600.0),
            FrameGeometry::new(1920.0, 1080.0),
            Viewport::new(1.5, 30.0, -12.0),
        );
        let pointer = ScreenPoint::new(520.0, 260.0);
        let before = t.screen_to_frame(pointer);

        t.zoom_at(3.2, pointer);
        let after = t.screen_to_frame(pointer);

        assert!(approx_eq(t.viewport().zoom, 3.2));
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_wheel_zoom_is_anchored_and_clamped() {
        let mut t = hd_in(800.0, 600.0);
        let pointer = ScreenPoint::new(100.0, 500.0);
        let before = t.screen_to_frame(pointer);

        for _ in 0..40 {
            t.on_wheel(pointer, 1.0);
        }
        assert_eq!(t.viewport().zoom, zoom::MAX);
        let after = t.screen_to_frame(pointer);
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));

        for _ in 0..80 {
            t.on_wheel(pointer, -1.0);
        }
        assert_eq!(t.viewport().zoom, zoom::MIN);
    }

    #[test]
    fn test_viewport_zoom_is_clamped() {
        assert_eq!(Viewport::new(0.2, 0.0, 0.0).zoom, 1.0);
        assert_eq!(Viewport::new(9.0, 0.0, 0.0).zoom, 5.0);
        assert_eq!(Viewport::identity().zoom_around(12.0, 0.0, 0.0).zoom, 5.0);
    }

    #[test]
    fn test_reset_viewport() {
        let mut t = hd_in(800.0, 600.0);
        t.on_pan(25.0, -5.0);
        t.zoom_at(2.0, ScreenPoint::new(10.0, 10.0));
        t.reset_viewport();
        assert_eq!(t.viewport(), Viewport::identity());
    }

    #[test]
    fn test_layer_rect_uses_letterbox_only() {
        let mut t = hd_in(800.0, 600.0);
        t.on_pan(100.0, 100.0);
        t.zoom_at(2.0, ScreenPoint::new(0.0, 0.0));
        let rect = t.frame_rect_to_layer(0.0, 0.0, 1920.0, 1080.0);
        assert!(approx_eq(rect.x, 0.0));
        assert!(approx_eq(rect.y, 75.0));
        assert!(approx_eq(rect.width, 800.0));
        assert!(approx_eq(rect.height, 450.0));
    }
}
