//! Letterbox geometry relating panel pixels to source-image pixels.

use glam::Vec2;

/// How one source frame sits inside the panel's backing canvas.
///
/// All values are in pixels. The render rectangle `(offset, render size)`
/// lies inside the panel and preserves the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelImageMapping {
    pub source_width: u32,
    pub source_height: u32,
    pub panel_width: u32,
    pub panel_height: u32,
    pub render_width: u32,
    pub render_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl PanelImageMapping {
    /// Fits a `source` sized frame into a `panel` sized canvas, scaling to the
    /// constrained dimension and centering the letterbox bars.
    ///
    /// Returns `None` if either size has a zero dimension.
    pub fn letterbox(source: (u32, u32), panel: (u32, u32)) -> Option<Self> {
        let (sw, sh) = source;
        let (pw, ph) = panel;
        if sw == 0 || sh == 0 || pw == 0 || ph == 0 {
            return None;
        }

        let source_aspect = sw as f64 / sh as f64;
        let panel_aspect = pw as f64 / ph as f64;

        let (render_width, render_height) = if source_aspect > panel_aspect {
            // Width-constrained: bars above and below.
            let rh = (pw as f64 / source_aspect).round() as u32;
            (pw, rh.clamp(1, ph))
        } else {
            // Height-constrained: bars left and right.
            let rw = (ph as f64 * source_aspect).round() as u32;
            (rw.clamp(1, pw), ph)
        };

        Some(Self {
            source_width: sw,
            source_height: sh,
            panel_width: pw,
            panel_height: ph,
            render_width,
            render_height,
            offset_x: (pw - render_width) / 2,
            offset_y: (ph - render_height) / 2,
        })
    }

    #[inline]
    pub fn panel_uv_to_panel_px(&self, uv: Vec2) -> Vec2 {
        Vec2::new(
            uv.x * self.panel_width as f32,
            uv.y * self.panel_height as f32,
        )
    }

    /// Undoes the letterbox placement. Pixels in the bars clamp to the
    /// nearest image edge.
    pub fn panel_px_to_image_uv(&self, px: Vec2) -> Vec2 {
        let u = (px.x - self.offset_x as f32) / self.render_width as f32;
        let v = (px.y - self.offset_y as f32) / self.render_height as f32;
        Vec2::new(clamp_unit(u), clamp_unit(v))
    }

    pub fn panel_uv_to_image_uv(&self, uv: Vec2) -> Vec2 {
        self.panel_px_to_image_uv(self.panel_uv_to_panel_px(uv))
    }

    /// Re-embeds an image UV into panel pixels.
    pub fn image_uv_to_panel_px(&self, image_uv: Vec2) -> Vec2 {
        Vec2::new(
            self.offset_x as f32 + image_uv.x * self.render_width as f32,
            self.offset_y as f32 + image_uv.y * self.render_height as f32,
        )
    }

    /// Whether a panel pixel falls inside the image content (not the bars).
    pub fn contains_panel_px(&self, px: Vec2) -> bool {
        let x0 = self.offset_x as f32;
        let y0 = self.offset_y as f32;
        px.x >= x0
            && px.y >= y0
            && px.x <= x0 + self.render_width as f32
            && px.y <= y0 + self.render_height as f32
    }
}

/// Clamps to `[0, 1]`, mapping NaN to 0 so a bad sample can never leak
/// through.
#[inline]
fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> PanelImageMapping {
        PanelImageMapping::letterbox((1920, 1080), (1280, 1280)).unwrap()
    }

    #[test]
    fn wide_source_in_square_panel() {
        let m = wide();
        assert_eq!(m.render_width, 1280);
        assert_eq!(m.render_height, 720);
        assert_eq!(m.offset_x, 0);
        assert_eq!(m.offset_y, 280);

        let uv = m.panel_px_to_image_uv(Vec2::new(640.0, 280.0));
        assert_eq!(uv, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn tall_source_is_height_constrained() {
        let m = PanelImageMapping::letterbox((1080, 1920), (1280, 720)).unwrap();
        assert_eq!(m.render_height, 720);
        assert_eq!(m.render_width, 405);
        assert_eq!(m.offset_x, (1280 - 405) / 2);
        assert_eq!(m.offset_y, 0);
    }

    #[test]
    fn equal_aspect_fills_panel() {
        let m = PanelImageMapping::letterbox((640, 480), (1280, 960)).unwrap();
        assert_eq!((m.render_width, m.render_height), (1280, 960));
        assert_eq!((m.offset_x, m.offset_y), (0, 0));
    }

    #[test]
    fn zero_sizes_yield_no_mapping() {
        assert!(PanelImageMapping::letterbox((0, 1080), (1280, 1280)).is_none());
        assert!(PanelImageMapping::letterbox((1920, 1080), (1280, 0)).is_none());
    }

    #[test]
    fn render_rect_never_exceeds_panel() {
        for &(sw, sh) in &[(1, 10_000), (10_000, 1), (1920, 1080), (1080, 1920), (7, 3)] {
            for &(pw, ph) in &[(1280, 1280), (1920, 1080), (3, 2), (1, 1)] {
                let m = PanelImageMapping::letterbox((sw, sh), (pw, ph)).unwrap();
                assert!(m.render_width >= 1 && m.render_width <= pw);
                assert!(m.render_height >= 1 && m.render_height <= ph);
                assert!(m.offset_x + m.render_width <= pw);
                assert!(m.offset_y + m.render_height <= ph);
            }
        }
    }

    #[test]
    fn inverse_embedding_reproduces_panel_pixel() {
        let m = wide();
        for i in 0..=20 {
            for j in 0..=20 {
                let uv = Vec2::new(i as f32 / 20.0, j as f32 / 20.0);
                let px = m.panel_uv_to_panel_px(uv);
                if !m.contains_panel_px(px) {
                    continue;
                }
                let back = m.image_uv_to_panel_px(m.panel_px_to_image_uv(px));
                assert!((back - px).length() < 1e-3, "{px} -> {back}");
            }
        }
    }

    #[test]
    fn letterbox_bars_clamp_to_edges() {
        let m = wide();
        // Top bar: rows 0..280.
        let top = m.panel_uv_to_image_uv(Vec2::new(0.3, 100.0 / 1280.0));
        assert_eq!(top.y, 0.0);
        // Bottom bar: rows 1000..1280.
        let bottom = m.panel_uv_to_image_uv(Vec2::new(0.3, 1200.0 / 1280.0));
        assert_eq!(bottom.y, 1.0);
        assert!((top.x - 0.3).abs() < 1e-6);
    }

    #[test]
    fn side_bars_clamp_horizontally() {
        let m = PanelImageMapping::letterbox((1080, 1920), (1280, 1280)).unwrap();
        assert_eq!((m.render_width, m.render_height), (720, 1280));
        assert_eq!(m.offset_x, 280);

        let left = m.panel_uv_to_image_uv(Vec2::new(100.0 / 1280.0, 0.5));
        assert_eq!(left, Vec2::new(0.0, 0.5));
        let right = m.panel_uv_to_image_uv(Vec2::new(1200.0 / 1280.0, 0.5));
        assert_eq!(right, Vec2::new(1.0, 0.5));
    }

    #[test]
    fn nan_input_clamps_to_zero() {
        let uv = wide().panel_uv_to_image_uv(Vec2::new(f32::NAN, 0.5));
        assert_eq!(uv.x, 0.0);
        assert!(!uv.y.is_nan());
    }
}
