//! A headless drawing surface.

use heks_engine::DrawSurface;
use heks_math::Bounds;
use tracing::{debug, trace};

/// Stands in for a canvas: images are just their paths and every draw call is
/// logged and counted.
#[derive(Debug)]
pub struct LogSurface {
    scale: f32,
    draw_calls: u64,
}

impl LogSurface {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            draw_calls: 0,
        }
    }

    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }
}

impl DrawSurface for LogSurface {
    type Image = String;

    fn load_image(&mut self, path: &str) -> anyhow::Result<String> {
        debug!(path, "loading image");
        Ok(path.to_string())
    }

    fn draw_image(
        &mut self,
        image: &String,
        source: Bounds,
        destination: Bounds,
    ) -> anyhow::Result<()> {
        self.draw_calls += 1;
        trace!(
            image = image.as_str(),
            sx = source.x,
            sy = source.y,
            x = destination.x * self.scale,
            y = destination.y * self.scale,
            "draw image"
        );
        Ok(())
    }

    fn clear_rect(&mut self, rect: Bounds) {
        trace!(x = rect.x, y = rect.y, width = rect.width, height = rect.height, "clear");
    }

    fn fill_rect(&mut self, rect: Bounds, color: &str) {
        trace!(color, width = rect.width, height = rect.height, "fill");
    }
}
