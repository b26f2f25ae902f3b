use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{Scene, Vec2};

use super::Canvas;

/// Presents a fixed-size frame buffer, scaled to whatever surface the window
/// currently has.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    buffer_width: u32,
    buffer_height: u32,
}

impl Renderer {
    pub fn new(window: Arc<Window>, buffer_width: u32, buffer_height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(
            Arc::clone(&window),
            buffer_width,
            buffer_height,
            size.width,
            size.height,
        )?;
        Ok(Self {
            window,
            pixels,
            buffer_width,
            buffer_height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(
            Arc::clone(&self.window),
            self.buffer_width,
            self.buffer_height,
            width,
            height,
        )?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        buffer_width: u32,
        buffer_height: u32,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(buffer_width, buffer_height, surface)
    }

    /// Maps a physical window position to frame-buffer pixels. Positions
    /// outside the buffer map to out-of-range coordinates rather than being
    /// clamped, so they never hit anything drawn at the edges.
    pub fn window_to_buffer(&self, x: f32, y: f32) -> Vec2 {
        match self.pixels.window_pos_to_pixel((x, y)) {
            Ok((px, py)) => Vec2::new(px as f32, py as f32),
            Err((px, py)) => Vec2::new(px as f32, py as f32),
        }
    }

    pub fn render_scene(&mut self, scene: &dyn Scene, clear_color: [u8; 4]) -> Result<(), Error> {
        let frame = self.pixels.frame_mut();
        let mut canvas = Canvas::new(frame, self.buffer_width, self.buffer_height);
        canvas.clear(clear_color);
        scene.render(&mut canvas);
        self.pixels.render()
    }
}
