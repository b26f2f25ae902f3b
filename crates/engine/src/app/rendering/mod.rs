mod canvas;
mod renderer;

pub use canvas::{Canvas, ALPHA_OPAQUE};
pub use renderer::Renderer;
