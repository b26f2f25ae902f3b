mod geometry;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use geometry::{Rect, Vec2};
pub use input::{InputSampler, MouseButton, PointerState};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{Canvas, Renderer, ALPHA_OPAQUE};
pub use scene::{LoadContext, Scene, SceneCommand};
