use crate::assets::{AssetError, ResourceCache};
use crate::AppPaths;

use super::{Canvas, InputSampler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Services a scene may use while loading. Built once by the loop runner.
pub struct LoadContext<'a> {
    pub paths: &'a AppPaths,
    pub resources: &'a mut ResourceCache,
}

pub trait Scene {
    fn load(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), AssetError>;
    fn update(&mut self, input: &InputSampler) -> SceneCommand;
    fn render(&self, canvas: &mut Canvas<'_>);
    fn unload(&mut self) {}
}
