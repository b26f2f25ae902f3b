mod controller;
mod model;
mod scene;

pub(crate) use scene::{BoardConfig, BoardScene};
