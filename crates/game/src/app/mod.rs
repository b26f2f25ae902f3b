pub(crate) mod board;
pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
