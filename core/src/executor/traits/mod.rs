pub mod renderer;
pub mod strategy;
pub mod worker;

pub use renderer::*;
pub use strategy::*;
pub use worker::*;
