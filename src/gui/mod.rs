pub mod app;
pub mod camera_grid;
pub mod carousel;
pub mod controls;

#[cfg(test)]
mod camera_grid_test;

pub use app::*;
