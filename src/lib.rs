//! An image labelling tool: boxes for detection, ellipses for segmentation.

pub mod app;
pub mod config;
pub mod error;
pub mod format;
pub mod geometry;
pub mod interaction;
pub mod render;
pub mod session;
pub mod shape;
pub mod store;
pub mod viewport;
