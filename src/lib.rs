pub mod camera;
pub mod canvas;
pub mod clip;
pub mod config;
pub mod frame_loop;
pub mod geometry;
pub mod host;
pub mod logging;
pub mod material;
pub mod orbit;
pub mod panel;
pub mod scene;
pub mod views;
