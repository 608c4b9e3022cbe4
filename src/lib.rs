//! AR Coloring Studio
//!
//! A desktop studio for AR coloring books:
//! - 3D model viewer with orbit controls, texture swapping and PNG screenshots
//! - Live camera view with a capture-and-retexture pipeline (page detection,
//!   rectification, lighting normalization)
//! - Guided tutorial for preparing custom model + texture pairs
//! - Ordered preload of the AR runtime's asset files

pub mod app;
pub mod ar;
pub mod assets;
pub mod bootstrap;
pub mod camera;
pub mod config;
pub mod export;
pub mod render;
pub mod tutorial;
pub mod ui;
pub mod viewer;
pub mod vision;
