//! Soundshader library - live audio spectrum feeding a fragment shader

pub mod audio;
pub mod cli;
pub mod controls;
pub mod error;
pub mod params;
pub mod rendering;
