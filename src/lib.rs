pub mod calibration;
pub mod config;
pub mod error;
pub mod marker;
pub mod pipeline;
pub mod pose;
pub mod projection;
pub mod render;
pub mod slicing;
pub mod video;
