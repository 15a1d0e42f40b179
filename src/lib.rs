#![forbid(unsafe_code)]

pub mod attachment;
pub mod catalogue;
pub mod config;
pub mod license;
pub mod logging;
pub mod metadata;
pub mod records;
pub mod render;
pub mod shorturl;
pub mod text;
