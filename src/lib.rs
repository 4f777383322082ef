//! Plex playlist manager - shared modules for all binaries.

pub mod catalog;
pub mod config;
pub mod editor;
pub mod filter;
pub mod input;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod plex;
pub mod progress;
pub mod scoring;
