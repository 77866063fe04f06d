//! Library exports for the link store service
//!
//! This module exposes internal components for testing and for the binary.

pub mod admin;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod resolver;
pub mod resources;
pub mod route;
pub mod settings;
pub mod shortener;
pub mod token;
pub mod users;
