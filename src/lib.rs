pub mod api;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;
pub mod panorama;
pub mod store;
pub mod ui;
pub mod utils;
