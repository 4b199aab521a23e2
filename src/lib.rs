pub mod api;
pub mod config;
pub mod listview;
pub mod model;
pub mod nav;
pub mod notice;
pub mod screens;
pub mod session;
pub mod stats;
pub mod validate;
