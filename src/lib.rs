pub mod banner;
pub mod commands;
pub mod config;
pub mod consts;
pub mod editor;
pub mod effects;
pub mod events;
pub mod export;
pub mod history;
pub mod job;
pub mod probe;
pub mod session;
pub mod spinner;
pub mod upload;
