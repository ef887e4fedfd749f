pub mod archive;
pub mod cleanup;
pub mod commands;
pub mod download;
pub mod error;
pub mod http;
pub mod install;
pub mod manifest;
pub mod platform;
pub mod proxy;
pub mod release;
pub mod runtime;
