//! Configuration models shared by the view layer and the server.

pub mod config;
