//! Framework-facing abstractions the view layer depends on.

pub mod controller;
pub mod naming;
