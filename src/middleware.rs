// src/middleware.rs

pub mod actor;
pub mod extract;
