//! HTTP route handlers

pub mod templates;
