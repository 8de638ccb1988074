//! Command handlers

pub mod trace;
