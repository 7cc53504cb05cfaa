pub mod symbols;
pub mod traits;

// API provider implementations
pub mod rest;
