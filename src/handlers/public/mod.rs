// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Routes: /, /health, /v1/status, /v1/auth/*
// Middleware: global layers only (trace, CORS, body limit)

pub mod auth;
pub mod status;
