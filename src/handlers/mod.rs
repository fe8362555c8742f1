// handlers/mod.rs - 2-Tier Handler Architecture
//
// Public (no auth) -> Protected (JWT + live user)
//
// Admin-only and permission-gated endpoints sit in the protected tier and
// check the caller inside the handler or service.
pub mod public;    // Tier 1: /, /health, /v1/status, /v1/auth/*
pub mod protected; // Tier 2: everything else under /v1

// Layout:
//
// src/handlers/
// ├── mod.rs              <- this file
// ├── public/
// │   ├── auth.rs         <- POST /v1/auth/register, /v1/auth/login
// │   └── status.rs       <- GET /, /health, /v1/status
// └── protected/
//     ├── boards.rs       <- /v1/boards/*
//     ├── lists.rs        <- /v1/lists/*
//     ├── cards.rs        <- /v1/cards/*
//     ├── tracking.rs     <- /v1/cards/tracking/*
//     ├── users.rs        <- /v1/users/*
//     ├── dashboard.rs    <- /v1/dashboard/*
//     ├── organization.rs <- /v1/companies/*, /v1/departments/*
//     ├── rbac.rs         <- /v1/roles/*, /v1/permissions/*
//     └── cron.rs         <- /v1/cron/*
//
// Routes are assembled in src/app.rs, one function per resource.
