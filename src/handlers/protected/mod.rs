// handlers/protected/mod.rs - Protected handlers (JWT + live user required)
//
// Security Level: authenticated user
// Routes: /v1/users/*, /v1/boards/*, /v1/lists/*, /v1/cards/*, /v1/dashboard/*,
//         /v1/companies/*, /v1/departments/*, /v1/roles/*, /v1/permissions/*, /v1/cron/*
// Middleware: jwt_auth_middleware, then validate_user_middleware

pub mod boards;
pub mod cards;
pub mod cron;
pub mod dashboard;
pub mod lists;
pub mod organization;
pub mod rbac;
pub mod tracking;
pub mod users;

/*
 * Request flow:
 *
 *   Authorization: Bearer <jwt>
 *     -> jwt_auth_middleware      (401 on missing, malformed or expired token)
 *     -> validate_user_middleware (401 deleted, 403 banned/disabled; injects CurrentUser)
 *     -> handler                  (Extension<CurrentUser>)
 *     -> service                  (board access, RBAC permission checks)
 *
 * Board-level access is resolved per request from the board owner's
 * organization and the caller's membership. Role permissions are checked
 * with RbacService::require_permission; admins always pass.
 */
