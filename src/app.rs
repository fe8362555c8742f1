//! Router assembly: public routes, the `/v1` protected API and global layers.

use axum::{
    extract::DefaultBodyLimit, http::HeaderValue, middleware::from_fn, routing::get, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};

pub fn app() -> Router {
    let settings = config::config();

    Router::new()
        // Public
        .route("/", get(handlers::public::status::root))
        .route("/health", get(handlers::public::status::health))
        .route("/v1/status", get(handlers::public::status::status))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes())
        // Global middleware
        .layer(DefaultBodyLimit::max(settings.api.max_request_size_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&settings.security.cors_origins)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if crate::is_development!() || origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
}

fn auth_public_routes() -> Router {
    use axum::routing::post;
    use handlers::public::auth;

    Router::new()
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/login", post(auth::login))
}

fn protected_routes() -> Router {
    Router::new()
        .merge(user_routes())
        .merge(board_routes())
        .merge(list_routes())
        .merge(card_routes())
        .merge(tracking_routes())
        .merge(dashboard_routes())
        .merge(organization_routes())
        .merge(rbac_routes())
        .merge(cron_routes())
        // Layers run bottom-up: the JWT is checked before the user is loaded
        .layer(from_fn(validate_user_middleware))
        .layer(from_fn(jwt_auth_middleware))
}

fn user_routes() -> Router {
    use axum::routing::{patch, put};
    use handlers::protected::users;

    Router::new()
        .route("/v1/users/me", get(users::me))
        .route("/v1/users/change-password", put(users::change_password))
        .route("/v1/users/password-status", get(users::password_status))
        .route("/v1/users/card-order", patch(users::card_order))
        .route("/v1/users", get(users::user_list).post(users::user_create))
        .route(
            "/v1/users/:id",
            get(users::user_get)
                .put(users::user_update)
                .patch(users::user_update)
                .delete(users::user_delete),
        )
        .route("/v1/users/:id/roles", get(users::user_roles).put(users::user_set_roles))
        .route(
            "/v1/users/:id/permissions",
            get(users::user_permissions).put(users::user_set_permissions),
        )
        .route("/v1/users/:id/effective-permissions", get(users::user_effective_permissions))
}

fn board_routes() -> Router {
    use axum::routing::{delete, patch, put};
    use handlers::protected::boards;

    Router::new()
        .route("/v1/boards", get(boards::board_list).post(boards::board_create))
        .route("/v1/boards/assigned", get(boards::board_assigned))
        .route("/v1/boards/order", put(boards::board_order))
        .route(
            "/v1/boards/:id",
            get(boards::board_get)
                .put(boards::board_update)
                .patch(boards::board_update)
                .delete(boards::board_delete),
        )
        .route("/v1/boards/:id/reorder", patch(boards::board_reorder))
        .route("/v1/boards/:id/view-config", patch(boards::board_view_config))
        .route("/v1/boards/:id/recurring-config", patch(boards::board_recurring_config))
        .route("/v1/boards/:id/members", get(boards::member_list).post(boards::member_add))
        .route(
            "/v1/boards/:id/members/:member_id",
            put(boards::member_update).delete(boards::member_remove),
        )
        .route("/v1/boards/:id/labels", get(boards::label_list).post(boards::label_create))
        .route("/v1/boards/:id/labels/:label_id", delete(boards::label_delete))
}

fn list_routes() -> Router {
    use axum::routing::{patch, put};
    use handlers::protected::lists;

    Router::new()
        .route("/v1/lists", get(lists::list_index).post(lists::list_create))
        .route("/v1/lists/board/:board_id", get(lists::list_by_board))
        .route(
            "/v1/lists/:id",
            get(lists::list_get)
                .put(lists::list_update)
                .patch(lists::list_update)
                .delete(lists::list_delete),
        )
        .route("/v1/lists/:id/reorder", patch(lists::list_reorder))
        .route("/v1/lists/:id/archive", put(lists::list_archive))
        .route("/v1/lists/:id/restore", put(lists::list_restore))
}

fn card_routes() -> Router {
    use axum::routing::{delete, post, put};
    use handlers::protected::cards;

    Router::new()
        .route("/v1/cards", get(cards::card_index).post(cards::card_create))
        .route("/v1/cards/user/all", get(cards::card_user_all))
        .route(
            "/v1/cards/:id",
            get(cards::card_get)
                .put(cards::card_update)
                .patch(cards::card_update)
                .delete(cards::card_delete),
        )
        .route("/v1/cards/:id/move", put(cards::card_move))
        .route("/v1/cards/:id/copy", post(cards::card_copy))
        .route("/v1/cards/:id/archive", put(cards::card_archive))
        .route("/v1/cards/:id/restore", put(cards::card_restore))
        .route("/v1/cards/:id/members", get(cards::member_list).post(cards::member_add))
        .route("/v1/cards/:id/members/:member_id", delete(cards::member_remove))
        .route(
            "/v1/cards/:id/custom-fields",
            get(cards::custom_field_list).post(cards::custom_field_add),
        )
        .route(
            "/v1/cards/:id/custom-fields/:field_name",
            put(cards::custom_field_update).delete(cards::custom_field_remove),
        )
}

fn tracking_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::tracking;

    Router::new()
        .route("/v1/cards/tracking", post(tracking::track))
        .route("/v1/cards/tracking/:card_id/history", get(tracking::history))
        .route("/v1/cards/tracking/:card_id/summary", get(tracking::summary))
        .route("/v1/cards/tracking/:card_id/reset", post(tracking::reset))
}

fn dashboard_routes() -> Router {
    use handlers::protected::dashboard;

    Router::new()
        .route("/v1/dashboard/work-statistics", get(dashboard::work_statistics))
        .route("/v1/dashboard/active-members", get(dashboard::active_members))
        .route("/v1/dashboard/chart-data", get(dashboard::chart_data))
        .route("/v1/dashboard/overview", get(dashboard::overview))
        .route("/v1/dashboard/gantt-chart", get(dashboard::gantt_chart))
}

fn organization_routes() -> Router {
    use handlers::protected::organization as org;

    Router::new()
        .route("/v1/companies", get(org::company_list).post(org::company_create))
        .route(
            "/v1/companies/:id",
            get(org::company_get).put(org::company_update).delete(org::company_delete),
        )
        .route("/v1/departments", get(org::department_list).post(org::department_create))
        .route(
            "/v1/departments/:id",
            get(org::department_get)
                .put(org::department_update)
                .delete(org::department_delete),
        )
}

fn rbac_routes() -> Router {
    use handlers::protected::rbac;

    Router::new()
        .route("/v1/roles", get(rbac::role_list).post(rbac::role_create))
        .route(
            "/v1/roles/:id",
            get(rbac::role_get).put(rbac::role_update).delete(rbac::role_delete),
        )
        .route(
            "/v1/roles/:id/permissions",
            get(rbac::role_permissions).put(rbac::role_set_permissions),
        )
        .route("/v1/permissions", get(rbac::permission_list).post(rbac::permission_create))
        .route(
            "/v1/permissions/:id",
            get(rbac::permission_get)
                .put(rbac::permission_update)
                .delete(rbac::permission_delete),
        )
}

fn cron_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::cron;

    Router::new()
        .route("/v1/cron/status", get(cron::status))
        .route("/v1/cron/trigger-recurring-cards", post(cron::trigger_recurring_cards))
}
