pub mod access;
pub mod auth_service;
pub mod board_service;
pub mod card_service;
pub mod dashboard_service;
pub mod list_service;
pub mod organization_service;
pub mod rbac_service;
pub mod recurring_service;
pub mod time_tracking_service;
pub mod user_service;
pub mod validation;

pub use access::BoardContext;
pub use auth_service::AuthService;
pub use board_service::BoardService;
pub use card_service::CardService;
pub use dashboard_service::DashboardService;
pub use list_service::ListService;
pub use organization_service::OrganizationService;
pub use rbac_service::RbacService;
pub use recurring_service::{RecurringReport, RecurringService};
pub use time_tracking_service::TimeTrackingService;
pub use user_service::UserService;
