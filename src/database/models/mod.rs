pub mod board;
pub mod card;
pub mod list;
pub mod member;
pub mod organization;
pub mod rbac;
pub mod time_tracking;
pub mod user;

pub use board::{Board, BoardSummary, Label};
pub use card::{Card, CardWithBoard};
pub use list::List;
pub use member::{CardMemberRow, MemberView};
pub use organization::{Company, Department};
pub use rbac::{Permission, Role};
pub use time_tracking::TimeTrackingEntry;
pub use user::User;
