/// Shared domain enums used across the codebase
///
/// Values are stored as plain text columns; these types give them a closed set
/// of variants on the Rust side and a single place that knows the wire spelling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Organizational role of a user. Drives which boards a user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Staff,
    Manager,
    Boss,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Staff => "staff",
            UserType::Manager => "manager",
            UserType::Boss => "boss",
            UserType::Admin => "admin",
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(UserType::Staff),
            "manager" => Ok(UserType::Manager),
            "boss" => Ok(UserType::Boss),
            "admin" => Ok(UserType::Admin),
            other => Err(format!("Unknown user type '{}'", other)),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status; only `online` users may call protected endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Banned,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "online",
            UserStatus::Banned => "banned",
            UserStatus::Disabled => "disabled",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(UserStatus::Online),
            "banned" => Ok(UserStatus::Banned),
            "disabled" => Ok(UserStatus::Disabled),
            other => Err(format!("Unknown user status '{}'", other)),
        }
    }
}

/// Role of a user on a board or a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
            MemberRole::Viewer => "viewer",
        }
    }

    /// Owners and admins manage the board itself.
    pub fn is_manager(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            "viewer" => Ok(MemberRole::Viewer),
            other => Err(format!("Unknown member role '{}'", other)),
        }
    }
}

/// Card workflow states
pub mod card_status {
    pub const TODO: &str = "todo";
    pub const IN_PROGRESS: &str = "inProgress";
    pub const DONE: &str = "done";
    pub const COMPLETED: &str = "completed";

    /// `completed` is a legacy spelling of `done`
    pub fn is_complete(status: &str) -> bool {
        status == DONE || status == COMPLETED
    }
}

pub const CARD_PRIORITIES: [&str; 3] = ["low", "medium", "high"];

pub const COMPANY_SIZES: [&str; 5] = ["startup", "small", "medium", "large", "enterprise"];
