//! Staff Model (sellers and administrators)

use serde::{Deserialize, Serialize};

/// Caller role carried by the identity token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Staff member eligible for assignment or admin notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub active: bool,
    /// Working window start, `HH:MM` in the business timezone
    pub working_from: Option<String>,
    /// Working window end, `HH:MM`; earlier than `working_from` wraps midnight
    pub working_to: Option<String>,
    pub updated_at: i64,
}

/// PUT /api/staff/{id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUpsert {
    pub name: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    pub working_from: Option<String>,
    pub working_to: Option<String>,
}

fn default_active() -> bool {
    true
}
