use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::Role;

/// A login identity. The stored password hash never leaves the repository layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub created_at: Option<NaiveDateTime>,
}
