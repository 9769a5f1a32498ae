use serde::{Deserialize, Serialize};

/// The signed-in account as returned by `GET /user/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email_id: String,
    #[serde(default)]
    pub name: Option<String>,
}
