use serde::{Deserialize, Serialize};

/// 登录角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Organization,
    Admin,
}

impl Role {
    /// 登录后的落地页
    pub fn landing_route(self) -> &'static str {
        match self {
            Role::Student => "/student/dashboard",
            Role::Organization => "/organization/dashboard",
            Role::Admin => "/admin/dashboard",
        }
    }
}
