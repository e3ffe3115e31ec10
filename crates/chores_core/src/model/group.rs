use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A household sharing one chore list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub admin: String,
    #[serde(default)]
    pub members: Vec<String>,
    /// Points earned per member by completing chores.
    #[serde(default)]
    pub scores: BTreeMap<String, u32>,
}

impl Group {
    pub fn is_admin(&self, user: &str) -> bool {
        self.admin == user.trim()
    }

    pub fn is_member(&self, user: &str) -> bool {
        let user = user.trim();
        self.admin == user || self.members.iter().any(|member| member == user)
    }
}
