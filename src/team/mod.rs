//! Team roster
//!
//! Tasks refer to members by name (`Task::assignee`), not by id.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Avatar color classes handed out to new members
pub const MEMBER_COLORS: &[&str] = &[
    "bg-red-100 text-red-600",
    "bg-orange-100 text-orange-600",
    "bg-amber-100 text-amber-600",
    "bg-green-100 text-green-600",
    "bg-emerald-100 text-emerald-600",
    "bg-teal-100 text-teal-600",
    "bg-cyan-100 text-cyan-600",
    "bg-blue-100 text-blue-600",
    "bg-indigo-100 text-indigo-600",
    "bg-violet-100 text-violet-600",
    "bg-purple-100 text-purple-600",
    "bg-fuchsia-100 text-fuchsia-600",
    "bg-pink-100 text-pink-600",
    "bg-rose-100 text-rose-600",
];

/// A member of the team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub initials: String,
    #[serde(default)]
    pub color: String,
    /// Contact number used for due-date reminders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// e.g. "Leader", "Member"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl TeamMember {
    /// Create a member with derived initials and a palette color
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4().to_string(),
            initials: initials(&name),
            color: palette_color(&name).to_string(),
            name,
            phone: None,
            role: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyMemberName);
        }
        Ok(())
    }

    /// Re-derive initials and fill in a missing color
    pub fn normalize(mut self) -> Self {
        self.initials = initials(&self.name);
        if self.color.trim().is_empty() {
            self.color = palette_color(&self.name).to_string();
        }
        self
    }

    /// Whether reminders can reach this member
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// First letter of up to the first two words, upper-cased
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Stable palette pick for a name
pub fn palette_color(name: &str) -> &'static str {
    let hash = name
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_mul(31).wrapping_add(c as u32));
    MEMBER_COLORS[hash as usize % MEMBER_COLORS.len()]
}
