use crate::models::user::{User, UserStatus};
use serde::{Deserialize, Serialize};

/// Status selector of the list view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn matches(&self, status: UserStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == UserStatus::Active,
            StatusFilter::Inactive => status == UserStatus::Inactive,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub status: StatusFilter,
}

impl FilterCriteria {
    pub fn new(search_term: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            search_term: search_term.into(),
            status,
        }
    }
}

/// Visible subset of `users`, in their original order.
///
/// A non-empty search term keeps users whose name or email contains it,
/// ignoring case. The status filter is ANDed on top.
pub fn filter_users(users: &[User], criteria: &FilterCriteria) -> Vec<User> {
    let needle = criteria.search_term.to_lowercase();

    users
        .iter()
        .filter(|user| {
            needle.is_empty()
                || user.name.to_lowercase().contains(&needle)
                || user.email.to_lowercase().contains(&needle)
        })
        .filter(|user| criteria.status.matches(user.status))
        .cloned()
        .collect()
}
