use serde::Serialize;

use crate::domain::{User, UserRole};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub search_text: Option<String>,
    pub role: Option<UserRole>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| role != user.role) {
            return false;
        }

        let Some(needle) = self
            .search_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
        else {
            return true;
        };

        [Some(user.username.as_str()), Some(user.email.as_str()), user.rank.as_deref()]
            .into_iter()
            .flatten()
            .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

pub fn filter_users<'a>(users: &'a [User], filter: &UserFilter) -> Vec<&'a User> {
    users.iter().filter(|user| filter.matches(user)).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub admins: usize,
    pub managers: usize,
    pub users: usize,
}

pub fn count_by_role(users: &[User]) -> RoleCounts {
    users.iter().fold(RoleCounts::default(), |mut counts, user| {
        match user.role {
            UserRole::Admin => counts.admins += 1,
            UserRole::Manager => counts.managers += 1,
            UserRole::User => counts.users += 1,
        }
        counts
    })
}
