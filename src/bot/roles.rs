//! Admin allow-list.
//!
//! Privilege is binary: a platform user id is an admin iff it appears in
//! `bot.admin_ids` (after `ADMIN_ID_n` environment overrides). There is no role storage.

#[derive(Debug, Clone, Default)]
pub struct AdminList {
    ids: Vec<String>,
}

impl AdminList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ids: ids
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.ids.iter().any(|id| id == user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_ignored() {
        let admins = AdminList::new(["42", " ", " 7 "]);
        assert_eq!(admins.len(), 2);
        assert!(admins.is_admin("42"));
        assert!(admins.is_admin("7"));
        assert!(!admins.is_admin(""));
        assert!(!admins.is_admin("99"));
    }
}
