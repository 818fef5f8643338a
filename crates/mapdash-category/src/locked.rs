use serde::{Deserialize, Serialize};

/// Category names pinned by the user, in the order they were locked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockedSet {
    names: Vec<String>,
}

impl LockedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the name was not locked yet.
    pub fn add_item(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.is_item_locked(&name).is_some() {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Returns true when at least one name was added.
    pub fn add_items<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(false, |changed, name| self.add_item(name) || changed)
    }

    pub fn reset_items<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.clear();
        self.add_items(names);
    }

    pub fn remove_item(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|locked| locked != name);
        before != self.names.len()
    }

    pub fn remove_items(&mut self) -> bool {
        let had_items = !self.names.is_empty();
        self.names.clear();
        had_items
    }

    pub fn is_item_locked(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|locked| *locked == name)
            .map(String::as_str)
    }

    pub fn items_name(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
