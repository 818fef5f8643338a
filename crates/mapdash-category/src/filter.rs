use serde::{Deserialize, Serialize};

/// Accept/reject bookkeeping for one categorical column.
///
/// `accepted` and `rejected` never share a name. A name that appears in
/// neither is accepted, unless `reject_all` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    accepted: Vec<String>,
    rejected: Vec<String>,
    reject_all: bool,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            self.rejected.retain(|rejected| *rejected != name);
            if !self.accepted.contains(&name) {
                self.accepted.push(name);
            }
        }
    }

    pub fn reject<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            self.accepted.retain(|accepted| *accepted != name);
            if !self.rejected.contains(&name) {
                self.rejected.push(name);
            }
        }
    }

    pub fn accept_all(&mut self) {
        self.rejected.clear();
        self.reject_all = false;
    }

    pub fn reject_all(&mut self) {
        self.accepted.clear();
        self.reject_all = true;
    }

    /// Drop every accepted and rejected name and the reject-all flag.
    pub fn clean_filter(&mut self) {
        self.accepted.clear();
        self.rejected.clear();
        self.reject_all = false;
    }

    pub fn is_rejected(&self, name: &str) -> bool {
        if self.rejected.iter().any(|rejected| rejected == name) {
            return true;
        }
        self.reject_all && !self.is_explicitly_accepted(name)
    }

    pub fn is_accepted(&self, name: &str) -> bool {
        !self.is_rejected(name)
    }

    fn is_explicitly_accepted(&self, name: &str) -> bool {
        self.accepted.iter().any(|accepted| accepted == name)
    }

    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn is_reject_all(&self) -> bool {
        self.reject_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_then_reject_moves_name() {
        let mut filter = FilterState::new();
        filter.accept(["a", "b"]);
        filter.reject(["b"]);

        assert_eq!(filter.accepted(), ["a".to_string()]);
        assert_eq!(filter.rejected(), ["b".to_string()]);
        assert!(filter.is_accepted("a"));
        assert!(filter.is_rejected("b"));
        assert!(filter.is_accepted("unknown"));
    }

    #[test]
    fn accepting_twice_is_idempotent() {
        let mut filter = FilterState::new();
        filter.accept(["a"]);
        filter.accept(vec!["a".to_string()]);
        assert_eq!(filter.accepted_count(), 1);
    }

    #[test]
    fn reject_all_keeps_explicit_accepts_out() {
        let mut filter = FilterState::new();
        filter.accept(["a"]);
        filter.reject_all();

        assert!(filter.is_reject_all());
        assert_eq!(filter.accepted_count(), 0);
        assert!(filter.is_rejected("a"));

        filter.accept(["c"]);
        assert!(filter.is_accepted("c"));
        assert!(filter.is_rejected("d"));
    }

    #[test]
    fn accept_all_clears_rejections() {
        let mut filter = FilterState::new();
        filter.reject(["a", "b"]);
        filter.reject_all();
        filter.accept_all();

        assert!(!filter.is_reject_all());
        assert_eq!(filter.rejected_count(), 0);
        assert!(filter.is_accepted("a"));
    }

    #[test]
    fn clean_filter_resets_everything() {
        let mut filter = FilterState::new();
        filter.accept(["a"]);
        filter.reject(["b"]);
        filter.reject_all();
        filter.clean_filter();
        assert_eq!(filter, FilterState::default());
    }
}
