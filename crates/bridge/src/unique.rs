//! Name-based deduplication of symbol lists.

/// Anything listed by name in facade results.
pub trait Named {
    fn name(&self) -> String;
}

/// Drops every entry whose name was already seen, keeping the first
/// occurrence and the relative order of the survivors. Lists are short, a
/// pairwise scan is enough.
pub fn ensure_unique<T: Named>(items: Vec<T>) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let name = item.name();
        if !kept.iter().any(|k| k.name() == name) {
            kept.push(item);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag(&'static str, u32);

    impl Named for Tag {
        fn name(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn keeps_first_occurrences_in_order() {
        let items = vec![Tag("b", 1), Tag("a", 2), Tag("b", 3), Tag("c", 4), Tag("a", 5)];
        let unique = ensure_unique(items);
        assert_eq!(unique, vec![Tag("b", 1), Tag("a", 2), Tag("c", 4)]);
    }

    #[test]
    fn is_idempotent() {
        let items = vec![Tag("x", 1), Tag("x", 2), Tag("y", 3)];
        let once = ensure_unique(items);
        let twice = ensure_unique(once.clone());
        assert_eq!(once, twice);
        assert!(ensure_unique(Vec::<Tag>::new()).is_empty());
    }
}
