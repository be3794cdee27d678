// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::Mutex;

/// A thread-safe LIFO stack of reclaimed identifiers.
///
/// Every operation takes a single lock, so concurrent pops never hand out the same
/// identifier twice and a batch push is observed all at once.
///
/// # Examples
///
/// ```
/// use linkcache_ids::IdStack;
///
/// let stack = IdStack::new();
/// stack.push_batch(["a".to_owned(), "b".to_owned()]);
/// stack.push("c".to_owned());
///
/// assert_eq!(stack.pop().as_deref(), Some("c"));
/// assert_eq!(stack.pop().as_deref(), Some("b"));
/// assert_eq!(stack.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct IdStack {
    items: Mutex<Vec<String>>,
}

impl IdStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty stack with room for `capacity` identifiers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Pushes one identifier on top.
    pub fn push(&self, id: String) {
        self.items.lock().push(id);
    }

    /// Pushes identifiers in order, so the last one ends up on top.
    pub fn push_batch(&self, ids: impl IntoIterator<Item = String>) {
        self.items.lock().extend(ids);
    }

    /// Removes and returns the most recently pushed identifier.
    #[must_use]
    pub fn pop(&self) -> Option<String> {
        self.items.lock().pop()
    }

    /// Returns the number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if there are no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn pop_on_empty_returns_none() {
        let stack = IdStack::with_capacity(4);
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn pops_in_reverse_push_order() {
        let stack = IdStack::new();
        for id in ["a", "b", "c"] {
            stack.push(id.to_owned());
        }

        let popped: Vec<_> = std::iter::from_fn(|| stack.pop()).collect();
        assert_eq!(popped, ["c", "b", "a"]);
    }

    #[test]
    fn concurrent_pops_never_duplicate() {
        let stack = IdStack::new();
        stack.push_batch((0..10_000).map(|i| format!("id{i}")));

        let popped: Vec<Vec<String>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| std::iter::from_fn(|| stack.pop()).collect::<Vec<_>>()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let all: Vec<_> = popped.into_iter().flatten().collect();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 10_000);
        assert_eq!(unique.len(), 10_000);
        assert!(stack.is_empty());
    }
}
