//! Ordered, de-duplicated mail list.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::identifiers::MailId;

use super::item::MailListItem;

// ============================================================================
// MailFeed
// ============================================================================

/// Mail list items keyed and ordered by id.
#[derive(Debug, Clone, Default)]
pub struct MailFeed {
    items: BTreeMap<MailId, MailListItem>,
}

impl MailFeed {
    /// Creates an empty feed.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges fetched items and returns how many ids were new.
    ///
    /// Items already present are replaced with the fetched copy.
    pub fn merge<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = MailListItem>,
    {
        let mut added = 0;
        for item in items {
            match self.items.entry(item.id) {
                Entry::Vacant(slot) => {
                    slot.insert(item);
                    added += 1;
                }
                Entry::Occupied(mut slot) => {
                    slot.insert(item);
                }
            }
        }
        added
    }

    /// Returns the item with the given id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: MailId) -> Option<&MailListItem> {
        self.items.get(&id)
    }

    /// Returns `true` if the id is known.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: MailId) -> bool {
        self.items.contains_key(&id)
    }

    /// Returns the highest known id.
    #[must_use]
    pub fn newest_id(&self) -> Option<MailId> {
        self.items.keys().next_back().copied()
    }

    /// Returns the lowest known id.
    #[must_use]
    pub fn oldest_id(&self) -> Option<MailId> {
        self.items.keys().next().copied()
    }

    /// Iterates items from newest to oldest.
    pub fn newest_first(&self) -> impl Iterator<Item = &MailListItem> {
        self.items.values().rev()
    }

    /// Returns the number of items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the feed is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn item(id: i64) -> MailListItem {
        MailListItem {
            id: MailId::new(id),
            created_at: None,
            from: Vec::new(),
            sender_header: None,
            to: Vec::new(),
            subject: Some(format!("mail {id}")),
        }
    }

    #[test]
    fn test_merge_counts_only_new_ids() {
        let mut feed = MailFeed::new();
        assert_eq!(feed.merge([item(3), item(1)]), 2);
        assert_eq!(feed.merge([item(3), item(2)]), 1);
        assert_eq!(feed.len(), 3);
    }

    #[test]
    fn test_merge_replaces_existing_copy() {
        let mut feed = MailFeed::new();
        feed.merge([item(1)]);

        let mut updated = item(1);
        updated.subject = Some("edited".into());
        assert_eq!(feed.merge([updated]), 0);

        assert_eq!(
            feed.get(MailId::new(1)).and_then(|i| i.subject.as_deref()),
            Some("edited")
        );
    }

    #[test]
    fn test_bounds_and_order() {
        let mut feed = MailFeed::new();
        assert_eq!(feed.newest_id(), None);
        assert_eq!(feed.oldest_id(), None);

        feed.merge([item(5), item(9), item(2)]);

        assert_eq!(feed.newest_id(), Some(MailId::new(9)));
        assert_eq!(feed.oldest_id(), Some(MailId::new(2)));
        assert!(feed.contains(MailId::new(5)));
        assert_eq!(
            feed.newest_first().map(|i| i.id.as_i64()).collect::<Vec<_>>(),
            vec![9, 5, 2]
        );
    }

    proptest! {
        #[test]
        fn prop_feed_is_unique_and_descending(ids in proptest::collection::vec(0i64..50, 0..40)) {
            let mut feed = MailFeed::new();
            let added = feed.merge(ids.iter().copied().map(item));

            let mut unique = ids.clone();
            unique.sort_unstable();
            unique.dedup();

            prop_assert_eq!(added, unique.len());
            prop_assert_eq!(feed.len(), unique.len());

            let listed: Vec<i64> = feed.newest_first().map(|i| i.id.as_i64()).collect();
            prop_assert!(listed.windows(2).all(|w| w[0] > w[1]));
        }
    }
}
