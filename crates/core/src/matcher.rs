//! In-memory author name index over the subscription catalog.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::store::{AuthorAlias, CatalogStore, StoreError, SubscriptionDetail, SubscriptionStore};

/// Normalize an author name for lookup: drop every `.`, lowercase, trim.
///
/// Internal whitespace is kept, so `"J.R.R. Tolkien"` and `"jrr tolkien"` agree.
/// Lowercasing is full Unicode, not ASCII-only, so accented capitals fold too.
pub fn normalize_name(name: &str) -> String {
    name.replace('.', "").to_lowercase().trim().to_string()
}

/// Snapshot of every subscription keyed by normalized author name and alias.
///
/// Built once per run; writes made during the run are seen by the next one.
#[derive(Debug, Default)]
pub struct AuthorMatcher {
    subscriptions: Vec<SubscriptionDetail>,
    index: HashMap<String, usize>,
    collisions: BTreeMap<String, Vec<String>>,
}

impl AuthorMatcher {
    /// Build the index. Author names are indexed first, then aliases of subscribed
    /// authors. When a key is produced twice the later entry wins.
    pub fn load(subscriptions: Vec<SubscriptionDetail>, aliases: &[AuthorAlias]) -> Self {
        let mut matcher = Self {
            subscriptions,
            index: HashMap::new(),
            collisions: BTreeMap::new(),
        };

        // An author subscribed in several scopes resolves to the last subscription.
        let mut by_author: HashMap<i64, usize> = HashMap::new();
        for (idx, detail) in matcher.subscriptions.iter().enumerate() {
            by_author.insert(detail.author.id, idx);
        }

        for idx in 0..matcher.subscriptions.len() {
            let name = matcher.subscriptions[idx].author.name.clone();
            matcher.insert(&name, idx);
        }

        let mut alias_count = 0;
        for alias in aliases {
            if let Some(&idx) = by_author.get(&alias.author_id) {
                matcher.insert(&alias.name, idx);
                alias_count += 1;
            }
        }

        for (key, labels) in &matcher.collisions {
            warn!(
                key = %key,
                subscriptions = %labels.join(", "),
                "Author key produced by several subscriptions, last one wins"
            );
        }

        info!(
            subscriptions = matcher.subscriptions.len(),
            aliases = alias_count,
            keys = matcher.index.len(),
            "Loaded author subscriptions"
        );
        matcher
    }

    /// Read subscriptions and aliases from the store and build the index.
    pub fn load_from_store<S>(store: &S) -> Result<Self, StoreError>
    where
        S: CatalogStore + SubscriptionStore + ?Sized,
    {
        let subscriptions = store.list_subscription_details()?;
        let aliases = store.list_aliases()?;
        Ok(Self::load(subscriptions, &aliases))
    }

    fn insert(&mut self, name: &str, idx: usize) {
        let key = normalize_name(name);
        if key.is_empty() {
            return;
        }

        let label = |d: &SubscriptionDetail| format!("{} ({})", d.author.name, d.scope.name);

        if let Some(previous) = self.index.insert(key.clone(), idx) {
            if previous != idx {
                let old = label(&self.subscriptions[previous]);
                let new = label(&self.subscriptions[idx]);
                warn!(
                    key = %key,
                    previous = %old,
                    new = %new,
                    "Author key overwritten"
                );
                let entry = self.collisions.entry(key).or_default();
                for l in [old, new] {
                    if !entry.contains(&l) {
                        entry.push(l);
                    }
                }
            }
        } else {
            debug!(name = name, key = %key, "Indexed author name");
        }
    }

    /// First subscription whose key is produced by any of `candidates`, in candidate order.
    pub fn find<S: AsRef<str>>(&self, candidates: &[S]) -> Option<&SubscriptionDetail> {
        candidates.iter().find_map(|candidate| {
            self.index
                .get(&normalize_name(candidate.as_ref()))
                .map(|&idx| &self.subscriptions[idx])
        })
    }

    /// Keys claimed by more than one subscription, with every subscription that claimed them.
    pub fn collisions(&self) -> &BTreeMap<String, Vec<String>> {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewAuthorSubscription, SqliteStore};

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("J.R.R. Tolkien"), "jrr tolkien");
        assert_eq!(normalize_name("  JF  Brink "), "jf  brink");
        assert_eq!(normalize_name("..."), "");
        assert_eq!(normalize_name("J.R.R. Tolkien"), normalize_name("jrr tolkien"));
    }

    #[test]
    fn test_normalize_folds_non_ascii_capitals() {
        assert_eq!(normalize_name("ÉMILE ZOLA"), "émile zola");
        assert_eq!(normalize_name("Émile Zola"), normalize_name("ÉMILE ZOLA"));
    }

    #[test]
    fn test_normalize_is_stable_under_prenormalization() {
        for s in ["J.F. Brink", " Ursula K. Le Guin ", "ÉMILE ZOLA", "a.b.c"] {
            let pre = s.replace('.', "").to_lowercase().trim().to_string();
            assert_eq!(normalize_name(s), normalize_name(&pre));
        }
    }

    fn store_with_subscriptions() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.seed_defaults().unwrap();
        let personal = store.get_scope_by_name("personal").unwrap().unwrap();

        let brink = store.create_author("JF Brink").unwrap();
        store.add_alias(brink.id, "J.F. Brink").unwrap();
        store
            .create_subscription(NewAuthorSubscription {
                author_id: brink.id,
                scope_id: personal.id,
                ..Default::default()
            })
            .unwrap();

        // Alias of an author nobody subscribes to is not indexed.
        let other = store.create_author("Unsubscribed").unwrap();
        store.add_alias(other.id, "U. Nsubscribed").unwrap();
        store
    }

    #[test]
    fn test_find_by_name_and_alias() {
        let store = store_with_subscriptions();
        let matcher = AuthorMatcher::load_from_store(&store).unwrap();

        // Name and alias normalize to the same key.
        assert_eq!(matcher.len(), 1);
        let hit = matcher.find(&["J.F. Brink"]).unwrap();
        assert_eq!(hit.author.name, "JF Brink");
        assert_eq!(hit.scope.name, "personal");
        assert!(matcher.find(&["jf brink"]).is_some());
        assert!(matcher.find(&["U. Nsubscribed"]).is_none());
        assert!(matcher.find::<&str>(&[]).is_none());
    }

    #[test]
    fn test_find_returns_first_matching_candidate() {
        let store = store_with_subscriptions();
        let matcher = AuthorMatcher::load_from_store(&store).unwrap();

        let candidates = vec!["Unknown Author".to_string(), "JF Brink".to_string()];
        assert_eq!(matcher.find(candidates.as_slice()).unwrap().author.name, "JF Brink");
    }

    #[test]
    fn test_collision_last_loaded_wins() {
        let store = SqliteStore::in_memory().unwrap();
        store.seed_defaults().unwrap();
        let personal = store.get_scope_by_name("personal").unwrap().unwrap();
        let family = store.get_scope_by_name("family").unwrap().unwrap();

        let first = store.create_author("A.B. Smith").unwrap();
        let second = store.create_author("AB Smith").unwrap();
        store
            .create_subscription(NewAuthorSubscription {
                author_id: first.id,
                scope_id: personal.id,
                ..Default::default()
            })
            .unwrap();
        store
            .create_subscription(NewAuthorSubscription {
                author_id: second.id,
                scope_id: family.id,
                ..Default::default()
            })
            .unwrap();

        let matcher = AuthorMatcher::load_from_store(&store).unwrap();
        let hit = matcher.find(&["ab smith"]).unwrap();
        assert_eq!(hit.author.name, "AB Smith");
        assert_eq!(hit.scope.name, "family");

        let colliding = matcher.collisions().get("ab smith").unwrap();
        assert_eq!(
            colliding,
            &vec!["A.B. Smith (personal)".to_string(), "AB Smith (family)".to_string()]
        );
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = AuthorMatcher::load(Vec::new(), &[]);
        assert!(matcher.is_empty());
        assert!(matcher.find(&["anyone"]).is_none());
        assert!(matcher.collisions().is_empty());
    }
}
