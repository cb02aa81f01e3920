//! # In-Memory Link Store
//!
//! Thread-safe, cloneable implementation of [`LinkStore`].
//!
//! All operations are synchronous (the lock is `parking_lot`, not
//! `tokio::sync`) because the lock is never held across an `.await`.
//! `parking_lot::RwLock` is non-poisoning: a panicking writer does not
//! permanently wedge the store.
//!
//! Every write runs its version check, uniqueness check and mutation under
//! a single write lock, so two writers for the same pair are serialized and
//! the loser observes [`StoreError::Conflict`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use famlink_core::{AccountId, LinkId};
use famlink_state::FamilyLink;

use crate::{LinkStore, StatusFilter, StoreError};

type PairKey = (AccountId, AccountId);

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<LinkId, FamilyLink>,
    /// Active record ids per ordered pair. More than one entry is an
    /// integrity violation that can only arrive through [`InMemoryLinkStore::hydrate`].
    active_by_pair: HashMap<PairKey, Vec<LinkId>>,
}

impl Inner {
    fn active_ids(&self, key: &PairKey) -> &[LinkId] {
        self.active_by_pair.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn index(&mut self, link: &FamilyLink) {
        let ids = self.active_by_pair.entry(pair_key(link)).or_default();
        if !ids.contains(&link.id) {
            ids.push(link.id);
        }
    }

    fn unindex(&mut self, link: &FamilyLink) {
        let key = pair_key(link);
        if let Some(ids) = self.active_by_pair.get_mut(&key) {
            ids.retain(|id| *id != link.id);
            if ids.is_empty() {
                self.active_by_pair.remove(&key);
            }
        }
    }

    fn list(&self, keep: impl Fn(&FamilyLink) -> bool) -> Vec<FamilyLink> {
        let mut out: Vec<FamilyLink> = self
            .records
            .values()
            .filter(|l| l.is_active && keep(l))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_date.cmp(&b.created_date).then(a.id.cmp(&b.id)));
        out
    }
}

fn pair_key(link: &FamilyLink) -> PairKey {
    (link.sponsor_id.clone(), link.member_id.clone())
}

/// Process-local link store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLinkStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryLinkStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load records from durable storage at startup.
    ///
    /// Records are taken as-is and uniqueness is not enforced here, so an
    /// inconsistent backend surfaces later as [`StoreError::DuplicatePair`]
    /// instead of being silently resolved. Returns the number of records loaded.
    pub fn hydrate(&self, links: impl IntoIterator<Item = FamilyLink>) -> usize {
        let mut inner = self.inner.write();
        let mut loaded = 0;
        for mut link in links {
            if link.version == 0 {
                link.version = 1;
            }
            if let Some(previous) = inner.records.remove(&link.id) {
                inner.unindex(&previous);
            }
            if link.is_active {
                inner.index(&link);
                if inner.active_ids(&pair_key(&link)).len() > 1 {
                    tracing::warn!(
                        sponsor_id = %link.sponsor_id,
                        member_id = %link.member_id,
                        "hydrated more than one active link for the same pair"
                    );
                }
            }
            inner.records.insert(link.id, link);
            loaded += 1;
        }
        loaded
    }

    /// Number of records, active or not.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_new(inner: &mut Inner, link: &FamilyLink) -> Result<FamilyLink, StoreError> {
        let key = pair_key(link);
        if link.is_active && !inner.active_ids(&key).is_empty() {
            return Err(StoreError::Conflict {
                sponsor_id: link.sponsor_id.clone(),
                member_id: link.member_id.clone(),
            });
        }
        if inner.records.contains_key(&link.id) {
            return Err(StoreError::Conflict {
                sponsor_id: link.sponsor_id.clone(),
                member_id: link.member_id.clone(),
            });
        }
        let mut stored = link.clone();
        stored.version = 1;
        if stored.is_active {
            inner.index(&stored);
        }
        inner.records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_existing(inner: &mut Inner, link: &FamilyLink) -> Result<FamilyLink, StoreError> {
        let current = inner
            .records
            .get(&link.id)
            .ok_or(StoreError::NotFound(link.id))?;
        if !current.is_pair(&link.sponsor_id, &link.member_id) {
            return Err(StoreError::PairChanged(link.id));
        }
        let conflict = || StoreError::Conflict {
            sponsor_id: link.sponsor_id.clone(),
            member_id: link.member_id.clone(),
        };
        if current.version != link.version {
            return Err(conflict());
        }
        let reactivating = link.is_active && !current.is_active;
        if reactivating && !inner.active_ids(&pair_key(link)).is_empty() {
            return Err(conflict());
        }

        let mut stored = link.clone();
        stored.version = link.version + 1;
        if stored.is_active {
            inner.index(&stored);
        } else {
            inner.unindex(&stored);
        }
        inner.records.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

impl LinkStore for InMemoryLinkStore {
    fn find_by_pair(
        &self,
        sponsor_id: &AccountId,
        member_id: &AccountId,
    ) -> Result<Option<FamilyLink>, StoreError> {
        let inner = self.inner.read();
        let key = (sponsor_id.clone(), member_id.clone());
        match inner.active_ids(&key) {
            [] => Ok(None),
            [id] => Ok(inner.records.get(id).cloned()),
            ids => Err(StoreError::DuplicatePair {
                sponsor_id: sponsor_id.clone(),
                member_id: member_id.clone(),
                count: ids.len(),
            }),
        }
    }

    fn upsert(&self, link: &FamilyLink) -> Result<FamilyLink, StoreError> {
        let mut inner = self.inner.write();
        if link.version == 0 {
            Self::insert_new(&mut inner, link)
        } else {
            Self::update_existing(&mut inner, link)
        }
    }

    fn list_by_sponsor(
        &self,
        sponsor_id: &AccountId,
        filter: StatusFilter,
    ) -> Result<Vec<FamilyLink>, StoreError> {
        Ok(self
            .inner
            .read()
            .list(|l| &l.sponsor_id == sponsor_id && filter.matches(l.status)))
    }

    fn list_by_member(
        &self,
        member_id: &AccountId,
        filter: StatusFilter,
    ) -> Result<Vec<FamilyLink>, StoreError> {
        Ok(self
            .inner
            .read()
            .list(|l| &l.member_id == member_id && filter.matches(l.status)))
    }

    fn get(&self, id: LinkId) -> Result<Option<FamilyLink>, StoreError> {
        Ok(self.inner.read().records.get(&id).cloned())
    }

    fn archive(&self, id: LinkId) -> Result<FamilyLink, StoreError> {
        let mut inner = self.inner.write();
        let mut link = inner
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        if link.is_active {
            inner.unindex(&link);
            link.is_active = false;
            link.version += 1;
            inner.records.insert(id, link.clone());
        }
        Ok(link)
    }
}
