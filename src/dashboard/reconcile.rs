use crate::models::user::User;
use std::collections::HashMap;

/// Local mutation not yet confirmed by a full listing
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange {
    Created(User),
    Updated(User),
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingEntry {
    change: PendingChange,
    epoch: u64,
}

/// Tracks acknowledged local mutations until a refresh supersedes them.
///
/// Every mutation gets the next epoch. A refresh remembers the epoch it
/// started at; on completion, entries up to that epoch are covered by the
/// fetched data and dropped, while later ones are replayed over it. A slow
/// listing can therefore never bring back a user deleted while it was in
/// flight, nor hide one created meanwhile.
///
/// Creations stay pending until a listing confirms them. Updates and
/// deletions only matter while a listing that started before them is still
/// running, so they are recorded only then and released once the last
/// running listing ends.
#[derive(Debug, Default)]
pub struct PendingLedger {
    entries: HashMap<String, PendingEntry>,
    epoch: u64,
    refreshes_in_flight: usize,
}

impl PendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refreshes_in_flight(&self) -> usize {
        self.refreshes_in_flight
    }

    /// Whether a listed user carries an unconfirmed local change
    pub fn is_pending(&self, id: &str) -> bool {
        self.entries
            .get(id)
            .is_some_and(|e| !matches!(e.change, PendingChange::Deleted))
    }

    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| !matches!(e.change, PendingChange::Deleted))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Mark a listing as started; pass the returned epoch to `reconcile`
    pub fn begin_refresh(&mut self) -> u64 {
        self.refreshes_in_flight += 1;
        self.epoch
    }

    /// A listing failed; its data will never be merged
    pub fn abandon_refresh(&mut self) {
        self.finish_refresh();
    }

    pub fn record_created(&mut self, user: User) {
        let id = user.id.clone();
        self.record(id, PendingChange::Created(user));
    }

    /// An update to a user still pending creation stays a creation
    pub fn record_updated(&mut self, user: User) {
        let id = user.id.clone();
        let change = match self.entries.get(&id).map(|e| &e.change) {
            Some(PendingChange::Created(_)) => PendingChange::Created(user),
            _ if self.refreshes_in_flight > 0 => PendingChange::Updated(user),
            _ => {
                self.entries.remove(&id);
                return;
            }
        };
        self.record(id, change);
    }

    pub fn record_deleted(&mut self, id: &str) {
        if self.refreshes_in_flight > 0 {
            self.record(id.to_string(), PendingChange::Deleted);
        } else {
            self.entries.remove(id);
        }
    }

    fn record(&mut self, id: String, change: PendingChange) {
        self.epoch += 1;
        self.entries.insert(
            id,
            PendingEntry {
                change,
                epoch: self.epoch,
            },
        );
    }

    fn finish_refresh(&mut self) {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
        if self.refreshes_in_flight == 0 {
            self.entries
                .retain(|_, e| matches!(e.change, PendingChange::Created(_)));
        }
    }

    /// Merge a listing that started at `started_at` with newer local changes
    pub fn reconcile(&mut self, mut fetched: Vec<User>, started_at: u64) -> Vec<User> {
        self.entries.retain(|_, entry| entry.epoch > started_at);

        let mut created: Vec<(u64, User)> = Vec::new();
        for (id, entry) in &self.entries {
            match &entry.change {
                PendingChange::Deleted => fetched.retain(|u| &u.id != id),
                PendingChange::Updated(user) => {
                    if let Some(slot) = fetched.iter_mut().find(|u| &u.id == id) {
                        *slot = user.clone();
                    }
                }
                PendingChange::Created(user) => {
                    if !fetched.iter().any(|u| &u.id == id) {
                        created.push((entry.epoch, user.clone()));
                    }
                }
            }
        }
        self.finish_refresh();

        // Newest creation first, matching the listing order
        created.sort_by(|a, b| b.0.cmp(&a.0));
        let mut merged: Vec<User> = created.into_iter().map(|(_, u)| u).collect();
        merged.extend(fetched);
        merged
    }
}
