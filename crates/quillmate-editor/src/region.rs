use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::document::{Position, TextRange};

#[derive(Debug, Default)]
struct Claims {
    next_id: u64,
    active: Vec<(u64, TextRange)>,
}

fn lock_claims(claims: &Mutex<Claims>) -> MutexGuard<'_, Claims> {
    claims.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks document regions with a command in flight so a second command over
/// the same region is rejected instead of racing the first one's cursor.
///
/// Claimed ranges follow the edits reported through [`record_replace`], so a
/// command finishing elsewhere in the document does not shift the region a
/// pending command will write to.
///
/// [`record_replace`]: RegionGuard::record_replace
#[derive(Clone, Debug, Default)]
pub struct RegionGuard {
    claims: Arc<Mutex<Claims>>,
}

impl RegionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `range`, or returns `None` if it overlaps an active claim.
    pub fn claim(&self, range: TextRange) -> Option<RegionClaim> {
        let mut claims = lock_claims(&self.claims);
        if claims.active.iter().any(|(_, r)| r.overlaps(&range)) {
            return None;
        }
        let id = claims.next_id;
        claims.next_id += 1;
        claims.active.push((id, range));
        Some(RegionClaim {
            id,
            claims: self.claims.clone(),
        })
    }

    /// Claims the whole document; fails while any other claim is active.
    pub fn claim_document(&self) -> Option<RegionClaim> {
        self.claim(TextRange::new(0, Position::MAX))
    }

    /// Maps every active claim through the replacement of `from..to` by
    /// `inserted` positions.
    pub fn record_replace(&self, from: Position, to: Position, inserted: usize) {
        let mut claims = lock_claims(&self.claims);
        for (_, range) in claims.active.iter_mut() {
            *range = range.map_replace(from, to, inserted);
        }
    }

    pub fn active(&self) -> usize {
        lock_claims(&self.claims).active.len()
    }
}

/// Releases its region when dropped.
#[derive(Debug)]
pub struct RegionClaim {
    id: u64,
    claims: Arc<Mutex<Claims>>,
}

impl RegionClaim {
    /// Current position of the claimed region.
    pub fn range(&self) -> TextRange {
        lock_claims(&self.claims)
            .active
            .iter()
            .find(|(id, _)| *id == self.id)
            .map(|(_, range)| *range)
            .unwrap_or_default()
    }
}

impl Drop for RegionClaim {
    fn drop(&mut self) {
        let mut claims = lock_claims(&self.claims);
        if let Some(index) = claims.active.iter().position(|(id, _)| *id == self.id) {
            claims.active.swap_remove(index);
        }
    }
}
