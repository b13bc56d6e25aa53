//! Shift-aware round-robin seller selection
//!
//! The cursor row (`seller_rr`) holds the id of the last seller chosen. It
//! is read, advanced and written inside one write transaction, so two
//! concurrent submissions can never observe the same cursor value.

use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::models::{Role, StaffMember};

use super::window::WorkingHours;
use crate::inventory::storage::SELLER_CURSOR_KEY;
use crate::inventory::{InventoryResult, InventoryStore};
use crate::utils::time::local_time;

#[derive(Debug, Clone)]
pub struct AssignmentScheduler {
    tz: Tz,
}

impl AssignmentScheduler {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Eligible seller ids in ascending order
    ///
    /// All active sellers, narrowed to those inside their working window
    /// when at least one is. Sellers without a window never count as in
    /// shift; they are only reached through the fallback.
    pub fn candidates(&self, staff: &[StaffMember], now: i64) -> Vec<i64> {
        let local = local_time(now, self.tz);
        let mut active: Vec<&StaffMember> = staff
            .iter()
            .filter(|m| m.role == Role::Seller && m.active)
            .collect();
        active.sort_by_key(|m| m.id);

        let in_shift: Vec<i64> = active
            .iter()
            .filter(|m| match WorkingHours::for_member(m) {
                Ok(Some(window)) => window.contains(local),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(staff_id = m.id, error = %e, "Ignoring malformed working hours");
                    false
                }
            })
            .map(|m| m.id)
            .collect();

        if in_shift.is_empty() {
            active.iter().map(|m| m.id).collect()
        } else {
            in_shift
        }
    }

    /// First candidate strictly after the cursor, wrapping to the first
    pub fn pick_next(candidates: &[i64], cursor: Option<i64>) -> Option<i64> {
        let cursor = cursor.unwrap_or(i64::MIN);
        candidates
            .iter()
            .copied()
            .find(|id| *id > cursor)
            .or_else(|| candidates.first().copied())
    }

    /// Choose the next seller and advance the cursor
    ///
    /// `None` when no seller is active; the cursor is left untouched.
    pub fn assign_next(
        &self,
        store: &InventoryStore,
        txn: &WriteTransaction,
        now: i64,
    ) -> InventoryResult<Option<i64>> {
        let staff = store.list_staff(txn)?;
        let candidates = self.candidates(&staff, now);
        let cursor = store.get_cursor(txn, SELLER_CURSOR_KEY)?;

        let Some(chosen) = Self::pick_next(&candidates, cursor) else {
            tracing::warn!("No active sellers available for assignment");
            return Ok(None);
        };

        store.set_cursor(txn, SELLER_CURSOR_KEY, chosen)?;
        tracing::debug!(
            seller_id = chosen,
            previous = ?cursor,
            candidates = candidates.len(),
            "Round-robin selected seller"
        );
        Ok(Some(chosen))
    }

    /// Active administrators, notified when nobody can take an order
    pub fn admins(staff: &[StaffMember]) -> Vec<i64> {
        staff
            .iter()
            .filter(|m| m.role == Role::Admin && m.active)
            .map(|m| m.id)
            .collect()
    }
}
