//! Staff registry: sellers feed the scheduler, admins get escalations

use shared::models::{StaffMember, StaffUpsert};
use shared::util::now_millis;

use super::window::WorkingHours;
use crate::inventory::{InventoryResult, InventoryStore};
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};

#[derive(Debug, Clone)]
pub struct StaffRoster {
    store: InventoryStore,
}

impl StaffRoster {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }

    pub fn upsert(&self, id: i64, req: StaffUpsert) -> InventoryResult<StaffMember> {
        validate_required_text(&req.name, "name", MAX_NAME_LEN)?;
        let member = StaffMember {
            id,
            name: req.name.trim().to_string(),
            role: req.role,
            active: req.active,
            working_from: req.working_from.map(|s| s.trim().to_string()),
            working_to: req.working_to.map(|s| s.trim().to_string()),
            updated_at: now_millis(),
        };
        WorkingHours::for_member(&member)?;

        self.store.write(|txn| self.store.put_staff(txn, &member))?;
        tracing::info!(
            staff_id = id,
            role = member.role.as_str(),
            active = member.active,
            "Staff member saved"
        );
        Ok(member)
    }

    pub fn list(&self) -> InventoryResult<Vec<StaffMember>> {
        Ok(self.store.read_staff()?)
    }
}
