//! Seller working-hours windows

use chrono::{NaiveTime, Timelike};
use shared::models::StaffMember;

use crate::inventory::{InventoryError, InventoryResult};
use crate::utils::time::parse_hhmm;

/// Inclusive `[from, to]` wall-clock window; `from > to` wraps midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl WorkingHours {
    pub fn parse(from: &str, to: &str) -> InventoryResult<Self> {
        Ok(Self {
            from: parse_hhmm(from)?,
            to: parse_hhmm(to)?,
        })
    }

    /// Window configured for a staff member, `None` when unrestricted
    pub fn for_member(member: &StaffMember) -> InventoryResult<Option<Self>> {
        match (member.working_from.as_deref(), member.working_to.as_deref()) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => Self::parse(from, to).map(Some),
            _ => Err(InventoryError::Validation(format!(
                "staff {} needs both working_from and working_to",
                member.id
            ))),
        }
    }

    pub fn is_overnight(&self) -> bool {
        self.from > self.to
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        // Minute resolution, matching the HH:MM configuration
        let t = time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time);
        if self.is_overnight() {
            t >= self.from || t <= self.to
        } else {
            t >= self.from && t <= self.to
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn daytime_window_is_inclusive() {
        let window = WorkingHours::parse("09:00", "17:30").unwrap();
        assert!(window.contains(at(9, 0)));
        assert!(window.contains(at(17, 30)));
        assert!(window.contains(NaiveTime::from_hms_opt(17, 30, 45).unwrap()));
        assert!(!window.contains(at(17, 31)));
        assert!(!window.contains(at(8, 59)));
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        let window = WorkingHours::parse("22:00", "06:00").unwrap();
        assert!(window.is_overnight());
        assert!(window.contains(at(23, 15)));
        assert!(window.contains(at(0, 0)));
        assert!(window.contains(at(6, 0)));
        assert!(!window.contains(at(12, 0)));
    }

    #[test]
    fn half_configured_window_is_rejected() {
        let member = StaffMember {
            id: 3,
            name: "Ana".into(),
            role: shared::models::Role::Seller,
            active: true,
            working_from: Some("09:00".into()),
            working_to: None,
            updated_at: 0,
        };
        assert!(WorkingHours::for_member(&member).is_err());
    }
}
