use crate::db::Collection;
use crate::error::{ProductionError, Result};
use crate::models::{
    FinishedItem, NewFinishedItem, NewOutlet, NewRawItem, NewRole, NewStaff, Outlet, RawItem,
    Role, Staff,
};
use crate::production::Production;

trait Keyed {
    const KIND: &'static str;
    fn key(&self) -> &str;
}

impl Keyed for Role {
    const KIND: &'static str = "role";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Staff {
    const KIND: &'static str = "staff";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Outlet {
    const KIND: &'static str = "outlet";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for RawItem {
    const KIND: &'static str = "raw item";
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for FinishedItem {
    const KIND: &'static str = "finished item";
    fn key(&self) -> &str {
        &self.id
    }
}

fn find<'a, T: Keyed>(records: &'a [T], id: &str) -> Result<&'a T> {
    records
        .iter()
        .find(|r| r.key() == id)
        .ok_or_else(|| ProductionError::not_found(T::KIND, id))
}

fn find_mut<'a, T: Keyed>(records: &'a mut [T], id: &str) -> Result<&'a mut T> {
    records
        .iter_mut()
        .find(|r| r.key() == id)
        .ok_or_else(|| ProductionError::not_found(T::KIND, id))
}

fn replace<T: Keyed + Clone>(records: &mut [T], record: T) -> Result<T> {
    let slot = find_mut(records, record.key())?;
    *slot = record.clone();
    Ok(record)
}

fn remove<T: Keyed>(records: &mut Vec<T>, id: &str) -> Result<T> {
    let index = records
        .iter()
        .position(|r| r.key() == id)
        .ok_or_else(|| ProductionError::not_found(T::KIND, id))?;
    Ok(records.remove(index))
}

/// A PIN is 4 to 8 ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    (4..=8).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
}

fn non_negative(qty: f64) -> f64 {
    if qty.is_finite() {
        qty.max(0.0)
    } else {
        0.0
    }
}

impl Production {
    // ===== ROLES =====

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn role(&self, id: &str) -> Result<&Role> {
        find(&self.roles, id)
    }

    pub fn create_role(&mut self, role: NewRole) -> Result<Role> {
        let role = Role {
            id: Self::new_id(),
            name: role.name,
            tags: role.tags,
        };
        self.roles.push(role.clone());
        self.persist(Collection::Roles)?;
        Ok(role)
    }

    pub fn update_role(&mut self, role: Role) -> Result<Role> {
        let role = replace(&mut self.roles, role)?;
        self.persist(Collection::Roles)?;
        Ok(role)
    }

    /// Removes a role and unassigns staff that held it.
    pub fn delete_role(&mut self, id: &str) -> Result<()> {
        remove(&mut self.roles, id)?;
        for member in self.staff.iter_mut() {
            if member.role_id.as_deref() == Some(id) {
                member.role_id = None;
            }
        }
        self.persist_all(&[Collection::Roles, Collection::Staff])
    }

    // ===== STAFF =====

    pub fn staff(&self) -> &[Staff] {
        &self.staff
    }

    pub fn staff_member(&self, id: &str) -> Result<&Staff> {
        find(&self.staff, id)
    }

    pub fn create_staff(&mut self, staff: NewStaff) -> Result<Staff> {
        if let Some(role_id) = &staff.role_id {
            find(&self.roles, role_id)?;
        }
        let staff = Staff {
            id: Self::new_id(),
            name: staff.name,
            role_id: staff.role_id,
            pin_hash: None,
        };
        self.staff.push(staff.clone());
        self.persist(Collection::Staff)?;
        Ok(staff)
    }

    /// Updates name and role. The PIN is only changed through `set_staff_pin`.
    pub fn update_staff(&mut self, id: &str, update: NewStaff) -> Result<Staff> {
        if let Some(role_id) = &update.role_id {
            find(&self.roles, role_id)?;
        }
        let member = find_mut(&mut self.staff, id)?;
        member.name = update.name;
        member.role_id = update.role_id;
        let member = member.clone();
        self.persist(Collection::Staff)?;
        Ok(member)
    }

    pub fn delete_staff(&mut self, id: &str) -> Result<()> {
        remove(&mut self.staff, id)?;
        for task in self.tasks.iter_mut() {
            if task.staff_id.as_deref() == Some(id) {
                task.staff_id = None;
            }
        }
        self.persist_all(&[Collection::Staff, Collection::Tasks])
    }

    /// Stores a bcrypt hash of `pin`. Nothing changes unless the PIN is
    /// well-formed and the confirmation matches.
    pub fn set_staff_pin(&mut self, id: &str, pin: &str, confirm: &str) -> Result<()> {
        find(&self.staff, id)?;
        if !is_valid_pin(pin) {
            return Err(ProductionError::InvalidPin);
        }
        if pin != confirm {
            return Err(ProductionError::PinMismatch);
        }

        let hash = bcrypt::hash(pin, bcrypt::DEFAULT_COST)?;
        find_mut(&mut self.staff, id)?.pin_hash = Some(hash);
        self.persist(Collection::Staff)?;
        tracing::info!(staff_id = id, "staff PIN updated");
        Ok(())
    }

    pub fn clear_staff_pin(&mut self, id: &str) -> Result<()> {
        find_mut(&mut self.staff, id)?.pin_hash = None;
        self.persist(Collection::Staff)
    }

    /// A staff member without a PIN always verifies.
    pub fn verify_staff_pin(&self, id: &str, pin: &str) -> Result<bool> {
        let member = find(&self.staff, id)?;
        match &member.pin_hash {
            Some(hash) => Ok(bcrypt::verify(pin, hash)?),
            None => Ok(true),
        }
    }

    // ===== OUTLETS =====

    pub fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    pub fn outlet(&self, id: &str) -> Result<&Outlet> {
        find(&self.outlets, id)
    }

    pub fn create_outlet(&mut self, outlet: NewOutlet) -> Result<Outlet> {
        let outlet = Outlet {
            id: Self::new_id(),
            name: outlet.name,
            kind: outlet.kind,
            order_cutoff: outlet.order_cutoff,
            open_time: outlet.open_time,
            close_time: outlet.close_time,
            guide: outlet.guide,
        };
        self.outlets.push(outlet.clone());
        self.persist(Collection::Outlets)?;
        Ok(outlet)
    }

    pub fn update_outlet(&mut self, outlet: Outlet) -> Result<Outlet> {
        let outlet = replace(&mut self.outlets, outlet)?;
        self.persist(Collection::Outlets)?;
        Ok(outlet)
    }

    pub fn delete_outlet(&mut self, id: &str) -> Result<()> {
        remove(&mut self.outlets, id)?;
        self.persist(Collection::Outlets)
    }

    // ===== RAW ITEMS =====

    pub fn raw_items(&self) -> &[RawItem] {
        &self.raw_items
    }

    pub fn raw_item(&self, id: &str) -> Result<&RawItem> {
        find(&self.raw_items, id)
    }

    pub fn create_raw_item(&mut self, item: NewRawItem) -> Result<RawItem> {
        let item = RawItem {
            id: Self::new_id(),
            name: item.name,
            unit: item.unit,
            on_hand: non_negative(item.on_hand),
            par: item.par,
            location: item.location,
        };
        self.raw_items.push(item.clone());
        self.persist(Collection::RawItems)?;
        Ok(item)
    }

    pub fn update_raw_item(&mut self, mut item: RawItem) -> Result<RawItem> {
        item.on_hand = non_negative(item.on_hand);
        let item = replace(&mut self.raw_items, item)?;
        self.persist(Collection::RawItems)?;
        Ok(item)
    }

    pub fn delete_raw_item(&mut self, id: &str) -> Result<()> {
        remove(&mut self.raw_items, id)?;
        self.persist(Collection::RawItems)
    }

    /// Adds `delta` to stock, clamping at zero. Returns the new level.
    pub fn adjust_raw_stock(&mut self, id: &str, delta: f64) -> Result<f64> {
        let item = find_mut(&mut self.raw_items, id)?;
        item.on_hand = non_negative(item.on_hand + delta);
        let on_hand = item.on_hand;
        self.persist(Collection::RawItems)?;
        Ok(on_hand)
    }

    pub fn low_stock_raw(&self) -> Vec<&RawItem> {
        let mut items: Vec<&RawItem> = self
            .raw_items
            .iter()
            .filter(|i| i.on_hand <= i.par)
            .collect();
        items.sort_by(|a, b| a.on_hand.total_cmp(&b.on_hand));
        items
    }

    // ===== FINISHED ITEMS =====

    pub fn finished_items(&self) -> &[FinishedItem] {
        &self.finished_items
    }

    pub fn finished_item(&self, id: &str) -> Result<&FinishedItem> {
        find(&self.finished_items, id)
    }

    pub fn create_finished_item(&mut self, item: NewFinishedItem) -> Result<FinishedItem> {
        let item = FinishedItem {
            id: Self::new_id(),
            name: item.name,
            unit: item.unit,
            on_hand: non_negative(item.on_hand),
            par: item.par,
            recipe_id: item.recipe_id,
            capability: item.capability,
            location: item.location,
        };
        self.finished_items.push(item.clone());
        self.persist(Collection::FinishedItems)?;
        Ok(item)
    }

    pub fn update_finished_item(&mut self, mut item: FinishedItem) -> Result<FinishedItem> {
        item.on_hand = non_negative(item.on_hand);
        let item = replace(&mut self.finished_items, item)?;
        self.persist(Collection::FinishedItems)?;
        Ok(item)
    }

    pub fn delete_finished_item(&mut self, id: &str) -> Result<()> {
        remove(&mut self.finished_items, id)?;
        self.persist(Collection::FinishedItems)
    }

    pub fn adjust_finished_stock(&mut self, id: &str, delta: f64) -> Result<f64> {
        let item = find_mut(&mut self.finished_items, id)?;
        item.on_hand = non_negative(item.on_hand + delta);
        let on_hand = item.on_hand;
        self.persist(Collection::FinishedItems)?;
        Ok(on_hand)
    }

    pub fn low_stock_finished(&self) -> Vec<&FinishedItem> {
        let mut items: Vec<&FinishedItem> = self
            .finished_items
            .iter()
            .filter(|i| i.on_hand <= i.par)
            .collect();
        items.sort_by(|a, b| a.on_hand.total_cmp(&b.on_hand));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProductionConfig;
    use crate::db::SqliteStore;

    fn production() -> Production {
        Production::open(SqliteStore::open_in_memory().unwrap(), ProductionConfig::default())
            .unwrap()
    }

    #[test]
    fn test_pin_format() {
        assert!(is_valid_pin("1234"));
        assert!(is_valid_pin("12345678"));
        assert!(!is_valid_pin("123"));
        assert!(!is_valid_pin("123456789"));
        assert!(!is_valid_pin("12a4"));
        assert!(!is_valid_pin(""));
    }

    #[test]
    fn test_set_pin_stores_hash_only() {
        let mut p = production();
        let john = p
            .create_staff(NewStaff {
                name: "John".to_string(),
                role_id: None,
            })
            .unwrap();

        p.set_staff_pin(&john.id, "4821", "4821").unwrap();

        let hash = p.staff_member(&john.id).unwrap().pin_hash.clone().unwrap();
        assert_ne!(hash, "4821");
        assert!(p.verify_staff_pin(&john.id, "4821").unwrap());
        assert!(!p.verify_staff_pin(&john.id, "0000").unwrap());
    }

    #[test]
    fn test_rejected_pin_leaves_staff_untouched() {
        let mut p = production();
        let jane = p
            .create_staff(NewStaff {
                name: "Jane".to_string(),
                role_id: None,
            })
            .unwrap();

        assert!(matches!(
            p.set_staff_pin(&jane.id, "12", "12"),
            Err(ProductionError::InvalidPin)
        ));
        assert!(matches!(
            p.set_staff_pin(&jane.id, "1234", "4321"),
            Err(ProductionError::PinMismatch)
        ));
        assert!(p.staff_member(&jane.id).unwrap().pin_hash.is_none());
        // No PIN set, allow access
        assert!(p.verify_staff_pin(&jane.id, "9999").unwrap());
    }

    #[test]
    fn test_delete_role_unassigns_staff() {
        let mut p = production();
        let baker = p
            .create_role(NewRole {
                name: "Baker".to_string(),
                tags: ["baking".to_string()].into(),
            })
            .unwrap();
        let staff = p
            .create_staff(NewStaff {
                name: "Ana".to_string(),
                role_id: Some(baker.id.clone()),
            })
            .unwrap();

        p.delete_role(&baker.id).unwrap();

        assert!(p.roles().is_empty());
        assert_eq!(p.staff_member(&staff.id).unwrap().role_id, None);
    }

    #[test]
    fn test_stock_adjustment_clamps_at_zero() {
        let mut p = production();
        let flour = p
            .create_raw_item(NewRawItem {
                name: "Flour".to_string(),
                unit: "kg".to_string(),
                on_hand: 10.0,
                par: 25.0,
                location: Some("Dry store".to_string()),
            })
            .unwrap();

        assert_eq!(p.adjust_raw_stock(&flour.id, -4.0).unwrap(), 6.0);
        assert_eq!(p.adjust_raw_stock(&flour.id, -100.0).unwrap(), 0.0);
        assert_eq!(p.low_stock_raw().len(), 1);
    }

    #[test]
    fn test_negative_initial_stock_is_clamped() {
        let mut p = production();
        let item = p
            .create_finished_item(NewFinishedItem {
                name: "Croissant".to_string(),
                unit: "pcs".to_string(),
                on_hand: -5.0,
                par: 40.0,
                recipe_id: Some("r-croissant".to_string()),
                capability: Some("baking".to_string()),
                location: None,
            })
            .unwrap();
        assert_eq!(item.on_hand, 0.0);
    }

    #[test]
    fn test_delete_unknown_outlet_fails() {
        let mut p = production();
        let result = p.delete_outlet("missing");
        assert!(matches!(result, Err(ProductionError::NotFound { kind: "outlet", .. })));
    }
}
