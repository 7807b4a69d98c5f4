//! Duplicating a set together with its products.
//!
//! Serial number, inspection id and inventory number identify one physical unit and are
//! never carried into the copy. The whole batch is checked before anything is written:
//! a single validation issue or duplicate identity rejects every product.

use std::collections::BTreeMap;

use crate::assignment::RawRef;
use crate::error::{AppError, AppResult, DuplicateIdentity, FieldIssue};
use crate::types::{Product, ProductDraft, Set, SetCopyDraft};

/// Seeds an editable copy of `set`: its current assignment as bare ids and its products
/// with the per-unit identity fields cleared.
pub fn prepare_draft(set: &Set, products: &[Product]) -> SetCopyDraft {
    SetCopyDraft {
        manufacturer_id: set.manufacturer_id,
        set_name_id: set.set_name_id,
        category_id: set.category_id,
        set_number: set.set_number.clone(),
        state_id: set.state_id.clone(),
        assignment: set.availability.ids().map(|ids| ids.into_iter().map(RawRef::from).collect()),
        products: products
            .iter()
            .map(|p| ProductDraft {
                serial_number: String::new(),
                inspection_id: String::new(),
                inventory_number: String::new(),
                ..p.fields.clone()
            })
            .collect(),
    }
}

fn missing(value: &str) -> bool {
    value.trim().is_empty()
}

/// Field checks for one product at position `item`.
pub fn validate_product(item: usize, p: &ProductDraft) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    let mut require = |present: bool, field: &str| {
        if !present {
            issues.push(FieldIssue::new(Some(item), field, "is required"));
        }
    };

    require(p.manufacturer_id.is_some(), "manufacturer_id");
    require(!missing(&p.product_type), "product_type");
    require(!missing(&p.designation), "designation");
    require(!missing(&p.cost_center), "cost_center");
    require(!missing(&p.department), "department");
    require(!missing(&p.active_state), "active_state");

    if p.electrical_test_required {
        require(!missing(&p.testing_interval), "testing_interval");
        require(!missing(&p.inspection_id), "inspection_id");
    }
    if p.inventoried {
        require(!missing(&p.area_code), "area_code");
        require(!missing(&p.inventory_number), "inventory_number");
    }
    issues
}

/// Identity values occurring more than once within the batch. Empty values are ignored.
pub fn find_duplicates(products: &[ProductDraft]) -> Vec<DuplicateIdentity> {
    let fields: [(&str, fn(&ProductDraft) -> &str); 3] = [
        ("serial_number", |p| p.serial_number.as_str()),
        ("inspection_id", |p| p.inspection_id.as_str()),
        ("inventory_number", |p| p.inventory_number.as_str()),
    ];

    let mut duplicates = Vec::new();
    for (field, get) in fields {
        let mut seen: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, p) in products.iter().enumerate() {
            let value = get(p).trim();
            if !value.is_empty() {
                seen.entry(value).or_default().push(i);
            }
        }
        duplicates.extend(seen.into_iter().filter(|(_, items)| items.len() > 1).map(|(value, items)| {
            DuplicateIdentity { field: field.to_string(), value: value.to_string(), items }
        }));
    }
    duplicates
}

/// Checks the draft as a whole. Validation issues are reported before duplicates.
pub fn check_draft(draft: &SetCopyDraft) -> AppResult<()> {
    let mut issues = Vec::new();
    if missing(&draft.set_number) {
        issues.push(FieldIssue::new(None, "set_number", "is required"));
    }
    for (i, p) in draft.products.iter().enumerate() {
        issues.extend(validate_product(i, p));
    }
    if !issues.is_empty() {
        return Err(AppError::ValidationErrors(issues));
    }

    let duplicates = find_duplicates(&draft.products);
    if !duplicates.is_empty() {
        return Err(AppError::DuplicateIdentities(duplicates));
    }
    Ok(())
}
