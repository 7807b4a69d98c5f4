use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{AssignmentRef, Availability, RawRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentGroup {
    pub id: Uuid,
    pub name: String,
}

/// Manufacturer, category or set name entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Unknown role strings fall back to the unprivileged role.
    pub fn parse(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Set {
    pub id: Uuid,
    pub manufacturer_id: Uuid,
    pub manufacturer_name: String,
    pub set_name_id: Uuid,
    pub set_name: String,
    pub category_id: Option<Uuid>,
    pub set_number: String,
    pub state_id: Option<String>,
    #[serde(rename = "assignment")]
    pub availability: Availability,
    #[serde(skip)]
    pub version: i64,
}

impl Set {
    /// Ordering key: manufacturer name directly followed by the set name.
    pub fn sort_key(&self) -> String {
        format!("{}{}", self.manufacturer_name, self.set_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub set_assignments: Vec<AssignmentRef>,
    #[serde(skip)]
    pub version: i64,
}

impl User {
    pub fn group_ids(&self) -> HashSet<Uuid> {
        self.set_assignments.iter().filter(|r| r.is_group()).map(AssignmentRef::id).collect()
    }

    pub fn direct_set_ids(&self) -> HashSet<Uuid> {
        self.set_assignments.iter().filter(|r| !r.is_group()).map(AssignmentRef::id).collect()
    }

    pub fn holds(&self, id: Uuid) -> bool {
        self.set_assignments.iter().any(|r| r.id() == id)
    }
}

/// Per-unit product fields. Empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDraft {
    pub manufacturer_id: Option<Uuid>,
    pub product_type: String,
    pub designation: String,
    pub cost_center: String,
    pub department: String,
    pub active_state: String,
    pub serial_number: String,
    pub electrical_test_required: bool,
    pub testing_interval: String,
    pub inspection_id: String,
    pub inventoried: bool,
    pub area_code: String,
    pub inventory_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub set_id: Uuid,
    #[serde(flatten)]
    pub fields: ProductDraft,
}

/// Input for inserting a set record.
#[derive(Debug, Clone)]
pub struct NewSet {
    pub id: Uuid,
    pub manufacturer_id: Uuid,
    pub set_name_id: Uuid,
    pub category_id: Option<Uuid>,
    pub set_number: String,
    pub state_id: Option<String>,
    pub assignment: Option<Vec<Uuid>>,
}

/// Non-assignment fields of a set update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SetPatch {
    pub manufacturer_id: Option<Uuid>,
    pub set_name_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub set_number: Option<String>,
    pub state_id: Option<String>,
}

impl SetPatch {
    pub fn is_empty(&self) -> bool {
        self.manufacturer_id.is_none()
            && self.set_name_id.is_none()
            && self.category_id.is_none()
            && self.set_number.is_none()
            && self.state_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSetRequest {
    pub manufacturer_id: Uuid,
    pub set_name_id: Uuid,
    pub category_id: Option<Uuid>,
    pub set_number: String,
    pub state_id: Option<String>,
    /// Explicit opt-in to restricted availability. Ignored when `assignment` is given.
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub assignment: Option<Vec<RawRef>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub role: Option<Role>,
    #[serde(default)]
    pub set_assignments: Vec<RawRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub set_assignments: Option<Vec<RawRef>>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkAddRequest {
    pub set_ids: Vec<RawRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CopyGroupRequest {
    pub target_group_id: Uuid,
    /// Caller-chosen subset; defaults to every set currently holding the source group.
    pub set_ids: Option<Vec<RawRef>>,
}

/// Outcome of a single idempotent mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Changed,
    Unchanged,
    /// The item did not qualify for the operation (e.g. did not hold the source group).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub id: Uuid,
    pub error: String,
}

/// Per-item results of a best-effort batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub changed: Vec<Uuid>,
    pub unchanged: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
    pub failed: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn record(&mut self, id: Uuid, outcome: Outcome) {
        match outcome {
            Outcome::Changed => self.changed.push(id),
            Outcome::Unchanged => self.unchanged.push(id),
            Outcome::Skipped => self.skipped.push(id),
        }
    }

    pub fn fail(&mut self, id: Uuid, error: impl ToString) {
        self.failed.push(ItemFailure { id, error: error.to_string() });
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGroupReport {
    pub removed_from_sets: usize,
    pub removed_from_users: usize,
    pub group_deleted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<ItemFailure>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSetReport {
    pub removed_from_users: usize,
    pub set_deleted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<ItemFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMembers {
    pub sets: Vec<Set>,
    pub users: Vec<User>,
}

/// Editable seed for duplicating a set together with its products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCopyDraft {
    pub manufacturer_id: Uuid,
    pub set_name_id: Uuid,
    pub category_id: Option<Uuid>,
    pub set_number: String,
    pub state_id: Option<String>,
    pub assignment: Option<Vec<RawRef>>,
    #[serde(default)]
    pub products: Vec<ProductDraft>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetCopyResult {
    pub set: Set,
    pub products: Vec<Product>,
}
