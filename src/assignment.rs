//! Assignment references and set availability.
//!
//! On the wire and in the database an assignment reference is only an id. Whether it
//! names an assignment group or an individual set is decided by looking it up against
//! the known group ids. [`classify`] performs that lookup once, when records are read,
//! and everything past the store boundary works with the tagged [`AssignmentRef`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// A classified reference held by a set's `assignment` or a user's `set_assignments`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentRef {
    /// Membership in an assignment group.
    Group(Uuid),
    /// An individual set exception (direct grant).
    DirectSet(Uuid),
}

impl AssignmentRef {
    pub fn id(&self) -> Uuid {
        match self {
            AssignmentRef::Group(id) | AssignmentRef::DirectSet(id) => *id,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, AssignmentRef::Group(_))
    }
}

// Outbound form is always the bare id, as legacy clients expect.
impl Serialize for AssignmentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id().serialize(serializer)
    }
}

/// A reference as it arrives from a client: either the bare id or a populated
/// object carrying the id in `_id` (or `id`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawRef {
    Bare(Uuid),
    Populated {
        #[serde(rename = "_id", alias = "id")]
        id: Uuid,
    },
}

impl RawRef {
    pub fn id(&self) -> Uuid {
        match self {
            RawRef::Bare(id) | RawRef::Populated { id } => *id,
        }
    }
}

impl Serialize for RawRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id().serialize(serializer)
    }
}

impl From<Uuid> for RawRef {
    fn from(id: Uuid) -> Self {
        RawRef::Bare(id)
    }
}

/// Normalizes raw references to bare ids, dropping duplicates but keeping first-seen order.
pub fn normalize(raw: &[RawRef]) -> Vec<Uuid> {
    dedup(raw.iter().map(RawRef::id))
}

pub fn dedup(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Classifies bare ids: an id is a group reference iff it is a known group id,
/// otherwise it is a direct set reference.
pub fn classify(ids: impl IntoIterator<Item = Uuid>, group_ids: &HashSet<Uuid>) -> Vec<AssignmentRef> {
    dedup(ids)
        .into_iter()
        .map(|id| {
            if group_ids.contains(&id) {
                AssignmentRef::Group(id)
            } else {
                AssignmentRef::DirectSet(id)
            }
        })
        .collect()
}

/// Who may access a set.
///
/// `Restricted(vec![])` is the explicit "restricted, nobody assigned yet" state and
/// is never collapsed back into [`Availability::Free`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Availability {
    #[default]
    Free,
    Restricted(Vec<AssignmentRef>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityState {
    Free,
    RestrictedEmpty,
    Restricted,
}

impl Availability {
    /// Builds availability from the stored form (`None` for free availability).
    pub fn from_ids(ids: Option<Vec<Uuid>>, group_ids: &HashSet<Uuid>) -> Self {
        match ids {
            None => Availability::Free,
            Some(ids) => Availability::Restricted(classify(ids, group_ids)),
        }
    }

    pub fn state(&self) -> AvailabilityState {
        match self {
            Availability::Free => AvailabilityState::Free,
            Availability::Restricted(refs) if refs.is_empty() => AvailabilityState::RestrictedEmpty,
            Availability::Restricted(_) => AvailabilityState::Restricted,
        }
    }

    pub fn refs(&self) -> &[AssignmentRef] {
        match self {
            Availability::Free => &[],
            Availability::Restricted(refs) => refs,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.refs().iter().any(|r| r.id() == id)
    }

    /// The stored form: `None` for free, otherwise the bare ids in order.
    pub fn ids(&self) -> Option<Vec<Uuid>> {
        match self {
            Availability::Free => None,
            Availability::Restricted(refs) => Some(refs.iter().map(AssignmentRef::id).collect()),
        }
    }

    /// Returns the availability with `r` appended, or `None` when it is already present.
    /// Appending to a free set restricts it to the new reference.
    pub fn with_ref(&self, r: AssignmentRef) -> Option<Availability> {
        if self.contains(r.id()) {
            return None;
        }
        let mut refs = self.refs().to_vec();
        refs.push(r);
        Some(Availability::Restricted(refs))
    }

    /// Returns the availability with every reference to `id` removed, or `None` when
    /// nothing referenced it. Removing the last reference yields `Restricted(vec![])`.
    pub fn without(&self, id: Uuid) -> Option<Availability> {
        if !self.contains(id) {
            return None;
        }
        let refs = self.refs().iter().copied().filter(|r| r.id() != id).collect();
        Some(Availability::Restricted(refs))
    }
}

impl Serialize for Availability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Availability::Free => serializer.serialize_none(),
            Availability::Restricted(refs) => refs.serialize(serializer),
        }
    }
}

/// Decodes the multipart `set_assignment` field.
///
/// The field carries a JSON-encoded array. Form encoding turns a JSON `null` into the
/// literal string `"null"`, so that string (and an empty field) means free availability.
pub fn decode_form_assignment(value: &str) -> Result<Option<Vec<RawRef>>, serde_json::Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    serde_json::from_str::<Option<Vec<RawRef>>>(trimmed)
}
