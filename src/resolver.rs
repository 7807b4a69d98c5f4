//! Access resolution: which sets a user may see and book, and who holds a group.
//!
//! Everything here is pure and infallible. A set whose assignment is missing counts as
//! freely available.

use std::collections::HashSet;

use uuid::Uuid;

use crate::assignment::{self, AssignmentRef, Availability, RawRef};
use crate::collation;
use crate::types::{AssignmentGroup, GroupMembers, Set, User};

/// Decides a single set given the user's group ids and direct set grants.
///
/// A restricted set is granted through any shared group, or through a direct grant of
/// the set's own id when the set lists itself as an exception. An empty restriction
/// list grants nobody.
pub fn is_authorized(set: &Set, group_ids: &HashSet<Uuid>, direct_set_ids: &HashSet<Uuid>) -> bool {
    match &set.availability {
        Availability::Free => true,
        Availability::Restricted(refs) => refs.iter().any(|r| match r {
            AssignmentRef::Group(g) => group_ids.contains(g),
            AssignmentRef::DirectSet(s) => *s == set.id && direct_set_ids.contains(s),
        }),
    }
}

/// Sets the user may access, in catalog order.
pub fn authorized_sets(user: &User, sets: &[Set]) -> Vec<Set> {
    let group_ids = user.group_ids();
    let direct = user.direct_set_ids();
    filter_sorted(sets, &group_ids, &direct)
}

/// Same as [`authorized_sets`] for a legacy reference list whose entries still have to be
/// classified against the known groups.
pub fn authorized_sets_from_raw(raw: &[RawRef], sets: &[Set], groups: &[AssignmentGroup]) -> Vec<Set> {
    let known: HashSet<Uuid> = groups.iter().map(|g| g.id).collect();
    let refs = assignment::classify(assignment::normalize(raw), &known);
    let group_ids = refs.iter().filter(|r| r.is_group()).map(AssignmentRef::id).collect();
    let direct = refs.iter().filter(|r| !r.is_group()).map(AssignmentRef::id).collect();
    filter_sorted(sets, &group_ids, &direct)
}

fn filter_sorted(sets: &[Set], group_ids: &HashSet<Uuid>, direct: &HashSet<Uuid>) -> Vec<Set> {
    let mut out: Vec<Set> = sets.iter().filter(|s| is_authorized(s, group_ids, direct)).cloned().collect();
    sort_sets(&mut out);
    out
}

/// Orders sets by manufacturer name followed by set name, German collation, case-insensitive.
pub fn sort_sets(sets: &mut [Set]) {
    collation::sort_by_key(sets, Set::sort_key);
}

/// Sets and users referencing `group_id`.
pub fn members_of_group(group_id: Uuid, sets: &[Set], users: &[User]) -> GroupMembers {
    let mut member_sets: Vec<Set> =
        sets.iter().filter(|s| s.availability.contains(group_id)).cloned().collect();
    sort_sets(&mut member_sets);
    let mut member_users: Vec<User> = users.iter().filter(|u| u.holds(group_id)).cloned().collect();
    collation::sort_by_key(&mut member_users, |u| u.username.clone());
    GroupMembers { sets: member_sets, users: member_users }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn set(manufacturer: &str, name: &str, availability: Availability) -> Set {
        Set {
            id: Uuid::new_v4(),
            manufacturer_id: Uuid::new_v4(),
            manufacturer_name: manufacturer.to_string(),
            set_name_id: Uuid::new_v4(),
            set_name: name.to_string(),
            category_id: None,
            set_number: "1".to_string(),
            state_id: None,
            availability,
            version: 0,
        }
    }

    fn user(refs: Vec<AssignmentRef>) -> User {
        User { id: Uuid::new_v4(), username: "u".into(), role: Role::User, set_assignments: refs, version: 0 }
    }

    fn names(sets: &[Set]) -> Vec<String> {
        sets.iter().map(Set::sort_key).collect()
    }

    #[test]
    fn free_sets_are_visible_to_everyone() {
        let free = set("Canon", "EOS", Availability::Free);
        let g = Uuid::new_v4();
        for u in [user(vec![]), user(vec![AssignmentRef::Group(g)])] {
            assert_eq!(authorized_sets(&u, std::slice::from_ref(&free)).len(), 1);
        }
    }

    #[test]
    fn empty_restriction_grants_nobody() {
        let empty = set("Canon", "EOS", Availability::Restricted(vec![]));
        let direct = user(vec![AssignmentRef::DirectSet(empty.id)]);
        assert!(authorized_sets(&direct, std::slice::from_ref(&empty)).is_empty());
        assert!(authorized_sets(&user(vec![]), &[empty]).is_empty());
    }

    #[test]
    fn group_membership_grants_restricted_set() {
        let g1 = Uuid::new_v4();
        let a = set("Bosch", "Akkuschrauber", Availability::Restricted(vec![AssignmentRef::Group(g1)]));
        let b = set("Apple", "iPad", Availability::Free);
        let sets = vec![a.clone(), b.clone()];

        let outsider = user(vec![]);
        assert_eq!(names(&authorized_sets(&outsider, &sets)), vec![b.sort_key()]);

        let member = user(vec![AssignmentRef::Group(g1)]);
        assert_eq!(names(&authorized_sets(&member, &sets)), vec![b.sort_key(), a.sort_key()]);
    }

    #[test]
    fn direct_grant_needs_set_exception() {
        let mut with_exception = set("Sony", "Alpha", Availability::Free);
        with_exception.availability = Availability::Restricted(vec![AssignmentRef::DirectSet(with_exception.id)]);
        let mut without = set("Sony", "Beta", Availability::Free);
        without.availability = Availability::Restricted(vec![AssignmentRef::Group(Uuid::new_v4())]);

        let u = user(vec![AssignmentRef::DirectSet(with_exception.id), AssignmentRef::DirectSet(without.id)]);
        let got = authorized_sets(&u, &[with_exception.clone(), without]);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, with_exception.id);
    }

    #[test]
    fn output_uses_german_collation_on_concatenated_key() {
        let sets = vec![
            set("Zeiss", "Objektiv", Availability::Free),
            set("ärzte-Bedarf", "Koffer", Availability::Free),
            set("Apple", "MacBook", Availability::Free),
            set("apple", "iPad", Availability::Free),
        ];
        let got = authorized_sets(&user(vec![]), &sets);
        assert_eq!(
            names(&got),
            vec!["appleiPad", "AppleMacBook", "ärzte-BedarfKoffer", "ZeissObjektiv"]
        );
    }

    #[test]
    fn raw_refs_are_classified_against_groups() {
        let g = AssignmentGroup { id: Uuid::new_v4(), name: "Lehrer-Technik".into() };
        let a = set("Bosch", "Bohrer", Availability::Restricted(vec![AssignmentRef::Group(g.id)]));
        let raw: Vec<RawRef> =
            serde_json::from_str(&format!(r#"[{{"_id": "{}", "name": "Lehrer-Technik"}}]"#, g.id)).unwrap();
        assert_eq!(authorized_sets_from_raw(&raw, std::slice::from_ref(&a), std::slice::from_ref(&g)).len(), 1);
        // Without the group record the same id is a direct grant, which this set does not accept
        assert!(authorized_sets_from_raw(&raw, &[a], &[]).is_empty());
    }

    #[test]
    fn members_of_group_lists_sets_and_users() {
        let g = Uuid::new_v4();
        let a = set("Bosch", "Bohrer", Availability::Restricted(vec![AssignmentRef::Group(g)]));
        let b = set("Bosch", "Säge", Availability::Free);
        let holder = user(vec![AssignmentRef::Group(g)]);
        let other = user(vec![]);
        let members = members_of_group(g, &[a.clone(), b], &[holder.clone(), other]);
        assert_eq!(members.sets.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a.id]);
        assert_eq!(members.users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![holder.id]);
    }
}
