//! Keeps sets and users consistent with the assignment groups they reference.
//!
//! Every mutation of an assignment list is a read-modify-write on a single record,
//! committed with compare-and-swap on the record's version and retried a bounded number
//! of times. Batches and cascades run item by item; a failing item is recorded in the
//! report and never stops the remaining items.

use std::collections::HashSet;

use uuid::Uuid;

use crate::assignment::{self, AssignmentRef, Availability, RawRef};
use crate::config::EngineConfig;
use crate::error::{validation, AppError, AppResult, FieldIssue};
use crate::metrics::Metrics;
use crate::resolver;
use crate::session::Session;
use crate::set_copy;
use crate::store::{AssignmentStore, SetCatalog, UserDirectory};
use crate::types::{
    AssignmentGroup, BatchReport, CreateSetRequest, CreateUserRequest, DeleteGroupReport, DeleteSetReport,
    GroupMembers, ItemFailure, NewSet, Outcome, Role, Set, SetCopyDraft, SetCopyResult, SetPatch, UpdateUserRequest, User,
};

/// What a read-modify-write decided after looking at the current record.
enum Plan<T> {
    Write(T),
    Keep,
    Skip,
}

impl<T> From<Option<T>> for Plan<T> {
    fn from(next: Option<T>) -> Self {
        match next {
            Some(v) => Plan::Write(v),
            None => Plan::Keep,
        }
    }
}

fn set_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Set {} not found", id))
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User {} not found", id))
}

fn group_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Assignment group {} not found", id))
}

/// Rejects ids outside `allowed`, one issue per offending position.
fn check_refs(ids: &[Uuid], allowed: impl Fn(&Uuid) -> bool, field: &str, what: &str) -> AppResult<()> {
    let issues: Vec<FieldIssue> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| !allowed(*id))
        .map(|(i, id)| FieldIssue::new(Some(i), field, format!("{} is not {}", id, what)))
        .collect();
    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationErrors(issues))
    }
}

pub struct ConsistencyEngine<S> {
    store: S,
    limits: EngineConfig,
    metrics: Metrics,
}

impl<S> ConsistencyEngine<S>
where
    S: AssignmentStore + SetCatalog + UserDirectory,
{
    pub fn new(store: S, limits: EngineConfig, metrics: Metrics) -> Self {
        Self { store, limits, metrics }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn require_group(&self, id: Uuid) -> AppResult<AssignmentGroup> {
        self.store.get_group(id).await?.ok_or_else(|| group_not_found(id))
    }

    async fn require_set(&self, id: Uuid) -> AppResult<Set> {
        self.store.get_set(id).await?.ok_or_else(|| set_not_found(id))
    }

    async fn require_user(&self, id: Uuid) -> AppResult<User> {
        self.store.get_user(id).await?.ok_or_else(|| user_not_found(id))
    }

    /// Compare-and-swap loop over one set's availability.
    async fn modify_set<F>(&self, id: Uuid, plan: F) -> AppResult<Outcome>
    where
        F: Fn(&Set) -> Plan<Availability> + Sync,
    {
        for attempt in 1..=self.limits.max_write_attempts {
            let set = self.require_set(id).await?;
            match plan(&set) {
                Plan::Keep => return Ok(Outcome::Unchanged),
                Plan::Skip => return Ok(Outcome::Skipped),
                Plan::Write(next) => {
                    if self.store.write_availability(id, set.version, &next).await? {
                        return Ok(Outcome::Changed);
                    }
                    tracing::debug!("Set {} changed underneath us (attempt {})", id, attempt);
                }
            }
        }
        Err(self.gave_up("Set", id))
    }

    /// Compare-and-swap loop over one user's assignment list.
    async fn modify_user<F>(&self, id: Uuid, plan: F) -> AppResult<Outcome>
    where
        F: Fn(&User) -> Plan<Vec<AssignmentRef>> + Sync,
    {
        for attempt in 1..=self.limits.max_write_attempts {
            let user = self.require_user(id).await?;
            match plan(&user) {
                Plan::Keep => return Ok(Outcome::Unchanged),
                Plan::Skip => return Ok(Outcome::Skipped),
                Plan::Write(next) => {
                    if self.store.write_assignments(id, user.version, &next).await? {
                        return Ok(Outcome::Changed);
                    }
                    tracing::debug!("User {} changed underneath us (attempt {})", id, attempt);
                }
            }
        }
        Err(self.gave_up("User", id))
    }

    fn gave_up(&self, entity: &str, id: Uuid) -> AppError {
        self.metrics.inc_write_conflicts();
        AppError::Conflict(format!(
            "{} {} was modified concurrently; gave up after {} attempts",
            entity, id, self.limits.max_write_attempts
        ))
    }

    // ----- assignment groups -----

    pub async fn list_groups(&self, session: &Session) -> AppResult<Vec<AssignmentGroup>> {
        session.require_admin()?;
        Ok(self.store.list_groups().await?)
    }

    pub async fn create_group(&self, session: &Session, name: &str) -> AppResult<AssignmentGroup> {
        session.require_admin()?;
        let name = validation::validate_name(name, "name")?;
        let group = self.store.create_group(&name).await?;
        self.metrics.inc_groups_created();
        tracing::info!("Created assignment group {} ({})", group.id, group.name);
        Ok(group)
    }

    pub async fn rename_group(&self, session: &Session, id: Uuid, name: &str) -> AppResult<AssignmentGroup> {
        session.require_admin()?;
        let name = validation::validate_name(name, "name")?;
        let group = self.store.rename_group(id, &name).await?;
        tracing::info!("Renamed assignment group {} to {}", id, group.name);
        Ok(group)
    }

    pub async fn members_of_group(&self, session: &Session, group_id: Uuid) -> AppResult<GroupMembers> {
        session.require_admin()?;
        self.require_group(group_id).await?;
        let sets = self.store.list_sets().await?;
        let users = self.store.list_users().await?;
        Ok(resolver::members_of_group(group_id, &sets, &users))
    }

    /// Strips the group from every set and user, then deletes the group record.
    ///
    /// If any record could not be cleaned up the group record is kept, so the cascade can
    /// be rerun; the report then carries the failures and `group_deleted: false`.
    pub async fn delete_assignment_group(&self, session: &Session, group_id: Uuid) -> AppResult<DeleteGroupReport> {
        session.require_admin()?;
        self.require_group(group_id).await?;
        let mut report = DeleteGroupReport::default();

        for set in self.store.list_sets().await? {
            if !set.availability.contains(group_id) {
                continue;
            }
            match self.modify_set(set.id, |s| s.availability.without(group_id).into()).await {
                Ok(Outcome::Changed) => report.removed_from_sets += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to remove group {} from set {}: {}", group_id, set.id, e);
                    report.failed.push(ItemFailure { id: set.id, error: e.to_string() });
                }
            }
        }

        for user in self.store.list_users().await? {
            if !user.holds(group_id) {
                continue;
            }
            match self.modify_user(user.id, |u| strip_ref(&u.set_assignments, group_id)).await {
                Ok(Outcome::Changed) => report.removed_from_users += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to remove group {} from user {}: {}", group_id, user.id, e);
                    report.failed.push(ItemFailure { id: user.id, error: e.to_string() });
                }
            }
        }

        self.metrics.add_references_removed((report.removed_from_sets + report.removed_from_users) as u64);

        if !report.failed.is_empty() {
            tracing::warn!(
                "Kept assignment group {}: {} record(s) could not be cleaned up",
                group_id,
                report.failed.len()
            );
            return Ok(report);
        }

        match self.store.delete_group(group_id).await {
            Ok(deleted) => report.group_deleted = deleted,
            Err(e) => {
                tracing::warn!("Failed to delete assignment group {} after cleanup: {}", group_id, e);
                report.failed.push(ItemFailure { id: group_id, error: AppError::from(e).to_string() });
                return Ok(report);
            }
        }
        if report.group_deleted {
            self.metrics.inc_groups_deleted();
        }
        tracing::info!(
            "Deleted assignment group {}: removed from {} set(s) and {} user(s)",
            group_id,
            report.removed_from_sets,
            report.removed_from_users
        );
        Ok(report)
    }

    // ----- set <-> group -----

    pub async fn add_set_to_group(&self, session: &Session, set_id: Uuid, group_id: Uuid) -> AppResult<Outcome> {
        session.require_admin()?;
        self.require_group(group_id).await?;
        let outcome = self.add_group_ref(set_id, group_id).await?;
        tracing::info!("Add set {} to group {}: {:?}", set_id, group_id, outcome);
        Ok(outcome)
    }

    async fn add_group_ref(&self, set_id: Uuid, group_id: Uuid) -> AppResult<Outcome> {
        self.modify_set(set_id, |s| s.availability.with_ref(AssignmentRef::Group(group_id)).into()).await
    }

    pub async fn remove_set_from_group(&self, session: &Session, set_id: Uuid, group_id: Uuid) -> AppResult<Outcome> {
        session.require_admin()?;
        let outcome = self.modify_set(set_id, |s| s.availability.without(group_id).into()).await?;
        tracing::info!("Remove set {} from group {}: {:?}", set_id, group_id, outcome);
        Ok(outcome)
    }

    /// Adds the group to each listed set. Every item is attempted; failures are reported
    /// beside the successes.
    pub async fn bulk_add_sets(&self, session: &Session, group_id: Uuid, set_ids: &[RawRef]) -> AppResult<BatchReport> {
        session.require_admin()?;
        validation::validate_batch_size(set_ids.len(), self.limits.max_bulk_items, "set_ids")?;
        self.require_group(group_id).await?;

        let mut report = BatchReport::default();
        for id in assignment::normalize(set_ids) {
            match self.add_group_ref(id, group_id).await {
                Ok(outcome) => report.record(id, outcome),
                Err(e) => {
                    tracing::warn!("Bulk add of set {} to group {} failed: {}", id, group_id, e);
                    report.fail(id, e);
                }
            }
        }
        self.record_batch(&report);
        tracing::info!(
            "Bulk add to group {}: {} changed, {} unchanged, {} failed",
            group_id,
            report.changed.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Adds `target` to every selected set that holds `source`. Additive: nothing is
    /// removed from any set. Without a selection, every set holding `source` is used.
    pub async fn copy_group_assignments(
        &self,
        session: &Session,
        source: Uuid,
        target: Uuid,
        selection: Option<&[RawRef]>,
    ) -> AppResult<BatchReport> {
        session.require_admin()?;
        if source == target {
            return Err(AppError::ValidationError {
                field: "target_group_id".to_string(),
                message: "Target group must differ from the source group".to_string(),
            });
        }
        self.require_group(source).await?;
        self.require_group(target).await?;

        let ids = match selection {
            Some(raw) => {
                validation::validate_batch_size(raw.len(), self.limits.max_bulk_items, "set_ids")?;
                assignment::normalize(raw)
            }
            None => self
                .store
                .list_sets()
                .await?
                .into_iter()
                .filter(|s| s.availability.contains(source))
                .map(|s| s.id)
                .collect(),
        };

        let mut report = BatchReport::default();
        for id in ids {
            let result = self
                .modify_set(id, |s| {
                    if !s.availability.contains(source) {
                        return Plan::Skip;
                    }
                    s.availability.with_ref(AssignmentRef::Group(target)).into()
                })
                .await;
            match result {
                Ok(outcome) => report.record(id, outcome),
                Err(e) => {
                    tracing::warn!("Copying group {} to {} failed on set {}: {}", source, target, id, e);
                    report.fail(id, e);
                }
            }
        }
        self.record_batch(&report);
        tracing::info!(
            "Copied group {} to {}: {} changed, {} unchanged, {} skipped, {} failed",
            source,
            target,
            report.changed.len(),
            report.unchanged.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn record_batch(&self, report: &BatchReport) {
        let succeeded = report.changed.len() + report.unchanged.len() + report.skipped.len();
        self.metrics.add_bulk_items(succeeded as u64, report.failed.len() as u64);
    }

    // ----- user <-> group -----

    pub async fn add_user_to_group(&self, session: &Session, user_id: Uuid, group_id: Uuid) -> AppResult<Outcome> {
        session.require_admin()?;
        self.require_group(group_id).await?;
        let outcome = self.modify_user(user_id, |u| append_ref(&u.set_assignments, AssignmentRef::Group(group_id))).await?;
        tracing::info!("Add user {} to group {}: {:?}", user_id, group_id, outcome);
        Ok(outcome)
    }

    pub async fn remove_user_from_group(&self, session: &Session, user_id: Uuid, group_id: Uuid) -> AppResult<Outcome> {
        session.require_admin()?;
        let outcome = self.modify_user(user_id, |u| strip_ref(&u.set_assignments, group_id)).await?;
        tracing::info!("Remove user {} from group {}: {:?}", user_id, group_id, outcome);
        Ok(outcome)
    }

    // ----- direct grants -----

    /// Grants one set directly to a user. A restricted set gains its own exception
    /// reference so the grant takes effect; a free set stays free.
    pub async fn grant_set_to_user(&self, session: &Session, user_id: Uuid, set_id: Uuid) -> AppResult<Outcome> {
        session.require_admin()?;
        self.require_user(user_id).await?;

        let on_set = self
            .modify_set(set_id, |s| match s.availability {
                Availability::Free => Plan::Keep,
                _ => s.availability.with_ref(AssignmentRef::DirectSet(s.id)).into(),
            })
            .await?;
        let on_user = self.modify_user(user_id, |u| append_ref(&u.set_assignments, AssignmentRef::DirectSet(set_id))).await?;

        let outcome = if on_set == Outcome::Changed || on_user == Outcome::Changed {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        };
        tracing::info!("Grant set {} to user {}: {:?}", set_id, user_id, outcome);
        Ok(outcome)
    }

    /// Removes a direct grant from the user. The set's own exception reference stays, since
    /// other users may still hold the set directly.
    pub async fn revoke_set_from_user(&self, session: &Session, user_id: Uuid, set_id: Uuid) -> AppResult<Outcome> {
        session.require_admin()?;
        let outcome = self.modify_user(user_id, |u| strip_ref(&u.set_assignments, set_id)).await?;
        tracing::info!("Revoke set {} from user {}: {:?}", set_id, user_id, outcome);
        Ok(outcome)
    }

    // ----- sets -----

    pub async fn list_sets(&self, session: &Session) -> AppResult<Vec<Set>> {
        session.require_admin()?;
        let mut sets = self.store.list_sets().await?;
        resolver::sort_sets(&mut sets);
        Ok(sets)
    }

    /// Admins see any set; everybody else only sets they are authorized for.
    pub async fn get_set(&self, session: &Session, id: Uuid) -> AppResult<Set> {
        let set = self.require_set(id).await?;
        if session.is_admin() {
            return Ok(set);
        }
        let user = self.require_user(session.user_id).await?;
        if resolver::is_authorized(&set, &user.group_ids(), &user.direct_set_ids()) {
            Ok(set)
        } else {
            Err(AppError::Forbidden(format!("Set {} is not available to you", id)))
        }
    }

    /// Sets the caller may see and book, in catalog order.
    pub async fn authorized_sets_for(&self, session: &Session) -> AppResult<Vec<Set>> {
        let user = self.require_user(session.user_id).await?;
        let sets = self.store.list_sets().await?;
        self.metrics.inc_authorized_lookups();
        Ok(resolver::authorized_sets(&user, &sets))
    }

    pub async fn create_set(&self, session: &Session, req: CreateSetRequest) -> AppResult<Set> {
        session.require_admin()?;
        let set_number = req.set_number.trim().to_string();
        if set_number.is_empty() {
            return Err(AppError::ValidationError {
                field: "set_number".to_string(),
                message: "Set number is required".to_string(),
            });
        }

        let id = Uuid::new_v4();
        let assignment = match req.assignment {
            Some(raw) => {
                let ids = assignment::normalize(&raw);
                let groups = self.store.group_ids().await?;
                check_refs(&ids, |r| groups.contains(r) || *r == id, "assignment", "an assignment group")?;
                Some(ids)
            }
            None if req.restricted => Some(Vec::new()),
            None => None,
        };

        let set = self
            .store
            .create_set(
                NewSet {
                    id,
                    manufacturer_id: req.manufacturer_id,
                    set_name_id: req.set_name_id,
                    category_id: req.category_id,
                    set_number,
                    state_id: req.state_id,
                    assignment,
                },
                &[],
            )
            .await?;
        tracing::info!("Created set {} ({:?})", set.id, set.availability.state());
        Ok(set)
    }

    /// Applies field changes and, when `assignment` is given, replaces the availability.
    /// `Some(None)` makes the set free. Everything is checked before the single write, so a
    /// rejected request leaves the set untouched.
    pub async fn update_set(
        &self,
        session: &Session,
        id: Uuid,
        patch: SetPatch,
        assignment: Option<Option<Vec<RawRef>>>,
    ) -> AppResult<Set> {
        session.require_admin()?;
        self.require_set(id).await?;
        if let Some(n) = &patch.set_number {
            if n.trim().is_empty() {
                return Err(AppError::ValidationError {
                    field: "set_number".to_string(),
                    message: "Set number cannot be empty".to_string(),
                });
            }
        }
        let next = match assignment {
            Some(raw) => Some(self.planned_availability(id, raw.as_deref()).await?),
            None => None,
        };

        for attempt in 1..=self.limits.max_write_attempts {
            let set = self.require_set(id).await?;
            let availability = next.as_ref().filter(|a| **a != set.availability);
            if patch.is_empty() && availability.is_none() {
                return Ok(set);
            }
            if self.store.update_set_fields(id, set.version, &patch, availability).await? {
                tracing::info!(
                    "Updated set {} (availability {:?})",
                    id,
                    availability.map(Availability::state)
                );
                return self.require_set(id).await;
            }
            tracing::debug!("Set {} changed underneath us (attempt {})", id, attempt);
        }
        Err(self.gave_up("Set", id))
    }

    /// The availability a replacement would store, after checking every reference.
    async fn planned_availability(&self, id: Uuid, raw: Option<&[RawRef]>) -> AppResult<Availability> {
        let Some(raw) = raw else {
            return Ok(Availability::Free);
        };
        let groups = self.store.group_ids().await?;
        let ids = assignment::normalize(raw);
        check_refs(&ids, |r| groups.contains(r) || *r == id, "set_assignment", "an assignment group")?;
        Ok(Availability::from_ids(Some(ids), &groups))
    }

    /// Strips the set from every user's direct grants, then deletes it with its products.
    pub async fn delete_set(&self, session: &Session, set_id: Uuid) -> AppResult<DeleteSetReport> {
        session.require_admin()?;
        self.require_set(set_id).await?;
        let mut report = DeleteSetReport::default();

        for user in self.store.list_users().await? {
            if !user.holds(set_id) {
                continue;
            }
            match self.modify_user(user.id, |u| strip_ref(&u.set_assignments, set_id)).await {
                Ok(Outcome::Changed) => report.removed_from_users += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to remove set {} from user {}: {}", set_id, user.id, e);
                    report.failed.push(ItemFailure { id: user.id, error: e.to_string() });
                }
            }
        }
        self.metrics.add_references_removed(report.removed_from_users as u64);

        if !report.failed.is_empty() {
            tracing::warn!("Kept set {}: {} user(s) could not be cleaned up", set_id, report.failed.len());
            return Ok(report);
        }
        match self.store.delete_set(set_id).await {
            Ok(deleted) => report.set_deleted = deleted,
            Err(e) => {
                tracing::warn!("Failed to delete set {} after cleanup: {}", set_id, e);
                report.failed.push(ItemFailure { id: set_id, error: AppError::from(e).to_string() });
                return Ok(report);
            }
        }
        tracing::info!("Deleted set {}: removed from {} user(s)", set_id, report.removed_from_users);
        Ok(report)
    }

    // ----- set copy -----

    pub async fn prepare_set_copy(&self, session: &Session, set_id: Uuid) -> AppResult<SetCopyDraft> {
        session.require_admin()?;
        let set = self.require_set(set_id).await?;
        let products = self.store.list_products(set_id).await?;
        Ok(set_copy::prepare_draft(&set, &products))
    }

    /// Creates a new set with all drafted products, or nothing at all when any product
    /// fails validation or repeats an identity value.
    pub async fn commit_set_copy(&self, session: &Session, set_id: Uuid, draft: SetCopyDraft) -> AppResult<SetCopyResult> {
        session.require_admin()?;
        self.require_set(set_id).await?;
        validation::validate_batch_size(draft.products.len(), self.limits.max_bulk_items, "products")?;
        set_copy::check_draft(&draft)?;

        let new_id = Uuid::new_v4();
        let assignment = match &draft.assignment {
            None => None,
            Some(raw) => {
                // the source's own exception becomes the copy's exception
                let ids: Vec<Uuid> = assignment::normalize(raw)
                    .into_iter()
                    .map(|id| if id == set_id { new_id } else { id })
                    .collect();
                let groups = self.store.group_ids().await?;
                check_refs(&ids, |r| groups.contains(r) || *r == new_id, "assignment", "an assignment group")?;
                Some(ids)
            }
        };

        let set = self
            .store
            .create_set(
                NewSet {
                    id: new_id,
                    manufacturer_id: draft.manufacturer_id,
                    set_name_id: draft.set_name_id,
                    category_id: draft.category_id,
                    set_number: draft.set_number.trim().to_string(),
                    state_id: draft.state_id.clone(),
                    assignment,
                },
                &draft.products,
            )
            .await?;
        let products = self.store.list_products(set.id).await?;
        self.metrics.inc_sets_copied();
        tracing::info!("Copied set {} to {} with {} product(s)", set_id, set.id, products.len());
        Ok(SetCopyResult { set, products })
    }

    // ----- users -----

    pub async fn list_users(&self, session: &Session) -> AppResult<Vec<User>> {
        session.require_admin()?;
        Ok(self.store.list_users().await?)
    }

    /// Admins may read any user; everybody else only themselves.
    pub async fn get_user(&self, session: &Session, id: Uuid) -> AppResult<User> {
        if !session.is_admin() && session.user_id != id {
            return Err(AppError::Forbidden("You may only view your own account".to_string()));
        }
        self.require_user(id).await
    }

    pub async fn create_user(&self, session: &Session, req: CreateUserRequest) -> AppResult<User> {
        session.require_admin()?;
        let username = validation::validate_name(&req.username, "username")?;
        let ids = assignment::normalize(&req.set_assignments);
        self.check_user_refs(&ids).await?;
        let user = self.store.create_user(&username, req.role.unwrap_or(Role::User), &ids).await?;
        tracing::info!("Created user {} ({})", user.id, user.username);
        Ok(user)
    }

    /// Changes the role and/or replaces the assignment list. References are checked before
    /// anything is written, and both changes commit together.
    pub async fn update_user(&self, session: &Session, id: Uuid, req: UpdateUserRequest) -> AppResult<User> {
        session.require_admin()?;
        self.require_user(id).await?;
        let next = match req.set_assignments {
            Some(raw) => {
                let ids = assignment::normalize(&raw);
                self.check_user_refs(&ids).await?;
                let groups = self.store.group_ids().await?;
                Some(assignment::classify(ids, &groups))
            }
            None => None,
        };

        for attempt in 1..=self.limits.max_write_attempts {
            let user = self.require_user(id).await?;
            let role = req.role.filter(|r| *r != user.role);
            let refs = next.as_deref().filter(|n| *n != user.set_assignments.as_slice());
            if role.is_none() && refs.is_none() {
                return Ok(user);
            }
            if self.store.update_profile(id, user.version, role, refs).await? {
                tracing::info!("Updated user {} (role {:?}, assignments replaced: {})", id, role, refs.is_some());
                return self.require_user(id).await;
            }
            tracing::debug!("User {} changed underneath us (attempt {})", id, attempt);
        }
        Err(self.gave_up("User", id))
    }

    pub async fn delete_user(&self, session: &Session, id: Uuid) -> AppResult<()> {
        session.require_admin()?;
        if !self.store.delete_user(id).await? {
            return Err(user_not_found(id));
        }
        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    /// A user's references must name existing groups or sets.
    async fn check_user_refs(&self, ids: &[Uuid]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let groups = self.store.group_ids().await?;
        let sets: HashSet<Uuid> = self.store.list_sets().await?.into_iter().map(|s| s.id).collect();
        check_refs(
            ids,
            |r| groups.contains(r) || sets.contains(r),
            "set_assignments",
            "an assignment group or set",
        )
    }
}

fn append_ref(refs: &[AssignmentRef], r: AssignmentRef) -> Plan<Vec<AssignmentRef>> {
    if refs.iter().any(|x| x.id() == r.id()) {
        return Plan::Keep;
    }
    let mut next = refs.to_vec();
    next.push(r);
    Plan::Write(next)
}

fn strip_ref(refs: &[AssignmentRef], id: Uuid) -> Plan<Vec<AssignmentRef>> {
    if !refs.iter().any(|r| r.id() == id) {
        return Plan::Keep;
    }
    Plan::Write(refs.iter().copied().filter(|r| r.id() != id).collect())
}
