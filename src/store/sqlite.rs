//! SQLite implementation of the store contracts.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use super::{
    name_key, AssignmentStore, Lookup, LookupStore, SetCatalog, StoreError, StoreResult, UserDirectory,
};
use crate::assignment::{self, AssignmentRef, Availability, RawRef};
use crate::types::{AssignmentGroup, NamedEntry, NewSet, Product, ProductDraft, Role, Set, SetPatch, User};

const SET_SELECT: &str = r#"SELECT s.id, s.manufacturer_id, m.name AS manufacturer_name,
           s.set_name_id, n.name AS set_name, s.category_id, s.set_number, s.state_id,
           s.assignment, s.version
    FROM sets s
    JOIN manufacturers m ON m.id = s.manufacturer_id
    JOIN set_names n ON n.id = s.set_name_id"#;

const USER_SELECT: &str = "SELECT id, username, role, set_assignments, version FROM users";

const PRODUCT_SELECT: &str = r#"SELECT id, set_id, manufacturer_id, product_type, designation, cost_center,
           department, active_state, serial_number, electrical_test_required, testing_interval,
           inspection_id, inventoried, area_code, inventory_number
    FROM products"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_id(entity: &'static str, raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt {
        entity,
        id: raw.to_string(),
        message: format!("invalid UUID: {e}"),
    })
}

fn parse_opt_id(entity: &'static str, raw: Option<String>) -> StoreResult<Option<Uuid>> {
    raw.as_deref().map(|s| parse_id(entity, s)).transpose()
}

/// Maps constraint violations on insert/update to domain errors.
fn map_write_error(err: sqlx::Error, entity: &'static str, name: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateName { entity, name: name.to_string() };
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::MissingReference(format!("{} references a record that does not exist", entity));
        }
    }
    StoreError::Database(err)
}

/// Decodes a stored id list, accepting legacy populated objects. Unreadable data is
/// reported as `None` so callers can apply their default.
fn decode_ids(entity: &'static str, id: &str, raw: &str) -> Option<Vec<Uuid>> {
    match serde_json::from_str::<Vec<RawRef>>(raw) {
        Ok(refs) => Some(assignment::normalize(&refs)),
        Err(e) => {
            tracing::warn!("Unreadable assignment list on {} {}: {}", entity, id, e);
            None
        }
    }
}

fn encode_ids(ids: &[Uuid]) -> StoreResult<String> {
    Ok(serde_json::to_string(ids)?)
}

fn set_from_row(row: &SqliteRow, group_ids: &HashSet<Uuid>) -> StoreResult<Set> {
    let id_raw: String = row.try_get("id")?;
    // Missing or unreadable assignment data falls back to free availability
    let stored: Option<String> = row.try_get("assignment")?;
    let ids = stored.as_deref().and_then(|raw| decode_ids("set", &id_raw, raw));
    Ok(Set {
        id: parse_id("set", &id_raw)?,
        manufacturer_id: parse_id("set", &row.try_get::<String, _>("manufacturer_id")?)?,
        manufacturer_name: row.try_get("manufacturer_name")?,
        set_name_id: parse_id("set", &row.try_get::<String, _>("set_name_id")?)?,
        set_name: row.try_get("set_name")?,
        category_id: parse_opt_id("set", row.try_get("category_id")?)?,
        set_number: row.try_get("set_number")?,
        state_id: row.try_get("state_id")?,
        availability: Availability::from_ids(ids, group_ids),
        version: row.try_get("version")?,
    })
}

fn user_from_row(row: &SqliteRow, group_ids: &HashSet<Uuid>) -> StoreResult<User> {
    let id_raw: String = row.try_get("id")?;
    let stored: String = row.try_get("set_assignments")?;
    let ids = decode_ids("user", &id_raw, &stored).unwrap_or_default();
    Ok(User {
        id: parse_id("user", &id_raw)?,
        username: row.try_get("username")?,
        role: Role::parse(&row.try_get::<String, _>("role")?),
        set_assignments: assignment::classify(ids, group_ids),
        version: row.try_get("version")?,
    })
}

fn product_from_row(row: &SqliteRow) -> StoreResult<Product> {
    Ok(Product {
        id: parse_id("product", &row.try_get::<String, _>("id")?)?,
        set_id: parse_id("product", &row.try_get::<String, _>("set_id")?)?,
        fields: ProductDraft {
            manufacturer_id: parse_opt_id("product", row.try_get("manufacturer_id")?)?,
            product_type: row.try_get("product_type")?,
            designation: row.try_get("designation")?,
            cost_center: row.try_get("cost_center")?,
            department: row.try_get("department")?,
            active_state: row.try_get("active_state")?,
            serial_number: row.try_get("serial_number")?,
            electrical_test_required: row.try_get("electrical_test_required")?,
            testing_interval: row.try_get("testing_interval")?,
            inspection_id: row.try_get("inspection_id")?,
            inventoried: row.try_get("inventoried")?,
            area_code: row.try_get("area_code")?,
            inventory_number: row.try_get("inventory_number")?,
        },
    })
}

#[async_trait]
impl AssignmentStore for SqliteStore {
    async fn list_groups(&self) -> StoreResult<Vec<AssignmentGroup>> {
        let rows = sqlx::query("SELECT id, name FROM assignment_groups ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                Ok(AssignmentGroup {
                    id: parse_id("assignment group", &r.try_get::<String, _>("id")?)?,
                    name: r.try_get("name")?,
                })
            })
            .collect()
    }

    async fn get_group(&self, id: Uuid) -> StoreResult<Option<AssignmentGroup>> {
        let row = sqlx::query("SELECT name FROM assignment_groups WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(r) => Some(AssignmentGroup { id, name: r.try_get("name")? }),
            None => None,
        })
    }

    async fn create_group(&self, name: &str) -> StoreResult<AssignmentGroup> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO assignment_groups (id, name, name_key) VALUES (?1, ?2, ?3)")
            .bind(id.to_string())
            .bind(name)
            .bind(name_key(name))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "assignment group", name))?;
        Ok(AssignmentGroup { id, name: name.to_string() })
    }

    async fn rename_group(&self, id: Uuid, name: &str) -> StoreResult<AssignmentGroup> {
        let res = sqlx::query("UPDATE assignment_groups SET name = ?1, name_key = ?2 WHERE id = ?3")
            .bind(name)
            .bind(name_key(name))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "assignment group", name))?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "assignment group", id });
        }
        Ok(AssignmentGroup { id, name: name.to_string() })
    }

    async fn delete_group(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM assignment_groups WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn group_ids(&self) -> StoreResult<HashSet<Uuid>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM assignment_groups")
            .fetch_all(&self.pool)
            .await?;
        ids.iter().map(|s| parse_id("assignment group", s)).collect()
    }
}

#[async_trait]
impl SetCatalog for SqliteStore {
    async fn list_sets(&self) -> StoreResult<Vec<Set>> {
        let group_ids = self.group_ids().await?;
        let rows = sqlx::query(SET_SELECT).fetch_all(&self.pool).await?;
        rows.iter().map(|r| set_from_row(r, &group_ids)).collect()
    }

    async fn get_set(&self, id: Uuid) -> StoreResult<Option<Set>> {
        let group_ids = self.group_ids().await?;
        let row = sqlx::query(&format!("{} WHERE s.id = ?1", SET_SELECT))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| set_from_row(&r, &group_ids)).transpose()
    }

    async fn create_set(&self, set: NewSet, products: &[ProductDraft]) -> StoreResult<Set> {
        let assignment = set.assignment.as_deref().map(encode_ids).transpose()?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO sets (id, manufacturer_id, set_name_id, category_id, set_number, state_id, assignment)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(set.id.to_string())
        .bind(set.manufacturer_id.to_string())
        .bind(set.set_name_id.to_string())
        .bind(set.category_id.map(|c| c.to_string()))
        .bind(&set.set_number)
        .bind(&set.state_id)
        .bind(assignment)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "set", &set.set_number))?;

        for p in products {
            sqlx::query(
                r#"INSERT INTO products (id, set_id, manufacturer_id, product_type, designation, cost_center,
                       department, active_state, serial_number, electrical_test_required, testing_interval,
                       inspection_id, inventoried, area_code, inventory_number)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(set.id.to_string())
            .bind(p.manufacturer_id.map(|m| m.to_string()))
            .bind(&p.product_type)
            .bind(&p.designation)
            .bind(&p.cost_center)
            .bind(&p.department)
            .bind(&p.active_state)
            .bind(&p.serial_number)
            .bind(p.electrical_test_required)
            .bind(&p.testing_interval)
            .bind(&p.inspection_id)
            .bind(p.inventoried)
            .bind(&p.area_code)
            .bind(&p.inventory_number)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "product", &p.designation))?;
        }
        tx.commit().await?;

        self.get_set(set.id).await?.ok_or(StoreError::NotFound { entity: "set", id: set.id })
    }

    async fn update_set_fields(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &SetPatch,
        availability: Option<&Availability>,
    ) -> StoreResult<bool> {
        let label = patch.set_number.clone().unwrap_or_default();
        let stored = match availability {
            Some(a) => a.ids().as_deref().map(encode_ids).transpose()?,
            None => None,
        };
        let res = sqlx::query(
            r#"UPDATE sets SET
                   manufacturer_id = COALESCE(?1, manufacturer_id),
                   set_name_id = COALESCE(?2, set_name_id),
                   category_id = COALESCE(?3, category_id),
                   set_number = COALESCE(?4, set_number),
                   state_id = COALESCE(?5, state_id),
                   assignment = CASE WHEN ?6 THEN ?7 ELSE assignment END,
                   version = version + 1
               WHERE id = ?8 AND version = ?9"#,
        )
        .bind(patch.manufacturer_id.map(|v| v.to_string()))
        .bind(patch.set_name_id.map(|v| v.to_string()))
        .bind(patch.category_id.map(|v| v.to_string()))
        .bind(&patch.set_number)
        .bind(&patch.state_id)
        .bind(availability.is_some())
        .bind(stored)
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "set", &label))?;
        Ok(res.rows_affected() == 1)
    }

    async fn write_availability(
        &self,
        id: Uuid,
        expected_version: i64,
        availability: &Availability,
    ) -> StoreResult<bool> {
        let stored = availability.ids().as_deref().map(encode_ids).transpose()?;
        let res = sqlx::query(
            "UPDATE sets SET assignment = ?1, version = version + 1 WHERE id = ?2 AND version = ?3",
        )
        .bind(stored)
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete_set(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM products WHERE set_id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM sets WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_products(&self, set_id: Uuid) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!("{} WHERE set_id = ?1 ORDER BY rowid", PRODUCT_SELECT))
            .bind(set_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(product_from_row).collect()
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let group_ids = self.group_ids().await?;
        let rows = sqlx::query(&format!("{} ORDER BY username", USER_SELECT))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| user_from_row(r, &group_ids)).collect()
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let group_ids = self.group_ids().await?;
        let row = sqlx::query(&format!("{} WHERE id = ?1", USER_SELECT))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| user_from_row(&r, &group_ids)).transpose()
    }

    async fn create_user(&self, username: &str, role: Role, refs: &[Uuid]) -> StoreResult<User> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, username, role, set_assignments) VALUES (?1, ?2, ?3, ?4)")
            .bind(id.to_string())
            .bind(username)
            .bind(role.as_str())
            .bind(encode_ids(refs)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "user", username))?;
        self.get_user(id).await?.ok_or(StoreError::NotFound { entity: "user", id })
    }

    async fn update_profile(
        &self,
        id: Uuid,
        expected_version: i64,
        role: Option<Role>,
        refs: Option<&[AssignmentRef]>,
    ) -> StoreResult<bool> {
        let stored = refs
            .map(|refs| encode_ids(&refs.iter().map(AssignmentRef::id).collect::<Vec<_>>()))
            .transpose()?;
        let res = sqlx::query(
            r#"UPDATE users SET
                   role = COALESCE(?1, role),
                   set_assignments = COALESCE(?2, set_assignments),
                   version = version + 1
               WHERE id = ?3 AND version = ?4"#,
        )
        .bind(role.map(|r| r.as_str()))
        .bind(stored)
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn write_assignments(
        &self,
        id: Uuid,
        expected_version: i64,
        refs: &[AssignmentRef],
    ) -> StoreResult<bool> {
        let ids: Vec<Uuid> = refs.iter().map(AssignmentRef::id).collect();
        let res = sqlx::query(
            "UPDATE users SET set_assignments = ?1, version = version + 1 WHERE id = ?2 AND version = ?3",
        )
        .bind(encode_ids(&ids)?)
        .bind(id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>> {
        let group_ids = self.group_ids().await?;
        let row = sqlx::query(
            r#"SELECT u.id, u.username, u.role, u.set_assignments, u.version
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token = ?1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| user_from_row(&r, &group_ids)).transpose()
    }
}

#[async_trait]
impl LookupStore for SqliteStore {
    async fn list_entries(&self, lookup: Lookup) -> StoreResult<Vec<NamedEntry>> {
        let rows = sqlx::query(&format!("SELECT id, name FROM {} ORDER BY name", lookup.table()))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                Ok(NamedEntry {
                    id: parse_id(lookup.entity(), &r.try_get::<String, _>("id")?)?,
                    name: r.try_get("name")?,
                })
            })
            .collect()
    }

    async fn create_entry(&self, lookup: Lookup, name: &str) -> StoreResult<NamedEntry> {
        let id = Uuid::new_v4();
        sqlx::query(&format!("INSERT INTO {} (id, name, name_key) VALUES (?1, ?2, ?3)", lookup.table()))
            .bind(id.to_string())
            .bind(name)
            .bind(name_key(name))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, lookup.entity(), name))?;
        Ok(NamedEntry { id, name: name.to_string() })
    }

    async fn rename_entry(&self, lookup: Lookup, id: Uuid, name: &str) -> StoreResult<NamedEntry> {
        let res = sqlx::query(&format!("UPDATE {} SET name = ?1, name_key = ?2 WHERE id = ?3", lookup.table()))
            .bind(name)
            .bind(name_key(name))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, lookup.entity(), name))?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: lookup.entity(), id });
        }
        Ok(NamedEntry { id, name: name.to_string() })
    }
}
