#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::migrate::MigrateDatabase;
    use sqlx::{Sqlite, SqlitePool};
    use tempfile::NamedTempFile;
    use uuid::Uuid;

    use crate::assignment::{AssignmentRef, Availability};
    use crate::db;
    use crate::store::{AssignmentStore, Lookup, LookupStore, SetCatalog, SqliteStore, StoreError, UserDirectory};
    use crate::tests::support::{complete_product, memory_pool};
    use crate::types::{NewSet, Role};

    async fn seeded_set(store: &SqliteStore, assignment: Option<Vec<Uuid>>) -> Uuid {
        let m = store.create_entry(Lookup::Manufacturers, "Makita").await.unwrap();
        let n = store.create_entry(Lookup::SetNames, "Bohrhammer").await.unwrap();
        let id = Uuid::new_v4();
        store
            .create_set(
                NewSet {
                    id,
                    manufacturer_id: m.id,
                    set_name_id: n.id,
                    category_id: None,
                    set_number: "1".into(),
                    state_id: None,
                    assignment,
                },
                &[complete_product()],
            )
            .await
            .unwrap();
        id
    }

    async fn raw_assignment(pool: &SqlitePool, set_id: Uuid, value: Option<&str>) {
        sqlx::query("UPDATE sets SET assignment = ?1 WHERE id = ?2")
            .bind(value)
            .bind(set_id.to_string())
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_init_db() {
        let pool = memory_pool().await;

        let tables: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();

        for table in ["assignment_groups", "categories", "manufacturers", "products", "sessions", "set_names", "sets", "users"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_init_db_is_idempotent_on_disk() {
        let temp_db = NamedTempFile::new().unwrap();
        let db_url = format!("sqlite:{}", temp_db.path().display());
        if !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            Sqlite::create_database(&db_url).await.unwrap();
        }
        let pool = SqlitePoolOptions::new().max_connections(1).connect(&db_url).await.unwrap();

        db::init_db(&pool).await.unwrap();
        let store = SqliteStore::new(pool.clone());
        store.create_group("Lehrer").await.unwrap();
        db::init_db(&pool).await.unwrap();
        assert_eq!(store.list_groups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_populated_references_are_read() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool.clone());
        let group = store.create_group("Lehrer").await.unwrap();
        let set_id = seeded_set(&store, None).await;

        let legacy = format!(r#"[{{"_id":"{}","name":"Lehrer"}},"{}"]"#, group.id, set_id);
        raw_assignment(&pool, set_id, Some(&legacy)).await;

        let set = store.get_set(set_id).await.unwrap().unwrap();
        assert_eq!(
            set.availability,
            Availability::Restricted(vec![AssignmentRef::Group(group.id), AssignmentRef::DirectSet(set_id)])
        );
    }

    #[tokio::test]
    async fn test_unreadable_assignment_falls_back() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool.clone());
        let set_id = seeded_set(&store, Some(vec![])).await;
        let user = store.create_user("u", Role::User, &[]).await.unwrap();

        raw_assignment(&pool, set_id, Some("{not json")).await;
        sqlx::query("UPDATE users SET set_assignments = 'garbage' WHERE id = ?1")
            .bind(user.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(store.get_set(set_id).await.unwrap().unwrap().availability, Availability::Free);
        assert!(store.get_user(user.id).await.unwrap().unwrap().set_assignments.is_empty());
    }

    #[tokio::test]
    async fn test_restricted_empty_survives_storage() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);
        let set_id = seeded_set(&store, Some(vec![])).await;
        assert_eq!(store.get_set(set_id).await.unwrap().unwrap().availability, Availability::Restricted(vec![]));
    }

    #[tokio::test]
    async fn test_unknown_manufacturer_is_a_missing_reference() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);
        let n = store.create_entry(Lookup::SetNames, "Bohrhammer").await.unwrap();

        let err = store
            .create_set(
                NewSet {
                    id: Uuid::new_v4(),
                    manufacturer_id: Uuid::new_v4(),
                    set_name_id: n.id,
                    category_id: None,
                    set_number: "1".into(),
                    state_id: None,
                    assignment: None,
                },
                &[],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
        assert!(store.list_sets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_names_are_unique_ignoring_case_and_whitespace() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);
        store.create_group("Lehrer Technik").await.unwrap();

        let err = store.create_group("lehrer  technik").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { .. }));

        store.create_entry(Lookup::Categories, "Werkzeug").await.unwrap();
        let err = store.create_entry(Lookup::Categories, "WERKZEUG").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { .. }));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);
        let group = store.create_group("Lehrer").await.unwrap();
        let set_id = seeded_set(&store, Some(vec![])).await;
        let set = store.get_set(set_id).await.unwrap().unwrap();

        let next = Availability::Restricted(vec![AssignmentRef::Group(group.id)]);
        assert!(store.write_availability(set_id, set.version, &next).await.unwrap());
        assert!(!store.write_availability(set_id, set.version, &Availability::Free).await.unwrap());
        assert_eq!(store.get_set(set_id).await.unwrap().unwrap().availability, next);

        let user = store.create_user("u", Role::User, &[]).await.unwrap();
        let refs = [AssignmentRef::Group(group.id)];
        assert!(store.write_assignments(user.id, user.version, &refs).await.unwrap());
        assert!(!store.write_assignments(user.id, user.version, &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_set_removes_products() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool.clone());
        let set_id = seeded_set(&store, None).await;
        assert_eq!(store.list_products(set_id).await.unwrap().len(), 1);

        assert!(store.delete_set(set_id).await.unwrap());
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&pool).await.unwrap();
        assert_eq!(remaining, 0);
        assert!(!store.delete_set(set_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_for_token() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool.clone());
        let user = store.create_user("ausleiher", Role::User, &[]).await.unwrap();
        sqlx::query("INSERT INTO sessions (token, user_id) VALUES ('tok', ?1)")
            .bind(user.id.to_string())
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(store.user_for_token("tok").await.unwrap().map(|u| u.id), Some(user.id));
        assert!(store.user_for_token("other").await.unwrap().is_none());

        // deleting the user ends its sessions
        assert!(store.delete_user(user.id).await.unwrap());
        assert!(store.user_for_token("tok").await.unwrap().is_none());
    }
}
