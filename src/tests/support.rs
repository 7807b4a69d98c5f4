//! Shared fixtures: an in-memory database, an admin session and helpers to seed records.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::assignment::RawRef;
use crate::config::{AppConfig, EngineConfig};
use crate::consistency::ConsistencyEngine;
use crate::session::Session;
use crate::state::AppState;
use crate::store::{AssignmentStore, Lookup, LookupStore, SetCatalog, SqliteStore, UserDirectory};
use crate::types::{AssignmentGroup, CreateSetRequest, NamedEntry, ProductDraft, Role, Set, User};

pub async fn memory_pool() -> SqlitePool {
    // a single connection keeps the in-memory database alive and shared
    let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    pool
}

pub fn complete_product() -> ProductDraft {
    ProductDraft {
        manufacturer_id: Some(Uuid::new_v4()),
        product_type: "Akkuschrauber".into(),
        designation: "GSR 12V".into(),
        cost_center: "4711".into(),
        department: "Werkstatt".into(),
        active_state: "aktiv".into(),
        ..Default::default()
    }
}

pub struct Fixture {
    pub state: AppState,
    pub admin: Session,
    pub admin_token: String,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_engine(EngineConfig::default()).await
    }

    pub async fn with_engine(engine: EngineConfig) -> Self {
        let pool = memory_pool().await;
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.engine = engine;
        let state = AppState::new(pool, config);

        let admin = state.store.create_user("admin", Role::Admin, &[]).await.unwrap();
        let mut fixture = Self { state, admin: Session::for_user(&admin), admin_token: String::new() };
        fixture.admin_token = fixture.token_for(admin.id).await;
        fixture
    }

    pub fn engine(&self) -> ConsistencyEngine<SqliteStore> {
        self.state.engine()
    }

    pub fn store(&self) -> &SqliteStore {
        &self.state.store
    }

    /// Inserts a session row and returns its bearer token.
    pub async fn token_for(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO sessions (token, user_id) VALUES (?1, ?2)")
            .bind(&token)
            .bind(user_id.to_string())
            .execute(&self.state.db)
            .await
            .unwrap();
        token
    }

    pub async fn group(&self, name: &str) -> AssignmentGroup {
        self.engine().create_group(&self.admin, name).await.unwrap()
    }

    async fn entry(&self, lookup: Lookup, name: &str) -> NamedEntry {
        let existing = self.store().list_entries(lookup).await.unwrap();
        match existing.into_iter().find(|e| e.name == name) {
            Some(e) => e,
            None => self.store().create_entry(lookup, name).await.unwrap(),
        }
    }

    /// A set by manufacturer and set name; `None` is free availability.
    pub async fn set_named(&self, manufacturer: &str, set_name: &str, assignment: Option<Vec<Uuid>>) -> Set {
        let m = self.entry(Lookup::Manufacturers, manufacturer).await;
        let n = self.entry(Lookup::SetNames, set_name).await;
        let req = CreateSetRequest {
            manufacturer_id: m.id,
            set_name_id: n.id,
            category_id: None,
            set_number: "1".to_string(),
            state_id: None,
            restricted: false,
            assignment: assignment.map(|ids| ids.into_iter().map(RawRef::from).collect()),
        };
        self.engine().create_set(&self.admin, req).await.unwrap()
    }

    pub async fn set(&self, assignment: Option<Vec<Uuid>>) -> Set {
        self.set_named("Bosch", "Akkuschrauber", assignment).await
    }

    pub async fn user(&self, username: &str, refs: Vec<Uuid>) -> User {
        self.store().create_user(username, Role::User, &refs).await.unwrap()
    }

    pub async fn reload_set(&self, id: Uuid) -> Set {
        self.store().get_set(id).await.unwrap().expect("set exists")
    }

    pub async fn reload_user(&self, id: Uuid) -> User {
        self.store().get_user(id).await.unwrap().expect("user exists")
    }

    pub async fn group_exists(&self, id: Uuid) -> bool {
        self.store().get_group(id).await.unwrap().is_some()
    }
}
