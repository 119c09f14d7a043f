//! Single-table CRUD against a real SQLite database.

use std::sync::LazyLock;
use tempfile::NamedTempFile;
use tinyorm::{
    Db, FieldDescriptor, Limit, Model, OrmError, OrmResult, PoolConfig, Row, SqlValue, TableSchema,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

fn next_id() -> SqlValue {
    SqlValue::from(uuid::Uuid::new_v4().simple().to_string())
}

#[derive(Debug, Default, Clone, PartialEq)]
struct User {
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    passwd: Option<String>,
    image: Option<String>,
}

static USER_SCHEMA: LazyLock<TableSchema> = LazyLock::new(|| {
    TableSchema::builder("users")
        .field(
            "id",
            FieldDescriptor::with_type("varchar(50)")
                .primary_key()
                .default_factory(next_id),
        )
        .field("name", FieldDescriptor::string())
        .field("email", FieldDescriptor::string())
        .field("passwd", FieldDescriptor::string())
        .field(
            "image",
            FieldDescriptor::string().default_value("about:blank"),
        )
        .build()
        .expect("valid users schema")
});

impl Model for User {
    fn schema() -> &'static TableSchema {
        &USER_SCHEMA
    }

    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: row.get_str("id"),
            name: row.get_str("name"),
            email: row.get_str("email"),
            passwd: row.get_str("passwd"),
            image: row.get_str("image"),
        })
    }

    fn get(&self, attr: &str) -> Option<SqlValue> {
        match attr {
            "id" => self.id.clone().map(SqlValue::from),
            "name" => self.name.clone().map(SqlValue::from),
            "email" => self.email.clone().map(SqlValue::from),
            "passwd" => self.passwd.clone().map(SqlValue::from),
            "image" => self.image.clone().map(SqlValue::from),
            _ => None,
        }
    }

    fn set(&mut self, attr: &str, value: SqlValue) {
        let value = value.as_str().map(String::from);
        match attr {
            "id" => self.id = value,
            "name" => self.name = value,
            "email" => self.email = value,
            "passwd" => self.passwd = value,
            "image" => self.image = value,
            _ => {}
        }
    }
}

fn test_user(id: &str, name: &str, email: &str) -> User {
    User {
        id: Some(id.to_string()),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        passwd: Some("1234567890".to_string()),
        image: Some("about:blank".to_string()),
    }
}

async fn setup() -> (Db, NamedTempFile) {
    init_tracing();
    let file = NamedTempFile::new().unwrap();
    let db = Db::connect(PoolConfig::sqlite(file.path().to_str().unwrap()))
        .await
        .unwrap();
    db.mutate(
        "CREATE TABLE users (id varchar(50) PRIMARY KEY, name varchar(100), \
         email varchar(100), passwd varchar(100), image varchar(100))",
        &[],
    )
    .await
    .unwrap();
    (db, file)
}

#[tokio::test]
async fn test_save_then_find_by_key_round_trip() {
    let (db, _file) = setup().await;

    let mut user = test_user("u1", "Test", "test@example.com");
    let affected = user.save(&db).await.unwrap();
    assert_eq!(affected, 1);

    let found = User::find_by_key(&db, "u1").await.unwrap().unwrap();
    assert_eq!(found.id.as_deref(), Some("u1"));
    assert_eq!(found.name.as_deref(), Some("Test"));
    assert_eq!(found.email.as_deref(), Some("test@example.com"));
    assert_eq!(found.passwd.as_deref(), Some("1234567890"));
    assert_eq!(found.image.as_deref(), Some("about:blank"));
}

#[tokio::test]
async fn test_find_by_key_absent() {
    let (db, _file) = setup().await;
    let found = User::find_by_key(&db, "missing").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_save_resolves_defaults_and_persists_them() {
    let (db, _file) = setup().await;

    let mut user = User {
        name: Some("Defaulted".to_string()),
        email: Some("d@example.com".to_string()),
        passwd: Some("pw".to_string()),
        ..Default::default()
    };
    user.save(&db).await.unwrap();

    // Resolved defaults were written back onto the record.
    let id = user.id.clone().expect("factory id persisted on record");
    assert_eq!(user.image.as_deref(), Some("about:blank"));

    // And they round-trip through the database.
    let found = User::find_by_key(&db, id.as_str()).await.unwrap().unwrap();
    assert_eq!(found.image.as_deref(), Some("about:blank"));
    assert_eq!(found.name.as_deref(), Some("Defaulted"));
}

#[tokio::test]
async fn test_update_then_find_reflects_new_values() {
    let (db, _file) = setup().await;

    let mut user = test_user("u1", "Before", "before@example.com");
    user.save(&db).await.unwrap();

    user.name = Some("After".to_string());
    user.email = Some("after@example.com".to_string());
    let affected = user.update(&db).await.unwrap();
    assert_eq!(affected, 1);

    let found = User::find_by_key(&db, "u1").await.unwrap().unwrap();
    assert_eq!(found.name.as_deref(), Some("After"));
    assert_eq!(found.email.as_deref(), Some("after@example.com"));
}

#[tokio::test]
async fn test_update_uses_current_values_without_defaults() {
    let (db, _file) = setup().await;

    let mut user = test_user("u1", "Test", "test@example.com");
    user.save(&db).await.unwrap();

    // An unset attribute updates to NULL, not to its declared default.
    user.image = None;
    user.update(&db).await.unwrap();

    let found = User::find_by_key(&db, "u1").await.unwrap().unwrap();
    assert_eq!(found.image, None);
}

#[tokio::test]
async fn test_remove_then_find_absent() {
    let (db, _file) = setup().await;

    let mut user = test_user("u1", "Test", "test@example.com");
    user.save(&db).await.unwrap();

    let affected = user.remove(&db).await.unwrap();
    assert_eq!(affected, 1);
    assert!(User::find_by_key(&db, "u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_missing_row_is_anomaly_not_error() {
    let (db, _file) = setup().await;
    let user = test_user("ghost", "Nobody", "n@example.com");
    let affected = user.update(&db).await.unwrap();
    assert_eq!(affected, 0);
    let affected = user.remove(&db).await.unwrap();
    assert_eq!(affected, 0);
}

async fn insert_many(db: &Db, count: usize) {
    for i in 0..count {
        let mut user = test_user(
            &format!("u{i:02}"),
            &format!("User {i:02}"),
            &format!("user{i:02}@example.com"),
        );
        user.save(db).await.unwrap();
    }
}

#[tokio::test]
async fn test_find_all_returns_every_row() {
    let (db, _file) = setup().await;
    insert_many(&db, 3).await;
    let users = User::find_all(&db, None, &[], None, None).await.unwrap();
    assert_eq!(users.len(), 3);
}

#[tokio::test]
async fn test_find_all_with_filter_args() {
    let (db, _file) = setup().await;
    insert_many(&db, 3).await;
    let users = User::find_all(
        &db,
        Some("email = ?"),
        &[SqlValue::from("user01@example.com")],
        None,
        None,
    )
    .await
    .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id.as_deref(), Some("u01"));
}

#[tokio::test]
async fn test_find_all_order_by() {
    let (db, _file) = setup().await;
    insert_many(&db, 3).await;
    let users = User::find_all(&db, None, &[], Some("id DESC"), None)
        .await
        .unwrap();
    let ids: Vec<&str> = users.iter().filter_map(|u| u.id.as_deref()).collect();
    assert_eq!(ids, vec!["u02", "u01", "u00"]);
}

#[tokio::test]
async fn test_find_all_limit_count() {
    let (db, _file) = setup().await;
    insert_many(&db, 8).await;
    let users = User::find_all(&db, None, &[], Some("id"), Some(Limit::Count(5)))
        .await
        .unwrap();
    assert_eq!(users.len(), 5);
}

#[tokio::test]
async fn test_find_all_limit_offset_window() {
    let (db, _file) = setup().await;
    insert_many(&db, 20).await;
    let users = User::find_all(
        &db,
        None,
        &[],
        Some("id"),
        Some(Limit::Rows {
            offset: 10,
            count: 5,
        }),
    )
    .await
    .unwrap();
    let ids: Vec<&str> = users.iter().filter_map(|u| u.id.as_deref()).collect();
    assert_eq!(ids, vec!["u10", "u11", "u12", "u13", "u14"]);
}

#[tokio::test]
async fn test_find_count() {
    let (db, _file) = setup().await;
    insert_many(&db, 8).await;
    let count = User::find_count(&db, "count(id)", None, &[])
        .await
        .unwrap();
    assert_eq!(count, Some(8));
}

#[tokio::test]
async fn test_find_count_with_filter() {
    let (db, _file) = setup().await;
    insert_many(&db, 8).await;
    let count = User::find_count(
        &db,
        "count(id)",
        Some("id < ?"),
        &[SqlValue::from("u03")],
    )
    .await
    .unwrap();
    assert_eq!(count, Some(3));
}

#[tokio::test]
async fn test_find_count_absent_on_null_aggregate() {
    let (db, _file) = setup().await;
    // min() over an empty table yields a NULL row.
    let count = User::find_count(&db, "min(length(id))", None, &[])
        .await
        .unwrap();
    assert_eq!(count, None);
}

#[tokio::test]
async fn test_argument_count_mismatch_is_immediate_error() {
    let (db, _file) = setup().await;
    let result = db
        .query("SELECT id FROM users WHERE id = ?", &[], None)
        .await;
    assert!(matches!(result, Err(OrmError::InvalidArgument { .. })));

    let result = db
        .mutate(
            "DELETE FROM users WHERE id = ?",
            &[SqlValue::from("a"), SqlValue::from("b")],
        )
        .await;
    assert!(matches!(result, Err(OrmError::InvalidArgument { .. })));
}

#[tokio::test]
async fn test_query_row_limit_bounds_result() {
    let (db, _file) = setup().await;
    insert_many(&db, 6).await;
    let rows = db.query("SELECT id FROM users", &[], Some(2)).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_each_find_returns_independent_records() {
    let (db, _file) = setup().await;
    let mut user = test_user("u1", "Test", "test@example.com");
    user.save(&db).await.unwrap();

    let mut first = User::find_by_key(&db, "u1").await.unwrap().unwrap();
    first.name = Some("Mutated".to_string());

    let second = User::find_by_key(&db, "u1").await.unwrap().unwrap();
    assert_eq!(second.name.as_deref(), Some("Test"));
}
