//! Database pool and schema bootstrap.

use crate::orm::{
    colleges, courses, departments, forum_posts, forum_replies, forum_sections, forum_threads,
    modules, post_votes, profile_modules, profiles, reply_votes, sessions, users,
};
use once_cell::sync::OnceCell;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Composite uniqueness the entity derive cannot express.
const UNIQUE_INDEXES: [&str; 3] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS unique_user_post_voter ON post_votes (user_id, post_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS unique_user_reply_voter ON reply_votes (user_id, reply_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS unique_profile_module ON profile_modules (profile_id, module_id)",
];

/// Returns the global pool. Panics if `init_db` has not run.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("Database pool is not initialized.")
}

/// Opens a connection pool. In-memory SQLite is pinned to a single
/// connection, otherwise every pooled connection would see its own database.
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());
    if url.starts_with("sqlite") && url.contains(":memory:") {
        opt.max_connections(1).min_connections(1);
    }
    opt.sqlx_logging(false);
    Database::connect(opt).await
}

/// Connects, creates the schema and installs the global pool.
pub async fn init_db(url: String) -> Result<(), DbErr> {
    let db = connect(&url).await?;
    create_schema(&db).await?;
    if DB_POOL.set(db).is_err() {
        log::warn!("init_db called twice; keeping the first pool");
    }
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

/// Creates every table and index if missing. Parents come before children.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, sessions::Entity).await?;
    create_table(db, &schema, colleges::Entity).await?;
    create_table(db, &schema, departments::Entity).await?;
    create_table(db, &schema, courses::Entity).await?;
    create_table(db, &schema, modules::Entity).await?;
    create_table(db, &schema, profiles::Entity).await?;
    create_table(db, &schema, profile_modules::Entity).await?;
    create_table(db, &schema, forum_sections::Entity).await?;
    create_table(db, &schema, forum_threads::Entity).await?;
    create_table(db, &schema, forum_posts::Entity).await?;
    create_table(db, &schema, forum_replies::Entity).await?;
    create_table(db, &schema, post_votes::Entity).await?;
    create_table(db, &schema, reply_votes::Entity).await?;

    for sql in UNIQUE_INDEXES {
        db.execute(Statement::from_string(backend, sql.to_owned()))
            .await?;
    }

    log::debug!("Database schema ready ({:?})", backend);
    Ok(())
}
