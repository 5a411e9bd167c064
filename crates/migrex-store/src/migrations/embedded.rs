//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

/// Schema migration metadata
pub struct SchemaMigration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations in application order
pub fn schema_migrations() -> Vec<SchemaMigration> {
    vec![
        SchemaMigration {
            id: "001_id_map",
            sql: include_str!("../../migrations/001_id_map.sql"),
        },
        SchemaMigration {
            id: "002_migration_status",
            sql: include_str!("../../migrations/002_migration_status.sql"),
        },
        SchemaMigration {
            id: "003_entities",
            sql: include_str!("../../migrations/003_entities.sql"),
        },
    ]
}
