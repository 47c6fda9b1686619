pub use sea_orm_migration::prelude::*;

mod m20251019_000001_create_qc_schema;
mod m20251019_000002_normalize_legacy_grades;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251019_000001_create_qc_schema::Migration),
            Box::new(m20251019_000002_normalize_legacy_grades::Migration),
        ]
    }
}
