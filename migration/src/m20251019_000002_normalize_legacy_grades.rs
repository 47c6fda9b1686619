use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Sensory columns that older clients filled with `A`..`D` letter grades.
const SENSORY_COLUMNS: [&str; 4] = ["smell", "texture", "taste", "aspect"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // A legacy `C` grade is indistinguishable from a conforming `C` and is left as is
        let db = manager.get_connection();
        for column in SENSORY_COLUMNS {
            db.execute_unprepared(&format!(
                "UPDATE samples SET {column} = 'C' WHERE {column} IN ('A', 'B')"
            ))
            .await?;
            db.execute_unprepared(&format!(
                "UPDATE samples SET {column} = 'NC' WHERE {column} = 'D'"
            ))
            .await?;
            db.execute_unprepared(&format!(
                "UPDATE samples SET {column} = 'N' WHERE {column} IS NULL OR {column} = ''"
            ))
            .await?;
        }
        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Grades cannot be recovered once normalized
        Ok(())
    }
}
