use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Statuses and conformity values are text so the same schema runs on SQLite
        manager
            .create_table(
                Table::create()
                    .table(Forms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Forms::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Forms::ReportTitle).string().not_null())
                    .col(ColumnDef::new(Forms::Brand).string().not_null())
                    .col(ColumnDef::new(Forms::Site).string().not_null())
                    .col(
                        ColumnDef::new(Forms::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Forms::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Forms::ModifiedBy).string().not_null())
                    .col(ColumnDef::new(Forms::Version).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Forms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Forms::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Samples::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Samples::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Samples::FormId).uuid().not_null())
                    .col(ColumnDef::new(Samples::Number).string().not_null())
                    .col(ColumnDef::new(Samples::Product).string().not_null())
                    .col(ColumnDef::new(Samples::ReadyTime).string())
                    .col(ColumnDef::new(Samples::Fabrication).date())
                    .col(ColumnDef::new(Samples::Dlc).date())
                    .col(ColumnDef::new(Samples::Smell).string().not_null().default("N"))
                    .col(ColumnDef::new(Samples::Texture).string().not_null().default("N"))
                    .col(ColumnDef::new(Samples::Taste).string().not_null().default("N"))
                    .col(ColumnDef::new(Samples::Aspect).string().not_null().default("N"))
                    .col(ColumnDef::new(Samples::Ph).string())
                    .col(ColumnDef::new(Samples::Enterobacteria).string())
                    .col(ColumnDef::new(Samples::YeastMold).string())
                    .col(ColumnDef::new(Samples::ColiformsCount).integer())
                    .col(ColumnDef::new(Samples::StaphylococcusCount).integer())
                    .col(ColumnDef::new(Samples::ListeriaCount).integer())
                    .col(ColumnDef::new(Samples::EscherichiaColiCount).integer())
                    .col(ColumnDef::new(Samples::TotalFloraCount).integer())
                    .col(ColumnDef::new(Samples::LeuconostocCount).integer())
                    .col(
                        ColumnDef::new(Samples::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Samples::LabComment).text())
                    .col(ColumnDef::new(Samples::Site).string().not_null())
                    .col(ColumnDef::new(Samples::Brand).string().not_null())
                    .col(ColumnDef::new(Samples::ReportTitle).string().not_null())
                    .col(ColumnDef::new(Samples::ModifiedBy).string().not_null())
                    .col(ColumnDef::new(Samples::Version).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Samples::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Samples::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_samples_form_id")
                            .from(Samples::Table, Samples::FormId)
                            .to(Forms::Table, Forms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BacteriaSelections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BacteriaSelections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BacteriaSelections::FormId).uuid().not_null())
                    .col(
                        ColumnDef::new(BacteriaSelections::BacteriaName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BacteriaSelections::BacteriaDelay)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BacteriaSelections::ReadingDay).string())
                    .col(ColumnDef::new(BacteriaSelections::SeededAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(BacteriaSelections::DueAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(BacteriaSelections::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(BacteriaSelections::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(BacteriaSelections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BacteriaSelections::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bacteria_selections_form_id")
                            .from(BacteriaSelections::Table, BacteriaSelections::FormId)
                            .to(Forms::Table, Forms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bacteria_selections_form_bacteria")
                    .table(BacteriaSelections::Table)
                    .col(BacteriaSelections::FormId)
                    .col(BacteriaSelections::BacteriaName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // No foreign keys: history outlives cancelled drafts
        manager
            .create_table(
                Table::create()
                    .table(ChangeHistory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChangeHistory::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ChangeHistory::FormId).uuid())
                    .col(ColumnDef::new(ChangeHistory::SampleId).uuid())
                    .col(ColumnDef::new(ChangeHistory::UserName).string().not_null())
                    .col(ColumnDef::new(ChangeHistory::Role).string().not_null())
                    .col(ColumnDef::new(ChangeHistory::Action).string().not_null())
                    .col(ColumnDef::new(ChangeHistory::Field).string())
                    .col(ColumnDef::new(ChangeHistory::OldValue).text())
                    .col(ColumnDef::new(ChangeHistory::NewValue).text())
                    .col(
                        ColumnDef::new(ChangeHistory::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_change_history_form_id")
                    .table(ChangeHistory::Table)
                    .col(ChangeHistory::FormId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_samples_form_id")
                    .table(Samples::Table)
                    .col(Samples::FormId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChangeHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BacteriaSelections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Samples::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Forms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Forms {
    Table,
    Id,
    ReportTitle,
    Brand,
    Site,
    Status,
    CreatedBy,
    ModifiedBy,
    Version,
    CreatedAt,
    ModifiedAt,
}

#[derive(DeriveIden)]
enum Samples {
    Table,
    Id,
    FormId,
    Number,
    Product,
    ReadyTime,
    Fabrication,
    Dlc,
    Smell,
    Texture,
    Taste,
    Aspect,
    Ph,
    Enterobacteria,
    YeastMold,
    ColiformsCount,
    StaphylococcusCount,
    ListeriaCount,
    EscherichiaColiCount,
    TotalFloraCount,
    LeuconostocCount,
    Status,
    LabComment,
    Site,
    Brand,
    ReportTitle,
    ModifiedBy,
    Version,
    CreatedAt,
    ModifiedAt,
}

#[derive(DeriveIden)]
enum BacteriaSelections {
    Table,
    Id,
    FormId,
    BacteriaName,
    BacteriaDelay,
    ReadingDay,
    SeededAt,
    DueAt,
    Status,
    CompletedAt,
    CreatedAt,
    ModifiedAt,
}

#[derive(DeriveIden)]
enum ChangeHistory {
    Table,
    Id,
    FormId,
    SampleId,
    UserName,
    Role,
    Action,
    Field,
    OldValue,
    NewValue,
    Timestamp,
}
