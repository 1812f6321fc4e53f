//! Create the images table backing the Metadata Store

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Images::Table)
                    .if_not_exists()
                    .col(Self::create_id_column(manager, Images::Id))
                    .col(ColumnDef::new(Images::Url).text().not_null())
                    .col(ColumnDef::new(Images::Filename).string().not_null())
                    .col(ColumnDef::new(Images::OwnerId).big_integer().not_null())
                    .col(Self::create_timestamp_column(manager, Images::CreatedAt))
                    .col(Self::create_timestamp_column(manager, Images::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_images_owner_id_created_at")
                    .table(Images::Table)
                    .col(Images::OwnerId)
                    .col(Images::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Images::Table).to_owned())
            .await
    }
}

impl Migration {
    /// Auto-increment id; SQLite only allows AUTOINCREMENT on a plain INTEGER key
    fn create_id_column(manager: &SchemaManager<'_>, column_name: impl sea_orm::Iden + 'static) -> ColumnDef {
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Sqlite => ColumnDef::new(column_name)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
            _ => ColumnDef::new(column_name)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key()
                .to_owned(),
        }
    }

    fn create_timestamp_column(manager: &SchemaManager<'_>, column_name: impl sea_orm::Iden + 'static) -> ColumnDef {
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(column_name)
                .timestamp_with_time_zone()
                .not_null()
                .to_owned(),
            _ => ColumnDef::new(column_name).timestamp().not_null().to_owned(),
        }
    }
}

#[derive(DeriveIden)]
pub enum Images {
    Table,
    Id,
    Url,
    Filename,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}
