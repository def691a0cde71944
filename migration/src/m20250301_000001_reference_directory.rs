use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::CustomerId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Customers::Name))
                    .col(string(Customers::Mobile))
                    .col(string_null(Customers::Email))
                    .col(big_integer(Customers::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Institutions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Institutions::FipId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Institutions::Name))
                    .col(string(Institutions::InstitutionType))
                    .col(
                        ColumnDef::new(Institutions::Status)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(text(Institutions::FiTypes)) // JSON array
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::AccountId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Accounts::CustomerId))
                    .col(string(Accounts::FipId))
                    .col(string(Accounts::FiType))
                    .col(string(Accounts::MaskedAccNumber))
                    .col(string_uniq(Accounts::LinkRefNumber))
                    .col(
                        ColumnDef::new(Accounts::Status)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_customer")
                            .from(Accounts::Table, Accounts::CustomerId)
                            .to(Customers::Table, Customers::CustomerId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_fip")
                            .from(Accounts::Table, Accounts::FipId)
                            .to(Institutions::Table, Institutions::FipId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_customer_fip")
                    .table(Accounts::Table)
                    .col(Accounts::CustomerId)
                    .col(Accounts::FipId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FiRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FiRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(FiRecords::AccountId))
                    .col(big_integer(FiRecords::TransactionAt))
                    .col(double(FiRecords::Amount))
                    .col(string(FiRecords::TxnType))
                    .col(text(FiRecords::Payload)) // JSON object
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fi_records_account")
                            .from(FiRecords::Table, FiRecords::AccountId)
                            .to(Accounts::Table, Accounts::AccountId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Window scans are per account, newest first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_fi_records_account_time")
                    .table(FiRecords::Table)
                    .col(FiRecords::AccountId)
                    .col(FiRecords::TransactionAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FiRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Institutions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    CustomerId,
    Name,
    Mobile,
    Email,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Institutions {
    Table,
    FipId,
    Name,
    InstitutionType,
    Status,
    FiTypes,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    AccountId,
    CustomerId,
    FipId,
    FiType,
    MaskedAccNumber,
    LinkRefNumber,
    Status,
}

#[derive(DeriveIden)]
enum FiRecords {
    Table,
    Id,
    AccountId,
    TransactionAt,
    Amount,
    TxnType,
    Payload,
}
