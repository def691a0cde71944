use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Consents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Consents::ConsentId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Consents::CustomerId))
                    .col(
                        ColumnDef::new(Consents::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(string(Consents::RedirectUrl))
                    .col(string(Consents::FetchType))
                    .col(string(Consents::ConsentMode))
                    .col(string(Consents::PurposeCode))
                    .col(string(Consents::PurposeText))
                    .col(big_integer(Consents::RangeFrom))
                    .col(big_integer(Consents::RangeTo))
                    .col(string(Consents::DataLifeUnit))
                    .col(big_integer(Consents::DataLifeValue))
                    .col(string(Consents::FrequencyUnit))
                    .col(big_integer(Consents::FrequencyValue))
                    .col(text(Consents::FiTypes)) // JSON array
                    .col(
                        ColumnDef::new(Consents::UsageCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(big_integer_null(Consents::LastUsedAt))
                    .col(big_integer(Consents::ExpiresAt))
                    .col(text(Consents::Context)) // JSON array of {key, value}
                    .col(big_integer(Consents::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consents_customer")
                            .from(Consents::Table, Consents::CustomerId)
                            .to(Customers::Table, Customers::CustomerId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_consents_status")
                    .table(Consents::Table)
                    .col(Consents::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ConsentAccounts::Table)
                    .if_not_exists()
                    .col(string(ConsentAccounts::ConsentId))
                    .col(string(ConsentAccounts::AccountId))
                    .col(integer(ConsentAccounts::Position))
                    .primary_key(
                        Index::create()
                            .col(ConsentAccounts::ConsentId)
                            .col(ConsentAccounts::AccountId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consent_accounts_consent")
                            .from(ConsentAccounts::Table, ConsentAccounts::ConsentId)
                            .to(Consents::Table, Consents::ConsentId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consent_accounts_account")
                            .from(ConsentAccounts::Table, ConsentAccounts::AccountId)
                            .to(Accounts::Table, Accounts::AccountId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::SessionId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(Sessions::ConsentId))
                    .col(
                        ColumnDef::new(Sessions::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(string(Sessions::Format))
                    .col(big_integer(Sessions::RangeFrom))
                    .col(big_integer(Sessions::RangeTo))
                    .col(text_null(Sessions::Payload))
                    .col(big_integer(Sessions::CreatedAt))
                    .col(big_integer_null(Sessions::CompletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_consent")
                            .from(Sessions::Table, Sessions::ConsentId)
                            .to(Consents::Table, Consents::ConsentId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sessions_consent")
                    .table(Sessions::Table)
                    .col(Sessions::ConsentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ConsentAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Consents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    CustomerId,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    AccountId,
}

#[derive(DeriveIden)]
enum Consents {
    Table,
    ConsentId,
    CustomerId,
    Status,
    RedirectUrl,
    FetchType,
    ConsentMode,
    PurposeCode,
    PurposeText,
    RangeFrom,
    RangeTo,
    DataLifeUnit,
    DataLifeValue,
    FrequencyUnit,
    FrequencyValue,
    FiTypes,
    UsageCount,
    LastUsedAt,
    ExpiresAt,
    Context,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ConsentAccounts {
    Table,
    ConsentId,
    AccountId,
    Position,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    SessionId,
    ConsentId,
    Status,
    Format,
    RangeFrom,
    RangeTo,
    Payload,
    CreatedAt,
    CompletedAt,
}
