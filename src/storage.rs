use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::{Map, Value};

use crate::entities;
use crate::errors::AaError;
use crate::model::{
    Account, Consent, ConsentDetail, ConsentStatus, ConsentUsage, Customer, DataLife, DateRange,
    FiRecord, Frequency, Institution, Session, SessionStatus,
};
use crate::repository::{
    AccountRepository, ConsentRepository, CustomerRepository, InstitutionRepository,
    RecordRepository, SessionRepository,
};
use crate::settings::Database as DbCfg;

/// sea-orm backed implementation of every repository.
#[derive(Clone, Debug)]
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn linked_accounts(&self, consent_id: &str) -> Result<Vec<String>, AaError> {
        use entities::consent_account::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::ConsentId.eq(consent_id))
            .order_by_asc(Column::Position)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|link| link.account_id)
            .collect())
    }
}

/// Connect and bring the schema up to date.
pub async fn init(cfg: &DbCfg) -> Result<SqlStore, AaError> {
    let db = Database::connect(&cfg.url).await?;
    Migrator::up(&db, None).await?;
    Ok(SqlStore::new(db))
}

fn millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, AaError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| AaError::Storage(format!("timestamp out of range: {ms}")))
}

fn parse_enum<T: FromStr>(what: &str, raw: &str) -> Result<T, AaError> {
    raw.parse()
        .map_err(|_| AaError::Storage(format!("unknown {what} '{raw}'")))
}

fn customer_from_model(model: entities::customer::Model) -> Result<Customer, AaError> {
    Ok(Customer {
        customer_id: model.customer_id,
        name: model.name,
        mobile: model.mobile,
        email: model.email,
        created_at: from_millis(model.created_at)?,
    })
}

fn institution_from_model(model: entities::institution::Model) -> Result<Institution, AaError> {
    Ok(Institution {
        institution_type: parse_enum("institution type", &model.institution_type)?,
        status: parse_enum("institution status", &model.status)?,
        fi_types: serde_json::from_str(&model.fi_types)?,
        fip_id: model.fip_id,
        name: model.name,
    })
}

fn account_from_model(model: entities::account::Model) -> Result<Account, AaError> {
    Ok(Account {
        fi_type: parse_enum("fi type", &model.fi_type)?,
        status: parse_enum("account status", &model.status)?,
        account_id: model.account_id,
        customer_id: model.customer_id,
        fip_id: model.fip_id,
        masked_acc_number: model.masked_acc_number,
        link_ref_number: model.link_ref_number,
    })
}

fn record_from_model(model: entities::fi_record::Model) -> Result<FiRecord, AaError> {
    let payload: Map<String, Value> = serde_json::from_str(&model.payload)?;
    Ok(FiRecord {
        account_id: model.account_id,
        transaction_at: from_millis(model.transaction_at)?,
        amount: model.amount,
        txn_type: parse_enum("transaction type", &model.txn_type)?,
        payload,
    })
}

fn consent_from_model(
    model: entities::consent::Model,
    accounts: Vec<String>,
) -> Result<Consent, AaError> {
    Ok(Consent {
        status: parse_enum("consent status", &model.status)?,
        fetch_type: parse_enum("fetch type", &model.fetch_type)?,
        consent_mode: parse_enum("consent mode", &model.consent_mode)?,
        detail: ConsentDetail {
            purpose_code: model.purpose_code,
            purpose_text: model.purpose_text,
            fi_data_range: DateRange {
                from: from_millis(model.range_from)?,
                to: from_millis(model.range_to)?,
            },
            data_life: DataLife {
                unit: parse_enum("data life unit", &model.data_life_unit)?,
                value: model.data_life_value,
            },
            frequency: Frequency {
                unit: parse_enum("frequency unit", &model.frequency_unit)?,
                value: model.frequency_value,
            },
            fi_types: serde_json::from_str(&model.fi_types)?,
        },
        accounts,
        usage: ConsentUsage {
            count: model.usage_count,
            last_used: model.last_used_at.map(from_millis).transpose()?,
        },
        expires_at: from_millis(model.expires_at)?,
        context: serde_json::from_str(&model.context)?,
        created_at: from_millis(model.created_at)?,
        consent_id: model.consent_id,
        customer_id: model.customer_id,
        redirect_url: model.redirect_url,
    })
}

fn session_from_model(model: entities::session::Model) -> Result<Session, AaError> {
    Ok(Session {
        status: parse_enum("session status", &model.status)?,
        format: parse_enum("session format", &model.format)?,
        data_range: DateRange {
            from: from_millis(model.range_from)?,
            to: from_millis(model.range_to)?,
        },
        payload: model
            .payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        created_at: from_millis(model.created_at)?,
        completed_at: model.completed_at.map(from_millis).transpose()?,
        session_id: model.session_id,
        consent_id: model.consent_id,
    })
}

#[async_trait]
impl CustomerRepository for SqlStore {
    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, AaError> {
        entities::Customer::find_by_id(customer_id.to_string())
            .one(&self.db)
            .await?
            .map(customer_from_model)
            .transpose()
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), AaError> {
        let model = entities::customer::ActiveModel {
            customer_id: Set(customer.customer_id.clone()),
            name: Set(customer.name.clone()),
            mobile: Set(customer.mobile.clone()),
            email: Set(customer.email.clone()),
            created_at: Set(millis(&customer.created_at)),
        };
        model.insert(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl InstitutionRepository for SqlStore {
    async fn find_institution(&self, fip_id: &str) -> Result<Option<Institution>, AaError> {
        entities::Institution::find_by_id(fip_id.to_string())
            .one(&self.db)
            .await?
            .map(institution_from_model)
            .transpose()
    }

    async fn list_active_institutions(&self) -> Result<Vec<Institution>, AaError> {
        use entities::institution::{Column, Entity};

        Entity::find()
            .filter(Column::Status.eq(crate::model::EntityStatus::Active.to_string()))
            .order_by_asc(Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(institution_from_model)
            .collect()
    }

    async fn insert_institution(&self, institution: &Institution) -> Result<(), AaError> {
        let model = entities::institution::ActiveModel {
            fip_id: Set(institution.fip_id.clone()),
            name: Set(institution.name.clone()),
            institution_type: Set(institution.institution_type.to_string()),
            status: Set(institution.status.to_string()),
            fi_types: Set(serde_json::to_string(&institution.fi_types)?),
        };
        model.insert(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for SqlStore {
    async fn find_account(&self, account_id: &str) -> Result<Option<Account>, AaError> {
        entities::Account::find_by_id(account_id.to_string())
            .one(&self.db)
            .await?
            .map(account_from_model)
            .transpose()
    }

    async fn accounts_for_customer(&self, customer_id: &str) -> Result<Vec<Account>, AaError> {
        use entities::account::{Column, Entity};

        Entity::find()
            .filter(Column::CustomerId.eq(customer_id))
            .order_by_asc(Column::FipId)
            .order_by_asc(Column::AccountId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(account_from_model)
            .collect()
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AaError> {
        let model = entities::account::ActiveModel {
            account_id: Set(account.account_id.clone()),
            customer_id: Set(account.customer_id.clone()),
            fip_id: Set(account.fip_id.clone()),
            fi_type: Set(account.fi_type.to_string()),
            masked_acc_number: Set(account.masked_acc_number.clone()),
            link_ref_number: Set(account.link_ref_number.clone()),
            status: Set(account.status.to_string()),
        };
        model.insert(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for SqlStore {
    async fn records_in_window(
        &self,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<FiRecord>, AaError> {
        use entities::fi_record::{Column, Entity};

        Entity::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::TransactionAt.gte(millis(&from)))
            .filter(Column::TransactionAt.lte(millis(&to)))
            .order_by_desc(Column::TransactionAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(record_from_model)
            .collect()
    }

    async fn insert_record(&self, record: &FiRecord) -> Result<(), AaError> {
        let model = entities::fi_record::ActiveModel {
            id: Default::default(),
            account_id: Set(record.account_id.clone()),
            transaction_at: Set(millis(&record.transaction_at)),
            amount: Set(record.amount),
            txn_type: Set(record.txn_type.to_string()),
            payload: Set(serde_json::to_string(&record.payload)?),
        };
        model.insert(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl ConsentRepository for SqlStore {
    async fn insert_consent(&self, consent: &Consent) -> Result<(), AaError> {
        let detail = &consent.detail;
        let model = entities::consent::ActiveModel {
            consent_id: Set(consent.consent_id.clone()),
            customer_id: Set(consent.customer_id.clone()),
            status: Set(consent.status.to_string()),
            redirect_url: Set(consent.redirect_url.clone()),
            fetch_type: Set(consent.fetch_type.to_string()),
            consent_mode: Set(consent.consent_mode.to_string()),
            purpose_code: Set(detail.purpose_code.clone()),
            purpose_text: Set(detail.purpose_text.clone()),
            range_from: Set(millis(&detail.fi_data_range.from)),
            range_to: Set(millis(&detail.fi_data_range.to)),
            data_life_unit: Set(detail.data_life.unit.to_string()),
            data_life_value: Set(detail.data_life.value),
            frequency_unit: Set(detail.frequency.unit.to_string()),
            frequency_value: Set(detail.frequency.value),
            fi_types: Set(serde_json::to_string(&detail.fi_types)?),
            usage_count: Set(consent.usage.count),
            last_used_at: Set(consent.usage.last_used.as_ref().map(millis)),
            expires_at: Set(millis(&consent.expires_at)),
            context: Set(serde_json::to_string(&consent.context)?),
            created_at: Set(millis(&consent.created_at)),
        };

        let txn = self.db.begin().await?;
        model.insert(&txn).await?;
        if !consent.accounts.is_empty() {
            entities::ConsentAccount::insert_many(link_models(
                &consent.consent_id,
                &consent.accounts,
            ))
            .exec_without_returning(&txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn find_consent(&self, consent_id: &str) -> Result<Option<Consent>, AaError> {
        let Some(model) = entities::Consent::find_by_id(consent_id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let accounts = self.linked_accounts(consent_id).await?;
        consent_from_model(model, accounts).map(Some)
    }

    async fn activate_consent(
        &self,
        consent_id: &str,
        account_ids: &[String],
    ) -> Result<bool, AaError> {
        use entities::consent::{Column, Entity};

        let txn = self.db.begin().await?;
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(ConsentStatus::Active.to_string()))
            .filter(Column::ConsentId.eq(consent_id))
            .filter(Column::Status.eq(ConsentStatus::Pending.to_string()))
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(false);
        }

        if !account_ids.is_empty() {
            entities::ConsentAccount::insert_many(link_models(consent_id, account_ids))
                .exec_without_returning(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(true)
    }

    async fn transition_consent(
        &self,
        consent_id: &str,
        from: ConsentStatus,
        to: ConsentStatus,
    ) -> Result<bool, AaError> {
        use entities::consent::{Column, Entity};

        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(to.to_string()))
            .filter(Column::ConsentId.eq(consent_id))
            .filter(Column::Status.eq(from.to_string()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn record_usage(&self, consent_id: &str, at: DateTime<Utc>) -> Result<bool, AaError> {
        use entities::consent::{Column, Entity};

        let result = Entity::update_many()
            .col_expr(Column::UsageCount, Expr::col(Column::UsageCount).add(1))
            .col_expr(Column::LastUsedAt, Expr::value(millis(&at)))
            .filter(Column::ConsentId.eq(consent_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected == 1)
    }
}

fn link_models(consent_id: &str, account_ids: &[String]) -> Vec<entities::consent_account::ActiveModel> {
    account_ids
        .iter()
        .enumerate()
        .map(|(position, account_id)| entities::consent_account::ActiveModel {
            consent_id: Set(consent_id.to_string()),
            account_id: Set(account_id.clone()),
            position: Set(position as i32),
        })
        .collect()
}

#[async_trait]
impl SessionRepository for SqlStore {
    async fn insert_session(&self, session: &Session) -> Result<(), AaError> {
        let model = entities::session::ActiveModel {
            session_id: Set(session.session_id.clone()),
            consent_id: Set(session.consent_id.clone()),
            status: Set(session.status.to_string()),
            format: Set(session.format.to_string()),
            range_from: Set(millis(&session.data_range.from)),
            range_to: Set(millis(&session.data_range.to)),
            payload: Set(session
                .payload
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?),
            created_at: Set(millis(&session.created_at)),
            completed_at: Set(session.completed_at.as_ref().map(millis)),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AaError> {
        entities::Session::find_by_id(session_id.to_string())
            .one(&self.db)
            .await?
            .map(session_from_model)
            .transpose()
    }

    async fn complete_session(
        &self,
        session_id: &str,
        consent_id: &str,
        payload: &Value,
        at: DateTime<Utc>,
    ) -> Result<bool, AaError> {
        use entities::{consent, session};

        let txn = self.db.begin().await?;
        let flipped = session::Entity::update_many()
            .col_expr(
                session::Column::Status,
                Expr::value(SessionStatus::Completed.to_string()),
            )
            .col_expr(
                session::Column::Payload,
                Expr::value(serde_json::to_string(payload)?),
            )
            .col_expr(session::Column::CompletedAt, Expr::value(millis(&at)))
            .filter(session::Column::SessionId.eq(session_id))
            .filter(session::Column::Status.eq(SessionStatus::Pending.to_string()))
            .exec(&txn)
            .await?;

        if flipped.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(false);
        }

        let counted = consent::Entity::update_many()
            .col_expr(
                consent::Column::UsageCount,
                Expr::col(consent::Column::UsageCount).add(1),
            )
            .col_expr(consent::Column::LastUsedAt, Expr::value(millis(&at)))
            .filter(consent::Column::ConsentId.eq(consent_id))
            .exec(&txn)
            .await?;

        if counted.rows_affected != 1 {
            txn.rollback().await?;
            return Err(AaError::ConsentNotFound(consent_id.to_string()));
        }
        txn.commit().await?;
        Ok(true)
    }
}
