use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle status. Orders materialized by this core are always
/// created in `Paid`; the remaining states belong to fulfillment flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// The payment processor's transaction id. Unique — this is the
    /// idempotency key for order creation.
    #[sea_orm(unique)]
    pub payment_reference: String,

    pub customer_email: String,
    pub user_id: Option<String>,
    pub status: OrderStatus,
    pub total_amount: Decimal,

    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// Tax document (CPF)
    pub customer_document: Option<String>,

    pub ship_street: Option<String>,
    pub ship_number: Option<String>,
    pub ship_complement: Option<String>,
    pub ship_neighborhood: Option<String>,
    pub ship_city: Option<String>,
    pub ship_state: Option<String>,
    pub ship_postal_code: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLine,
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLine.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
