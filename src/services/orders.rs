use crate::{
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_line::{self, Entity as OrderLineEntity},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Input for a new order row. Enrichment fields are best-effort and may
/// all be absent without blocking creation.
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub payment_reference: String,
    pub customer_email: String,
    pub user_id: Option<String>,
    pub total_amount: Decimal,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_document: Option<String>,
    pub ship_street: Option<String>,
    pub ship_number: Option<String>,
    pub ship_complement: Option<String>,
    pub ship_neighborhood: Option<String>,
    pub ship_city: Option<String>,
    pub ship_state: Option<String>,
    pub ship_postal_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub image_url: Option<String>,
}

/// The persistence boundary for orders and their lines.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates an order and its lines in one transaction. Orders produced
    /// by this core are always `paid` — `pending` belongs to flows that do
    /// not pass through here.
    ///
    /// A uniqueness violation on the payment reference means another
    /// delivery of the same confirmation won the insert race; callers must
    /// treat the resulting [`ServiceError::AlreadyExists`] the same as
    /// finding the order in the idempotency pre-check. A line-insertion
    /// failure aborts the transaction, so no orphan order row survives.
    #[instrument(skip(self, new_order, lines), fields(payment_reference = %new_order.payment_reference))]
    pub async fn create_with_lines(
        &self,
        new_order: NewOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<(order::Model, Vec<order_line::Model>), ServiceError> {
        let txn = self.db.begin().await?;
        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let order_model = order::ActiveModel {
            id: Set(order_id),
            payment_reference: Set(new_order.payment_reference.clone()),
            customer_email: Set(new_order.customer_email),
            user_id: Set(new_order.user_id),
            status: Set(OrderStatus::Paid),
            total_amount: Set(new_order.total_amount),
            customer_name: Set(new_order.customer_name),
            customer_phone: Set(new_order.customer_phone),
            customer_document: Set(new_order.customer_document),
            ship_street: Set(new_order.ship_street),
            ship_number: Set(new_order.ship_number),
            ship_complement: Set(new_order.ship_complement),
            ship_neighborhood: Set(new_order.ship_neighborhood),
            ship_city: Set(new_order.ship_city),
            ship_state: Set(new_order.ship_state),
            ship_postal_code: Set(new_order.ship_postal_code),
            created_at: Set(now),
        };

        let order = order_model.insert(&txn).await.map_err(|e| {
            if ServiceError::is_unique_violation(&e) {
                info!(
                    payment_reference = %new_order.payment_reference,
                    "concurrent delivery already created this order"
                );
                ServiceError::AlreadyExists(new_order.payment_reference.clone())
            } else {
                error!(error = %e, "failed to insert order");
                ServiceError::DatabaseError(e)
            }
        })?;

        let mut inserted_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let line_model = order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                name: Set(line.name),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                image_url: Set(line.image_url),
                created_at: Set(now),
            };
            let inserted = line_model.insert(&txn).await.map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to insert order line");
                ServiceError::DatabaseError(e)
            })?;
            inserted_lines.push(inserted);
        }

        txn.commit().await?;

        info!(
            order_id = %order_id,
            payment_reference = %order.payment_reference,
            line_count = inserted_lines.len(),
            "order created"
        );
        Ok((order, inserted_lines))
    }

    /// Idempotency pre-check and PIX-polling lookup.
    #[instrument(skip(self))]
    pub async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::PaymentReference.eq(payment_reference))
            .one(&*self.db)
            .await?;
        Ok(order)
    }

    /// Whether an order has materialized for this payment reference.
    pub async fn exists(&self, payment_reference: &str) -> Result<bool, ServiceError> {
        Ok(self
            .find_by_payment_reference(payment_reference)
            .await?
            .is_some())
    }

    /// Order readback with its lines.
    #[instrument(skip(self))]
    pub async fn get_with_lines(
        &self,
        order_id: Uuid,
    ) -> Result<Option<(order::Model, Vec<order_line::Model>)>, ServiceError> {
        let Some(order) = OrderEntity::find_by_id(order_id).one(&*self.db).await? else {
            return Ok(None);
        };

        let lines = OrderLineEntity::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .order_by_asc(order_line::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(Some((order, lines)))
    }
}
