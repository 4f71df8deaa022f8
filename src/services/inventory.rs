use crate::{
    entities::inventory_reservation::{self, Entity as ReservationEntity, ReservationStatus},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{info, instrument};

/// Confirms stock reservations once their payment lands. Strictly
/// best-effort relative to the order: callers log failures and move on.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Flips every pending reservation under this payment reference to
    /// confirmed. Returns how many were confirmed; zero matching rows is
    /// a normal outcome (e.g. card checkouts that never reserved).
    #[instrument(skip(self))]
    pub async fn confirm_reservations(
        &self,
        payment_reference: &str,
    ) -> Result<usize, ServiceError> {
        let pending = ReservationEntity::find()
            .filter(inventory_reservation::Column::PaymentReference.eq(payment_reference))
            .filter(
                inventory_reservation::Column::Status.eq(ReservationStatus::Pending.as_str()),
            )
            .all(&*self.db)
            .await?;

        let count = pending.len();
        for reservation in pending {
            let mut model: inventory_reservation::ActiveModel = reservation.into();
            model.status = Set(ReservationStatus::Confirmed.as_str().to_string());
            model.updated_at = Set(Some(Utc::now()));
            model.update(&*self.db).await?;
        }

        if count > 0 {
            info!(payment_reference, count, "stock reservations confirmed");
        }
        Ok(count)
    }
}
