use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use validator::ValidationError;

/// Command trait for implementing the Command Pattern
///
/// A command validates itself, performs one lifecycle mutation inside its own
/// unit of work and publishes the matching domain event once committed.
/// Status rollup is not part of a command; the owning service triggers it
/// after the command returns.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool for persistence operations
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod consignees;
pub mod loas;
pub mod purchaseorders;
pub mod tenders;

/// Rejects dates after today (UTC).
pub(crate) fn not_in_future(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        let mut err = ValidationError::new("future_date");
        err.message = Some("cannot be in the future".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Parses a status or category name, listing the accepted values on failure.
pub(crate) fn parse_enum<T>(field: &str, raw: &str) -> Result<T, ServiceError>
where
    T: std::str::FromStr + strum::VariantNames,
{
    raw.trim().parse::<T>().map_err(|_| {
        ServiceError::ValidationError(format!(
            "{}: '{}' is not one of {}",
            field,
            raw,
            T::VARIANTS.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PurchaseOrderStatus;
    use assert_matches::assert_matches;
    use chrono::Duration;

    #[test]
    fn future_dates_are_rejected() {
        let today = Utc::now().date_naive();
        assert!(not_in_future(&today).is_ok());
        assert!(not_in_future(&(today + Duration::days(1))).is_err());
    }

    #[test]
    fn unknown_enum_values_list_the_allowed_ones() {
        assert_eq!(
            parse_enum::<PurchaseOrderStatus>("status", "completed").unwrap(),
            PurchaseOrderStatus::Completed
        );
        let err = parse_enum::<PurchaseOrderStatus>("status", "Shipped").unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("Draft, Active, Completed, Cancelled"));
    }
}
