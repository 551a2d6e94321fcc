/*!
 * Transaction Helper Utilities
 *
 * All-or-nothing units of work over the shared store.
 */

use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};
use uuid::Uuid;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction
///
/// The closure's error is returned unchanged; any error rolls the whole unit back.
///
/// # Example
///
/// ```rust,ignore
/// use crate::db::transaction::with_transaction;
///
/// let po = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         let po = new_po.insert(txn).await?;
///         for consignee in consignees {
///             consignee.insert(txn).await?;
///         }
///         Ok(po)
///     })
/// }).await?;
/// ```
pub async fn with_transaction<F, T, E>(db: &DatabaseConnection, f: F) -> Result<T, E>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, E>> + Send,
    T: Send,
    E: From<DbErr> + std::error::Error + Send,
{
    let transaction_id = Uuid::new_v4();
    let start = std::time::Instant::now();
    debug!(transaction_id = %transaction_id, "Starting database transaction");

    let result = db.transaction::<_, T, E>(f).await;

    let elapsed = start.elapsed();
    histogram!("tender_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("tender_db.transaction.committed", 1);
            debug!(transaction_id = %transaction_id, "Transaction committed in {:?}", elapsed);
        }
        Err(_) => {
            counter!("tender_db.transaction.rolled_back", 1);
            warn!(transaction_id = %transaction_id, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result.map_err(|e| match e {
        TransactionError::Connection(db_err) => E::from(db_err),
        TransactionError::Transaction(err) => err,
    })
}
