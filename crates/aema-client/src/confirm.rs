//! Confirmation polling

use aema_core::{AemaError, AemaResult, PendingTransactionInfo, TxId};

use crate::LedgerClient;

/// Wait until `tx_id` is confirmed, rejected, or `rounds` rounds have passed.
pub async fn wait_for_confirmation<C>(
    client: &C,
    tx_id: &TxId,
    rounds: u64,
) -> AemaResult<PendingTransactionInfo>
where
    C: LedgerClient + ?Sized,
{
    let status = client.status().await?;
    let start = status.last_round.next();
    let mut current = start;

    while current.0 < start.0.saturating_add(rounds) {
        let info = client.pending_transaction_info(tx_id).await?;
        if info.is_confirmed() {
            tracing::debug!(%tx_id, round = %info.confirmed_round, "transaction confirmed");
            return Ok(info);
        }
        if !info.pool_error.is_empty() {
            return Err(AemaError::TransactionRejected(info.pool_error));
        }

        tracing::trace!(%tx_id, round = %current, "waiting for confirmation");
        client.status_after_block(current).await?;
        current = current.next();
    }

    Err(AemaError::ConfirmationTimeout { start, rounds })
}
