// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone connectivity reconciliation.
//!
//! The dispatch engine trusts the locally stored phone status; this pass
//! keeps that status honest by asking the WAHA gateway for the live session
//! state of every registered phone.

use pingrelay_core::{PhoneStatus, PingRelayError};
use pingrelay_storage::Database;
use pingrelay_storage::queries::phones;
use pingrelay_waha::WahaClient;
use serde::Serialize;
use tracing::{info, warn};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Phones examined.
    pub checked: u64,
    /// Phones whose stored status changed.
    pub updated: u64,
    /// Phones whose session could not be queried.
    pub errors: u64,
}

/// Reconciles every phone's stored status with its live WAHA session.
///
/// A phone whose session cannot be reached is treated as disconnected; no
/// per-phone failure aborts the pass.
pub async fn reconcile_phone_status(
    db: &Database,
    waha: &WahaClient,
) -> Result<ReconcileSummary, PingRelayError> {
    let mut summary = ReconcileSummary::default();

    for phone in phones::list_phones(db).await? {
        summary.checked += 1;
        let expected = match waha.get_session(&phone.number).await {
            Ok(session) => {
                if session.is_connected() {
                    PhoneStatus::Connected
                } else {
                    PhoneStatus::Disconnected
                }
            }
            Err(e) => {
                warn!(number = %phone.number, error = %e, "session lookup failed");
                summary.errors += 1;
                PhoneStatus::Disconnected
            }
        };

        if expected != phone.status {
            phones::update_phone_status(db, &phone.id, expected).await?;
            summary.updated += 1;
            info!(number = %phone.number, status = %expected, "phone status updated");
        }
    }

    info!(
        checked = summary.checked,
        updated = summary.updated,
        errors = summary.errors,
        "reconciliation finished"
    );
    Ok(summary)
}
