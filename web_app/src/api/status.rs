//! Delivery status lookups. The platform is the only source of truth here;
//! nothing is written back by these functions.

use super::{
    Platform,
    errors::{LookupError, UpstreamError},
};
use crate::{
    models::broadcast::{DeliveryPhase, DeliveryStatus},
    services::wechat::schemas::MassStatus,
};

/// Maps a raw platform report to a [`DeliveryPhase`].
fn delivery_phase(report: &MassStatus) -> Result<DeliveryPhase, UpstreamError> {
    let phase = match report.msg_status.as_str() {
        "SENDING" => DeliveryPhase::Sending,
        "SEND_SUCCESS" if report.error_count > 0 => DeliveryPhase::PartialFailure,
        "SEND_SUCCESS" => DeliveryPhase::Sent,
        "SEND_FAIL" if report.sent_count > 0 => DeliveryPhase::PartialFailure,
        "SEND_FAIL" => DeliveryPhase::Failed,
        // the broadcast was deleted before it finished
        "DELETE" => DeliveryPhase::Failed,
        other => {
            return Err(UpstreamError::Other {
                code: None,
                reason: format!("unrecognized delivery phase {other:?}"),
            });
        }
    };

    Ok(phase)
}

pub async fn get_status(
    platform: &Platform,
    broadcast_id: i64,
) -> Result<DeliveryStatus, LookupError> {
    let api = &platform.api;
    let report = platform
        .with_token::<_, LookupError, _, _>(|token| async move {
            api.get_mass_status(&token.value, broadcast_id).await
        })
        .await?;

    Ok(DeliveryStatus {
        broadcast_id,
        phase: delivery_phase(&report)?,
        total_recipients: report.total_count,
        succeeded: report.sent_count,
        failed: report.error_count,
    })
}
