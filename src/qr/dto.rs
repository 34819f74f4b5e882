use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Response body for `GET /qr/current`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub uuid: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}
