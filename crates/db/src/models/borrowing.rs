//! Borrowing request rows and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::borrowing::BorrowLine;
use stockroom_core::types::{DbId, Quantity, Timestamp};

/// A row from the `borrowing_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BorrowingRequestRow {
    pub id: DbId,
    pub requester_name: String,
    pub requester_contact: Option<String>,
    pub purpose: Option<String>,
    pub status_id: i16,
    pub requested_at: Timestamp,
    pub collect_at: Option<Timestamp>,
    pub expected_return_at: Option<Timestamp>,
    pub returned_at: Option<Timestamp>,
    pub decided_at: Option<Timestamp>,
    pub decided_by: Option<DbId>,
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `borrowing_request_lines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BorrowingLineRow {
    pub id: DbId,
    pub request_id: DbId,
    pub asset_id: DbId,
    pub quantity: Quantity,
    pub lost_quantity: Quantity,
    pub hold_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A request together with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct BorrowingRequestDetail {
    #[serde(flatten)]
    pub request: BorrowingRequestRow,
    pub lines: Vec<BorrowingLineRow>,
}

/// DTO for `POST /api/v1/borrowing-requests`.
#[derive(Debug, Deserialize)]
pub struct SubmitBorrowingRequest {
    pub requester_name: String,
    pub requester_contact: Option<String>,
    pub purpose: Option<String>,
    pub collect_at: Option<Timestamp>,
    pub expected_return_at: Option<Timestamp>,
    pub lines: Vec<BorrowLine>,
}

/// DTO for `POST /api/v1/borrowing-requests/{id}/reject`.
#[derive(Debug, Default, Deserialize)]
pub struct RejectBorrowingRequest {
    pub reason: Option<String>,
}

/// Units of one line that did not come back.
#[derive(Debug, Clone, Deserialize)]
pub struct LostLine {
    pub line_id: DbId,
    pub lost_quantity: Quantity,
}

/// DTO for `POST /api/v1/borrowing-requests/{id}/return`.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnBorrowingRequest {
    #[serde(default)]
    pub lost: Vec<LostLine>,
}

/// DTO for `PUT /api/v1/borrowing-requests/{id}/lines/{line_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateLineQuantity {
    pub quantity: Quantity,
}
