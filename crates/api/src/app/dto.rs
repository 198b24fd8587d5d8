//! Request bodies and query strings that differ from the service inputs,
//! plus path id parsing.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::DomainError;
use stockroom_parties::PartyId;
use stockroom_purchasing::{
    PurchaseOrderId, PurchaseOrderStatus, ReceiveGoodsRequest, ReceiveLineRequest,
};
use stockroom_sales::{
    CreateSalesOrderRequest, PaymentMethod, SalesChannel, SalesLineRequest,
};

use crate::app::errors;

/// Parse a path segment into a typed id; failures become `400 invalid_id`.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// `POST /sales/orders` and `POST /sales/pos/checkout`; the route decides
/// the channel.
#[derive(Debug, Deserialize)]
pub struct SalesOrderBody {
    pub location_id: LocationId,
    #[serde(default)]
    pub customer_id: Option<PartyId>,
    pub lines: Vec<SalesLineRequest>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SalesOrderBody {
    pub fn into_request(self, channel: SalesChannel) -> CreateSalesOrderRequest {
        CreateSalesOrderRequest {
            channel,
            location_id: self.location_id,
            customer_id: self.customer_id,
            lines: self.lines,
            shipping_cost: self.shipping_cost,
            discount: self.discount,
            payment_method: self.payment_method,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

/// `POST /purchasing/orders/:id/receipts`; the order comes from the path.
#[derive(Debug, Deserialize)]
pub struct ReceiveGoodsBody {
    pub location_id: LocationId,
    pub lines: Vec<ReceiveLineRequest>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReceiveGoodsBody {
    pub fn into_request(self, purchase_order_id: PurchaseOrderId) -> ReceiveGoodsRequest {
        ReceiveGoodsRequest {
            purchase_order_id,
            location_id: self.location_id,
            lines: self.lines,
            received_by_id: None,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderQuery {
    #[serde(default)]
    pub status: Option<PurchaseOrderStatus>,
}

/// Half-open report period `[from, to)`.
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AvailablePath {
    pub item_id: String,
    pub location_id: String,
}

impl AvailablePath {
    pub fn parse(&self) -> Result<(ItemId, LocationId), axum::response::Response> {
        Ok((parse_id(&self.item_id)?, parse_id(&self.location_id)?))
    }
}
