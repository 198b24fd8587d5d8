use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_catalog::{ItemId, LocationId};
use stockroom_core::{
    AggregateRoot, DomainError, DomainResult, TenantId, UserId, round_money, typed_id,
};
use stockroom_inventory::{DocumentRef, DocumentType, LedgerDelta, LedgerPosting};
use stockroom_parties::PartyId;

use crate::payment::{PaymentMethod, PaymentStatus};
use crate::totals::{LineAmounts, compute_line, compute_order};

typed_id!(
    /// Sales order identifier (tenant-scoped via `tenant_id`).
    SalesOrderId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesChannel {
    Pos,
    Standard,
}

impl SalesChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesChannel::Pos => "POS",
            SalesChannel::Standard => "STANDARD",
        }
    }
}

impl core::str::FromStr for SalesChannel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POS" => Ok(SalesChannel::Pos),
            "STANDARD" => Ok(SalesChannel::Standard),
            other => Err(DomainError::validation(format!("unknown sales channel: {other}"))),
        }
    }
}

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Returned,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Draft => "DRAFT",
            SalesOrderStatus::Confirmed => "CONFIRMED",
            SalesOrderStatus::Processing => "PROCESSING",
            SalesOrderStatus::Shipped => "SHIPPED",
            SalesOrderStatus::Delivered => "DELIVERED",
            SalesOrderStatus::Completed => "COMPLETED",
            SalesOrderStatus::Cancelled => "CANCELLED",
            SalesOrderStatus::Returned => "RETURNED",
        }
    }

    /// Orders whose stock is reserved but not yet shipped.
    pub fn holds_reservation(&self) -> bool {
        matches!(self, SalesOrderStatus::Confirmed | SalesOrderStatus::Processing)
    }

    /// Orders counted as revenue.
    pub fn is_sale(&self) -> bool {
        matches!(
            self,
            SalesOrderStatus::Shipped | SalesOrderStatus::Delivered | SalesOrderStatus::Completed
        )
    }
}

impl core::str::FromStr for SalesOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DRAFT" => SalesOrderStatus::Draft,
            "CONFIRMED" => SalesOrderStatus::Confirmed,
            "PROCESSING" => SalesOrderStatus::Processing,
            "SHIPPED" => SalesOrderStatus::Shipped,
            "DELIVERED" => SalesOrderStatus::Delivered,
            "COMPLETED" => SalesOrderStatus::Completed,
            "CANCELLED" => SalesOrderStatus::Cancelled,
            "RETURNED" => SalesOrderStatus::Returned,
            other => {
                return Err(DomainError::validation(format!(
                    "unknown sales order status: {other}"
                )));
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesLineRequest {
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub discount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrderRequest {
    pub channel: SalesChannel,
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub line_no: u32,
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub discount: Decimal,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl SalesOrderLine {
    fn from_request(line_no: u32, req: &SalesLineRequest) -> DomainResult<Self> {
        let unit_price = round_money(req.unit_price);
        let discount = round_money(req.discount);
        let amounts = compute_line(req.quantity, unit_price, req.tax_rate, discount)?;
        Ok(Self {
            line_no,
            item_id: req.item_id,
            quantity: req.quantity,
            unit_price,
            tax_rate: req.tax_rate,
            discount,
            subtotal: amounts.subtotal,
            tax_amount: amounts.tax_amount,
            total: amounts.total,
        })
    }

    pub fn amounts(&self) -> LineAmounts {
        LineAmounts {
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }
}

/// Aggregate root: SalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: SalesOrderId,
    pub tenant_id: TenantId,
    pub order_number: String,
    pub channel: SalesChannel,
    pub customer_id: Option<PartyId>,
    pub location_id: LocationId,
    pub status: SalesOrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub amount_paid: Decimal,
    pub lines: Vec<SalesOrderLine>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl SalesOrder {
    fn build(
        tenant_id: TenantId,
        id: SalesOrderId,
        order_number: String,
        request: CreateSalesOrderRequest,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if request.lines.is_empty() {
            return Err(DomainError::validation("sales order must have at least one line"));
        }

        let lines = request
            .lines
            .iter()
            .zip(1u32..)
            .map(|(req, line_no)| SalesOrderLine::from_request(line_no, req))
            .collect::<DomainResult<Vec<_>>>()?;

        let mut order = Self {
            id,
            tenant_id,
            order_number,
            channel: request.channel,
            customer_id: request.customer_id,
            location_id: request.location_id,
            status: SalesOrderStatus::Draft,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            amount_paid: Decimal::ZERO,
            lines,
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            shipping_cost: round_money(request.shipping_cost),
            discount: round_money(request.discount),
            total: Decimal::ZERO,
            notes: request.notes,
            created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        order.recompute_totals()?;
        Ok(order)
    }

    /// Create a STANDARD order as a DRAFT. Drafts do not touch stock.
    pub fn create(
        tenant_id: TenantId,
        id: SalesOrderId,
        order_number: String,
        request: CreateSalesOrderRequest,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if request.channel != SalesChannel::Standard {
            return Err(DomainError::validation("POS sales are created through checkout"));
        }
        if request.customer_id.is_none() {
            return Err(DomainError::validation("standard orders require a customer"));
        }
        Self::build(tenant_id, id, order_number, request, created_by, now)
    }

    /// Point-of-sale checkout: a COMPLETED, fully paid order plus the
    /// posting that takes the sold quantities off hand.
    pub fn checkout(
        tenant_id: TenantId,
        id: SalesOrderId,
        order_number: String,
        request: CreateSalesOrderRequest,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<(Self, LedgerPosting)> {
        if request.channel != SalesChannel::Pos {
            return Err(DomainError::validation("checkout is only available for POS sales"));
        }
        if request.payment_method.is_none() {
            return Err(DomainError::validation("POS sales require a payment method"));
        }

        let mut order = Self::build(tenant_id, id, order_number, request, created_by, now)?;
        order.status = SalesOrderStatus::Completed;
        order.amount_paid = order.total;
        order.payment_status = PaymentStatus::Paid;

        let deltas = order.line_deltas(LedgerDelta::sale)?;
        let posting = order.posting(deltas, created_by, now);
        Ok((order, posting))
    }

    /// Rebuild every computed field from line data.
    pub fn recompute_totals(&mut self) -> DomainResult<()> {
        for line in &mut self.lines {
            let amounts = compute_line(line.quantity, line.unit_price, line.tax_rate, line.discount)?;
            line.subtotal = amounts.subtotal;
            line.tax_amount = amounts.tax_amount;
            line.total = amounts.total;
        }
        let amounts: Vec<LineAmounts> = self.lines.iter().map(SalesOrderLine::amounts).collect();
        let totals = compute_order(&amounts, self.shipping_cost, self.discount)?;
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total = totals.total;
        Ok(())
    }

    /// Ledger posting for stock effects of this order.
    pub fn posting(
        &self,
        deltas: Vec<LedgerDelta>,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> LedgerPosting {
        LedgerPosting::new(
            DocumentRef::new(DocumentType::SalesOrder, self.id.aggregate_id()),
            actor,
            now,
        )
        .with_deltas(deltas)
    }

    fn line_deltas(
        &self,
        delta: fn(ItemId, LocationId, i64) -> DomainResult<LedgerDelta>,
    ) -> DomainResult<Vec<LedgerDelta>> {
        self.lines
            .iter()
            .map(|l| delta(l.item_id, self.location_id, l.quantity))
            .collect()
    }

    fn transition(
        &mut self,
        allowed: &[SalesOrderStatus],
        next: SalesOrderStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !allowed.contains(&self.status) {
            return Err(DomainError::invariant(format!(
                "cannot move sales order from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// DRAFT → CONFIRMED; returns the reservation deltas.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> DomainResult<Vec<LedgerDelta>> {
        self.transition(&[SalesOrderStatus::Draft], SalesOrderStatus::Confirmed, now)?;
        self.line_deltas(LedgerDelta::reserve)
    }

    pub fn start_processing(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(&[SalesOrderStatus::Confirmed], SalesOrderStatus::Processing, now)
    }

    /// Ship a confirmed or processing order; returns the fulfilment deltas.
    pub fn ship(&mut self, now: DateTime<Utc>) -> DomainResult<Vec<LedgerDelta>> {
        self.transition(
            &[SalesOrderStatus::Confirmed, SalesOrderStatus::Processing],
            SalesOrderStatus::Shipped,
            now,
        )?;
        self.line_deltas(LedgerDelta::fulfil)
    }

    pub fn deliver(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(&[SalesOrderStatus::Shipped], SalesOrderStatus::Delivered, now)
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.transition(&[SalesOrderStatus::Delivered], SalesOrderStatus::Completed, now)
    }

    /// Cancel a not-yet-shipped order; returns release deltas when stock was
    /// reserved.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<Vec<LedgerDelta>> {
        let held = self.status.holds_reservation();
        self.transition(
            &[
                SalesOrderStatus::Draft,
                SalesOrderStatus::Confirmed,
                SalesOrderStatus::Processing,
            ],
            SalesOrderStatus::Cancelled,
            now,
        )?;
        if held {
            self.line_deltas(LedgerDelta::release)
        } else {
            Ok(Vec::new())
        }
    }

    /// Return a delivered or completed order; returns the restock deltas.
    /// Any payment taken is marked refunded.
    pub fn mark_returned(&mut self, now: DateTime<Utc>) -> DomainResult<Vec<LedgerDelta>> {
        self.transition(
            &[SalesOrderStatus::Delivered, SalesOrderStatus::Completed],
            SalesOrderStatus::Returned,
            now,
        )?;
        if self.amount_paid > Decimal::ZERO {
            self.payment_status = PaymentStatus::Refunded;
        }
        self.line_deltas(LedgerDelta::restock)
    }

    pub fn record_payment(
        &mut self,
        amount: Decimal,
        method: Option<PaymentMethod>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if matches!(
            self.status,
            SalesOrderStatus::Cancelled | SalesOrderStatus::Returned
        ) {
            return Err(DomainError::invariant(format!(
                "cannot take payment for a {} order",
                self.status.as_str()
            )));
        }
        let amount = round_money(amount);
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        let paid = self.amount_paid + amount;
        if paid > self.total {
            return Err(DomainError::validation(format!(
                "payment of {amount} exceeds outstanding balance {}",
                self.balance_due()
            )));
        }

        self.amount_paid = paid;
        self.payment_status = PaymentStatus::for_amounts(paid, self.total);
        if method.is_some() {
            self.payment_method = method;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn balance_due(&self) -> Decimal {
        self.total - self.amount_paid
    }

    pub fn units(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}
