use haul_core::{OrderLinkStatus, OrderStatus, PaymentStatus, PurchaseStatus, TrackingCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A customer's brokerage request: one or more links to buy abroad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: String,
    pub links: Vec<OrderLink>,
    /// Minor currency units
    pub total_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(customer_id: String, currency: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            links: Vec::new(),
            total_minor: 0,
            currency,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_link(&mut self, link: OrderLink) {
        self.total_minor += link.line_total_minor();
        self.links.push(link);
        self.updated_at = Utc::now();
    }

    /// Total over links that have not been cancelled
    pub fn calculate_active_total(&self) -> i64 {
        self.links
            .iter()
            .filter(|link| link.is_active())
            .map(|link| link.line_total_minor())
            .sum()
    }
}

/// A single product URL within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLink {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_url: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_minor: i64,
    pub status: OrderLinkStatus,
    /// Set once the supplier ships and the parcel can be matched at intake
    pub tracking_code: Option<TrackingCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderLink {
    pub fn new(
        order_id: Uuid,
        product_url: String,
        product_name: String,
        quantity: u32,
        unit_price_minor: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_url,
            product_name,
            quantity,
            unit_price_minor,
            status: OrderLinkStatus::Requested,
            tracking_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn line_total_minor(&self) -> i64 {
        self.unit_price_minor * i64::from(self.quantity)
    }

    pub fn is_active(&self) -> bool {
        self.status != OrderLinkStatus::Cancelled
    }
}

/// A purchase placed with a supplier, covering one or more links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub supplier: String,
    pub order_link_ids: Vec<Uuid>,
    pub amount_minor: i64,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    pub fn new(supplier: String, order_link_ids: Vec<Uuid>, amount_minor: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            supplier,
            order_link_ids,
            amount_minor,
            status: PurchaseStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Customer payment against an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(order_id: Uuid, amount_minor: i64, currency: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount_minor,
            currency,
            status: PaymentStatus::Pending,
            provider_reference: None,
            created_at: now,
            updated_at: now,
        }
    }
}
