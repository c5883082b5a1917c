//! Status vocabularies for every record that moves through the order lifecycle.
//!
//! Each domain gets a closed enum whose `next_states` is an exhaustive `match`,
//! so adding a variant does not compile until its outgoing edges are declared.
//! `StatusRegistry` is the string-keyed front door for callers that only hold
//! wire codes (the HTTP layer, rows read back from storage).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The record families that carry a lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusDomain {
    Order,
    OrderLink,
    Purchase,
    Payment,
    WarehouseItem,
    Packing,
}

impl StatusDomain {
    pub const ALL: [StatusDomain; 6] = [
        StatusDomain::Order,
        StatusDomain::OrderLink,
        StatusDomain::Purchase,
        StatusDomain::Payment,
        StatusDomain::WarehouseItem,
        StatusDomain::Packing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusDomain::Order => "order",
            StatusDomain::OrderLink => "order_link",
            StatusDomain::Purchase => "purchase",
            StatusDomain::Payment => "payment",
            StatusDomain::WarehouseItem => "warehouse_item",
            StatusDomain::Packing => "packing",
        }
    }
}

impl fmt::Display for StatusDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusDomain::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Unknown status domain: {}", s))
    }
}

/// Display hint for the UI badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Neutral,
    Info,
    Warning,
    Success,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusMeta {
    pub code: &'static str,
    pub label: &'static str,
    pub color: ColorTag,
    pub terminal: bool,
}

/// A code that is not part of the domain's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {domain} status: {code}")]
pub struct UnknownStatus {
    pub domain: StatusDomain,
    pub code: String,
}

/// Behaviour shared by every per-domain status enum.
pub trait LifecycleStatus:
    Copy + Eq + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const DOMAIN: StatusDomain;
    const ALL: &'static [Self];

    /// Stable wire code, e.g. `IN_WAREHOUSE`.
    fn code(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn color(&self) -> ColorTag;
    fn allowed_next(&self) -> &'static [Self];

    fn from_code(code: &str) -> Result<Self, UnknownStatus> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.code() == code)
            .ok_or_else(|| UnknownStatus {
                domain: Self::DOMAIN,
                code: code.to_string(),
            })
    }

    fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    fn meta(&self) -> StatusMeta {
        StatusMeta {
            code: self.code(),
            label: self.label(),
            color: self.color(),
            terminal: self.is_terminal(),
        }
    }
}

macro_rules! status_vocabulary {
    (
        $(#[$attr:meta])*
        $name:ident in $domain:ident {
            $($variant:ident => ($code:literal, $label:literal, $color:ident),)+
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant,)+
        }

        impl LifecycleStatus for $name {
            const DOMAIN: StatusDomain = StatusDomain::$domain;
            const ALL: &'static [Self] = &[$($name::$variant,)+];

            fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            fn color(&self) -> ColorTag {
                match self {
                    $($name::$variant => ColorTag::$color,)+
                }
            }

            fn allowed_next(&self) -> &'static [Self] {
                self.next_states()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

status_vocabulary! {
    /// Customer order as a whole
    OrderStatus in Order {
        Pending => ("PENDING", "Awaiting confirmation", Neutral),
        Confirmed => ("CONFIRMED", "Confirmed", Info),
        Purchasing => ("PURCHASING", "Purchasing", Info),
        InTransit => ("IN_TRANSIT", "In transit", Warning),
        Delivered => ("DELIVERED", "Delivered", Success),
        Completed => ("COMPLETED", "Completed", Success),
        Cancelled => ("CANCELLED", "Cancelled", Danger),
    }
}

impl OrderStatus {
    fn next_states(&self) -> &'static [Self] {
        use OrderStatus as S;
        match self {
            S::Pending => &[S::Confirmed, S::Cancelled],
            S::Confirmed => &[S::Purchasing, S::Cancelled],
            S::Purchasing => &[S::InTransit, S::Cancelled],
            S::InTransit => &[S::Delivered],
            S::Delivered => &[S::Completed],
            S::Completed => &[],
            S::Cancelled => &[],
        }
    }
}

status_vocabulary! {
    /// One purchasable line item of an order
    OrderLinkStatus in OrderLink {
        Requested => ("REQUESTED", "Requested", Neutral),
        Purchased => ("PURCHASED", "Purchased", Info),
        AwaitingPayment => ("AWAITING_PAYMENT", "Awaiting payment", Warning),
        FullyStocked => ("FULLY_STOCKED", "Fully stocked", Info),
        Cancelled => ("CANCELLED", "Cancelled", Danger),
        ImportedForeign => ("IMPORTED_FOREIGN", "Arrived at foreign warehouse", Info),
        AuctionWon => ("AUCTION_WON", "Auction won", Success),
        ImportedDomestic => ("IMPORTED_DOMESTIC", "Arrived at domestic warehouse", Info),
        Delivered => ("DELIVERED", "Delivered", Success),
    }
}

impl OrderLinkStatus {
    fn next_states(&self) -> &'static [Self] {
        use OrderLinkStatus as S;
        match self {
            S::Requested => &[S::Purchased, S::AuctionWon, S::Cancelled],
            S::Purchased => &[S::AwaitingPayment, S::Cancelled],
            S::AuctionWon => &[S::AwaitingPayment, S::Cancelled],
            S::AwaitingPayment => &[S::FullyStocked, S::Cancelled],
            S::FullyStocked => &[S::ImportedForeign, S::Cancelled],
            S::ImportedForeign => &[S::ImportedDomestic],
            S::ImportedDomestic => &[S::Delivered],
            S::Delivered => &[],
            S::Cancelled => &[],
        }
    }
}

status_vocabulary! {
    /// Purchase placed with a supplier on behalf of one or more order links
    PurchaseStatus in Purchase {
        Pending => ("PENDING", "Pending", Neutral),
        Ordered => ("ORDERED", "Ordered", Info),
        Paid => ("PAID", "Paid", Success),
        Shipped => ("SHIPPED", "Shipped by supplier", Info),
        Received => ("RECEIVED", "Received", Success),
        Cancelled => ("CANCELLED", "Cancelled", Danger),
    }
}

impl PurchaseStatus {
    fn next_states(&self) -> &'static [Self] {
        use PurchaseStatus as S;
        match self {
            S::Pending => &[S::Ordered, S::Cancelled],
            S::Ordered => &[S::Paid, S::Cancelled],
            S::Paid => &[S::Shipped],
            S::Shipped => &[S::Received],
            S::Received => &[],
            S::Cancelled => &[],
        }
    }
}

status_vocabulary! {
    PaymentStatus in Payment {
        Pending => ("PENDING", "Awaiting payment", Warning),
        Paid => ("PAID", "Paid", Success),
        Failed => ("FAILED", "Failed", Danger),
        Refunded => ("REFUNDED", "Refunded", Neutral),
        Cancelled => ("CANCELLED", "Cancelled", Danger),
    }
}

impl PaymentStatus {
    fn next_states(&self) -> &'static [Self] {
        use PaymentStatus as S;
        match self {
            S::Pending => &[S::Paid, S::Failed, S::Cancelled],
            S::Failed => &[S::Pending, S::Cancelled],
            S::Paid => &[S::Refunded],
            S::Refunded => &[],
            S::Cancelled => &[],
        }
    }
}

status_vocabulary! {
    /// A received shipment, keyed by tracking code
    WarehouseItemStatus in WarehouseItem {
        Pending => ("PENDING", "Not yet received", Neutral),
        InWarehouse => ("IN_WAREHOUSE", "In warehouse", Info),
        Packed => ("PACKED", "Packed", Warning),
        Dispatched => ("DISPATCHED", "Dispatched", Info),
        Delivered => ("DELIVERED", "Delivered", Success),
    }
}

impl WarehouseItemStatus {
    fn next_states(&self) -> &'static [Self] {
        use WarehouseItemStatus as S;
        match self {
            S::Pending => &[S::InWarehouse],
            S::InWarehouse => &[S::Packed],
            S::Packed => &[S::Dispatched],
            S::Dispatched => &[S::Delivered],
            S::Delivered => &[],
        }
    }

    /// Physically on the warehouse floor, packed or not.
    pub fn is_on_premises(&self) -> bool {
        matches!(self, WarehouseItemStatus::InWarehouse | WarehouseItemStatus::Packed)
    }
}

status_vocabulary! {
    PackingStatus in Packing {
        Created => ("CREATED", "Packed, awaiting dispatch", Warning),
        Dispatched => ("DISPATCHED", "Dispatched", Success),
    }
}

impl PackingStatus {
    fn next_states(&self) -> &'static [Self] {
        use PackingStatus as S;
        match self {
            S::Created => &[S::Dispatched],
            S::Dispatched => &[],
        }
    }
}

macro_rules! for_domain {
    ($domain:expr, $status:ident => $body:expr) => {
        match $domain {
            StatusDomain::Order => {
                type $status = OrderStatus;
                $body
            }
            StatusDomain::OrderLink => {
                type $status = OrderLinkStatus;
                $body
            }
            StatusDomain::Purchase => {
                type $status = PurchaseStatus;
                $body
            }
            StatusDomain::Payment => {
                type $status = PaymentStatus;
                $body
            }
            StatusDomain::WarehouseItem => {
                type $status = WarehouseItemStatus;
                $body
            }
            StatusDomain::Packing => {
                type $status = PackingStatus;
                $body
            }
        }
    };
}

/// String-keyed lookups over all status vocabularies.
pub struct StatusRegistry;

impl StatusRegistry {
    pub fn status_meta(domain: StatusDomain, code: &str) -> Result<StatusMeta, UnknownStatus> {
        for_domain!(domain, S => S::from_code(code).map(|s| s.meta()))
    }

    /// `Ok(false)` means both codes are known but the edge is not in the table.
    pub fn is_valid_transition(
        domain: StatusDomain,
        from: &str,
        to: &str,
    ) -> Result<bool, UnknownStatus> {
        for_domain!(domain, S => {
            let from = S::from_code(from)?;
            let to = S::from_code(to)?;
            Ok(from.can_transition_to(to))
        })
    }

    pub fn catalogue(domain: StatusDomain) -> Vec<StatusMeta> {
        for_domain!(domain, S => S::ALL.iter().map(|s| s.meta()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_codes_round_trip<S: LifecycleStatus + Serialize>() {
        for status in S::ALL {
            assert_eq!(S::from_code(status.code()).unwrap(), *status);
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.code()));
        }
    }

    #[test]
    fn test_codes_match_serde_names() {
        assert_codes_round_trip::<OrderStatus>();
        assert_codes_round_trip::<OrderLinkStatus>();
        assert_codes_round_trip::<PurchaseStatus>();
        assert_codes_round_trip::<PaymentStatus>();
        assert_codes_round_trip::<WarehouseItemStatus>();
        assert_codes_round_trip::<PackingStatus>();
    }

    #[test]
    fn test_order_link_main_path() {
        use OrderLinkStatus as S;
        let path = [
            S::Requested,
            S::Purchased,
            S::AwaitingPayment,
            S::FullyStocked,
            S::ImportedForeign,
            S::ImportedDomestic,
            S::Delivered,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(S::Delivered.is_terminal());
    }

    #[test]
    fn test_order_link_cannot_skip_states() {
        use OrderLinkStatus as S;
        assert!(!S::Requested.can_transition_to(S::FullyStocked));
        assert!(!S::Purchased.can_transition_to(S::Delivered));
        assert!(S::AuctionWon.can_transition_to(S::AwaitingPayment));
    }

    #[test]
    fn test_cancellation_edges() {
        use OrderLinkStatus as S;
        assert!(S::Requested.can_transition_to(S::Cancelled));
        assert!(S::FullyStocked.can_transition_to(S::Cancelled));
        assert!(!S::ImportedDomestic.can_transition_to(S::Cancelled));
        assert!(!S::Cancelled.can_transition_to(S::Requested));
    }

    #[test]
    fn test_warehouse_item_packing_edge() {
        use WarehouseItemStatus as S;
        assert!(S::InWarehouse.can_transition_to(S::Packed));
        assert!(!S::Pending.can_transition_to(S::Packed));
        assert!(!S::Packed.can_transition_to(S::Packed));
        assert!(S::Packed.is_on_premises());
        assert!(!S::Dispatched.is_on_premises());
    }

    #[test]
    fn test_registry_distinguishes_unknown_from_disallowed() {
        let disallowed =
            StatusRegistry::is_valid_transition(StatusDomain::WarehouseItem, "PENDING", "PACKED");
        assert_eq!(disallowed, Ok(false));

        let allowed = StatusRegistry::is_valid_transition(
            StatusDomain::WarehouseItem,
            "IN_WAREHOUSE",
            "PACKED",
        );
        assert_eq!(allowed, Ok(true));

        let unknown =
            StatusRegistry::is_valid_transition(StatusDomain::WarehouseItem, "LOST", "PACKED");
        assert_eq!(
            unknown,
            Err(UnknownStatus {
                domain: StatusDomain::WarehouseItem,
                code: "LOST".to_string(),
            })
        );
    }

    #[test]
    fn test_status_meta_lookup() {
        let meta = StatusRegistry::status_meta(StatusDomain::Packing, "DISPATCHED").unwrap();
        assert_eq!(meta.color, ColorTag::Success);
        assert!(meta.terminal);

        assert!(StatusRegistry::status_meta(StatusDomain::Payment, "paid").is_err());
    }

    #[test]
    fn test_catalogue_lists_every_status() {
        for domain in StatusDomain::ALL {
            let catalogue = StatusRegistry::catalogue(domain);
            assert!(!catalogue.is_empty());
            assert!(catalogue.iter().any(|m| m.terminal), "{} has no terminal state", domain);
        }
        assert_eq!(StatusRegistry::catalogue(StatusDomain::OrderLink).len(), 9);
    }

    #[test]
    fn test_domain_parse() {
        assert_eq!("warehouse_item".parse::<StatusDomain>(), Ok(StatusDomain::WarehouseItem));
        assert!("shipment".parse::<StatusDomain>().is_err());
    }
}
