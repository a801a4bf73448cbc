use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use lpg_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     AccountId       ---------------------------------------------------------
/// Identifies a party in the ledger: either a registered user or the system account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    /// The counterparty on the system side of every ledger transfer. User ids are assigned from 1 upwards, so
    /// this value never collides with a real account.
    pub const SYSTEM: AccountId = AccountId(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_system(&self) -> bool {
        *self == Self::SYSTEM
    }
}

impl From<i64> for AccountId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------    OrderNumber      ---------------------------------------------------------
/// A lightweight wrapper around the user-supplied order number.
///
/// Order numbers are Luhn-checked digit sequences. The wrapper itself is permissive; validation happens at the
/// API boundary via [`OrderNumber::is_luhn_valid`] so that numbers read back from storage never fail to construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_luhn_valid(&self) -> bool {
        crate::helpers::luhn_valid(&self.0)
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
/// The lifecycle state of an order.
///
/// `Processed` and `Invalid` are terminal: once an order reaches either, reconciliation never moves it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been submitted, but the accrual service has not acknowledged it yet.
    New,
    /// The accrual service knows about the order; no reward has been calculated.
    Registered,
    /// The reward calculation is in progress.
    Processing,
    /// The order was rejected, or reconciliation gave up on it. No reward will ever be granted.
    Invalid,
    /// The reward calculation finished and any reward has been credited.
    Processed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Processed | OrderStatusType::Invalid)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Registered => write!(f, "REGISTERED"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to New");
            OrderStatusType::New
        })
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: AccountId,
    pub status: OrderStatusType,
    /// The credited reward. Only present once the order is `Processed`.
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    /// The user that submitted the order and will receive the reward.
    pub user_id: AccountId,
    pub uploaded_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_number: OrderNumber, user_id: AccountId) -> Self {
        Self { order_number, user_id, uploaded_at: Utc::now() }
    }
}

//--------------------------------------    AccrualResult    ---------------------------------------------------------
/// A point-in-time accrual calculation result, already mapped onto engine types.
///
/// This is the closed set of outcomes the reconciler matches on; transport-level failures never reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualResult {
    pub status: OrderStatusType,
    pub accrual: Option<Points>,
}

impl AccrualResult {
    pub fn new(status: OrderStatusType, accrual: Option<Points>) -> Self {
        Self { status, accrual }
    }

    pub fn amount(&self) -> Points {
        self.accrual.unwrap_or(Points::ZERO)
    }
}

//--------------------------------------   TransactionKind   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Points moved from a user to the system account in payment for an order.
    Withdraw,
    /// Points credited from the system account to a user for a processed order.
    Accrual,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Withdraw => write!(f, "withdraw"),
            TransactionKind::Accrual => write!(f, "accrual"),
        }
    }
}

impl From<String> for TransactionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "withdraw" => Self::Withdraw,
            "accrual" => Self::Accrual,
            _ => panic!("Invalid transaction kind: {}", value),
        }
    }
}

//--------------------------------------     LedgerEntry     ---------------------------------------------------------
/// One immutable row of the ledger. Entries are only ever inserted, never updated or deleted; a user's balance is
/// the signed sum of the entries that mention their account.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: Points,
    /// The order this transfer settles or rewards.
    pub order_number: OrderNumber,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: AccountId,
    pub username: String,
    /// PHC-format password hash. The engine never sees plaintext passwords.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
