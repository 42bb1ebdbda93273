use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Placed,
    Shipped,
    Delivered,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubscriptionState {
    Active,
    Exhausted,
}

#[derive(Deserialize, Serialize)]
pub struct OrderHeaderReqDto {
    pub customer_id: u32,
    // profile address of the customer applies when omitted or blank
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub cod: bool,
}

#[derive(Deserialize, Serialize)]
pub struct OrderLineReqDto {
    pub product_id: u64,
    // signed on purpose, zero or negative quantity is rejected by the
    // use case with a proper reason instead of a decoding failure
    pub quantity: i64,
}

#[derive(Deserialize, Serialize)]
pub struct OrderCreateReqData {
    pub header: OrderHeaderReqDto,
    pub lines: Vec<OrderLineReqDto>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct OrderHeaderDto {
    pub order_id: String,
    pub customer_id: u32,
    pub status: OrderStatus,
    pub order_time: String, // RFC3339
    pub delivery_date: NaiveDate,
    pub address: String,
    pub total: String, // decimal rendered as string to keep precision
    pub transaction_ref: Option<String>,
    pub cod: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct OrderLineDto {
    pub product_id: u64,
    pub quantity: u32,
    pub unit_price: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct OrderDetailRespDto {
    pub order: OrderHeaderDto,
    pub lines: Vec<OrderLineDto>,
}

#[rustfmt::skip]
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum OrderPlaceErrorReason {
    UnknownCustomer, UnknownProduct, InvalidQuantity, DuplicateProductInOrder,
    EmptyOrder, ExceedingMaxLimit,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OrderPlaceErrorDto {
    pub reason: OrderPlaceErrorReason,
    pub line_seq: Option<usize>, // position of the offending line
    pub product_id: Option<u64>,
    pub customer_id: Option<u32>,
}

#[rustfmt::skip]
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ReqBodyErrorReason {
    UnsupportedContentType, MalformedJson, InvalidField, Unreadable,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ReqBodyErrorDto {
    pub reason: ReqBodyErrorReason,
    pub detail: String,
}

#[derive(Deserialize, Serialize)]
pub struct OrderStatusReqDto {
    pub status: OrderStatus,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum OrderStatusErrorReason {
    InvalidTransition,
    OrderNotExist,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OrderStatusUpdateErrorDto {
    pub reason: OrderStatusErrorReason,
    pub current: Option<OrderStatus>,
    pub requested: OrderStatus,
}

fn jsn_default_sub_qty() -> i64 {
    1
}

#[derive(Deserialize, Serialize)]
pub struct SubscriptionCreateReqDto {
    pub subscriber_id: u32,
    pub product_id: u64,
    #[serde(default = "jsn_default_sub_qty")]
    pub quantity: i64,
    pub start_date: Option<NaiveDate>,
    pub remaining_days: i64,
    pub weekdays: Vec<Weekday>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubscriptionDto {
    pub subscription_id: String,
    pub subscriber_id: u32,
    pub product_id: u64,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub remaining_days: u32,
    pub weekdays: Vec<Weekday>,
    pub state: SubscriptionState,
}

#[rustfmt::skip]
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum SubscriptionCreateErrorReason {
    UnknownCustomer, UnknownProduct, InvalidQuantity, InvalidRemainingDays,
    EmptyWeekdays,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SubscriptionCreateErrorDto {
    pub reason: SubscriptionCreateErrorReason,
}

#[derive(Deserialize, Serialize, Default)]
pub struct SubscriptionTickReqDto {
    // today in local time zone when omitted
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubscriptionDeliveryDto {
    pub subscription_id: String,
    pub order_id: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubscriptionTickFailureDto {
    pub subscription_id: String,
    pub reason: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubscriptionTickReportDto {
    pub date: NaiveDate,
    pub delivered: Vec<SubscriptionDeliveryDto>,
    pub exhausted: Vec<String>,
    pub skipped: Vec<String>,
    pub terminal: Vec<String>,
    pub failures: Vec<SubscriptionTickFailureDto>,
}

impl SubscriptionTickReportDto {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            delivered: Vec::new(),
            exhausted: Vec::new(),
            skipped: Vec::new(),
            terminal: Vec::new(),
            failures: Vec::new(),
        }
    }
}
