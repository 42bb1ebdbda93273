use std::collections::HashSet;
use std::result::Result as DefaultResult;
use std::vec::Vec;

use chrono::{DateTime, Days, FixedOffset, Local as LocalTime, NaiveDate, SecondsFormat};
use rust_decimal::Decimal;

use crate::api::web::dto::{
    OrderDetailRespDto, OrderHeaderDto, OrderLineDto, OrderLineReqDto, OrderPlaceErrorDto,
    OrderPlaceErrorReason, OrderStatus, OrderStatusErrorReason, OrderStatusUpdateErrorDto,
};
use crate::constant::{app_meta, DEFAULT_DELIVERY_DAYS};
use crate::error::{AppError, AppErrorCode};
use crate::generate_hex_uid;

use super::{CustomerModel, ProductModel};

pub struct OrderHeaderModel {
    pub id_: String,
    pub customer_id: u32,
    pub status: OrderStatus,
    pub create_time: DateTime<FixedOffset>,
    pub delivery_date: NaiveDate,
    pub address: String,
    pub total: Decimal,
    pub transaction_ref: Option<String>,
    pub cod: bool,
}

#[derive(Debug)]
pub struct OrderLineModel {
    pub product_id: u64,
    pub quantity: u32,
    // price snapshot taken from catalog at the time the order is placed
    pub unit_price: Decimal,
}

/// Header and lines of a single order. Lines can only be appended through
/// `append()`, which keeps the product set unique and the header total equal
/// to the sum of all line subtotals.
pub struct OrderModelSet {
    header: OrderHeaderModel,
    lines: Vec<OrderLineModel>,
    accepted: HashSet<u64>,
}

impl OrderStatus {
    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::Placed => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }

    // 2-char code kept in storage
    pub fn code(&self) -> &'static str {
        match self {
            Self::Placed => "PL",
            Self::Shipped => "SH",
            Self::Delivered => "DL",
        }
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = AppError;
    fn try_from(value: &str) -> DefaultResult<Self, Self::Error> {
        match value {
            "PL" => Ok(Self::Placed),
            "SH" => Ok(Self::Shipped),
            "DL" => Ok(Self::Delivered),
            _others => Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(format!("order-status: {value}")),
            }),
        }
    }
}

impl OrderHeaderModel {
    /// open a new order on behalf of the resolved customer, nothing is saved
    /// until the whole order with its lines is committed
    pub fn open(customer: &CustomerModel, address: Option<String>, cod: bool) -> Self {
        let create_time: DateTime<FixedOffset> = LocalTime::now().into();
        let delivery_date = create_time
            .date_naive()
            .checked_add_days(Days::new(DEFAULT_DELIVERY_DAYS))
            .unwrap_or(NaiveDate::MAX);
        let address = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| customer.address.clone());
        Self {
            id_: generate_hex_uid(app_meta::MACHINE_CODE),
            customer_id: customer.id,
            status: OrderStatus::Placed,
            create_time,
            delivery_date,
            address,
            total: Decimal::ZERO,
            transaction_ref: None,
            cod,
        }
    }

    pub fn try_advance(&mut self, next: OrderStatus) -> DefaultResult<(), OrderStatusUpdateErrorDto> {
        if self.status.successor() == Some(next) {
            self.status = next;
            Ok(())
        } else {
            Err(OrderStatusUpdateErrorDto {
                reason: OrderStatusErrorReason::InvalidTransition,
                current: Some(self.status),
                requested: next,
            })
        }
    }
} // end of impl OrderHeaderModel

impl OrderLineModel {
    pub fn try_from(
        seq: usize,
        req: &OrderLineReqDto,
        product: Option<&ProductModel>,
    ) -> DefaultResult<Self, OrderPlaceErrorDto> {
        let mut error = OrderPlaceErrorDto {
            reason: OrderPlaceErrorReason::InvalidQuantity,
            line_seq: Some(seq),
            product_id: Some(req.product_id),
            customer_id: None,
        };
        if req.quantity < 1 {
            return Err(error);
        }
        // valid, but beyond what a line in storage can hold
        let quantity = match u32::try_from(req.quantity) {
            Ok(v) => v,
            Err(_e) => {
                error.reason = OrderPlaceErrorReason::ExceedingMaxLimit;
                return Err(error);
            }
        };
        let prod = if let Some(p) = product {
            p
        } else {
            error.reason = OrderPlaceErrorReason::UnknownProduct;
            return Err(error);
        };
        Ok(Self {
            product_id: req.product_id,
            quantity,
            unit_price: prod.price,
        })
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
} // end of impl OrderLineModel

impl OrderModelSet {
    pub fn new(mut header: OrderHeaderModel) -> Self {
        header.total = Decimal::ZERO;
        Self {
            header,
            lines: Vec::new(),
            accepted: HashSet::new(),
        }
    }

    pub fn append(&mut self, seq: usize, line: OrderLineModel) -> DefaultResult<(), OrderPlaceErrorDto> {
        if !self.accepted.insert(line.product_id) {
            return Err(OrderPlaceErrorDto {
                reason: OrderPlaceErrorReason::DuplicateProductInOrder,
                line_seq: Some(seq),
                product_id: Some(line.product_id),
                customer_id: None,
            });
        }
        self.header.total += line.subtotal();
        self.lines.push(line);
        Ok(())
    }

    /// rebuild from stored records, the stored total has to match the lines
    pub fn from_parts(
        header: OrderHeaderModel,
        lines: Vec<OrderLineModel>,
    ) -> DefaultResult<Self, AppError> {
        let stored_total = header.total;
        let oid = header.id_.clone();
        let mut obj = Self::new(header);
        for (seq, line) in lines.into_iter().enumerate() {
            obj.append(seq, line).map_err(|e| AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(format!("oid:{oid}, duplicate-product:{:?}", e.product_id)),
            })?;
        }
        if obj.header.total == stored_total {
            Ok(obj)
        } else {
            let detail = format!(
                "oid:{oid}, stored-total:{stored_total}, computed:{}",
                obj.header.total
            );
            Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(detail),
            })
        }
    }

    pub fn into_parts(self) -> (OrderHeaderModel, Vec<OrderLineModel>) {
        (self.header, self.lines)
    }

    pub fn header(&self) -> &OrderHeaderModel {
        &self.header
    }

    pub fn lines(&self) -> &[OrderLineModel] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// keys of the (order, product) pairs, unique across the entire storage
    pub fn line_keys(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| Self::line_key(self.header.id_.as_str(), l.product_id))
            .collect()
    }

    pub fn line_key(oid: &str, product_id: u64) -> String {
        format!("{oid}-{product_id}")
    }
} // end of impl OrderModelSet

impl From<&OrderHeaderModel> for OrderHeaderDto {
    fn from(value: &OrderHeaderModel) -> Self {
        Self {
            order_id: value.id_.clone(),
            customer_id: value.customer_id,
            status: value.status,
            order_time: value.create_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            delivery_date: value.delivery_date,
            address: value.address.clone(),
            total: value.total.to_string(),
            transaction_ref: value.transaction_ref.clone(),
            cod: value.cod,
        }
    }
}

impl From<&OrderLineModel> for OrderLineDto {
    fn from(value: &OrderLineModel) -> Self {
        Self {
            product_id: value.product_id,
            quantity: value.quantity,
            unit_price: value.unit_price.to_string(),
        }
    }
}

impl From<&OrderModelSet> for OrderDetailRespDto {
    fn from(value: &OrderModelSet) -> Self {
        Self {
            order: OrderHeaderDto::from(value.header()),
            lines: value.lines().iter().map(OrderLineDto::from).collect(),
        }
    }
}
