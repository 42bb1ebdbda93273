use std::result::Result as DefaultResult;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::api::web::dto::{
    SubscriptionCreateErrorDto, SubscriptionCreateErrorReason, SubscriptionCreateReqDto,
    SubscriptionDto, SubscriptionState,
};
use crate::constant::app_meta;
use crate::error::{AppError, AppErrorCode};
use crate::generate_hex_uid;

use super::{CustomerModel, ProductModel};

const WEEKDAYS_ORDERED: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Opt-in flags of a week, bit 0 is Monday, bit 6 is Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayPattern(u8);

impl WeekdayPattern {
    pub const MASK: u8 = 0x7f;

    pub fn from_bits(bits: u8) -> DefaultResult<Self, AppError> {
        if bits & !Self::MASK == 0 {
            Ok(Self(bits))
        } else {
            Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some(format!("weekday-bits: {bits:#x}")),
            })
        }
    }

    pub fn from_weekdays(days: &[Weekday]) -> Self {
        let bits = days
            .iter()
            .fold(0u8, |acc, d| acc | (1u8 << d.num_days_from_monday()));
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_set(&self, day: Weekday) -> bool {
        (self.0 >> day.num_days_from_monday()) & 1 == 1
    }

    pub fn weekdays(&self) -> Vec<Weekday> {
        WEEKDAYS_ORDERED
            .into_iter()
            .filter(|d| self.is_set(*d))
            .collect()
    }
} // end of impl WeekdayPattern

#[derive(Debug, PartialEq)]
pub enum SubscriptionTickOutcome {
    // not a delivery day, nothing changed
    Skipped,
    Deliver { exhausted: bool },
    // already exhausted before this tick
    Terminal,
}

pub struct SubscriptionModel {
    pub id_: String,
    pub subscriber_id: u32,
    pub product_id: u64,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub weekdays: WeekdayPattern,
    remaining_days: u32,
}

impl SubscriptionModel {
    pub fn try_new(
        req: &SubscriptionCreateReqDto,
        subscriber: Option<&CustomerModel>,
        product: Option<&ProductModel>,
        today: NaiveDate,
    ) -> DefaultResult<Self, SubscriptionCreateErrorDto> {
        let reason = if subscriber.is_none() {
            Some(SubscriptionCreateErrorReason::UnknownCustomer)
        } else if product.is_none() {
            Some(SubscriptionCreateErrorReason::UnknownProduct)
        } else if !matches!(u32::try_from(req.quantity), Ok(q) if q >= 1) {
            Some(SubscriptionCreateErrorReason::InvalidQuantity)
        } else if !matches!(u32::try_from(req.remaining_days), Ok(d) if d >= 1) {
            Some(SubscriptionCreateErrorReason::InvalidRemainingDays)
        } else if req.weekdays.is_empty() {
            Some(SubscriptionCreateErrorReason::EmptyWeekdays)
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(SubscriptionCreateErrorDto { reason });
        }
        // both numbers are checked above
        let quantity = req.quantity as u32;
        let remaining_days = req.remaining_days as u32;
        Ok(Self {
            id_: generate_hex_uid(app_meta::MACHINE_CODE),
            subscriber_id: req.subscriber_id,
            product_id: req.product_id,
            quantity,
            start_date: req.start_date.unwrap_or(today),
            weekdays: WeekdayPattern::from_weekdays(&req.weekdays),
            remaining_days,
        })
    } // end of fn try_new

    /// rebuild the model from stored record
    pub fn from_stored(
        id_: String,
        subscriber_id: u32,
        product_id: u64,
        quantity: u32,
        start_date: NaiveDate,
        weekdays: WeekdayPattern,
        remaining_days: u32,
    ) -> Self {
        Self {
            id_,
            subscriber_id,
            product_id,
            quantity,
            start_date,
            weekdays,
            remaining_days,
        }
    }

    pub fn remaining_days(&self) -> u32 {
        self.remaining_days
    }

    pub fn state(&self) -> SubscriptionState {
        if self.remaining_days == 0 {
            SubscriptionState::Exhausted
        } else {
            SubscriptionState::Active
        }
    }

    pub fn should_deliver(&self, today: NaiveDate) -> bool {
        today >= self.start_date && self.weekdays.is_set(today.weekday()) && self.remaining_days > 0
    }

    /// the counter is only decremented here, and never below zero
    pub fn tick(&mut self, today: NaiveDate) -> SubscriptionTickOutcome {
        if self.remaining_days == 0 {
            SubscriptionTickOutcome::Terminal
        } else if self.should_deliver(today) {
            self.remaining_days -= 1;
            SubscriptionTickOutcome::Deliver {
                exhausted: self.remaining_days == 0,
            }
        } else {
            SubscriptionTickOutcome::Skipped
        }
    }
} // end of impl SubscriptionModel

impl From<&SubscriptionModel> for SubscriptionDto {
    fn from(value: &SubscriptionModel) -> Self {
        Self {
            subscription_id: value.id_.clone(),
            subscriber_id: value.subscriber_id,
            product_id: value.product_id,
            quantity: value.quantity,
            start_date: value.start_date,
            remaining_days: value.remaining_days,
            weekdays: value.weekdays.weekdays(),
            state: value.state(),
        }
    }
}
