use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::{SubscriptionModel, SubscriptionTickOutcome, WeekdayPattern};

use super::super::{AbsSubscriptionRepo, AppSubscriptionTickUserFunc};
use super::parse_column;

const TABLE_LABEL: &str = "subscription";

#[rustfmt::skip]
enum InMemColIdx {
    SubscriberId, ProductId, Quantity, StartDate,
    RemainingDays, Weekdays, TotNumColumns,
}
impl From<InMemColIdx> for usize {
    fn from(value: InMemColIdx) -> usize {
        match value {
            InMemColIdx::SubscriberId => 0,
            InMemColIdx::ProductId => 1,
            InMemColIdx::Quantity => 2,
            InMemColIdx::StartDate => 3,
            InMemColIdx::RemainingDays => 4,
            InMemColIdx::Weekdays => 5,
            InMemColIdx::TotNumColumns => 6,
        }
    }
}

struct InnerActiveFilterOp;

impl AbsDStoreFilterKeyOp for InnerActiveFilterOp {
    fn filter(&self, _k: &str, v: &[String]) -> bool {
        let idx: usize = InMemColIdx::RemainingDays.into();
        v.get(idx)
            .and_then(|d| d.parse::<u32>().ok())
            .map(|d| d > 0)
            .unwrap_or(false)
    }
}

impl From<&SubscriptionModel> for AppInMemFetchedSingleRow {
    fn from(value: &SubscriptionModel) -> Self {
        let row = vec![
            value.subscriber_id.to_string(),
            value.product_id.to_string(),
            value.quantity.to_string(),
            value.start_date.to_string(),
            value.remaining_days().to_string(),
            value.weekdays.bits().to_string(),
        ];
        let num_cols: usize = InMemColIdx::TotNumColumns.into();
        debug_assert_eq!(row.len(), num_cols);
        row
    }
}

impl TryFrom<(String, AppInMemFetchedSingleRow)> for SubscriptionModel {
    type Error = AppError;
    fn try_from(value: (String, AppInMemFetchedSingleRow)) -> DefaultResult<Self, Self::Error> {
        let (sid, row) = value;
        let bits = parse_column::<u8>(&row, InMemColIdx::Weekdays.into(), TABLE_LABEL)?;
        let obj = SubscriptionModel::from_stored(
            sid,
            parse_column(&row, InMemColIdx::SubscriberId.into(), TABLE_LABEL)?,
            parse_column(&row, InMemColIdx::ProductId.into(), TABLE_LABEL)?,
            parse_column(&row, InMemColIdx::Quantity.into(), TABLE_LABEL)?,
            parse_column::<NaiveDate>(&row, InMemColIdx::StartDate.into(), TABLE_LABEL)?,
            WeekdayPattern::from_bits(bits)?,
            parse_column(&row, InMemColIdx::RemainingDays.into(), TABLE_LABEL)?,
        );
        Ok(obj)
    }
}

pub struct SubscriptionInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl SubscriptionInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    fn to_inmem_data(sub: &SubscriptionModel) -> HashMap<String, AppInMemFetchedSingleTable> {
        let row = AppInMemFetchedSingleRow::from(sub);
        let table = AppInMemFetchedSingleTable::from([(sub.id_.clone(), row)]);
        HashMap::from([(TABLE_LABEL.to_string(), table)])
    }

    fn not_exist(sid: &str) -> AppError {
        AppError {
            code: AppErrorCode::SubscriptionNotExist,
            detail: Some(sid.to_string()),
        }
    }
}

#[async_trait]
impl AbsSubscriptionRepo for SubscriptionInMemRepo {
    async fn create(&self, sub: &SubscriptionModel) -> DefaultResult<(), AppError> {
        let data = Self::to_inmem_data(sub);
        let _num = self.datastore.save(data).await?;
        Ok(())
    }

    async fn fetch(&self, sid: &str) -> DefaultResult<SubscriptionModel, AppError> {
        let info = HashMap::from([(TABLE_LABEL.to_string(), vec![sid.to_string()])]);
        let mut fetched = self.datastore.fetch(info).await?;
        let row = fetched
            .remove(TABLE_LABEL)
            .and_then(|mut t| t.remove(sid))
            .ok_or_else(|| Self::not_exist(sid))?;
        SubscriptionModel::try_from((sid.to_string(), row))
    }

    async fn fetch_active_ids(&self) -> DefaultResult<Vec<String>, AppError> {
        let op = InnerActiveFilterOp;
        let mut ids = self
            .datastore
            .filter_keys(TABLE_LABEL.to_string(), &op)
            .await?;
        ids.sort();
        Ok(ids)
    }

    async fn tick(
        &self,
        sid: &str,
        today: NaiveDate,
        cb: AppSubscriptionTickUserFunc,
    ) -> DefaultResult<(SubscriptionTickOutcome, SubscriptionModel), AppError> {
        let info = HashMap::from([(TABLE_LABEL.to_string(), vec![sid.to_string()])]);
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let row = fetched
            .remove(TABLE_LABEL)
            .and_then(|mut t| t.remove(sid))
            .ok_or_else(|| Self::not_exist(sid))?;
        let mut sub = SubscriptionModel::try_from((sid.to_string(), row))?;
        let outcome = cb(&mut sub, today);
        if matches!(outcome, SubscriptionTickOutcome::Deliver { .. }) {
            let data = Self::to_inmem_data(&sub);
            let _num = self.datastore.save_release(data, lock)?;
        } // otherwise nothing changed, the lock is simply dropped
        Ok((outcome, sub))
    }
} // end of impl SubscriptionInMemRepo
