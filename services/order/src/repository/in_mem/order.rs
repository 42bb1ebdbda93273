use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;

use crate::api::web::dto::{OrderPlaceErrorDto, OrderPlaceErrorReason, OrderStatus};
use crate::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::{OrderHeaderModel, OrderLineModel, OrderModelSet};

use super::super::{
    AbsOrderRepo, AppOrderRepoCreateReturn, AppOrderRepoStatusReturn, AppOrderRepoStatusUserFunc,
};
use super::{column_to_flag, flag_to_column, parse_column};

mod _toplvl_meta {
    pub(super) const TABLE_LABEL: &str = "order_toplvl_meta";
    #[rustfmt::skip]
    pub(super) enum InMemColIdx {
        CustomerId, Status, CreateTime, DeliveryDate, Address,
        Total, TransactionRef, Cod, TotNumColumns,
    }
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::CustomerId => 0,
                InMemColIdx::Status => 1,
                InMemColIdx::CreateTime => 2,
                InMemColIdx::DeliveryDate => 3,
                InMemColIdx::Address => 4,
                InMemColIdx::Total => 5,
                InMemColIdx::TransactionRef => 6,
                InMemColIdx::Cod => 7,
                InMemColIdx::TotNumColumns => 8,
            }
        }
    }
} // end of inner module _toplvl_meta

mod _orderline {
    use super::{AppInMemFetchedSingleTable, OrderModelSet};

    pub(super) const TABLE_LABEL: &str = "order_line_detail";
    #[rustfmt::skip]
    pub(super) enum InMemColIdx {Seq, Quantity, UnitPrice, TotNumColumns}
    impl From<InMemColIdx> for usize {
        fn from(value: InMemColIdx) -> usize {
            match value {
                InMemColIdx::Seq => 0,
                InMemColIdx::Quantity => 1,
                InMemColIdx::UnitPrice => 2,
                InMemColIdx::TotNumColumns => 3,
            }
        }
    }
    pub(super) fn to_inmem_tbl(data: &OrderModelSet) -> AppInMemFetchedSingleTable {
        let oid = data.header().id_.as_str();
        data.lines()
            .iter()
            .enumerate()
            .map(|(seq, line)| {
                let pkey = OrderModelSet::line_key(oid, line.product_id);
                let row = vec![
                    seq.to_string(),
                    line.quantity.to_string(),
                    line.unit_price.to_string(),
                ];
                (pkey, row)
            })
            .collect()
    }
    // the order ID is a hex string, it never contains the separator
    pub(super) fn product_id_from_pkey(key: &str) -> Option<u64> {
        key.rsplit_once('-').and_then(|(_oid, pid)| pid.parse().ok())
    }
} // end of inner module _orderline

struct InnerOidFilterOp<'a>(&'a str);
struct InnerCustomerFilterOp(String);

impl AbsDStoreFilterKeyOp for InnerOidFilterOp<'_> {
    fn filter(&self, k: &str, _v: &[String]) -> bool {
        k.split_once('-')
            .map(|(oid, _pid)| oid == self.0)
            .unwrap_or(false)
    }
}

impl AbsDStoreFilterKeyOp for InnerCustomerFilterOp {
    fn filter(&self, _k: &str, v: &[String]) -> bool {
        let idx: usize = _toplvl_meta::InMemColIdx::CustomerId.into();
        v.get(idx).map(|c| c == &self.0).unwrap_or(false)
    }
}

impl From<&OrderHeaderModel> for AppInMemFetchedSingleRow {
    fn from(value: &OrderHeaderModel) -> Self {
        let mut row = (0.._toplvl_meta::InMemColIdx::TotNumColumns.into())
            .map(|_num| String::new())
            .collect::<Self>();
        [
            (
                _toplvl_meta::InMemColIdx::CustomerId,
                value.customer_id.to_string(),
            ),
            (
                _toplvl_meta::InMemColIdx::Status,
                value.status.code().to_string(),
            ),
            (
                _toplvl_meta::InMemColIdx::CreateTime,
                value.create_time.to_rfc3339(),
            ),
            (
                _toplvl_meta::InMemColIdx::DeliveryDate,
                value.delivery_date.to_string(),
            ),
            (_toplvl_meta::InMemColIdx::Address, value.address.clone()),
            (_toplvl_meta::InMemColIdx::Total, value.total.to_string()),
            (
                _toplvl_meta::InMemColIdx::TransactionRef,
                value.transaction_ref.clone().unwrap_or_default(),
            ),
            (_toplvl_meta::InMemColIdx::Cod, flag_to_column(value.cod)),
        ]
        .into_iter()
        .map(|(idx, val)| {
            let idx: usize = idx.into();
            row[idx] = val;
        })
        .count();
        row
    } // end of fn from
}

impl TryFrom<(String, AppInMemFetchedSingleRow)> for OrderHeaderModel {
    type Error = AppError;
    fn try_from(value: (String, AppInMemFetchedSingleRow)) -> DefaultResult<Self, Self::Error> {
        let (oid, row) = value;
        let label = _toplvl_meta::TABLE_LABEL;
        let status_raw = row
            .get::<usize>(_toplvl_meta::InMemColIdx::Status.into())
            .map(String::as_str)
            .unwrap_or_default();
        let time_raw = parse_column::<String>(&row, _toplvl_meta::InMemColIdx::CreateTime.into(), label)?;
        let create_time = DateTime::parse_from_rfc3339(time_raw.as_str()).map_err(|e| AppError {
            code: AppErrorCode::DataCorruption,
            detail: Some(format!("oid:{oid}, create-time, {e}")),
        })?;
        let txn_ref = parse_column::<String>(&row, _toplvl_meta::InMemColIdx::TransactionRef.into(), label)?;
        Ok(Self {
            status: OrderStatus::try_from(status_raw)?,
            customer_id: parse_column(&row, _toplvl_meta::InMemColIdx::CustomerId.into(), label)?,
            create_time,
            delivery_date: parse_column::<NaiveDate>(
                &row,
                _toplvl_meta::InMemColIdx::DeliveryDate.into(),
                label,
            )?,
            address: parse_column(&row, _toplvl_meta::InMemColIdx::Address.into(), label)?,
            total: parse_column::<Decimal>(&row, _toplvl_meta::InMemColIdx::Total.into(), label)?,
            transaction_ref: Some(txn_ref).filter(|s| !s.is_empty()),
            cod: column_to_flag(&row, _toplvl_meta::InMemColIdx::Cod.into()),
            id_: oid,
        })
    } // end of fn try_from
}

fn line_from_inmem(key: &str, row: &[String]) -> DefaultResult<(usize, OrderLineModel), AppError> {
    let label = _orderline::TABLE_LABEL;
    let product_id = _orderline::product_id_from_pkey(key).ok_or_else(|| AppError {
        code: AppErrorCode::DataCorruption,
        detail: Some(format!("table:{label}, pkey:{key}")),
    })?;
    let seq = parse_column::<usize>(row, _orderline::InMemColIdx::Seq.into(), label)?;
    let line = OrderLineModel {
        product_id,
        quantity: parse_column(row, _orderline::InMemColIdx::Quantity.into(), label)?,
        unit_price: parse_column(row, _orderline::InMemColIdx::UnitPrice.into(), label)?,
    };
    Ok((seq, line))
}

pub struct OrderInMemRepo {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl OrderInMemRepo {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(_toplvl_meta::TABLE_LABEL).await?;
        m.create_table(_orderline::TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }

    async fn fetch_header(&self, oid: &str) -> DefaultResult<OrderHeaderModel, AppError> {
        let tbl_label = _toplvl_meta::TABLE_LABEL;
        let info = HashMap::from([(tbl_label.to_string(), vec![oid.to_string()])]);
        let mut fetched = self.datastore.fetch(info).await?;
        let row = fetched
            .remove(tbl_label)
            .and_then(|mut t| t.remove(oid))
            .ok_or_else(|| AppError {
                code: AppErrorCode::OrderNotExist,
                detail: Some(oid.to_string()),
            })?;
        OrderHeaderModel::try_from((oid.to_string(), row))
    }

    async fn fetch_lines(&self, oid: &str) -> DefaultResult<Vec<OrderLineModel>, AppError> {
        let tbl_label = _orderline::TABLE_LABEL;
        let op = InnerOidFilterOp(oid);
        let keys = self.datastore.filter_keys(tbl_label.to_string(), &op).await?;
        let info = HashMap::from([(tbl_label.to_string(), keys)]);
        let mut fetched = self.datastore.fetch(info).await?;
        let rows = fetched.remove(tbl_label).unwrap_or_default();
        let mut lines = rows
            .iter()
            .map(|(k, row)| line_from_inmem(k.as_str(), row.as_slice()))
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        lines.sort_by_key(|(seq, _)| *seq);
        Ok(lines.into_iter().map(|(_, line)| line).collect())
    }
} // end of impl OrderInMemRepo

#[async_trait]
impl AbsOrderRepo for OrderInMemRepo {
    async fn create(&self, order: &OrderModelSet) -> AppOrderRepoCreateReturn {
        let oid = order.header().id_.clone();
        let (tbl_toplvl, tbl_line) = (_toplvl_meta::TABLE_LABEL, _orderline::TABLE_LABEL);
        let info = HashMap::from([
            (tbl_toplvl.to_string(), vec![oid.clone()]),
            (tbl_line.to_string(), order.line_keys()),
        ]);
        // the whole store is locked until the new rows are saved
        let (fetched, lock) = match self.datastore.fetch_acquire(info).await {
            Ok(v) => v,
            Err(e) => return Err(Err(e)),
        };
        let num_header_found = fetched.get(tbl_toplvl).map(|t| t.len()).unwrap_or(0);
        if num_header_found > 0 {
            return Err(Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(format!("order-id-collision: {oid}")),
            }));
        }
        let clashed = fetched
            .get(tbl_line)
            .and_then(|t| t.keys().find_map(|k| _orderline::product_id_from_pkey(k)));
        if let Some(pid) = clashed {
            let line_seq = order.lines().iter().position(|l| l.product_id == pid);
            return Err(Ok(OrderPlaceErrorDto {
                reason: OrderPlaceErrorReason::DuplicateProductInOrder,
                line_seq,
                product_id: Some(pid),
                customer_id: None,
            }));
        }
        let header_row = AppInMemFetchedSingleRow::from(order.header());
        let data = HashMap::from([
            (
                tbl_toplvl.to_string(),
                AppInMemFetchedSingleTable::from([(oid, header_row)]),
            ),
            (tbl_line.to_string(), _orderline::to_inmem_tbl(order)),
        ]);
        match self.datastore.save_release(data, lock) {
            Ok(_num) => Ok(()),
            Err(e) => Err(Err(e)),
        }
    } // end of fn create

    async fn fetch_order(&self, oid: &str) -> DefaultResult<OrderModelSet, AppError> {
        // header and lines are always saved together, once the header is
        // found its lines are already in the store
        let header = self.fetch_header(oid).await?;
        let lines = self.fetch_lines(oid).await?;
        OrderModelSet::from_parts(header, lines)
    }

    async fn fetch_by_customer(
        &self,
        customer_id: u32,
    ) -> DefaultResult<Vec<OrderHeaderModel>, AppError> {
        let tbl_label = _toplvl_meta::TABLE_LABEL;
        let op = InnerCustomerFilterOp(customer_id.to_string());
        let keys = self.datastore.filter_keys(tbl_label.to_string(), &op).await?;
        let info = HashMap::from([(tbl_label.to_string(), keys)]);
        let mut fetched = self.datastore.fetch(info).await?;
        let rows = fetched.remove(tbl_label).unwrap_or_default();
        let mut headers = rows
            .into_iter()
            .map(OrderHeaderModel::try_from)
            .collect::<DefaultResult<Vec<_>, AppError>>()?;
        headers.sort_by_key(|h| h.create_time);
        Ok(headers)
    }

    async fn update_status(
        &self,
        oid: &str,
        next: OrderStatus,
        cb: AppOrderRepoStatusUserFunc,
    ) -> AppOrderRepoStatusReturn {
        let tbl_label = _toplvl_meta::TABLE_LABEL;
        let info = HashMap::from([(tbl_label.to_string(), vec![oid.to_string()])]);
        let (mut fetched, lock) = match self.datastore.fetch_acquire(info).await {
            Ok(v) => v,
            Err(e) => return Err(Err(e)),
        };
        let row = match fetched.remove(tbl_label).and_then(|mut t| t.remove(oid)) {
            Some(r) => r,
            None => {
                return Err(Err(AppError {
                    code: AppErrorCode::OrderNotExist,
                    detail: Some(oid.to_string()),
                }))
            }
        };
        let mut header = match OrderHeaderModel::try_from((oid.to_string(), row)) {
            Ok(h) => h,
            Err(e) => return Err(Err(e)),
        };
        // lock is released on return, nothing saved if the callback rejects
        if let Err(e) = cb(&mut header, next) {
            return Err(Ok(e));
        }
        let row = AppInMemFetchedSingleRow::from(&header);
        let data = HashMap::from([(
            tbl_label.to_string(),
            AppInMemFetchedSingleTable::from([(oid.to_string(), row)]),
        )]);
        match self.datastore.save_release(data, lock) {
            Ok(_num) => Ok(header),
            Err(e) => Err(Err(e)),
        }
    } // end of fn update_status
} // end of impl OrderInMemRepo
