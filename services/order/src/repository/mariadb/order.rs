use std::cmp::min;
use std::result::Result as DefaultResult;
use std::sync::Arc;
use std::vec::Vec;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Connection, Executor, MySql, Row, Statement, Transaction};

use crate::api::web::dto::{
    OrderPlaceErrorDto, OrderPlaceErrorReason, OrderStatus, OrderStatusUpdateErrorDto,
};
use crate::constant::hard_limit;
use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::{OrderHeaderModel, OrderLineModel, OrderModelSet};
use crate::repository::{
    AbsOrderRepo, AppOrderRepoCreateReturn, AppOrderRepoStatusReturn, AppOrderRepoStatusUserFunc,
};

use super::{arg_encode_error, first_db_server, run_query_once, to_app_uid, uid_column};

const HEADER_COLUMNS: &str = "`o_id`,`usr_id`,`status`,`created_time`,`delivery_date`,\
                              `address`,`total`,`transaction_ref`,`cod`";

struct InsertHeaderArg<'a>(&'a [u8], &'a OrderHeaderModel);
struct InsertLineArg<'a>(&'a [u8], usize, &'a [OrderLineModel]);
struct FetchClashedLineArg<'a>(&'a [u8], Vec<u64>);
struct UpdateStatusArg<'a>(&'a [u8], OrderStatus);

struct HeaderRow(MySqlRow);
struct LineRow(MySqlRow);

impl TryFrom<InsertHeaderArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: InsertHeaderArg<'_>) -> DefaultResult<Self, Self::Error> {
        let (oid, h) = (value.0, value.1);
        let patt = format!("INSERT INTO `order_toplvl_meta`({HEADER_COLUMNS}) VALUES (?,?,?,?,?,?,?,?,?)");
        let mut args = MySqlArguments::default();
        args.add(oid.to_vec()).map_err(arg_encode_error)?;
        args.add(h.customer_id).map_err(arg_encode_error)?;
        args.add(h.status.code()).map_err(arg_encode_error)?;
        args.add(h.create_time.naive_utc()).map_err(arg_encode_error)?;
        args.add(h.delivery_date).map_err(arg_encode_error)?;
        args.add(h.address.clone()).map_err(arg_encode_error)?;
        args.add(h.total).map_err(arg_encode_error)?;
        args.add(h.transaction_ref.clone()).map_err(arg_encode_error)?;
        args.add(h.cod).map_err(arg_encode_error)?;
        Ok((patt, args))
    }
}

impl TryFrom<InsertLineArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: InsertLineArg<'_>) -> DefaultResult<Self, Self::Error> {
        let (oid, seq_start, lines) = (value.0, value.1, value.2);
        let items = (0..lines.len())
            .map(|_| "(?,?,?,?,?)")
            .collect::<Vec<_>>()
            .join(",");
        let patt = format!(
            "INSERT INTO `order_line_detail`(`o_id`,`seq`,`product_id`,`quantity`,\
             `unit_price`) VALUES {items}"
        );
        let mut args = MySqlArguments::default();
        for (idx, line) in lines.iter().enumerate() {
            let seq = (seq_start + idx) as u16; // match the column type in db table
            args.add(oid.to_vec()).map_err(arg_encode_error)?;
            args.add(seq).map_err(arg_encode_error)?;
            args.add(line.product_id).map_err(arg_encode_error)?;
            args.add(line.quantity).map_err(arg_encode_error)?;
            args.add(line.unit_price).map_err(arg_encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<FetchClashedLineArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: FetchClashedLineArg<'_>) -> DefaultResult<Self, Self::Error> {
        let (oid, pids) = (value.0, value.1);
        let items = (0..pids.len()).map(|_| "?").collect::<Vec<_>>().join(",");
        // the matching index range is locked until the transaction ends, so
        // concurrent insertion of the same pair is blocked
        let patt = format!(
            "SELECT `product_id` FROM `order_line_detail` WHERE `o_id`=? \
             AND `product_id` IN ({items}) FOR UPDATE"
        );
        let mut args = MySqlArguments::default();
        args.add(oid.to_vec()).map_err(arg_encode_error)?;
        for pid in pids {
            args.add(pid).map_err(arg_encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<UpdateStatusArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: UpdateStatusArg<'_>) -> DefaultResult<Self, Self::Error> {
        let patt = "UPDATE `order_toplvl_meta` SET `status`=? WHERE `o_id`=?";
        let mut args = MySqlArguments::default();
        args.add(value.1.code()).map_err(arg_encode_error)?;
        args.add(value.0.to_vec()).map_err(arg_encode_error)?;
        Ok((patt.to_string(), args))
    }
}

impl TryFrom<HeaderRow> for OrderHeaderModel {
    type Error = AppError;
    fn try_from(value: HeaderRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        let id_ = to_app_uid(&row, 0)?;
        let status_raw = row.try_get::<String, usize>(2)?;
        let ctime = row.try_get::<NaiveDateTime, usize>(3)?;
        let create_time: DateTime<FixedOffset> =
            DateTime::<Utc>::from_naive_utc_and_offset(ctime, Utc).into();
        Ok(Self {
            id_,
            customer_id: row.try_get::<u32, usize>(1)?,
            status: OrderStatus::try_from(status_raw.as_str())?,
            create_time,
            delivery_date: row.try_get::<NaiveDate, usize>(4)?,
            address: row.try_get::<String, usize>(5)?,
            total: row.try_get::<Decimal, usize>(6)?,
            transaction_ref: row.try_get::<Option<String>, usize>(7)?,
            cod: row.try_get::<bool, usize>(8)?,
        })
    }
}

impl TryFrom<LineRow> for OrderLineModel {
    type Error = AppError;
    fn try_from(value: LineRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            product_id: row.try_get::<u64, usize>(0)?,
            quantity: row.try_get::<u32, usize>(1)?,
            unit_price: row.try_get::<Decimal, usize>(2)?,
        })
    }
}

pub(crate) struct OrderMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl OrderMariaDbRepo {
    pub(crate) fn new(dbs: Vec<Arc<AppMariaDbStore>>) -> DefaultResult<Self, AppError> {
        let _db = first_db_server(dbs)?;
        Ok(Self { _db })
    }

    async fn _fetch_header(
        tx: &mut Transaction<'_, MySql>,
        oid: &[u8],
        for_update: bool,
    ) -> DefaultResult<Option<OrderHeaderModel>, AppError> {
        let lock_clause = if for_update { " FOR UPDATE" } else { "" };
        let sql_patt =
            format!("SELECT {HEADER_COLUMNS} FROM `order_toplvl_meta` WHERE `o_id`=?{lock_clause}");
        let mut args = MySqlArguments::default();
        args.add(oid.to_vec()).map_err(arg_encode_error)?;
        let stmt = tx.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = &mut **tx;
        let maybe_row = exec.fetch_optional(query).await?;
        maybe_row
            .map(|row| OrderHeaderModel::try_from(HeaderRow(row)))
            .transpose()
    }

    async fn _fetch_lines(
        tx: &mut Transaction<'_, MySql>,
        oid: &[u8],
    ) -> DefaultResult<Vec<OrderLineModel>, AppError> {
        let sql_patt = "SELECT `product_id`,`quantity`,`unit_price` FROM `order_line_detail` \
                        WHERE `o_id`=? ORDER BY `seq` ASC";
        let mut args = MySqlArguments::default();
        args.add(oid.to_vec()).map_err(arg_encode_error)?;
        let stmt = tx.prepare(sql_patt).await?;
        let query = stmt.query_with(args);
        let exec = &mut **tx;
        let rows = exec.fetch_all(query).await?;
        rows.into_iter()
            .map(|row| OrderLineModel::try_from(LineRow(row)))
            .collect()
    }

    async fn _fetch_clashed_pids(
        tx: &mut Transaction<'_, MySql>,
        oid: &[u8],
        pids: Vec<u64>,
    ) -> DefaultResult<Vec<u64>, AppError> {
        let (sql_patt, args) = <(String, MySqlArguments)>::try_from(FetchClashedLineArg(oid, pids))?;
        let stmt = tx.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = &mut **tx;
        let rows = exec.fetch_all(query).await?;
        rows.into_iter()
            .map(|row| row.try_get::<u64, usize>(0).map_err(AppError::from))
            .collect()
    }

    async fn _create(&self, order: &OrderModelSet) -> DefaultResult<Option<OrderPlaceErrorDto>, AppError> {
        let (header, lines) = (order.header(), order.lines());
        if lines.len() > hard_limit::MAX_ORDER_LINES_PER_REQUEST {
            let d = format!(
                "actual: {}, limit:{}",
                lines.len(),
                hard_limit::MAX_ORDER_LINES_PER_REQUEST
            );
            return Err(AppError {
                code: AppErrorCode::ExceedingMaxLimit,
                detail: Some(d),
            });
        }
        let oid = uid_column(header.id_.as_str())?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;

        let pids = lines.iter().map(|l| l.product_id).collect::<Vec<_>>();
        let clashed = Self::_fetch_clashed_pids(&mut tx, &oid, pids).await?;
        if let Some(pid) = clashed.first() {
            tx.rollback().await?;
            let line_seq = lines.iter().position(|l| l.product_id == *pid);
            return Ok(Some(OrderPlaceErrorDto {
                reason: OrderPlaceErrorReason::DuplicateProductInOrder,
                line_seq,
                product_id: Some(*pid),
                customer_id: None,
            }));
        }
        let (sql_patt, args) = <(String, MySqlArguments)>::try_from(InsertHeaderArg(&oid, header))?;
        let _rs = run_query_once(&mut tx, sql_patt, args, Some(1)).await?;

        let mut num_processed = 0;
        while num_processed < lines.len() {
            let num_batch = min(
                lines.len() - num_processed,
                hard_limit::MAX_ORDER_LINES_PER_INSERT,
            );
            let batch = &lines[num_processed..(num_processed + num_batch)];
            let (sql_patt, args) =
                <(String, MySqlArguments)>::try_from(InsertLineArg(&oid, num_processed, batch))?;
            let _rs = run_query_once(&mut tx, sql_patt, args, Some(num_batch)).await?;
            num_processed += num_batch;
        } // nothing is visible to others until commit
        tx.commit().await?;
        Ok(None)
    } // end of fn _create

    async fn _update_status(
        &self,
        oid: &str,
        next: OrderStatus,
        cb: AppOrderRepoStatusUserFunc,
    ) -> DefaultResult<DefaultResult<OrderHeaderModel, OrderStatusUpdateErrorDto>, AppError> {
        let oid_b = uid_column(oid)?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let mut header = Self::_fetch_header(&mut tx, &oid_b, true)
            .await?
            .ok_or_else(|| AppError {
                code: AppErrorCode::OrderNotExist,
                detail: Some(oid.to_string()),
            })?;
        if let Err(e) = cb(&mut header, next) {
            tx.rollback().await?;
            return Ok(Err(e));
        }
        let (sql_patt, args) =
            <(String, MySqlArguments)>::try_from(UpdateStatusArg(&oid_b, header.status))?;
        let _rs = run_query_once(&mut tx, sql_patt, args, Some(1)).await?;
        tx.commit().await?;
        Ok(Ok(header))
    }
} // end of impl OrderMariaDbRepo

#[async_trait]
impl AbsOrderRepo for OrderMariaDbRepo {
    async fn create(&self, order: &OrderModelSet) -> AppOrderRepoCreateReturn {
        match self._create(order).await {
            Ok(None) => Ok(()),
            Ok(Some(e)) => Err(Ok(e)),
            Err(e) => Err(Err(e)),
        }
    }

    async fn fetch_order(&self, oid: &str) -> DefaultResult<OrderModelSet, AppError> {
        let oid_b = uid_column(oid)?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let header = Self::_fetch_header(&mut tx, &oid_b, false)
            .await?
            .ok_or_else(|| AppError {
                code: AppErrorCode::OrderNotExist,
                detail: Some(oid.to_string()),
            })?;
        let lines = Self::_fetch_lines(&mut tx, &oid_b).await?;
        tx.commit().await?;
        OrderModelSet::from_parts(header, lines)
    }

    async fn fetch_by_customer(
        &self,
        customer_id: u32,
    ) -> DefaultResult<Vec<OrderHeaderModel>, AppError> {
        let sql_patt = format!(
            "SELECT {HEADER_COLUMNS} FROM `order_toplvl_meta` WHERE `usr_id`=? \
             ORDER BY `created_time` ASC"
        );
        let mut args = MySqlArguments::default();
        args.add(customer_id).map_err(arg_encode_error)?;
        let mut conn = self._db.acquire().await?;
        let stmt = conn.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let rows = exec.fetch_all(query).await?;
        rows.into_iter()
            .map(|row| OrderHeaderModel::try_from(HeaderRow(row)))
            .collect()
    }

    async fn update_status(
        &self,
        oid: &str,
        next: OrderStatus,
        cb: AppOrderRepoStatusUserFunc,
    ) -> AppOrderRepoStatusReturn {
        match self._update_status(oid, next, cb).await {
            Ok(Ok(header)) => Ok(header),
            Ok(Err(e)) => Err(Ok(e)),
            Err(e) => Err(Err(e)),
        }
    } // end of fn update_status
} // end of impl OrderMariaDbRepo
