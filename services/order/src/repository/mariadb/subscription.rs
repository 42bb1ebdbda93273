use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Connection, Executor, MySql, Row, Statement, Transaction};

use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};
use crate::model::{SubscriptionModel, SubscriptionTickOutcome, WeekdayPattern};
use crate::repository::{AbsSubscriptionRepo, AppSubscriptionTickUserFunc};

use super::{arg_encode_error, first_db_server, run_query_once, to_app_uid, uid_column};

const COLUMNS: &str =
    "`s_id`,`usr_id`,`product_id`,`quantity`,`start_date`,`days_left`,`weekdays`";

struct InsertArg<'a>(&'a [u8], &'a SubscriptionModel);
struct UpdateDaysLeftArg<'a>(&'a [u8], u32);
struct SubscriptionRow(MySqlRow);

impl TryFrom<InsertArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: InsertArg<'_>) -> DefaultResult<Self, Self::Error> {
        let (sid, sub) = (value.0, value.1);
        let patt = format!("INSERT INTO `subscription`({COLUMNS}) VALUES (?,?,?,?,?,?,?)");
        let mut args = MySqlArguments::default();
        args.add(sid.to_vec()).map_err(arg_encode_error)?;
        args.add(sub.subscriber_id).map_err(arg_encode_error)?;
        args.add(sub.product_id).map_err(arg_encode_error)?;
        args.add(sub.quantity).map_err(arg_encode_error)?;
        args.add(sub.start_date).map_err(arg_encode_error)?;
        args.add(sub.remaining_days()).map_err(arg_encode_error)?;
        args.add(sub.weekdays.bits()).map_err(arg_encode_error)?;
        Ok((patt, args))
    }
}

impl TryFrom<UpdateDaysLeftArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: UpdateDaysLeftArg<'_>) -> DefaultResult<Self, Self::Error> {
        let patt = "UPDATE `subscription` SET `days_left`=? WHERE `s_id`=?";
        let mut args = MySqlArguments::default();
        args.add(value.1).map_err(arg_encode_error)?;
        args.add(value.0.to_vec()).map_err(arg_encode_error)?;
        Ok((patt.to_string(), args))
    }
}

impl TryFrom<SubscriptionRow> for SubscriptionModel {
    type Error = AppError;
    fn try_from(value: SubscriptionRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        let bits = row.try_get::<u8, usize>(6)?;
        let obj = SubscriptionModel::from_stored(
            to_app_uid(&row, 0)?,
            row.try_get::<u32, usize>(1)?,
            row.try_get::<u64, usize>(2)?,
            row.try_get::<u32, usize>(3)?,
            row.try_get::<NaiveDate, usize>(4)?,
            WeekdayPattern::from_bits(bits)?,
            row.try_get::<u32, usize>(5)?,
        );
        Ok(obj)
    }
}

pub(crate) struct SubscriptionMariaDbRepo {
    _db: Arc<AppMariaDbStore>,
}

impl SubscriptionMariaDbRepo {
    pub(crate) fn new(dbs: Vec<Arc<AppMariaDbStore>>) -> DefaultResult<Self, AppError> {
        let _db = first_db_server(dbs)?;
        Ok(Self { _db })
    }

    fn not_exist(sid: &str) -> AppError {
        AppError {
            code: AppErrorCode::SubscriptionNotExist,
            detail: Some(sid.to_string()),
        }
    }

    async fn _fetch_one(
        tx: &mut Transaction<'_, MySql>,
        sid: &[u8],
        for_update: bool,
    ) -> DefaultResult<Option<SubscriptionModel>, AppError> {
        let lock_clause = if for_update { " FOR UPDATE" } else { "" };
        let sql_patt =
            format!("SELECT {COLUMNS} FROM `subscription` WHERE `s_id`=?{lock_clause}");
        let mut args = MySqlArguments::default();
        args.add(sid.to_vec()).map_err(arg_encode_error)?;
        let stmt = tx.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = &mut **tx;
        let maybe_row = exec.fetch_optional(query).await?;
        maybe_row
            .map(|row| SubscriptionModel::try_from(SubscriptionRow(row)))
            .transpose()
    }
} // end of impl SubscriptionMariaDbRepo

#[async_trait]
impl AbsSubscriptionRepo for SubscriptionMariaDbRepo {
    async fn create(&self, sub: &SubscriptionModel) -> DefaultResult<(), AppError> {
        let sid = uid_column(sub.id_.as_str())?;
        let (sql_patt, args) = <(String, MySqlArguments)>::try_from(InsertArg(&sid, sub))?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let _rs = run_query_once(&mut tx, sql_patt, args, Some(1)).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch(&self, sid: &str) -> DefaultResult<SubscriptionModel, AppError> {
        let sid_b = uid_column(sid)?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let maybe_sub = Self::_fetch_one(&mut tx, &sid_b, false).await?;
        tx.commit().await?;
        maybe_sub.ok_or_else(|| Self::not_exist(sid))
    }

    async fn fetch_active_ids(&self) -> DefaultResult<Vec<String>, AppError> {
        let sql_patt = "SELECT `s_id` FROM `subscription` WHERE `days_left` > 0 ORDER BY `s_id`";
        let mut conn = self._db.acquire().await?;
        let exec = conn.as_mut();
        let rows = exec.fetch_all(sql_patt).await?;
        rows.iter()
            .map(|row| to_app_uid(row, 0))
            .collect::<DefaultResult<Vec<_>, AppError>>()
    }

    async fn tick(
        &self,
        sid: &str,
        today: NaiveDate,
        cb: AppSubscriptionTickUserFunc,
    ) -> DefaultResult<(SubscriptionTickOutcome, SubscriptionModel), AppError> {
        let sid_b = uid_column(sid)?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        let mut sub = match Self::_fetch_one(&mut tx, &sid_b, true).await? {
            Some(s) => s,
            None => {
                tx.rollback().await?;
                return Err(Self::not_exist(sid));
            }
        };
        let outcome = cb(&mut sub, today);
        if matches!(outcome, SubscriptionTickOutcome::Deliver { .. }) {
            let arg = UpdateDaysLeftArg(&sid_b, sub.remaining_days());
            let (sql_patt, args) = <(String, MySqlArguments)>::try_from(arg)?;
            let _rs = run_query_once(&mut tx, sql_patt, args, Some(1)).await?;
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }
        Ok((outcome, sub))
    } // end of fn tick
} // end of impl SubscriptionMariaDbRepo
