use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Connection, Executor, Row, Statement};

use crate::datastore::AppMariaDbStore;
use crate::error::AppError;
use crate::model::CustomerModel;
use crate::repository::AbsIdentityStore;

use super::{arg_encode_error, first_db_server, run_query_once};

const COLUMNS: &str =
    "`id`,`phone`,`name`,`email`,`address`,`is_active`,`is_staff`,`is_superuser`";

struct UpsertArg<'a>(&'a [CustomerModel]);
struct FetchPhoneOwnerArg<'a>(&'a [CustomerModel]);
struct CustomerRow(MySqlRow);

impl TryFrom<UpsertArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: UpsertArg<'_>) -> DefaultResult<Self, Self::Error> {
        let items = (0..value.0.len())
            .map(|_| "(?,?,?,?,?,?,?,?)")
            .collect::<Vec<_>>()
            .join(",");
        let patt = format!(
            "INSERT INTO `customer_profile`({COLUMNS}) VALUES {items} ON DUPLICATE KEY \
             UPDATE `phone`=VALUE(`phone`),`name`=VALUE(`name`),`email`=VALUE(`email`),\
             `address`=VALUE(`address`),`is_active`=VALUE(`is_active`),\
             `is_staff`=VALUE(`is_staff`),`is_superuser`=VALUE(`is_superuser`)"
        );
        let mut args = MySqlArguments::default();
        for c in value.0 {
            args.add(c.id).map_err(arg_encode_error)?;
            args.add(c.phone.clone()).map_err(arg_encode_error)?;
            args.add(c.name.clone()).map_err(arg_encode_error)?;
            args.add(c.email.clone()).map_err(arg_encode_error)?;
            args.add(c.address.clone()).map_err(arg_encode_error)?;
            args.add(c.active).map_err(arg_encode_error)?;
            args.add(c.is_staff).map_err(arg_encode_error)?;
            args.add(c.is_superuser).map_err(arg_encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<FetchPhoneOwnerArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: FetchPhoneOwnerArg<'_>) -> DefaultResult<Self, Self::Error> {
        let items = (0..value.0.len()).map(|_| "?").collect::<Vec<_>>().join(",");
        // rows with the given phone numbers stay locked until the upsert is done
        let patt = format!(
            "SELECT `phone`,`id` FROM `customer_profile` WHERE `phone` IN ({items}) FOR UPDATE"
        );
        let mut args = MySqlArguments::default();
        for c in value.0 {
            args.add(c.phone.clone()).map_err(arg_encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<CustomerRow> for CustomerModel {
    type Error = AppError;
    fn try_from(value: CustomerRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            id: row.try_get::<u32, usize>(0)?,
            phone: row.try_get::<String, usize>(1)?,
            name: row.try_get::<String, usize>(2)?,
            email: row.try_get::<String, usize>(3)?,
            address: row.try_get::<String, usize>(4)?,
            active: row.try_get::<bool, usize>(5)?,
            is_staff: row.try_get::<bool, usize>(6)?,
            is_superuser: row.try_get::<bool, usize>(7)?,
        })
    }
}

pub(crate) struct IdentityMariaDbStore {
    _db: Arc<AppMariaDbStore>,
}

impl IdentityMariaDbStore {
    pub(crate) fn new(dbs: Vec<Arc<AppMariaDbStore>>) -> DefaultResult<Self, AppError> {
        let _db = first_db_server(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsIdentityStore for IdentityMariaDbStore {
    async fn resolve_customer(&self, id: u32) -> DefaultResult<Option<CustomerModel>, AppError> {
        let sql_patt = format!("SELECT {COLUMNS} FROM `customer_profile` WHERE `id`=?");
        let mut args = MySqlArguments::default();
        args.add(id).map_err(arg_encode_error)?;
        let mut conn = self._db.acquire().await?;
        let stmt = conn.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let maybe_row = exec.fetch_optional(query).await?;
        maybe_row
            .map(|row| CustomerModel::try_from(CustomerRow(row)))
            .transpose()
    }

    async fn save(&self, items: Vec<CustomerModel>) -> DefaultResult<(), AppError> {
        if items.is_empty() {
            return Ok(());
        }
        for c in items.iter() {
            c.validate()?;
        }
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;

        let (sql_patt, args) = <(String, MySqlArguments)>::try_from(FetchPhoneOwnerArg(&items))?;
        let stmt = tx.prepare(sql_patt.as_str()).await?;
        let query = stmt.query_with(args);
        let exec = &mut *tx;
        let rows = exec.fetch_all(query).await?;
        let taken = rows
            .iter()
            .map(|row| -> DefaultResult<(String, u32), AppError> {
                let phone = row.try_get::<String, usize>(0)?;
                let owner = row.try_get::<u32, usize>(1)?;
                Ok((phone, owner))
            })
            .collect::<DefaultResult<Vec<_>, _>>()?;
        CustomerModel::check_phone_unique(items.as_slice(), taken)?;

        let (sql_patt, args) = <(String, MySqlArguments)>::try_from(UpsertArg(&items))?;
        let _rs = run_query_once(&mut tx, sql_patt, args, None).await?;
        tx.commit().await?;
        Ok(())
    }
}
