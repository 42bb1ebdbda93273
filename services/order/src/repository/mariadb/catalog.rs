use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Arguments, Connection, Executor, Row, Statement};

use crate::datastore::AppMariaDbStore;
use crate::error::AppError;
use crate::model::ProductModel;
use crate::repository::AbsCatalogStore;

use super::{arg_encode_error, first_db_server, run_query_once};

struct UpsertArg<'a>(&'a [ProductModel]);
struct ProductRow(MySqlRow);

impl TryFrom<UpsertArg<'_>> for (String, MySqlArguments) {
    type Error = AppError;
    fn try_from(value: UpsertArg<'_>) -> DefaultResult<Self, Self::Error> {
        let items = (0..value.0.len())
            .map(|_| "(?,?,?,?)")
            .collect::<Vec<_>>()
            .join(",");
        let patt = format!(
            "INSERT INTO `catalog_product`(`id`,`name`,`price`,`quantity`) VALUES {items} \
             ON DUPLICATE KEY UPDATE `name`=VALUE(`name`),`price`=VALUE(`price`),\
             `quantity`=VALUE(`quantity`)"
        );
        let mut args = MySqlArguments::default();
        for item in value.0 {
            args.add(item.id).map_err(arg_encode_error)?;
            args.add(item.name.clone()).map_err(arg_encode_error)?;
            args.add(item.price).map_err(arg_encode_error)?;
            args.add(item.available).map_err(arg_encode_error)?;
        }
        Ok((patt, args))
    }
}

impl TryFrom<ProductRow> for ProductModel {
    type Error = AppError;
    fn try_from(value: ProductRow) -> DefaultResult<Self, Self::Error> {
        let row = value.0;
        Ok(Self {
            id: row.try_get::<u64, usize>(0)?,
            name: row.try_get::<String, usize>(1)?,
            price: row.try_get::<Decimal, usize>(2)?,
            available: row.try_get::<u32, usize>(3)?,
        })
    }
}

pub(crate) struct CatalogMariaDbStore {
    _db: Arc<AppMariaDbStore>,
}

impl CatalogMariaDbStore {
    pub(crate) fn new(dbs: Vec<Arc<AppMariaDbStore>>) -> DefaultResult<Self, AppError> {
        let _db = first_db_server(dbs)?;
        Ok(Self { _db })
    }
}

#[async_trait]
impl AbsCatalogStore for CatalogMariaDbStore {
    async fn get_product(&self, pid: u64) -> DefaultResult<Option<ProductModel>, AppError> {
        let sql_patt = "SELECT `id`,`name`,`price`,`quantity` FROM `catalog_product` WHERE `id`=?";
        let mut args = MySqlArguments::default();
        args.add(pid).map_err(arg_encode_error)?;
        let mut conn = self._db.acquire().await?;
        let stmt = conn.prepare(sql_patt).await?;
        let query = stmt.query_with(args);
        let exec = conn.as_mut();
        let maybe_row = exec.fetch_optional(query).await?;
        maybe_row
            .map(|row| ProductModel::try_from(ProductRow(row)))
            .transpose()
    }

    async fn save(&self, items: Vec<ProductModel>) -> DefaultResult<(), AppError> {
        if items.is_empty() {
            return Ok(());
        }
        let (sql_patt, args) = <(String, MySqlArguments)>::try_from(UpsertArg(&items))?;
        let mut conn = self._db.acquire().await?;
        let mut tx = conn.begin().await?;
        // an updated row counts as 2 affected rows in MariaDB, skip the check
        let _rs = run_query_once(&mut tx, sql_patt, args, None).await?;
        tx.commit().await?;
        Ok(())
    }
}
