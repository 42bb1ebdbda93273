pub(super) mod catalog;
pub(super) mod identity;
pub(super) mod order;
pub(super) mod subscription;

use std::io::ErrorKind;
use std::ops::DerefMut;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use sqlx::error::{BoxDynError, Error};
use sqlx::mysql::{MySqlArguments, MySqlQueryResult, MySqlRow};
use sqlx::{Executor, MySql, Row, Statement, Transaction};

use mrmilk_common::adapter::repository::UidBytes;

use crate::datastore::AppMariaDbStore;
use crate::error::{AppError, AppErrorCode};

impl From<Error> for AppError {
    fn from(value: Error) -> Self {
        let (code, detail) = match value {
            Error::Configuration(e) => (
                AppErrorCode::InvalidInput,
                e.to_string() + " invalid-db-config",
            ),
            Error::Io(e) => (
                AppErrorCode::IOerror(e.kind()),
                e.to_string() + " io-err-mariadb",
            ),
            Error::Database(e) => (AppErrorCode::RemoteDbServerFailure, e.to_string()),
            Error::Protocol(errmsg) => (AppErrorCode::IOerror(ErrorKind::InvalidData), errmsg),
            Error::Decode(e) => (AppErrorCode::DataCorruption, e.to_string()),
            Error::ColumnDecode { index, source } => (
                AppErrorCode::DataCorruption,
                format!("{source}, column-idx:{index}"),
            ),
            Error::TypeNotFound { type_name } => {
                (AppErrorCode::InvalidInput, type_name + " wrong-col-typ")
            }
            Error::ColumnNotFound(col_name) => (
                AppErrorCode::IOerror(ErrorKind::NotFound),
                col_name + " no-col",
            ),
            Error::RowNotFound => (
                AppErrorCode::IOerror(ErrorKind::NotFound),
                "no-row".to_string(),
            ),
            Error::ColumnIndexOutOfBounds { index, len } => (
                AppErrorCode::InvalidInput,
                format!("req-idx:{index}, limit:{len}"),
            ),
            Error::PoolTimedOut => (AppErrorCode::DatabaseServerBusy, "no-conn-avail".to_string()),
            Error::PoolClosed => (AppErrorCode::Unknown, "pool-closed".to_string()),
            Error::WorkerCrashed => (
                AppErrorCode::Unknown,
                "low-level-db-worker-crashed".to_string(),
            ),
            _others => (
                AppErrorCode::Unknown,
                "internal-implementation-issue".to_string(),
            ),
        };
        Self {
            code,
            detail: Some(detail),
        }
    } // end of fn from
} // end of impl AppError

// failure on encoding a query argument
fn arg_encode_error(e: BoxDynError) -> AppError {
    AppError {
        code: AppErrorCode::InvalidInput,
        detail: Some(format!("sql-arg-encode, {e}")),
    }
}

fn uid_column(value: &str) -> DefaultResult<Vec<u8>, AppError> {
    let out = UidBytes::try_from(value)?;
    Ok(out.as_column())
}

fn to_app_uid(row: &MySqlRow, idx: usize) -> DefaultResult<String, AppError> {
    let raw = row.try_get::<Vec<u8>, usize>(idx)?;
    let out = UidBytes::to_app_uid(raw)?;
    Ok(out)
}

// current version always picks the first database server in the config
fn first_db_server(
    dbs: Vec<Arc<AppMariaDbStore>>,
) -> DefaultResult<Arc<AppMariaDbStore>, AppError> {
    dbs.into_iter().next().ok_or_else(|| AppError {
        code: AppErrorCode::MissingDataStore,
        detail: Some("mariadb".to_string()),
    })
}

async fn run_query_once(
    tx: &mut Transaction<'_, MySql>,
    sql_patt: String,
    args: MySqlArguments,
    maybe_num_batch: Option<usize>,
) -> DefaultResult<MySqlQueryResult, AppError> {
    let stmt = tx.prepare(sql_patt.as_str()).await?;
    let query = stmt.query_with(args);
    let exec = tx.deref_mut();
    let resultset = query.execute(exec).await?;
    if let Some(num_batch) = maybe_num_batch {
        let num_affected = resultset.rows_affected() as usize;
        if num_affected == num_batch {
            Ok(resultset)
        } else {
            let detail = format!("num_affected, actual:{num_affected}, expect:{num_batch}");
            Err(AppError {
                code: AppErrorCode::DataCorruption,
                detail: Some(detail),
            })
        }
    } else {
        Ok(resultset)
    }
}
