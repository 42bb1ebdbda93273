mod in_mem;
mod sql_db;

use std::boxed::Box;
use std::sync::Arc;

use mrmilk_common::confidentiality::AbstractConfidentiality;
use mrmilk_common::config::AppDataStoreCfg;
use mrmilk_common::logging::{app_log_event, AppLogContext, AppLogLevel};

pub use in_mem::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemDstoreLock,
    AppInMemFetchKeys, AppInMemFetchedData, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
    AppInMemUpdateData, AppInMemoryDStore,
};
pub use sql_db::AppMariaDbStore;

pub(crate) fn build_context(
    logctx: Arc<AppLogContext>,
    cfg: &[AppDataStoreCfg],
    confidential: Arc<Box<dyn AbstractConfidentiality>>,
) -> (
    Option<Box<dyn AbstInMemoryDStore>>,
    Option<Vec<AppMariaDbStore>>,
) {
    let mut inmem = None;
    let mut sqldb: Option<Vec<AppMariaDbStore>> = None;
    for c in cfg {
        match c {
            AppDataStoreCfg::InMemory(d) => {
                let item: Box<dyn AbstInMemoryDStore> = Box::new(AppInMemoryDStore::new(d));
                inmem = Some(item);
            }
            AppDataStoreCfg::DbServer(d) => {
                let lst = sqldb.get_or_insert_with(Vec::new);
                match AppMariaDbStore::try_build(d, confidential.clone()) {
                    Ok(item) => {
                        lst.push(item);
                    }
                    Err(e) => {
                        app_log_event!(logctx, AppLogLevel::ERROR, "alias:{}, {}", d.alias, e);
                    }
                }
            }
        }
    }
    (inmem, sqldb)
} // end of fn build_context
