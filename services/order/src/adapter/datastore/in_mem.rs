use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{AppError, AppErrorCode};
use crate::AppInMemoryDbCfg;

// Application callers are responsible to maintain the structure of each row
// in each table. Each element of a row is stringified regardless of its
// original type (integer, decimal, date-time)
type InnerRow = Vec<String>;
type InnerTable = HashMap<String, InnerRow>;
type AllTable = HashMap<String, InnerTable>;

pub type AppInMemUpdateData = AllTable;
pub type AppInMemFetchKeys = HashMap<String, Vec<String>>; // list of IDs per table
pub type AppInMemFetchedData = AllTable;
pub type AppInMemFetchedSingleTable = InnerTable;
pub type AppInMemFetchedSingleRow = InnerRow;
pub type AppInMemDstoreLock = OwnedMutexGuard<AllTable>;

pub trait AbsDStoreFilterKeyOp: Send + Sync {
    fn filter(&self, k: &str, v: &[String]) -> bool;
}

#[async_trait]
pub trait AbstInMemoryDStore: Send + Sync {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError>;

    /// write all the rows, across several tables, in one go. Nothing is
    /// written if any of the tables does not exist or any of them would
    /// exceed its capacity.
    async fn save(&self, data: AppInMemUpdateData) -> DefaultResult<usize, AppError>;

    async fn fetch(&self, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError>;

    /// fetch rows then keep the entire store locked, until the caller hands
    /// the lock back through `save_release()` or simply drops it.
    async fn fetch_acquire(
        &self,
        info: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError>;

    fn save_release(
        &self,
        data: AppInMemUpdateData,
        lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError>;

    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError>;
}

pub struct AppInMemoryDStore {
    max_items_per_table: u32,
    table_map: Arc<Mutex<AllTable>>,
}

impl AppInMemoryDStore {
    pub fn new(cfg: &AppInMemoryDbCfg) -> Self {
        Self {
            table_map: Arc::new(Mutex::new(HashMap::new())),
            max_items_per_table: cfg.max_items,
        }
    }

    fn check_table_existence<'a, I>(map: &AllTable, mut labels: I) -> DefaultResult<(), AppError>
    where
        I: Iterator<Item = &'a String>,
    {
        if let Some(label) = labels.find(|label| !map.contains_key(label.as_str())) {
            Err(AppError {
                detail: Some(label.clone()),
                code: AppErrorCode::DataTableNotExist,
            })
        } else {
            Ok(())
        }
    }

    fn check_capacity(&self, map: &AllTable, data: &AllTable) -> DefaultResult<(), AppError> {
        let limit = self.max_items_per_table as usize;
        let exceeded = data.iter().find(|(label, rows)| {
            let table = &map[label.as_str()];
            let num_new = rows.keys().filter(|k| !table.contains_key(k.as_str())).count();
            (table.len() + num_new) > limit
        });
        if let Some((label, _)) = exceeded {
            let msg = format!("table:{label}, limit:{limit}");
            Err(AppError {
                detail: Some(msg),
                code: AppErrorCode::ExceedingMaxLimit,
            })
        } else {
            Ok(())
        }
    }

    fn save_locked(&self, map: &mut AllTable, data: AllTable) -> DefaultResult<usize, AppError> {
        Self::check_table_existence(map, data.keys())?;
        self.check_capacity(map, &data)?;
        let mut tot_cnt = 0usize;
        for (label, rows) in data {
            if let Some(table) = map.get_mut(label.as_str()) {
                tot_cnt += rows.len();
                table.extend(rows);
            }
        }
        Ok(tot_cnt)
    }

    fn fetch_locked(map: &AllTable, info: AppInMemFetchKeys) -> DefaultResult<AllTable, AppError> {
        Self::check_table_existence(map, info.keys())?;
        let out = info
            .into_iter()
            .map(|(label, ids)| {
                let table = &map[label.as_str()];
                let rows = ids
                    .into_iter()
                    .filter_map(|id| table.get(id.as_str()).map(|row| (id, row.clone())))
                    .collect::<InnerTable>();
                (label, rows)
            })
            .collect();
        Ok(out)
    }
} // end of impl AppInMemoryDStore

#[async_trait]
impl AbstInMemoryDStore for AppInMemoryDStore {
    async fn create_table(&self, label: &str) -> DefaultResult<(), AppError> {
        let mut map = self.table_map.lock().await;
        map.entry(label.to_string()).or_default();
        Ok(())
    }

    async fn save(&self, data: AppInMemUpdateData) -> DefaultResult<usize, AppError> {
        let mut map = self.table_map.lock().await;
        self.save_locked(&mut map, data)
    }

    async fn fetch(&self, info: AppInMemFetchKeys) -> DefaultResult<AppInMemFetchedData, AppError> {
        let map = self.table_map.lock().await;
        Self::fetch_locked(&map, info)
    }

    async fn fetch_acquire(
        &self,
        info: AppInMemFetchKeys,
    ) -> DefaultResult<(AppInMemFetchedData, AppInMemDstoreLock), AppError> {
        let guard = self.table_map.clone().lock_owned().await;
        let fetched = Self::fetch_locked(&guard, info)?;
        Ok((fetched, guard))
    }

    fn save_release(
        &self,
        data: AppInMemUpdateData,
        mut lock: AppInMemDstoreLock,
    ) -> DefaultResult<usize, AppError> {
        // the lock is released when the guard goes out of scope
        self.save_locked(&mut lock, data)
    }

    async fn filter_keys(
        &self,
        tbl_label: String,
        op: &dyn AbsDStoreFilterKeyOp,
    ) -> DefaultResult<Vec<String>, AppError> {
        let map = self.table_map.lock().await;
        let table = map.get(tbl_label.as_str()).ok_or(AppError {
            detail: Some(tbl_label.clone()),
            code: AppErrorCode::DataTableNotExist,
        })?;
        let keys = table
            .iter()
            .filter(|(k, v)| op.filter(k.as_str(), v.as_slice()))
            .map(|(k, _v)| k.clone())
            .collect();
        Ok(keys)
    }
} // end of impl AbstInMemoryDStore for AppInMemoryDStore
