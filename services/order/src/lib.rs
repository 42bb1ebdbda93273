use std::sync::Arc;

use uuid::{Builder, NoContext, Timestamp, Uuid};

use mrmilk_common::confidentiality::AbstractConfidentiality;
use mrmilk_common::logging::AppLogContext;

pub mod adapter;
pub mod api;
pub mod constant;
pub mod error;
pub mod model;
pub mod network;
pub mod repository;
pub mod usecase;

pub use adapter::datastore;
pub use mrmilk_common::config::{
    ApiServerCfg, AppBasepathCfg, AppCfgHardLimit, AppCfgInitArgs, AppConfig, AppInMemoryDbCfg,
    WebApiListenCfg, WebApiRouteCfg,
};

type WebApiHdlrLabel = &'static str;

pub struct AppDataStoreContext {
    pub in_mem: Option<Arc<Box<dyn datastore::AbstInMemoryDStore>>>,
    pub sql_dbs: Option<Vec<Arc<datastore::AppMariaDbStore>>>,
}

// global state shared by all threads
#[derive(Clone)]
pub struct AppSharedState {
    _cfg: Arc<AppConfig>,
    _log: Arc<AppLogContext>,
    dstore: Arc<AppDataStoreContext>,
}

impl AppSharedState {
    /// database pools are built lazily, this has to be called within a
    /// tokio runtime context
    pub fn new(
        cfg: AppConfig,
        log: Arc<AppLogContext>,
        confidential: Box<dyn AbstractConfidentiality>,
    ) -> Self {
        let confidential = Arc::new(confidential);
        let (in_mem, sql_dbs) =
            datastore::build_context(log.clone(), &cfg.api_server.data_store, confidential);
        let in_mem = in_mem.map(Arc::new);
        let sql_dbs = sql_dbs.map(|m| m.into_iter().map(Arc::new).collect());
        let ds_ctx = Arc::new(AppDataStoreContext { in_mem, sql_dbs });
        Self {
            _cfg: Arc::new(cfg),
            _log: log,
            dstore: ds_ctx,
        }
    } // end of fn new

    pub fn config(&self) -> &Arc<AppConfig> {
        &self._cfg
    }

    pub fn log_context(&self) -> &Arc<AppLogContext> {
        &self._log
    }

    pub fn datastore(&self) -> Arc<AppDataStoreContext> {
        self.dstore.clone()
    }
} // end of impl AppSharedState

/// Identifiers of orders and subscriptions are UUIDv8, the first octet of the
/// node part carries the machine code so identifiers generated by different
/// nodes never collide, the rest is unix timestamp and random bytes.
pub(crate) fn generate_custom_uid(machine_code: u8) -> Uuid {
    let (secs, nano) = Timestamp::now(NoContext).to_unix();
    let millis = (secs * 1000).saturating_add((nano as u64) / 1_000_000);
    let mut node_id = rand::random::<[u8; 10]>();
    node_id[0] = machine_code;
    Builder::from_unix_timestamp_millis(millis, &node_id).into_uuid()
}

pub(crate) fn generate_hex_uid(machine_code: u8) -> String {
    let uid = generate_custom_uid(machine_code);
    mrmilk_common::util::octet_to_hex(uid.as_bytes())
}
