use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use chrono::Local as LocalTime;
use tokio::runtime::Builder as RuntimeBuilder;

use mrmilk_common::confidentiality::{self, AbstractConfidentiality};
use mrmilk_common::constant::env_vars::EXPECTED_LABELS;
use mrmilk_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use mrmilk_order::constant::hard_limit;
use mrmilk_order::error::AppError;
use mrmilk_order::repository::{
    app_repo_catalog, app_repo_identity, app_repo_order, app_repo_subscription,
};
use mrmilk_order::usecase::{PlaceOrderUseCase, RunDailyTickUseCase};
use mrmilk_order::{AppCfgHardLimit, AppCfgInitArgs, AppConfig, AppSharedState};

async fn run_once(
    cfg: AppConfig,
    logctx: Arc<AppLogContext>,
    confidential: Box<dyn AbstractConfidentiality>,
) -> Result<(), Vec<AppError>> {
    let shr_state = AppSharedState::new(cfg, logctx.clone(), confidential);
    let ds = shr_state.datastore();
    let repo_sub = app_repo_subscription(ds.clone()).await.map_err(|e| vec![e])?;
    let repo_order = app_repo_order(ds.clone()).await.map_err(|e| vec![e])?;
    let repo_catalog = app_repo_catalog(ds.clone()).await.map_err(|e| vec![e])?;
    let repo_identity = app_repo_identity(ds).await.map_err(|e| vec![e])?;
    let place_order = PlaceOrderUseCase {
        repo_order: Arc::new(repo_order),
        repo_catalog: Arc::new(repo_catalog),
        repo_identity: Arc::new(repo_identity),
        logctx: logctx.clone(),
    };
    let uc = RunDailyTickUseCase {
        repo_sub: Arc::new(repo_sub),
        place_order,
        logctx: logctx.clone(),
    };
    let today = LocalTime::now().date_naive();
    let report = uc.execute(today).await?;
    match serde_json::to_string(&report) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::WARNING, "report-serialize-fail, {e}");
        }
    }
    Ok(())
}

fn main() {
    let iter = env::vars().filter(|(k, _v)| EXPECTED_LABELS.contains(&k.as_str()));
    let args = AppCfgInitArgs {
        env_var_map: HashMap::from_iter(iter),
        limit: AppCfgHardLimit {
            nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
            num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
            seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
        },
    };
    let cfg = match AppConfig::new(args) {
        Ok(v) => v,
        Err(e) => {
            println!("app failed to configure, {e}");
            return;
        }
    };
    let confidential = match confidentiality::build_context(&cfg) {
        Ok(v) => v,
        Err(e) => {
            println!("app failed to init confidentiality handler, {e}");
            return;
        }
    };
    let logctx = Arc::new(AppLogContext::new(&cfg.basepath, &cfg.api_server.logging));
    // a single batch, subscriptions are still processed concurrently as tasks
    let result = RuntimeBuilder::new_current_thread()
        .enable_io()
        .enable_time()
        .build();
    match result {
        Ok(rt) => {
            if let Err(errors) = rt.block_on(run_once(cfg, logctx.clone(), confidential)) {
                app_log_event!(logctx, AppLogLevel::ERROR, "daily tick aborted, {:?}", errors);
            }
        }
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "async runtime failed to build, {e}");
        }
    }
} // end of fn main
