use std::boxed::Box;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use tokio::runtime::Builder as RuntimeBuilder;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use mrmilk_common::confidentiality::{self, AbstractConfidentiality};
use mrmilk_common::constant::env_vars::EXPECTED_LABELS;
use mrmilk_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use mrmilk_order::api::web::route_table;
use mrmilk_order::constant::hard_limit;
use mrmilk_order::network::{app_web_service, middleware, net_listener};
use mrmilk_order::{AppCfgHardLimit, AppCfgInitArgs, AppConfig, AppSharedState};

async fn shutdown_signal() {
    // the server keeps running if the signal handler cannot be installed
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn start_server(shr_state: AppSharedState) {
    let log_ctx_p = shr_state.log_context().clone();
    let cfg = shr_state.config().clone();
    let listener = &cfg.api_server.listen;
    let (router, num_applied) = app_web_service(listener, route_table(), shr_state);
    if num_applied == 0 {
        app_log_event!(
            log_ctx_p,
            AppLogLevel::ERROR,
            "no route created, web API server failed to start"
        );
        return;
    }
    let tcp_listener = match net_listener(listener.host.clone(), listener.port).await {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(log_ctx_p, AppLogLevel::ERROR, "API server failed to start, {e}");
            return;
        }
    };
    let cors_path = cfg.basepath.system.clone() + listener.cors.as_str();
    let co = match middleware::cors(cors_path) {
        Ok(v) => v,
        Err(e) => {
            app_log_event!(log_ctx_p, AppLogLevel::ERROR, "cors layer init error, {e}");
            CorsLayer::new()
        }
    };
    let middlewares = ServiceBuilder::new()
        .layer(middleware::concurrency_limit(listener.max_connections))
        .layer(middleware::req_body_limit(
            cfg.api_server.limit_req_body_in_bytes,
        ))
        .layer(co);
    let router = router.layer(middlewares);
    app_log_event!(
        log_ctx_p,
        AppLogLevel::INFO,
        "API server listening, host:{}, port:{}, num-routes:{num_applied}",
        listener.host,
        listener.port
    );
    let result = axum::serve(tcp_listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = result {
        app_log_event!(log_ctx_p, AppLogLevel::ERROR, "API server error, {e}");
    }
    app_log_event!(log_ctx_p, AppLogLevel::WARNING, "API server terminating");
} // end of fn start_server

fn start_async_runtime(cfg: AppConfig, confidential: Box<dyn AbstractConfidentiality>) {
    let log_ctx = Arc::new(AppLogContext::new(&cfg.basepath, &cfg.api_server.logging));
    let log_ctx1 = log_ctx.clone();
    let log_ctx2 = log_ctx.clone();
    let stack_nbytes: usize = (cfg.api_server.stack_sz_kb as usize) << 10;
    let result = RuntimeBuilder::new_multi_thread()
        .worker_threads(cfg.api_server.num_workers as usize)
        .on_thread_start(move || {
            // this closure is invoked by each new worker thread
            let log_cpy = log_ctx1.clone();
            app_log_event!(log_cpy, AppLogLevel::INFO, "[API server] worker started");
        })
        .on_thread_stop(move || {
            let log_cpy = log_ctx2.clone();
            app_log_event!(log_cpy, AppLogLevel::INFO, "[API server] worker terminating");
        })
        .thread_stack_size(stack_nbytes)
        .thread_name("web-api-worker")
        .enable_io()
        // idle connections in the database pool are reaped by timer
        .enable_time()
        .build();
    match result {
        Ok(rt) => {
            rt.block_on(async move {
                let shr_state = AppSharedState::new(cfg, log_ctx, confidential);
                start_server(shr_state).await;
            });
        }
        Err(e) => {
            app_log_event!(log_ctx, AppLogLevel::ERROR, "async runtime failed to build, {e}");
        }
    };
} // end of fn start_async_runtime

fn main() {
    let iter = env::vars().filter(|(k, _v)| EXPECTED_LABELS.contains(&k.as_str()));
    let env_var_map = HashMap::from_iter(iter);
    let args = AppCfgInitArgs {
        env_var_map,
        limit: AppCfgHardLimit {
            nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
            num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
            seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
        },
    };
    match AppConfig::new(args) {
        Ok(cfg) => match confidentiality::build_context(&cfg) {
            Ok(confidential) => start_async_runtime(cfg, confidential),
            Err(e) => {
                println!("app failed to init confidentiality handler, {e}");
            }
        },
        Err(e) => {
            println!("app failed to configure, {e}");
        }
    };
} // end of fn main
