use std::sync::Arc;

use axum::debug_handler;
use axum::extract::State as ExtractState;
use axum::http::StatusCode as HttpStatusCode;
use axum::response::IntoResponse;
use chrono::Local as LocalTime;

use mrmilk_common::logging::{app_log_event, AppLogLevel};

use crate::api::web::dto::{SubscriptionCreateReqDto, SubscriptionDto, SubscriptionTickReqDto};
use crate::repository::{
    app_repo_catalog, app_repo_identity, app_repo_order, app_repo_subscription,
};
use crate::usecase::{
    CreateSubscriptionUsKsErr, CreateSubscriptionUseCase, PlaceOrderUseCase, RunDailyTickUseCase,
};
use crate::AppSharedState;

use super::{internal_error, json_response, serialize_body, ReqJson};

#[debug_handler(state = AppSharedState)]
pub(super) async fn create_handler(
    ExtractState(appstate): ExtractState<AppSharedState>,
    ReqJson(req_body): ReqJson<SubscriptionCreateReqDto>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let results = (
        app_repo_subscription(ds.clone()).await,
        app_repo_catalog(ds.clone()).await,
        app_repo_identity(ds).await,
    );
    let (status, body) = match results {
        (Ok(repo_sub), Ok(repo_catalog), Ok(repo_identity)) => {
            let uc = CreateSubscriptionUseCase {
                repo_sub,
                repo_catalog,
                repo_identity,
                logctx: logctx.clone(),
            };
            match uc.execute(req_body).await {
                Ok(sub) => serialize_body(HttpStatusCode::CREATED, &SubscriptionDto::from(&sub)),
                Err(CreateSubscriptionUsKsErr::ReqContent(e)) => {
                    serialize_body(HttpStatusCode::BAD_REQUEST, &e)
                }
                Err(CreateSubscriptionUsKsErr::Server(_errors)) => internal_error(),
            }
        }
        (r_sub, r_catalog, r_identity) => {
            let errmsgs = [r_sub.err(), r_catalog.err(), r_identity.err()]
                .into_iter()
                .flatten()
                .map(|e| e.to_string())
                .collect::<Vec<_>>();
            app_log_event!(
                logctx,
                AppLogLevel::ERROR,
                "repository init failure, reason: {:?}",
                errmsgs
            );
            internal_error()
        }
    };
    json_response(status, body)
} // end of fn create_handler

/// entry for external scheduler, the date defaults to today in local time
#[debug_handler(state = AppSharedState)]
pub(super) async fn tick_handler(
    ExtractState(appstate): ExtractState<AppSharedState>,
    ReqJson(req_body): ReqJson<SubscriptionTickReqDto>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let date = req_body
        .date
        .unwrap_or_else(|| LocalTime::now().date_naive());
    let ds = appstate.datastore();
    let results = (
        app_repo_subscription(ds.clone()).await,
        app_repo_order(ds.clone()).await,
        app_repo_catalog(ds.clone()).await,
        app_repo_identity(ds).await,
    );
    let (status, body) = match results {
        (Ok(repo_sub), Ok(repo_order), Ok(repo_catalog), Ok(repo_identity)) => {
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
            match uc.execute(date).await {
                Ok(report) => serialize_body(HttpStatusCode::OK, &report),
                Err(_errors) => internal_error(),
            }
        }
        (r_sub, r_order, r_catalog, r_identity) => {
            let errmsgs = [
                r_sub.err().map(|e| e.to_string()),
                r_order.err().map(|e| e.to_string()),
                r_catalog.err().map(|e| e.to_string()),
                r_identity.err().map(|e| e.to_string()),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
            app_log_event!(
                logctx,
                AppLogLevel::ERROR,
                "repository init failure, reason: {:?}",
                errmsgs
            );
            internal_error()
        }
    };
    json_response(status, body)
} // end of fn tick_handler
