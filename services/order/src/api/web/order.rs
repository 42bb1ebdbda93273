use std::sync::Arc;

use axum::debug_handler;
use axum::extract::{Path as ExtractPath, State as ExtractState};
use axum::http::StatusCode as HttpStatusCode;
use axum::response::IntoResponse;

use mrmilk_common::logging::{app_log_event, AppLogLevel};

use crate::api::web::dto::{
    OrderCreateReqData, OrderDetailRespDto, OrderHeaderDto, OrderStatusReqDto,
};
use crate::repository::{app_repo_catalog, app_repo_identity, app_repo_order};
use crate::usecase::{
    AdvanceOrderStatusUsKsErr, AdvanceOrderStatusUseCase, FetchOrderUsKsErr, FetchOrderUseCase,
    ListCustomerOrdersUseCase, PlaceOrderUsKsErr, PlaceOrderUseCase,
};
use crate::AppSharedState;

use super::{internal_error, json_response, serialize_body, ReqJson};

// always to specify state type explicitly to the debug macro
#[debug_handler(state = AppSharedState)]
pub(super) async fn place_handler(
    ExtractState(appstate): ExtractState<AppSharedState>,
    ReqJson(req_body): ReqJson<OrderCreateReqData>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let ds = appstate.datastore();
    let results = (
        app_repo_order(ds.clone()).await,
        app_repo_catalog(ds.clone()).await,
        app_repo_identity(ds).await,
    );
    let (status, body) = match results {
        (Ok(repo_order), Ok(repo_catalog), Ok(repo_identity)) => {
            let uc = PlaceOrderUseCase {
                repo_order: Arc::new(repo_order),
                repo_catalog: Arc::new(repo_catalog),
                repo_identity: Arc::new(repo_identity),
                logctx: logctx.clone(),
            };
            match uc.execute(req_body).await {
                Ok(ms) => {
                    let value = OrderDetailRespDto::from(&ms);
                    serialize_body(HttpStatusCode::CREATED, &value)
                }
                Err(PlaceOrderUsKsErr::ReqContent(e)) => {
                    serialize_body(HttpStatusCode::BAD_REQUEST, &e)
                }
                // already logged in the use case
                Err(PlaceOrderUsKsErr::Server(_errors)) => internal_error(),
            }
        }
        (r_order, r_catalog, r_identity) => {
            let errmsgs = [r_order.err(), r_catalog.err(), r_identity.err()]
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
} // end of fn place_handler

#[debug_handler(state = AppSharedState)]
pub(super) async fn fetch_handler(
    ExtractPath(oid): ExtractPath<String>,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let (status, body) = match app_repo_order(appstate.datastore()).await {
        Ok(repo) => {
            let uc = FetchOrderUseCase {
                repo,
                logctx: logctx.clone(),
            };
            match uc.execute(oid).await {
                Ok(ms) => {
                    let value = OrderDetailRespDto::from(&ms);
                    serialize_body(HttpStatusCode::OK, &value)
                }
                Err(FetchOrderUsKsErr::NotExist) => (
                    HttpStatusCode::NOT_FOUND,
                    r#"{"reason":"OrderNotExist"}"#.to_string(),
                ),
                Err(FetchOrderUsKsErr::Server(_errors)) => internal_error(),
            }
        }
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "repository init failure, {e}");
            internal_error()
        }
    };
    json_response(status, body)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn advance_status_handler(
    ExtractPath(oid): ExtractPath<String>,
    ExtractState(appstate): ExtractState<AppSharedState>,
    ReqJson(req_body): ReqJson<OrderStatusReqDto>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let (status, body) = match app_repo_order(appstate.datastore()).await {
        Ok(repo) => {
            let uc = AdvanceOrderStatusUseCase {
                repo,
                logctx: logctx.clone(),
            };
            match uc.execute(oid, req_body).await {
                Ok(header) => {
                    let value = OrderHeaderDto::from(&header);
                    serialize_body(HttpStatusCode::OK, &value)
                }
                Err(AdvanceOrderStatusUsKsErr::NotExist(e)) => {
                    serialize_body(HttpStatusCode::NOT_FOUND, &e)
                }
                Err(AdvanceOrderStatusUsKsErr::ReqContent(e)) => {
                    serialize_body(HttpStatusCode::CONFLICT, &e)
                }
                Err(AdvanceOrderStatusUsKsErr::Server(_errors)) => internal_error(),
            }
        }
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "repository init failure, {e}");
            internal_error()
        }
    };
    json_response(status, body)
}

#[debug_handler(state = AppSharedState)]
pub(super) async fn list_by_customer_handler(
    ExtractPath(customer_id): ExtractPath<u32>,
    ExtractState(appstate): ExtractState<AppSharedState>,
) -> impl IntoResponse {
    let logctx = appstate.log_context().clone();
    let (status, body) = match app_repo_order(appstate.datastore()).await {
        Ok(repo) => {
            let uc = ListCustomerOrdersUseCase {
                repo,
                logctx: logctx.clone(),
            };
            match uc.execute(customer_id).await {
                Ok(headers) => {
                    let value = headers.iter().map(OrderHeaderDto::from).collect::<Vec<_>>();
                    serialize_body(HttpStatusCode::OK, &value)
                }
                Err(_e) => internal_error(),
            }
        }
        Err(e) => {
            app_log_event!(logctx, AppLogLevel::ERROR, "repository init failure, {e}");
            internal_error()
        }
    };
    json_response(status, body)
}
