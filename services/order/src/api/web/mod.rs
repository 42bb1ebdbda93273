use std::collections::HashMap;
use std::result::Result as DefaultResult;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json as ExtractJson, Request};
use axum::http::{
    header as HttpHeader, HeaderMap as HttpHeaderMap, HeaderValue as HttpHeaderValue,
    StatusCode as HttpStatusCode,
};
use axum::routing::{get, patch, post, MethodRouter};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constant::api::web as WebConst;
use crate::constant::HTTP_CONTENT_TYPE_JSON;
use crate::{AppSharedState, WebApiHdlrLabel};
use dto::{ReqBodyErrorDto, ReqBodyErrorReason};

pub mod dto;
mod order;
mod subscription;

pub type ApiRouteType = MethodRouter<AppSharedState>;
pub type ApiRouteTableType = HashMap<WebApiHdlrLabel, ApiRouteType>;

pub fn route_table() -> ApiRouteTableType {
    let mut out: ApiRouteTableType = HashMap::new();
    out.insert(WebConst::PLACE_NEW_ORDER, post(order::place_handler));
    out.insert(WebConst::ACCESS_EXISTING_ORDER, get(order::fetch_handler));
    out.insert(
        WebConst::ADVANCE_ORDER_STATUS,
        patch(order::advance_status_handler),
    );
    out.insert(
        WebConst::LIST_CUSTOMER_ORDERS,
        get(order::list_by_customer_handler),
    );
    out.insert(
        WebConst::CREATE_SUBSCRIPTION,
        post(subscription::create_handler),
    );
    out.insert(
        WebConst::RUN_SUBSCRIPTION_TICK,
        post(subscription::tick_handler),
    );
    out
}

type JsonRespType = (HttpStatusCode, HttpHeaderMap, String);

const INTERNAL_ERROR_BODY: &str = r#"{"reason":"internal-error"}"#;

fn json_response(status: HttpStatusCode, body: String) -> JsonRespType {
    let ctype = HttpHeaderValue::from_static(HTTP_CONTENT_TYPE_JSON);
    let hdr_map = HttpHeaderMap::from_iter([(HttpHeader::CONTENT_TYPE, ctype)]);
    (status, hdr_map, body)
}

fn internal_error() -> (HttpStatusCode, String) {
    (
        HttpStatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_ERROR_BODY.to_string(),
    )
}

fn serialize_body<T: Serialize>(status: HttpStatusCode, value: &T) -> (HttpStatusCode, String) {
    match serde_json::to_string(value) {
        Ok(s) => (status, s),
        Err(_e) => (
            HttpStatusCode::INTERNAL_SERVER_ERROR,
            r#"{"reason":"serialization-failure"}"#.to_string(),
        ),
    }
}

/// JSON body extractor, a body that cannot be decoded is reported in the same
/// `{reason, ...}` shape as other client errors instead of plain text.
pub(super) struct ReqJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ReqJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = JsonRespType;

    async fn from_request(req: Request, state: &S) -> DefaultResult<Self, Self::Rejection> {
        match ExtractJson::<T>::from_request(req, state).await {
            Ok(ExtractJson(value)) => Ok(Self(value)),
            Err(e) => {
                let (status, body) = req_body_error(e);
                Err(json_response(status, body))
            }
        }
    }
}

fn req_body_error(e: JsonRejection) -> (HttpStatusCode, String) {
    let (status, reason) = match e {
        JsonRejection::MissingJsonContentType(_) => (
            HttpStatusCode::UNSUPPORTED_MEDIA_TYPE,
            ReqBodyErrorReason::UnsupportedContentType,
        ),
        JsonRejection::JsonSyntaxError(_) => {
            (HttpStatusCode::BAD_REQUEST, ReqBodyErrorReason::MalformedJson)
        }
        // well-formed json which does not fit the expected structure,
        // e.g. unknown order status, quantity which is not an integer
        JsonRejection::JsonDataError(_) => {
            (HttpStatusCode::BAD_REQUEST, ReqBodyErrorReason::InvalidField)
        }
        _ => (HttpStatusCode::BAD_REQUEST, ReqBodyErrorReason::Unreadable),
    };
    let value = ReqBodyErrorDto {
        reason,
        detail: e.body_text(),
    };
    serialize_body(status, &value)
}
