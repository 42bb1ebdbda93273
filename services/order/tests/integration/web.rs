use http::StatusCode;
use serde_json::{json, Value as JsnVal};

use crate::common::{
    deserialize_json_template, itest_seed_stores, itest_setup_shr_state, TestWebServer,
};

async fn itest_setup_server() -> TestWebServer {
    let shr_state = itest_setup_shr_state();
    itest_seed_stores(&shr_state).await;
    TestWebServer::setup(shr_state)
}

#[tokio::test]
async fn place_then_track_order() {
    let srv = itest_setup_server().await;
    let reqbody = deserialize_json_template::<JsnVal>("order_new_ok_1.json");
    let (status, resp) = srv
        .consume("POST", "/order", Some(reqbody.to_string()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["order"]["total"], "25.00");
    assert_eq!(resp["order"]["status"], "PLACED");
    assert_eq!(resp["order"]["address"], "11 Churn Street");
    assert_eq!(resp["lines"].as_array().unwrap().len(), 2);
    let oid = resp["order"]["order_id"].as_str().unwrap().to_string();

    let (status, resp) = srv.consume("GET", &format!("/order/{oid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["order"]["customer_id"], 81);
    assert_eq!(resp["lines"][0]["product_id"], 1001);
    assert_eq!(resp["lines"][0]["unit_price"], "10.00");
    assert_eq!(resp["lines"][1]["quantity"], 1);

    let path = format!("/order/{oid}/status");
    let body = json!({"status": "SHIPPED"}).to_string();
    let (status, resp) = srv.consume("PATCH", &path, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "SHIPPED");
    let (status, resp) = srv.consume("PATCH", &path, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(resp["reason"], "InvalidTransition");
    assert_eq!(resp["current"], "SHIPPED");
    let body = json!({"status": "DELIVERED"}).to_string();
    let (status, resp) = srv.consume("PATCH", &path, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "DELIVERED");

    let (status, resp) = srv.consume("GET", "/customer/81/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    let headers = resp.as_array().unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0]["order_id"], oid.as_str());
    let (status, resp) = srv.consume("GET", "/customer/82/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp.as_array().unwrap().is_empty());
} // end of fn place_then_track_order

#[tokio::test]
async fn place_order_rejected() {
    let srv = itest_setup_server().await;
    let reqbody = deserialize_json_template::<JsnVal>("order_new_dup_product.json");
    let (status, resp) = srv
        .consume("POST", "/order", Some(reqbody.to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "DuplicateProductInOrder");
    assert_eq!(resp["line_seq"], 2);
    assert_eq!(resp["product_id"], 1001);

    let body = json!({"header": {"customer_id": 82}, "lines": [{"product_id": 1001, "quantity": 1}]});
    let (status, resp) = srv.consume("POST", "/order", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "UnknownCustomer");
    assert_eq!(resp["customer_id"], 82);

    let body = json!({"header": {"customer_id": 81}, "lines": []});
    let (status, resp) = srv.consume("POST", "/order", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "EmptyOrder");

    let body = json!({"header": {"customer_id": 81}, "lines": [{"product_id": 1002, "quantity": 0}]});
    let (status, resp) = srv.consume("POST", "/order", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "InvalidQuantity");

    // nothing saved by all the requests above
    let (status, resp) = srv.consume("GET", "/customer/81/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn access_missing_order() {
    let srv = itest_setup_server().await;
    let (status, resp) = srv.consume("GET", "/order/0badc0ffee", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["reason"], "OrderNotExist");
    let body = json!({"status": "SHIPPED"}).to_string();
    let (status, resp) = srv
        .consume("PATCH", "/order/0badc0ffee/status", Some(body))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["reason"], "OrderNotExist");
    assert_eq!(resp["requested"], "SHIPPED");
}

#[tokio::test]
async fn undecodable_request_body() {
    let srv = itest_setup_server().await;
    let body = json!({"status": "SPILLED"}).to_string();
    let (status, resp) = srv
        .consume("PATCH", "/order/0badc0ffee/status", Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "InvalidField");
    assert!(resp["detail"].as_str().unwrap().contains("status"));

    let body = json!({"header": {"customer_id": 81}, "lines": [{"product_id": 1001, "quantity": "two"}]});
    let (status, resp) = srv.consume("POST", "/order", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "InvalidField");

    let body = r#"{"header": {"customer_id": 81}, "lines": ["#.to_string();
    let (status, resp) = srv.consume("POST", "/order", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "MalformedJson");

    let body = json!({"subscriber_id": 81, "product_id": 1002, "quantity": 1.5,
        "remaining_days": 2, "weekdays": ["Mon"]});
    let (status, resp) = srv.consume("POST", "/subscription", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "InvalidField");

    // decoded fine, yet too many for a single order line
    let qty = (u32::MAX as u64) + 1;
    let body = json!({"header": {"customer_id": 81}, "lines": [{"product_id": 1001, "quantity": qty}]});
    let (status, resp) = srv.consume("POST", "/order", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "ExceedingMaxLimit");
    assert_eq!(resp["line_seq"], 0);

    let (status, resp) = srv.consume("GET", "/customer/81/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp.as_array().unwrap().is_empty());
} // end of fn undecodable_request_body

#[tokio::test]
async fn subscription_daily_ticks() {
    let srv = itest_setup_server().await;
    let reqbody = deserialize_json_template::<JsnVal>("subscription_new_ok_1.json");
    let (status, resp) = srv
        .consume("POST", "/subscription", Some(reqbody.to_string()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(resp["state"], "ACTIVE");
    assert_eq!(resp["remaining_days"], 2);
    assert_eq!(resp["weekdays"], json!(["Mon", "Thu"]));
    let sid = resp["subscription_id"].as_str().unwrap().to_string();

    // Monday
    let body = json!({"date": "2024-07-01"}).to_string();
    let (status, report) = srv.consume("POST", "/subscription/tick", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["delivered"][0]["subscription_id"], sid.as_str());
    assert!(report["exhausted"].as_array().unwrap().is_empty());
    let oid = report["delivered"][0]["order_id"].as_str().unwrap().to_string();
    let (status, resp) = srv.consume("GET", &format!("/order/{oid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["order"]["cod"], true);
    assert_eq!(resp["order"]["address"], "8 Meadow Road");
    assert_eq!(resp["order"]["total"], "15.00");

    // Wednesday
    let body = json!({"date": "2024-07-03"}).to_string();
    let (_status, report) = srv.consume("POST", "/subscription/tick", Some(body)).await;
    assert_eq!(report["skipped"], json!([sid.as_str()]));
    assert!(report["delivered"].as_array().unwrap().is_empty());

    // Thursday, last delivery
    let body = json!({"date": "2024-07-04"}).to_string();
    let (_status, report) = srv.consume("POST", "/subscription/tick", Some(body)).await;
    assert_eq!(report["delivered"].as_array().unwrap().len(), 1);
    assert_eq!(report["exhausted"], json!([sid.as_str()]));

    // next Monday, the subscription is no longer active
    let body = json!({"date": "2024-07-08"}).to_string();
    let (_status, report) = srv.consume("POST", "/subscription/tick", Some(body)).await;
    assert!(report["delivered"].as_array().unwrap().is_empty());
    assert!(report["skipped"].as_array().unwrap().is_empty());

    let (_status, resp) = srv.consume("GET", "/customer/81/orders", None).await;
    assert_eq!(resp.as_array().unwrap().len(), 2);
} // end of fn subscription_daily_ticks

#[tokio::test]
async fn subscription_rejected() {
    let srv = itest_setup_server().await;
    let mut reqbody = deserialize_json_template::<JsnVal>("subscription_new_ok_1.json");
    reqbody["subscriber_id"] = json!(82);
    let (status, resp) = srv
        .consume("POST", "/subscription", Some(reqbody.to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "UnknownCustomer");

    let mut reqbody = deserialize_json_template::<JsnVal>("subscription_new_ok_1.json");
    reqbody["weekdays"] = json!([]);
    let (status, resp) = srv
        .consume("POST", "/subscription", Some(reqbody.to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["reason"], "EmptyWeekdays");
}
