use std::sync::Arc;

use rust_decimal::Decimal;

use mrmilk_order::api::web::dto::{
    OrderCreateReqData, OrderHeaderReqDto, OrderLineReqDto, OrderPlaceErrorDto,
    OrderPlaceErrorReason, OrderStatus,
};
use mrmilk_order::constant::hard_limit;
use mrmilk_order::error::AppErrorCode;
use mrmilk_order::repository::{AbsCatalogStore, AbsOrderRepo, OrderInMemRepo};
use mrmilk_order::usecase::PlaceOrderUsKsErr;

use super::{
    ut_place_order_uc, MockCatalogStore, UT_ACTIVE_CUSTOMER, UT_INACTIVE_CUSTOMER, UT_PRODUCT_A,
    UT_PRODUCT_B,
};
use crate::ut_inmem_dstore;

fn ut_request(customer_id: u32, lines: &[(u64, i64)]) -> OrderCreateReqData {
    let header = OrderHeaderReqDto {
        customer_id,
        address: None,
        cod: false,
    };
    let lines = lines
        .iter()
        .map(|(product_id, quantity)| OrderLineReqDto {
            product_id: *product_id,
            quantity: *quantity,
        })
        .collect();
    OrderCreateReqData { header, lines }
}

fn ut_client_error(result: Result<impl Sized, PlaceOrderUsKsErr>) -> OrderPlaceErrorDto {
    match result {
        Err(PlaceOrderUsKsErr::ReqContent(e)) => e,
        Err(PlaceOrderUsKsErr::Server(es)) => panic!("unexpected server error: {:?}", es),
        Ok(_) => panic!("unexpected success"),
    }
}

#[tokio::test]
async fn place_ok() {
    let ds = ut_inmem_dstore(100);
    let uc = ut_place_order_uc(ds.clone()).await;
    let req = ut_request(UT_ACTIVE_CUSTOMER, &[(UT_PRODUCT_A, 2), (UT_PRODUCT_B, 1)]);
    let result = uc.execute(req).await;
    let ms = match result {
        Ok(v) => v,
        Err(_e) => panic!("order placement failed"),
    };
    assert_eq!(ms.header().total, Decimal::new(2500, 2));
    assert_eq!(ms.header().status, OrderStatus::Placed);
    assert_eq!(ms.header().address.as_str(), "19 Cowshed Lane");
    let prices = ms
        .lines()
        .iter()
        .map(|l| l.unit_price.to_string())
        .collect::<Vec<_>>();
    assert_eq!(prices, ["10.00", "5.00"]);

    let repo = OrderInMemRepo::new(ds).await.unwrap();
    let saved = repo.fetch_order(ms.header().id_.as_str()).await.unwrap();
    assert_eq!(saved.header().total, Decimal::new(2500, 2));
    assert_eq!(saved.lines().len(), 2);
}

#[tokio::test]
async fn place_duplicate_product() {
    let ds = ut_inmem_dstore(100);
    let uc = ut_place_order_uc(ds.clone()).await;
    let req = ut_request(UT_ACTIVE_CUSTOMER, &[(UT_PRODUCT_A, 2), (UT_PRODUCT_A, 3)]);
    let error = ut_client_error(uc.execute(req).await);
    assert_eq!(error.reason, OrderPlaceErrorReason::DuplicateProductInOrder);
    assert_eq!(error.line_seq, Some(1));
    assert_eq!(error.product_id, Some(UT_PRODUCT_A));
    // nothing persisted
    let repo = OrderInMemRepo::new(ds).await.unwrap();
    let headers = repo.fetch_by_customer(UT_ACTIVE_CUSTOMER).await.unwrap();
    assert!(headers.is_empty());
}

#[tokio::test]
async fn place_empty_or_too_many_lines() {
    let ds = ut_inmem_dstore(100);
    let uc = ut_place_order_uc(ds).await;
    let req = ut_request(UT_ACTIVE_CUSTOMER, &[]);
    let error = ut_client_error(uc.execute(req).await);
    assert_eq!(error.reason, OrderPlaceErrorReason::EmptyOrder);
    assert_eq!(error.line_seq, None);

    let lines = (0..(hard_limit::MAX_ORDER_LINES_PER_REQUEST as u64 + 1))
        .map(|pid| (pid + 5000, 1i64))
        .collect::<Vec<_>>();
    let req = ut_request(UT_ACTIVE_CUSTOMER, &lines);
    let error = ut_client_error(uc.execute(req).await);
    assert_eq!(error.reason, OrderPlaceErrorReason::ExceedingMaxLimit);
}

#[tokio::test]
async fn place_unknown_customer() {
    let ds = ut_inmem_dstore(100);
    let uc = ut_place_order_uc(ds).await;
    for customer_id in [404u32, UT_INACTIVE_CUSTOMER] {
        let req = ut_request(customer_id, &[(UT_PRODUCT_A, 1)]);
        let error = ut_client_error(uc.execute(req).await);
        assert_eq!(error.reason, OrderPlaceErrorReason::UnknownCustomer);
        assert_eq!(error.customer_id, Some(customer_id));
    }
}

#[tokio::test]
async fn place_invalid_lines() {
    let ds = ut_inmem_dstore(100);
    let uc = ut_place_order_uc(ds.clone()).await;
    let req = ut_request(UT_ACTIVE_CUSTOMER, &[(UT_PRODUCT_A, 1), (9999, 1)]);
    let error = ut_client_error(uc.execute(req).await);
    assert_eq!(error.reason, OrderPlaceErrorReason::UnknownProduct);
    assert_eq!(error.line_seq, Some(1));
    assert_eq!(error.product_id, Some(9999));

    for qty in [0i64, -3] {
        let req = ut_request(UT_ACTIVE_CUSTOMER, &[(UT_PRODUCT_B, qty)]);
        let error = ut_client_error(uc.execute(req).await);
        assert_eq!(error.reason, OrderPlaceErrorReason::InvalidQuantity);
        assert_eq!(error.line_seq, Some(0));
    }
    let repo = OrderInMemRepo::new(ds).await.unwrap();
    let headers = repo.fetch_by_customer(UT_ACTIVE_CUSTOMER).await.unwrap();
    assert!(headers.is_empty());
}

#[tokio::test]
async fn place_catalog_failure() {
    let ds = ut_inmem_dstore(100);
    let mut uc = ut_place_order_uc(ds).await;
    let mock: Box<dyn AbsCatalogStore> = Box::new(MockCatalogStore);
    uc.repo_catalog = Arc::new(mock);
    let req = ut_request(UT_ACTIVE_CUSTOMER, &[(UT_PRODUCT_A, 1)]);
    match uc.execute(req).await {
        Err(PlaceOrderUsKsErr::Server(es)) => {
            assert_eq!(es.len(), 1);
            assert_eq!(es[0].code, AppErrorCode::DatabaseServerBusy);
        }
        _others => panic!("expect server error"),
    }
}

#[tokio::test]
async fn place_concurrent_orders() {
    let ds = ut_inmem_dstore(100);
    let uc = ut_place_order_uc(ds.clone()).await;
    let handles = (0..4)
        .map(|_| {
            let uc = uc.clone();
            tokio::spawn(async move {
                let req = ut_request(UT_ACTIVE_CUSTOMER, &[(UT_PRODUCT_A, 1), (UT_PRODUCT_B, 2)]);
                uc.execute(req).await.is_ok()
            })
        })
        .collect::<Vec<_>>();
    for hdl in handles {
        assert!(hdl.await.unwrap());
    }
    // the same product can appear in different orders
    let repo = OrderInMemRepo::new(ds).await.unwrap();
    let headers = repo.fetch_by_customer(UT_ACTIVE_CUSTOMER).await.unwrap();
    assert_eq!(headers.len(), 4);
    assert!(headers.iter().all(|h| h.total == Decimal::new(2000, 2)));
}
