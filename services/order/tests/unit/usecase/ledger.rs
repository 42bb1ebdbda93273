use std::sync::Arc;

use mrmilk_order::api::web::dto::{
    OrderCreateReqData, OrderHeaderReqDto, OrderLineReqDto, OrderStatus, OrderStatusErrorReason,
    OrderStatusReqDto,
};
use mrmilk_order::datastore::AbstInMemoryDStore;
use mrmilk_order::repository::{AbsIdentityStore, OrderInMemRepo};
use mrmilk_order::usecase::{
    open_order, AdvanceOrderStatusUsKsErr, AdvanceOrderStatusUseCase, FetchOrderUsKsErr,
    FetchOrderUseCase, ListCustomerOrdersUseCase, OpenOrderUsKsErr,
};

use super::{
    ut_place_order_uc, ut_setup_repos, UT_ACTIVE_CUSTOMER, UT_INACTIVE_CUSTOMER, UT_PRODUCT_A,
};
use crate::{ut_inmem_dstore, ut_log_context};

async fn ut_place_one(ds: Arc<Box<dyn AbstInMemoryDStore>>) -> String {
    let uc = ut_place_order_uc(ds).await;
    let req = OrderCreateReqData {
        header: OrderHeaderReqDto {
            customer_id: UT_ACTIVE_CUSTOMER,
            address: Some("2 Butter Row".to_string()),
            cod: true,
        },
        lines: vec![OrderLineReqDto {
            product_id: UT_PRODUCT_A,
            quantity: 6,
        }],
    };
    match uc.execute(req).await {
        Ok(ms) => ms.header().id_.clone(),
        Err(_e) => panic!("order placement failed"),
    }
}

async fn ut_advance(
    ds: Arc<Box<dyn AbstInMemoryDStore>>,
    oid: &str,
    status: OrderStatus,
) -> Result<OrderStatus, AdvanceOrderStatusUsKsErr> {
    let uc = AdvanceOrderStatusUseCase {
        repo: Box::new(OrderInMemRepo::new(ds).await.unwrap()),
        logctx: ut_log_context(),
    };
    let req = OrderStatusReqDto { status };
    uc.execute(oid.to_string(), req).await.map(|h| h.status)
}

#[tokio::test]
async fn open_order_customer_check() {
    let ds = ut_inmem_dstore(100);
    let repos = ut_setup_repos(ds).await;
    let identity: &dyn AbsIdentityStore = repos.identity.as_ref();
    let req = OrderHeaderReqDto {
        customer_id: UT_ACTIVE_CUSTOMER,
        address: None,
        cod: false,
    };
    let header = match open_order(identity, req).await {
        Ok(h) => h,
        Err(_e) => panic!("failed to open order"),
    };
    assert_eq!(header.customer_id, UT_ACTIVE_CUSTOMER);
    assert_eq!(header.status, OrderStatus::Placed);
    for customer_id in [UT_INACTIVE_CUSTOMER, 4040] {
        let req = OrderHeaderReqDto {
            customer_id,
            address: None,
            cod: false,
        };
        match open_order(identity, req).await {
            Err(OpenOrderUsKsErr::UnknownCustomer(id)) => assert_eq!(id, customer_id),
            _others => panic!("expect unknown customer"),
        }
    }
}

#[tokio::test]
async fn advance_status_full_path() {
    let ds = ut_inmem_dstore(100);
    let oid = ut_place_one(ds.clone()).await;
    let result = ut_advance(ds.clone(), oid.as_str(), OrderStatus::Shipped).await;
    assert!(matches!(result, Ok(OrderStatus::Shipped)));
    let result = ut_advance(ds.clone(), oid.as_str(), OrderStatus::Delivered).await;
    assert!(matches!(result, Ok(OrderStatus::Delivered)));
    match ut_advance(ds, oid.as_str(), OrderStatus::Shipped).await {
        Err(AdvanceOrderStatusUsKsErr::ReqContent(e)) => {
            assert_eq!(e.reason, OrderStatusErrorReason::InvalidTransition);
            assert_eq!(e.current, Some(OrderStatus::Delivered));
            assert_eq!(e.requested, OrderStatus::Shipped);
        }
        _others => panic!("expect invalid transition"),
    }
}

#[tokio::test]
async fn advance_status_skip_or_missing() {
    let ds = ut_inmem_dstore(100);
    let oid = ut_place_one(ds.clone()).await;
    match ut_advance(ds.clone(), oid.as_str(), OrderStatus::Delivered).await {
        Err(AdvanceOrderStatusUsKsErr::ReqContent(e)) => {
            assert_eq!(e.current, Some(OrderStatus::Placed));
        }
        _others => panic!("expect invalid transition"),
    }
    match ut_advance(ds, "0badc0ffee", OrderStatus::Shipped).await {
        Err(AdvanceOrderStatusUsKsErr::NotExist(e)) => {
            assert_eq!(e.reason, OrderStatusErrorReason::OrderNotExist);
            assert!(e.current.is_none());
        }
        _others => panic!("expect missing order"),
    }
}

#[tokio::test]
async fn fetch_and_list_orders() {
    let ds = ut_inmem_dstore(100);
    let oid = ut_place_one(ds.clone()).await;
    let uc = FetchOrderUseCase {
        repo: Box::new(OrderInMemRepo::new(ds.clone()).await.unwrap()),
        logctx: ut_log_context(),
    };
    let ms = match uc.execute(oid.clone()).await {
        Ok(v) => v,
        Err(_e) => panic!("failed to load order"),
    };
    assert_eq!(ms.header().address.as_str(), "2 Butter Row");
    assert_eq!(ms.header().total.to_string().as_str(), "60.00");
    assert!(ms.header().cod);

    let uc = FetchOrderUseCase {
        repo: Box::new(OrderInMemRepo::new(ds.clone()).await.unwrap()),
        logctx: ut_log_context(),
    };
    let result = uc.execute("0badc0ffee".to_string()).await;
    assert!(matches!(result, Err(FetchOrderUsKsErr::NotExist)));

    let uc = ListCustomerOrdersUseCase {
        repo: Box::new(OrderInMemRepo::new(ds).await.unwrap()),
        logctx: ut_log_context(),
    };
    let headers = uc.execute(UT_ACTIVE_CUSTOMER).await.unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].id_, oid);
}
