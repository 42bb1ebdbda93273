use std::sync::Arc;

use chrono::{Days, Weekday};

use mrmilk_order::api::web::dto::{
    SubscriptionCreateErrorReason, SubscriptionCreateReqDto, SubscriptionTickReportDto,
};
use mrmilk_order::datastore::AbstInMemoryDStore;
use mrmilk_order::model::SubscriptionModel;
use mrmilk_order::repository::{AbsOrderRepo, AbsSubscriptionRepo, OrderInMemRepo};
use mrmilk_order::usecase::{
    CreateSubscriptionUsKsErr, CreateSubscriptionUseCase, RunDailyTickUseCase,
};

use super::{
    ut_place_order_uc, ut_setup_repos, UT_ACTIVE_CUSTOMER, UT_INACTIVE_CUSTOMER, UT_PRODUCT_A,
    UT_PRODUCT_B,
};
use crate::{ut_customer, ut_inmem_dstore, ut_log_context, ut_monday, ut_product};

fn ut_req(
    subscriber_id: u32,
    product_id: u64,
    remaining_days: i64,
    weekdays: Vec<Weekday>,
) -> SubscriptionCreateReqDto {
    SubscriptionCreateReqDto {
        subscriber_id,
        product_id,
        quantity: 2,
        start_date: Some(ut_monday()),
        remaining_days,
        weekdays,
    }
}

async fn ut_create(
    ds: Arc<Box<dyn AbstInMemoryDStore>>,
    req: SubscriptionCreateReqDto,
) -> Result<SubscriptionModel, CreateSubscriptionUsKsErr> {
    let repos = ut_setup_repos(ds).await;
    let uc = CreateSubscriptionUseCase {
        repo_sub: repos.subscription,
        repo_catalog: repos.catalog,
        repo_identity: repos.identity,
        logctx: ut_log_context(),
    };
    uc.execute(req).await
}

async fn ut_run_tick(
    ds: Arc<Box<dyn AbstInMemoryDStore>>,
    days_after_monday: u64,
) -> SubscriptionTickReportDto {
    let repos = ut_setup_repos(ds.clone()).await;
    let uc = RunDailyTickUseCase {
        repo_sub: Arc::new(repos.subscription),
        place_order: ut_place_order_uc(ds).await,
        logctx: ut_log_context(),
    };
    let date = ut_monday()
        .checked_add_days(Days::new(days_after_monday))
        .unwrap();
    uc.execute(date).await.unwrap()
}

#[tokio::test]
async fn create_ok() {
    let ds = ut_inmem_dstore(100);
    let req = ut_req(UT_ACTIVE_CUSTOMER, UT_PRODUCT_A, 5, vec![Weekday::Mon, Weekday::Thu]);
    let sub = match ut_create(ds.clone(), req).await {
        Ok(v) => v,
        Err(_e) => panic!("failed to create subscription"),
    };
    assert_eq!(sub.remaining_days(), 5);
    assert_eq!(sub.start_date, ut_monday());
    let repos = ut_setup_repos(ds).await;
    let saved = repos.subscription.fetch(sub.id_.as_str()).await.unwrap();
    assert_eq!(saved.weekdays, sub.weekdays);
    assert_eq!(saved.quantity, 2);
}

#[tokio::test]
async fn create_error() {
    let ds = ut_inmem_dstore(100);
    let cases = [
        (
            ut_req(4040, UT_PRODUCT_A, 5, vec![Weekday::Mon]),
            SubscriptionCreateErrorReason::UnknownCustomer,
        ),
        (
            ut_req(UT_INACTIVE_CUSTOMER, UT_PRODUCT_A, 5, vec![Weekday::Mon]),
            SubscriptionCreateErrorReason::UnknownCustomer,
        ),
        (
            ut_req(UT_ACTIVE_CUSTOMER, 9999, 5, vec![Weekday::Mon]),
            SubscriptionCreateErrorReason::UnknownProduct,
        ),
        (
            ut_req(UT_ACTIVE_CUSTOMER, UT_PRODUCT_A, 0, vec![Weekday::Mon]),
            SubscriptionCreateErrorReason::InvalidRemainingDays,
        ),
        (
            ut_req(UT_ACTIVE_CUSTOMER, UT_PRODUCT_A, 5, vec![]),
            SubscriptionCreateErrorReason::EmptyWeekdays,
        ),
    ];
    for (req, expect) in cases {
        match ut_create(ds.clone(), req).await {
            Err(CreateSubscriptionUsKsErr::ReqContent(e)) => assert_eq!(e.reason, expect),
            _others => panic!("expect client error, reason:{:?}", expect),
        }
    }
    let repos = ut_setup_repos(ds).await;
    assert!(repos.subscription.fetch_active_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn daily_tick_mixed() {
    let ds = ut_inmem_dstore(100);
    let req = ut_req(UT_ACTIVE_CUSTOMER, UT_PRODUCT_A, 1, vec![Weekday::Mon]);
    let sub_a = ut_create(ds.clone(), req).await.ok().unwrap();
    let req = ut_req(UT_ACTIVE_CUSTOMER, UT_PRODUCT_B, 3, vec![Weekday::Tue]);
    let sub_b = ut_create(ds.clone(), req).await.ok().unwrap();
    // product withdrawn from catalog after the subscription was created
    let sub_c = {
        let req = ut_req(UT_ACTIVE_CUSTOMER, 9999, 2, vec![Weekday::Mon]);
        let customer = ut_customer(UT_ACTIVE_CUSTOMER, true);
        let product = ut_product(9999, "1.00");
        let sub =
            SubscriptionModel::try_new(&req, Some(&customer), Some(&product), ut_monday()).unwrap();
        let repos = ut_setup_repos(ds.clone()).await;
        repos.subscription.create(&sub).await.unwrap();
        sub
    };

    let report = ut_run_tick(ds.clone(), 0).await;
    assert_eq!(report.date, ut_monday());
    assert_eq!(report.delivered.len(), 1);
    assert_eq!(report.delivered[0].subscription_id, sub_a.id_);
    assert_eq!(report.exhausted, vec![sub_a.id_.clone()]);
    assert_eq!(report.skipped, vec![sub_b.id_.clone()]);
    assert!(report.terminal.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].subscription_id, sub_c.id_);
    assert_eq!(report.failures[0].reason.as_str(), "UnknownProduct");

    let repos = ut_setup_repos(ds.clone()).await;
    let oid = report.delivered[0].order_id.as_str();
    let ms = repos.order.fetch_order(oid).await.unwrap();
    assert!(ms.header().cod);
    assert_eq!(ms.header().address.as_str(), "19 Cowshed Lane");
    assert_eq!(ms.lines()[0].product_id, UT_PRODUCT_A);
    assert_eq!(ms.lines()[0].quantity, 2);
    assert_eq!(ms.header().total.to_string().as_str(), "20.00");
    // failed placement still consumes one delivery day
    let saved_c = repos.subscription.fetch(sub_c.id_.as_str()).await.unwrap();
    assert_eq!(saved_c.remaining_days(), 1);
    let mut expect_active = vec![sub_b.id_.clone(), sub_c.id_.clone()];
    expect_active.sort();
    assert_eq!(repos.subscription.fetch_active_ids().await.unwrap(), expect_active);

    // next day, only the Tuesday subscription delivers
    let report = ut_run_tick(ds.clone(), 1).await;
    assert_eq!(report.delivered.len(), 1);
    assert_eq!(report.delivered[0].subscription_id, sub_b.id_);
    assert_eq!(report.skipped, vec![sub_c.id_.clone()]);
    assert!(report.exhausted.is_empty());
    assert!(report.failures.is_empty());
    let repo = OrderInMemRepo::new(ds).await.unwrap();
    let headers = repo.fetch_by_customer(UT_ACTIVE_CUSTOMER).await.unwrap();
    assert_eq!(headers.len(), 2);
} // end of fn daily_tick_mixed

#[tokio::test]
async fn daily_tick_monday_only_once() {
    let ds = ut_inmem_dstore(100);
    let req = ut_req(UT_ACTIVE_CUSTOMER, UT_PRODUCT_B, 1, vec![Weekday::Mon]);
    let sub = ut_create(ds.clone(), req).await.ok().unwrap();
    let mut num_delivered = 0;
    for offset in 0..14u64 {
        let report = ut_run_tick(ds.clone(), offset).await;
        num_delivered += report.delivered.len();
        if offset == 0 {
            assert_eq!(report.exhausted, vec![sub.id_.clone()]);
        } else {
            // exhausted subscription is no longer picked by the batch
            assert!(report.skipped.is_empty());
            assert!(report.delivered.is_empty());
        }
    }
    assert_eq!(num_delivered, 1);
    let repos = ut_setup_repos(ds).await;
    let saved = repos.subscription.fetch(sub.id_.as_str()).await.unwrap();
    assert_eq!(saved.remaining_days(), 0);
}
