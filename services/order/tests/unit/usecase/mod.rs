mod ledger;
mod place_order;
mod subscription;

use std::boxed::Box;
use std::sync::Arc;

use async_trait::async_trait;

use mrmilk_order::datastore::AbstInMemoryDStore;
use mrmilk_order::error::{AppError, AppErrorCode};
use mrmilk_order::model::ProductModel;
use mrmilk_order::repository::{
    AbsCatalogStore, AbsIdentityStore, AbsOrderRepo, AbsSubscriptionRepo, CatalogInMemStore,
    IdentityInMemStore, OrderInMemRepo, SubscriptionInMemRepo,
};
use mrmilk_order::usecase::PlaceOrderUseCase;

use crate::{ut_customer, ut_log_context, ut_product};

pub(super) const UT_PRODUCT_A: u64 = 1001;
pub(super) const UT_PRODUCT_B: u64 = 1002;
pub(super) const UT_ACTIVE_CUSTOMER: u32 = 81;
pub(super) const UT_INACTIVE_CUSTOMER: u32 = 82;

pub(super) struct UtRepoSet {
    pub order: Box<dyn AbsOrderRepo>,
    pub subscription: Box<dyn AbsSubscriptionRepo>,
    pub catalog: Box<dyn AbsCatalogStore>,
    pub identity: Box<dyn AbsIdentityStore>,
}

// every call creates a brand-new store, repositories returned from the same
// call share the store
pub(super) async fn ut_setup_repos(ds: Arc<Box<dyn AbstInMemoryDStore>>) -> UtRepoSet {
    let catalog = CatalogInMemStore::new(ds.clone()).await.unwrap();
    let items = vec![
        ut_product(UT_PRODUCT_A, "10.00"),
        ut_product(UT_PRODUCT_B, "5.00"),
    ];
    catalog.save(items).await.unwrap();
    let identity = IdentityInMemStore::new(ds.clone()).await.unwrap();
    let items = vec![
        ut_customer(UT_ACTIVE_CUSTOMER, true),
        ut_customer(UT_INACTIVE_CUSTOMER, false),
    ];
    identity.save(items).await.unwrap();
    UtRepoSet {
        order: Box::new(OrderInMemRepo::new(ds.clone()).await.unwrap()),
        subscription: Box::new(SubscriptionInMemRepo::new(ds).await.unwrap()),
        catalog: Box::new(catalog),
        identity: Box::new(identity),
    }
}

pub(super) async fn ut_place_order_uc(ds: Arc<Box<dyn AbstInMemoryDStore>>) -> PlaceOrderUseCase {
    let repos = ut_setup_repos(ds).await;
    PlaceOrderUseCase {
        repo_order: Arc::new(repos.order),
        repo_catalog: Arc::new(repos.catalog),
        repo_identity: Arc::new(repos.identity),
        logctx: ut_log_context(),
    }
}

pub(super) struct MockCatalogStore;

#[async_trait]
impl AbsCatalogStore for MockCatalogStore {
    async fn get_product(&self, pid: u64) -> Result<Option<ProductModel>, AppError> {
        Err(AppError {
            code: AppErrorCode::DatabaseServerBusy,
            detail: Some(format!("product:{pid}")),
        })
    }
    async fn save(&self, _items: Vec<ProductModel>) -> Result<(), AppError> {
        Err(AppError {
            code: AppErrorCode::NotImplemented,
            detail: None,
        })
    }
}
