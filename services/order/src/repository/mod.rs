use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;
use std::vec::Vec;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::api::web::dto::{OrderPlaceErrorDto, OrderStatus, OrderStatusUpdateErrorDto};
use crate::error::{AppError, AppErrorCode};
use crate::model::{
    CustomerModel, OrderHeaderModel, OrderModelSet, ProductModel, SubscriptionModel,
    SubscriptionTickOutcome,
};
use crate::AppDataStoreContext;

mod in_mem;
// make in-memory repo visible only for testing purpose
pub use in_mem::catalog::CatalogInMemStore;
pub use in_mem::identity::IdentityInMemStore;
pub use in_mem::order::OrderInMemRepo;
pub use in_mem::subscription::SubscriptionInMemRepo;

#[cfg(feature = "mariadb")]
mod mariadb;

#[cfg(feature = "mariadb")]
use mariadb::catalog::CatalogMariaDbStore;
#[cfg(feature = "mariadb")]
use mariadb::identity::IdentityMariaDbStore;
#[cfg(feature = "mariadb")]
use mariadb::order::OrderMariaDbRepo;
#[cfg(feature = "mariadb")]
use mariadb::subscription::SubscriptionMariaDbRepo;

// - the outer error means the order cannot be committed, the inner result
//   separates client-caused errors (e.g. duplicate product found in the
//   storage) from server errors
pub type AppOrderRepoCreateReturn =
    DefaultResult<(), DefaultResult<OrderPlaceErrorDto, AppError>>;

pub type AppOrderRepoStatusReturn =
    DefaultResult<OrderHeaderModel, DefaultResult<OrderStatusUpdateErrorDto, AppError>>;

// if the function pointer type is declared directly in function signature of a
// trait method, the function pointer will be viewed as closure block
pub type AppOrderRepoStatusUserFunc =
    fn(&mut OrderHeaderModel, OrderStatus) -> DefaultResult<(), OrderStatusUpdateErrorDto>;

pub type AppSubscriptionTickUserFunc =
    fn(&mut SubscriptionModel, NaiveDate) -> SubscriptionTickOutcome;

// the repository instance may be used across an await,
// the future created by app callers has to be able to pass to different threads
// , it is the reason to add `Send` and `Sync` as super-traits
#[async_trait]
pub trait AbsOrderRepo: Sync + Send {
    /// save the header and all the lines as a single unit of work, the
    /// (order, product) pairs are checked again against the storage before
    /// anything is written
    async fn create(&self, order: &OrderModelSet) -> AppOrderRepoCreateReturn;

    async fn fetch_order(&self, oid: &str) -> DefaultResult<OrderModelSet, AppError>;

    async fn fetch_by_customer(
        &self,
        customer_id: u32,
    ) -> DefaultResult<Vec<OrderHeaderModel>, AppError>;

    /// locked read-modify-write on a single order header, the callback
    /// decides whether the transition is allowed
    async fn update_status(
        &self,
        oid: &str,
        next: OrderStatus,
        cb: AppOrderRepoStatusUserFunc,
    ) -> AppOrderRepoStatusReturn;
} // end of trait AbsOrderRepo

#[async_trait]
pub trait AbsSubscriptionRepo: Sync + Send {
    async fn create(&self, sub: &SubscriptionModel) -> DefaultResult<(), AppError>;

    async fn fetch(&self, sid: &str) -> DefaultResult<SubscriptionModel, AppError>;

    async fn fetch_active_ids(&self) -> DefaultResult<Vec<String>, AppError>;

    /// locked read-modify-write on a single subscription, changes are written
    /// back only when the callback reports a delivery
    async fn tick(
        &self,
        sid: &str,
        today: NaiveDate,
        cb: AppSubscriptionTickUserFunc,
    ) -> DefaultResult<(SubscriptionTickOutcome, SubscriptionModel), AppError>;
}

/// read-only access to products, `save()` is for seeding the store
#[async_trait]
pub trait AbsCatalogStore: Sync + Send {
    async fn get_product(&self, pid: u64) -> DefaultResult<Option<ProductModel>, AppError>;
    async fn save(&self, items: Vec<ProductModel>) -> DefaultResult<(), AppError>;
}

#[async_trait]
pub trait AbsIdentityStore: Sync + Send {
    async fn resolve_customer(&self, id: u32) -> DefaultResult<Option<CustomerModel>, AppError>;
    async fn save(&self, items: Vec<CustomerModel>) -> DefaultResult<(), AppError>;
}

pub async fn app_repo_order(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsOrderRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = OrderMariaDbRepo::new(dbs.clone())?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = OrderInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_subscription(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsSubscriptionRepo>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = SubscriptionMariaDbRepo::new(dbs.clone())?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = SubscriptionInMemRepo::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_catalog(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsCatalogStore>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = CatalogMariaDbStore::new(dbs.clone())?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = CatalogInMemStore::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}

pub async fn app_repo_identity(
    ds: Arc<AppDataStoreContext>,
) -> DefaultResult<Box<dyn AbsIdentityStore>, AppError> {
    #[cfg(feature = "mariadb")]
    if let Some(dbs) = ds.sql_dbs.as_ref() {
        let obj = IdentityMariaDbStore::new(dbs.clone())?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::FeatureDisabled,
            detail: Some("mariadb".to_string()),
        })
    }
    #[cfg(not(feature = "mariadb"))]
    if let Some(m) = &ds.in_mem {
        let obj = IdentityInMemStore::new(m.clone()).await?;
        Ok(Box::new(obj))
    } else {
        Err(AppError {
            code: AppErrorCode::MissingDataStore,
            detail: Some("unknown-type".to_string()),
        })
    }
}
