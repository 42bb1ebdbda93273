use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use mrmilk_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::api::web::dto::{
    OrderHeaderReqDto, OrderStatus, OrderStatusErrorReason, OrderStatusReqDto,
    OrderStatusUpdateErrorDto,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::{OrderHeaderModel, OrderModelSet};
use crate::repository::{AbsIdentityStore, AbsOrderRepo};

pub enum OpenOrderUsKsErr {
    UnknownCustomer(u32),
    Server(AppError),
}

pub enum AdvanceOrderStatusUsKsErr {
    NotExist(OrderStatusUpdateErrorDto),
    ReqContent(OrderStatusUpdateErrorDto),
    Server(Vec<AppError>),
}

pub enum FetchOrderUsKsErr {
    NotExist,
    Server(Vec<AppError>),
}

/// Open a header on behalf of an active customer. The returned header is not
/// saved, it is committed later together with all its lines.
pub async fn open_order(
    repo: &dyn AbsIdentityStore,
    req: OrderHeaderReqDto,
) -> DefaultResult<OrderHeaderModel, OpenOrderUsKsErr> {
    let customer = match repo.resolve_customer(req.customer_id).await {
        Ok(found) => found.filter(|c| c.active),
        Err(e) => {
            return Err(OpenOrderUsKsErr::Server(e));
        }
    };
    if let Some(c) = customer {
        Ok(OrderHeaderModel::open(&c, req.address, req.cod))
    } else {
        Err(OpenOrderUsKsErr::UnknownCustomer(req.customer_id))
    }
}

pub struct AdvanceOrderStatusUseCase {
    pub repo: Box<dyn AbsOrderRepo>,
    pub logctx: Arc<AppLogContext>,
}

impl AdvanceOrderStatusUseCase {
    pub async fn execute(
        self,
        oid: String,
        req: OrderStatusReqDto,
    ) -> DefaultResult<OrderHeaderModel, AdvanceOrderStatusUsKsErr> {
        let requested = req.status;
        let result = self
            .repo
            .update_status(oid.as_str(), requested, OrderHeaderModel::try_advance)
            .await;
        match result {
            Ok(header) => Ok(header),
            Err(Ok(e)) => Err(AdvanceOrderStatusUsKsErr::ReqContent(e)),
            Err(Err(e)) => Err(self.map_repo_error(e, requested)),
        }
    }

    fn map_repo_error(&self, e: AppError, requested: OrderStatus) -> AdvanceOrderStatusUsKsErr {
        if e.code == AppErrorCode::OrderNotExist {
            let dto = OrderStatusUpdateErrorDto {
                reason: OrderStatusErrorReason::OrderNotExist,
                current: None,
                requested,
            };
            AdvanceOrderStatusUsKsErr::NotExist(dto)
        } else {
            let logctx_p = &self.logctx;
            app_log_event!(logctx_p, AppLogLevel::ERROR, "status-update-fail, {e}");
            AdvanceOrderStatusUsKsErr::Server(vec![e])
        }
    }
} // end of impl AdvanceOrderStatusUseCase

pub struct FetchOrderUseCase {
    pub repo: Box<dyn AbsOrderRepo>,
    pub logctx: Arc<AppLogContext>,
}

impl FetchOrderUseCase {
    pub async fn execute(self, oid: String) -> DefaultResult<OrderModelSet, FetchOrderUsKsErr> {
        match self.repo.fetch_order(oid.as_str()).await {
            Ok(ms) => Ok(ms),
            Err(e) if e.code == AppErrorCode::OrderNotExist => Err(FetchOrderUsKsErr::NotExist),
            Err(e) => {
                let logctx_p = &self.logctx;
                app_log_event!(logctx_p, AppLogLevel::ERROR, "oid:{oid}, {e}");
                Err(FetchOrderUsKsErr::Server(vec![e]))
            }
        }
    }
}

pub struct ListCustomerOrdersUseCase {
    pub repo: Box<dyn AbsOrderRepo>,
    pub logctx: Arc<AppLogContext>,
}

impl ListCustomerOrdersUseCase {
    pub async fn execute(self, customer_id: u32) -> DefaultResult<Vec<OrderHeaderModel>, AppError> {
        self.repo.fetch_by_customer(customer_id).await.map_err(|e| {
            let logctx_p = &self.logctx;
            app_log_event!(logctx_p, AppLogLevel::ERROR, "customer:{customer_id}, {e}");
            e
        })
    }
}
