use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use mrmilk_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::api::web::dto::{
    OrderCreateReqData, OrderHeaderReqDto, OrderLineReqDto, OrderPlaceErrorDto,
    OrderPlaceErrorReason,
};
use crate::constant::hard_limit;
use crate::error::AppError;
use crate::model::{OrderHeaderModel, OrderLineModel, OrderModelSet, ProductModel};
use crate::repository::{AbsCatalogStore, AbsIdentityStore, AbsOrderRepo};

use super::ledger::{open_order, OpenOrderUsKsErr};

pub enum PlaceOrderUsKsErr {
    ReqContent(OrderPlaceErrorDto),
    Server(Vec<AppError>),
}

impl PlaceOrderUsKsErr {
    fn client(reason: OrderPlaceErrorReason) -> Self {
        Self::ReqContent(OrderPlaceErrorDto {
            reason,
            line_seq: None,
            product_id: None,
            customer_id: None,
        })
    }
}

/// Validates a placement request line by line, then commits the header and
/// all the lines in one unit of work. Cloning is cheap, the daily tick hands
/// a clone to each of its tasks.
#[derive(Clone)]
pub struct PlaceOrderUseCase {
    pub repo_order: Arc<Box<dyn AbsOrderRepo>>,
    pub repo_catalog: Arc<Box<dyn AbsCatalogStore>>,
    pub repo_identity: Arc<Box<dyn AbsIdentityStore>>,
    pub logctx: Arc<AppLogContext>,
}

impl PlaceOrderUseCase {
    pub async fn execute(
        &self,
        req: OrderCreateReqData,
    ) -> DefaultResult<OrderModelSet, PlaceOrderUsKsErr> {
        let (header_d, lines_d) = (req.header, req.lines);
        if lines_d.is_empty() {
            return Err(PlaceOrderUsKsErr::client(OrderPlaceErrorReason::EmptyOrder));
        }
        if lines_d.len() > hard_limit::MAX_ORDER_LINES_PER_REQUEST {
            return Err(PlaceOrderUsKsErr::client(
                OrderPlaceErrorReason::ExceedingMaxLimit,
            ));
        }
        let header = self.open_header(header_d).await?;
        let mut ms = OrderModelSet::new(header);
        for (seq, d) in lines_d.iter().enumerate() {
            let product = self.load_product(d).await?;
            let line = OrderLineModel::try_from(seq, d, product.as_ref())
                .map_err(PlaceOrderUsKsErr::ReqContent)?;
            ms.append(seq, line).map_err(PlaceOrderUsKsErr::ReqContent)?;
        }
        match self.repo_order.create(&ms).await {
            Ok(()) => {
                let logctx_p = &self.logctx;
                app_log_event!(
                    logctx_p,
                    AppLogLevel::INFO,
                    "oid:{}, customer:{}, num-lines:{}, total:{}",
                    ms.header().id_,
                    ms.header().customer_id,
                    ms.lines().len(),
                    ms.header().total
                );
                Ok(ms)
            }
            Err(Ok(e)) => Err(PlaceOrderUsKsErr::ReqContent(e)),
            Err(Err(e)) => {
                let logctx_p = &self.logctx;
                app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-fail-save: {e}");
                Err(PlaceOrderUsKsErr::Server(vec![e]))
            }
        }
    } // end of fn execute

    async fn open_header(
        &self,
        req: OrderHeaderReqDto,
    ) -> DefaultResult<OrderHeaderModel, PlaceOrderUsKsErr> {
        let customer_id = req.customer_id;
        match open_order(&**self.repo_identity, req).await {
            Ok(h) => Ok(h),
            Err(OpenOrderUsKsErr::UnknownCustomer(_)) => {
                let e = OrderPlaceErrorDto {
                    reason: OrderPlaceErrorReason::UnknownCustomer,
                    line_seq: None,
                    product_id: None,
                    customer_id: Some(customer_id),
                };
                Err(PlaceOrderUsKsErr::ReqContent(e))
            }
            Err(OpenOrderUsKsErr::Server(e)) => {
                let logctx_p = &self.logctx;
                app_log_event!(
                    logctx_p,
                    AppLogLevel::ERROR,
                    "identity-lookup, customer:{customer_id}, {e}"
                );
                Err(PlaceOrderUsKsErr::Server(vec![e]))
            }
        }
    }

    // a line with invalid quantity is rejected before the catalog lookup
    async fn load_product(
        &self,
        d: &OrderLineReqDto,
    ) -> DefaultResult<Option<ProductModel>, PlaceOrderUsKsErr> {
        if d.quantity < 1 {
            return Ok(None);
        }
        self.repo_catalog
            .get_product(d.product_id)
            .await
            .map_err(|e| {
                let logctx_p = &self.logctx;
                app_log_event!(
                    logctx_p,
                    AppLogLevel::ERROR,
                    "catalog-lookup, product:{}, {e}",
                    d.product_id
                );
                PlaceOrderUsKsErr::Server(vec![e])
            })
    }
} // end of impl PlaceOrderUseCase
