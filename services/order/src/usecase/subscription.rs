use std::boxed::Box;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use chrono::{Local as LocalTime, NaiveDate};
use tokio::task::JoinHandle;

use mrmilk_common::logging::{app_log_event, AppLogContext, AppLogLevel};

use crate::api::web::dto::{
    OrderCreateReqData, OrderHeaderReqDto, OrderLineReqDto, SubscriptionCreateErrorDto,
    SubscriptionCreateReqDto, SubscriptionDeliveryDto, SubscriptionTickFailureDto,
    SubscriptionTickReportDto,
};
use crate::error::AppError;
use crate::model::{SubscriptionModel, SubscriptionTickOutcome};
use crate::repository::{AbsCatalogStore, AbsIdentityStore, AbsSubscriptionRepo};

use super::place_order::{PlaceOrderUsKsErr, PlaceOrderUseCase};

pub enum CreateSubscriptionUsKsErr {
    ReqContent(SubscriptionCreateErrorDto),
    Server(Vec<AppError>),
}

pub struct CreateSubscriptionUseCase {
    pub repo_sub: Box<dyn AbsSubscriptionRepo>,
    pub repo_catalog: Box<dyn AbsCatalogStore>,
    pub repo_identity: Box<dyn AbsIdentityStore>,
    pub logctx: Arc<AppLogContext>,
}

impl CreateSubscriptionUseCase {
    pub async fn execute(
        self,
        req: SubscriptionCreateReqDto,
    ) -> DefaultResult<SubscriptionModel, CreateSubscriptionUsKsErr> {
        let rs_customer = self.repo_identity.resolve_customer(req.subscriber_id).await;
        let rs_product = self.repo_catalog.get_product(req.product_id).await;
        let (customer, product) = match (rs_customer, rs_product) {
            (Ok(c), Ok(p)) => (c.filter(|c| c.active), p),
            (rs_c, rs_p) => {
                let errors = [rs_c.err(), rs_p.err()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>();
                let logctx_p = &self.logctx;
                app_log_event!(logctx_p, AppLogLevel::ERROR, "lookup-fail: {:?}", errors);
                return Err(CreateSubscriptionUsKsErr::Server(errors));
            }
        };
        // start date defaults to the date this request arrives
        let today = LocalTime::now().date_naive();
        let sub = SubscriptionModel::try_new(&req, customer.as_ref(), product.as_ref(), today)
            .map_err(CreateSubscriptionUsKsErr::ReqContent)?;
        if let Err(e) = self.repo_sub.create(&sub).await {
            let logctx_p = &self.logctx;
            app_log_event!(logctx_p, AppLogLevel::ERROR, "repo-fail-save: {e}");
            return Err(CreateSubscriptionUsKsErr::Server(vec![e]));
        }
        Ok(sub)
    }
} // end of impl CreateSubscriptionUseCase

enum TickTaskOutput {
    Skipped,
    Terminal,
    Delivered { oid: String, exhausted: bool },
    // the counter was already decremented when the placement failed
    PlaceFailed { reason: String, exhausted: bool },
    Failed(String),
}

/// Daily batch over all active subscriptions. Each subscription is handled in
/// its own task; ticks on the same subscription are serialized by the locked
/// read-modify-write in the repository.
pub struct RunDailyTickUseCase {
    pub repo_sub: Arc<Box<dyn AbsSubscriptionRepo>>,
    pub place_order: PlaceOrderUseCase,
    pub logctx: Arc<AppLogContext>,
}

impl RunDailyTickUseCase {
    pub async fn execute(
        self,
        date: NaiveDate,
    ) -> DefaultResult<SubscriptionTickReportDto, Vec<AppError>> {
        let sids = self.repo_sub.fetch_active_ids().await.map_err(|e| {
            let logctx_p = &self.logctx;
            app_log_event!(logctx_p, AppLogLevel::ERROR, "load-active-subscriptions, {e}");
            vec![e]
        })?;
        let handles = sids
            .into_iter()
            .map(|sid| {
                let hdl = Self::spawn_one(
                    self.repo_sub.clone(),
                    self.place_order.clone(),
                    self.logctx.clone(),
                    sid.clone(),
                    date,
                );
                (sid, hdl)
            })
            .collect::<Vec<_>>();

        let mut report = SubscriptionTickReportDto::new(date);
        for (sid, hdl) in handles {
            let output = match hdl.await {
                Ok(o) => o,
                Err(e) => TickTaskOutput::Failed(format!("task-join: {e}")),
            };
            match output {
                TickTaskOutput::Skipped => report.skipped.push(sid),
                TickTaskOutput::Terminal => report.terminal.push(sid),
                TickTaskOutput::Delivered { oid, exhausted } => {
                    if exhausted {
                        report.exhausted.push(sid.clone());
                    }
                    let item = SubscriptionDeliveryDto {
                        subscription_id: sid,
                        order_id: oid,
                    };
                    report.delivered.push(item);
                }
                TickTaskOutput::PlaceFailed { reason, exhausted } => {
                    if exhausted {
                        report.exhausted.push(sid.clone());
                    }
                    let item = SubscriptionTickFailureDto {
                        subscription_id: sid,
                        reason,
                    };
                    report.failures.push(item);
                }
                TickTaskOutput::Failed(reason) => {
                    let item = SubscriptionTickFailureDto {
                        subscription_id: sid,
                        reason,
                    };
                    report.failures.push(item);
                }
            }
        } // end of loop
        let logctx_p = &self.logctx;
        app_log_event!(
            logctx_p,
            AppLogLevel::INFO,
            "date:{date}, delivered:{}, exhausted:{}, skipped:{}, failures:{}",
            report.delivered.len(),
            report.exhausted.len(),
            report.skipped.len(),
            report.failures.len()
        );
        Ok(report)
    } // end of fn execute

    fn spawn_one(
        repo: Arc<Box<dyn AbsSubscriptionRepo>>,
        place_order: PlaceOrderUseCase,
        logctx: Arc<AppLogContext>,
        sid: String,
        date: NaiveDate,
    ) -> JoinHandle<TickTaskOutput> {
        tokio::spawn(async move {
            let (outcome, sub) = match repo.tick(sid.as_str(), date, SubscriptionModel::tick).await
            {
                Ok(v) => v,
                Err(e) => {
                    app_log_event!(logctx, AppLogLevel::ERROR, "sid:{sid}, tick-fail, {e}");
                    return TickTaskOutput::Failed(format!("{:?}", e.code));
                }
            };
            let exhausted = match outcome {
                SubscriptionTickOutcome::Skipped => return TickTaskOutput::Skipped,
                SubscriptionTickOutcome::Terminal => return TickTaskOutput::Terminal,
                SubscriptionTickOutcome::Deliver { exhausted } => exhausted,
            };
            let req = Self::delivery_request(&sub);
            match place_order.execute(req).await {
                Ok(ms) => TickTaskOutput::Delivered {
                    oid: ms.header().id_.clone(),
                    exhausted,
                },
                Err(e) => {
                    let reason = match e {
                        PlaceOrderUsKsErr::ReqContent(dto) => format!("{:?}", dto.reason),
                        PlaceOrderUsKsErr::Server(_es) => "internal-error".to_string(),
                    };
                    app_log_event!(
                        logctx,
                        AppLogLevel::WARNING,
                        "sid:{sid}, delivery-not-placed, reason:{reason}, days-left:{}",
                        sub.remaining_days()
                    );
                    TickTaskOutput::PlaceFailed { reason, exhausted }
                }
            }
        })
    } // end of fn spawn_one

    // cash on delivery, shipped to the address in the subscriber profile
    fn delivery_request(sub: &SubscriptionModel) -> OrderCreateReqData {
        let header = OrderHeaderReqDto {
            customer_id: sub.subscriber_id,
            address: None,
            cod: true,
        };
        let line = OrderLineReqDto {
            product_id: sub.product_id,
            quantity: sub.quantity as i64,
        };
        OrderCreateReqData {
            header,
            lines: vec![line],
        }
    }
} // end of impl RunDailyTickUseCase
