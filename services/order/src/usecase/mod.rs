mod ledger;
mod place_order;
mod subscription;

pub use ledger::{
    open_order, AdvanceOrderStatusUsKsErr, AdvanceOrderStatusUseCase, FetchOrderUsKsErr,
    FetchOrderUseCase, ListCustomerOrdersUseCase, OpenOrderUsKsErr,
};
pub use place_order::{PlaceOrderUsKsErr, PlaceOrderUseCase};
pub use subscription::{
    CreateSubscriptionUsKsErr, CreateSubscriptionUseCase, RunDailyTickUseCase,
};
