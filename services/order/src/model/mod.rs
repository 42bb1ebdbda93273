mod customer;
mod order;
mod product;
mod subscription;

pub use customer::CustomerModel;
pub use order::{OrderHeaderModel, OrderLineModel, OrderModelSet};
pub use product::ProductModel;
pub use subscription::{SubscriptionModel, SubscriptionTickOutcome, WeekdayPattern};
