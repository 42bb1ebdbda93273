use crate::WebApiHdlrLabel;

pub mod app_meta {
    pub const MACHINE_CODE: u8 = 1;
}

pub mod hard_limit {
    pub const MAX_ITEMS_STORED_PER_MODEL: u32 = 2200u32;
    pub const MAX_ORDER_LINES_PER_REQUEST: usize = 200;
    pub const MAX_DB_CONNECTIONS: u32 = 10000u32;
    pub const MAX_SECONDS_DB_IDLE: u16 = 600u16;
    // batch size of a single INSERT statement
    pub const MAX_ORDER_LINES_PER_INSERT: usize = 50;
}

// the order is deliverable one day after it is placed
pub const DEFAULT_DELIVERY_DAYS: u64 = 1;

pub(crate) mod api {
    use super::WebApiHdlrLabel;

    #[allow(non_camel_case_types)]
    pub(crate) struct web {}

    impl web {
        pub(crate) const PLACE_NEW_ORDER: WebApiHdlrLabel = "place_new_order";
        pub(crate) const ACCESS_EXISTING_ORDER: WebApiHdlrLabel = "access_existing_order";
        pub(crate) const ADVANCE_ORDER_STATUS: WebApiHdlrLabel = "advance_order_status";
        pub(crate) const LIST_CUSTOMER_ORDERS: WebApiHdlrLabel = "list_customer_orders";
        pub(crate) const CREATE_SUBSCRIPTION: WebApiHdlrLabel = "create_subscription";
        pub(crate) const RUN_SUBSCRIPTION_TICK: WebApiHdlrLabel = "run_subscription_tick";
    }
}

pub(crate) const HTTP_CONTENT_TYPE_JSON: &str = "application/json";

// 10 digits, or 11 digits starting with zero
pub(crate) const REGEX_PHONE_NATIONAL: &str = r"^[0][1-9]\d{9}$|^[1-9]\d{9}$";

pub(crate) const REGEX_EMAIL_RFC5322 : &str = r#"(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:(2(5[0-5]|[0-4][0-9])|1[0-9][0-9]|[1-9]?[0-9]))\.){3}(?:(2(5[0-5]|[0-4][0-9])|1[0-9][0-9]|[1-9]?[0-9])|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])"#;
