use std::boxed::Box;

use mrmilk_order::api::web::route_table;
use mrmilk_order::error::AppErrorCode;
use mrmilk_order::network::{app_web_service, middleware, net_listener};

use crate::{ut_service_basepath, ut_setup_share_state, MockConfidential, EXAMPLE_REL_PATH};

#[tokio::test]
async fn gen_web_service_ok() {
    let cfdntl = Box::new(MockConfidential {});
    let shr_state = ut_setup_share_state("config_ok.json", cfdntl);
    let cfg = shr_state.config().clone();
    let (_router, num_applied) =
        app_web_service(&cfg.api_server.listen, route_table(), shr_state);
    // the route to unknown handler is skipped
    assert_eq!(num_applied, 6);
}

#[test]
fn cors_cfg_ok() {
    let path = ut_service_basepath() + EXAMPLE_REL_PATH + "cors_ok.json";
    let result = middleware::cors(path);
    assert!(result.is_ok());
}

#[test]
fn cors_cfg_error() {
    let path = ut_service_basepath() + EXAMPLE_REL_PATH + "cors_no_ctype.json";
    let error = middleware::cors(path).err().unwrap();
    assert_eq!(error.code, AppErrorCode::InvalidInput);
    let path = ut_service_basepath() + EXAMPLE_REL_PATH + "cors_nonexist.json";
    let error = middleware::cors(path).err().unwrap();
    assert!(matches!(error.code, AppErrorCode::IOerror(_)));
}

#[tokio::test]
async fn bind_listener_ok() {
    let result = net_listener("localhost".to_string(), 0).await;
    let listener = result.unwrap();
    let addr = listener.local_addr().unwrap();
    assert!(addr.port() > 0);
}
