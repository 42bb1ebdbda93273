use std::boxed::Box;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use axum::body::Body as AxumBody;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use mrmilk_common::confidentiality::AbstractConfidentiality;
use mrmilk_common::error::AppConfidentialityError;
use mrmilk_common::logging::AppLogContext;

use mrmilk_order::api::web::route_table;
use mrmilk_order::constant::hard_limit;
use mrmilk_order::model::{CustomerModel, ProductModel};
use mrmilk_order::network::{app_web_service, WebServiceRoute};
use mrmilk_order::repository::{app_repo_catalog, app_repo_identity};
use mrmilk_order::{AppBasepathCfg, AppCfgHardLimit, AppConfig, AppSharedState};

pub(crate) const ITEST_CFG_FPATH: &str = "tests/integration/examples/app_config.json";

struct ITestConfidential;

impl AbstractConfidentiality for ITestConfidential {
    fn try_get_payload(&self, _id: &str) -> Result<String, AppConfidentialityError> {
        Ok("integration-test".to_string())
    }
}

pub(crate) fn itest_basepath() -> String {
    env!("CARGO_MANIFEST_DIR").to_string() + "/"
}

// each test case gets its own state, so does the in-memory store
pub(crate) fn itest_setup_shr_state() -> AppSharedState {
    let basepath = itest_basepath();
    let limit = AppCfgHardLimit {
        nitems_per_inmem_table: hard_limit::MAX_ITEMS_STORED_PER_MODEL,
        num_db_conns: hard_limit::MAX_DB_CONNECTIONS,
        seconds_db_idle: hard_limit::MAX_SECONDS_DB_IDLE,
    };
    let api_server = AppConfig::parse_from_file(basepath.clone() + ITEST_CFG_FPATH, limit).unwrap();
    let cfg = AppConfig {
        basepath: AppBasepathCfg {
            system: basepath.clone(),
            service: basepath,
        },
        api_server,
    };
    let logctx = AppLogContext::new(&cfg.basepath, &cfg.api_server.logging);
    let cfdntl: Box<dyn AbstractConfidentiality> = Box::new(ITestConfidential);
    AppSharedState::new(cfg, Arc::new(logctx), cfdntl)
}

pub(crate) async fn itest_seed_stores(shr_state: &AppSharedState) {
    let ds = shr_state.datastore();
    let catalog = app_repo_catalog(ds.clone()).await.unwrap();
    let products = [(1001u64, "10.00"), (1002, "5.00")]
        .into_iter()
        .map(|(id, price)| ProductModel {
            id,
            name: format!("bottled-milk-{id}"),
            price: price.parse().unwrap(),
            available: 120,
        })
        .collect::<Vec<_>>();
    catalog.save(products).await.unwrap();
    let identity = app_repo_identity(ds).await.unwrap();
    let customer = CustomerModel::try_new(
        81,
        "9876543210",
        "Butter Cup",
        "butter.cup@mrmilk.example.com",
        "8 Meadow Road",
    )
    .unwrap();
    let mut retired = CustomerModel::try_new(
        82,
        "9876543211",
        "Old Bess",
        "old.bess@mrmilk.example.com",
        "9 Meadow Road",
    )
    .unwrap();
    retired.active = false;
    identity.save(vec![customer, retired]).await.unwrap();
}

pub(crate) struct TestWebServer {
    srv: WebServiceRoute,
    pub api_version: String,
}

impl TestWebServer {
    pub(crate) fn setup(shr_state: AppSharedState) -> Self {
        let cfg = shr_state.config().clone();
        let listener = &cfg.api_server.listen;
        let (srv, num_applied) = app_web_service(listener, route_table(), shr_state);
        assert!(num_applied > 0);
        Self {
            srv,
            api_version: listener.api_version.clone(),
        }
    }

    pub(crate) async fn consume(
        &self,
        method: &str,
        path: &str,
        body: Option<String>,
    ) -> (StatusCode, serde_json::Value) {
        let uri = format!("/{}{}", self.api_version, path);
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        let req = builder
            .body(body.map(AxumBody::from).unwrap_or_else(AxumBody::empty))
            .unwrap();
        // the router is cloned per request, the state inside is shared
        let resp = self.srv.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let raw = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if raw.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&raw).unwrap()
        };
        (status, value)
    }
} // end of impl TestWebServer

pub(crate) fn deserialize_json_template<T: DeserializeOwned>(fname: &str) -> T {
    let fullpath = itest_basepath() + "tests/integration/examples/" + fname;
    let f = File::open(fullpath).unwrap();
    serde_json::from_reader::<BufReader<File>, T>(BufReader::new(f)).unwrap()
}
