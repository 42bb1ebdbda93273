use std::collections::HashMap;

use mrmilk_order::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchKeys,
    AppInMemUpdateData, AppInMemoryDStore,
};
use mrmilk_order::error::AppErrorCode;
use mrmilk_order::AppInMemoryDbCfg;

const UT_TABLE_LABEL_A: &str = "milk-bottle";
const UT_TABLE_LABEL_B: &str = "milk-route";

fn ut_row(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

async fn ut_setup_dstore(max_items: u32) -> AppInMemoryDStore {
    let cfg = AppInMemoryDbCfg {
        alias: "Holstein".to_string(),
        max_items,
    };
    let dstore = AppInMemoryDStore::new(&cfg);
    for label in [UT_TABLE_LABEL_A, UT_TABLE_LABEL_B] {
        let result = dstore.create_table(label).await;
        assert!(result.is_ok());
    }
    dstore
}

fn ut_sample_data() -> AppInMemUpdateData {
    let t1 = HashMap::from([
        ("B01".to_string(), ut_row(&["whole", "2.35", "1000"])),
        ("B02".to_string(), ut_row(&["skimmed", "2.10", "500"])),
    ]);
    let t2 = HashMap::from([("R9".to_string(), ut_row(&["north", "mon-thu"]))]);
    HashMap::from([
        (UT_TABLE_LABEL_A.to_string(), t1),
        (UT_TABLE_LABEL_B.to_string(), t2),
    ])
}

#[tokio::test]
async fn save_fetch_ok() {
    let dstore = ut_setup_dstore(10).await;
    let result = dstore.save(ut_sample_data()).await;
    assert_eq!(result.unwrap(), 3);
    let keys: AppInMemFetchKeys = HashMap::from([
        (UT_TABLE_LABEL_A.to_string(), ut_row(&["B02", "B77"])),
        (UT_TABLE_LABEL_B.to_string(), ut_row(&["R9"])),
    ]);
    let fetched = dstore.fetch(keys).await.unwrap();
    {
        let table = fetched.get(UT_TABLE_LABEL_A).unwrap();
        assert_eq!(table.len(), 1);
        let row = table.get("B02").unwrap();
        assert_eq!(row.as_slice(), ["skimmed", "2.10", "500"]);
        // missing identifiers are simply omitted
        assert!(table.get("B77").is_none());
    }
    {
        let table = fetched.get(UT_TABLE_LABEL_B).unwrap();
        assert_eq!(table.get("R9").unwrap()[0].as_str(), "north");
    }
    // creating the same table again keeps existing rows
    dstore.create_table(UT_TABLE_LABEL_A).await.unwrap();
    let keys = HashMap::from([(UT_TABLE_LABEL_A.to_string(), ut_row(&["B01"]))]);
    let fetched = dstore.fetch(keys).await.unwrap();
    assert_eq!(fetched[UT_TABLE_LABEL_A].len(), 1);
} // end of fn save_fetch_ok

#[tokio::test]
async fn save_overwrite_existing_row() {
    let dstore = ut_setup_dstore(2).await;
    dstore.save(ut_sample_data()).await.unwrap();
    // updating existing rows does not count against the capacity
    let t1 = HashMap::from([("B01".to_string(), ut_row(&["whole", "2.55", "990"]))]);
    let data = HashMap::from([(UT_TABLE_LABEL_A.to_string(), t1)]);
    let result = dstore.save(data).await;
    assert_eq!(result.unwrap(), 1);
    let keys = HashMap::from([(UT_TABLE_LABEL_A.to_string(), ut_row(&["B01"]))]);
    let fetched = dstore.fetch(keys).await.unwrap();
    assert_eq!(fetched[UT_TABLE_LABEL_A]["B01"][1].as_str(), "2.55");
}

#[tokio::test]
async fn save_exceed_limit() {
    let dstore = ut_setup_dstore(2).await;
    dstore.save(ut_sample_data()).await.unwrap();
    let t1 = HashMap::from([("B03".to_string(), ut_row(&["goat", "3.80", "20"]))]);
    let t2 = HashMap::from([("R10".to_string(), ut_row(&["east", "fri"]))]);
    let data = HashMap::from([
        (UT_TABLE_LABEL_A.to_string(), t1),
        (UT_TABLE_LABEL_B.to_string(), t2),
    ]);
    let error = dstore.save(data).await.unwrap_err();
    assert_eq!(error.code, AppErrorCode::ExceedingMaxLimit);
    // nothing written, table B would have been fine alone
    let keys = HashMap::from([(UT_TABLE_LABEL_B.to_string(), ut_row(&["R10"]))]);
    let fetched = dstore.fetch(keys).await.unwrap();
    assert!(fetched[UT_TABLE_LABEL_B].is_empty());
}

#[tokio::test]
async fn access_nonexistent_table() {
    let dstore = ut_setup_dstore(10).await;
    let t1 = HashMap::from([("X1".to_string(), ut_row(&["x"]))]);
    let data = HashMap::from([("sour-cream".to_string(), t1)]);
    let error = dstore.save(data).await.unwrap_err();
    assert_eq!(error.code, AppErrorCode::DataTableNotExist);
    assert_eq!(error.detail.as_deref(), Some("sour-cream"));

    let keys = HashMap::from([("sour-cream".to_string(), ut_row(&["X1"]))]);
    let error = dstore.fetch(keys).await.unwrap_err();
    assert_eq!(error.code, AppErrorCode::DataTableNotExist);
}

#[tokio::test]
async fn fetch_acquire_save_release() {
    let dstore = ut_setup_dstore(10).await;
    dstore.save(ut_sample_data()).await.unwrap();
    let keys = HashMap::from([(UT_TABLE_LABEL_A.to_string(), ut_row(&["B02"]))]);
    let (mut fetched, lock) = dstore.fetch_acquire(keys).await.unwrap();
    let mut row = fetched
        .get_mut(UT_TABLE_LABEL_A)
        .unwrap()
        .remove("B02")
        .unwrap();
    row[2] = "499".to_string();
    let data = HashMap::from([(
        UT_TABLE_LABEL_A.to_string(),
        HashMap::from([("B02".to_string(), row)]),
    )]);
    let result = dstore.save_release(data, lock);
    assert_eq!(result.unwrap(), 1);
    // lock released, other callers can proceed
    let keys = HashMap::from([(UT_TABLE_LABEL_A.to_string(), ut_row(&["B02"]))]);
    let fetched = dstore.fetch(keys).await.unwrap();
    assert_eq!(fetched[UT_TABLE_LABEL_A]["B02"][2].as_str(), "499");
}

struct UtPriceAboveFilter(f32);

impl AbsDStoreFilterKeyOp for UtPriceAboveFilter {
    fn filter(&self, _k: &str, v: &[String]) -> bool {
        v.get(1)
            .and_then(|p| p.parse::<f32>().ok())
            .map(|p| p > self.0)
            .unwrap_or(false)
    }
}

#[tokio::test]
async fn filter_keys_ok() {
    let dstore = ut_setup_dstore(10).await;
    dstore.save(ut_sample_data()).await.unwrap();
    let op = UtPriceAboveFilter(2.2);
    let keys = dstore
        .filter_keys(UT_TABLE_LABEL_A.to_string(), &op)
        .await
        .unwrap();
    assert_eq!(keys, vec!["B01".to_string()]);
    let error = dstore
        .filter_keys("cheddar".to_string(), &op)
        .await
        .unwrap_err();
    assert_eq!(error.code, AppErrorCode::DataTableNotExist);
}
