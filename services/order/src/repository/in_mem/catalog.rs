use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use crate::datastore::{AbstInMemoryDStore, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable};
use crate::error::AppError;
use crate::model::ProductModel;

use super::super::AbsCatalogStore;
use super::parse_column;

const TABLE_LABEL: &str = "catalog_product";

#[rustfmt::skip]
enum InMemColIdx {Name, Price, Available}
impl From<InMemColIdx> for usize {
    fn from(value: InMemColIdx) -> usize {
        match value {
            InMemColIdx::Name => 0,
            InMemColIdx::Price => 1,
            InMemColIdx::Available => 2,
        }
    }
}

impl From<&ProductModel> for AppInMemFetchedSingleRow {
    fn from(value: &ProductModel) -> Self {
        vec![
            value.name.clone(),
            value.price.to_string(),
            value.available.to_string(),
        ]
    }
}

pub struct CatalogInMemStore {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl CatalogInMemStore {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }
}

#[async_trait]
impl AbsCatalogStore for CatalogInMemStore {
    async fn get_product(&self, pid: u64) -> DefaultResult<Option<ProductModel>, AppError> {
        let info = HashMap::from([(TABLE_LABEL.to_string(), vec![pid.to_string()])]);
        let mut fetched = self.datastore.fetch(info).await?;
        let row = fetched
            .remove(TABLE_LABEL)
            .and_then(|mut t| t.remove(pid.to_string().as_str()));
        if let Some(row) = row {
            let obj = ProductModel {
                id: pid,
                name: parse_column(&row, InMemColIdx::Name.into(), TABLE_LABEL)?,
                price: parse_column(&row, InMemColIdx::Price.into(), TABLE_LABEL)?,
                available: parse_column(&row, InMemColIdx::Available.into(), TABLE_LABEL)?,
            };
            Ok(Some(obj))
        } else {
            Ok(None)
        }
    }

    async fn save(&self, items: Vec<ProductModel>) -> DefaultResult<(), AppError> {
        let table = items
            .iter()
            .map(|m| (m.id.to_string(), AppInMemFetchedSingleRow::from(m)))
            .collect::<AppInMemFetchedSingleTable>();
        let data = HashMap::from([(TABLE_LABEL.to_string(), table)]);
        let _num = self.datastore.save(data).await?;
        Ok(())
    }
}
