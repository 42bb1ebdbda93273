use std::boxed::Box;
use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::Arc;

use async_trait::async_trait;

use crate::datastore::{
    AbsDStoreFilterKeyOp, AbstInMemoryDStore, AppInMemFetchedSingleRow, AppInMemFetchedSingleTable,
};
use crate::error::{AppError, AppErrorCode};
use crate::model::CustomerModel;

use super::super::AbsIdentityStore;
use super::{column_to_flag, flag_to_column, parse_column};

const TABLE_LABEL: &str = "customer_profile";

#[rustfmt::skip]
enum InMemColIdx {
    Phone, Name, Email, Address, Active, Staff, Superuser,
}
impl From<InMemColIdx> for usize {
    fn from(value: InMemColIdx) -> usize {
        match value {
            InMemColIdx::Phone => 0,
            InMemColIdx::Name => 1,
            InMemColIdx::Email => 2,
            InMemColIdx::Address => 3,
            InMemColIdx::Active => 4,
            InMemColIdx::Staff => 5,
            InMemColIdx::Superuser => 6,
        }
    }
}

impl From<&CustomerModel> for AppInMemFetchedSingleRow {
    fn from(value: &CustomerModel) -> Self {
        vec![
            value.phone.clone(),
            value.name.clone(),
            value.email.clone(),
            value.address.clone(),
            flag_to_column(value.active),
            flag_to_column(value.is_staff),
            flag_to_column(value.is_superuser),
        ]
    }
}

struct InnerPhoneFilterOp<'a>(&'a [CustomerModel]);

impl AbsDStoreFilterKeyOp for InnerPhoneFilterOp<'_> {
    fn filter(&self, _k: &str, v: &[String]) -> bool {
        let idx: usize = InMemColIdx::Phone.into();
        v.get(idx)
            .map(|phone| self.0.iter().any(|c| c.phone == *phone))
            .unwrap_or(false)
    }
}

pub struct IdentityInMemStore {
    datastore: Arc<Box<dyn AbstInMemoryDStore>>,
}

impl IdentityInMemStore {
    pub async fn new(m: Arc<Box<dyn AbstInMemoryDStore>>) -> DefaultResult<Self, AppError> {
        m.create_table(TABLE_LABEL).await?;
        Ok(Self { datastore: m })
    }
}

#[async_trait]
impl AbsIdentityStore for IdentityInMemStore {
    async fn resolve_customer(&self, id: u32) -> DefaultResult<Option<CustomerModel>, AppError> {
        let key = id.to_string();
        let info = HashMap::from([(TABLE_LABEL.to_string(), vec![key.clone()])]);
        let mut fetched = self.datastore.fetch(info).await?;
        let row = match fetched.remove(TABLE_LABEL).and_then(|mut t| t.remove(&key)) {
            Some(r) => r,
            None => return Ok(None),
        };
        let obj = CustomerModel {
            id,
            phone: parse_column(&row, InMemColIdx::Phone.into(), TABLE_LABEL)?,
            name: parse_column(&row, InMemColIdx::Name.into(), TABLE_LABEL)?,
            email: parse_column(&row, InMemColIdx::Email.into(), TABLE_LABEL)?,
            address: parse_column(&row, InMemColIdx::Address.into(), TABLE_LABEL)?,
            active: column_to_flag(&row, InMemColIdx::Active.into()),
            is_staff: column_to_flag(&row, InMemColIdx::Staff.into()),
            is_superuser: column_to_flag(&row, InMemColIdx::Superuser.into()),
        };
        Ok(Some(obj))
    }

    async fn save(&self, items: Vec<CustomerModel>) -> DefaultResult<(), AppError> {
        for c in items.iter() {
            c.validate()?;
        }
        let op = InnerPhoneFilterOp(items.as_slice());
        let owner_ids = self.datastore.filter_keys(TABLE_LABEL.to_string(), &op).await?;
        let info = HashMap::from([(TABLE_LABEL.to_string(), owner_ids)]);
        let (mut fetched, lock) = self.datastore.fetch_acquire(info).await?;
        let taken = fetched
            .remove(TABLE_LABEL)
            .unwrap_or_default()
            .into_iter()
            .map(|(k, row)| -> DefaultResult<(String, u32), AppError> {
                let owner = k.parse::<u32>().map_err(|e| AppError {
                    code: AppErrorCode::DataCorruption,
                    detail: Some(format!("{TABLE_LABEL}, id:{k}, {e}")),
                })?;
                let phone = parse_column::<String>(&row, InMemColIdx::Phone.into(), TABLE_LABEL)?;
                Ok((phone, owner))
            })
            .collect::<DefaultResult<Vec<_>, _>>()?;
        CustomerModel::check_phone_unique(items.as_slice(), taken)?;

        let table = items
            .iter()
            .map(|m| (m.id.to_string(), AppInMemFetchedSingleRow::from(m)))
            .collect::<AppInMemFetchedSingleTable>();
        let data = HashMap::from([(TABLE_LABEL.to_string(), table)]);
        let _num = self.datastore.save_release(data, lock)?;
        Ok(())
    }
}
