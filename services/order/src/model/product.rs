use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct ProductModel {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    pub available: u32, // number of items on hand
}
