use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

/// Stock position for one product across the warehouse and its outlets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub warehouse_stock: u32,
    #[serde(default)]
    pub outlet_stocks: BTreeMap<String, u32>,
    #[serde(default)]
    pub sales_velocity: BTreeMap<String, f64>,
}

impl Product {
    pub fn new(product_id: impl Into<String>, warehouse_stock: u32) -> Self {
        Self {
            product_id: product_id.into(),
            warehouse_stock,
            outlet_stocks: BTreeMap::new(),
            sales_velocity: BTreeMap::new(),
        }
    }

    pub fn with_outlet(mut self, outlet_id: impl Into<String>, stock: u32, velocity: f64) -> Self {
        let outlet_id = outlet_id.into();
        self.outlet_stocks.insert(outlet_id.clone(), stock);
        self.sales_velocity.insert(outlet_id, velocity);
        self
    }

    pub fn outlet_stock(&self, outlet_id: &str) -> u32 {
        self.outlet_stocks.get(outlet_id).copied().unwrap_or(0)
    }

    pub fn velocity(&self, outlet_id: &str) -> f64 {
        self.sales_velocity.get(outlet_id).copied().unwrap_or(0.0)
    }

    pub fn total_velocity(&self) -> f64 {
        self.sales_velocity.values().sum()
    }
}

/// Products handed to a sweep. Owned by the caller and never mutated here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub products: Vec<Product>,
}

impl Dataset {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.products
            .iter()
            .find(|product| product.product_id == product_id)
    }

    /// Every outlet known from stock or velocity entries.
    pub fn outlets(&self) -> BTreeSet<&str> {
        self.products
            .iter()
            .flat_map(|product| {
                product
                    .outlet_stocks
                    .keys()
                    .chain(product.sales_velocity.keys())
                    .map(String::as_str)
            })
            .collect()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads one row per product/outlet pair with the headers
    /// `product_id,outlet_id,warehouse_stock,outlet_stock,sales_velocity`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut products: Vec<Product> = Vec::new();
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();

        for (line, row) in csv_reader.deserialize::<StockRow>().enumerate() {
            let row = row?;
            if !row.sales_velocity.is_finite() || row.sales_velocity < 0.0 {
                return Err(DatasetError::InvalidVelocity {
                    line: line + 2,
                    product_id: row.product_id,
                    outlet_id: row.outlet_id,
                });
            }

            let index = match positions.get(&row.product_id) {
                Some(index) => {
                    let existing = products[*index].warehouse_stock;
                    if existing != row.warehouse_stock {
                        return Err(DatasetError::ConflictingWarehouseStock {
                            product_id: row.product_id,
                            first: existing,
                            second: row.warehouse_stock,
                        });
                    }
                    *index
                }
                None => {
                    products.push(Product::new(row.product_id.clone(), row.warehouse_stock));
                    positions.insert(row.product_id.clone(), products.len() - 1);
                    products.len() - 1
                }
            };

            if row.outlet_id.is_empty() {
                continue;
            }
            let product = &mut products[index];
            product
                .outlet_stocks
                .insert(row.outlet_id.clone(), row.outlet_stock);
            product
                .sales_velocity
                .insert(row.outlet_id, row.sales_velocity);
        }

        Ok(Self { products })
    }
}

#[derive(Debug, Deserialize)]
struct StockRow {
    product_id: String,
    #[serde(default)]
    outlet_id: String,
    warehouse_stock: u32,
    #[serde(default)]
    outlet_stock: u32,
    #[serde(default)]
    sales_velocity: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read stock export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid stock CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: sales velocity for {product_id}@{outlet_id} must be a non-negative number")]
    InvalidVelocity {
        line: usize,
        product_id: String,
        outlet_id: String,
    },
    #[error("product {product_id} lists warehouse stock {first} and {second}")]
    ConflictingWarehouseStock {
        product_id: String,
        first: u32,
        second: u32,
    },
}
