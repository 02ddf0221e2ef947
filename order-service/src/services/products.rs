use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{Collection, bson::doc, options::FindOptions};

use super::database::{MongoDb, PRODUCTS_COLLECTION};
use super::error::StoreError;
use super::store::ProductCatalog;
use crate::models::Product;

#[derive(Clone)]
pub struct MongoProductCatalog {
    products: Collection<Product>,
}

impl MongoProductCatalog {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            products: db.collection(PRODUCTS_COLLECTION),
        }
    }
}

#[async_trait]
impl ProductCatalog for MongoProductCatalog {
    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products.find_one(doc! { "_id": id }, None).await?)
    }

    async fn product_by_reference(&self, reference: &str) -> Result<Option<Product>, StoreError> {
        Ok(self
            .products
            .find_one(doc! { "reference": reference }, None)
            .await?)
    }

    async fn list_products(&self, skip: i64, limit: i64) -> Result<Vec<Product>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "name": 1 })
            .skip(u64::try_from(skip).unwrap_or(0))
            .limit(limit)
            .build();
        let cursor = self
            .products
            .find(doc! { "archived": { "$ne": true } }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .products
            .find(doc! { "_id": { "$in": ids } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
