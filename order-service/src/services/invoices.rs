use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Bson, Document, doc, from_document, to_bson},
    options::{FindOneOptions, UpdateOptions},
};
use serde::Deserialize;

use super::database::{MongoDb, USERS_COLLECTION};
use super::error::StoreError;
use super::store::{AppendGuard, InvoiceStore};
use crate::models::{Invoice, InvoiceBook, InvoiceStats, OrderStatus};

/// Invoices stored in the `invoices` array of each user document.
#[derive(Clone)]
pub struct MongoInvoiceStore {
    users: Collection<Document>,
}

#[derive(Debug, Deserialize)]
struct InvoicesOnly {
    #[serde(default)]
    invoices: Vec<Invoice>,
}

impl MongoInvoiceStore {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            users: db.collection(USERS_COLLECTION),
        }
    }

    /// Update addressed by the element's embedded id via an array filter,
    /// optionally conditioned on the element's current status.
    async fn update_element(
        &self,
        user_id: &str,
        invoice_id: &str,
        expected: Option<OrderStatus>,
        set: Document,
    ) -> Result<bool, StoreError> {
        let mut element = doc! { "_id": invoice_id };
        let mut array_filter = doc! { "elem._id": invoice_id };
        if let Some(status) = expected {
            element.insert("order.status", status.as_str());
            array_filter.insert("elem.order.status", status.as_str());
        }

        let options = UpdateOptions::builder()
            .array_filters(vec![array_filter])
            .build();
        let result = self
            .users
            .update_one(
                doc! { "_id": user_id, "invoices": { "$elemMatch": element } },
                doc! { "$set": set },
                options,
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

fn number(doc: &Document, key: &str) -> f64 {
    match doc.get(key) {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => *v as f64,
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

#[async_trait]
impl InvoiceStore for MongoInvoiceStore {
    async fn user_invoices(&self, user_id: &str) -> Result<Option<InvoiceBook>, StoreError> {
        let options = FindOneOptions::builder()
            .projection(doc! { "invoices": 1 })
            .build();
        let found = self
            .users
            .clone_with_type::<InvoicesOnly>()
            .find_one(doc! { "_id": user_id }, options)
            .await?;
        Ok(found.map(|doc| InvoiceBook::new(doc.invoices)))
    }

    #[tracing::instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn push_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        guard: AppendGuard,
    ) -> Result<bool, StoreError> {
        let mut filter = doc! { "_id": user_id };
        if guard == AppendGuard::NoPendingInvoice {
            filter.insert(
                "invoices.order.status",
                doc! { "$ne": OrderStatus::Pending.as_str() },
            );
        }

        let result = self
            .users
            .update_one(
                filter,
                doc! { "$push": { "invoices": to_bson(invoice)? } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    #[tracing::instrument(skip(self, invoice), fields(invoice_id = %invoice.id))]
    async fn replace_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        expected: OrderStatus,
    ) -> Result<bool, StoreError> {
        self.update_element(
            user_id,
            &invoice.id,
            Some(expected),
            doc! { "invoices.$[elem]": to_bson(invoice)? },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn archive_invoice(&self, user_id: &str, invoice_id: &str) -> Result<bool, StoreError> {
        self.update_element(
            user_id,
            invoice_id,
            None,
            doc! { "invoices.$[elem].archived": true },
        )
        .await
    }

    async fn find_invoice_owner(&self, invoice_id: &str) -> Result<Option<String>, StoreError> {
        let options = FindOneOptions::builder().projection(doc! { "_id": 1 }).build();
        let owner = self
            .users
            .find_one(doc! { "invoices._id": invoice_id }, options)
            .await?;
        Ok(owner.and_then(|d| d.get_str("_id").ok().map(str::to_string)))
    }

    #[tracing::instrument(skip(self))]
    async fn list_invoices(&self, skip: i64, limit: i64) -> Result<Vec<Invoice>, StoreError> {
        let pipeline = vec![
            doc! { "$unwind": "$invoices" },
            doc! { "$replaceRoot": { "newRoot": "$invoices" } },
            doc! { "$sort": { "date": -1 } },
            doc! { "$skip": skip },
            doc! { "$limit": limit },
        ];
        let cursor = self.users.aggregate(pipeline, None).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        docs.into_iter()
            .map(|d| from_document::<Invoice>(d).map_err(StoreError::from))
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn invoice_stats(&self) -> Result<InvoiceStats, StoreError> {
        let pipeline = vec![
            doc! { "$unwind": "$invoices" },
            doc! { "$match": { "invoices.order.status": OrderStatus::Paid.as_str() } },
            doc! { "$group": {
                "_id": Bson::Null,
                "earnings": { "$sum": "$invoices.totalPrice" },
                "orderCount": { "$sum": 1 },
                "productsSold": { "$sum": { "$sum": "$invoices.order.products.quantity" } },
            } },
        ];
        let mut cursor = self.users.aggregate(pipeline, None).await?;

        let Some(totals) = cursor.try_next().await? else {
            return Ok(InvoiceStats::default());
        };

        let earnings = number(&totals, "earnings");
        let order_count = number(&totals, "orderCount") as u64;
        Ok(InvoiceStats {
            earnings,
            order_count,
            average_spending: if order_count > 0 {
                earnings / order_count as f64
            } else {
                0.0
            },
            products_sold: number(&totals, "productsSold") as i64,
        })
    }
}
