use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Document, doc, to_bson, to_document},
    options::{FindOneOptions, FindOptions},
};

use super::database::{MongoDb, USERS_COLLECTION, is_duplicate_key};
use super::error::StoreError;
use super::store::UserStore;
use crate::models::{ProfileUpdate, Role, User};

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            users: db.collection(USERS_COLLECTION),
        }
    }

    fn without_invoices() -> FindOneOptions {
        FindOneOptions::builder()
            .projection(doc! { "invoices": 0 })
            .build()
    }

    async fn set_fields(&self, user_id: &str, set: Document) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(doc! { "_id": user_id }, doc! { "$set": set }, None)
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.insert_one(user, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate("email".to_string())
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .find_one(doc! { "_id": id }, Self::without_invoices())
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .find_one(doc! { "email": email }, Self::without_invoices())
            .await?)
    }

    #[tracing::instrument(skip(self, roles))]
    async fn set_roles(&self, user_id: &str, roles: &[Role]) -> Result<bool, StoreError> {
        self.set_fields(user_id, doc! { "roles": to_bson(roles)? })
            .await
    }

    async fn set_device_token(&self, user_id: &str, token: &str) -> Result<bool, StoreError> {
        self.set_fields(user_id, doc! { "deviceToken": token }).await
    }

    async fn device_tokens(&self) -> Result<Vec<String>, StoreError> {
        let options = FindOptions::builder()
            .projection(doc! { "deviceToken": 1 })
            .build();
        let cursor = self
            .users
            .clone_with_type::<Document>()
            .find(
                doc! {
                    "archived": { "$ne": true },
                    "deviceToken": { "$exists": true, "$ne": "" },
                },
                options,
            )
            .await?;

        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_str("deviceToken").ok())
            .map(str::to_string)
            .collect())
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<bool, StoreError> {
        if changes.is_empty() {
            return Ok(self.find_user(user_id).await?.is_some());
        }
        self.set_fields(user_id, to_document(changes)?).await
    }

    #[tracing::instrument(skip(self, password_hash))]
    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<bool, StoreError> {
        self.set_fields(user_id, doc! { "password": password_hash })
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn archive_user(&self, user_id: &str) -> Result<bool, StoreError> {
        self.set_fields(user_id, doc! { "archived": true }).await
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let options = FindOptions::builder()
            .projection(doc! { "invoices": 0 })
            .sort(doc! { "_id": 1 })
            .skip(u64::try_from(skip).unwrap_or(0))
            .limit(limit)
            .build();
        let cursor = self
            .users
            .find(doc! { "archived": { "$ne": true } }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        Ok(self
            .users
            .count_documents(doc! { "archived": { "$ne": true } }, None)
            .await?)
    }
}
