use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{Collection, bson::doc};

use super::database::{MongoDb, ROLES_COLLECTION, is_duplicate_key};
use super::error::StoreError;
use super::store::RoleStore;
use crate::models::{Permission, Role, new_id};

pub const ADMIN_ROLE: &str = "admin";
pub const USER_ROLE: &str = "user";

#[derive(Clone)]
pub struct MongoRoleStore {
    roles: Collection<Role>,
}

impl MongoRoleStore {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            roles: db.collection(ROLES_COLLECTION),
        }
    }
}

#[async_trait]
impl RoleStore for MongoRoleStore {
    async fn create_role(&self, role: &Role) -> Result<(), StoreError> {
        self.roles.insert_one(role, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                StoreError::Duplicate(format!("role '{}'", role.name))
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.find_one(doc! { "name": name }, None).await?)
    }

    async fn role_by_id(&self, id: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.find_one(doc! { "_id": id }, None).await?)
    }

    async fn roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, StoreError> {
        let cursor = self
            .roles
            .find(doc! { "name": { "$in": names } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn roles_by_ids(&self, ids: &[String]) -> Result<Vec<Role>, StoreError> {
        let cursor = self.roles.find(doc! { "_id": { "$in": ids } }, None).await?;
        Ok(cursor.try_collect().await?)
    }
}

/// Full access to every route.
pub fn admin_role() -> Role {
    Role::new(
        new_id(),
        ADMIN_ROLE,
        vec![Permission::new(
            "/*",
            ["GET:OTHER", "POST:OTHER", "PUT:OTHER", "DELETE:OTHER"],
        )],
    )
}

/// Customer access to their own account and checkout.
pub fn user_role() -> Role {
    Role::new(
        new_id(),
        USER_ROLE,
        vec![
            Permission::new("/user/self", ["GET", "PUT", "DELETE"]),
            Permission::new("/user/self/password", ["PUT"]),
            Permission::new("/product", ["GET"]),
            Permission::new("/invoice/self", ["GET"]),
            Permission::new("/invoice/self/:id", ["GET", "DELETE"]),
            Permission::new("/invoice/history/self", ["GET"]),
            Permission::new("/invoice/cancel/self", ["POST"]),
            Permission::new("/payment/create", ["POST"]),
            Permission::new("/payment/capture", ["POST"]),
            Permission::new("/push-notification/register-token", ["POST"]),
        ],
    )
}

pub fn default_roles() -> Vec<Role> {
    vec![admin_role(), user_role()]
}

/// Creates any default role that is missing. Existing roles are left as is.
pub async fn provision_default_roles(store: &dyn RoleStore) -> Result<(), StoreError> {
    for role in default_roles() {
        if store.role_by_name(&role.name).await?.is_some() {
            continue;
        }
        match store.create_role(&role).await {
            Ok(()) => tracing::info!(role = %role.name, "Provisioned default role"),
            Err(StoreError::Duplicate(_)) => {
                tracing::debug!(role = %role.name, "Default role created concurrently")
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
