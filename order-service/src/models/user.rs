use serde::{Deserialize, Serialize};

use super::{invoice::Invoice, role::Role};

/// A user document. Invoices live only inside this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub reports: Vec<serde_json::Value>,
    #[serde(default)]
    pub logs: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// Outward view of a user, without credentials or embedded documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub roles: Vec<Role>,
    pub archived: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            roles: user.roles.clone(),
            archived: user.archived,
        }
    }
}

/// Partial profile edit. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
            && self.address.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(phone_number) = &self.phone_number {
            user.phone_number = phone_number.clone();
        }
        if let Some(address) = &self.address {
            user.address = address.clone();
        }
    }
}
