use serde::{Deserialize, Serialize};

/// A named set of permission rules.
///
/// Users hold copies of roles taken at assignment time, so editing a role in
/// the role store never changes what an existing user may do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// A resource pattern and the action specs granted on it.
///
/// `resource` is either an exact route (`/invoice/self/:id`) or a prefix
/// pattern ending in `/*`. Each action is `METHOD` or `METHOD:SCOPE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Permission {
    pub resource: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Permission {
    pub fn new<I, S>(resource: &str, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource: resource.to_string(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            permissions,
        }
    }
}
