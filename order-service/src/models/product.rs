use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xl: Option<String>,
}

/// Catalog entry. The order service only reads products.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub reference: String,
    pub price_vat: f64,
    #[serde(default)]
    pub price_not: f64,
    #[serde(default)]
    pub stock_quantity: f64,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub images: ProductImages,
    #[serde(default)]
    pub nutritional_information: String,
    #[serde(default)]
    pub archived: bool,
}

/// Current catalog detail merged into an invoice line for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: String,
    pub reference: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub images: ProductImages,
    pub price_vat: f64,
    pub price_not: f64,
}

impl From<&Product> for ProductDetail {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            reference: product.reference.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            images: product.images.clone(),
            price_vat: product.price_vat,
            price_not: product.price_not,
        }
    }
}
