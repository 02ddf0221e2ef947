pub mod health;
pub mod invoice;
pub mod payment;
pub mod product;
pub mod push;
pub mod stats;
pub mod user;
