#![allow(dead_code)]

use async_trait::async_trait;
use order_service::config::JwtConfig;
use order_service::models::{
    Invoice, InvoiceBook, InvoiceStats, OrderStatus, Product, ProductImages, ProfileUpdate, Role,
    User, new_id,
};
use order_service::services::{
    AppendGuard, InvoiceLedger, InvoiceStore, JwtService, Notifier, PaymentDetails, PaymentError,
    PaymentGateway, PendingPolicy, ProductCatalog, PushDispatcher, PushError, PushMessage,
    RoleStore, StoreError, UserStore, provision_default_roles,
};
use order_service::utils::password::{Password, hash_password};
use order_service::{AppState, build_router};
use secrecy::Secret;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::RwLock;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Hashing is slow in debug builds, so fixtures share one hash.
fn test_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(&Password::new(TEST_PASSWORD.to_string())).unwrap())
        .clone()
}

/// In-memory users (with embedded invoices), products and roles.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    products: RwLock<HashMap<String, Product>>,
    roles: RwLock<HashMap<String, Role>>,
}

impl MemoryStore {
    pub async fn put_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn put_product(&self, product: Product) {
        self.products.write().await.insert(product.id.clone(), product);
    }

    pub async fn remove_product(&self, id: &str) {
        self.products.write().await.remove(id);
    }

    pub async fn invoices_of(&self, user_id: &str) -> Vec<Invoice> {
        self.users
            .read()
            .await
            .get(user_id)
            .map(|user| user.invoices.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned().map(|mut user| {
            user.invoices.clear();
            user
        }))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn set_roles(&self, user_id: &str, roles: &[Role]) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(user_id)
            .map(|user| user.roles = roles.to_vec())
            .is_some())
    }

    async fn set_device_token(&self, user_id: &str, token: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(user_id)
            .map(|user| user.device_token = Some(token.to_string()))
            .is_some())
    }

    async fn device_tokens(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|user| !user.archived)
            .filter_map(|user| user.device_token.clone())
            .filter(|token| !token.is_empty())
            .collect())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(user_id)
            .map(|user| changes.apply(user))
            .is_some())
    }

    async fn set_password(&self, user_id: &str, password_hash: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(user_id)
            .map(|user| user.password = password_hash.to_string())
            .is_some())
    }

    async fn archive_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(user_id)
            .map(|user| user.archived = true)
            .is_some())
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let mut active: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|user| !user.archived)
            .cloned()
            .map(|mut user| {
                user.invoices.clear();
                user
            })
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(active
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|user| !user.archived)
            .count() as u64)
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn user_invoices(&self, user_id: &str) -> Result<Option<InvoiceBook>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .map(|user| InvoiceBook::new(user.invoices.clone())))
    }

    async fn push_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        guard: AppendGuard,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(user_id) else {
            return Ok(false);
        };
        if guard == AppendGuard::NoPendingInvoice && user.invoices.iter().any(Invoice::is_pending)
        {
            return Ok(false);
        }
        user.invoices.push(invoice.clone());
        Ok(true)
    }

    async fn replace_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        expected: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let slot = users.get_mut(user_id).and_then(|user| {
            user.invoices
                .iter_mut()
                .find(|i| i.id == invoice.id && i.status() == expected)
        });
        Ok(match slot {
            Some(slot) => {
                *slot = invoice.clone();
                true
            }
            None => false,
        })
    }

    async fn archive_invoice(&self, user_id: &str, invoice_id: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(user_id)
            .and_then(|user| user.invoices.iter_mut().find(|i| i.id == invoice_id))
            .map(|invoice| invoice.archived = true)
            .is_some())
    }

    async fn find_invoice_owner(&self, invoice_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.invoices.iter().any(|i| i.id == invoice_id))
            .map(|user| user.id.clone()))
    }

    async fn list_invoices(&self, skip: i64, limit: i64) -> Result<Vec<Invoice>, StoreError> {
        let mut all: Vec<Invoice> = self
            .users
            .read()
            .await
            .values()
            .flat_map(|user| user.invoices.iter().cloned())
            .collect();
        all.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(all
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn invoice_stats(&self) -> Result<InvoiceStats, StoreError> {
        let users = self.users.read().await;
        Ok(InvoiceStats::from_invoices(
            users.values().flat_map(|user| user.invoices.iter()),
        ))
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn product_by_id(&self, id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn product_by_reference(&self, reference: &str) -> Result<Option<Product>, StoreError> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .find(|p| p.reference == reference)
            .cloned())
    }

    async fn list_products(&self, skip: i64, limit: i64) -> Result<Vec<Product>, StoreError> {
        let mut active: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| !p.archived)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}

/// Invoice store that lets another writer move the most recent invoice to
/// `interleaved` right after the ledger takes its snapshot, once.
pub struct InterleavingStore {
    inner: Arc<MemoryStore>,
    interleaved: OrderStatus,
    armed: AtomicBool,
}

impl InterleavingStore {
    pub fn new(inner: Arc<MemoryStore>, interleaved: OrderStatus) -> Self {
        Self {
            inner,
            interleaved,
            armed: AtomicBool::new(true),
        }
    }

    async fn interleave(&self, user_id: &str) {
        let mut users = self.inner.users.write().await;
        let latest = users
            .get_mut(user_id)
            .and_then(|user| user.invoices.iter_mut().max_by(|a, b| a.date.cmp(&b.date)));
        if let Some(invoice) = latest {
            match self.interleaved {
                OrderStatus::Cancelled => invoice.cancel(),
                status => invoice.order.status = status,
            }
        }
    }
}

#[async_trait]
impl InvoiceStore for InterleavingStore {
    async fn user_invoices(&self, user_id: &str) -> Result<Option<InvoiceBook>, StoreError> {
        let snapshot = self.inner.user_invoices(user_id).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.interleave(user_id).await;
        }
        Ok(snapshot)
    }

    async fn push_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        guard: AppendGuard,
    ) -> Result<bool, StoreError> {
        self.inner.push_invoice(user_id, invoice, guard).await
    }

    async fn replace_invoice(
        &self,
        user_id: &str,
        invoice: &Invoice,
        expected: OrderStatus,
    ) -> Result<bool, StoreError> {
        self.inner.replace_invoice(user_id, invoice, expected).await
    }

    async fn archive_invoice(&self, user_id: &str, invoice_id: &str) -> Result<bool, StoreError> {
        self.inner.archive_invoice(user_id, invoice_id).await
    }

    async fn find_invoice_owner(&self, invoice_id: &str) -> Result<Option<String>, StoreError> {
        self.inner.find_invoice_owner(invoice_id).await
    }

    async fn list_invoices(&self, skip: i64, limit: i64) -> Result<Vec<Invoice>, StoreError> {
        self.inner.list_invoices(skip, limit).await
    }

    async fn invoice_stats(&self) -> Result<InvoiceStats, StoreError> {
        self.inner.invoice_stats().await
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn create_role(&self, role: &Role) -> Result<(), StoreError> {
        let mut roles = self.roles.write().await;
        if roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::Duplicate(format!("role '{}'", role.name)));
        }
        roles.insert(role.id.clone(), role.clone());
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn role_by_id(&self, id: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.read().await.get(id).cloned())
    }

    async fn roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, StoreError> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect())
    }

    async fn roles_by_ids(&self, ids: &[String]) -> Result<Vec<Role>, StoreError> {
        let roles = self.roles.read().await;
        Ok(ids.iter().filter_map(|id| roles.get(id).cloned()).collect())
    }
}

/// Payment gateway answering from a fixed table of order amounts.
#[derive(Default)]
pub struct MockGateway {
    amounts: Mutex<HashMap<String, f64>>,
}

impl MockGateway {
    pub fn set_amount(&self, reference: &str, amount: f64) {
        self.amounts
            .lock()
            .unwrap()
            .insert(reference.to_string(), amount);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn payment_details(&self, reference: &str) -> Result<PaymentDetails, PaymentError> {
        let amount = self.amounts.lock().unwrap().get(reference).copied();
        match amount {
            Some(amount) => Ok(PaymentDetails {
                amount,
                currency: "EUR".to_string(),
            }),
            None => Err(PaymentError::Upstream {
                status: 404,
                body: "RESOURCE_NOT_FOUND".to_string(),
            }),
        }
    }
}

/// Push dispatcher that records every message.
pub struct RecordingDispatcher {
    enabled: bool,
    sent: Mutex<Vec<PushMessage>>,
}

impl RecordingDispatcher {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushDispatcher for RecordingDispatcher {
    async fn send(&self, push: &PushMessage) -> Result<(), PushError> {
        if push.device_token.starts_with("bad") {
            return Err(PushError::SendFailed("unregistered token".to_string()));
        }
        self.sent.lock().unwrap().push(push.clone());
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

pub fn product(id: &str, price_vat: f64) -> Product {
    Product {
        id: id.to_string(),
        reference: format!("REF-{}", id),
        price_vat,
        price_not: price_vat / 1.2,
        stock_quantity: 100.0,
        name: format!("Product {}", id),
        brand: "Acme".to_string(),
        category: "grocery".to_string(),
        images: ProductImages::default(),
        nutritional_information: String::new(),
        archived: false,
    }
}

pub fn user(email: &str, roles: Vec<Role>) -> User {
    User {
        id: new_id(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: email.to_string(),
        password: test_password_hash(),
        phone_number: String::new(),
        address: String::new(),
        roles,
        invoices: Vec::new(),
        reports: Vec::new(),
        logs: Vec::new(),
        device_token: None,
        archived: false,
    }
}

pub fn jwt() -> JwtService {
    JwtService::new(&JwtConfig {
        secret: Secret::new("test-secret".to_string()),
        expiry_hours: 1,
    })
}

/// Stores, collaborators and app state wired for one test.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub state: AppState,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_policy(PendingPolicy::BestEffort).await
    }

    pub async fn with_policy(policy: PendingPolicy) -> Self {
        let store = Arc::new(MemoryStore::default());
        provision_default_roles(store.as_ref()).await.unwrap();

        store.put_product(product("p1", 6.00)).await;
        store.put_product(product("p2", 19.99)).await;
        store.put_product(product("p3", 2.50)).await;

        let gateway = Arc::new(MockGateway::default());
        let dispatcher = Arc::new(RecordingDispatcher::new(true));

        let ledger = InvoiceLedger::new(store.clone(), store.clone(), gateway.clone())
            .with_policy(policy);

        let state = AppState {
            users: store.clone(),
            roles: store.clone(),
            products: store.clone(),
            ledger,
            jwt: jwt(),
            notifier: Notifier::new(dispatcher.clone()),
            database: None,
        };

        Self {
            store,
            gateway,
            dispatcher,
            state,
        }
    }

    pub fn ledger(&self) -> &InvoiceLedger {
        &self.state.ledger
    }

    /// A ledger over this context's data whose next snapshot read races
    /// with a writer moving the latest invoice to `interleaved`.
    pub fn interleaved_ledger(&self, interleaved: OrderStatus) -> InvoiceLedger {
        let invoices = Arc::new(InterleavingStore::new(self.store.clone(), interleaved));
        InvoiceLedger::new(invoices, self.store.clone(), self.gateway.clone())
    }

    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    pub async fn store_role(&self, name: &str) -> Role {
        self.store.role_by_name(name).await.unwrap().unwrap()
    }

    /// Inserts a user holding the named stored role and returns it with a
    /// valid access token.
    pub async fn user_with_role(&self, email: &str, role_name: &str) -> (User, String) {
        let role = self.store_role(role_name).await;
        self.user_with_roles(email, vec![role]).await
    }

    pub async fn user_with_roles(&self, email: &str, roles: Vec<Role>) -> (User, String) {
        let user = user(email, roles);
        self.store.put_user(user.clone()).await;
        let token = self
            .state
            .jwt
            .generate_access_token(&user.id, &user.email)
            .unwrap();
        (user, token)
    }
}
