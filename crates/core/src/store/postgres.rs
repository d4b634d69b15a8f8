//! `PostgreSQL` store.
//!
//! # Tables (schema `shop`)
//!
//! - `category`, `product`, `product_specs`
//! - `role`, `staff`, `customer`
//! - `customer_order`, `order_line`
//!
//! Migrations live in `crates/storefront/migrations/`. Queries are built at
//! runtime so the crate compiles without a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::{AccountStore, CatalogStore, CommerceStore, OrderStore, StoreError};
use crate::account::{ContactDetails, Customer, CustomerOverview, Role, Staff};
use crate::catalog::{
    Category, Page, Product, ProductFilter, ProductInput, ProductSort, ProductSpecs,
};
use crate::order::{
    LifecycleAction, LifecycleOutcome, NewOrder, Order, OrderDetail, OrderLine, Transition,
    check_totals,
};
use crate::types::{
    CategoryId, CustomerId, Email, OrderId, OrderLineId, OrderStatus, Price, ProductId, RoleId,
    StaffId,
};

// =============================================================================
// Internal Row Types
// =============================================================================

const PRODUCT_COLUMNS: &str = "id, name, base_price, sale_price, stock, purchase_count, \
     category_id, description, image";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    base_price: Option<Decimal>,
    sale_price: Option<Decimal>,
    stock: i32,
    purchase_count: i32,
    category_id: i32,
    description: Option<String>,
    image: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            base_price: row.base_price.map(Price::new),
            sale_price: row.sale_price.map(Price::new),
            stock: row.stock,
            purchase_count: row.purchase_count,
            category_id: CategoryId::new(row.category_id),
            description: row.description,
            image: row.image,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SpecsRow {
    screen: Option<String>,
    operating_system: Option<String>,
    rear_camera: Option<String>,
    front_camera: Option<String>,
    cpu: Option<String>,
    ram: Option<String>,
    storage: Option<String>,
    sim: Option<String>,
    battery: Option<String>,
    design: Option<String>,
}

impl From<SpecsRow> for ProductSpecs {
    fn from(row: SpecsRow) -> Self {
        Self {
            screen: row.screen,
            operating_system: row.operating_system,
            rear_camera: row.rear_camera,
            front_camera: row.front_camera,
            cpu: row.cpu,
            ram: row.ram,
            storage: row.storage,
            sim: row.sim,
            battery: row.battery,
            design: row.design,
        }
    }
}

fn parse_email(raw: &str) -> Result<Email, StoreError> {
    Email::parse(raw)
        .map_err(|e| StoreError::DataCorruption(format!("invalid email in database: {e}")))
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    name: String,
    phone: Option<String>,
    email: String,
    password_hash: String,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = StoreError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CustomerId::new(row.id),
            name: row.name,
            phone: row.phone,
            email: parse_email(&row.email)?,
            password_hash: row.password_hash,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerOverviewRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    order_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    id: i32,
    name: String,
    phone: Option<String>,
    email: String,
    password_hash: String,
    role_id: i32,
    role_name: String,
}

impl TryFrom<StaffRow> for Staff {
    type Error = StoreError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StaffId::new(row.id),
            name: row.name,
            phone: row.phone,
            email: parse_email(&row.email)?,
            password_hash: row.password_hash,
            role: Role {
                id: RoleId::new(row.role_id),
                name: row.role_name,
            },
        })
    }
}

const STAFF_SELECT: &str = "SELECT s.id, s.name, s.phone, s.email, s.password_hash, \
     r.id AS role_id, r.name AS role_name \
     FROM shop.staff s JOIN shop.role r ON r.id = s.role_id";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    customer_id: i32,
    created_at: DateTime<Utc>,
    total: Decimal,
    status: i16,
    approved_by: Option<i32>,
    approved_at: Option<DateTime<Utc>>,
    recipient_name: String,
    recipient_phone: String,
    shipping_address: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::from_code(row.status).ok_or_else(|| {
            StoreError::DataCorruption(format!(
                "order {} has unknown status {}",
                row.id, row.status
            ))
        })?;
        Ok(Self {
            id: OrderId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            created_at: row.created_at,
            total: Price::new(row.total),
            status,
            approved_by: row.approved_by.map(StaffId::new),
            approved_at: row.approved_at,
            recipient_name: row.recipient_name,
            recipient_phone: row.recipient_phone,
            shipping_address: row.shipping_address,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderHeaderRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: Option<String>,
    approver_name: Option<String>,
}

const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.created_at, o.total, o.status, \
     o.approved_by, o.approved_at, o.recipient_name, o.recipient_phone, o.shipping_address";

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    product_name: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: OrderLineId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: Price::new(row.unit_price),
            line_total: Price::new(row.line_total),
        }
    }
}

/// Map a unique or foreign key violation to a domain error.
fn constraint(err: sqlx::Error, unique: &str, foreign_key: StoreError) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Conflict(unique.to_string()),
        Some(db) if db.is_foreign_key_violation() => foreign_key,
        _ => StoreError::Database(err),
    }
}

fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_product_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = filter.category {
        qb.push(" AND category_id = ").push_bind(category.as_i32());
    }
    if let Some(keyword) = &filter.keyword {
        qb.push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(keyword)));
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND sale_price >= ").push_bind(min.amount());
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND sale_price <= ").push_bind(max.amount());
    }
    if filter.sort == ProductSort::Sale {
        qb.push(" AND COALESCE(base_price, 0) > COALESCE(sale_price, 0)");
    }
}

const fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => " ORDER BY id DESC",
        ProductSort::PriceAsc => " ORDER BY COALESCE(sale_price, 0) ASC, id DESC",
        ProductSort::PriceDesc => " ORDER BY COALESCE(sale_price, 0) DESC, id DESC",
        ProductSort::Bestseller => " ORDER BY purchase_count DESC, id DESC",
        ProductSort::Sale => {
            " ORDER BY COALESCE(base_price, 0) - COALESCE(sale_price, 0) DESC, id DESC"
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_staff(&self, id: StaffId) -> Result<Option<Staff>, StoreError> {
        let row: Option<StaffRow> = sqlx::query_as(&format!("{STAFF_SELECT} WHERE s.id = $1"))
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Load order headers matching a `WHERE` clause plus all their lines.
    async fn fetch_orders(
        &self,
        customer: Option<CustomerId>,
        status: Option<OrderStatus>,
        id: Option<OrderId>,
    ) -> Result<Vec<OrderDetail>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(ORDER_COLUMNS);
        qb.push(
            ", c.name AS customer_name, s.name AS approver_name \
             FROM shop.customer_order o \
             LEFT JOIN shop.customer c ON c.id = o.customer_id \
             LEFT JOIN shop.staff s ON s.id = o.approved_by \
             WHERE TRUE",
        );
        if let Some(customer) = customer {
            qb.push(" AND o.customer_id = ").push_bind(customer.as_i32());
        }
        if let Some(status) = status {
            qb.push(" AND o.status = ").push_bind(status.code());
        }
        if let Some(id) = id {
            qb.push(" AND o.id = ").push_bind(id.as_i32());
        }
        qb.push(" ORDER BY o.created_at DESC, o.id DESC");

        let headers: Vec<OrderHeaderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = headers.iter().map(|h| h.order.id).collect();
        let line_rows: Vec<OrderLineRow> = sqlx::query_as(
            "SELECT l.id, l.order_id, l.product_id, p.name AS product_name, \
             l.quantity, l.unit_price, l.line_total \
             FROM shop.order_line l LEFT JOIN shop.product p ON p.id = l.product_id \
             WHERE l.order_id = ANY($1) ORDER BY l.id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for row in line_rows {
            lines.entry(row.order_id).or_default().push(row.into());
        }

        headers
            .into_iter()
            .map(|header| {
                let order_lines = lines.remove(&header.order.id).unwrap_or_default();
                Ok(OrderDetail {
                    order: header.order.try_into()?,
                    customer_name: header.customer_name,
                    approver_name: header.approver_name,
                    lines: order_lines,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name FROM shop.category ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name FROM shop.category WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn create_category(&self, name: &str) -> Result<Category, StoreError> {
        let row: CategoryRow =
            sqlx::query_as("INSERT INTO shop.category (name) VALUES ($1) RETURNING id, name")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.into())
    }

    async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category, StoreError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "UPDATE shop.category SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id.as_i32())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Into::into).ok_or(StoreError::NotFound("category"))
    }

    #[instrument(skip(self), fields(category_id = %id))]
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.product WHERE category_id = $1")
                .bind(id.as_i32())
                .fetch_one(&self.pool)
                .await?;
        if products > 0 {
            return Err(StoreError::Conflict(format!(
                "category still has {products} products"
            )));
        }

        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint(
                    e,
                    "category is in use",
                    StoreError::Conflict("category still has products".to_string()),
                )
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("category"));
        }
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.product");
        push_product_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(PRODUCT_COLUMNS).push(" FROM shop.product");
        push_product_filter(&mut select, filter);
        select.push(order_by(filter.sort));
        select
            .push(" LIMIT ")
            .push_bind(i64::from(filter.page_size))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset()));
        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            u64::try_from(total).unwrap_or_default(),
            filter.page,
            filter.page_size,
        ))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn product_specs(&self, id: ProductId) -> Result<Option<ProductSpecs>, StoreError> {
        let row: Option<SpecsRow> = sqlx::query_as(
            "SELECT screen, operating_system, rear_camera, front_camera, cpu, ram, \
             storage, sim, battery, design \
             FROM shop.product_specs WHERE product_id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn related_products(
        &self,
        product: &Product,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product \
             WHERE category_id = $1 AND id <> $2 ORDER BY id DESC LIMIT $3"
        ))
        .bind(product.category_id.as_i32())
        .bind(product.id.as_i32())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, StoreError> {
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO shop.product \
             (name, base_price, sale_price, stock, category_id, description, image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.base_price.map(|p| p.amount()))
        .bind(input.sale_price.map(|p| p.amount()))
        .bind(input.stock)
        .bind(input.category_id.as_i32())
        .bind(&input.description)
        .bind(&input.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint(e, "product already exists", StoreError::NotFound("category")))?;
        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE shop.product SET name = $2, base_price = $3, sale_price = $4, \
             stock = $5, category_id = $6, description = $7, image = $8 \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(input.base_price.map(|p| p.amount()))
        .bind(input.sale_price.map(|p| p.amount()))
        .bind(input.stock)
        .bind(input.category_id.as_i32())
        .bind(&input.description)
        .bind(&input.image)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| constraint(e, "product already exists", StoreError::NotFound("category")))?;
        row.map(Into::into).ok_or(StoreError::NotFound("product"))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint(
                    e,
                    "product is in use",
                    StoreError::Conflict("product appears in existing orders".to_string()),
                )
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("product"));
        }
        Ok(())
    }

    async fn save_specs(&self, id: ProductId, specs: &ProductSpecs) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shop.product_specs \
             (product_id, screen, operating_system, rear_camera, front_camera, cpu, ram, \
              storage, sim, battery, design) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (product_id) DO UPDATE SET \
             screen = EXCLUDED.screen, operating_system = EXCLUDED.operating_system, \
             rear_camera = EXCLUDED.rear_camera, front_camera = EXCLUDED.front_camera, \
             cpu = EXCLUDED.cpu, ram = EXCLUDED.ram, storage = EXCLUDED.storage, \
             sim = EXCLUDED.sim, battery = EXCLUDED.battery, design = EXCLUDED.design",
        )
        .bind(id.as_i32())
        .bind(&specs.screen)
        .bind(&specs.operating_system)
        .bind(&specs.rear_camera)
        .bind(&specs.front_camera)
        .bind(&specs.cpu)
        .bind(&specs.ram)
        .bind(&specs.storage)
        .bind(&specs.sim)
        .bind(&specs.battery)
        .bind(&specs.design)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint(e, "specs already exist", StoreError::NotFound("product")))?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_customer_by_email(&self, email: &Email) -> Result<Option<Customer>, StoreError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, phone, email, password_hash FROM shop.customer WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, phone, email, password_hash FROM shop.customer WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn create_customer(
        &self,
        contact: &ContactDetails,
        password_hash: &str,
    ) -> Result<Customer, StoreError> {
        let row: CustomerRow = sqlx::query_as(
            "INSERT INTO shop.customer (name, phone, email, password_hash) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, phone, email, password_hash",
        )
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(contact.email.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            constraint(
                e,
                "email is already registered",
                StoreError::DataCorruption("unexpected foreign key on customer".to_string()),
            )
        })?;
        row.try_into()
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        contact: &ContactDetails,
        password_hash: Option<&str>,
    ) -> Result<Customer, StoreError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "UPDATE shop.customer SET name = $2, phone = $3, email = $4, \
             password_hash = COALESCE($5, password_hash) \
             WHERE id = $1 RETURNING id, name, phone, email, password_hash",
        )
        .bind(id.as_i32())
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(contact.email.as_str())
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            constraint(
                e,
                "email is already registered",
                StoreError::DataCorruption("unexpected foreign key on customer".to_string()),
            )
        })?;
        row.ok_or(StoreError::NotFound("customer"))?.try_into()
    }

    async fn list_customers(&self) -> Result<Vec<CustomerOverview>, StoreError> {
        let rows: Vec<CustomerOverviewRow> = sqlx::query_as(
            "SELECT c.id, c.name, c.phone, c.email, c.password_hash, \
             (SELECT COUNT(*) FROM shop.customer_order o WHERE o.customer_id = c.id) \
                 AS order_count \
             FROM shop.customer c ORDER BY c.id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                Ok(CustomerOverview {
                    customer: row.customer.try_into()?,
                    order_count: row.order_count,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        let orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.customer_order WHERE customer_id = $1")
                .bind(id.as_i32())
                .fetch_one(&self.pool)
                .await?;
        if orders > 0 {
            return Err(StoreError::Conflict(format!("customer has {orders} orders")));
        }

        let result = sqlx::query("DELETE FROM shop.customer WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint(
                    e,
                    "customer is in use",
                    StoreError::Conflict("customer has orders".to_string()),
                )
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("customer"));
        }
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows: Vec<(i32, String)> = sqlx::query_as("SELECT id, name FROM shop.role ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Role {
                id: RoleId::new(id),
                name,
            })
            .collect())
    }

    async fn ensure_role(&self, name: &str) -> Result<Role, StoreError> {
        let (id, name): (i32, String) = sqlx::query_as(
            "INSERT INTO shop.role (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(Role {
            id: RoleId::new(id),
            name,
        })
    }

    async fn find_staff_by_email(&self, email: &Email) -> Result<Option<Staff>, StoreError> {
        let row: Option<StaffRow> = sqlx::query_as(&format!("{STAFF_SELECT} WHERE s.email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_staff(&self, id: StaffId) -> Result<Option<Staff>, StoreError> {
        self.fetch_staff(id).await
    }

    async fn list_staff(&self) -> Result<Vec<Staff>, StoreError> {
        let rows: Vec<StaffRow> = sqlx::query_as(&format!("{STAFF_SELECT} ORDER BY s.id"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_staff(
        &self,
        contact: &ContactDetails,
        role_id: RoleId,
        password_hash: &str,
    ) -> Result<Staff, StoreError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO shop.staff (name, phone, email, password_hash, role_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(contact.email.as_str())
        .bind(password_hash)
        .bind(role_id.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| constraint(e, "email is already registered", StoreError::NotFound("role")))?;

        self.fetch_staff(StaffId::new(id))
            .await?
            .ok_or(StoreError::NotFound("staff"))
    }

    async fn update_staff(
        &self,
        id: StaffId,
        contact: &ContactDetails,
        role_id: RoleId,
        password_hash: Option<&str>,
    ) -> Result<Staff, StoreError> {
        let result = sqlx::query(
            "UPDATE shop.staff SET name = $2, phone = $3, email = $4, role_id = $5, \
             password_hash = COALESCE($6, password_hash) WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(contact.email.as_str())
        .bind(role_id.as_i32())
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| constraint(e, "email is already registered", StoreError::NotFound("role")))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("staff"));
        }

        self.fetch_staff(id).await?.ok_or(StoreError::NotFound("staff"))
    }

    #[instrument(skip(self), fields(staff_id = %id))]
    async fn delete_staff(&self, id: StaffId) -> Result<(), StoreError> {
        let approved: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.customer_order WHERE approved_by = $1")
                .bind(id.as_i32())
                .fetch_one(&self.pool)
                .await?;
        if approved > 0 {
            return Err(StoreError::Conflict(format!(
                "staff member approved {approved} orders"
            )));
        }

        let result = sqlx::query("DELETE FROM shop.staff WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                constraint(
                    e,
                    "staff member is in use",
                    StoreError::Conflict("staff member approved orders".to_string()),
                )
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("staff"));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    #[instrument(skip(self, order), fields(customer_id = %order.customer_id, lines = order.lines.len()))]
    async fn place_order(&self, order: &NewOrder) -> Result<OrderDetail, StoreError> {
        if order.lines.is_empty() {
            return Err(StoreError::Conflict("order has no lines".to_string()));
        }

        // Update each product once, in id order, so concurrent checkouts
        // touching the same products always lock rows in the same order.
        let per_product = order.quantities_by_product()?;

        let mut tx = self.pool.begin().await?;

        let mut prices: HashMap<ProductId, Price> = HashMap::with_capacity(per_product.len());
        for (&product_id, &quantity) in &per_product {
            let sale_price: Option<Option<Decimal>> = sqlx::query_scalar(
                "UPDATE shop.product \
                 SET stock = GREATEST(stock - $2, 0), \
                     purchase_count = LEAST(purchase_count::BIGINT + $2, 2147483647)::INTEGER \
                 WHERE id = $1 RETURNING sale_price",
            )
            .bind(product_id.as_i32())
            .bind(quantity)
            .fetch_optional(&mut *tx)
            .await?;
            let Some(sale_price) = sale_price else {
                return Err(StoreError::NotFound("product"));
            };
            prices.insert(product_id, Price::new(sale_price.unwrap_or_default()));
        }

        let priced: Vec<_> = order
            .lines
            .iter()
            .map(|line| {
                let unit = prices.get(&line.product_id).copied().unwrap_or(Price::ZERO);
                (line, unit, unit.times(line.quantity))
            })
            .collect();
        // Returning early drops the transaction, rolling back the stock updates
        let total = check_totals(priced.iter().map(|(_, _, line_total)| *line_total))?;

        let order_id: i32 = sqlx::query_scalar(
            "INSERT INTO shop.customer_order \
             (customer_id, total, status, recipient_name, recipient_phone, shipping_address) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(order.customer_id.as_i32())
        .bind(total.amount())
        .bind(OrderStatus::Pending.code())
        .bind(&order.shipping.recipient_name)
        .bind(&order.shipping.recipient_phone)
        .bind(&order.shipping.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint(e, "order already exists", StoreError::NotFound("customer")))?;

        for (line, unit_price, line_total) in priced {
            sqlx::query(
                "INSERT INTO shop.order_line \
                 (order_id, product_id, quantity, unit_price, line_total) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(order_id)
            .bind(line.product_id.as_i32())
            .bind(line.quantity)
            .bind(unit_price.amount())
            .bind(line_total.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let id = OrderId::new(order_id);
        tracing::info!(order_id = %id, total = %total, "order placed");
        self.get_order(id).await?.ok_or(StoreError::NotFound("order"))
    }

    #[instrument(skip(self), fields(order_id = %id, staff_id = %staff))]
    async fn apply_lifecycle(
        &self,
        id: OrderId,
        action: LifecycleAction,
        staff: StaffId,
    ) -> Result<LifecycleOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, customer_id, created_at, total, status, approved_by, approved_at, \
             recipient_name, recipient_phone, shipping_address \
             FROM shop.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_i32())
        .fetch_optional(&mut *tx)
        .await?;
        let mut order: Order = row.ok_or(StoreError::NotFound("order"))?.try_into()?;

        let next_status = match action.decide(order.status)? {
            Transition::NoOp => {
                tx.rollback().await?;
                return Ok(LifecycleOutcome {
                    order,
                    applied: false,
                });
            }
            Transition::Apply(next_status) => next_status,
        };

        match next_status {
            OrderStatus::Approved => {
                let now = Utc::now();
                sqlx::query(
                    "UPDATE shop.customer_order \
                     SET status = $2, approved_by = $3, approved_at = $4 WHERE id = $1",
                )
                .bind(id.as_i32())
                .bind(next_status.code())
                .bind(staff.as_i32())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint(e, "order conflict", StoreError::NotFound("staff")))?;
                order.approved_by = Some(staff);
                order.approved_at = Some(now);
            }
            OrderStatus::Cancelled => {
                sqlx::query(
                    "UPDATE shop.product p \
                     SET stock = LEAST(p.stock::BIGINT + l.quantity, 2147483647)::INTEGER, \
                         purchase_count = GREATEST(p.purchase_count - l.quantity, 0) \
                     FROM (SELECT product_id, SUM(quantity)::INTEGER AS quantity \
                           FROM shop.order_line WHERE order_id = $1 GROUP BY product_id) l \
                     WHERE p.id = l.product_id",
                )
                .bind(id.as_i32())
                .execute(&mut *tx)
                .await?;
                sqlx::query("UPDATE shop.customer_order SET status = $2 WHERE id = $1")
                    .bind(id.as_i32())
                    .bind(next_status.code())
                    .execute(&mut *tx)
                    .await?;
            }
            OrderStatus::Pending | OrderStatus::Completed => {
                sqlx::query("UPDATE shop.customer_order SET status = $2 WHERE id = $1")
                    .bind(id.as_i32())
                    .bind(next_status.code())
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        order.status = next_status;
        Ok(LifecycleOutcome {
            order,
            applied: true,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, StoreError> {
        Ok(self.fetch_orders(None, None, Some(id)).await?.into_iter().next())
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<OrderDetail>, StoreError> {
        self.fetch_orders(None, status, None).await
    }

    async fn customer_orders(
        &self,
        customer: CustomerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetail>, StoreError> {
        self.fetch_orders(Some(customer), status, None).await
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("iPhone 15"), "iPhone 15");
    }

    #[test]
    fn test_filter_sql() {
        let filter = ProductFilter {
            category: Some(CategoryId::new(1)),
            keyword: Some("galaxy".to_string()),
            sort: ProductSort::Sale,
            ..ProductFilter::default()
        }
        .normalized();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.product");
        push_product_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM shop.product WHERE TRUE AND category_id = $1 \
             AND name ILIKE $2 AND COALESCE(base_price, 0) > COALESCE(sale_price, 0)"
        );
    }
}
