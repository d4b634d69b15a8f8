//! In-memory store.
//!
//! All tables live in one [`Tables`] value behind a `tokio` mutex, so every
//! operation (checkout included) observes and leaves a consistent state.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{AccountStore, CatalogStore, CommerceStore, OrderStore, StoreError};
use crate::account::{ContactDetails, Customer, CustomerOverview, Role, Staff};
use crate::catalog::{Category, Page, Product, ProductFilter, ProductInput, ProductSpecs};
use crate::inventory;
use crate::order::{
    LifecycleAction, LifecycleOutcome, NewOrder, Order, OrderDetail, OrderLine, Transition,
    check_totals,
};
use crate::types::{
    CategoryId, CustomerId, Email, OrderId, OrderLineId, OrderStatus, ProductId, RoleId, StaffId,
};

#[derive(Debug, Clone)]
struct StaffRow {
    id: StaffId,
    name: String,
    phone: Option<String>,
    email: Email,
    password_hash: String,
    role_id: RoleId,
}

#[derive(Debug, Default)]
struct Sequences {
    category: i32,
    product: i32,
    role: i32,
    staff: i32,
    customer: i32,
    order: i32,
    order_line: i32,
}

fn next(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct Tables {
    seq: Sequences,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    specs: BTreeMap<ProductId, ProductSpecs>,
    roles: BTreeMap<RoleId, Role>,
    staff: BTreeMap<StaffId, StaffRow>,
    customers: BTreeMap<CustomerId, Customer>,
    orders: BTreeMap<OrderId, Order>,
    lines: Vec<OrderLine>,
}

impl Tables {
    fn staff_with_role(&self, row: &StaffRow) -> Result<Staff, StoreError> {
        let role = self.roles.get(&row.role_id).cloned().ok_or_else(|| {
            StoreError::DataCorruption(format!("staff {} has unknown role {}", row.id, row.role_id))
        })?;
        Ok(Staff {
            id: row.id,
            name: row.name.clone(),
            phone: row.phone.clone(),
            email: row.email.clone(),
            password_hash: row.password_hash.clone(),
            role,
        })
    }

    fn detail(&self, order: &Order) -> OrderDetail {
        let lines = self
            .lines
            .iter()
            .filter(|line| line.order_id == order.id)
            .map(|line| OrderLine {
                product_name: self.products.get(&line.product_id).map(|p| p.name.clone()),
                ..line.clone()
            })
            .collect();
        OrderDetail {
            order: order.clone(),
            customer_name: self.customers.get(&order.customer_id).map(|c| c.name.clone()),
            approver_name: order
                .approved_by
                .and_then(|id| self.staff.get(&id))
                .map(|s| s.name.clone()),
            lines,
        }
    }

    fn orders_where(&self, keep: impl Fn(&Order) -> bool) -> Vec<OrderDetail> {
        let mut orders: Vec<&Order> = self.orders.values().filter(|o| keep(o)).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.into_iter().map(|o| self.detail(o)).collect()
    }

    fn check_category(&self, id: CategoryId) -> Result<(), StoreError> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound("category"))
        }
    }

    fn check_role(&self, id: RoleId) -> Result<(), StoreError> {
        if self.roles.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound("role"))
        }
    }

    fn customer_email_taken(&self, email: &Email, except: Option<CustomerId>) -> bool {
        self.customers
            .values()
            .any(|c| &c.email == email && Some(c.id) != except)
    }

    fn staff_email_taken(&self, email: &Email, except: Option<StaffId>) -> bool {
        self.staff
            .values()
            .any(|s| &s.email == email && Some(s.id) != except)
    }
}

/// Store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.tables.lock().await.categories.get(&id).cloned())
    }

    async fn create_category(&self, name: &str) -> Result<Category, StoreError> {
        let mut t = self.tables.lock().await;
        let category = Category {
            id: CategoryId::new(next(&mut t.seq.category)),
            name: name.to_string(),
        };
        t.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category, StoreError> {
        let mut t = self.tables.lock().await;
        let category = t
            .categories
            .get_mut(&id)
            .ok_or(StoreError::NotFound("category"))?;
        category.name = name.to_string();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        t.check_category(id)?;
        let products = t.products.values().filter(|p| p.category_id == id).count();
        if products > 0 {
            return Err(StoreError::Conflict(format!(
                "category still has {products} products"
            )));
        }
        t.categories.remove(&id);
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, StoreError> {
        let t = self.tables.lock().await;
        let products: Vec<Product> = t.products.values().cloned().collect();
        Ok(filter.apply(&products))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn product_specs(&self, id: ProductId) -> Result<Option<ProductSpecs>, StoreError> {
        Ok(self.tables.lock().await.specs.get(&id).cloned())
    }

    async fn related_products(
        &self,
        product: &Product,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.products
            .values()
            .rev()
            .filter(|p| p.category_id == product.category_id && p.id != product.id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_product(&self, input: &ProductInput) -> Result<Product, StoreError> {
        let mut t = self.tables.lock().await;
        t.check_category(input.category_id)?;
        let product = Product {
            id: ProductId::new(next(&mut t.seq.product)),
            name: input.name.clone(),
            base_price: input.base_price,
            sale_price: input.sale_price,
            stock: input.stock,
            purchase_count: 0,
            category_id: input.category_id,
            description: input.description.clone(),
            image: input.image.clone(),
        };
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, StoreError> {
        let mut t = self.tables.lock().await;
        t.check_category(input.category_id)?;
        let product = t
            .products
            .get_mut(&id)
            .ok_or(StoreError::NotFound("product"))?;
        product.name.clone_from(&input.name);
        product.base_price = input.base_price;
        product.sale_price = input.sale_price;
        product.stock = input.stock;
        product.category_id = input.category_id;
        product.description.clone_from(&input.description);
        product.image.clone_from(&input.image);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        if !t.products.contains_key(&id) {
            return Err(StoreError::NotFound("product"));
        }
        if t.lines.iter().any(|line| line.product_id == id) {
            return Err(StoreError::Conflict(
                "product appears in existing orders".to_string(),
            ));
        }
        t.products.remove(&id);
        t.specs.remove(&id);
        Ok(())
    }

    async fn save_specs(&self, id: ProductId, specs: &ProductSpecs) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        if !t.products.contains_key(&id) {
            return Err(StoreError::NotFound("product"));
        }
        t.specs.insert(id, specs.clone());
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_customer_by_email(&self, email: &Email) -> Result<Option<Customer>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.customers.values().find(|c| &c.email == email).cloned())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.tables.lock().await.customers.get(&id).cloned())
    }

    async fn create_customer(
        &self,
        contact: &ContactDetails,
        password_hash: &str,
    ) -> Result<Customer, StoreError> {
        let mut t = self.tables.lock().await;
        if t.customer_email_taken(&contact.email, None) {
            return Err(StoreError::Conflict("email is already registered".to_string()));
        }
        let customer = Customer {
            id: CustomerId::new(next(&mut t.seq.customer)),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone(),
            password_hash: password_hash.to_string(),
        };
        t.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        contact: &ContactDetails,
        password_hash: Option<&str>,
    ) -> Result<Customer, StoreError> {
        let mut t = self.tables.lock().await;
        if t.customer_email_taken(&contact.email, Some(id)) {
            return Err(StoreError::Conflict("email is already registered".to_string()));
        }
        let customer = t
            .customers
            .get_mut(&id)
            .ok_or(StoreError::NotFound("customer"))?;
        customer.name.clone_from(&contact.name);
        customer.phone.clone_from(&contact.phone);
        customer.email = contact.email.clone();
        if let Some(hash) = password_hash {
            customer.password_hash = hash.to_string();
        }
        Ok(customer.clone())
    }

    async fn list_customers(&self) -> Result<Vec<CustomerOverview>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.customers
            .values()
            .map(|customer| CustomerOverview {
                customer: customer.clone(),
                order_count: t
                    .orders
                    .values()
                    .filter(|o| o.customer_id == customer.id)
                    .count() as i64,
            })
            .collect())
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        if !t.customers.contains_key(&id) {
            return Err(StoreError::NotFound("customer"));
        }
        let orders = t.orders.values().filter(|o| o.customer_id == id).count();
        if orders > 0 {
            return Err(StoreError::Conflict(format!(
                "customer has {orders} orders"
            )));
        }
        t.customers.remove(&id);
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.tables.lock().await.roles.values().cloned().collect())
    }

    async fn ensure_role(&self, name: &str) -> Result<Role, StoreError> {
        let mut t = self.tables.lock().await;
        if let Some(role) = t.roles.values().find(|r| r.name == name) {
            return Ok(role.clone());
        }
        let role = Role {
            id: RoleId::new(next(&mut t.seq.role)),
            name: name.to_string(),
        };
        t.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn find_staff_by_email(&self, email: &Email) -> Result<Option<Staff>, StoreError> {
        let t = self.tables.lock().await;
        t.staff
            .values()
            .find(|s| &s.email == email)
            .map(|row| t.staff_with_role(row))
            .transpose()
    }

    async fn get_staff(&self, id: StaffId) -> Result<Option<Staff>, StoreError> {
        let t = self.tables.lock().await;
        t.staff.get(&id).map(|row| t.staff_with_role(row)).transpose()
    }

    async fn list_staff(&self) -> Result<Vec<Staff>, StoreError> {
        let t = self.tables.lock().await;
        t.staff.values().map(|row| t.staff_with_role(row)).collect()
    }

    async fn create_staff(
        &self,
        contact: &ContactDetails,
        role_id: RoleId,
        password_hash: &str,
    ) -> Result<Staff, StoreError> {
        let mut t = self.tables.lock().await;
        t.check_role(role_id)?;
        if t.staff_email_taken(&contact.email, None) {
            return Err(StoreError::Conflict("email is already registered".to_string()));
        }
        let row = StaffRow {
            id: StaffId::new(next(&mut t.seq.staff)),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone(),
            password_hash: password_hash.to_string(),
            role_id,
        };
        t.staff.insert(row.id, row.clone());
        t.staff_with_role(&row)
    }

    async fn update_staff(
        &self,
        id: StaffId,
        contact: &ContactDetails,
        role_id: RoleId,
        password_hash: Option<&str>,
    ) -> Result<Staff, StoreError> {
        let mut t = self.tables.lock().await;
        t.check_role(role_id)?;
        if t.staff_email_taken(&contact.email, Some(id)) {
            return Err(StoreError::Conflict("email is already registered".to_string()));
        }
        let row = t.staff.get_mut(&id).ok_or(StoreError::NotFound("staff"))?;
        row.name.clone_from(&contact.name);
        row.phone.clone_from(&contact.phone);
        row.email = contact.email.clone();
        row.role_id = role_id;
        if let Some(hash) = password_hash {
            row.password_hash = hash.to_string();
        }
        let row = row.clone();
        t.staff_with_role(&row)
    }

    async fn delete_staff(&self, id: StaffId) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        if !t.staff.contains_key(&id) {
            return Err(StoreError::NotFound("staff"));
        }
        let approved = t
            .orders
            .values()
            .filter(|o| o.approved_by == Some(id))
            .count();
        if approved > 0 {
            return Err(StoreError::Conflict(format!(
                "staff member approved {approved} orders"
            )));
        }
        t.staff.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, order: &NewOrder) -> Result<OrderDetail, StoreError> {
        if order.lines.is_empty() {
            return Err(StoreError::Conflict("order has no lines".to_string()));
        }

        order.quantities_by_product()?;

        let mut t = self.tables.lock().await;
        if !t.customers.contains_key(&order.customer_id) {
            return Err(StoreError::NotFound("customer"));
        }

        let priced = order
            .lines
            .iter()
            .map(|line| {
                t.products
                    .get(&line.product_id)
                    .map(|p| (*line, p.effective_price()))
                    .ok_or(StoreError::NotFound("product"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total = check_totals(
            priced
                .iter()
                .map(|(line, unit)| unit.times(line.quantity)),
        )?;

        let header = Order {
            id: OrderId::new(next(&mut t.seq.order)),
            customer_id: order.customer_id,
            created_at: Utc::now(),
            total,
            status: OrderStatus::Pending,
            approved_by: None,
            approved_at: None,
            recipient_name: order.shipping.recipient_name.clone(),
            recipient_phone: order.shipping.recipient_phone.clone(),
            shipping_address: order.shipping.address.clone(),
        };

        for (line, unit_price) in priced {
            let id = OrderLineId::new(next(&mut t.seq.order_line));
            t.lines.push(OrderLine {
                id,
                order_id: header.id,
                product_id: line.product_id,
                product_name: None,
                quantity: line.quantity,
                unit_price,
                line_total: unit_price.times(line.quantity),
            });
            if let Some(product) = t.products.get_mut(&line.product_id) {
                product.stock = inventory::consume(product.stock, line.quantity);
                product.purchase_count =
                    inventory::record_purchase(product.purchase_count, line.quantity);
            }
        }

        t.orders.insert(header.id, header.clone());
        Ok(t.detail(&header))
    }

    async fn apply_lifecycle(
        &self,
        id: OrderId,
        action: LifecycleAction,
        staff: StaffId,
    ) -> Result<LifecycleOutcome, StoreError> {
        let mut t = self.tables.lock().await;
        let mut order = t.orders.get(&id).cloned().ok_or(StoreError::NotFound("order"))?;

        let next_status = match action.decide(order.status)? {
            Transition::NoOp => {
                return Ok(LifecycleOutcome {
                    order,
                    applied: false,
                });
            }
            Transition::Apply(next_status) => next_status,
        };

        match next_status {
            OrderStatus::Approved => {
                if !t.staff.contains_key(&staff) {
                    return Err(StoreError::NotFound("staff"));
                }
                order.approved_by = Some(staff);
                order.approved_at = Some(Utc::now());
            }
            OrderStatus::Cancelled => {
                let returned: Vec<(ProductId, i32)> = t
                    .lines
                    .iter()
                    .filter(|line| line.order_id == id)
                    .map(|line| (line.product_id, line.quantity))
                    .collect();
                for (product_id, quantity) in returned {
                    if let Some(product) = t.products.get_mut(&product_id) {
                        product.stock = inventory::restore(product.stock, quantity);
                        product.purchase_count =
                            inventory::revert_purchase(product.purchase_count, quantity);
                    }
                }
            }
            OrderStatus::Pending | OrderStatus::Completed => {}
        }

        order.status = next_status;
        t.orders.insert(id, order.clone());
        Ok(LifecycleOutcome {
            order,
            applied: true,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.orders.get(&id).map(|o| t.detail(o)))
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<OrderDetail>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.orders_where(|o| status.is_none_or(|s| o.status == s)))
    }

    async fn customer_orders(
        &self,
        customer: CustomerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetail>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.orders_where(|o| o.customer_id == customer && status.is_none_or(|s| o.status == s)))
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::order::{NewOrderLine, OrderLimitError, ShippingInfo, TransitionError};
    use crate::types::Price;

    struct Fixture {
        store: Arc<MemoryStore>,
        customer: CustomerId,
        staff: StaffId,
        a: ProductId,
        b: ProductId,
    }

    fn contact(name: &str, email: &str) -> ContactDetails {
        ContactDetails::parse(name, None, email).unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let category = store.create_category("iPhone").await.unwrap();
        let product = |name: &str, price: i64, stock: i32| ProductInput {
            name: name.to_string(),
            base_price: None,
            sale_price: Some(Price::from_dong(price)),
            stock,
            category_id: category.id,
            description: None,
            image: None,
        };
        let a = store.create_product(&product("A", 1_000, 10)).await.unwrap();
        let b = store.create_product(&product("B", 500, 5)).await.unwrap();
        let customer = store
            .create_customer(&contact("Khách", "khach@shop.vn"), "hash")
            .await
            .unwrap();
        let role = store.ensure_role("sales").await.unwrap();
        let staff = store
            .create_staff(&contact("Nhân viên", "nv@shop.vn"), role.id, "hash")
            .await
            .unwrap();
        Fixture {
            store,
            customer: customer.id,
            staff: staff.id,
            a: a.id,
            b: b.id,
        }
    }

    fn order(f: &Fixture, lines: &[(ProductId, i32)]) -> NewOrder {
        NewOrder {
            customer_id: f.customer,
            shipping: ShippingInfo {
                recipient_name: "Khách".to_string(),
                recipient_phone: "0900".to_string(),
                address: "1 Nguyễn Huệ".to_string(),
            },
            lines: lines
                .iter()
                .map(|&(product_id, quantity)| NewOrderLine {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    async fn product(f: &Fixture, id: ProductId) -> Product {
        f.store.get_product(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_place_order_consumes_stock_exactly() {
        let f = fixture().await;
        let detail = f.store.place_order(&order(&f, &[(f.a, 3), (f.b, 1)])).await.unwrap();

        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.approved_by, None);
        assert_eq!(detail.order.total, Price::from_dong(3_500));
        let line_sum: Price = detail.lines.iter().map(|l| l.line_total).sum();
        assert_eq!(line_sum, detail.order.total);
        assert_eq!(detail.lines[0].product_name.as_deref(), Some("A"));

        let a = product(&f, f.a).await;
        assert_eq!((a.stock, a.purchase_count), (7, 3));
        let b = product(&f, f.b).await;
        assert_eq!((b.stock, b.purchase_count), (4, 1));
    }

    #[tokio::test]
    async fn test_place_order_clamps_oversell() {
        let f = fixture().await;
        f.store.place_order(&order(&f, &[(f.b, 8)])).await.unwrap();

        let b = product(&f, f.b).await;
        assert_eq!((b.stock, b.purchase_count), (0, 8));
    }

    #[tokio::test]
    async fn test_place_order_over_limits_writes_nothing() {
        let f = fixture().await;
        let a = product(&f, f.a).await;
        let pricey = f
            .store
            .create_product(&ProductInput {
                name: "Vertu".to_string(),
                base_price: None,
                sale_price: Some(Price::MAX),
                stock: 4,
                category_id: a.category_id,
                description: None,
                image: None,
            })
            .await
            .unwrap();

        let err = f.store.place_order(&order(&f, &[(pricey.id, 2)])).await.unwrap_err();
        assert!(matches!(err, StoreError::Limit(OrderLimitError::Total)));

        let err = f.store.place_order(&order(&f, &[(f.b, -3)])).await.unwrap_err();
        assert!(matches!(err, StoreError::Limit(OrderLimitError::LineQuantity(-3))));

        assert!(f.store.list_orders(None).await.unwrap().is_empty());
        let a = product(&f, f.a).await;
        assert_eq!((a.stock, a.purchase_count), (10, 0));
        let b = product(&f, f.b).await;
        assert_eq!((b.stock, b.purchase_count), (5, 0));
        let pricey = product(&f, pricey.id).await;
        assert_eq!((pricey.stock, pricey.purchase_count), (4, 0));
    }

    #[tokio::test]
    async fn test_place_order_missing_product_writes_nothing() {
        let f = fixture().await;
        let result = f
            .store
            .place_order(&order(&f, &[(f.a, 1), (ProductId::new(99), 1)]))
            .await;

        assert!(matches!(result, Err(StoreError::NotFound("product"))));
        assert_eq!(product(&f, f.a).await.stock, 10);
        assert!(f.store.list_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_snapshots_current_price() {
        let f = fixture().await;
        let mut input = ProductInput {
            name: "A".to_string(),
            base_price: None,
            sale_price: Some(Price::from_dong(2_000)),
            stock: 10,
            category_id: product(&f, f.a).await.category_id,
            description: None,
            image: None,
        };
        f.store.update_product(f.a, &input).await.unwrap();
        let detail = f.store.place_order(&order(&f, &[(f.a, 2)])).await.unwrap();
        assert_eq!(detail.lines[0].unit_price, Price::from_dong(2_000));

        input.sale_price = Some(Price::from_dong(1));
        f.store.update_product(f.a, &input).await.unwrap();
        let stored = f.store.get_order(detail.order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines[0].unit_price, Price::from_dong(2_000));
        assert_eq!(stored.order.total, Price::from_dong(4_000));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let f = fixture().await;
        let placed = f.store.place_order(&order(&f, &[(f.a, 2), (f.b, 1)])).await.unwrap();
        let id = placed.order.id;

        let first = f
            .store
            .apply_lifecycle(id, LifecycleAction::Cancel, f.staff)
            .await
            .unwrap();
        assert!(first.applied);
        assert_eq!(first.order.status, OrderStatus::Cancelled);

        let a = product(&f, f.a).await;
        assert_eq!((a.stock, a.purchase_count), (10, 0));
        let b = product(&f, f.b).await;
        assert_eq!((b.stock, b.purchase_count), (5, 0));

        let second = f
            .store
            .apply_lifecycle(id, LifecycleAction::Cancel, f.staff)
            .await
            .unwrap();
        assert!(!second.applied);
        assert_eq!(product(&f, f.a).await.stock, 10);
        assert_eq!(second.order, first.order);
    }

    #[tokio::test]
    async fn test_cancel_floors_purchase_count() {
        let f = fixture().await;
        let placed = f.store.place_order(&order(&f, &[(f.a, 2)])).await.unwrap();
        f.store
            .tables
            .lock()
            .await
            .products
            .get_mut(&f.a)
            .unwrap()
            .purchase_count = 1;

        f.store
            .apply_lifecycle(placed.order.id, LifecycleAction::Cancel, f.staff)
            .await
            .unwrap();
        let a = product(&f, f.a).await;
        assert_eq!((a.stock, a.purchase_count), (10, 0));
    }

    #[tokio::test]
    async fn test_approve_records_approver_once() {
        let f = fixture().await;
        let placed = f.store.place_order(&order(&f, &[(f.a, 1)])).await.unwrap();
        let id = placed.order.id;

        let approved = f
            .store
            .apply_lifecycle(id, LifecycleAction::Approve, f.staff)
            .await
            .unwrap();
        assert!(approved.applied);
        assert_eq!(approved.order.status, OrderStatus::Approved);
        assert_eq!(approved.order.approved_by, Some(f.staff));
        assert!(approved.order.approved_at.is_some());

        let again = f
            .store
            .apply_lifecycle(id, LifecycleAction::Approve, StaffId::new(42))
            .await
            .unwrap();
        assert!(!again.applied);
        assert_eq!(again.order.approved_by, Some(f.staff));

        let detail = f.store.get_order(id).await.unwrap().unwrap();
        assert_eq!(detail.approver_name.as_deref(), Some("Nhân viên"));
    }

    #[tokio::test]
    async fn test_complete_after_cancel_is_rejected() {
        let f = fixture().await;
        let placed = f.store.place_order(&order(&f, &[(f.a, 1)])).await.unwrap();
        let id = placed.order.id;

        f.store
            .apply_lifecycle(id, LifecycleAction::Cancel, f.staff)
            .await
            .unwrap();
        let result = f
            .store
            .apply_lifecycle(id, LifecycleAction::Complete, f.staff)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Transition(TransitionError::CompleteCancelled))
        ));

        let unknown = f
            .store
            .apply_lifecycle(OrderId::new(404), LifecycleAction::Approve, f.staff)
            .await;
        assert!(matches!(unknown, Err(StoreError::NotFound("order"))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_never_oversell_visibly() {
        let f = fixture().await;
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&f.store);
            let new_order = order(&f, &[(f.b, 1), (f.a, 1)]);
            handles.push(tokio::spawn(async move { store.place_order(&new_order).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let a = product(&f, f.a).await;
        let b = product(&f, f.b).await;
        assert_eq!((a.stock, a.purchase_count), (0, 20));
        assert_eq!((b.stock, b.purchase_count), (0, 20));
        assert_eq!(f.store.list_orders(None).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_order_lists_filter_and_sort() {
        let f = fixture().await;
        let first = f.store.place_order(&order(&f, &[(f.a, 1)])).await.unwrap();
        let second = f.store.place_order(&order(&f, &[(f.b, 1)])).await.unwrap();
        f.store
            .apply_lifecycle(second.order.id, LifecycleAction::Approve, f.staff)
            .await
            .unwrap();

        let all = f.store.customer_orders(f.customer, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].order.id, second.order.id);

        let pending = f
            .store
            .list_orders(Some(OrderStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order.id, first.order.id);

        let other = f
            .store
            .customer_orders(CustomerId::new(77), None)
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_delete_guards() {
        let f = fixture().await;
        let category = product(&f, f.a).await.category_id;
        assert!(matches!(
            f.store.delete_category(category).await,
            Err(StoreError::Conflict(_))
        ));

        let placed = f.store.place_order(&order(&f, &[(f.a, 1)])).await.unwrap();
        assert!(matches!(
            f.store.delete_product(f.a).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            f.store.delete_customer(f.customer).await,
            Err(StoreError::Conflict(_))
        ));

        f.store.delete_staff(f.staff).await.unwrap();
        let role = f.store.ensure_role("sales").await.unwrap();
        let approver = f
            .store
            .create_staff(&contact("Duyệt", "duyet@shop.vn"), role.id, "hash")
            .await
            .unwrap();
        f.store
            .apply_lifecycle(placed.order.id, LifecycleAction::Approve, approver.id)
            .await
            .unwrap();
        assert!(matches!(
            f.store.delete_staff(approver.id).await,
            Err(StoreError::Conflict(_))
        ));

        f.store.delete_product(f.b).await.unwrap();
        assert!(f.store.get_product(f.b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_emails_conflict() {
        let f = fixture().await;
        let duplicate = f
            .store
            .create_customer(&contact("Khác", "KHACH@shop.vn"), "hash")
            .await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        let other = f
            .store
            .create_customer(&contact("Khác", "khac@shop.vn"), "hash")
            .await
            .unwrap();
        let clash = f
            .store
            .update_customer(other.id, &contact("Khác", "khach@shop.vn"), None)
            .await;
        assert!(matches!(clash, Err(StoreError::Conflict(_))));
    }
}
