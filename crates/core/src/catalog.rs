//! Catalog: products, categories, spec sheets, filtering and paging.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::cart::CartProduct;
use crate::types::{CategoryId, Price, ProductId};

/// Default number of products per catalog page.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Number of related products shown on a product page.
pub const RELATED_LIMIT: usize = 4;

/// A product category (brand or product family).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// List price before discount.
    pub base_price: Option<Price>,
    /// Price the customer pays.
    pub sale_price: Option<Price>,
    pub stock: i32,
    pub purchase_count: i32,
    pub category_id: CategoryId,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl Product {
    /// Sale price, treating a missing price as zero.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        self.sale_price.unwrap_or(Price::ZERO)
    }

    /// Amount knocked off the base price, zero when not discounted.
    #[must_use]
    pub fn discount(&self) -> Price {
        let base = self.base_price.unwrap_or(Price::ZERO);
        let sale = self.effective_price();
        if base > sale {
            Price::new(base.amount() - sale.amount())
        } else {
            Price::ZERO
        }
    }

    /// The slice of this product carried in the session cart.
    #[must_use]
    pub fn cart_view(&self) -> CartProduct {
        CartProduct {
            id: self.id,
            name: self.name.clone(),
            sale_price: self.sale_price,
            image: self.image.clone(),
        }
    }
}

/// Technical spec sheet of a phone or tablet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpecs {
    pub screen: Option<String>,
    pub operating_system: Option<String>,
    pub rear_camera: Option<String>,
    pub front_camera: Option<String>,
    pub cpu: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub sim: Option<String>,
    pub battery: Option<String>,
    pub design: Option<String>,
}

/// Editable product fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub base_price: Option<Price>,
    pub sale_price: Option<Price>,
    pub stock: i32,
    pub category_id: CategoryId,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Rejected product input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductInputError {
    #[error("product name is required")]
    MissingName,
    #[error("prices cannot be negative")]
    NegativePrice,
    #[error("prices cannot exceed {}", Price::MAX)]
    PriceTooLarge,
    #[error("stock cannot be negative")]
    NegativeStock,
}

impl ProductInput {
    /// Trim text fields and check the numeric ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, a price is negative or above
    /// [`Price::MAX`], or stock is negative.
    pub fn validate(mut self) -> Result<Self, ProductInputError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ProductInputError::MissingName);
        }
        if self.base_price.is_some_and(|p| p.is_negative())
            || self.sale_price.is_some_and(|p| p.is_negative())
        {
            return Err(ProductInputError::NegativePrice);
        }
        if self.base_price.is_some_and(|p| p > Price::MAX)
            || self.sale_price.is_some_and(|p| p > Price::MAX)
        {
            return Err(ProductInputError::PriceTooLarge);
        }
        if self.stock < 0 {
            return Err(ProductInputError::NegativeStock);
        }
        self.description = self.description.filter(|d| !d.trim().is_empty());
        self.image = self.image.filter(|i| !i.trim().is_empty());
        Ok(self)
    }
}

/// Catalog sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Most recently added first.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    /// Most purchased first.
    Bestseller,
    /// Discounted products only, biggest discount first.
    Sale,
}

impl ProductSort {
    /// Parse a sort key, falling back to [`ProductSort::Newest`] for anything
    /// unrecognised.
    #[must_use]
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("bestseller") => Self::Bestseller,
            Some("sale") => Self::Sale,
            _ => Self::Newest,
        }
    }
}

/// Catalog query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    /// Case-insensitive substring of the product name.
    pub keyword: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub sort: ProductSort,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl ProductFilter {
    /// Normalize user input: blank keyword dropped, page floored at 1, page
    /// size defaulted.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.keyword = self
            .keyword
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.page = self.page.max(1);
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }

    /// Rows to skip for the current page.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Whether a product passes the filter (ignoring sort and paging).
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.category.is_some_and(|c| c != product.category_id) {
            return false;
        }
        if let Some(keyword) = &self.keyword
            && !product.name.to_lowercase().contains(&keyword.to_lowercase())
        {
            return false;
        }
        let price = product.sale_price;
        if let Some(min) = self.min_price
            && price.is_none_or(|p| p < min)
        {
            return false;
        }
        if let Some(max) = self.max_price
            && price.is_none_or(|p| p > max)
        {
            return false;
        }
        if self.sort == ProductSort::Sale && product.discount() == Price::ZERO {
            return false;
        }
        true
    }

    /// Filter, sort and page an in-memory product list.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Page<Product> {
        let mut matched: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        sort_products(&mut matched, self.sort);

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.page_size as usize)
            .collect();
        Page::new(items, total, self.page, self.page_size)
    }
}

/// Sort products in place, ties broken by newest first.
pub fn sort_products(products: &mut [Product], sort: ProductSort) {
    match sort {
        ProductSort::Newest => products.sort_by_key(|p| Reverse(p.id)),
        ProductSort::PriceAsc => products.sort_by_key(|p| (p.effective_price(), Reverse(p.id))),
        ProductSort::PriceDesc => {
            products.sort_by_key(|p| (Reverse(p.effective_price()), Reverse(p.id)));
        }
        ProductSort::Bestseller => {
            products.sort_by_key(|p| (Reverse(p.purchase_count), Reverse(p.id)));
        }
        ProductSort::Sale => products.sort_by_key(|p| (Reverse(p.discount()), Reverse(p.id))),
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total_items: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            u32::try_from(total_items.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
        };
        Self {
            items,
            total_items,
            page,
            page_size,
            total_pages,
        }
    }
}

/// Colors and storage sizes offered on a product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOptions {
    pub colors: Vec<String>,
    pub storages: Vec<String>,
}

impl VariantOptions {
    /// Options for a category, chosen by product family in its name.
    #[must_use]
    pub fn for_category(category_name: &str) -> Self {
        let name = category_name.to_lowercase();
        let (colors, storages): (&[&str], &[&str]) = if name.contains("iphone") {
            (&["Đen", "Trắng", "Xanh", "Hồng"], &["128GB", "256GB", "512GB"])
        } else if name.contains("samsung") {
            (&["Đen", "Xanh", "Tím"], &["128GB", "256GB"])
        } else if name.contains("xiaomi") {
            (&["Đen", "Trắng", "Xanh"], &["256GB", "512GB"])
        } else {
            (&["Mặc định"], &["Mặc định"])
        };
        Self {
            colors: colors.iter().map(ToString::to_string).collect(),
            storages: storages.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Everything the product page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Option<Category>,
    pub specs: Option<ProductSpecs>,
    pub options: VariantOptions,
    pub related: Vec<Product>,
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(id: i32, category: i32, base: Option<i64>, sale: Option<i64>, bought: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Máy {id}"),
            base_price: base.map(Price::from_dong),
            sale_price: sale.map(Price::from_dong),
            stock: 10,
            purchase_count: bought,
            category_id: CategoryId::new(category),
            description: None,
            image: None,
        }
    }

    fn ids(page: &Page<Product>) -> Vec<i32> {
        page.items.iter().map(|p| p.id.as_i32()).collect()
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, 1, Some(300), Some(250), 5),
            product(2, 1, None, Some(100), 9),
            product(3, 2, Some(500), Some(200), 1),
            product(4, 2, Some(400), Some(400), 0),
        ]
    }

    fn filter(sort: ProductSort) -> ProductFilter {
        ProductFilter {
            sort,
            ..ProductFilter::default()
        }
        .normalized()
    }

    #[test]
    fn test_sort_orders() {
        let products = catalog();
        assert_eq!(ids(&filter(ProductSort::Newest).apply(&products)), [4, 3, 2, 1]);
        assert_eq!(ids(&filter(ProductSort::PriceAsc).apply(&products)), [2, 3, 1, 4]);
        assert_eq!(ids(&filter(ProductSort::PriceDesc).apply(&products)), [4, 1, 3, 2]);
        assert_eq!(ids(&filter(ProductSort::Bestseller).apply(&products)), [2, 1, 3, 4]);
        assert_eq!(ids(&filter(ProductSort::Sale).apply(&products)), [3, 1]);
    }

    #[test]
    fn test_filter_by_category_keyword_and_price() {
        let products = catalog();
        let page = ProductFilter {
            category: Some(CategoryId::new(2)),
            ..ProductFilter::default()
        }
        .normalized()
        .apply(&products);
        assert_eq!(ids(&page), [4, 3]);

        let page = ProductFilter {
            keyword: Some("  MÁY 3 ".to_string()),
            ..ProductFilter::default()
        }
        .normalized()
        .apply(&products);
        assert_eq!(ids(&page), [3]);

        let page = ProductFilter {
            min_price: Some(Price::from_dong(150)),
            max_price: Some(Price::from_dong(300)),
            ..ProductFilter::default()
        }
        .normalized()
        .apply(&products);
        assert_eq!(ids(&page), [3, 1]);
    }

    #[test]
    fn test_paging() {
        let products: Vec<Product> = (1..=30).map(|id| product(id, 1, None, Some(1), 0)).collect();
        let page = ProductFilter {
            page: 3,
            ..ProductFilter::default()
        }
        .normalized()
        .apply(&products);

        assert_eq!(page.total_items, 30);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 6);
        assert_eq!(page.items[0].id, ProductId::new(6));

        let first = ProductFilter::default().normalized();
        assert_eq!(first.page, 1);
        assert_eq!(first.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn test_sort_parse_is_lenient() {
        assert_eq!(ProductSort::parse_lenient(Some("PRICE_DESC")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::parse_lenient(Some("whatever")), ProductSort::Newest);
        assert_eq!(ProductSort::parse_lenient(None), ProductSort::Newest);
    }

    #[test]
    fn test_variant_options_by_family() {
        let iphone = VariantOptions::for_category("iPhone");
        assert_eq!(iphone.colors.len(), 4);
        assert_eq!(iphone.storages, ["128GB", "256GB", "512GB"]);

        let other = VariantOptions::for_category("Phụ kiện");
        assert_eq!(other.colors, ["Mặc định"]);
    }

    #[test]
    fn test_product_input_validation() {
        let input = ProductInput {
            name: "  Galaxy S24 ".to_string(),
            base_price: Some(Price::from_dong(100)),
            sale_price: Some(Price::from_dong(90)),
            stock: 3,
            category_id: CategoryId::new(2),
            description: Some("   ".to_string()),
            image: None,
        };
        let valid = input.clone().validate();
        assert_eq!(valid.as_ref().map(|p| p.name.as_str()), Ok("Galaxy S24"));
        assert_eq!(valid.map(|p| p.description), Ok(None));

        let blank = ProductInput {
            name: " ".to_string(),
            ..input.clone()
        };
        assert_eq!(blank.validate(), Err(ProductInputError::MissingName));

        let oversized = ProductInput {
            sale_price: Some(Price::new(rust_decimal::Decimal::MAX)),
            ..input.clone()
        };
        assert_eq!(oversized.validate(), Err(ProductInputError::PriceTooLarge));

        let at_limit = ProductInput {
            base_price: Some(Price::MAX),
            ..input.clone()
        };
        assert!(at_limit.validate().is_ok());

        let negative = ProductInput {
            stock: -1,
            ..input
        };
        assert_eq!(negative.validate(), Err(ProductInputError::NegativeStock));
    }
}
