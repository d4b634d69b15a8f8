//! Seed the catalog from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! ss-cli seed seed/catalog.yaml
//! ```
//!
//! # File Format
//!
//! ```yaml
//! roles: [Manager, Sales]
//! categories:
//!   - name: iPhone
//!     products:
//!       - name: iPhone 15 128GB
//!         base_price: 22990000
//!         sale_price: 19990000
//!         stock: 20
//!         image: iphone15.jpg
//!         specs:
//!           screen: 6.1" OLED
//!           ram: 6GB
//! ```
//!
//! Prices are whole dong. Seeding is idempotent: categories are matched by
//! name, products by name within their category, and existing rows are left
//! untouched.

use std::path::Path;

use serde::Deserialize;

use smartstore_core::catalog::{ProductFilter, ProductInput, ProductSpecs};
use smartstore_core::store::{AccountStore, CatalogStore, CommerceStore, PgStore};
use smartstore_core::{CategoryId, Price};

use super::{CliError, connect};

/// Largest catalog page fetched when matching existing products.
const MATCH_PAGE_SIZE: u32 = 1000;

/// Parsed seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub name: String,
    pub base_price: Option<i64>,
    pub sale_price: Option<i64>,
    #[serde(default)]
    pub stock: i32,
    pub description: Option<String>,
    pub image: Option<String>,
    pub specs: Option<ProductSpecs>,
}

impl SeedProduct {
    fn input(&self, category_id: CategoryId) -> Result<ProductInput, CliError> {
        ProductInput {
            name: self.name.clone(),
            base_price: self.base_price.map(Price::from_dong),
            sale_price: self.sale_price.map(Price::from_dong),
            stock: self.stock,
            category_id,
            description: self.description.clone(),
            image: self.image.clone(),
        }
        .validate()
        .map_err(|e| CliError::Seed(format!("product \"{}\": {e}", self.name)))
    }
}

/// What a seed run changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub roles: usize,
    pub categories_created: usize,
    pub products_created: usize,
    pub products_skipped: usize,
}

/// Parse and check a seed file without touching the database.
///
/// # Errors
///
/// Returns an error for malformed YAML, blank names, or negative prices and
/// stock.
pub fn parse(content: &str) -> Result<SeedFile, CliError> {
    let seed: SeedFile = serde_yaml::from_str(content)?;

    if seed.roles.iter().any(|r| r.trim().is_empty()) {
        return Err(CliError::Seed("role names cannot be blank".to_string()));
    }
    for category in &seed.categories {
        if category.name.trim().is_empty() {
            return Err(CliError::Seed("category names cannot be blank".to_string()));
        }
        for product in &category.products {
            product.input(CategoryId::new(0))?;
        }
    }
    Ok(seed)
}

/// Write a parsed seed into a store, skipping rows that already exist.
///
/// # Errors
///
/// Returns an error if the store rejects a write.
pub async fn apply(store: &dyn CommerceStore, seed: &SeedFile) -> Result<SeedSummary, CliError> {
    let mut summary = SeedSummary::default();

    for role in &seed.roles {
        store.ensure_role(role.trim()).await?;
        summary.roles += 1;
    }

    let mut categories = store.list_categories().await?;
    for seed_category in &seed.categories {
        let name = seed_category.name.trim();
        let existing = categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned();
        let category = match existing {
            Some(category) => category,
            None => {
                let category = store.create_category(name).await?;
                tracing::info!(category = %category.name, "Category created");
                summary.categories_created += 1;
                categories.push(category.clone());
                category
            }
        };

        let current = store
            .list_products(&ProductFilter {
                category: Some(category.id),
                page: 1,
                page_size: MATCH_PAGE_SIZE,
                ..ProductFilter::default()
            })
            .await?;

        for seed_product in &seed_category.products {
            let input = seed_product.input(category.id)?;
            if current.items.iter().any(|p| p.name == input.name) {
                summary.products_skipped += 1;
                continue;
            }
            let product = store.create_product(&input).await?;
            if let Some(specs) = &seed_product.specs {
                store.save_specs(product.id, specs).await?;
            }
            tracing::info!(product_id = %product.id, product = %product.name, "Product created");
            summary.products_created += 1;
        }
    }

    Ok(summary)
}

/// Seed the storefront database from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a write fails.
pub async fn run(file_path: &str) -> Result<(), CliError> {
    let path = Path::new(file_path);
    tracing::info!(path = %file_path, "Loading seed file");

    // Read and validate before connecting to the database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let seed = parse(&content)?;
    tracing::info!(categories = seed.categories.len(), "Seed file validated");

    let store = PgStore::new(connect().await?);
    let summary = apply(&store, &seed).await?;

    tracing::info!("Seeding complete!");
    tracing::info!("  Roles ensured: {}", summary.roles);
    tracing::info!("  Categories created: {}", summary.categories_created);
    tracing::info!("  Products created: {}", summary.products_created);
    tracing::info!("  Products skipped (already exist): {}", summary.products_skipped);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use smartstore_core::store::MemoryStore;

    const SEED: &str = r#"
roles: [Manager, Sales]
categories:
  - name: iPhone
    products:
      - name: iPhone 15
        base_price: 22990000
        sale_price: 19990000
        stock: 20
        specs:
          ram: 6GB
          storage: 128GB
      - name: iPhone 15 Plus
        sale_price: 22990000
        stock: 5
  - name: Samsung
"#;

    #[test]
    fn test_parse_rejects_invalid_rows() {
        assert!(parse(SEED).is_ok());
        assert!(matches!(
            parse("categories:\n  - name: ' '\n"),
            Err(CliError::Seed(_))
        ));
        assert!(matches!(
            parse("categories:\n  - name: X\n    products:\n      - name: P\n        stock: -2\n"),
            Err(CliError::Seed(_))
        ));
        assert!(matches!(parse("colour: red\n"), Err(CliError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let store = MemoryStore::new();
        let seed = parse(SEED).unwrap();

        let first = apply(&store, &seed).await.unwrap();
        assert_eq!(first.roles, 2);
        assert_eq!(first.categories_created, 2);
        assert_eq!(first.products_created, 2);

        let second = apply(&store, &seed).await.unwrap();
        assert_eq!(second.categories_created, 0);
        assert_eq!(second.products_created, 0);
        assert_eq!(second.products_skipped, 2);

        assert_eq!(store.list_categories().await.unwrap().len(), 2);
        assert_eq!(store.list_roles().await.unwrap().len(), 2);
        let page = store
            .list_products(&ProductFilter {
                keyword: Some("iPhone 15".to_string()),
                page: 1,
                page_size: 10,
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_items, 2);
        let iphone = page.items.iter().find(|p| p.name == "iPhone 15").unwrap();
        let specs = store.product_specs(iphone.id).await.unwrap().unwrap();
        assert_eq!(specs.ram.as_deref(), Some("6GB"));
    }
}
