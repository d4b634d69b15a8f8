//! Catalog browsing and back-office catalog edits.
//!
//! Category lists are cached with `moka` (5-minute TTL); every category
//! mutation goes through [`CatalogService`] so the cache is invalidated on
//! write.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use smartstore_core::catalog::{
    Category, Page, Product, ProductDetail, ProductFilter, ProductInput, ProductSpecs,
    RELATED_LIMIT, VariantOptions,
};
use smartstore_core::store::{CatalogStore, CommerceStore, StoreError};
use smartstore_core::{CategoryId, ProductId};

const CATEGORY_TTL: Duration = Duration::from_secs(300);

/// Cached category list, shared through application state.
#[derive(Clone)]
pub struct CategoryCache {
    cache: Cache<(), Arc<Vec<Category>>>,
}

impl CategoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(CATEGORY_TTL)
                .build(),
        }
    }

    async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

impl Default for CategoryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Catalog operations over the store.
pub struct CatalogService<'a> {
    store: &'a dyn CommerceStore,
    categories: &'a CategoryCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore, categories: &'a CategoryCache) -> Self {
        Self { store, categories }
    }

    /// All categories, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, StoreError> {
        if let Some(categories) = self.categories.cache.get(&()).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(self.store.list_categories().await?);
        self.categories
            .cache
            .insert((), Arc::clone(&categories))
            .await;
        Ok(categories)
    }

    /// One page of products.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn products(&self, filter: ProductFilter) -> Result<Page<Product>, StoreError> {
        self.store.list_products(&filter.normalized()).await
    }

    /// Product page data: the product, its category, spec sheet, selectable
    /// options and related products.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_detail(&self, id: ProductId) -> Result<ProductDetail, StoreError> {
        let product = self
            .store
            .get_product(id)
            .await?
            .ok_or(StoreError::NotFound("product"))?;
        let category = self.store.get_category(product.category_id).await?;
        let specs = self.store.product_specs(id).await?;
        let related = self.store.related_products(&product, RELATED_LIMIT).await?;
        let options =
            VariantOptions::for_category(category.as_ref().map_or("", |c| c.name.as_str()));

        Ok(ProductDetail {
            product,
            category,
            specs,
            options,
            related,
        })
    }

    // =========================================================================
    // Back-office
    // =========================================================================

    /// # Errors
    ///
    /// Returns `StoreError` if the insert fails.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category, StoreError> {
        let category = self.store.create_category(name).await?;
        self.categories.invalidate().await;
        Ok(category)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown category.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category, StoreError> {
        let category = self.store.rename_category(id, name).await?;
        self.categories.invalidate().await;
        Ok(category)
    }

    /// # Errors
    ///
    /// `Conflict` while products still belong to the category.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        self.store.delete_category(id).await?;
        self.categories.invalidate().await;
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound` if the category does not exist.
    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: &ProductInput,
        specs: Option<&ProductSpecs>,
    ) -> Result<Product, StoreError> {
        let product = self.store.create_product(input).await?;
        if let Some(specs) = specs {
            self.store.save_specs(product.id, specs).await?;
        }
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown product or category.
    #[instrument(skip(self, input, specs), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
        specs: Option<&ProductSpecs>,
    ) -> Result<Product, StoreError> {
        let product = self.store.update_product(id, input).await?;
        if let Some(specs) = specs {
            self.store.save_specs(id, specs).await?;
        }
        Ok(product)
    }

    /// # Errors
    ///
    /// `Conflict` while order lines reference the product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        self.store.delete_product(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use smartstore_core::Price;
    use smartstore_core::store::{CatalogStore, MemoryStore};

    fn phone(category_id: CategoryId, name: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            base_price: Some(Price::from_dong(10_000_000)),
            sale_price: Some(Price::from_dong(9_000_000)),
            stock: 5,
            category_id,
            description: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_category_cache_invalidated_on_write() {
        let store = MemoryStore::new();
        let cache = CategoryCache::new();
        let service = CatalogService::new(&store, &cache);

        assert!(service.categories().await.unwrap().is_empty());
        let created = service.create_category("iPhone").await.unwrap();
        assert_eq!(service.categories().await.unwrap().len(), 1);

        service.rename_category(created.id, "Apple iPhone").await.unwrap();
        assert_eq!(service.categories().await.unwrap()[0].name, "Apple iPhone");

        service.delete_category(created.id).await.unwrap();
        assert!(service.categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_cache_serves_stale_reads_until_write() {
        let store = MemoryStore::new();
        let cache = CategoryCache::new();
        let service = CatalogService::new(&store, &cache);

        assert!(service.categories().await.unwrap().is_empty());
        // Writes that bypass the service are not seen until the next invalidation.
        store.create_category("Samsung").await.unwrap();
        assert!(service.categories().await.unwrap().is_empty());

        service.create_category("Xiaomi").await.unwrap();
        assert_eq!(service.categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_product_detail_collects_options_and_related() {
        let store = MemoryStore::new();
        let cache = CategoryCache::new();
        let service = CatalogService::new(&store, &cache);

        let iphone = service.create_category("iPhone").await.unwrap();
        let first = service
            .create_product(&phone(iphone.id, "iPhone 15"), None)
            .await
            .unwrap();
        service
            .create_product(&phone(iphone.id, "iPhone 16"), None)
            .await
            .unwrap();

        let detail = service.product_detail(first.id).await.unwrap();
        assert_eq!(detail.category.map(|c| c.name).as_deref(), Some("iPhone"));
        assert_eq!(detail.related.len(), 1);
        assert_eq!(detail.related[0].name, "iPhone 16");
        assert_eq!(detail.options, VariantOptions::for_category("iPhone"));
        assert!(detail.specs.is_none());
    }

    #[tokio::test]
    async fn test_product_detail_unknown_product() {
        let store = MemoryStore::new();
        let cache = CategoryCache::new();
        let service = CatalogService::new(&store, &cache);

        let err = service.product_detail(ProductId::new(99)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("product")));
    }
}
