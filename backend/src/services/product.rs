//! Product catalog and price previews

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::Product;
use crate::services::PricingTierService;
use shared::{DeliveryCalculation, PaginatedResponse, Pagination, WeightUnit};

#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    company_id: Uuid,
    sku: String,
    name: String,
    description: Option<String>,
    base_price: Decimal,
    weight_per_unit: Decimal,
    weight_unit: String,
    tax_rate: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> AppResult<Self> {
        let weight_unit = row.weight_unit.parse::<WeightUnit>().map_err(|e| {
            AppError::Internal(format!("Product {} has a bad weight unit: {}", row.id, e))
        })?;

        Ok(Product {
            id: row.id,
            company_id: row.company_id,
            sku: row.sku,
            name: row.name,
            description: row.description,
            base_price: row.base_price,
            weight_per_unit: row.weight_per_unit,
            weight_unit,
            tax_rate: row.tax_rate,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(custom = "shared::check_sku")]
    pub sku: String,
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "shared::check_non_negative")]
    pub base_price: Decimal,
    #[validate(custom = "shared::check_non_negative")]
    pub weight_per_unit: Decimal,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[validate(custom = "shared::check_tax_rate")]
    pub tax_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "shared::check_non_negative")]
    pub base_price: Option<Decimal>,
    #[validate(custom = "shared::check_non_negative")]
    pub weight_per_unit: Option<Decimal>,
    pub weight_unit: Option<WeightUnit>,
    #[validate(custom = "shared::check_tax_rate")]
    pub tax_rate: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PricePreviewInput {
    pub quantity: Decimal,
}

const PRODUCT_COLUMNS: &str = "id, company_id, sku, name, description, base_price, \
     weight_per_unit, weight_unit, tax_rate, is_active, created_at, updated_at";

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_products(
        &self,
        company_id: Uuid,
        query: ProductQuery,
    ) -> AppResult<PaginatedResponse<Product>> {
        let page = Pagination::from_query(query.page, query.per_page);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let filter = r#"
            WHERE company_id = $1
              AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
              AND ($3::boolean IS NULL OR is_active = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM products {filter}"))
            .bind(company_id)
            .bind(&search)
            .bind(query.is_active)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {filter} ORDER BY name ASC LIMIT $4 OFFSET $5"
        ))
        .bind(company_id)
        .bind(&search)
        .bind(query.is_active)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(PaginatedResponse::new(data, &page, total as u64))
    }

    pub async fn get_product(&self, company_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND company_id = $2"
        ))
        .bind(product_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?
        .try_into()
    }

    pub async fn create_product(
        &self,
        company_id: Uuid,
        default_tax_rate: Decimal,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE company_id = $1 AND sku = $2)",
        )
        .bind(company_id)
        .bind(&input.sku)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::conflict("product", "A product with this SKU already exists"));
        }

        let product: Product = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products \
             (company_id, sku, name, description, base_price, weight_per_unit, weight_unit, tax_rate) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(company_id)
        .bind(&input.sku)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.base_price)
        .bind(input.weight_per_unit)
        .bind(input.weight_unit.as_str())
        .bind(input.tax_rate.unwrap_or(default_tax_rate))
        .fetch_one(&self.db)
        .await?
        .try_into()?;

        tracing::info!(%company_id, product_id = %product.id, sku = %product.sku, "Product created");

        Ok(product)
    }

    pub async fn update_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        input.validate()?;
        let existing = self.get_product(company_id, product_id).await?;

        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET name = $1, description = $2, base_price = $3, \
             weight_per_unit = $4, weight_unit = $5, tax_rate = $6, is_active = $7, \
             updated_at = NOW() WHERE id = $8 AND company_id = $9 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.name.unwrap_or(existing.name))
        .bind(input.description.or(existing.description))
        .bind(input.base_price.unwrap_or(existing.base_price))
        .bind(input.weight_per_unit.unwrap_or(existing.weight_per_unit))
        .bind(input.weight_unit.unwrap_or(existing.weight_unit).as_str())
        .bind(input.tax_rate.unwrap_or(existing.tax_rate))
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(product_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    pub async fn deactivate_product(&self, company_id: Uuid, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = false, updated_at = NOW() WHERE id = $1 AND company_id = $2",
        )
        .bind(product_id)
        .bind(company_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        tracing::info!(%company_id, %product_id, "Product deactivated");
        Ok(())
    }

    /// Price `quantity` units with delivery and tax, rounded for display
    pub async fn price_preview(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: PricePreviewInput,
    ) -> AppResult<DeliveryCalculation> {
        let product = self.get_product(company_id, product_id).await?;
        let tiers = PricingTierService::new(self.db.clone())
            .active_tiers(company_id)
            .await?;

        let calculation = product.price(input.quantity, &tiers)?;
        Ok(calculation.rounded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(unit: &str) -> ProductRow {
        ProductRow {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            sku: "FLY-A5".into(),
            name: "A5 flyers".into(),
            description: None,
            base_price: dec!(0.25),
            weight_per_unit: dec!(5),
            weight_unit: unit.into(),
            tax_rate: dec!(7),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_weight_unit() {
        let product = Product::try_from(row("g")).unwrap();
        assert_eq!(product.weight_unit, WeightUnit::G);
    }

    #[test]
    fn bad_unit_in_database_is_internal() {
        assert!(matches!(Product::try_from(row("stone")), Err(AppError::Internal(_))));
    }

    #[test]
    fn create_input_rejects_out_of_range_tax() {
        let input = CreateProductInput {
            sku: "BC-1".into(),
            name: "Business cards".into(),
            description: None,
            base_price: dec!(1),
            weight_per_unit: dec!(2),
            weight_unit: WeightUnit::G,
            tax_rate: Some(dec!(150)),
        };
        assert!(input.validate().unwrap_err().field_errors().contains_key("tax_rate"));
    }
}
