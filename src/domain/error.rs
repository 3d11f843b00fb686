use thiserror::Error;

use super::entities::{BrandId, ProductId};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("product `{0}` is defined more than once")]
    DuplicateProduct(ProductId),
    #[error("brand `{0}` is defined more than once")]
    DuplicateBrand(BrandId),
}
