use rust_decimal::Decimal;

// ============================================================================
// Catalog Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown {kind} value: '{value}'")]
    UnknownAttribute { kind: &'static str, value: String },

    #[error("{field} cannot be negative: {value}")]
    NegativePrice { field: &'static str, value: Decimal },

    #[error("Binding type cannot be empty")]
    EmptyBindingType,
}
