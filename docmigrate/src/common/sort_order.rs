/// Specifies the direction in which a migration set is ordered by version id.
///
/// # Variants
/// - `Ascending`: lowest id first, the order forward migrations are applied in
/// - `Descending`: highest id first, the order backward migrations are reverted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lowest version id first
    #[default]
    Ascending,
    /// Highest version id first
    Descending,
}
