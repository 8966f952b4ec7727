#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("statistics must be calculated before they can be reported")]
    NotCalculated,
}
