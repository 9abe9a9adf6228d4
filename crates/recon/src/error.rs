use takeoff_engine::TakeoffError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (band ordering, non-finite band, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Missing required column in input data.
    #[error("{source_name}: missing column '{column}'")]
    MissingColumn { source_name: String, column: String },
    /// Quantity cell that is not a number.
    #[error("{source_name}, line {line}: cannot parse quantity '{value}' for '{item}'")]
    QuantityParse {
        source_name: String,
        line: u64,
        item: String,
        value: String,
    },
    #[error("{source_name}, line {line}: unknown category '{value}'")]
    UnknownCategory {
        source_name: String,
        line: u64,
        value: String,
    },
    /// Only observed and reference values may be ingested.
    #[error("{source_name}, line {line}: provenance '{value}' cannot be ingested")]
    InvalidProvenance {
        source_name: String,
        line: u64,
        value: String,
    },
    /// The same item listed twice in one expected list.
    #[error("expected list: item '{item}' listed more than once")]
    DuplicateExpectedItem { item: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Engine(#[from] TakeoffError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use takeoff_engine::ItemId;

    #[test]
    fn messages_name_the_source() {
        let err = ReconError::MissingColumn {
            source_name: "observations".into(),
            column: "quantity".into(),
        };
        assert_eq!(err.to_string(), "observations: missing column 'quantity'");

        let err = ReconError::QuantityParse {
            source_name: "expected".into(),
            line: 4,
            item: "jhooks".into(),
            value: "two hundred".into(),
        };
        assert_eq!(
            err.to_string(),
            "expected, line 4: cannot parse quantity 'two hundred' for 'jhooks'"
        );
    }

    #[test]
    fn engine_errors_pass_through() {
        let err: ReconError = TakeoffError::DuplicateOutput {
            item: ItemId::from_static("jhooks"),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "duplicate output: item 'jhooks' already has a derivation rule"
        );
    }
}
