use std::path::PathBuf;

/// Everything that can stop a load → aggregate → render pass.
///
/// Zero denominators in derived metrics are not errors: they produce
/// `NaN`/`±inf` and travel through to the output.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A column needed by a later stage is not in the table.
    #[error("missing column `{column}` (available: {available})")]
    Schema { column: String, available: String },

    /// A metric column holds something that isn't a number.
    #[error("column `{column}` must be numeric, row {row} holds `{value}`")]
    Type {
        column: String,
        row: usize,
        value: String,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// The drawing backend refused to draw or encode the chart.
    #[error("rendering failed: {0}")]
    Render(String),

    /// A directive or layout that cannot be applied to the data at hand.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
