use thiserror::Error;

/// Everything the pipeline can report to the view boundary. All of these are
/// recovered there and turned into a user-visible message; none should
/// escape as a panic.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A (country, lens) selection yielded zero rows after suppression.
    #[error("no data for {country} under the {lens} lens")]
    MissingData { country: String, lens: String },

    /// Schema drift in the upstream extract. Fatal for the view that needed
    /// the column, harmless to every other view.
    #[error("column `{column}` is missing from `{sheet}`")]
    MissingColumn { column: String, sheet: String },

    #[error("`{sheet}` has no header row")]
    EmptySheet { sheet: String },

    #[error("failed to parse `{source_name}`: {reason}")]
    Parse { source_name: String, reason: String },

    /// The access gate has not been opened for this session.
    #[error("access gate is closed")]
    GateClosed,
}
