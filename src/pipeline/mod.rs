//! Pure transformations from loaded extracts to per-view summary rows:
//! small-sample suppression, demographic filtering, scope resolution with
//! EU pooling, wide/long reshapes, and code-to-label mapping. Everything
//! here is a pure function over immutable tables; per-viewer computations
//! never share mutable state.

pub mod aggregate;
pub mod error;
pub mod labels;
pub mod lens;
pub mod reshape;
pub mod scope;
pub mod suppress;

pub use aggregate::aggregate;
pub use error::PipelineError;
pub use lens::Lens;
pub use reshape::{melt, pivot};
pub use scope::{resolve_scope, Scope, DEMOGRAPHIC_COL, EU_LABEL, TERRITORY_COL};
pub use suppress::{suppress, MIN_SAMPLE};
