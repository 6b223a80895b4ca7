use thiserror::Error;

/// Errors raised while constructing or running a [`crate::connection::ConnectionCreator`]
/// or the geometric primitives it is built from.
///
/// Every variant here corresponds to one of the five error kinds in the
/// engine's failure semantics: a bad static property of the configuration,
/// an unresolved synapse model name, a dimensionality clash between a mask
/// and a layer (or between the two layers of a connect call), too few
/// candidates for a fixed-degree draw, or a locality query issued for a
/// non-local node.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("bad property: {0}")]
    BadProperty(String),

    #[error("unknown synapse model: {0}")]
    UnknownSynapseModel(String),

    #[error("dimension mismatch: {context}: expected {expected}D, found {found}D")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("insufficient candidates for node {driver:?}: found {found}, need {needed}")]
    InsufficientCandidates {
        driver: crate::sink::NodeId,
        found: usize,
        needed: usize,
    },

    #[error("node {0:?} is not local to the calling process/thread")]
    NotLocal(crate::sink::NodeId),
}

pub type ConnectResult<T> = Result<T, ConnectError>;
