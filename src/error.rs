use std::fmt::{Display, Formatter};

/// Failure modes of the region analysis.
///
/// Every public entry point returns `Result<_, error_stack::Report<StructureError>>`;
/// details (the offending label, edge, or arc) are attached to the report as
/// printable context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureError {
    /// The input adjacency is empty, internally inconsistent (an edge present
    /// in an outgoing list but absent from the matching incoming list), or
    /// uses one of the reserved synthetic labels.
    InvalidInput,
    /// The graph has no source node, so no node is reachable from any entry.
    /// The analysis refuses to pick an arbitrary entry rather than guessing.
    Unsupported,
    /// A post-analysis check failed: an arc was left unclassified, or the
    /// computed regions do not nest properly. Always a bug.
    InternalInvariantViolation,
}

impl Display for StructureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput => f.write_str("invalid input graph"),
            Self::Unsupported => f.write_str("unsupported graph shape"),
            Self::InternalInvariantViolation => f.write_str("internal invariant violated"),
        }
    }
}

impl std::error::Error for StructureError {}
