use thiserror::Error;

/// Codec error type.
///
/// These never escape a batch decode: an unresolved reference nulls the
/// affected sub-object (or the whole row, for the character itself), and a
/// malformed field decodes to an empty mapping. The variants exist so
/// resolution helpers can say precisely what went wrong in logs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No {kind} catalog entry for id {id}")]
    UnresolvedReference { kind: &'static str, id: String },
    #[error("Malformed {column} field: {raw:?}")]
    MalformedField { column: &'static str, raw: String },
}
