//! Build codec for user-submitted showcase profiles.
//!
//! A player submits a UID; the serving layer fetches the game's showcase API
//! and hands the nested per-character payload to [`hsr::encode`] or
//! [`genshin::encode`], which flattens it into delimited-string columns for
//! relational storage. Rendering a profile page goes the other way:
//! persisted rows plus the static reference catalogs go through the matching
//! `decode`, which rebuilds the nested view model, resolves names and
//! rarities, counts set pieces, and attaches the derived crit score.
//!
//! Decode is tolerant by construction: a missing catalog entry nulls the
//! affected sub-object (or the row, when the character itself is unknown),
//! and a malformed column decodes to an empty mapping. A batch decode always
//! returns one entry per input row.

mod error;
mod property;
mod types;

pub mod genshin;
pub mod hsr;

pub use error::Error;
pub use property::{
    decode_properties, decode_sub_stats, encode_properties, encode_property, encode_sub_stats,
};
pub use types::{crit_value, Property, Region, SkillLevel, SubStat};
