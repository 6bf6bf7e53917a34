//! On-disk representation of the roster.
//!
//! # Responsibility
//! - Define the flat comma-separated record format and its decoder policies.
//!
//! # See also
//! - `repo::roster_repo` for file I/O around the codec.

pub mod line_codec;
