//! # pgwarden-types
//!
//! Typed parameter codec for building PostgreSQL statements by string
//! interpolation without opening an injection hole.
//!
//! Every codec function turns a loosely typed [`ParamValue`] into a
//! ready-to-interpolate fragment, or rejects it with a [`ValidationError`].
//! Null inputs always map to SQL `NULL`.
//!
//! ## Example
//!
//! ```rust
//! use pgwarden_types::codec;
//!
//! let id = codec::uuid("5f0c6f3e-4d1b-4c52-9a8e-0b6f3f1f2a77")?;
//! let name = codec::string("O'Brien");
//! let sql = format!("UPDATE users SET name = {name} WHERE id = {id}");
//!
//! assert_eq!(
//!     sql,
//!     "UPDATE users SET name = $$O'Brien$$ WHERE id = '5f0c6f3e-4d1b-4c52-9a8e-0b6f3f1f2a77'"
//! );
//! # Ok::<(), pgwarden_types::ValidationError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod date;
pub mod error;
pub mod literal;
pub mod value;

pub use error::ValidationError;
pub use literal::SqlLiteral;
pub use value::ParamValue;
