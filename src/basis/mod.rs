//! Modal-nodal basis transformations.

mod vandermonde;

pub use vandermonde::{vandermonde_for, Vandermonde};
