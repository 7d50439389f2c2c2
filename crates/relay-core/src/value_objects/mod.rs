//! Value objects - immutable types that represent domain concepts

mod principal;

pub use principal::{PrincipalId, PrincipalParseError};
