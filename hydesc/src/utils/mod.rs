pub mod error;
pub(crate) mod ordered;
