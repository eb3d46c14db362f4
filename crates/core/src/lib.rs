pub mod domain;
pub mod error;
pub mod tree;
pub mod types;
pub mod validate;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;
