//! Legacy numeric-id drawing layer

pub mod context;

pub use context::ImmediateContext;
