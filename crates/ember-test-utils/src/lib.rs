//! Shared test utilities: a recording mock backend so batching behavior can
//! be verified without a GPU.

mod mock_backend;

pub use mock_backend::{BackendCall, MockBackend, MockShader, MockTexture};
