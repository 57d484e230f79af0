//! Integration tests: the engine and HTTP API driven end-to-end through
//! the public crate surface.

mod api_flow;
mod mock_model;
