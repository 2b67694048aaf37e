//! Common test infrastructure shared across integration tests.
//!
//! - `stubs`: prop collaborators, room resolvers and round fixtures
//!
//! ```ignore
//! mod common;
//! use common::stubs::{office_round, RecordingIgniter};
//! ```

pub mod stubs;
