//! Testing utilities for xybrid-accel.
//!
//! This module provides an in-process accelerator runtime and fixtures for
//! exercising the executor without device drivers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xybrid_accel::testing::{fixtures, MockRuntime};
//!
//! let runtime = Arc::new(MockRuntime::new());
//! let mut executor = fixtures::identity_executor(&runtime);
//! executor.predict(&[1.0f32, 2.0, 3.0, 4.0])?;
//! assert_eq!(runtime.live_total(), 2); // model + compilation
//! ```

pub mod fixtures;
pub mod mocks;

pub use mocks::*;
