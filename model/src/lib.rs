/*!

This library provides the declarative documents that configure a test step: the `TestStep` object
that may be found among a step's apply documents and the `TestAssert` object that may be found among
its assert documents.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use assert::{TestAssert, TestCollector};
pub use command::Command;
pub use step::{ObjectReference, TestStep};

mod assert;
mod command;
pub mod constants;
mod step;
