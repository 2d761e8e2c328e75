//! Route handlers. Each takes the raw query or form body and returns a
//! response fragment.

pub mod chain;
pub mod util;
