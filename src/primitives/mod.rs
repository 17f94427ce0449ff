//! Width-tagged integer and IEEE float primitives: overflow-detecting
//! arithmetic, truncate/zero-extend/sign-extend, and float operations with
//! exception-flag reporting. These are the leaf layer every abstract domain
//! builds on.

pub mod float_ops;
pub mod int_ops;
