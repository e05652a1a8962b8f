#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use volute_dnn_ops as dnn_ops;
