pub(crate) mod drawable;
pub(crate) mod emitter;
pub(crate) mod filter;
