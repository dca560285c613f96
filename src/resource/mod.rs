pub(crate) mod protocol;
pub(crate) mod value;
