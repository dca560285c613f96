pub(crate) mod filter;
pub(crate) mod node;
pub(crate) mod nodes;
pub(crate) mod op;
pub(crate) mod processor;
