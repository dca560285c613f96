pub(crate) mod noise;
pub(crate) mod particle;
pub(crate) mod render_node;
pub(crate) mod rng;
pub(crate) mod simulator;
