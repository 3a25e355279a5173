//! `fieldcheck-cli` library: the load → compare → write pipeline behind the
//! `fieldcheck` binary, exposed so it can be driven without a subprocess.

pub mod pipeline;
