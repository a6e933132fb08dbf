mod compile;
mod graph;

pub use compile::{CompileArgs, cmd_compile};
pub use graph::cmd_graph;
