mod id_gen;
mod number;
mod toposort;

pub use id_gen::NameGenerator;
pub use number::Number;
pub use toposort::toposort;
