// Built-in processes, one module per process

pub mod arithmetic;
pub mod delay;
pub mod echo;
pub mod json_transform;

pub use arithmetic::Arithmetic;
pub use delay::Delay;
pub use echo::Echo;
pub use json_transform::JsonTransform;
