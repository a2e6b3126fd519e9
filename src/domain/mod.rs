// Domain layer: core models and ports (interfaces). Only serde and async-trait beyond std.

pub mod model;
pub mod ports;
