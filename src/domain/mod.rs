// Domain layer: records, rules and the ports the workflow talks through.

pub mod area;
pub mod model;
pub mod ports;
pub mod rules;
