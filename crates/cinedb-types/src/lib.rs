pub mod general;
pub mod utils;
pub mod validation;
