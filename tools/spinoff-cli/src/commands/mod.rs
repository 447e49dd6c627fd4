pub mod check;
pub mod probe;
pub mod profiles;
pub mod transform;
