pub mod assessment;
pub mod form;

pub use assessment::*;
pub use form::*;
