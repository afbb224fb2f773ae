pub mod content;
pub mod rules;
pub mod scoring;
pub mod session;

pub use content::*;
pub use rules::*;
pub use scoring::*;
pub use session::*;
