pub mod column;
pub mod error;
pub mod field;
pub mod locale;
pub mod value;

pub use column::*;
pub use error::*;
pub use field::*;
pub use locale::*;
pub use value::*;
