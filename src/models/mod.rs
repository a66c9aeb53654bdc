pub mod enums;
pub mod image;
pub mod patient;
pub mod progress;
pub mod report;
pub mod user;
pub mod visit;

pub use enums::*;
pub use image::*;
pub use patient::*;
pub use progress::*;
pub use report::*;
pub use user::*;
pub use visit::*;
