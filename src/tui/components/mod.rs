pub mod chat;
pub mod input;
pub mod list;
pub mod status;
pub mod viewer;

pub use chat::*;
pub use input::*;
pub use list::*;
pub use status::*;
pub use viewer::*;
