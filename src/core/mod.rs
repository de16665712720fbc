pub mod bedrock;
pub mod controller;
pub mod conversation;
pub mod format;
pub mod model;
pub mod openai;
pub mod prompt;
pub mod session;
pub mod storage;
pub mod transcript;

pub use bedrock::*;
pub use controller::*;
pub use conversation::*;
pub use model::*;
pub use openai::*;
pub use prompt::*;
pub use session::*;
pub use storage::*;
pub use transcript::*;
