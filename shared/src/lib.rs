mod platform;
mod streak;
mod xp;

pub use platform::*;
pub use streak::*;
pub use xp::*;
