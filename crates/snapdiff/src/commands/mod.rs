mod add;
mod compare;
mod init;
mod review;
mod run;

pub use self::add::add;
pub use self::compare::compare;
pub use self::init::init;
pub use self::review::{approve, list, reject, remove, set_baseline};
pub use self::run::run;
