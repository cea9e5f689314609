pub mod messages;

pub mod prelude {
    pub use super::messages::*;
}
