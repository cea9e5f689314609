pub mod callback;
pub mod login;

pub mod prelude {
    pub use super::callback::*;
    pub use super::login::*;
}
