pub mod locale;
pub mod password;
pub mod validation;

pub use locale::Locale;
pub use password::{
    hash_password, verify_against_dummy, verify_password, Password, PasswordHashString,
};
pub use validation::{ValidatedForm, ValidatedQuery};
