pub mod branch;
pub mod executor;

pub use branch::{
    checkout_existing_branch, checkout_new_branch, configure_auth, new_branch_name,
};
pub use executor::{GitExecutor, redact_userinfo};
