pub mod account;
pub mod consent;
pub mod consent_account;
pub mod customer;
pub mod fi_record;
pub mod institution;
pub mod session;

pub use account::Entity as Account;
pub use consent::Entity as Consent;
pub use consent_account::Entity as ConsentAccount;
pub use customer::Entity as Customer;
pub use fi_record::Entity as FiRecord;
pub use institution::Entity as Institution;
pub use session::Entity as Session;
