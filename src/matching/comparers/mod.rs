pub(crate) mod address;
pub(crate) mod contact;
pub(crate) mod crypto;
pub(crate) mod dates;
pub(crate) mod identifier;
