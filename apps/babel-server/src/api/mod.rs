pub(crate) mod health;
pub(crate) mod session;
pub(crate) mod translate;
