pub(crate) mod modes;
pub(crate) mod ops;
