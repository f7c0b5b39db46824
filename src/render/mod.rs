pub(crate) mod display;
pub(crate) mod fault;
pub(crate) mod scaled;
pub(crate) mod settings;
pub(crate) mod sink;
pub(crate) mod tables;
