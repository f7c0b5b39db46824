pub(crate) mod projection;
pub(crate) mod pyramid;
