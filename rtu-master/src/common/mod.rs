pub(crate) mod function;
pub(crate) mod parse;
pub(crate) mod phys;
pub(crate) mod serialize;
