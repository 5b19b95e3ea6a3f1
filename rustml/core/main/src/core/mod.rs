pub(crate) mod runtime;
pub(crate) mod shape;
pub(crate) mod tensor;
