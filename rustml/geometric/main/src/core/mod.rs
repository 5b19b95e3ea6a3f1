pub(crate) mod batch;
pub(crate) mod checkpoint;
pub(crate) mod set2set;
