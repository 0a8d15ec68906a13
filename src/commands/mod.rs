pub mod context;
pub mod scan;
pub mod show;
pub mod track;
