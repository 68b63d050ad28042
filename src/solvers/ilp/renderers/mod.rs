//! ILP Renderers

pub mod lp;
