pub mod export;
pub mod svg_output;
