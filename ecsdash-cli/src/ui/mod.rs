mod render;
pub mod theme;

pub use render::{Banner, render};
