mod common;
mod spread;
