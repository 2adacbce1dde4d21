mod common;

mod scoring;
mod suggestion;
