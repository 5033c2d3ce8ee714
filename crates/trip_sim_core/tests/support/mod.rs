#![allow(dead_code)]

pub mod collaborators;
pub mod paths;
