// src/lib.rs

//! flatwatch Library

pub mod error;
pub mod media;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod source;
pub mod storage;
pub mod utils;
