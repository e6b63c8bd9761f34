#![allow(dead_code)]

use std::collections::HashSet;

#[allow(unused_imports)]
pub use pipelinerun_test_utils::builders::{DefinitionBuilder, chain_abc, diamond, graph};
#[allow(unused_imports)]
pub use pipelinerun_test_utils::{init_tracing, t, with_timeout};

pub fn set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

pub fn sorted<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut v: Vec<String> = names.into_iter().map(str::to_string).collect();
    v.sort();
    v
}
