//! Record types bound by binders generated from `schemas/app.json` at build time.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

pub use config_bindgen::runtime::{BindError, BinderRegistry, ConfigSection};

#[derive(Debug, Default, PartialEq)]
pub struct AppOptions {
    pub name: String,
    pub count: i32,
    pub tags: Vec<String>,
    pub child: ChildOptions,
    pub level: Level,
    pub fallback: Option<Level>,
    pub limits: HashMap<Level, u32>,
    pub ports: BTreeMap<u16, String>,
    pub labels: HashMap<String, String>,
    pub features: BTreeSet<String>,
    pub secret: Vec<u8>,
    pub endpoints: Vec<Endpoint>,
    pub backup: Option<Endpoint>,
    pub fixed: [i32; 3],
    pub by_child: HashMap<ChildOptions, i32>,
    pub raw: ConfigSection,
    pub enabled: bool,
    pub address: Option<IpAddr>,
    pub r#type: String,
    /// Never bound.
    pub computed: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ChildOptions {
    pub value: i32,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Endpoint {
    pub url: String,
    pub retries: u8,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TreeNode {
    pub label: String,
    pub next: Option<Box<TreeNode>>,
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    #[default]
    Low,
    Medium,
    High = 10,
}

pub mod bindings {
    use super::*;

    include!(concat!(env!("OUT_DIR"), "/bindings.rs"));
}
