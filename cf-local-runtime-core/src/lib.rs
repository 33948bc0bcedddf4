#![doc = "cf-local-runtime-core: core logic library for cf-local-runtime."]

//! This crate contains the data model, the contracts for every external
//! collaborator (kind, kubectl, the Codefresh API) and the orchestration that
//! sequences them: cluster bootstrap, venona installation and pipeline runs.
//!
//! # Usage
//! The CLI crate wires the default implementations ([`cluster::KindCluster`],
//! [`kubectl::KubectlCli`], [`codefresh::CodefreshClient`]) into the
//! orchestration functions. Tests swap them for the generated mocks in
//! [`contract`].

pub mod auth;
pub mod cluster;
pub mod codefresh;
pub mod contract;
pub mod install;
pub mod kubeconfig;
pub mod kubectl;
pub mod pipeline;
pub mod plugins;
pub mod templates;
