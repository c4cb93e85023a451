//! # fleetsync-sources
//!
//! Systems of record that the sync pipelines read from:
//!
//! - [`gitlab`]: owned projects and their most recent commit
//! - [`virtualmin`]: domains hosted on the live server

pub mod gitlab;
pub mod virtualmin;

pub use gitlab::{Commit, GitLabClient, Project, RepoSummary};
pub use virtualmin::{parse_domains, DomainRow, DomainTable, LiveDomain, VirtualminClient};
